pub mod client;
pub mod types;

pub use client::{FitnessClient, QueryOutcome, DEFAULT_AGGREGATE_URL};
pub use types::AggregateResponse;
