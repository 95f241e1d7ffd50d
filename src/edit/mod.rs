pub mod session;
pub mod state;

pub use session::EditSession;
pub use state::{CommitOutcome, DeleteOutcome, Draft, EditState};
