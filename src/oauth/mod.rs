pub mod handshake;
pub mod link_store;
pub mod redirect;

pub use handshake::{
    BearerToken, LinkState, OAuthConfig, OAuthHandshake, DEFAULT_AUTH_URL, FITNESS_READ_SCOPE,
};
pub use link_store::LinkStore;
pub use redirect::{PrintRedirector, Redirector};
