//! Access credentials for diskspeed.
//!
//! The measurement engine only consumes an opaque bearer token. This crate
//! obtains one through the provider's OAuth confirmation-code flow, keeps it
//! on disk and checks that it still works.

mod config;
mod error;
mod oauth;
mod store;

pub use config::OAuthConfig;
pub use error::{AuthError, Result};
pub use oauth::{Authenticator, CredentialProvider, WriteAccess};
pub use store::TokenStore;
