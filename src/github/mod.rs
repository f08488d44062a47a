//! GitHub App settings automation
//!
//! Scrapes and manipulates the client secrets and private keys of one GitHub App
//! through its settings page.

pub mod credentials;
mod session;
mod totp;

pub use credentials::{Credential, CredentialKind};
pub use session::{Credentials, GitHubSession};
pub use totp::Totp;
