//! GitHub App Credential Rotation Library
//!
//! Drives a Chrome session through GitHub's settings UI to list, create and delete
//! the client secrets and private keys of a GitHub App.

pub mod cli;
pub mod config;
pub mod display;
pub mod github;
pub mod shell;
pub mod webdriver;

pub use config::Config;
pub use github::{Credential, CredentialKind, GitHubSession};
