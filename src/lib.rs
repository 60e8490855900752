//! `credential_process` helper that trades a web identity token for
//! temporary AWS credentials and caches them on disk until they are close
//! to expiry.

pub mod aws;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod process;

pub use aws::CredentialDocument;
pub use error::{Error, Result};
