//! Errors for the fallible edges of the crate.
//!
//! The compression core itself never fails on structurally valid input; these
//! variants only cover configuration loading and tree restoration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
    #[error("unknown component `{0}` referenced by instance `{1}`")]
    UnknownComponent(String, String),
}

pub type Result<T> = std::result::Result<T, Error>;
