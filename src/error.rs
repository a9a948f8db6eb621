//! Error types for prioq.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("priority level out of range: {0} (expected 0..=3)")]
    InvalidPriority(i32),

    #[error("unknown priority name: {0}")]
    UnknownPriority(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
