use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The record carries no primary identifier and cannot be tracked.
    #[error("Missing record identifier")]
    MissingIdentifier,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
