use thiserror::Error;

/// Errors surfaced by a [`crate::ChainApi`] backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("upstream value missing: {0}")]
    Missing(String),

    #[error("failed to decode upstream value: {0}")]
    Decode(String),

    #[error("subscription feed {0} closed")]
    FeedClosed(&'static str),
}

pub type Result<T> = std::result::Result<T, ChainError>;

/// Errors raised while loading a [`crate::ChainFixture`] from disk.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read chain fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid chain fixture {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
