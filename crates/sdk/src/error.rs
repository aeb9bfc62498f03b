use thiserror::Error;

/// Errors that can occur while fetching snapshots from a stakecache server.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error (status {status}): {message}")]
    ServerError { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
}

impl SdkError {
    pub(crate) fn server_error(status: u16, message: impl Into<String>) -> Self {
        SdkError::ServerError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status returned by the server, when the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::ServerError { status, .. } => Some(*status),
            SdkError::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}
