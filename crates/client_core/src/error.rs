use reqwest::StatusCode;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no session credential available")]
    Unauthenticated,
    #[error("session expired (401 from {path})")]
    SessionExpired { path: String },
    #[error("request to {path} failed with {status}: {message}")]
    Status {
        path: String,
        status: StatusCode,
        message: String,
    },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::SessionExpired { .. })
    }
}

/// Client-side input checks that block a request before it is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("comment is empty")]
    EmptyComment,
    #[error("comment is {len} characters; the limit is {max}")]
    CommentTooLong { len: usize, max: usize },
    #[error("verification code must be 6 digits")]
    MalformedCode,
    #[error("a verification code was sent recently; wait before requesting another")]
    ResendCoolingDown,
}
