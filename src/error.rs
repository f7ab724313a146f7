//! Unified error type.

use http::StatusCode;
use thiserror::Error;

use crate::constraint::InvalidParameter;

/// The error type returned by restparam's fallible operations.
///
/// Handlers return `Result<_, Error>`; the error converts into a JSON
/// response through [`IntoResponse`](crate::IntoResponse), with the status
/// given by [`Error::status`].
#[derive(Debug, Error)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A programming error: unknown method, unknown param, bad pattern.
    #[error("{0}")]
    InvalidArgument(String),

    /// The client sent a combination of parameters that cannot be served.
    #[error("{0}")]
    BadRequest(String),

    /// A strict param failed validation.
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameter),

    /// No route matches the request path.
    #[error("No route found for \"{0}\".")]
    NotFound(String),

    /// The request body could not be decoded.
    #[error("malformed request body: {0}")]
    Body(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// HTTP status this error maps to when returned from a handler.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidParameter(_) | Self::Body(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Io(_) | Self::InvalidArgument(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
