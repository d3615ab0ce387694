//! Error definitions for charset negotiation and transcoding.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors that can occur while transcoding a request or a response.
#[derive(Debug, Error)]
pub enum CharsetError {
    /// Request bytes are not valid in the legacy encoding.
    #[error("input is not valid {encoding}")]
    Decode { encoding: &'static str },

    /// Response text cannot be represented in the legacy encoding.
    #[error("output cannot be represented in {encoding}")]
    Encode { encoding: &'static str },

    /// A buffered body exceeded its configured limit.
    #[error("body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize },

    /// The body stream failed while being buffered.
    #[error("failed to read body: {0}")]
    Body(String),

    /// Header mutation attempted after the status line was sent.
    #[error("headers already sent")]
    HeadersSent,

    /// The configured label names no known encoding.
    #[error("unknown encoding label: {0}")]
    UnknownEncoding(String),

    /// The configured label resolves to an encoding that cannot act as a legacy charset.
    #[error("unsupported legacy encoding: {0}")]
    UnsupportedEncoding(&'static str),

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    /// The rewritten request target is not a valid URI.
    #[error("invalid request target: {0}")]
    InvalidUri(String),
}

impl CharsetError {
    /// Status code used when the error aborts a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CharsetError::Decode { .. } | CharsetError::Body(_) | CharsetError::InvalidUri(_) => {
                StatusCode::BAD_REQUEST
            }
            CharsetError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CharsetError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            CharsetError::Decode { encoding: "GBK" }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CharsetError::BodyTooLarge { limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            CharsetError::Encode { encoding: "GBK" }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
