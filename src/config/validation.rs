//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check header names and the charset token are valid HTTP
//! - Check the encoding label resolves to a usable legacy encoding
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::charset::EncodingRsCodec;
use crate::config::schema::AppConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid header name {value:?}")]
    HeaderName { field: &'static str, value: String },

    #[error("charset token must be a non-empty header value, got {0:?}")]
    CharsetToken(String),

    #[error("encoding: {0}")]
    Encoding(String),

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("server.bind_address: invalid socket address {0:?}")]
    BindAddress(String),
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let charset = &config.charset;

    for (field, value) in [
        ("charset.header_name", &charset.header_name),
        ("charset.vary_header", &charset.vary_header),
    ] {
        if HeaderName::from_bytes(value.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName {
                field,
                value: value.clone(),
            });
        }
    }

    if charset.charset.trim().is_empty() || HeaderValue::from_str(&charset.charset).is_err() {
        errors.push(ValidationError::CharsetToken(charset.charset.clone()));
    }

    if let Err(e) = EncodingRsCodec::for_label(charset.encoding_label()) {
        errors.push(ValidationError::Encoding(e.to_string()));
    }

    if charset.max_request_body_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("charset.max_request_body_bytes"));
    }
    if charset.max_response_body_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("charset.max_response_body_bytes"));
    }

    if config.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.charset.header_name = "Accept Charset".into();
        config.charset.charset = "".into();
        config.charset.encoding = Some("utf-8".into());
        config.charset.max_response_body_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::HeaderName { field: "charset.header_name", .. }));
        assert_eq!(errors[1], ValidationError::CharsetToken(String::new()));
        assert!(matches!(errors[2], ValidationError::Encoding(_)));
        assert_eq!(errors[3], ValidationError::ZeroLimit("charset.max_response_body_bytes"));
    }

    #[test]
    fn test_unknown_encoding_label() {
        let mut config = AppConfig::default();
        config.charset.charset = "not-a-charset".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::Encoding(
                "unknown encoding label: not-a-charset".into()
            )]
        );
    }
}
