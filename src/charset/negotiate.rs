//! Charset negotiation.
//!
//! # Responsibilities
//! - Decide from the request header whether the legacy charset applies
//! - Stamp the negotiation header and its `Vary` entry on responses
//!
//! # Design Decisions
//! - Substring match, so compound values like `"foo,gb2312"` qualify
//! - A header value that is not visible ASCII counts as empty
//! - Stamping is idempotent: an existing negotiation header is left alone

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::charset::error::CharsetError;
use crate::config::CharsetConfig;

/// Header policy for one legacy charset.
#[derive(Debug, Clone)]
pub struct Negotiator {
    header: HeaderName,
    /// Header name as configured, used for the `Vary` entry.
    header_label: HeaderValue,
    token: String,
    token_value: HeaderValue,
    vary: HeaderName,
}

impl Negotiator {
    /// Create a negotiator for `header` carrying `token`, varying on `vary`.
    pub fn new(header: &str, token: &str, vary: &str) -> Result<Self, CharsetError> {
        let invalid = |name: &str| CharsetError::InvalidHeader(name.to_string());

        Ok(Self {
            header: HeaderName::from_bytes(header.as_bytes()).map_err(|_| invalid(header))?,
            header_label: HeaderValue::from_str(header).map_err(|_| invalid(header))?,
            token: token.to_string(),
            token_value: HeaderValue::from_str(token).map_err(|_| invalid(token))?,
            vary: HeaderName::from_bytes(vary.as_bytes()).map_err(|_| invalid(vary))?,
        })
    }

    pub fn from_config(config: &CharsetConfig) -> Result<Self, CharsetError> {
        Self::new(&config.header_name, &config.charset, &config.vary_header)
    }

    /// The charset token, e.g. `gb2312`.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header
    }

    /// True when the negotiation header announces the legacy charset.
    pub fn is_legacy(&self, headers: &HeaderMap) -> bool {
        let value = headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        value.contains(self.token.as_str())
    }

    /// Declare the legacy charset on a response.
    ///
    /// Returns false, touching nothing, when the negotiation header is
    /// already present.
    pub fn stamp(&self, headers: &mut HeaderMap) -> bool {
        if headers.contains_key(&self.header) {
            return false;
        }

        headers.insert(self.header.clone(), self.token_value.clone());
        if !self.varies_on_header(headers) {
            headers.append(self.vary.clone(), self.header_label.clone());
        }
        true
    }

    fn varies_on_header(&self, headers: &HeaderMap) -> bool {
        headers
            .get_all(&self.vary)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .any(|entry| entry == "*" || entry.eq_ignore_ascii_case(self.header.as_str()))
    }
}
