//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! middleware and its demo server. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Demo server settings.
    pub server: ServerConfig,

    /// Legacy charset negotiation and transcoding.
    pub charset: CharsetConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Demo server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Charset middleware configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CharsetConfig {
    /// Request header that announces the legacy charset.
    pub header_name: String,

    /// Charset token looked for in the header and declared on responses.
    pub charset: String,

    /// WHATWG encoding label used for transcoding. Defaults to `charset`.
    pub encoding: Option<String>,

    /// Header that records the negotiation for caches.
    pub vary_header: String,

    /// Largest request body buffered for form decoding.
    pub max_request_body_bytes: usize,

    /// Largest response body buffered for transcoding.
    pub max_response_body_bytes: usize,
}

impl CharsetConfig {
    /// Label handed to the codec.
    pub fn encoding_label(&self) -> &str {
        self.encoding.as_deref().unwrap_or(&self.charset)
    }
}

impl Default for CharsetConfig {
    fn default() -> Self {
        Self {
            header_name: "Accept-Charset".to_string(),
            charset: "gb2312".to_string(),
            encoding: None,
            vary_header: "Vary".to_string(),
            max_request_body_bytes: 2 * 1024 * 1024, // 2MB
            max_response_body_bytes: 8 * 1024 * 1024, // 8MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
