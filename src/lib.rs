//! Legacy charset middleware for axum.
//!
//! Lets an application written entirely in UTF-8 serve clients that only
//! speak a legacy Chinese charset (GB2312 by default): form fields are
//! decoded on the way in, response bodies are transcoded on the way out.

pub mod charset;
pub mod config;
pub mod http;
pub mod observability;

pub use charset::{CharsetError, DecodedForm, FormFields};
pub use config::AppConfig;
pub use http::{transcode_charset, CharsetState, HttpServer};
