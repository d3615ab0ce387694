//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing, timeout)
//!     → middleware.rs (negotiate, decode form, wrap response)
//!     → application handler (UTF-8 only)
//!     → middleware.rs (transcode response)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;

pub use middleware::{transcode_charset, CharsetState};
pub use server::{app, HttpServer};
