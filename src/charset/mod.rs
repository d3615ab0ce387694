//! Legacy charset subsystem.
//!
//! # Data Flow
//! ```text
//! Request:
//!     → negotiate.rs (does the client speak the legacy charset?)
//!     → form.rs (percent-decode, then legacy → UTF-8 per key and value)
//!     → application sees UTF-8 only
//!
//! Response:
//!     → writer.rs (TranscodingWriter: UTF-8 → legacy, header bookkeeping)
//!     → sniff.rs (content type for bodies that declare none)
//!     → client receives the legacy charset
//! ```
//!
//! # Design Decisions
//! - The codec sits behind a trait; `encoding_rs` provides the tables
//! - Header names and the charset token come from configuration
//! - Whole payloads are buffered; there is no streaming transcoder

pub mod codec;
pub mod error;
pub mod form;
pub mod negotiate;
pub mod sniff;
pub mod writer;

pub use codec::{Codec, EncodingRsCodec};
pub use error::CharsetError;
pub use form::{decode_fields, DecodedForm, FormFields, RawFormFields};
pub use negotiate::Negotiator;
pub use writer::{BufferedResponse, ResponseWriter, TranscodingWriter, WriterState};
