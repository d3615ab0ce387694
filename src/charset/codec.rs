//! Legacy charset codec.
//!
//! # Responsibilities
//! - Decode legacy-encoded bytes into UTF-8 text
//! - Encode UTF-8 text into the legacy encoding
//!
//! # Design Decisions
//! - Both directions are strict: malformed or unmappable input is an error,
//!   never silently replaced
//! - Encodings are looked up by WHATWG label through `encoding_rs`
//!   (`gb2312` resolves to GBK)

use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8};

use crate::charset::error::CharsetError;

/// Conversion between the legacy encoding and UTF-8.
pub trait Codec: Send + Sync + std::fmt::Debug {
    /// Canonical name of the legacy encoding.
    fn name(&self) -> &'static str;

    /// Legacy bytes → UTF-8 text.
    fn decode(&self, input: &[u8]) -> Result<String, CharsetError>;

    /// UTF-8 bytes → legacy bytes.
    fn encode(&self, input: &[u8]) -> Result<Vec<u8>, CharsetError>;
}

/// [`Codec`] backed by an `encoding_rs` encoding.
#[derive(Debug, Clone, Copy)]
pub struct EncodingRsCodec {
    encoding: &'static Encoding,
}

impl EncodingRsCodec {
    /// Look up the encoding for a WHATWG label such as `gb2312` or `gbk`.
    pub fn for_label(label: &str) -> Result<Self, CharsetError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| CharsetError::UnknownEncoding(label.to_string()))?;

        // UTF-8 is the native side; the others cannot round-trip through encode().
        if encoding == UTF_8
            || encoding == REPLACEMENT
            || encoding == UTF_16LE
            || encoding == UTF_16BE
        {
            return Err(CharsetError::UnsupportedEncoding(encoding.name()));
        }

        Ok(Self { encoding })
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }
}

impl Codec for EncodingRsCodec {
    fn name(&self) -> &'static str {
        self.encoding.name()
    }

    fn decode(&self, input: &[u8]) -> Result<String, CharsetError> {
        self.encoding
            .decode_without_bom_handling_and_without_replacement(input)
            .map(|text| text.into_owned())
            .ok_or(CharsetError::Decode {
                encoding: self.encoding.name(),
            })
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>, CharsetError> {
        let err = CharsetError::Encode {
            encoding: self.encoding.name(),
        };
        let text = std::str::from_utf8(input).map_err(|_| err)?;

        let (bytes, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            return Err(CharsetError::Encode {
                encoding: self.encoding.name(),
            });
        }
        Ok(bytes.into_owned())
    }
}
