//! Response writers.
//!
//! # Responsibilities
//! - Define the narrow writer capability the transcoder decorates
//! - Buffer a response so it can be rebuilt after transcoding
//! - Transcode every write into the legacy charset
//!
//! # State machine
//! ```text
//! Unstarted ──set_status──▶ HeadersSent ──write──▶ BodyWritten ─┐
//!     │                                                ▲       │
//!     └──────────write (implies status 200)────────────┘◀──write┘
//! ```
//! Headers are mutable only in `Unstarted`.

use axum::{
    body::Body,
    http::{header, response::Parts, HeaderMap, HeaderValue, Response, StatusCode},
};

use crate::charset::codec::Codec;
use crate::charset::error::CharsetError;
use crate::charset::negotiate::Negotiator;
use crate::charset::sniff;

/// Progress of a response through its writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Unstarted,
    HeadersSent,
    BodyWritten,
}

/// Minimal response writer capability.
pub trait ResponseWriter {
    fn headers(&self) -> &HeaderMap;

    /// Mutable headers, or `None` once the status has been sent.
    fn headers_mut(&mut self) -> Option<&mut HeaderMap>;

    /// Send the status line and headers. Later calls are ignored.
    fn set_status(&mut self, status: StatusCode);

    /// Write body bytes, returning how many bytes of `buf` were consumed.
    fn write(&mut self, buf: &[u8]) -> Result<usize, CharsetError>;
}

/// Writer that collects a response in memory.
#[derive(Debug)]
pub struct BufferedResponse {
    head: Parts,
    body: Vec<u8>,
    state: WriterState,
}

impl BufferedResponse {
    pub fn new() -> Self {
        let (head, ()) = Response::new(()).into_parts();
        Self::from_parts(head)
    }

    /// Start from an existing response head; status, version, headers and
    /// extensions carry over.
    pub fn from_parts(head: Parts) -> Self {
        Self {
            head,
            body: Vec::new(),
            state: WriterState::Unstarted,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response<Body> {
        Response::from_parts(self.head, Body::from(self.body))
    }
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter for BufferedResponse {
    fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    fn headers_mut(&mut self) -> Option<&mut HeaderMap> {
        match self.state {
            WriterState::Unstarted => Some(&mut self.head.headers),
            _ => None,
        }
    }

    fn set_status(&mut self, status: StatusCode) {
        if self.state != WriterState::Unstarted {
            tracing::warn!(status = %status, "superfluous set_status call ignored");
            return;
        }
        self.head.status = status;
        self.state = WriterState::HeadersSent;
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, CharsetError> {
        if self.state == WriterState::Unstarted {
            self.set_status(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        self.state = WriterState::BodyWritten;
        Ok(buf.len())
    }
}

/// Decorator that transcodes everything written through it into the
/// legacy charset.
#[derive(Debug)]
pub struct TranscodingWriter<'a, W> {
    inner: W,
    negotiator: &'a Negotiator,
    codec: &'a dyn Codec,
    state: WriterState,
}

impl<'a, W: ResponseWriter> TranscodingWriter<'a, W> {
    pub fn new(inner: W, negotiator: &'a Negotiator, codec: &'a dyn Codec) -> Self {
        Self {
            inner,
            negotiator,
            codec,
            state: WriterState::Unstarted,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Final header bookkeeping before the status goes out.
    fn finalize_headers(&mut self) {
        let token = self.negotiator.token();
        let Some(headers) = self.inner.headers_mut() else {
            return;
        };

        self.negotiator.stamp(headers);

        let declared = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|ct| sniff::rewrite_utf8_charset(ct, token))
            .and_then(|ct| HeaderValue::from_str(&ct).ok());
        if let Some(content_type) = declared {
            headers.insert(header::CONTENT_TYPE, content_type);
        }

        // Transcoding changes the payload size.
        headers.remove(header::CONTENT_LENGTH);
    }

    fn sniff_content_type(&mut self, encoded: &[u8]) {
        let token = self.negotiator.token();
        let Some(headers) = self.inner.headers_mut() else {
            return;
        };
        if headers.contains_key(header::CONTENT_TYPE) {
            return;
        }

        let sniffed = sniff::detect_content_type(encoded);
        let content_type = sniff::substitute_charset(sniffed, token)
            .unwrap_or_else(|| sniffed.to_string());
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
    }
}

impl<W: ResponseWriter> ResponseWriter for TranscodingWriter<'_, W> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> Option<&mut HeaderMap> {
        match self.state {
            WriterState::Unstarted => self.inner.headers_mut(),
            _ => None,
        }
    }

    fn set_status(&mut self, status: StatusCode) {
        if self.state != WriterState::Unstarted {
            tracing::warn!(status = %status, "status already sent, ignoring");
            return;
        }
        self.finalize_headers();
        self.inner.set_status(status);
        self.state = WriterState::HeadersSent;
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, CharsetError> {
        let encoded = self.codec.encode(buf)?;

        if self.state == WriterState::Unstarted {
            self.sniff_content_type(&encoded);
            self.set_status(StatusCode::OK);
        }

        self.inner.write(&encoded)?;
        self.state = WriterState::BodyWritten;
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::codec::EncodingRsCodec;
    use axum::http::header::{ACCEPT_CHARSET, CONTENT_LENGTH, CONTENT_TYPE, VARY};

    fn parts() -> (Negotiator, EncodingRsCodec) {
        (
            Negotiator::new("Accept-Charset", "gb2312", "Vary").unwrap(),
            EncodingRsCodec::for_label("gb2312").unwrap(),
        )
    }

    #[test]
    fn test_write_transcodes_and_reports_input_length() {
        let (negotiator, codec) = parts();
        let mut writer = TranscodingWriter::new(BufferedResponse::new(), &negotiator, &codec);

        let input = "你好".as_bytes();
        assert_eq!(writer.write(input).unwrap(), input.len());
        assert_eq!(writer.state(), WriterState::BodyWritten);

        let inner = writer.into_inner();
        assert_eq!(inner.body(), &[0xC4, 0xE3, 0xBA, 0xC3]);
        assert_eq!(inner.status(), StatusCode::OK);
    }

    #[test]
    fn test_implicit_status_sniffs_and_stamps() {
        let (negotiator, codec) = parts();
        let mut writer = TranscodingWriter::new(BufferedResponse::new(), &negotiator, &codec);
        writer.write(b"OK").unwrap();

        let headers = writer.headers();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain; charset=gb2312");
        assert_eq!(headers.get(ACCEPT_CHARSET).unwrap(), "gb2312");
        assert_eq!(headers.get(VARY).unwrap(), "Accept-Charset");
    }

    #[test]
    fn test_sniffed_type_without_charset_kept() {
        let (negotiator, codec) = parts();
        let mut writer = TranscodingWriter::new(BufferedResponse::new(), &negotiator, &codec);
        writer.write(b"GIF89a").unwrap();
        assert_eq!(writer.headers().get(CONTENT_TYPE).unwrap(), "image/gif");
    }

    #[test]
    fn test_content_length_removed() {
        let (negotiator, codec) = parts();
        let mut writer = TranscodingWriter::new(BufferedResponse::new(), &negotiator, &codec);
        writer
            .headers_mut()
            .unwrap()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("6"));
        writer.set_status(StatusCode::CREATED);
        writer.write("测试".as_bytes()).unwrap();

        let inner = writer.into_inner();
        assert!(inner.headers().get(CONTENT_LENGTH).is_none());
        assert_eq!(inner.status(), StatusCode::CREATED);
        assert_eq!(inner.body().len(), 4);
    }

    #[test]
    fn test_declared_utf8_charset_rewritten() {
        let (negotiator, codec) = parts();
        let mut writer = TranscodingWriter::new(BufferedResponse::new(), &negotiator, &codec);
        writer.headers_mut().unwrap().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        writer.write(b"<p>hi</p>").unwrap();
        assert_eq!(
            writer.headers().get(CONTENT_TYPE).unwrap(),
            "text/html; charset=gb2312"
        );
    }

    #[test]
    fn test_headers_frozen_after_status() {
        let (negotiator, codec) = parts();
        let mut writer = TranscodingWriter::new(BufferedResponse::new(), &negotiator, &codec);
        writer.set_status(StatusCode::NOT_FOUND);
        assert_eq!(writer.state(), WriterState::HeadersSent);
        assert!(writer.headers_mut().is_none());

        // A second status is ignored.
        writer.set_status(StatusCode::OK);
        assert_eq!(writer.into_inner().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_no_sniffing_after_status() {
        let (negotiator, codec) = parts();
        let mut writer = TranscodingWriter::new(BufferedResponse::new(), &negotiator, &codec);
        writer.set_status(StatusCode::OK);
        writer.write(b"OK").unwrap();
        assert!(writer.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_encode_failure_forwards_nothing() {
        let (negotiator, codec) = parts();
        let mut writer = TranscodingWriter::new(BufferedResponse::new(), &negotiator, &codec);

        let result = writer.write("😀".as_bytes());
        assert!(matches!(result, Err(CharsetError::Encode { .. })));
        assert_eq!(writer.state(), WriterState::Unstarted);

        writer.write(b"after").unwrap();
        assert_eq!(writer.into_inner().body(), b"after");
    }

    #[test]
    fn test_existing_negotiation_header_kept() {
        let (negotiator, codec) = parts();
        let mut writer = TranscodingWriter::new(BufferedResponse::new(), &negotiator, &codec);
        writer
            .headers_mut()
            .unwrap()
            .insert(ACCEPT_CHARSET, HeaderValue::from_static("gb2312, gbk"));
        writer.write(b"OK").unwrap();

        let headers = writer.headers();
        assert_eq!(headers.get(ACCEPT_CHARSET).unwrap(), "gb2312, gbk");
        assert!(headers.get(VARY).is_none());
    }

    #[test]
    fn test_buffered_response_rebuilds_response() {
        let mut buffered = BufferedResponse::new();
        buffered
            .headers_mut()
            .unwrap()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        buffered.write(b"a").unwrap();
        buffered.write(b"b").unwrap();
        assert!(buffered.headers_mut().is_none());

        let response = buffered.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
    }
}
