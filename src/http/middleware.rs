//! Charset transcoding middleware.
//!
//! # Responsibilities
//! - Detect legacy-charset clients from the negotiation header
//! - Decode POST form fields into UTF-8 before the handler runs
//! - Transcode the handler's response back into the legacy charset
//!
//! # Design Decisions
//! - Pass-through requests reach the handler untouched and their response
//!   is returned as-is
//! - Decode failures end the request with 400; the handler never runs
//! - Encode failures end the response with an empty 500, never with
//!   partially transcoded bytes

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{
        header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE},
        request, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use mime::Mime;

use crate::charset::{
    decode_fields, BufferedResponse, CharsetError, Codec, DecodedForm, EncodingRsCodec,
    Negotiator, RawFormFields, ResponseWriter, TranscodingWriter,
};
use crate::config::CharsetConfig;
use crate::observability::metrics;

/// Shared, immutable middleware state.
#[derive(Debug, Clone)]
pub struct CharsetState {
    negotiator: Negotiator,
    codec: Arc<dyn Codec>,
    max_request_body: usize,
    max_response_body: usize,
}

impl CharsetState {
    /// Build the state from configuration, resolving the codec by label.
    pub fn from_config(config: &CharsetConfig) -> Result<Self, CharsetError> {
        let codec = EncodingRsCodec::for_label(config.encoding_label())?;
        Ok(Self {
            negotiator: Negotiator::from_config(config)?,
            codec: Arc::new(codec),
            max_request_body: config.max_request_body_bytes,
            max_response_body: config.max_response_body_bytes,
        })
    }

    /// Replace the codec, keeping the header policy and limits.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }
}

/// Middleware function for legacy charset transcoding.
pub async fn transcode_charset(
    State(state): State<Arc<CharsetState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let legacy = state.negotiator.is_legacy(request.headers());
    metrics::record_request(legacy);

    if !legacy {
        tracing::trace!(method = %request.method(), path = %request.uri().path(), "Charset pass-through");
        return next.run(request).await;
    }

    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        charset = %state.negotiator.token(),
        "Legacy charset request"
    );

    let request = if request.method() == Method::POST {
        match decode_request_form(&state, request).await {
            Ok(request) => request,
            Err(e) => {
                if matches!(e, CharsetError::Decode { .. }) {
                    metrics::record_transcode_error("decode");
                }
                let status = e.status_code();
                tracing::warn!(error = %e, status = %status, "Rejecting legacy form request");
                metrics::record_rejected(status.as_u16());
                return e.into_response();
            }
        }
    } else {
        request
    };

    let response = next.run(request).await;
    encode_response(&state, response).await
}

/// Decode the query and form body of a legacy POST request.
///
/// The decoded maps are attached as a [`DecodedForm`] extension, and the
/// body and query are rewritten in UTF-8 so stock extractors agree with it.
async fn decode_request_form(
    state: &CharsetState,
    request: Request<Body>,
) -> Result<Request<Body>, CharsetError> {
    let (mut parts, body) = request.into_parts();

    let raw_query = RawFormFields::parse(parts.uri.query().unwrap_or_default().as_bytes());

    // Only urlencoded bodies are read; anything else streams through as-is.
    let (raw_post, passthrough) = if is_form_urlencoded(&parts.headers) {
        let bytes = read_body(&parts, body, state.max_request_body).await?;
        (RawFormFields::parse(&bytes), None)
    } else {
        (RawFormFields::default(), Some(body))
    };

    let mut raw_all = raw_post.clone();
    raw_all.extend(&raw_query);

    let codec = state.codec();
    let post_form = decode_fields(&raw_post, codec)?;
    let form = decode_fields(&raw_all, codec)?;

    if parts.uri.query().is_some() {
        let query = decode_fields(&raw_query, codec)?;
        parts.uri = replace_query(&parts.uri, &query.to_urlencoded())?;
    }

    let body = match passthrough {
        Some(body) => body,
        None => {
            let encoded = post_form.to_urlencoded();
            parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(encoded.len()));
            Body::from(encoded)
        }
    };

    tracing::debug!(
        post_fields = post_form.len(),
        fields = form.len(),
        "Decoded legacy form"
    );
    parts.extensions.insert(DecodedForm { post_form, form });

    Ok(Request::from_parts(parts, body))
}

async fn read_body(parts: &request::Parts, body: Body, limit: usize) -> Result<Bytes, CharsetError> {
    let declared = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(CharsetError::BodyTooLarge { limit });
    }

    to_bytes(body, limit)
        .await
        .map_err(|e| CharsetError::Body(e.to_string()))
}

fn is_form_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| Mime::from_str(ct).ok())
        .is_some_and(|ct| ct.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
}

fn replace_query(uri: &Uri, query: &str) -> Result<Uri, CharsetError> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut uri_parts = uri.clone().into_parts();
    uri_parts.path_and_query = Some(
        path_and_query
            .parse()
            .map_err(|_| CharsetError::InvalidUri(path_and_query.clone()))?,
    );
    Uri::from_parts(uri_parts).map_err(|e| CharsetError::InvalidUri(e.to_string()))
}

/// Drive the handler's response through a [`TranscodingWriter`].
async fn encode_response(state: &CharsetState, response: Response) -> Response {
    let (parts, body) = response.into_parts();

    // Already content-coded bytes are not text, and are not declared as
    // the legacy charset either.
    if parts.headers.contains_key(CONTENT_ENCODING) {
        tracing::debug!("Response is content-encoded, skipping transcoding");
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, state.max_response_body).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, limit = state.max_response_body, "Failed to buffer response body");
            return internal_error(state);
        }
    };

    let status = parts.status;
    let mut writer = TranscodingWriter::new(
        BufferedResponse::from_parts(parts),
        &state.negotiator,
        state.codec(),
    );

    // A plain 200 goes through the implicit path so the content type can
    // still be sniffed from the first write.
    if status != StatusCode::OK || bytes.is_empty() {
        writer.set_status(status);
    }
    if !bytes.is_empty() {
        if let Err(e) = writer.write(&bytes) {
            tracing::error!(error = %e, status = %status, "Failed to transcode response");
            metrics::record_transcode_error("encode");
            return internal_error(state);
        }
    }

    writer.into_inner().into_response()
}

fn internal_error(state: &CharsetState) -> Response {
    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    state.negotiator.stamp(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_form_urlencoded() {
        let mut headers = HeaderMap::new();
        assert!(!is_form_urlencoded(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Application/X-WWW-Form-Urlencoded; charset=gb2312"),
        );
        assert!(is_form_urlencoded(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data"));
        assert!(!is_form_urlencoded(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded-ish"),
        );
        assert!(!is_form_urlencoded(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; note=\"application/x-www-form-urlencoded\""),
        );
        assert!(!is_form_urlencoded(&headers));
    }

    #[test]
    fn test_replace_query() {
        let uri: Uri = "/search?q=%C4%E3".parse().unwrap();
        let uri = replace_query(&uri, "q=%E4%BD%A0").unwrap();
        assert_eq!(uri.to_string(), "/search?q=%E4%BD%A0");

        let uri = replace_query(&uri, "").unwrap();
        assert_eq!(uri.to_string(), "/search");
    }

    #[test]
    fn test_state_from_config() {
        let state = CharsetState::from_config(&CharsetConfig::default()).unwrap();
        assert_eq!(state.negotiator().token(), "gb2312");
        assert_eq!(state.codec().name(), "GBK");

        let config = CharsetConfig {
            encoding: Some("hz-gb-2312".into()),
            ..CharsetConfig::default()
        };
        assert!(CharsetState::from_config(&config).is_err());
    }

    #[test]
    fn test_with_codec() {
        let gb18030 = EncodingRsCodec::for_label("gb18030").unwrap();
        let state = CharsetState::from_config(&CharsetConfig::default())
            .unwrap()
            .with_codec(Arc::new(gb18030));
        assert_eq!(state.codec().name(), "gb18030");
        assert_eq!(state.negotiator().token(), "gb2312");
    }
}
