//! URL-encoded form fields and their legacy → UTF-8 decoding.
//!
//! # Responsibilities
//! - Parse `application/x-www-form-urlencoded` input into raw byte fields
//! - Decode every key and value through the legacy codec
//! - Merge values whose keys decode to the same text
//!
//! # Design Decisions
//! - Parsing keeps bytes: percent-decoding before charset decoding, never
//!   the other way round
//! - Field maps keep insertion order and all values of repeated keys
//! - A single undecodable byte sequence fails the whole map

use std::borrow::Cow;

use percent_encoding::percent_decode;

use crate::charset::codec::Codec;
use crate::charset::error::CharsetError;

/// Ordered multi-valued field map with raw (undecoded) keys and values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFormFields {
    entries: Vec<(Vec<u8>, Vec<Vec<u8>>)>,
}

impl RawFormFields {
    /// Parse URL-encoded input. `+` is a space; empty pairs are skipped.
    pub fn parse(input: &[u8]) -> Self {
        let mut fields = Self::default();
        for pair in input.split(|&b| b == b'&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.iter().position(|&b| b == b'=') {
                Some(i) => (&pair[..i], &pair[i + 1..]),
                None => (pair, &[][..]),
            };
            fields.add(unescape(key), unescape(value));
        }
        fields
    }

    pub fn add(&mut self, key: Vec<u8>, value: Vec<u8>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Append every value of `other` after the values already held.
    pub fn extend(&mut self, other: &RawFormFields) {
        for (key, values) in &other.entries {
            for value in values {
                self.add(key.clone(), value.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[Vec<u8>])> {
        self.entries.iter().map(|(k, vs)| (k.as_slice(), vs.as_slice()))
    }
}

fn unescape(input: &[u8]) -> Vec<u8> {
    let replaced: Cow<'_, [u8]> = if input.contains(&b'+') {
        Cow::Owned(input.iter().map(|&b| if b == b'+' { b' ' } else { b }).collect())
    } else {
        Cow::Borrowed(input)
    };
    percent_decode(&replaced).collect()
}

/// Ordered multi-valued field map in UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    entries: Vec<(String, Vec<String>)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, vs)| vs.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Replace all values of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => *values = vec![value.into()],
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    /// Add `value` after any values already stored under `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into()),
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Every key/value pair, in order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Serialize as UTF-8 `application/x-www-form-urlencoded`.
    pub fn to_urlencoded(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }
}

/// Decoded form data attached to a request as an extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedForm {
    /// Fields from the POST body only.
    pub post_form: FormFields,
    /// POST body fields followed by query string fields.
    pub form: FormFields,
}

/// Decode every key and value of `raw` from the legacy encoding.
///
/// Values whose keys decode to the same text are merged under that key in
/// order: the first is set, the rest are appended.
pub fn decode_fields(raw: &RawFormFields, codec: &dyn Codec) -> Result<FormFields, CharsetError> {
    let mut decoded = FormFields::new();
    for (key, values) in raw.iter() {
        let key = codec.decode(key)?;
        for value in values {
            let value = codec.decode(value)?;
            if decoded.contains_key(&key) {
                decoded.append(key.as_str(), value);
            } else {
                decoded.set(key.as_str(), value);
            }
        }
    }
    Ok(decoded)
}
