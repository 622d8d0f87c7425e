//! HTTP protocol binding: structured and binary content modes.
//!
//! Decoding accepts the 0.1 (`eventType`, `eventID`, ...), 0.2 and 1.0
//! attribute spellings. Encoding always writes 1.0 names.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::{Map, Value};

use crate::error::{CodecError, Result};
use crate::event::{Event, JSON_CONTENT_TYPE};

pub const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json; charset=utf-8";

const HEADER_PREFIX: &str = "ce-";

/// Escaped in `ce-*` header values. Non-ASCII bytes are always escaped.
const CE_HEADER: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'%');

const SPEC_VERSION_KEYS: &[&str] = &["specversion", "cloudEventsVersion"];
const ID_KEYS: &[&str] = &["id", "eventID"];
const TYPE_KEYS: &[&str] = &["type", "eventType"];
const SOURCE_KEYS: &[&str] = &["source"];
const TIME_KEYS: &[&str] = &["time", "eventTime"];
const CONTENT_TYPE_KEYS: &[&str] = &["datacontenttype", "contenttype", "contentType"];

/// How an event is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentMode {
    /// Whole event as one JSON document in the body.
    Structured,
    /// Context attributes as `ce-*` headers, data as the raw body.
    Binary,
}

impl ContentMode {
    /// Structured when the content type is `application/cloudevents+json`.
    pub fn detect(headers: &HeaderMap) -> Self {
        let is_structured = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| {
                ct.trim()
                    .to_ascii_lowercase()
                    .starts_with("application/cloudevents+json")
            })
            .unwrap_or(false);
        if is_structured {
            ContentMode::Structured
        } else {
            ContentMode::Binary
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentMode::Structured => f.write_str("structured"),
            ContentMode::Binary => f.write_str("binary"),
        }
    }
}

/// Headers and body ready to attach to an outgoing request.
#[derive(Debug, Clone)]
pub struct EncodedEvent {
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl EncodedEvent {
    pub fn apply(self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.headers(self.headers).body(self.body)
    }
}

pub fn encode(event: &Event, mode: ContentMode) -> Result<EncodedEvent> {
    match mode {
        ContentMode::Structured => encode_structured(event),
        ContentMode::Binary => encode_binary(event),
    }
}

fn encode_structured(event: &Event) -> Result<EncodedEvent> {
    let mut doc = Map::new();
    for (name, value) in context_attributes(event) {
        doc.insert(name, Value::String(value));
    }
    if let Some(data) = event.data() {
        doc.insert("data".to_string(), data.clone());
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(STRUCTURED_CONTENT_TYPE),
    );

    Ok(EncodedEvent {
        headers,
        body: serde_json::to_vec(&Value::Object(doc))?,
    })
}

fn encode_binary(event: &Event) -> Result<EncodedEvent> {
    let mut headers = HeaderMap::new();
    for (name, value) in context_attributes(event) {
        if name == "datacontenttype" {
            continue;
        }
        let header_name = format!("{HEADER_PREFIX}{name}");
        let header_name =
            HeaderName::from_bytes(header_name.as_bytes()).map_err(|e| {
                CodecError::InvalidHeader {
                    name: header_name.clone(),
                    message: e.to_string(),
                }
            })?;
        let escaped = utf8_percent_encode(&value, CE_HEADER).to_string();
        let header_value = HeaderValue::from_str(&escaped).map_err(|e| CodecError::InvalidHeader {
            name: header_name.to_string(),
            message: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    let content_type = event.data_content_type().unwrap_or(JSON_CONTENT_TYPE);
    let content_type =
        HeaderValue::from_str(content_type).map_err(|e| CodecError::InvalidHeader {
            name: CONTENT_TYPE.to_string(),
            message: e.to_string(),
        })?;
    headers.insert(CONTENT_TYPE, content_type);

    let body = match event.data() {
        Some(data) => serde_json::to_vec(data)?,
        None => Vec::new(),
    };

    Ok(EncodedEvent { headers, body })
}

/// Context attributes and extensions in 1.0 naming, as strings.
fn context_attributes(event: &Event) -> Vec<(String, String)> {
    let mut attrs = vec![
        ("specversion".to_string(), event.spec_version().to_string()),
        ("id".to_string(), event.id().to_string()),
        ("type".to_string(), event.event_type().to_string()),
        ("source".to_string(), event.source().to_string()),
    ];
    if let Some(time) = event.time() {
        attrs.push((
            "time".to_string(),
            time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ));
    }
    if let Some(ct) = event.data_content_type() {
        attrs.push(("datacontenttype".to_string(), ct.to_string()));
    }
    for (name, value) in event.extensions() {
        attrs.push((name.clone(), value.clone()));
    }
    attrs
}

/// Parse an inbound request into an [`Event`], detecting the content mode.
pub fn decode(headers: &HeaderMap, body: &[u8]) -> Result<Event> {
    match ContentMode::detect(headers) {
        ContentMode::Structured => decode_structured(body),
        ContentMode::Binary => decode_binary(headers, body),
    }
}

fn decode_structured(body: &[u8]) -> Result<Event> {
    let mut doc: Map<String, Value> = serde_json::from_slice(body)?;

    let spec_version = take_attribute(&mut doc, SPEC_VERSION_KEYS)
        .ok_or(CodecError::MissingAttribute("specversion"))?;
    let id = take_attribute(&mut doc, ID_KEYS).ok_or(CodecError::MissingAttribute("id"))?;
    let event_type =
        take_attribute(&mut doc, TYPE_KEYS).ok_or(CodecError::MissingAttribute("type"))?;
    let source =
        take_attribute(&mut doc, SOURCE_KEYS).ok_or(CodecError::MissingAttribute("source"))?;
    let time = take_attribute(&mut doc, TIME_KEYS)
        .map(|t| parse_time(&t))
        .transpose()?;
    let data_content_type = take_attribute(&mut doc, CONTENT_TYPE_KEYS);
    let data = doc.remove("data");

    let mut extensions = BTreeMap::new();
    // 0.1 nests extensions in their own object.
    if let Some(Value::Object(nested)) = doc.remove("extensions") {
        for (name, value) in nested {
            extensions.insert(name.to_ascii_lowercase(), attribute_string(value));
        }
    }
    for (name, value) in doc {
        extensions.insert(name.to_ascii_lowercase(), attribute_string(value));
    }

    Ok(Event {
        spec_version,
        id,
        event_type,
        source,
        time,
        data_content_type,
        data,
        extensions,
    })
}

fn decode_binary(headers: &HeaderMap, body: &[u8]) -> Result<Event> {
    let mut attrs: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Some(attr) = name.as_str().strip_prefix(HEADER_PREFIX) else {
            continue;
        };
        let raw = value.to_str().map_err(|e| CodecError::InvalidHeader {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|e| CodecError::InvalidHeader {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        attrs.insert(attr.to_string(), decoded.into_owned());
    }

    let spec_version = take_header(&mut attrs, SPEC_VERSION_KEYS)
        .ok_or(CodecError::MissingAttribute("specversion"))?;
    let id = take_header(&mut attrs, ID_KEYS).ok_or(CodecError::MissingAttribute("id"))?;
    let event_type =
        take_header(&mut attrs, TYPE_KEYS).ok_or(CodecError::MissingAttribute("type"))?;
    let source =
        take_header(&mut attrs, SOURCE_KEYS).ok_or(CodecError::MissingAttribute("source"))?;
    let time = take_header(&mut attrs, TIME_KEYS)
        .map(|t| parse_time(&t))
        .transpose()?;

    let data_content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let data = if body.is_empty() {
        None
    } else if data_content_type
        .as_deref()
        .is_none_or(|ct| ct.to_ascii_lowercase().contains("json"))
    {
        Some(serde_json::from_slice(body)?)
    } else {
        Some(Value::String(String::from_utf8_lossy(body).into_owned()))
    };

    Ok(Event {
        spec_version,
        id,
        event_type,
        source,
        time,
        data_content_type,
        data,
        extensions: attrs,
    })
}

fn take_attribute(doc: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let mut found = None;
    for key in keys {
        if let Some(value) = doc.remove(*key) {
            found.get_or_insert(attribute_string(value));
        }
    }
    found
}

/// Header names arrive lower-cased, so legacy camelCase keys are folded.
fn take_header(attrs: &mut BTreeMap<String, String>, keys: &[&str]) -> Option<String> {
    let mut found = None;
    for key in keys {
        if let Some(value) = attrs.remove(&key.to_ascii_lowercase()) {
            found.get_or_insert(value);
        }
    }
    found
}

fn attribute_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
