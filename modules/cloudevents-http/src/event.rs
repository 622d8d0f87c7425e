//! The CloudEvents context attributes plus an optional JSON payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Spec version stamped on events created by [`Event::new`].
pub const SPEC_VERSION: &str = "1.0";

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";

/// A single notification. Immutable once built: the `with_*` builders consume
/// and return the event, and there are no setters.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub(crate) spec_version: String,
    pub(crate) id: String,
    pub(crate) event_type: String,
    pub(crate) source: String,
    pub(crate) time: Option<DateTime<Utc>>,
    pub(crate) data_content_type: Option<String>,
    pub(crate) data: Option<serde_json::Value>,
    pub(crate) extensions: BTreeMap<String, String>,
}

impl Event {
    /// New event with a fresh UUID id and the current time.
    pub fn new(event_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            spec_version: SPEC_VERSION.to_string(),
            id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            source: source.into(),
            time: Some(Utc::now()),
            data_content_type: None,
            data: None,
            extensions: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a JSON payload; the content type becomes `application/json`.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data_content_type = Some(JSON_CONTENT_TYPE.to_string());
        self.data = Some(data);
        self
    }

    /// Add an extension attribute. Names are lower-cased, matching how they
    /// travel as `ce-` headers.
    pub fn with_extension(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.extensions
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn spec_version(&self) -> &str {
        &self.spec_version
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn data_content_type(&self) -> Option<&str> {
        self.data_content_type.as_deref()
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    pub fn extension(&self, name: &str) -> Option<&str> {
        self.extensions
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn extensions(&self) -> &BTreeMap<String, String> {
        &self.extensions
    }
}
