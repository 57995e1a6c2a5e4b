//! Error types for the pets client.
//!
//! # Design
//! Every failed round trip surfaces as a `RequestError`. Transport problems
//! (unreachable server, malformed body) and backend-reported validation
//! problems share the type; the latter carry a `FieldErrors` mapping so a form
//! can show a message next to each field. `NotFound` keeps its dedicated
//! variant because callers frequently distinguish "the pet is gone" from "the
//! server returned an unexpected status."

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::form::FormState;
use crate::types::UnknownKind;

/// Errors returned by `PetClient` parse methods and by a `Transport`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    /// The server returned 404, the requested pet does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server rejected the payload and said which fields are wrong.
    #[error("HTTP {status}: {fields}")]
    Validation { status: u16, fields: FieldErrors },

    /// The server returned a non-2xx status without a field breakdown.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),
}

impl RequestError {
    /// Field-level messages, when the backend supplied them.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            RequestError::Validation { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// A single message suitable for showing to the user.
    pub fn message(&self) -> String {
        match self {
            RequestError::HttpError { status, body } => {
                generic_message(body).unwrap_or_else(|| format!("request failed with status {status}"))
            }
            RequestError::Transport(_) => "could not reach the server".to_string(),
            other => other.to_string(),
        }
    }
}

/// Validation messages keyed by field name, in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Key under which a message without a field breakdown is stored.
    pub const BASE: &'static str = "base";

    pub fn new() -> Self {
        Self::default()
    }

    /// A mapping holding one message that belongs to no particular field.
    pub fn generic(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(Self::BASE, message);
        errors
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Extract a field mapping from a failure body.
    ///
    /// Accepts `{"errors": {..}}` or a bare object whose values are strings or
    /// arrays of strings. An object holding only `message` or `error` is a
    /// generic failure, not a field mapping.
    pub fn from_body(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        let object = match value.get("errors") {
            Some(Value::Object(map)) => map,
            _ => value.as_object()?,
        };
        if object.is_empty() {
            return None;
        }
        if object.len() == 1 && (object.contains_key("message") || object.contains_key("error")) {
            return None;
        }

        let mut fields = BTreeMap::new();
        for (field, message) in object {
            let message = match message {
                Value::String(s) => s.clone(),
                Value::Array(items) => {
                    let parts: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
                    parts?.join(", ")
                }
                _ => return None,
            };
            fields.insert(field.clone(), message);
        }
        Some(Self(fields))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Pull a human message out of a generic failure body.
fn generic_message(body: &str) -> Option<String> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        return ["message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string);
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Errors from turning a selected file into an embeddable photo.
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("no image data")]
    Empty,

    #[error("not a supported image format")]
    UnsupportedFormat,

    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("could not read image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding task failed: {0}")]
    Join(String),
}

/// Misuse of a form session's state machine or bad field input.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("form is not editable while {state}")]
    NotEditable { state: FormState },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error(transparent)]
    Kind(#[from] UnknownKind),

    #[error(transparent)]
    Photo(#[from] PhotoError),
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
