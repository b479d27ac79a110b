#![forbid(unsafe_code)]

//! Control requests emitted by the compiled script.
//!
//! Each frame the compiler returns a `context_requests` array. Entries are
//! tagged by `type`; the ones that describe a widget become
//! [`ControlRequest`]s and everything else is reported as a
//! [`MalformedRequest`] and skipped.
//!
//! The compiler spells slider fields `def_val` / `min_val` / `max_val`; the
//! shorter `value` / `lo` / `hi` are accepted as well.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::{ControlValue, WidgetKind};

/// Request kinds the compiler emits that never materialize as a widget.
const NON_WIDGET_KINDS: &[&str] = &["LoadedImageRequest", "CachedImageRequest", "ColorRequest"];

/// One declarative widget request for the current frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ControlRequest {
    #[serde(rename = "FloatRequest")]
    Float {
        name: String,
        value: f64,
        lo: f64,
        hi: f64,
    },
    #[serde(rename = "IntRequest")]
    Int {
        name: String,
        value: i64,
        lo: i64,
        hi: i64,
    },
    #[serde(rename = "BoolRequest")]
    Bool { name: String, value: bool },
    #[serde(rename = "TextRequest")]
    Text { text: String },
}

impl ControlRequest {
    /// Shorthand for a float slider request.
    #[must_use]
    pub fn float(name: impl Into<String>, value: f64, lo: f64, hi: f64) -> Self {
        Self::Float {
            name: name.into(),
            value,
            lo,
            hi,
        }
    }

    /// Shorthand for an integer slider request.
    #[must_use]
    pub fn int(name: impl Into<String>, value: i64, lo: i64, hi: i64) -> Self {
        Self::Int {
            name: name.into(),
            value,
            lo,
            hi,
        }
    }

    /// Shorthand for a checkbox request.
    #[must_use]
    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self::Bool {
            name: name.into(),
            value,
        }
    }

    /// Shorthand for a text output request.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Script-supplied identity. Text requests have none.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Float { name, .. } | Self::Int { name, .. } | Self::Bool { name, .. } => {
                Some(name)
            }
            Self::Text { .. } => None,
        }
    }

    /// Widget kind this request materializes as.
    #[must_use]
    pub const fn kind(&self) -> WidgetKind {
        match self {
            Self::Float { .. } => WidgetKind::SliderFloat,
            Self::Int { .. } => WidgetKind::SliderInt,
            Self::Bool { .. } => WidgetKind::Checkbox,
            Self::Text { .. } => WidgetKind::TextBlock,
        }
    }

    /// The value the script declared. Only used when a widget is created.
    #[must_use]
    pub fn declared_value(&self) -> ControlValue {
        match self {
            Self::Float { value, .. } => ControlValue::Float(*value),
            Self::Int { value, .. } => ControlValue::Int(*value),
            Self::Bool { value, .. } => ControlValue::Bool(*value),
            Self::Text { text } => ControlValue::Text(text.clone()),
        }
    }

    /// Slider range as floats, for the host's `min`/`max` attributes.
    #[must_use]
    pub fn range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Float { lo, hi, .. } => Some((*lo, *hi)),
            Self::Int { lo, hi, .. } => Some((*lo as f64, *hi as f64)),
            Self::Bool { .. } | Self::Text { .. } => None,
        }
    }
}

/// Wire shape of a widget request, before defaults are applied. A missing
/// value is `0` (or `false`), whatever the range.
#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawRequest {
    FloatRequest {
        name: String,
        #[serde(default, alias = "def_val")]
        value: Option<f64>,
        #[serde(alias = "min_val")]
        lo: f64,
        #[serde(alias = "max_val")]
        hi: f64,
    },
    IntRequest {
        name: String,
        #[serde(default, alias = "def_val")]
        value: Option<i64>,
        #[serde(alias = "min_val")]
        lo: i64,
        #[serde(alias = "max_val")]
        hi: i64,
    },
    BoolRequest {
        name: String,
        #[serde(default, alias = "def_val")]
        value: Option<bool>,
    },
    TextRequest {
        text: String,
    },
}

impl From<RawRequest> for ControlRequest {
    fn from(raw: RawRequest) -> Self {
        match raw {
            RawRequest::FloatRequest {
                name,
                value,
                lo,
                hi,
            } => Self::Float {
                name,
                value: value.unwrap_or_default(),
                lo,
                hi,
            },
            RawRequest::IntRequest {
                name,
                value,
                lo,
                hi,
            } => Self::Int {
                name,
                value: value.unwrap_or_default(),
                lo,
                hi,
            },
            RawRequest::BoolRequest { name, value } => Self::Bool {
                name,
                value: value.unwrap_or(false),
            },
            RawRequest::TextRequest { text } => Self::Text { text },
        }
    }
}

/// A raw request entry that could not be turned into a widget request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRequest {
    /// Position in the frame's raw `context_requests` array.
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for MalformedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context request #{}: {}", self.index, self.reason)
    }
}

impl std::error::Error for MalformedRequest {}

/// Result of [`parse_requests`]: usable requests in source order plus the
/// entries that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRequests {
    pub requests: Vec<ControlRequest>,
    pub malformed: Vec<MalformedRequest>,
}

/// Parse a frame's raw request array, skipping entries that are not widgets.
///
/// A bad entry never aborts the rest of the array.
#[must_use]
pub fn parse_requests(raw: &[Value]) -> ParsedRequests {
    let mut parsed = ParsedRequests::default();
    for (index, entry) in raw.iter().enumerate() {
        match parse_one(entry) {
            Ok(request) => parsed.requests.push(request),
            Err(reason) => {
                tracing::debug!(index, %reason, "skipping context request");
                parsed.malformed.push(MalformedRequest { index, reason });
            }
        }
    }
    parsed
}

fn parse_one(entry: &Value) -> Result<ControlRequest, String> {
    let Some(kind) = entry.get("type").and_then(Value::as_str) else {
        return Err("missing `type` tag".to_string());
    };
    if NON_WIDGET_KINDS.contains(&kind) {
        return Err(format!("`{kind}` does not describe a widget"));
    }
    RawRequest::deserialize(entry)
        .map(ControlRequest::from)
        .map_err(|e| e.to_string())
}
