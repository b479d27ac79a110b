//! Frame inputs handed to `Compiler::advance_frame`.
//!
//! The compiler expects a JSON array of named, typed values:
//!
//! ```json
//! [{"name": "@swapchain_size", "type": "uvec2", "value": {"x": 1024, "y": 512}}]
//! ```
//!
//! Names starting with `@` are provided by the harness; everything else is a
//! widget's effective value keyed by its request name.

use serde::Serialize;

use crate::registry::ControlValue;

/// Canvas size in pixels.
pub const SWAPCHAIN_SIZE_INPUT: &str = "@swapchain_size";
/// Seconds since the frame driver started.
pub const TIME_INPUT: &str = "@time";

/// A typed input value, tagged the way the compiler parses it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum InputValue {
    Float(f64),
    Int(i64),
    UVec2 { x: u32, y: u32 },
}

impl InputValue {
    /// Map a widget value to the input type the script reads.
    ///
    /// Checkboxes travel as `int` 0/1; text has no input form.
    #[must_use]
    pub fn from_control(value: &ControlValue) -> Option<Self> {
        match value {
            ControlValue::Float(v) => Some(Self::Float(*v)),
            ControlValue::Int(v) => Some(Self::Int(*v)),
            ControlValue::Bool(v) => Some(Self::Int(i64::from(*v))),
            ControlValue::Text(_) => None,
        }
    }
}

/// One named input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameInput {
    pub name: String,
    #[serde(flatten)]
    pub value: InputValue,
}

/// Ordered list of inputs for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FrameInputs(Vec<FrameInput>);

impl FrameInputs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a list with the harness-provided inputs.
    #[must_use]
    pub fn with_builtins(width: u32, height: u32, time_secs: f64) -> Self {
        let mut inputs = Self::new();
        inputs.push(
            SWAPCHAIN_SIZE_INPUT,
            InputValue::UVec2 {
                x: width,
                y: height,
            },
        );
        inputs.push(TIME_INPUT, InputValue::Float(time_secs));
        inputs
    }

    pub fn push(&mut self, name: impl Into<String>, value: InputValue) {
        self.0.push(FrameInput {
            name: name.into(),
            value,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameInput> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode in the compiler's input format.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
