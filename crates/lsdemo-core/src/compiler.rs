//! The compiler collaborator and the results it produces.
//!
//! The compiler is an opaque module: it takes source text or frame inputs and
//! returns serialized JSON. Script-level problems come back *inside* a
//! success-shaped result (an `error` field); faults of the module itself are
//! reported as [`CompilerFault`].

use core::fmt;

use serde_json::{Map, Value};

/// Top-level key the compiler uses for script-level errors.
const ERROR_KEY: &str = "error";
/// Key prefix the compiler's outer exception wrapper uses.
const UNCAUGHT_ERROR_PREFIX: &str = "Uncaught error";

/// The script compiler, as seen by the drivers.
///
/// Calls are synchronous and atomic from the caller's point of view.
pub trait Compiler {
    /// Compile `source`, returning the serialized compile result.
    fn load(&mut self, source: &str) -> Result<String, CompilerFault>;

    /// Run one frame of the loaded script with the given serialized inputs.
    fn advance_frame(&mut self, inputs_json: &str) -> Result<String, CompilerFault>;
}

/// The compiler call itself threw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerFault {
    pub name: String,
    pub message: String,
    /// Diagnostic trace (a JS stack, for example). May be empty.
    pub trace: String,
}

impl CompilerFault {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            trace: String::new(),
        }
    }

    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = trace.into();
        self
    }
}

impl fmt::Display for CompilerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}\n {}", self.name, self.message, self.trace)
    }
}

impl std::error::Error for CompilerFault {}

/// Whether a serialized compiler result carries a script-level error marker.
///
/// JSON objects are checked for an `error` key (or the compiler's
/// `Uncaught error` wrapper key). Anything that is not a JSON object falls
/// back to a substring check.
#[must_use]
pub fn has_error_marker(serialized: &str) -> bool {
    match serde_json::from_str::<Map<String, Value>>(serialized) {
        Ok(object) => object
            .keys()
            .any(|key| key == ERROR_KEY || key.starts_with(UNCAUGHT_ERROR_PREFIX)),
        Err(_) => serialized.contains(ERROR_KEY),
    }
}

/// A parsed frame result.
///
/// Only `context_requests` is interpreted; every other field is diagnostic
/// payload passed through to the display untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    fields: Map<String, Value>,
}

impl FrameResult {
    pub const CONTEXT_REQUESTS_KEY: &'static str = "context_requests";

    /// Parse a serialized frame result. It must be a JSON object.
    pub fn parse(serialized: &str) -> Result<Self, serde_json::Error> {
        let fields = serde_json::from_str(serialized)?;
        Ok(Self { fields })
    }

    /// The frame's raw request list, if the result carries one.
    ///
    /// A `context_requests` field that is not an array counts as absent.
    pub fn context_requests(&self) -> Option<&[Value]> {
        self.fields
            .get(Self::CONTEXT_REQUESTS_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    /// Script-level error reported for this frame, if any.
    pub fn error(&self) -> Option<&Value> {
        self.fields.get(ERROR_KEY).or_else(|| {
            self.fields
                .iter()
                .find(|(key, _)| key.starts_with(UNCAUGHT_ERROR_PREFIX))
                .map(|(_, value)| value)
        })
    }

    /// Fields other than `context_requests`.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .filter(|(key, _)| key.as_str() != Self::CONTEXT_REQUESTS_KEY)
            .map(|(key, value)| (key.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_marker_detection() {
        assert!(has_error_marker(r#"{"error": {"line": 3, "desc": "bad"}}"#));
        assert!(has_error_marker(r#"{"Uncaught error: ": "boom"}"#));
        assert!(!has_error_marker(r#"{"shader_descs": [], "declarations": []}"#));
        assert!(has_error_marker("fatal error in module"));
        assert!(!has_error_marker("ok"));
    }

    #[test]
    fn context_requests_presence() {
        let with = FrameResult::parse(r#"{"context_requests": [{"type": "TextRequest", "text": "x"}]}"#)
            .unwrap();
        assert_eq!(with.context_requests().map(<[Value]>::len), Some(1));

        let without = FrameResult::parse(r#"{"shader_invocations": []}"#).unwrap();
        assert!(without.context_requests().is_none());

        let wrong_shape = FrameResult::parse(r#"{"context_requests": 5}"#).unwrap();
        assert!(wrong_shape.context_requests().is_none());
    }

    #[test]
    fn non_object_results_are_rejected() {
        assert!(FrameResult::parse("[1, 2]").is_err());
        assert!(FrameResult::parse("not json").is_err());
    }

    #[test]
    fn diagnostics_exclude_requests() {
        let result = FrameResult::parse(
            r#"{"context_requests": [], "shader_invocations": [], "error": "x"}"#,
        )
        .unwrap();
        let mut keys: Vec<&str> = result.diagnostics().map(|(k, _)| k).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["error", "shader_invocations"]);
        assert_eq!(result.error(), Some(&Value::String("x".into())));
    }

    #[test]
    fn fault_renders_verbatim() {
        let fault = CompilerFault::new("RuntimeError", "unreachable").with_trace("at wasm-function[12]");
        assert_eq!(fault.to_string(), "RuntimeError unreachable\n at wasm-function[12]");
    }
}
