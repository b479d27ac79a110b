#![forbid(unsafe_code)]

//! Tracing layer that formats events as single lines for the browser console.
//!
//! Each event becomes one line:
//!
//! ```text
//! WARN  lsdemo_core::frame_driver frame.tick{frame_idx=12}: advance_frame faulted name=RuntimeError
//! ```
//!
//! Lines go to a [`LogSink`]. In the browser that is [`BrowserConsole`],
//! which maps levels onto `console.error`/`warn`/`info`/`debug`; tests use a
//! capturing sink.

use std::fmt::{self, Write as FmtWrite};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Destination for formatted log lines.
pub trait LogSink: Send + Sync + 'static {
    fn write_line(&self, level: Level, line: &str);
}

// ============================================================================
// Field formatting
// ============================================================================

/// Collects `message` and `key=value` pairs.
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: String,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", field.name(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.push(field, format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.push(field, format_args!("{value:?}"));
        }
    }
}

/// Formatted fields of a span, stored in its extensions.
struct SpanFields(String);

fn level_str(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN ",
        Level::INFO => "INFO ",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

// ============================================================================
// ConsoleLayer
// ============================================================================

/// A `tracing_subscriber::Layer` writing one line per event to a [`LogSink`].
pub struct ConsoleLayer<K> {
    sink: K,
    max_level: Level,
    show_target: bool,
}

impl<K: LogSink> ConsoleLayer<K> {
    /// Forward events up to `max_level` (inclusive) to `sink`.
    pub fn new(sink: K, max_level: Level) -> Self {
        Self {
            sink,
            max_level,
            show_target: true,
        }
    }

    /// Builder: set whether to print the event target (module path).
    #[must_use]
    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    fn accepts(&self, metadata: &Metadata<'_>) -> bool {
        *metadata.level() <= self.max_level
    }
}

impl<S, K> Layer<S> for ConsoleLayer<K>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    K: LogSink,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.accepts(metadata)
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        span.extensions_mut().insert(SpanFields(visitor.fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);
        if visitor.fields.is_empty() {
            return;
        }
        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(existing)) = extensions.get_mut::<SpanFields>() {
            if !existing.is_empty() {
                existing.push(' ');
            }
            existing.push_str(&visitor.fields);
        } else {
            extensions.insert(SpanFields(visitor.fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !self.accepts(metadata) {
            return;
        }

        let mut line = String::with_capacity(96);
        line.push_str(level_str(*metadata.level()));
        if self.show_target {
            line.push(' ');
            line.push_str(metadata.target());
        }

        if let Some(scope) = ctx.event_scope(event) {
            let mut first = true;
            for span in scope.from_root() {
                line.push(if first { ' ' } else { ':' });
                first = false;
                line.push_str(span.name());
                if let Some(SpanFields(fields)) = span.extensions().get::<SpanFields>()
                    && !fields.is_empty()
                {
                    let _ = write!(line, "{{{fields}}}");
                }
            }
            if !first {
                line.push(':');
            }
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        if let Some(message) = visitor.message {
            line.push(' ');
            line.push_str(&message);
        }
        if !visitor.fields.is_empty() {
            line.push(' ');
            line.push_str(&visitor.fields);
        }

        self.sink.write_line(*metadata.level(), &line);
    }
}

// ============================================================================
// Browser sink
// ============================================================================

/// Writes to the devtools console.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserConsole;

#[cfg(target_arch = "wasm32")]
impl LogSink for BrowserConsole {
    fn write_line(&self, level: Level, line: &str) {
        let line = wasm_bindgen::JsValue::from_str(line);
        match level {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            Level::INFO => web_sys::console::info_1(&line),
            Level::DEBUG | Level::TRACE => web_sys::console::debug_1(&line),
        }
    }
}
