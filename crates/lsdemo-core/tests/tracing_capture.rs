#![forbid(unsafe_code)]

//! Checks that the reconcile and frame spans carry their recorded fields.
//!
//! Run: `cargo test -p lsdemo-core --test tracing_capture`

use std::sync::{Arc, Mutex};

use lsdemo_core::{
    ControlRequest, ControlValue, HostError, WidgetHost, WidgetKind, WidgetRegistry, normalize,
    reconcile,
};
use pretty_assertions::assert_eq;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

type Captured = Arc<Mutex<Vec<(String, String, String)>>>;

struct FieldVisitor<'a> {
    span: &'a str,
    out: &'a Captured,
}

impl Visit for FieldVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

impl FieldVisitor<'_> {
    fn push(&self, field: &Field, value: String) {
        self.out
            .lock()
            .unwrap()
            .push((self.span.to_string(), field.name().to_string(), value));
    }
}

/// Records every span field, including ones filled in after creation.
struct SpanFields(Captured);

impl<S> Layer<S> for SpanFields
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        attrs.record(&mut FieldVisitor {
            span: attrs.metadata().name(),
            out: &self.0,
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            values.record(&mut FieldVisitor {
                span: span.name(),
                out: &self.0,
            });
        }
    }
}

#[derive(Default)]
struct CountingHost(u32);

impl WidgetHost for CountingHost {
    type Handle = u32;

    fn mount(&mut self, _key: &str, _request: &ControlRequest) -> Result<u32, HostError> {
        self.0 += 1;
        Ok(self.0)
    }

    fn read_value(&self, _handle: &u32, _kind: WidgetKind) -> Option<ControlValue> {
        None
    }

    fn set_text(&mut self, _handle: &u32, _text: &str) {}

    fn set_range(&mut self, _handle: &u32, _lo: f64, _hi: f64) {}

    fn detach(&mut self, _handle: u32) {}
}

fn field(captured: &Captured, span: &str, name: &str) -> Vec<String> {
    captured
        .lock()
        .unwrap()
        .iter()
        .filter(|(s, f, _)| s == span && f == name)
        .map(|(_, _, v)| v.clone())
        .collect()
}

#[test]
fn reconcile_span_records_created_and_removed() {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::registry().with(SpanFields(captured.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut registry = WidgetRegistry::new();
    let mut host = CountingHost::default();
    let first = [
        ControlRequest::float("R", 0.5, 0.0, 1.0),
        ControlRequest::float("G", 0.5, 0.0, 1.0),
    ];
    let second = [ControlRequest::float("G", 0.5, 0.0, 1.0)];
    reconcile(&normalize(&first), &mut registry, &mut host);
    reconcile(&normalize(&second), &mut registry, &mut host);

    assert_eq!(field(&captured, "reconcile", "requests"), vec!["2", "1"]);
    assert_eq!(field(&captured, "reconcile", "created"), vec!["2", "0"]);
    assert_eq!(field(&captured, "reconcile", "removed"), vec!["0", "1"]);
}
