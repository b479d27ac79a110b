#![forbid(unsafe_code)]

//! Per-frame reconciliation of control requests against live widgets.
//!
//! # How it works
//!
//! 1. Every key currently in the registry starts out pending removal.
//! 2. Requests are visited in order. A key with no widget gets one from
//!    [`WidgetHost::mount`]; a key with a widget is updated in place. Either
//!    way the key is no longer pending.
//! 3. Widgets whose keys are still pending are detached and unregistered.
//!
//! Input widgets report an *effective value*: the declared value on the frame
//! the widget is created, the host's live value on every frame after that.
//! Text widgets are overwritten with the request text on every frame.
//!
//! A key whose widget kind changes between frames (a float slider becoming an
//! int slider, say) is destroyed and recreated under the same key. Within one
//! frame a key has a single kind: the kind of its last request. Earlier
//! requests for the key with a different kind are skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::normalize::NormalizedRequest;
use crate::registry::{ControlValue, RegistryError, Widget, WidgetKind, WidgetRegistry};
use crate::request::ControlRequest;

/// Failure to materialize a widget in the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError {
    pub key: String,
    pub message: String,
}

impl HostError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot mount widget `{}`: {}", self.key, self.message)
    }
}

impl std::error::Error for HostError {}

/// The UI side of reconciliation: creates, updates and removes elements.
///
/// Handles are owned by the [`Widget`] records; the host only borrows them,
/// except in [`detach`](Self::detach) where ownership comes back for release.
pub trait WidgetHost {
    type Handle;

    /// Create and attach an element for `request`, initialized to the
    /// request's declared value (or text) and range.
    fn mount(&mut self, key: &str, request: &ControlRequest) -> Result<Self::Handle, HostError>;

    /// Read the element's current, possibly user-edited, value.
    ///
    /// `None` when the element cannot be read; the reconciler then keeps the
    /// widget's last known value.
    fn read_value(&self, handle: &Self::Handle, kind: WidgetKind) -> Option<ControlValue>;

    /// Replace a text block's content.
    fn set_text(&mut self, handle: &Self::Handle, text: &str);

    /// Update a slider's bounds.
    fn set_range(&mut self, handle: &Self::Handle, lo: f64, hi: f64);

    /// Remove the element from the host and release it.
    fn detach(&mut self, handle: Self::Handle);
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Keys that got a new widget, in request order.
    pub created: Vec<String>,
    /// Number of in-place updates (one per request that hit an existing widget).
    pub updated: usize,
    /// Keys whose widget was detached, in removal order.
    pub removed: Vec<String>,
    /// Keys the host failed to mount.
    pub failed: Vec<String>,
    /// Effective value of every input widget touched this pass.
    pub effective: BTreeMap<String, ControlValue>,
}

impl ReconcileReport {
    /// True when the pass neither created nor removed a widget.
    #[must_use]
    pub fn is_pure_update(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty()
    }
}

/// Reconcile one frame's normalized requests against `registry`.
///
/// # Panics
///
/// Panics on a registry consistency violation, which can only come from a bug
/// in this function.
pub fn reconcile<H: WidgetHost>(
    requests: &[NormalizedRequest],
    registry: &mut WidgetRegistry<H::Handle>,
    host: &mut H,
) -> ReconcileReport {
    let span = tracing::debug_span!(
        "reconcile",
        requests = requests.len(),
        created = tracing::field::Empty,
        removed = tracing::field::Empty
    );
    let _guard = span.enter();

    let mut pending: BTreeSet<String> = registry.keys();
    let mut report = ReconcileReport::default();
    tracing::trace!(
        active_before = pending.len(),
        "reconcile starting"
    );

    let mut settled: BTreeMap<&str, WidgetKind> = BTreeMap::new();
    for NormalizedRequest { key, request } in requests {
        settled.insert(key.as_str(), request.kind());
    }

    for NormalizedRequest { key, request } in requests {
        let kind = request.kind();
        if settled.get(key.as_str()) != Some(&kind) {
            tracing::debug!(key = %key, kind = %kind, "request overridden by a later kind, skipped");
            continue;
        }

        let stale_kind = registry
            .get(key)
            .map(Widget::kind)
            .filter(|existing| *existing != kind);
        if let Some(previous) = stale_kind {
            tracing::debug!(key = %key, from = %previous, to = %kind, "widget kind changed, recreating");
            pending.remove(key);
            let stale = registry.remove(key).unwrap_or_else(|e| violation(e));
            host.detach(stale.into_handle());
            report.removed.push(key.clone());
        }

        match registry.get_mut(key) {
            Some(widget) => {
                pending.remove(key);
                report.updated += 1;
                if let Some(value) = sync_widget(host, widget, request) {
                    report.effective.insert(key.clone(), value);
                }
            }
            None => match host.mount(key, request) {
                Ok(handle) => {
                    let declared = request.declared_value();
                    if kind.is_input() {
                        report.effective.insert(key.clone(), declared.clone());
                    }
                    let widget = Widget::new(key.as_str(), kind, handle, declared, request.range());
                    registry.insert(widget).unwrap_or_else(|e| violation(e));
                    tracing::debug!(key = %key, kind = %kind, "widget created");
                    report.created.push(key.clone());
                }
                Err(err) => {
                    tracing::warn!(error = %err, "widget mount failed");
                    report.failed.push(key.clone());
                }
            },
        }
    }

    for key in pending {
        let widget = registry.remove(&key).unwrap_or_else(|e| violation(e));
        tracing::debug!(key = %key, kind = %widget.kind(), "widget removed");
        host.detach(widget.into_handle());
        report.removed.push(key);
    }

    span.record("created", report.created.len());
    span.record("removed", report.removed.len());
    tracing::trace!(
        active_after = registry.len(),
        updated = report.updated,
        failed = report.failed.len(),
        "reconcile complete"
    );
    report
}

/// Update an existing widget from this frame's request. Returns the effective
/// value for input widgets.
fn sync_widget<H: WidgetHost>(
    host: &mut H,
    widget: &mut Widget<H::Handle>,
    request: &ControlRequest,
) -> Option<ControlValue> {
    if let ControlRequest::Text { text } = request {
        host.set_text(widget.handle(), text);
        widget.last_value = ControlValue::Text(text.clone());
        return None;
    }

    let range = request.range();
    if let Some((lo, hi)) = range
        && widget.range != range
    {
        host.set_range(widget.handle(), lo, hi);
        widget.range = range;
    }

    let live = host
        .read_value(widget.handle(), widget.kind())
        .unwrap_or_else(|| widget.last_value.clone());
    widget.last_value = live.clone();
    Some(live)
}

fn violation(err: RegistryError) -> ! {
    panic!("widget registry consistency violation: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use pretty_assertions::assert_eq;

    /// Host that records calls and lets tests play the user.
    #[derive(Default)]
    struct RecordingHost {
        next_id: u32,
        live: BTreeMap<u32, ControlValue>,
        texts: BTreeMap<u32, String>,
        ranges: Vec<(u32, f64, f64)>,
        detached: Vec<u32>,
        refuse: Option<String>,
    }

    impl WidgetHost for RecordingHost {
        type Handle = u32;

        fn mount(&mut self, key: &str, request: &ControlRequest) -> Result<u32, HostError> {
            if self.refuse.as_deref() == Some(key) {
                return Err(HostError::new(key, "refused"));
            }
            let id = self.next_id;
            self.next_id += 1;
            match request {
                ControlRequest::Text { text } => {
                    self.texts.insert(id, text.clone());
                }
                other => {
                    self.live.insert(id, other.declared_value());
                }
            }
            Ok(id)
        }

        fn read_value(&self, handle: &u32, _kind: WidgetKind) -> Option<ControlValue> {
            self.live.get(handle).cloned()
        }

        fn set_text(&mut self, handle: &u32, text: &str) {
            self.texts.insert(*handle, text.to_string());
        }

        fn set_range(&mut self, handle: &u32, lo: f64, hi: f64) {
            self.ranges.push((*handle, lo, hi));
        }

        fn detach(&mut self, handle: u32) {
            self.live.remove(&handle);
            self.texts.remove(&handle);
            self.detached.push(handle);
        }
    }

    fn run(
        requests: &[ControlRequest],
        registry: &mut WidgetRegistry<u32>,
        host: &mut RecordingHost,
    ) -> ReconcileReport {
        reconcile(&normalize(requests), registry, host)
    }

    fn keys(registry: &WidgetRegistry<u32>) -> Vec<String> {
        registry.keys().into_iter().collect()
    }

    #[test]
    fn first_sight_creates_with_declared_value() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        let report = run(
            &[ControlRequest::float("R", 0.5, 0.0, 1.0)],
            &mut registry,
            &mut host,
        );
        assert_eq!(report.created, vec!["R"]);
        assert_eq!(report.effective["R"], ControlValue::Float(0.5));
        assert_eq!(registry.get("R").unwrap().kind(), WidgetKind::SliderFloat);
    }

    #[test]
    fn second_sight_updates_without_duplicating() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        let frame = [ControlRequest::float("R", 0.5, 0.0, 1.0)];
        run(&frame, &mut registry, &mut host);
        let report = run(&frame, &mut registry, &mut host);
        assert!(report.is_pure_update());
        assert_eq!(report.updated, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(host.next_id, 1);
    }

    #[test]
    fn live_value_beats_declared_value_after_creation() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        let frame = [ControlRequest::float("R", 0.5, 0.0, 1.0)];
        run(&frame, &mut registry, &mut host);

        let handle = *registry.get("R").unwrap().handle();
        host.live.insert(handle, ControlValue::Float(0.8));

        let report = run(&frame, &mut registry, &mut host);
        assert_eq!(report.effective["R"], ControlValue::Float(0.8));
        assert_eq!(registry.get("R").unwrap().last_value, ControlValue::Float(0.8));
    }

    #[test]
    fn unreadable_widget_keeps_last_value() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        let frame = [ControlRequest::int("N", 3, 0, 8)];
        run(&frame, &mut registry, &mut host);
        host.live.clear();
        let report = run(&frame, &mut registry, &mut host);
        assert_eq!(report.effective["N"], ControlValue::Int(3));
    }

    #[test]
    fn absent_keys_are_detached() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        run(
            &[
                ControlRequest::float("R", 0.1, 0.0, 1.0),
                ControlRequest::float("G", 0.2, 0.0, 1.0),
            ],
            &mut registry,
            &mut host,
        );
        let r_handle = *registry.get("R").unwrap().handle();
        let report = run(
            &[ControlRequest::float("G", 0.2, 0.0, 1.0)],
            &mut registry,
            &mut host,
        );
        assert_eq!(report.removed, vec!["R"]);
        assert_eq!(keys(&registry), vec!["G"]);
        assert_eq!(host.detached, vec![r_handle]);
    }

    #[test]
    fn text_is_overwritten_every_frame_under_same_key() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        run(&[ControlRequest::text("frame 1")], &mut registry, &mut host);
        let report = run(&[ControlRequest::text("frame 2")], &mut registry, &mut host);
        assert!(report.is_pure_update());
        assert!(report.effective.is_empty());
        let handle = *registry.get("textual-output-0").unwrap().handle();
        assert_eq!(host.texts[&handle], "frame 2");
    }

    #[test]
    fn kind_change_destroys_and_recreates() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        run(
            &[ControlRequest::float("x", 0.5, 0.0, 1.0)],
            &mut registry,
            &mut host,
        );
        let report = run(&[ControlRequest::int("x", 2, 0, 4)], &mut registry, &mut host);
        assert_eq!(report.removed, vec!["x"]);
        assert_eq!(report.created, vec!["x"]);
        assert_eq!(registry.get("x").unwrap().kind(), WidgetKind::SliderInt);
        assert_eq!(host.detached, vec![0]);
        assert_eq!(report.effective["x"], ControlValue::Int(2));
    }

    #[test]
    fn duplicate_names_update_one_widget_last_wins() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        let report = run(
            &[
                ControlRequest::text("t0"),
                ControlRequest::float("R", 0.1, 0.0, 1.0),
                ControlRequest::float("R", 0.9, 0.0, 2.0),
            ],
            &mut registry,
            &mut host,
        );
        assert_eq!(report.created, vec!["textual-output-0", "R"]);
        assert_eq!(report.updated, 1);
        assert!(report.removed.is_empty());
        assert_eq!(registry.len(), 2);
        assert_eq!(host.ranges, vec![(1, 0.0, 2.0)]);
    }

    #[test]
    fn mixed_kinds_in_one_frame_settle_on_the_last() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        let frame = [
            ControlRequest::float("x", 0.5, 0.0, 1.0),
            ControlRequest::int("x", 2, 0, 4),
        ];
        let first = run(&frame, &mut registry, &mut host);
        assert_eq!(first.created, vec!["x"]);
        assert!(first.removed.is_empty());
        assert_eq!(registry.get("x").unwrap().kind(), WidgetKind::SliderInt);

        let handle = *registry.get("x").unwrap().handle();
        host.live.insert(handle, ControlValue::Int(3));

        let second = run(&frame, &mut registry, &mut host);
        assert!(second.is_pure_update());
        assert_eq!(second.updated, 1);
        assert_eq!(second.effective["x"], ControlValue::Int(3));
        assert_eq!(host.next_id, 1);
        assert!(host.detached.is_empty());
    }

    #[test]
    fn range_writes_only_on_change() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        run(&[ControlRequest::int("N", 1, 0, 4)], &mut registry, &mut host);
        run(&[ControlRequest::int("N", 1, 0, 4)], &mut registry, &mut host);
        assert!(host.ranges.is_empty());
        run(&[ControlRequest::int("N", 1, 0, 8)], &mut registry, &mut host);
        assert_eq!(host.ranges, vec![(0, 0.0, 8.0)]);
        assert_eq!(registry.get("N").unwrap().range, Some((0.0, 8.0)));
    }

    #[test]
    fn failed_mount_does_not_protect_or_register() {
        let mut host = RecordingHost {
            refuse: Some("bad".into()),
            ..RecordingHost::default()
        };
        let mut registry = WidgetRegistry::new();
        run(
            &[ControlRequest::boolean("ok", true)],
            &mut registry,
            &mut host,
        );
        let report = run(
            &[ControlRequest::boolean("bad", false)],
            &mut registry,
            &mut host,
        );
        assert_eq!(report.failed, vec!["bad"]);
        assert_eq!(report.removed, vec!["ok"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn empty_request_list_clears_everything() {
        let mut host = RecordingHost::default();
        let mut registry = WidgetRegistry::new();
        run(
            &[ControlRequest::text("a"), ControlRequest::boolean("b", true)],
            &mut registry,
            &mut host,
        );
        let report = run(&[], &mut registry, &mut host);
        assert_eq!(report.removed.len(), 2);
        assert!(registry.is_empty());
    }
}
