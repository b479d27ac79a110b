//! Keyed store of materialized widgets.
//!
//! # Invariants
//!
//! 1. At most one widget per key.
//! 2. After a reconciliation pass the key set equals the keys of that pass's
//!    normalized requests (minus requests whose widget could not be mounted).
//! 3. A widget's key never changes; re-keying means remove + insert.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Kind of widget a request materializes as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    SliderFloat,
    SliderInt,
    Checkbox,
    TextBlock,
}

impl WidgetKind {
    /// Whether the user can edit this widget's value.
    #[must_use]
    pub const fn is_input(self) -> bool {
        !matches!(self, Self::TextBlock)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SliderFloat => "slider-float",
            Self::SliderInt => "slider-int",
            Self::Checkbox => "checkbox",
            Self::TextBlock => "text-block",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value rendered into, or read back from, a widget.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

/// A materialized widget bound to exactly one request key.
///
/// The widget owns its host handle; dropping the record without going through
/// [`crate::WidgetHost::detach`] leaks the element in the host.
#[derive(Debug)]
pub struct Widget<H> {
    key: String,
    kind: WidgetKind,
    handle: H,
    /// Last value rendered into or read back from the widget.
    pub last_value: ControlValue,
    /// Slider range last written to the host.
    pub range: Option<(f64, f64)>,
}

impl<H> Widget<H> {
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        kind: WidgetKind,
        handle: H,
        last_value: ControlValue,
        range: Option<(f64, f64)>,
    ) -> Self {
        Self {
            key: key.into(),
            kind,
            handle,
            last_value,
            range,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Consume the record, releasing the handle to the caller.
    pub fn into_handle(self) -> H {
        self.handle
    }
}

/// Registry consistency violations.
///
/// The reconciler checks before it mutates, so seeing one of these means the
/// reconciler itself is broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateKey(String),
    MissingKey(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "widget `{key}` is already registered"),
            Self::MissingKey(key) => write!(f, "widget `{key}` is not registered"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Mapping from request key to widget. Single-threaded.
#[derive(Debug)]
pub struct WidgetRegistry<H> {
    widgets: HashMap<String, Widget<H>>,
}

impl<H> Default for WidgetRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> WidgetRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            widgets: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Widget<H>> {
        self.widgets.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Widget<H>> {
        self.widgets.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.widgets.contains_key(key)
    }

    /// Register a widget under its own key. Fails if the key is taken.
    pub fn insert(&mut self, widget: Widget<H>) -> Result<(), RegistryError> {
        if self.widgets.contains_key(widget.key()) {
            return Err(RegistryError::DuplicateKey(widget.key));
        }
        self.widgets.insert(widget.key.clone(), widget);
        Ok(())
    }

    /// Unregister and return a widget. Fails if the key is absent.
    pub fn remove(&mut self, key: &str) -> Result<Widget<H>, RegistryError> {
        self.widgets
            .remove(key)
            .ok_or_else(|| RegistryError::MissingKey(key.to_string()))
    }

    /// Sorted snapshot of the current keys.
    pub fn keys(&self) -> BTreeSet<String> {
        self.widgets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Remove every widget, yielding them for detachment.
    pub fn drain(&mut self) -> impl Iterator<Item = Widget<H>> + '_ {
        self.widgets.drain().map(|(_, widget)| widget)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Widget<H>> {
        self.widgets.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_widget(key: &str, handle: u32) -> Widget<u32> {
        Widget::new(
            key,
            WidgetKind::TextBlock,
            handle,
            ControlValue::Text(String::new()),
            None,
        )
    }

    #[test]
    fn insert_rejects_duplicate_key() {
        let mut registry = WidgetRegistry::new();
        registry.insert(text_widget("a", 1)).unwrap();
        let err = registry.insert(text_widget("a", 2)).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateKey("a".into()));
        assert_eq!(*registry.get("a").unwrap().handle(), 1);
    }

    #[test]
    fn remove_rejects_missing_key() {
        let mut registry: WidgetRegistry<u32> = WidgetRegistry::new();
        assert_eq!(
            registry.remove("ghost").unwrap_err(),
            RegistryError::MissingKey("ghost".into())
        );
    }

    #[test]
    fn keys_snapshot_is_sorted_and_detached() {
        let mut registry = WidgetRegistry::new();
        registry.insert(text_widget("b", 1)).unwrap();
        registry.insert(text_widget("a", 2)).unwrap();
        let keys = registry.keys();
        registry.remove("a").unwrap();
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn drain_empties_registry() {
        let mut registry = WidgetRegistry::new();
        registry.insert(text_widget("a", 1)).unwrap();
        registry.insert(text_widget("b", 2)).unwrap();
        let mut handles: Vec<u32> = registry.drain().map(Widget::into_handle).collect();
        handles.sort_unstable();
        assert_eq!(handles, vec![1, 2]);
        assert!(registry.is_empty());
    }

    #[test]
    fn kind_labels() {
        assert_eq!(WidgetKind::SliderFloat.to_string(), "slider-float");
        assert!(WidgetKind::Checkbox.is_input());
        assert!(!WidgetKind::TextBlock.is_input());
    }
}
