#![forbid(unsafe_code)]

//! [`WidgetHost`] over real DOM elements.
//!
//! Every widget is a `<div class="lsdemo-control" data-key=…>` appended to the
//! controls container:
//!
//! | Kind | Markup |
//! |------|--------|
//! | slider | `<label>name: v</label><input type=range min max step value>` |
//! | checkbox | `<label><input type=checkbox><span> name</span></label>` |
//! | text block | `<pre>text</pre>` |
//!
//! Values are read back from the live `<input>` on every reconcile, so user
//! edits survive re-renders without any event wiring.

use lsdemo_core::{ControlRequest, ControlValue, HostError, WidgetHost, WidgetKind};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlInputElement};

use crate::markup::{control_label, format_number, parse_slider, slider_step, value_attr};

/// Elements owned by one widget.
pub struct DomWidget {
    root: Element,
    /// `<input>` for sliders and checkboxes.
    input: Option<HtmlInputElement>,
    /// Label for controls, `<pre>` for text blocks.
    text: Element,
    name: String,
    kind: WidgetKind,
}

pub struct DomHost {
    document: Document,
    container: Element,
}

impl DomHost {
    pub fn new(document: Document, container: Element) -> Self {
        Self {
            document,
            container,
        }
    }

    fn element(&self, key: &str, tag: &str) -> Result<Element, HostError> {
        self.document
            .create_element(tag)
            .map_err(|e| host_error(key, &format!("create <{tag}>"), &e))
    }

    fn input(&self, key: &str, ty: &str) -> Result<HtmlInputElement, HostError> {
        let input = self
            .element(key, "input")?
            .dyn_into::<HtmlInputElement>()
            .map_err(|_| HostError::new(key, "<input> is not an HtmlInputElement"))?;
        input.set_type(ty);
        Ok(input)
    }

    fn build(&self, key: &str, request: &ControlRequest) -> Result<DomWidget, HostError> {
        let root = self.element(key, "div")?;
        root.set_class_name("lsdemo-control");
        attr(&root, key, "data-key", key)?;
        attr(&root, key, "data-kind", request.kind().as_str())?;

        let declared = request.declared_value();
        let widget = match request {
            ControlRequest::Float { name, .. } | ControlRequest::Int { name, .. } => {
                let (lo, hi) = request.range().unwrap_or_default();
                let label = self.element(key, "label")?;
                label.set_text_content(Some(&control_label(name, &declared)));
                let input = self.input(key, "range")?;
                input.set_min(&format_number(lo));
                input.set_max(&format_number(hi));
                input.set_step(&slider_step(request.kind(), lo, hi));
                input.set_value(&value_attr(&declared));
                append(&root, key, &label)?;
                append(&root, key, &input)?;
                DomWidget {
                    root,
                    input: Some(input),
                    text: label,
                    name: name.clone(),
                    kind: request.kind(),
                }
            }
            ControlRequest::Bool { name, value } => {
                let label = self.element(key, "label")?;
                let input = self.input(key, "checkbox")?;
                input.set_checked(*value);
                let caption = self.element(key, "span")?;
                caption.set_text_content(Some(&format!(" {name}")));
                append(&label, key, &input)?;
                append(&label, key, &caption)?;
                append(&root, key, &label)?;
                DomWidget {
                    root,
                    input: Some(input),
                    text: caption,
                    name: name.clone(),
                    kind: WidgetKind::Checkbox,
                }
            }
            ControlRequest::Text { text } => {
                let pre = self.element(key, "pre")?;
                pre.set_text_content(Some(text));
                append(&root, key, &pre)?;
                DomWidget {
                    root,
                    input: None,
                    text: pre,
                    name: String::new(),
                    kind: WidgetKind::TextBlock,
                }
            }
        };
        Ok(widget)
    }
}

impl WidgetHost for DomHost {
    type Handle = DomWidget;

    fn mount(&mut self, key: &str, request: &ControlRequest) -> Result<DomWidget, HostError> {
        let widget = self.build(key, request)?;
        append(&self.container, key, &widget.root)?;
        Ok(widget)
    }

    fn read_value(&self, handle: &DomWidget, kind: WidgetKind) -> Option<ControlValue> {
        match kind {
            WidgetKind::SliderFloat | WidgetKind::SliderInt => {
                let input = handle.input.as_ref()?;
                let value = parse_slider(kind, &input.value())?;
                handle
                    .text
                    .set_text_content(Some(&control_label(&handle.name, &value)));
                Some(value)
            }
            WidgetKind::Checkbox => handle.input.as_ref().map(|i| ControlValue::Bool(i.checked())),
            WidgetKind::TextBlock => handle.text.text_content().map(ControlValue::Text),
        }
    }

    fn set_text(&mut self, handle: &DomWidget, text: &str) {
        if handle.text.text_content().as_deref() != Some(text) {
            handle.text.set_text_content(Some(text));
        }
    }

    fn set_range(&mut self, handle: &DomWidget, lo: f64, hi: f64) {
        let Some(input) = handle.input.as_ref() else {
            return;
        };
        input.set_min(&format_number(lo));
        input.set_max(&format_number(hi));
        input.set_step(&slider_step(handle.kind, lo, hi));
    }

    fn detach(&mut self, handle: DomWidget) {
        handle.root.remove();
    }
}

fn host_error(key: &str, what: &str, err: &JsValue) -> HostError {
    HostError::new(key, format!("{what}: {err:?}"))
}

fn attr(el: &Element, key: &str, name: &str, value: &str) -> Result<(), HostError> {
    el.set_attribute(name, value)
        .map_err(|e| host_error(key, &format!("set {name}"), &e))
}

fn append(parent: &Element, key: &str, child: &web_sys::Node) -> Result<(), HostError> {
    parent
        .append_child(child)
        .map(|_| ())
        .map_err(|e| host_error(key, "append element", &e))
}
