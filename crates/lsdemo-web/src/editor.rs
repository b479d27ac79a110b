#![forbid(unsafe_code)]

//! [`TextEditor`] over a `<textarea>`.

use lsdemo_core::compile_driver::TextEditor;
use serde_json::{Value, json};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, HtmlTextAreaElement};

/// DOM event that counts as an edit. Fires for typing, paste and cut.
const CHANGE_EVENT: &str = "input";

pub struct TextAreaEditor {
    element: HtmlTextAreaElement,
    listener: Option<Closure<dyn FnMut(Event)>>,
}

impl TextAreaEditor {
    pub fn new(element: HtmlTextAreaElement) -> Self {
        Self {
            element,
            listener: None,
        }
    }

    pub fn set_text(&self, text: &str) {
        self.element.set_value(text);
    }

    /// Cursor and scroll position, stored as the snapshot's `viewState`.
    pub fn view_state(&self) -> Value {
        json!({
            "selectionStart": self.element.selection_start().ok().flatten(),
            "selectionEnd": self.element.selection_end().ok().flatten(),
            "scrollTop": self.element.scroll_top(),
        })
    }

    /// Put back a `viewState` written by [`view_state`](Self::view_state).
    /// Unknown shapes are ignored.
    pub fn restore_view_state(&self, state: &Value) {
        let field = |key: &str| state.get(key).and_then(Value::as_u64);
        if let (Some(start), Some(end)) = (field("selectionStart"), field("selectionEnd")) {
            let _ = self
                .element
                .set_selection_range(start as u32, end as u32);
        }
        if let Some(top) = state.get("scrollTop").and_then(Value::as_i64) {
            self.element.set_scroll_top(top as i32);
        }
    }

    /// Call `on_change` after every edit. Replaces any previous listener.
    pub fn listen(&mut self, on_change: impl FnMut() + 'static) -> Result<(), JsValue> {
        self.unlisten();
        let mut on_change = on_change;
        let closure = Closure::<dyn FnMut(Event)>::new(move |_event: Event| on_change());
        self.element
            .add_event_listener_with_callback(CHANGE_EVENT, closure.as_ref().unchecked_ref())?;
        self.listener = Some(closure);
        Ok(())
    }

    pub fn unlisten(&mut self) {
        if let Some(closure) = self.listener.take() {
            let _ = self
                .element
                .remove_event_listener_with_callback(CHANGE_EVENT, closure.as_ref().unchecked_ref());
        }
    }
}

impl TextEditor for TextAreaEditor {
    fn current_text(&self) -> String {
        self.element.value()
    }
}

impl Drop for TextAreaEditor {
    fn drop(&mut self) {
        self.unlisten();
    }
}
