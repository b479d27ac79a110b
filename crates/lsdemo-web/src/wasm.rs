#![forbid(unsafe_code)]

//! The JavaScript-facing entry object.
//!
//! ```js
//! import init, { LsDemoWeb } from "./pkg/lsdemo_web.js";
//! import Module from "./dist/LegitScriptWasm.js";
//!
//! await init();
//! const demo = new LsDemoWeb(JSON.stringify({ tick_interval_ms: 100 }));
//! await demo.boot(Module());
//! ```
//!
//! `boot` restores the saved editor text, compiles once, listens for edits and
//! starts the frame timer. Each tick schedules the next one only after it
//! finishes, so ticks never overlap. All state lives behind one
//! `Rc<RefCell<Harness>>`; timer and edit callbacks hold a `Weak` to it, so
//! dropping the entry object ends the loop.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Once;
use std::time::Duration;

use js_sys::Promise;
use lsdemo_core::{
    CompileDriver, EditorSnapshot, FrameDriver, HarnessConfig, MonotonicClock, SnapshotStore,
};
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Element, HtmlTextAreaElement, Window};

use crate::console_layer::{BrowserConsole, ConsoleLayer};
use crate::display::DomDisplay;
use crate::dom_host::DomHost;
use crate::editor::TextAreaEditor;
use crate::js_compiler::JsCompiler;
use crate::parse_options;
use crate::storage::LocalStore;

static INSTALL_HOOKS: Once = Once::new();

/// Panic messages and `tracing` output go to the devtools console. The
/// first instance's `log_level` wins.
fn install_hooks(config: &HarnessConfig) {
    INSTALL_HOOKS.call_once(|| {
        console_error_panic_hook::set_once();
        let subscriber = tracing_subscriber::registry()
            .with(ConsoleLayer::new(BrowserConsole, config.max_log_level()));
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            web_sys::console::warn_1(&JsValue::from_str(
                "lsdemo: a global tracing subscriber is already installed",
            ));
        }
    });
}

fn js_error(err: impl core::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ============================================================================
// Harness
// ============================================================================

/// Everything a running page needs, owned in one place.
struct Harness {
    config: HarnessConfig,
    compiler: JsCompiler,
    frames: FrameDriver<DomHost, MonotonicClock>,
    compiles: CompileDriver<MonotonicClock>,
    display: DomDisplay,
    editor: TextAreaEditor,
    store: Option<LocalStore>,
    window: Window,
    timer: Option<i32>,
}

impl Harness {
    fn compile(&mut self) {
        self.compiles
            .on_editor_change(&mut self.compiler, &self.editor, &mut self.display);
    }

    fn save_snapshot(&self, view_state: Value) {
        if !self.config.persist_editor {
            return;
        }
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let snapshot = EditorSnapshot::new(self.editor_text(), view_state);
        if let Err(e) = snapshot.save(store, &self.config.storage_key) {
            tracing::warn!(store = store.name(), error = %e, "failed to save editor snapshot");
        }
    }

    fn editor_text(&self) -> String {
        lsdemo_core::compile_driver::TextEditor::current_text(&self.editor)
    }

    fn cancel_timer(&mut self) {
        if let Some(id) = self.timer.take() {
            self.window.clear_timeout_with_handle(id);
        }
    }
}

/// Arm the timer for the next tick.
fn schedule_tick(state: &Rc<RefCell<Harness>>, delay: Duration) -> Result<(), JsValue> {
    let weak: Weak<RefCell<Harness>> = Rc::downgrade(state);
    let callback = Closure::once_into_js(move || {
        if let Some(state) = weak.upgrade() {
            run_tick(&state);
        }
    });
    let mut harness = state.borrow_mut();
    harness.cancel_timer();
    let id = harness
        .window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            i32::try_from(delay.as_millis()).unwrap_or(i32::MAX),
        )?;
    harness.timer = Some(id);
    Ok(())
}

fn run_tick(state: &Rc<RefCell<Harness>>) {
    let next = {
        let Ok(mut guard) = state.try_borrow_mut() else {
            tracing::warn!("tick skipped: harness busy");
            return;
        };
        let harness = &mut *guard;
        harness.timer = None;
        harness
            .frames
            .tick(&mut harness.compiler, &mut harness.display)
            .next_tick
    };
    if let Some(delay) = next
        && let Err(e) = schedule_tick(state, delay)
    {
        tracing::warn!(error = ?e, "failed to schedule next tick");
    }
}

fn on_edit(weak: &Weak<RefCell<Harness>>) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    let Ok(mut harness) = state.try_borrow_mut() else {
        tracing::warn!("edit ignored: harness busy");
        return;
    };
    harness.compile();
    let view_state = harness.editor.view_state();
    harness.save_snapshot(view_state);
}

// ============================================================================
// DOM lookup
// ============================================================================

fn by_id(document: &Document, id: &str) -> Option<Element> {
    let found = document.get_element_by_id(id);
    if found.is_none() {
        tracing::warn!(id, "element not found, panel disabled");
    }
    found
}

fn required(document: &Document, id: &str) -> Result<Element, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{id}")))
}

// ============================================================================
// LsDemoWeb
// ============================================================================

/// Shader-script demo page driver.
#[wasm_bindgen]
pub struct LsDemoWeb {
    config: HarnessConfig,
    state: Option<Rc<RefCell<Harness>>>,
    restored: Option<EditorSnapshot>,
}

#[wasm_bindgen]
impl LsDemoWeb {
    /// Create an idle driver. `options_json` is a [`HarnessConfig`] as JSON;
    /// omitted fields take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(options_json: Option<String>) -> Result<LsDemoWeb, JsValue> {
        let config = parse_options(options_json.as_deref()).map_err(js_error)?;
        install_hooks(&config);
        Ok(Self {
            config,
            state: None,
            restored: None,
        })
    }

    /// Bind to the page and start running.
    ///
    /// `compiler_module` is the Emscripten module object, or the promise the
    /// module factory returns. Exported as an async JS function returning a
    /// Promise.
    pub async fn boot(&mut self, compiler_module: JsValue) -> Result<(), JsValue> {
        if self.state.is_some() {
            return Err(JsValue::from_str("already booted"));
        }
        let module = match compiler_module.dyn_into::<Promise>() {
            Ok(pending) => JsFuture::from(pending).await?,
            Err(module) => module,
        };
        let compiler = JsCompiler::from_module(module)?;

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let ids = &self.config.elements;
        let editor_el = required(&document, &ids.editor)?
            .dyn_into::<HtmlTextAreaElement>()
            .map_err(|_| JsValue::from_str(&format!("#{} is not a <textarea>", ids.editor)))?;
        let controls = required(&document, &ids.controls)?;
        let display = DomDisplay {
            compile_output: by_id(&document, &ids.compile_output),
            frame_output: by_id(&document, &ids.frame_output),
            timing: by_id(&document, &ids.timing),
        };
        let editor = TextAreaEditor::new(editor_el);

        let store = if self.config.persist_editor {
            LocalStore::open()
                .inspect_err(|e| tracing::warn!(error = %e, "editor snapshots disabled"))
                .ok()
        } else {
            None
        };
        if let Some(store) = store.as_ref() {
            match EditorSnapshot::load(store, &self.config.storage_key) {
                Ok(Some(snapshot)) => {
                    editor.set_text(&snapshot.content);
                    editor.restore_view_state(&snapshot.view_state);
                    tracing::info!(bytes = snapshot.content.len(), "restored editor snapshot");
                    self.restored = Some(snapshot);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "failed to read editor snapshot"),
            }
        }

        let harness = Harness {
            frames: FrameDriver::new(
                DomHost::new(document, controls),
                MonotonicClock::new(),
                &self.config,
            ),
            compiles: CompileDriver::new(MonotonicClock::new()),
            config: self.config.clone(),
            compiler,
            display,
            editor,
            store,
            window,
            timer: None,
        };
        let state = Rc::new(RefCell::new(harness));

        {
            let mut harness = state.borrow_mut();
            harness.compile();
            let weak = Rc::downgrade(&state);
            harness.editor.listen(move || on_edit(&weak))?;
        }
        schedule_tick(&state, Duration::ZERO)?;
        tracing::info!(
            interval_ms = self.config.tick_interval_ms,
            width = self.config.swapchain.width,
            height = self.config.swapchain.height,
            "harness booted"
        );
        self.state = Some(state);
        Ok(())
    }

    /// Stop the frame loop. Widgets stay on the page.
    pub fn stop(&mut self) {
        if let Some(state) = &self.state {
            let mut harness = state.borrow_mut();
            harness.frames.stop();
            harness.cancel_timer();
        }
    }

    /// Restart a stopped frame loop.
    pub fn resume(&mut self) -> Result<(), JsValue> {
        let Some(state) = &self.state else {
            return Ok(());
        };
        {
            let mut harness = state.borrow_mut();
            if harness.frames.is_running() {
                return Ok(());
            }
            harness.frames.resume();
        }
        schedule_tick(state, Duration::ZERO)
    }

    /// Canvas size reported as `@swapchain_size` from the next tick on.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.swapchain.width = width;
        self.config.swapchain.height = height;
        if let Some(state) = &self.state {
            state.borrow_mut().frames.set_swapchain_size(width, height);
        }
    }

    /// Save the editor snapshot now. `view_state_json` replaces the
    /// textarea's own view state, for hosts embedding a richer editor.
    pub fn persist(&mut self, view_state_json: Option<String>) -> Result<(), JsValue> {
        let Some(state) = &self.state else {
            return Err(JsValue::from_str("not booted"));
        };
        let harness = state.borrow();
        let view_state = match view_state_json {
            Some(raw) => serde_json::from_str(&raw).map_err(js_error)?,
            None => harness.editor.view_state(),
        };
        let Some(store) = harness.store.as_ref() else {
            return Err(JsValue::from_str("editor snapshots are disabled"));
        };
        EditorSnapshot::new(harness.editor_text(), view_state)
            .save(store, &harness.config.storage_key)
            .map_err(js_error)
    }

    /// Editor text restored from the snapshot at boot, if any.
    #[wasm_bindgen(js_name = restoredContent)]
    pub fn restored_content(&self) -> Option<String> {
        self.restored.as_ref().map(|s| s.content.clone())
    }

    /// Tick timing summary as JSON.
    #[wasm_bindgen(js_name = tickStatsJson)]
    pub fn tick_stats_json(&self) -> String {
        let Some(state) = &self.state else {
            return "{}".to_string();
        };
        serde_json::to_string(&state.borrow().frames.stats().summary())
            .unwrap_or_else(|_| "{}".to_string())
    }

    /// Explicit teardown for JS callers: stops the loop, removes the edit
    /// listener and every widget.
    pub fn destroy(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        let mut harness = state.borrow_mut();
        harness.frames.stop();
        harness.cancel_timer();
        harness.editor.unlisten();
        harness.frames.reset_widgets();
    }
}
