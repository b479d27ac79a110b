#![forbid(unsafe_code)]

//! [`Compiler`] over the Emscripten compiler module.
//!
//! The module object exposes two string-in/string-out functions:
//! `LegitScriptLoad(source)` and `LegitScriptFrame(inputsJson)`. Anything the
//! module throws becomes a [`CompilerFault`] carrying the JS error's `name`,
//! `message` and `stack`.

use js_sys::{Function, JSON, Reflect};
use lsdemo_core::{Compiler, CompilerFault};
use wasm_bindgen::{JsCast, JsValue};

use crate::markup::fault_from_parts;

const LOAD_FN: &str = "LegitScriptLoad";
const FRAME_FN: &str = "LegitScriptFrame";

pub struct JsCompiler {
    module: JsValue,
    load: Function,
    frame: Function,
}

impl JsCompiler {
    /// Bind to a resolved module object. Fails if either entry point is
    /// missing or not callable.
    pub fn from_module(module: JsValue) -> Result<Self, JsValue> {
        let load = entry_point(&module, LOAD_FN)?;
        let frame = entry_point(&module, FRAME_FN)?;
        Ok(Self {
            module,
            load,
            frame,
        })
    }

    fn call(&self, function: &Function, arg: &str) -> Result<String, CompilerFault> {
        let result = function
            .call1(&self.module, &JsValue::from_str(arg))
            .map_err(|thrown| fault_from_js(&thrown))?;
        Ok(result.as_string().unwrap_or_else(|| stringify(&result)))
    }
}

impl Compiler for JsCompiler {
    fn load(&mut self, source: &str) -> Result<String, CompilerFault> {
        self.call(&self.load, source)
    }

    fn advance_frame(&mut self, inputs_json: &str) -> Result<String, CompilerFault> {
        self.call(&self.frame, inputs_json)
    }
}

fn entry_point(module: &JsValue, name: &str) -> Result<Function, JsValue> {
    Reflect::get(module, &JsValue::from_str(name))?
        .dyn_into::<Function>()
        .map_err(|_| JsValue::from_str(&format!("compiler module has no function {name}")))
}

fn fault_from_js(thrown: &JsValue) -> CompilerFault {
    let prop = |key: &str| {
        if !thrown.is_object() {
            return None;
        }
        Reflect::get(thrown, &JsValue::from_str(key))
            .ok()
            .and_then(|v| v.as_string())
    };
    fault_from_parts(prop("name"), prop("message"), prop("stack"), stringify(thrown))
}

/// Text form of a non-string JS value (`JSON.stringify`, else debug form).
fn stringify(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    JSON::stringify(value)
        .ok()
        .and_then(|s| s.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}
