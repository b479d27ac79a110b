#![forbid(unsafe_code)]

//! WASM frontend for the shader-script demo page.
//!
//! Binds the host-agnostic drivers in `lsdemo-core` to the browser:
//! - `dom_host` materializes control requests as range inputs, checkboxes
//!   and text blocks,
//! - `js_compiler` calls the Emscripten compiler module,
//! - `display` writes compile status, frame output and tick timing,
//! - `storage` and `editor` keep the editor text across reloads,
//! - `wasm` owns the timer loop and exports [`LsDemoWeb`] to JavaScript.
//!
//! [`console_layer`] and [`markup`] do not touch `web-sys` and build on every
//! target.

pub mod console_layer;
pub mod markup;

#[cfg(target_arch = "wasm32")]
mod display;
#[cfg(target_arch = "wasm32")]
mod dom_host;
#[cfg(target_arch = "wasm32")]
mod editor;
#[cfg(target_arch = "wasm32")]
mod js_compiler;
#[cfg(target_arch = "wasm32")]
mod storage;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::LsDemoWeb;

use lsdemo_core::{ConfigError, HarnessConfig};

/// Parse the optional options JSON handed to the constructor.
pub fn parse_options(options_json: Option<&str>) -> Result<HarnessConfig, ConfigError> {
    match options_json.map(str::trim) {
        None | Some("") | Some("null") | Some("undefined") => Ok(HarnessConfig::default()),
        Some(json) => HarnessConfig::from_json_str(json),
    }
}

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct LsDemoWeb {
    config: HarnessConfig,
}

#[cfg(not(target_arch = "wasm32"))]
impl LsDemoWeb {
    pub fn new(options_json: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            config: parse_options(options_json)?,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_options_are_defaults() {
        for raw in [None, Some(""), Some("null"), Some(" undefined ")] {
            assert_eq!(parse_options(raw).unwrap(), HarnessConfig::default());
        }
    }

    #[test]
    fn options_are_validated() {
        assert_eq!(
            parse_options(Some(r#"{"tick_interval_ms": 40}"#))
                .unwrap()
                .tick_interval_ms,
            40
        );
        assert!(parse_options(Some(r#"{"storage_key": ""}"#)).is_err());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn native_stub_keeps_config() {
        let web = LsDemoWeb::new(Some(r#"{"swapchain": {"width": 640}}"#)).unwrap();
        assert_eq!(web.config().swapchain.width, 640);
        assert_eq!(web.config().swapchain.height, 512);
    }
}
