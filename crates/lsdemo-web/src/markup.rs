#![forbid(unsafe_code)]

//! Conversions between core values and the strings the DOM speaks.
//!
//! Inputs carry their value as text (`<input type=range value="0.25">`), so
//! every read and write goes through here. Kept free of `web-sys` so it can be
//! tested natively.

use core::time::Duration;

use lsdemo_core::diagnostics::TimingHistogram;
use lsdemo_core::{CompilerFault, ControlValue, WidgetKind};

/// Resolution of float sliders: the range is split into this many steps.
pub const FLOAT_SLIDER_STEPS: f64 = 1000.0;

/// `step` attribute for a slider of `kind` over `[lo, hi]`.
#[must_use]
pub fn slider_step(kind: WidgetKind, lo: f64, hi: f64) -> String {
    match kind {
        WidgetKind::SliderInt => "1".to_string(),
        _ => {
            let span = hi - lo;
            if span.is_finite() && span > 0.0 {
                format_number(span / FLOAT_SLIDER_STEPS)
            } else {
                "any".to_string()
            }
        }
    }
}

/// Shortest decimal text for `value`; integral values print without `.0`.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Text written into an input's `value` attribute.
#[must_use]
pub fn value_attr(value: &ControlValue) -> String {
    match value {
        ControlValue::Float(v) => format_number(*v),
        ControlValue::Int(v) => v.to_string(),
        ControlValue::Bool(v) => v.to_string(),
        ControlValue::Text(t) => t.clone(),
    }
}

/// Interpret a slider's `value` text. Browsers clamp and snap to `step`, so
/// an integer slider may still report `"3.0000001"` after a range change.
#[must_use]
pub fn parse_slider(kind: WidgetKind, raw: &str) -> Option<ControlValue> {
    let v: f64 = raw.trim().parse().ok()?;
    if !v.is_finite() {
        return None;
    }
    match kind {
        WidgetKind::SliderFloat => Some(ControlValue::Float(v)),
        WidgetKind::SliderInt => Some(ControlValue::Int(v.round() as i64)),
        WidgetKind::Checkbox | WidgetKind::TextBlock => None,
    }
}

/// Label shown next to a slider or checkbox.
#[must_use]
pub fn control_label(name: &str, value: &ControlValue) -> String {
    match value {
        ControlValue::Bool(_) | ControlValue::Text(_) => name.to_string(),
        other => format!("{name}: {}", value_attr(other)),
    }
}

/// One-line tick timing readout.
#[must_use]
pub fn timing_readout(elapsed: Duration, summary: &TimingHistogram) -> String {
    format!(
        "frame {:.2} ms (p50 {:.2} / p95 {:.2} / max {:.2} ms over {})",
        elapsed.as_secs_f64() * 1e3,
        summary.p50_us as f64 / 1e3,
        summary.p95_us as f64 / 1e3,
        summary.max_us as f64 / 1e3,
        summary.count
    )
}

/// Build a fault from the properties of a thrown JS value.
///
/// `name` defaults to `Error`; `message` falls back to the value's own string
/// form, which is what a thrown string or number gives.
#[must_use]
pub fn fault_from_parts(
    name: Option<String>,
    message: Option<String>,
    stack: Option<String>,
    fallback: impl Into<String>,
) -> CompilerFault {
    let fault = CompilerFault::new(
        name.unwrap_or_else(|| "Error".to_string()),
        message.unwrap_or_else(|| fallback.into()),
    );
    match stack {
        Some(stack) => fault.with_trace(stack),
        None => fault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_sliders_step_by_one() {
        assert_eq!(slider_step(WidgetKind::SliderInt, 0.0, 10.0), "1");
    }

    #[test]
    fn float_sliders_split_range() {
        assert_eq!(slider_step(WidgetKind::SliderFloat, 0.0, 1.0), "0.001");
        assert_eq!(slider_step(WidgetKind::SliderFloat, 0.0, 2000.0), "2");
        assert_eq!(slider_step(WidgetKind::SliderFloat, 1.0, 1.0), "any");
        assert_eq!(slider_step(WidgetKind::SliderFloat, 1.0, 0.0), "any");
    }

    #[test]
    fn numbers_print_compactly() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(value_attr(&ControlValue::Int(-4)), "-4");
    }

    #[test]
    fn slider_text_parses_by_kind() {
        assert_eq!(
            parse_slider(WidgetKind::SliderFloat, "0.25"),
            Some(ControlValue::Float(0.25))
        );
        assert_eq!(
            parse_slider(WidgetKind::SliderInt, "3.0000001"),
            Some(ControlValue::Int(3))
        );
        assert_eq!(parse_slider(WidgetKind::SliderFloat, ""), None);
        assert_eq!(parse_slider(WidgetKind::SliderFloat, "NaN"), None);
        assert_eq!(parse_slider(WidgetKind::Checkbox, "1"), None);
    }

    #[test]
    fn labels_show_slider_values() {
        assert_eq!(control_label("R", &ControlValue::Float(0.5)), "R: 0.5");
        assert_eq!(control_label("flip", &ControlValue::Bool(true)), "flip");
    }

    #[test]
    fn readout_is_in_milliseconds() {
        let summary = TimingHistogram {
            count: 3,
            last_us: 1500,
            min_us: 1000,
            max_us: 2000,
            p50_us: 1500,
            p95_us: 2000,
            mean_us: 1500,
        };
        assert_eq!(
            timing_readout(Duration::from_micros(1500), &summary),
            "frame 1.50 ms (p50 1.50 / p95 2.00 / max 2.00 ms over 3)"
        );
    }

    #[test]
    fn thrown_values_become_faults() {
        let fault = fault_from_parts(
            Some("RuntimeError".into()),
            Some("unreachable".into()),
            Some("at LegitScriptLoad".into()),
            "ignored",
        );
        assert_eq!(fault.to_string(), "RuntimeError unreachable\n at LegitScriptLoad");

        let thrown_string = fault_from_parts(None, None, None, "bad input");
        assert_eq!(thrown_string.name, "Error");
        assert_eq!(thrown_string.message, "bad input");
    }
}
