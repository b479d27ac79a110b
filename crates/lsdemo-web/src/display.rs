#![forbid(unsafe_code)]

//! Output panels: compile status, frame result and tick timing.
//!
//! Any panel whose element is missing from the page is skipped; the harness
//! still runs and logs.

use core::time::Duration;

use lsdemo_core::diagnostics::TimingHistogram;
use lsdemo_core::{CompileDisplay, CompileReport, CompilerFault, DisplayState, FrameDisplay};
use web_sys::Element;

use crate::markup::timing_readout;

#[derive(Default)]
pub struct DomDisplay {
    pub compile_output: Option<Element>,
    pub frame_output: Option<Element>,
    pub timing: Option<Element>,
}

impl DomDisplay {
    fn write(panel: Option<&Element>, text: &str, state: Option<DisplayState>) {
        let Some(panel) = panel else {
            return;
        };
        panel.set_text_content(Some(text));
        if let Some(state) = state
            && let Err(e) = panel.set_attribute("style", state.border_style())
        {
            tracing::debug!(error = ?e, "failed to style output panel");
        }
    }
}

impl CompileDisplay for DomDisplay {
    fn show_compile(&mut self, report: &CompileReport) {
        tracing::debug!(
            attempt = report.attempt,
            state = ?report.state,
            elapsed_us = report.elapsed.as_micros() as u64,
            "compile finished"
        );
        Self::write(
            self.compile_output.as_ref(),
            &report.text,
            Some(report.state),
        );
    }
}

impl FrameDisplay for DomDisplay {
    fn report_tick_time(&mut self, elapsed: Duration, summary: &TimingHistogram) {
        Self::write(self.timing.as_ref(), &timing_readout(elapsed, summary), None);
    }

    fn show_frame_output(&mut self, serialized: &str) {
        Self::write(
            self.frame_output.as_ref(),
            serialized,
            Some(DisplayState::Success),
        );
    }

    fn show_frame_fault(&mut self, fault: &CompilerFault) {
        Self::write(
            self.frame_output.as_ref(),
            &fault.to_string(),
            Some(DisplayState::Failure),
        );
    }
}
