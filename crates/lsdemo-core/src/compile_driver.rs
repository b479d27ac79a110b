//! Compile-on-edit: one compile attempt per editor change.
//!
//! The host calls [`CompileDriver::on_edit`] once at startup and then from the
//! editor's change listener. There is no retry and no queue; the most recent
//! call's report is what the display shows.

use core::time::Duration;

use crate::Clock;
use crate::compiler::{Compiler, has_error_marker};

/// Display state of the compile panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayState {
    /// Compiled cleanly.
    Success,
    /// Compiled, but the result carries a script-level error.
    Warning,
    /// The compiler call itself faulted.
    Failure,
}

impl DisplayState {
    /// CSS border used by the web display.
    #[must_use]
    pub const fn border_style(self) -> &'static str {
        match self {
            Self::Success => "border:2px solid green",
            Self::Warning => "border:2px solid orange",
            Self::Failure => "border:2px solid red",
        }
    }
}

/// Outcome of one compile attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    pub state: DisplayState,
    /// Serialized result, or the verbatim fault for [`DisplayState::Failure`].
    pub text: String,
    pub elapsed: Duration,
    /// 1-based attempt counter.
    pub attempt: u64,
}

/// Source of the script text.
pub trait TextEditor {
    fn current_text(&self) -> String;
}

/// Where compile reports are rendered.
pub trait CompileDisplay {
    fn show_compile(&mut self, report: &CompileReport);
}

/// Runs the compiler on every edit and classifies the result.
#[derive(Debug)]
pub struct CompileDriver<K: Clock> {
    clock: K,
    attempts: u64,
    last: Option<CompileReport>,
}

impl<K: Clock> CompileDriver<K> {
    #[must_use]
    pub fn new(clock: K) -> Self {
        Self {
            clock,
            attempts: 0,
            last: None,
        }
    }

    /// Compile `source` once and push the report to `display`.
    pub fn on_edit<C, D>(&mut self, compiler: &mut C, source: &str, display: &mut D) -> &CompileReport
    where
        C: Compiler + ?Sized,
        D: CompileDisplay + ?Sized,
    {
        self.attempts += 1;
        let span = tracing::debug_span!(
            "compile",
            attempt = self.attempts,
            source_len = source.len(),
            elapsed_us = tracing::field::Empty
        );
        let _guard = span.enter();

        let start = self.clock.now_mono();
        let outcome = compiler.load(source);
        let elapsed = self.clock.now_mono().saturating_sub(start);
        span.record("elapsed_us", elapsed.as_micros() as u64);

        let (state, text) = match outcome {
            Ok(result) if has_error_marker(&result) => {
                tracing::debug!("compile result carries a script error");
                (DisplayState::Warning, result)
            }
            Ok(result) => (DisplayState::Success, result),
            Err(fault) => {
                tracing::warn!(name = %fault.name, error = %fault.message, "compiler faulted");
                (DisplayState::Failure, fault.to_string())
            }
        };

        let report = CompileReport {
            state,
            text,
            elapsed,
            attempt: self.attempts,
        };
        display.show_compile(&report);
        self.last.insert(report)
    }

    /// Compile whatever the editor currently holds.
    pub fn on_editor_change<C, E, D>(
        &mut self,
        compiler: &mut C,
        editor: &E,
        display: &mut D,
    ) -> &CompileReport
    where
        C: Compiler + ?Sized,
        E: TextEditor + ?Sized,
        D: CompileDisplay + ?Sized,
    {
        let source = editor.current_text();
        self.on_edit(compiler, &source, display)
    }

    /// Report of the most recent attempt.
    pub fn last_report(&self) -> Option<&CompileReport> {
        self.last.as_ref()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn clock_mut(&mut self) -> &mut K {
        &mut self.clock
    }
}
