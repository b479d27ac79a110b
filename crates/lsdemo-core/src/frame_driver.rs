#![forbid(unsafe_code)]

//! Host-driven frame loop.
//!
//! [`FrameDriver`] runs one frame per [`tick`](FrameDriver::tick) without
//! threads or blocking. The host (JavaScript) owns the timer:
//!
//! 1. Call [`FrameDriver::tick`].
//! 2. If the outcome carries `next_tick`, schedule the next call after that
//!    delay. Ticks therefore never overlap.
//! 3. [`FrameDriver::stop`] makes every later tick a no-op returning `None`.
//!
//! # Example
//!
//! ```ignore
//! let mut driver = FrameDriver::new(host, MonotonicClock::new(), &config);
//! loop {
//!     let outcome = driver.tick(&mut compiler, &mut display);
//!     let Some(delay) = outcome.next_tick else { break };
//!     sleep(delay);
//! }
//! ```
//!
//! Each tick sends `@swapchain_size`, `@time` and the previous tick's
//! effective widget values to the compiler, reconciles the returned
//! `context_requests` (when present) and refreshes the output panel only if
//! the serialized result changed.

use core::time::Duration;
use std::collections::BTreeMap;

use crate::Clock;
use crate::compiler::{Compiler, CompilerFault, FrameResult};
use crate::config::HarnessConfig;
use crate::diagnostics::{TickStats, TimingHistogram};
use crate::frame_input::{FrameInputs, InputValue};
use crate::normalize::normalize;
use crate::reconcile::{ReconcileReport, WidgetHost, reconcile};
use crate::registry::{ControlValue, WidgetRegistry};
use crate::request::{MalformedRequest, parse_requests};

/// Where frame results and timings are rendered.
pub trait FrameDisplay {
    /// Called once per tick with the tick's wall-clock duration.
    fn report_tick_time(&mut self, elapsed: Duration, summary: &TimingHistogram);

    /// Called only when the serialized frame result differs from what the
    /// panel last showed.
    fn show_frame_output(&mut self, serialized: &str);

    /// Called when `advance_frame` itself faulted.
    fn show_frame_fault(&mut self, fault: &CompilerFault);
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub frame_idx: u64,
    pub elapsed: Duration,
    /// Present when the result carried `context_requests`.
    pub reconcile: Option<ReconcileReport>,
    pub malformed: Vec<MalformedRequest>,
    pub fault: Option<CompilerFault>,
    /// The result was not a JSON object.
    pub unparsed: bool,
    /// The result carried a script-level error.
    pub script_error: bool,
    /// The output panel was refreshed.
    pub output_changed: bool,
}

/// Result of a [`FrameDriver::tick`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Delay before the next tick; `None` once the driver is stopped.
    pub next_tick: Option<Duration>,
    /// `None` if the driver was stopped and nothing ran.
    pub report: Option<TickReport>,
}

/// Owns the widget registry and drives the per-frame pipeline.
pub struct FrameDriver<H: WidgetHost, K: Clock> {
    host: H,
    registry: WidgetRegistry<H::Handle>,
    clock: K,
    interval: Duration,
    swapchain: (u32, u32),
    running: bool,
    frame_idx: u64,
    started_at: Option<Duration>,
    last_output: Option<String>,
    effective: BTreeMap<String, ControlValue>,
    stats: TickStats,
}

impl<H: WidgetHost, K: Clock> FrameDriver<H, K> {
    /// Create a running driver with an empty registry.
    #[must_use]
    pub fn new(host: H, clock: K, config: &HarnessConfig) -> Self {
        Self {
            host,
            registry: WidgetRegistry::new(),
            clock,
            interval: config.tick_interval(),
            swapchain: (config.swapchain.width, config.swapchain.height),
            running: true,
            frame_idx: 0,
            started_at: None,
            last_output: None,
            effective: BTreeMap::new(),
            stats: TickStats::default(),
        }
    }

    /// Run one frame. See the module docs for the sequence.
    pub fn tick<C, D>(&mut self, compiler: &mut C, display: &mut D) -> TickOutcome
    where
        C: Compiler + ?Sized,
        D: FrameDisplay + ?Sized,
    {
        if !self.running {
            return TickOutcome {
                next_tick: None,
                report: None,
            };
        }

        let span = tracing::debug_span!(
            "frame.tick",
            frame_idx = self.frame_idx,
            elapsed_us = tracing::field::Empty
        );
        let _guard = span.enter();

        let start = self.clock.now_mono();
        let origin = *self.started_at.get_or_insert(start);
        let mut report = TickReport {
            frame_idx: self.frame_idx,
            ..TickReport::default()
        };

        let inputs = self.frame_inputs(start.saturating_sub(origin).as_secs_f64());
        let inputs_json = inputs.to_json_string().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to encode frame inputs");
            "[]".to_string()
        });

        match compiler.advance_frame(&inputs_json) {
            Ok(serialized) => {
                self.apply_result(&serialized, &mut report);
                if self.last_output.as_deref() != Some(serialized.as_str()) {
                    display.show_frame_output(&serialized);
                    self.last_output = Some(serialized);
                    report.output_changed = true;
                }
            }
            Err(fault) => {
                tracing::warn!(name = %fault.name, error = %fault.message, "advance_frame faulted");
                display.show_frame_fault(&fault);
                // The panel now shows the fault, so the next result is new.
                self.last_output = None;
                report.fault = Some(fault);
            }
        }

        let elapsed = self.clock.now_mono().saturating_sub(start);
        span.record("elapsed_us", elapsed.as_micros() as u64);
        self.stats.record(elapsed);
        display.report_tick_time(elapsed, &self.stats.summary());
        report.elapsed = elapsed;
        self.frame_idx += 1;

        TickOutcome {
            next_tick: Some(self.interval),
            report: Some(report),
        }
    }

    /// Stop ticking. Widgets stay mounted.
    pub fn stop(&mut self) {
        if self.running {
            tracing::info!(frame_idx = self.frame_idx, "frame driver stopped");
        }
        self.running = false;
    }

    /// Re-arm a stopped driver. The host must schedule the next tick.
    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Whether ticks currently run.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Canvas size reported from the next tick on.
    pub fn set_swapchain_size(&mut self, width: u32, height: u32) {
        self.swapchain = (width, height);
    }

    pub fn swapchain_size(&self) -> (u32, u32) {
        self.swapchain
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Detach every widget and forget all frame state (full reload).
    pub fn reset_widgets(&mut self) {
        let count = self.registry.len();
        for widget in self.registry.drain() {
            self.host.detach(widget.into_handle());
        }
        self.effective.clear();
        self.last_output = None;
        tracing::info!(count, "widget registry reset");
    }

    /// Effective values that the next tick will send.
    pub fn effective_values(&self) -> &BTreeMap<String, ControlValue> {
        &self.effective
    }

    pub fn registry(&self) -> &WidgetRegistry<H::Handle> {
        &self.registry
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn clock_mut(&mut self) -> &mut K {
        &mut self.clock
    }

    /// Current frame index (monotonically increasing).
    pub fn frame_idx(&self) -> u64 {
        self.frame_idx
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    // --- Private helpers ---

    fn frame_inputs(&self, time_secs: f64) -> FrameInputs {
        let (width, height) = self.swapchain;
        let mut inputs = FrameInputs::with_builtins(width, height, time_secs);
        for (name, value) in &self.effective {
            if let Some(input) = InputValue::from_control(value) {
                inputs.push(name.as_str(), input);
            }
        }
        inputs
    }

    fn apply_result(&mut self, serialized: &str, report: &mut TickReport) {
        let result = match FrameResult::parse(serialized) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "frame result is not a JSON object");
                report.unparsed = true;
                return;
            }
        };
        report.script_error = result.error().is_some();

        let Some(raw) = result.context_requests() else {
            tracing::trace!("no context_requests, widgets left untouched");
            return;
        };
        let parsed = parse_requests(raw);
        let normalized = normalize(&parsed.requests);
        let outcome = reconcile(&normalized, &mut self.registry, &mut self.host);
        self.effective = outcome.effective.clone();
        report.malformed = parsed.malformed;
        report.reconcile = Some(outcome);
    }
}

impl<H, K> core::fmt::Debug for FrameDriver<H, K>
where
    H: WidgetHost,
    K: Clock,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameDriver")
            .field("running", &self.running)
            .field("frame_idx", &self.frame_idx)
            .field("widgets", &self.registry.len())
            .field("interval", &self.interval)
            .finish()
    }
}
