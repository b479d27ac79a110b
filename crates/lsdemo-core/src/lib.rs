#![forbid(unsafe_code)]

//! `lsdemo-core` holds the host-agnostic half of the shader-script browser demo.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment (JS) owns the DOM, the
//!   compiler module, storage and timers. This crate only sees them through
//!   the collaborator traits below.
//! - **Stable widget identity**: control requests emitted by the script every
//!   frame are reconciled against persistent widgets keyed by request name.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! The pipeline for one frame:
//!
//! ```text
//! Compiler::advance_frame ─▶ parse_requests ─▶ normalize ─▶ reconcile ─▶ WidgetHost
//!          ▲                                                    │
//!          └──────────── effective values (next tick) ◀─────────┘
//! ```
//!
//! `lsdemo-web` wraps these pieces with `wasm-bindgen`.

pub mod compile_driver;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod frame_driver;
pub mod frame_input;
pub mod normalize;
pub mod persistence;
pub mod reconcile;
pub mod registry;
pub mod request;

use core::time::Duration;

pub use compile_driver::{CompileDisplay, CompileDriver, CompileReport, DisplayState};
pub use compiler::{Compiler, CompilerFault, FrameResult};
pub use config::{ConfigError, HarnessConfig};
pub use frame_driver::{FrameDisplay, FrameDriver, TickOutcome, TickReport};
pub use frame_input::{FrameInput, FrameInputs, InputValue};
pub use normalize::{NormalizedRequest, TEXT_KEY_PREFIX, normalize};
pub use persistence::{EditorSnapshot, MemoryStore, SnapshotStore, StorageError};
pub use reconcile::{HostError, ReconcileReport, WidgetHost, reconcile};
pub use registry::{ControlValue, RegistryError, Widget, WidgetKind, WidgetRegistry};
pub use request::{ControlRequest, MalformedRequest, ParsedRequests, parse_requests};

/// Source of monotonic time for tick and compile measurements.
pub trait Clock {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now_mono(&self) -> Duration;
}

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set current monotonic time.
    pub fn set(&mut self, now: Duration) {
        self.now = now;
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

impl Clock for DeterministicClock {
    fn now_mono(&self) -> Duration {
        self.now
    }
}

/// Wall-clock backed monotonic clock.
///
/// Uses `web_time::Instant`, which maps to `performance.now()` in the browser
/// and to `std::time::Instant` elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: web_time::Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: web_time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_mono(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_clock_advances_and_saturates() {
        let mut clock = DeterministicClock::new();
        assert_eq!(clock.now_mono(), Duration::ZERO);
        clock.advance(Duration::from_millis(16));
        assert_eq!(clock.now_mono(), Duration::from_millis(16));
        clock.set(Duration::MAX);
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now_mono(), Duration::MAX);
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_mono();
        let b = clock.now_mono();
        assert!(b >= a);
    }
}
