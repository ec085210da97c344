//! Activity lifecycle for choreographed transitions.
//!
//! An activity is a capability attached to a state that must be prepared
//! before it is usable and released before it is torn down. Preparation and
//! release may each span several ticks; the transition sequencer drives them
//! through phase sequences, polling once per tick. Nothing here blocks — an
//! operation that needs more time simply reports [`Progress::Pending`] and
//! retains its own progress until the next poll.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Activation state of an [`Activity`].
///
/// Modes only ever advance through the cycle
/// `Inactive → Activating → Active → Deactivating → Inactive`; no step is
/// ever skipped, independently per activity instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityMode {
    /// Not prepared; eligible for activation.
    Inactive,
    /// Activation work is in flight.
    Activating,
    /// Prepared and usable; eligible for deactivation.
    Active,
    /// Deactivation work is in flight.
    Deactivating,
}

/// Result of polling an in-flight activity operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// The operation needs at least one more tick.
    Pending,
    /// No work is in flight; the activity has settled.
    Done,
}

/// Shared cancellation flag scoped to one transition.
///
/// Issued fresh by the sequencer each time a transition begins; cancelling it
/// tells every operation still in flight under the previous transition to
/// stop as soon as possible. Operations check the flag at their own
/// suspension points and leave their mode wherever it happens to be — no
/// rollback is attempted.
///
/// # Example
///
/// ```rust
/// use choreo::CancelSignal;
///
/// let signal = CancelSignal::new();
/// let observer = signal.clone();
///
/// assert!(!observer.is_cancelled());
/// signal.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    /// Create a fresh, uncancelled signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Fire-and-forget; never surfaced as an error.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A capability with its own four-mode lifecycle, independent of the owning
/// state's structural enter/exit.
///
/// Implementations decide whether their work completes within one call or
/// suspends across several ticks; the contract only requires monotonic mode
/// progression and responsiveness to cancellation:
///
/// - [`activate`](Activity::activate) is a silent no-op unless the mode is
///   [`ActivityMode::Inactive`]; it moves the activity to `Activating`.
/// - [`deactivate`](Activity::deactivate) is the mirror image, requiring
///   [`ActivityMode::Active`].
/// - [`poll`](Activity::poll) advances one tick of in-flight work and
///   reports whether the activity has settled. A cancelled operation reports
///   [`Progress::Done`] and leaves the mode wherever it is.
///
/// The wrong-mode no-op is also what skips already-settled activities when
/// phases overlap after a coalesced request.
pub trait Activity: Send {
    /// Name used in logs and snapshots.
    fn name(&self) -> &str;

    /// Current activation state.
    fn mode(&self) -> ActivityMode;

    /// Begin activation. No-op unless the mode is `Inactive`.
    fn activate(&mut self, cancel: &CancelSignal);

    /// Begin deactivation. No-op unless the mode is `Active`.
    fn deactivate(&mut self, cancel: &CancelSignal);

    /// Advance in-flight work by one tick.
    fn poll(&mut self, cancel: &CancelSignal) -> Progress;
}

/// Activity whose operations settle within the activating call.
pub struct InstantActivity {
    name: String,
    mode: ActivityMode,
}

impl InstantActivity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: ActivityMode::Inactive,
        }
    }
}

impl Activity for InstantActivity {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> ActivityMode {
        self.mode
    }

    fn activate(&mut self, _cancel: &CancelSignal) {
        if self.mode != ActivityMode::Inactive {
            return;
        }
        // The work completes within the call; the mode still steps through
        // Activating rather than jumping straight to Active.
        self.mode = ActivityMode::Activating;
        self.mode = ActivityMode::Active;
        debug!(activity = %self.name, "activated");
    }

    fn deactivate(&mut self, _cancel: &CancelSignal) {
        if self.mode != ActivityMode::Active {
            return;
        }
        self.mode = ActivityMode::Deactivating;
        self.mode = ActivityMode::Inactive;
        debug!(activity = %self.name, "deactivated");
    }

    fn poll(&mut self, _cancel: &CancelSignal) -> Progress {
        Progress::Done
    }
}

/// Activity whose activation and deactivation each take a fixed number of
/// ticks to settle.
///
/// # Example
///
/// ```rust
/// use choreo::{Activity, ActivityMode, CancelSignal, DelayActivity, Progress};
///
/// let signal = CancelSignal::new();
/// let mut warmup = DelayActivity::new("warmup", 2);
///
/// warmup.activate(&signal);
/// assert_eq!(warmup.mode(), ActivityMode::Activating);
///
/// assert_eq!(warmup.poll(&signal), Progress::Pending);
/// assert_eq!(warmup.poll(&signal), Progress::Done);
/// assert_eq!(warmup.mode(), ActivityMode::Active);
/// ```
pub struct DelayActivity {
    name: String,
    ticks: u32,
    remaining: u32,
    mode: ActivityMode,
}

impl DelayActivity {
    /// `ticks` is the number of polls each operation takes to settle; zero
    /// settles on the first poll.
    pub fn new(name: impl Into<String>, ticks: u32) -> Self {
        Self {
            name: name.into(),
            ticks,
            remaining: 0,
            mode: ActivityMode::Inactive,
        }
    }
}

impl Activity for DelayActivity {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> ActivityMode {
        self.mode
    }

    fn activate(&mut self, _cancel: &CancelSignal) {
        if self.mode != ActivityMode::Inactive {
            return;
        }
        self.mode = ActivityMode::Activating;
        self.remaining = self.ticks;
        debug!(activity = %self.name, ticks = self.ticks, "activation started");
    }

    fn deactivate(&mut self, _cancel: &CancelSignal) {
        if self.mode != ActivityMode::Active {
            return;
        }
        self.mode = ActivityMode::Deactivating;
        self.remaining = self.ticks;
        debug!(activity = %self.name, ticks = self.ticks, "deactivation started");
    }

    fn poll(&mut self, cancel: &CancelSignal) -> Progress {
        match self.mode {
            ActivityMode::Activating | ActivityMode::Deactivating => {
                if cancel.is_cancelled() {
                    debug!(activity = %self.name, mode = ?self.mode, "operation abandoned");
                    return Progress::Done;
                }
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining > 0 {
                    return Progress::Pending;
                }
                self.mode = match self.mode {
                    ActivityMode::Activating => ActivityMode::Active,
                    _ => ActivityMode::Inactive,
                };
                debug!(activity = %self.name, mode = ?self.mode, "operation settled");
                Progress::Done
            }
            _ => Progress::Done,
        }
    }
}
