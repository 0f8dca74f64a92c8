//! Server lifecycle phase
//!
//! One atomic cell holds the whole-server phase. Only the shutdown path
//! writes it; the acceptor and every read loop observe it through the
//! accessors below.

use std::sync::atomic::{AtomicU8, Ordering};

/// Whole-server lifecycle phase
///
/// Transitions are one-way: `Initialized → Listening → ShuttingDown →
/// Stopped`. There is no way back to `Listening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    /// Constructed, not yet bound
    Initialized,
    /// Accept loop running
    Listening,
    /// Shutdown in progress: acceptor stopped, sessions draining
    ShuttingDown,
    /// All resources released
    Stopped,
}

/// Atomic holder for the server phase
#[derive(Debug)]
pub struct Lifecycle {
    phase: AtomicU8,
}

const INITIALIZED: u8 = 0;
const LISTENING: u8 = 1;
const SHUTTING_DOWN: u8 = 2;
const STOPPED: u8 = 3;

impl Lifecycle {
    /// Create a lifecycle in the `Initialized` phase
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(INITIALIZED),
        }
    }

    /// Current phase
    pub fn phase(&self) -> ServerPhase {
        match self.phase.load(Ordering::Acquire) {
            INITIALIZED => ServerPhase::Initialized,
            LISTENING => ServerPhase::Listening,
            SHUTTING_DOWN => ServerPhase::ShuttingDown,
            _ => ServerPhase::Stopped,
        }
    }

    /// Mark the accept loop running
    pub fn begin_listening(&self) {
        let _ = self.phase.compare_exchange(
            INITIALIZED,
            LISTENING,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Try to start shutdown
    ///
    /// Returns `true` for exactly one caller; every later (or concurrent
    /// losing) call gets `false`, making shutdown idempotent.
    pub fn begin_shutdown(&self) -> bool {
        self.phase
            .compare_exchange(
                LISTENING,
                SHUTTING_DOWN,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
            || self
                .phase
                .compare_exchange(
                    INITIALIZED,
                    SHUTTING_DOWN,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
    }

    /// Mark shutdown complete
    pub fn mark_stopped(&self) {
        let _ = self.phase.compare_exchange(
            SHUTTING_DOWN,
            STOPPED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Check whether shutdown has started (or finished)
    pub fn is_shutting_down(&self) -> bool {
        self.phase.load(Ordering::Acquire) >= SHUTTING_DOWN
    }

    /// Check whether the accept loop should keep running
    pub fn is_listening(&self) -> bool {
        self.phase.load(Ordering::Acquire) == LISTENING
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
