//! Session state machine
//!
//! Tracks one client connection from accept to teardown. The read-loop task
//! owns this state exclusively; the registry only ever sees the session's
//! [`SessionHandle`](super::SessionHandle).

use std::net::SocketAddr;
use std::time::Instant;

/// Stable identifier for a session
///
/// Allocated from a server-wide counter, never derived from the peer
/// address (addresses repeat across reconnects).
pub type SessionId = u64;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// TCP accepted, not yet registered
    Connecting,
    /// Registered, read loop running
    Active,
    /// Teardown initiated
    Closing,
    /// Transport released, removed from registry
    Closed,
}

/// Why a session entered teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the connection cleanly (zero-byte read)
    PeerClosed,
    /// Read or write failed
    TransportError,
    /// Server-wide shutdown
    Shutdown,
}

/// Per-session state owned by the read-loop task
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: SessionId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection accept time
    pub connected_at: Instant,

    /// Time of the last successful read
    pub last_activity: Instant,

    /// Teardown reason, set on entering `Closing`
    pub close_reason: Option<CloseReason>,
}

impl SessionState {
    /// Create state for a freshly accepted connection
    pub fn new(id: SessionId, peer_addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Connecting,
            connected_at: now,
            last_activity: now,
            close_reason: None,
        }
    }

    /// Mark the session registered and its read loop running
    pub fn mark_active(&mut self) {
        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::Active;
        }
    }

    /// Begin teardown with the given reason
    ///
    /// The first reason wins; a later call (e.g. a broadcast-side failure
    /// racing the read loop's own teardown) does not overwrite it.
    pub fn begin_close(&mut self, reason: CloseReason) {
        if matches!(self.phase, SessionPhase::Connecting | SessionPhase::Active) {
            self.phase = SessionPhase::Closing;
            self.close_reason = Some(reason);
        }
    }

    /// Mark the transport released
    ///
    /// Only legal from `Closing`; no transition skips the teardown phase.
    pub fn mark_closed(&mut self) {
        if self.phase == SessionPhase::Closing {
            self.phase = SessionPhase::Closed;
        }
    }

    /// Refresh the last-activity timestamp
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Check if the session is registered and reading
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8081)
    }

    #[test]
    fn test_session_lifecycle() {
        let mut state = SessionState::new(1, addr());
        assert_eq!(state.phase, SessionPhase::Connecting);

        state.mark_active();
        assert_eq!(state.phase, SessionPhase::Active);
        assert!(state.is_active());

        state.begin_close(CloseReason::PeerClosed);
        assert_eq!(state.phase, SessionPhase::Closing);
        assert_eq!(state.close_reason, Some(CloseReason::PeerClosed));

        state.mark_closed();
        assert_eq!(state.phase, SessionPhase::Closed);
    }

    #[test]
    fn test_closed_requires_closing() {
        let mut state = SessionState::new(1, addr());
        state.mark_active();

        // Closing is never skipped
        state.mark_closed();
        assert_eq!(state.phase, SessionPhase::Active);
    }

    #[test]
    fn test_first_close_reason_wins() {
        let mut state = SessionState::new(1, addr());
        state.mark_active();

        state.begin_close(CloseReason::TransportError);
        state.begin_close(CloseReason::Shutdown);

        assert_eq!(state.close_reason, Some(CloseReason::TransportError));
    }

    #[test]
    fn test_touch_updates_activity() {
        let mut state = SessionState::new(1, addr());
        let before = state.last_activity;
        std::thread::sleep(std::time::Duration::from_millis(5));
        state.touch();
        assert!(state.last_activity > before);
    }
}
