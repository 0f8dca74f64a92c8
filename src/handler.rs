//! Front-end collaborator interface
//!
//! An embedding front-end (terminal UI, window, test harness) observes
//! relay traffic through this trait and injects operator messages through
//! [`RelayServer::submit_broadcast`](crate::server::RelayServer::submit_broadcast).

/// Callbacks invoked by the relay toward its front-end
///
/// All methods have no-op defaults so a headless deployment can use
/// [`NullHandler`].
pub trait RelayHandler: Send + Sync + 'static {
    /// Called exactly once per dispatched message with the formatted
    /// envelope a listening client would display
    fn on_inbound_event(&self, text: &str) {
        let _ = text;
    }
}

/// Handler that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandler;

impl RelayHandler for NullHandler {}
