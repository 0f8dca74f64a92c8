//! Activity log collaborator interface
//!
//! The relay records structured events into an append-only sink it never
//! reads back from. Recording is synchronous, infallible, and must not
//! block: a slow or broken sink is the sink's problem, never the relay's.

use std::fmt;

/// Kind of event recorded into the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A client connected and was registered
    Connected,
    /// A client was unregistered and its transport closed
    Disconnected,
    /// A text chunk was read from a client
    Received,
    /// A message was fanned out to recipients
    Broadcast,
    /// An operator-originated message was fanned out
    ServerMessage,
    /// A transport, decode, or invariant failure
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Connected => "CONNECTED",
            EventKind::Disconnected => "DISCONNECTED",
            EventKind::Received => "RECEIVED",
            EventKind::Broadcast => "BROADCAST",
            EventKind::ServerMessage => "SERVER_MESSAGE",
            EventKind::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Append-only sink for relay activity
///
/// Implementations must be fire-and-forget: `record` cannot fail and must
/// return promptly so it never stalls an accept, read, or dispatch path.
pub trait ActivityLog: Send + Sync {
    /// Record one event attributed to `actor`
    fn record(&self, actor: &str, kind: EventKind, payload: &str);
}

/// Default activity log backed by `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ActivityLog for TracingLog {
    fn record(&self, actor: &str, kind: EventKind, payload: &str) {
        match kind {
            EventKind::Error => {
                tracing::error!(actor = %actor, kind = %kind, payload = %payload, "activity");
            }
            _ => {
                tracing::info!(actor = %actor, kind = %kind, payload = %payload, "activity");
            }
        }
    }
}
