//! Client registry implementation
//!
//! The single source of truth for "who is connected". All mutation and
//! iteration goes through this type; the underlying map is never exposed.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::RelayError;
use crate::session::{SessionHandle, SessionId};

/// Concurrency-safe set of currently active sessions
///
/// Thread-safe via `RwLock`. A session appears here if and only if it is
/// Active: insertion happens once at accept, removal once at the start of
/// teardown, before the transport is closed.
#[derive(Default)]
pub struct ClientRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active session
    ///
    /// Returns `DuplicateSession` if the identifier is already present.
    /// Under correct accept sequencing this cannot happen; callers log it
    /// and drop the connection rather than crashing the server.
    pub async fn register(&self, handle: SessionHandle) -> Result<(), RelayError> {
        let mut sessions = self.sessions.write().await;

        if sessions.contains_key(&handle.id()) {
            return Err(RelayError::DuplicateSession(handle.id()));
        }

        tracing::debug!(
            session_id = handle.id(),
            peer = %handle.peer_addr(),
            total = sessions.len() + 1,
            "Session registered"
        );
        sessions.insert(handle.id(), handle);

        Ok(())
    }

    /// Remove a session if present
    ///
    /// Returns whether anything was removed. Double removal is expected —
    /// a read loop's own cleanup can race a broadcast-triggered cleanup —
    /// so absence is not an error.
    pub async fn unregister(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id);

        if let Some(ref handle) = removed {
            tracing::debug!(
                session_id = id,
                peer = %handle.peer_addr(),
                "Session unregistered"
            );
        }

        removed.is_some()
    }

    /// Take a consistent point-in-time copy of all active sessions
    ///
    /// Broadcast iteration works off this copy, never racing concurrent
    /// register/unregister calls.
    pub async fn snapshot(&self) -> Vec<SessionHandle> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Current number of active sessions
    ///
    /// Operator feedback only; never used for correctness decisions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Empty the registry and return every handle
    ///
    /// One critical section for shutdown: after this returns, no broadcast
    /// can target the drained sessions, and the caller owns closing them.
    pub async fn drain(&self) -> Vec<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        sessions.drain().map(|(_, handle)| handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn handle(id: SessionId) -> SessionHandle {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let peer = client.local_addr().unwrap();
        let (_server_side, _) = listener.accept().await.unwrap();
        let (_read, write) = client.into_split();
        SessionHandle::new(id, peer, write)
    }

    #[tokio::test]
    async fn test_register_and_count() {
        let registry = ClientRegistry::new();
        assert_eq!(registry.count().await, 0);

        registry.register(handle(1).await).await.unwrap();
        registry.register(handle(2).await).await.unwrap();
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = ClientRegistry::new();
        registry.register(handle(1).await).await.unwrap();

        let result = registry.register(handle(1).await).await;
        assert!(matches!(result, Err(RelayError::DuplicateSession(1))));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = ClientRegistry::new();
        registry.register(handle(1).await).await.unwrap();

        assert!(registry.unregister(1).await);
        assert!(!registry.unregister(1).await);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_is_decoupled() {
        let registry = ClientRegistry::new();
        registry.register(handle(1).await).await.unwrap();
        registry.register(handle(2).await).await.unwrap();

        let snap = registry.snapshot().await;
        assert_eq!(snap.len(), 2);

        // Mutating the registry does not affect the copy
        registry.unregister(1).await;
        assert_eq!(snap.len(), 2);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_drain_empties_registry() {
        let registry = ClientRegistry::new();
        registry.register(handle(1).await).await.unwrap();
        registry.register(handle(2).await).await.unwrap();
        registry.register(handle(3).await).await.unwrap();

        let drained = registry.drain().await;
        assert_eq!(drained.len(), 3);
        assert_eq!(registry.count().await, 0);

        // Second drain finds nothing
        assert!(registry.drain().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let registry = std::sync::Arc::new(ClientRegistry::new());

        let mut tasks = Vec::new();
        for id in 0..16u64 {
            let registry = std::sync::Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                registry.register(handle(id).await).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.count().await, 16);
    }
}
