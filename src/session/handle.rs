//! Registry-held side of a session
//!
//! The read half of a connection is owned by exactly one read-loop task.
//! Everything the rest of the server needs — identity, address, and a way
//! to write — lives in this cheaply clonable handle.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use super::SessionId;

/// Non-owning reference to a live session, used for lookup and broadcast
/// targeting
///
/// The write half sits behind a mutex so overlapping dispatches cannot
/// interleave partial writes onto the same transport.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    peer_addr: SocketAddr,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl SessionHandle {
    /// Wrap the write half of an accepted connection
    pub fn new(id: SessionId, peer_addr: SocketAddr, writer: OwnedWriteHalf) -> Self {
        Self {
            id,
            peer_addr,
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Session identifier
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Remote peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Write a text chunk to this session's transport
    ///
    /// A failure here means the session is dead; the caller is responsible
    /// for unregistering it and closing the handle.
    pub async fn send(&self, text: &str) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await
    }

    /// Shut down the write side of the transport
    ///
    /// Sends FIN so a peer parked on a read sees EOF promptly. Errors are
    /// ignored: the socket may already be gone, which is the state we
    /// wanted anyway.
    pub async fn close(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}
