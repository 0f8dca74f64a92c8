//! Broadcast dispatch
//!
//! Delivers one message to every registered session except its origin.
//! Failure on one recipient never aborts delivery to the rest.

use std::sync::Arc;

use crate::handler::RelayHandler;
use crate::log::{ActivityLog, EventKind};
use crate::message::{self, Message};
use crate::registry::ClientRegistry;
use crate::session::SessionId;

/// Fans messages out to every registered session
pub struct BroadcastDispatcher<H: RelayHandler> {
    registry: Arc<ClientRegistry>,
    log: Arc<dyn ActivityLog>,
    handler: Arc<H>,
}

impl<H: RelayHandler> BroadcastDispatcher<H> {
    /// Create a dispatcher over the given registry
    pub fn new(registry: Arc<ClientRegistry>, log: Arc<dyn ActivityLog>, handler: Arc<H>) -> Self {
        Self {
            registry,
            log,
            handler,
        }
    }

    /// Deliver a peer-originated message to everyone except its origin
    ///
    /// Returns the number of recipients written to. Messages from the same
    /// origin arrive here in the order that session produced them; there is
    /// no ordering guarantee between different origins.
    pub async fn dispatch(&self, message: &Message) -> usize {
        let line = message.envelope();
        let delivered = self.deliver(&line, Some(message.origin)).await;

        self.handler.on_inbound_event(&line);
        self.log.record(
            &message.origin_addr.to_string(),
            EventKind::Broadcast,
            &format!("{} -> {delivered} recipients", message.text),
        );

        delivered
    }

    /// Deliver an operator-originated message to every session
    pub async fn broadcast_server(&self, text: &str) -> usize {
        let line = message::server_envelope(text);
        let delivered = self.deliver(&line, None).await;

        self.handler.on_inbound_event(&line);
        self.log.record(
            "SERVER",
            EventKind::ServerMessage,
            &format!("{text} -> {delivered} recipients"),
        );

        delivered
    }

    /// Deliver a presence notice, optionally excluding one session
    ///
    /// Presence lines are display lines like any other, so the front-end
    /// handler sees them too.
    pub async fn announce(&self, line: &str, exclude: Option<SessionId>) -> usize {
        let delivered = self.deliver(line, exclude).await;
        self.handler.on_inbound_event(line);
        delivered
    }

    /// Write a line to every snapshotted session except `exclude`
    ///
    /// A recipient whose write fails is treated as dead: unregistered and
    /// closed on the spot, while delivery continues to the remaining
    /// recipients.
    async fn deliver(&self, line: &str, exclude: Option<SessionId>) -> usize {
        let mut delivered = 0;

        for peer in self.registry.snapshot().await {
            if Some(peer.id()) == exclude {
                continue;
            }

            match peer.send(line).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        session_id = peer.id(),
                        peer = %peer.peer_addr(),
                        error = %e,
                        "Dropping dead recipient"
                    );
                    self.log.record(
                        &peer.peer_addr().to_string(),
                        EventKind::Error,
                        &e.to_string(),
                    );
                    self.registry.unregister(peer.id()).await;
                    peer.close().await;
                }
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NullHandler;
    use crate::log::TracingLog;
    use crate::session::SessionHandle;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    struct Peer {
        handle: SessionHandle,
        // Reading end a real client would hold
        client: TcpStream,
    }

    async fn peer(id: SessionId) -> Peer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server_side, peer_addr) = listener.accept().await.unwrap();
        let (_read, write) = server_side.into_split();
        Peer {
            handle: SessionHandle::new(id, peer_addr, write),
            client,
        }
    }

    async fn read_text(stream: &mut TcpStream) -> String {
        let mut buf = [0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    fn dispatcher(registry: Arc<ClientRegistry>) -> BroadcastDispatcher<NullHandler> {
        BroadcastDispatcher::new(registry, Arc::new(TracingLog), Arc::new(NullHandler))
    }

    #[tokio::test]
    async fn test_origin_is_excluded() {
        let registry = Arc::new(ClientRegistry::new());
        let a = peer(1).await;
        let mut b = peer(2).await;
        let origin_addr = a.handle.peer_addr();
        registry.register(a.handle.clone()).await.unwrap();
        registry.register(b.handle.clone()).await.unwrap();

        let dispatcher = dispatcher(Arc::clone(&registry));
        let msg = Message::new(1, origin_addr, "hi");
        let delivered = dispatcher.dispatch(&msg).await;

        assert_eq!(delivered, 1);
        let text = read_text(&mut b.client).await;
        assert!(text.ends_with(&format!("{origin_addr}: hi")));
    }

    #[tokio::test]
    async fn test_server_broadcast_reaches_everyone() {
        let registry = Arc::new(ClientRegistry::new());
        let mut a = peer(1).await;
        let mut b = peer(2).await;
        registry.register(a.handle.clone()).await.unwrap();
        registry.register(b.handle.clone()).await.unwrap();

        let dispatcher = dispatcher(Arc::clone(&registry));
        let delivered = dispatcher.broadcast_server("maintenance at 5pm").await;

        assert_eq!(delivered, 2);
        assert!(read_text(&mut a.client)
            .await
            .ends_with("SERVER: maintenance at 5pm"));
        assert!(read_text(&mut b.client)
            .await
            .ends_with("SERVER: maintenance at 5pm"));
    }

    #[derive(Default)]
    struct RecordingHandler {
        lines: std::sync::Mutex<Vec<String>>,
    }

    impl RelayHandler for RecordingHandler {
        fn on_inbound_event(&self, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }
    }

    #[tokio::test]
    async fn test_presence_lines_reach_handler() {
        let registry = Arc::new(ClientRegistry::new());
        let mut a = peer(1).await;
        registry.register(a.handle.clone()).await.unwrap();

        let handler = Arc::new(RecordingHandler::default());
        let dispatcher = BroadcastDispatcher::new(
            Arc::clone(&registry),
            Arc::new(TracingLog),
            Arc::clone(&handler),
        );

        let delivered = dispatcher.announce("10.0.0.9:4000 joined the chat", None).await;
        assert_eq!(delivered, 1);
        assert!(read_text(&mut a.client).await.ends_with("joined the chat"));

        let lines = handler.lines.lock().unwrap();
        assert_eq!(lines.as_slice(), ["10.0.0.9:4000 joined the chat"]);
    }

    #[tokio::test]
    async fn test_dead_recipient_is_isolated() {
        let registry = Arc::new(ClientRegistry::new());
        let a = peer(1).await;
        let dead = peer(2).await;
        let mut c = peer(3).await;
        let origin_addr = a.handle.peer_addr();
        registry.register(a.handle.clone()).await.unwrap();
        registry.register(dead.handle.clone()).await.unwrap();
        registry.register(c.handle.clone()).await.unwrap();

        // Kill the dead peer's socket so the first write errors out
        dead.handle.close().await;
        drop(dead.client);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let dispatcher = dispatcher(Arc::clone(&registry));
        let msg = Message::new(1, origin_addr, "still here");
        dispatcher.dispatch(&msg).await;

        // The live recipient got the message regardless
        let text = read_text(&mut c.client).await;
        assert!(text.ends_with("still here"));
    }
}
