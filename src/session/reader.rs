//! Per-session read loop
//!
//! Runs as an independent task from registration to teardown. Every read
//! is under a bounded wait so the loop observes a server shutdown within
//! one timeout interval even on an idle connection.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::time::timeout;

use crate::dispatch::BroadcastDispatcher;
use crate::handler::RelayHandler;
use crate::log::{ActivityLog, EventKind};
use crate::message::{self, Message};
use crate::registry::ClientRegistry;
use crate::server::Lifecycle;

use super::{CloseReason, SessionHandle, SessionState};

/// Read side of one client session
pub(crate) struct SessionReader<H: RelayHandler> {
    state: SessionState,
    read_half: OwnedReadHalf,
    handle: SessionHandle,
    registry: Arc<ClientRegistry>,
    dispatcher: Arc<BroadcastDispatcher<H>>,
    lifecycle: Arc<Lifecycle>,
    log: Arc<dyn ActivityLog>,
    read_timeout: Duration,
    buf: BytesMut,
}

impl<H: RelayHandler> SessionReader<H> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        state: SessionState,
        read_half: OwnedReadHalf,
        handle: SessionHandle,
        registry: Arc<ClientRegistry>,
        dispatcher: Arc<BroadcastDispatcher<H>>,
        lifecycle: Arc<Lifecycle>,
        log: Arc<dyn ActivityLog>,
        read_timeout: Duration,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            state,
            read_half,
            handle,
            registry,
            dispatcher,
            lifecycle,
            log,
            read_timeout,
            buf: BytesMut::with_capacity(read_buffer_size),
        }
    }

    /// Run the read loop until the session closes, then tear it down
    pub(crate) async fn run(mut self) {
        let reason = self.read_loop().await;
        self.state.begin_close(reason);
        self.teardown().await;
    }

    async fn read_loop(&mut self) -> CloseReason {
        loop {
            if self.lifecycle.is_shutting_down() {
                return CloseReason::Shutdown;
            }

            // One read yields at most one buffer's worth. There is no
            // framing on the wire: a larger payload arrives as multiple
            // independent chunks.
            self.buf.clear();
            match timeout(self.read_timeout, self.read_half.read_buf(&mut self.buf)).await {
                // Bounded wait elapsed with no data; go re-check the flag
                Err(_) => continue,
                Ok(Ok(0)) => return CloseReason::PeerClosed,
                Ok(Ok(_)) => {
                    self.state.touch();
                    self.handle_chunk().await;
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        session_id = self.state.id,
                        peer = %self.state.peer_addr,
                        error = %e,
                        "Read failed"
                    );
                    self.log.record(
                        &self.state.peer_addr.to_string(),
                        EventKind::Error,
                        &e.to_string(),
                    );
                    return CloseReason::TransportError;
                }
            }
        }
    }

    async fn handle_chunk(&self) {
        let text = match std::str::from_utf8(&self.buf) {
            Ok(text) => text,
            Err(e) => {
                // Malformed chunk: drop it, keep the session alive
                tracing::warn!(
                    session_id = self.state.id,
                    peer = %self.state.peer_addr,
                    error = %e,
                    "Dropping undecodable chunk"
                );
                self.log.record(
                    &self.state.peer_addr.to_string(),
                    EventKind::Error,
                    &e.to_string(),
                );
                return;
            }
        };

        self.log
            .record(&self.state.peer_addr.to_string(), EventKind::Received, text);

        let message = Message::new(self.state.id, self.state.peer_addr, text);
        self.dispatcher.dispatch(&message).await;
    }

    /// Unregister, release the transport, and announce the departure
    ///
    /// Unregistration comes first so no further broadcast targets this
    /// session. During a server-wide shutdown the departure notice is
    /// suppressed: every session is leaving at once and the remaining
    /// recipients are going away too.
    async fn teardown(&mut self) {
        self.registry.unregister(self.state.id).await;
        self.handle.close().await;
        self.state.mark_closed();

        let reason = self.state.close_reason.unwrap_or(CloseReason::Shutdown);
        tracing::info!(
            session_id = self.state.id,
            peer = %self.state.peer_addr,
            reason = ?reason,
            "Session closed"
        );
        self.log.record(
            &self.state.peer_addr.to_string(),
            EventKind::Disconnected,
            &format!("{reason:?}"),
        );

        if reason != CloseReason::Shutdown && !self.lifecycle.is_shutting_down() {
            let notice = message::left_notice(self.state.peer_addr);
            self.dispatcher.announce(&notice, None).await;
        }
    }
}
