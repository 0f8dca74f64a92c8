//! Relay server
//!
//! Owns the accept loop, spawns one read-loop task per connection, and
//! coordinates the whole-server shutdown sequence.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::dispatch::BroadcastDispatcher;
use crate::error::Result;
use crate::handler::RelayHandler;
use crate::log::{ActivityLog, EventKind, TracingLog};
use crate::message;
use crate::registry::ClientRegistry;
use crate::server::config::ServerConfig;
use crate::server::lifecycle::{Lifecycle, ServerPhase};
use crate::session::{SessionHandle, SessionReader, SessionState};

/// Broadcast relay server
pub struct RelayServer<H: RelayHandler> {
    config: ServerConfig,
    handler: Arc<H>,
    log: Arc<dyn ActivityLog>,
    registry: Arc<ClientRegistry>,
    dispatcher: Arc<BroadcastDispatcher<H>>,
    lifecycle: Arc<Lifecycle>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<H: RelayHandler> RelayServer<H> {
    /// Create a new server with the given configuration and handler
    ///
    /// Activity is recorded through [`TracingLog`]; use
    /// [`with_activity_log`](Self::with_activity_log) to supply a sink.
    pub fn new(config: ServerConfig, handler: H) -> Self {
        Self::with_activity_log(config, handler, Arc::new(TracingLog))
    }

    /// Create a new server with a custom activity log sink
    pub fn with_activity_log(
        config: ServerConfig,
        handler: H,
        log: Arc<dyn ActivityLog>,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let handler = Arc::new(handler);
        let registry = Arc::new(ClientRegistry::new());
        let dispatcher = Arc::new(BroadcastDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&log),
            Arc::clone(&handler),
        ));

        Self {
            config,
            handler,
            log,
            registry,
            dispatcher,
            lifecycle: Arc::new(Lifecycle::new()),
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Get a reference to the session registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Current server phase
    pub fn phase(&self) -> ServerPhase {
        self.lifecycle.phase()
    }

    /// Current number of connected sessions (operator feedback only)
    pub async fn session_count(&self) -> usize {
        self.registry.count().await
    }

    /// Fan an operator-originated message out to every connected session
    ///
    /// Returns the number of sessions it was delivered to.
    pub async fn submit_broadcast(&self, text: &str) -> usize {
        self.dispatcher.broadcast_server(text).await
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// Binds the configured address and accepts until
    /// [`shutdown`](Self::shutdown) is invoked from another task.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.run_with_listener(listener).await
    }

    /// Run the server on a pre-bound listener
    ///
    /// Lets embedders bind port 0 and learn the actual address before
    /// starting the accept loop.
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        self.lifecycle.begin_listening();
        tracing::info!(addr = %addr, "Relay server listening");

        self.accept_loop(&listener).await;
        Ok(())
    }

    /// Run the server with graceful shutdown
    ///
    /// Accepts until the given future resolves (a termination signal, a
    /// front-end request), then performs the full shutdown sequence.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let addr = listener.local_addr()?;
        self.lifecycle.begin_listening();
        tracing::info!(addr = %addr, "Relay server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = self.accept_loop(&listener) => {}
        }

        self.shutdown().await;
        Ok(())
    }

    /// Accept connections while the server is in the `Listening` phase
    ///
    /// Each accept is under a bounded wait so a shutdown request is
    /// observed within one interval rather than blocking indefinitely.
    async fn accept_loop(&self, listener: &TcpListener) {
        while self.lifecycle.is_listening() {
            match timeout(self.config.accept_timeout, listener.accept()).await {
                // Bounded wait elapsed; go re-check the phase
                Err(_) => continue,
                Ok(Ok((socket, peer_addr))) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                    self.log
                        .record("SERVER", EventKind::Error, &e.to_string());
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(session_id, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let (read_half, write_half) = socket.into_split();
        let handle = SessionHandle::new(session_id, peer_addr, write_half);
        let mut state = SessionState::new(session_id, peer_addr);

        // Registered exactly once, after the session is fully constructed.
        // A collision means the id counter is broken; drop the connection
        // and keep serving.
        if let Err(e) = self.registry.register(handle.clone()).await {
            tracing::error!(session_id, peer = %peer_addr, error = %e, "Registration failed");
            self.log
                .record(&peer_addr.to_string(), EventKind::Error, &e.to_string());
            return;
        }
        state.mark_active();

        tracing::info!(session_id, peer = %peer_addr, "New connection");
        self.log
            .record(&peer_addr.to_string(), EventKind::Connected, "connected");

        self.dispatcher
            .announce(&message::joined_notice(peer_addr), Some(session_id))
            .await;

        let reader = SessionReader::new(
            state,
            read_half,
            handle,
            Arc::clone(&self.registry),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.lifecycle),
            Arc::clone(&self.log),
            self.config.read_timeout,
            self.config.read_buffer_size,
        );

        let task = tokio::spawn(async move {
            // Holds the connection permit for the session's lifetime
            let _permit = permit;
            reader.run().await;
        });

        // Reap handles of sessions that already finished so connection
        // churn doesn't accumulate them for the server's whole lifetime
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }

    /// Shut the server down
    ///
    /// Idempotent: exactly one caller performs the sequence, every other
    /// call returns immediately. The winner stops the acceptor via the
    /// phase flag, drains and closes every registered session, waits up to
    /// the grace period for session tasks to finish, and marks the server
    /// `Stopped`. Tasks that outlive the grace period are abandoned, not
    /// aborted; completion is reported regardless.
    pub async fn shutdown(&self) {
        if !self.lifecycle.begin_shutdown() {
            return;
        }

        tracing::info!("Relay server shutting down");

        let sessions = self.registry.drain().await;
        let session_count = sessions.len();
        for handle in &sessions {
            handle.close().await;
        }

        let drained: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().await;
            tasks.drain(..).collect()
        };

        let wait_all = async {
            for task in drained {
                let _ = task.await;
            }
        };
        if timeout(self.config.shutdown_grace, wait_all).await.is_err() {
            tracing::warn!("Grace period elapsed; abandoning remaining session tasks");
        }

        self.lifecycle.mark_stopped();
        tracing::info!(sessions_closed = session_count, "Relay server stopped");
        self.log
            .record("SERVER", EventKind::ServerMessage, "shutdown complete");
    }

    /// Get the front-end handler
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NullHandler;
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio::time::sleep;

    async fn start() -> (Arc<RelayServer<NullHandler>>, SocketAddr) {
        let config = ServerConfig::default()
            .read_timeout(Duration::from_millis(50))
            .accept_timeout(Duration::from_millis(50));
        let server = Arc::new(RelayServer::new(config, NullHandler));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let runner = Arc::clone(&server);
        tokio::spawn(async move {
            runner.run_with_listener(listener).await.unwrap();
        });

        (server, addr)
    }

    #[tokio::test]
    async fn test_finished_session_tasks_are_reaped() {
        let (server, addr) = start().await;

        // Churn: clients that connect and immediately disconnect
        for _ in 0..5 {
            let client = TcpStream::connect(addr).await.unwrap();
            sleep(Duration::from_millis(100)).await;
            drop(client);
        }
        sleep(Duration::from_millis(200)).await;

        // A new connection reaps the dead handles on its way in
        let _live = TcpStream::connect(addr).await.unwrap();
        sleep(Duration::from_millis(200)).await;

        assert_eq!(server.session_count().await, 1);
        assert_eq!(server.tasks.lock().await.len(), 1);
    }
}
