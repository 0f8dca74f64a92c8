//! Concurrent TCP broadcast relay
//!
//! Clients connect over TCP and send raw text chunks; every chunk is fanned
//! out to every other connected client as
//! `[HH:MM:SS] <origin-address>: <payload>`. The crate covers the
//! connection-lifecycle and broadcast-dispatch engine; interactive
//! front-ends, history persistence, and signal wiring plug in through
//! [`RelayHandler`], [`ActivityLog`], and
//! [`RelayServer::submit_broadcast`].
//!
//! The wire protocol is a raw byte stream with no framing: one read yields
//! at most one buffer's worth, so a large payload arrives as multiple
//! independent messages. This is a deliberate fidelity choice, not an
//! oversight.
//!
//! # Example
//! ```no_run
//! use relay_rs::{NullHandler, RelayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> relay_rs::Result<()> {
//!     let server = RelayServer::new(ServerConfig::default(), NullHandler);
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

pub mod dispatch;
pub mod error;
pub mod handler;
pub mod log;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;

pub use dispatch::BroadcastDispatcher;
pub use error::{RelayError, Result};
pub use handler::{NullHandler, RelayHandler};
pub use log::{ActivityLog, EventKind, TracingLog};
pub use message::Message;
pub use registry::ClientRegistry;
pub use server::{RelayServer, ServerConfig, ServerPhase};
pub use session::{CloseReason, SessionHandle, SessionId, SessionPhase};
