//! Session registry
//!
//! The registry is the only piece of state mutated by more than one task
//! at a time. Everything else either lives inside a single session task or
//! is written only by the shutdown path.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ClientRegistry>
//!                   ┌──────────────────────────┐
//!                   │ sessions: RwLock<        │
//!                   │   HashMap<SessionId,     │
//!                   │           SessionHandle> │
//!                   │ >                        │
//!                   └────────────┬─────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!   [Acceptor]             [Read loop]             [Dispatcher]
//!   register()             unregister()            snapshot()
//!                                                       │
//!                                                       └──► send() ──► TCP
//! ```
//!
//! Broadcast iterates over a snapshot — a point-in-time clone of the
//! handle map — so delivery never holds the lock and never races a
//! concurrent register or unregister.

pub mod store;

pub use store::ClientRegistry;
