//! Server: accept loop, configuration, and lifecycle
//!
//! [`RelayServer`] ties the pieces together: it accepts connections while
//! the phase is `Listening`, hands each one to an independent session
//! task, and owns the shutdown sequence that drains them all.

pub mod config;
pub mod lifecycle;
pub mod listener;

pub use config::ServerConfig;
pub use lifecycle::{Lifecycle, ServerPhase};
pub use listener::RelayServer;
