//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{RelayError, Result};

/// Default bind address: all interfaces, fixed port
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";

/// Default read buffer size, which also bounds one message's payload
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Read buffer size; one read yields at most this many bytes
    pub read_buffer_size: usize,

    /// Bounded wait per read, after which the shutdown flag is re-checked
    pub read_timeout: Duration,

    /// Bounded wait per accept, after which the server phase is re-checked
    pub accept_timeout: Duration,

    /// How long shutdown waits for session tasks to finish
    pub shutdown_grace: Duration,

    /// Enable TCP_NODELAY on accepted sockets
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.parse().unwrap(),
            max_connections: 0, // Unlimited
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            read_timeout: Duration::from_millis(500),
            accept_timeout: Duration::from_millis(500),
            shutdown_grace: Duration::from_secs(5),
            tcp_nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Parse a host and port supplied by an external configuration surface
    ///
    /// The only fatal error class: a bind address that does not parse stops
    /// the server before it starts.
    pub fn from_host_port(host: &str, port: u16) -> Result<Self> {
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|_| RelayError::Config(format!("{host}:{port}")))?;
        Ok(Self::with_addr(addr))
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the read buffer size
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Set the per-read bounded wait
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the per-accept bounded wait
    pub fn accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Set the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
