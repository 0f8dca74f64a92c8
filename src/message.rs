//! Message value and broadcast envelope formatting
//!
//! A `Message` is transient: it exists for the duration of one dispatch and
//! is never stored. The envelope formats are plain text with no structured
//! encoding — recipients display them verbatim.

use std::net::SocketAddr;

use chrono::{DateTime, Local};

use crate::session::SessionId;

/// One inbound text chunk, tagged with its origin
///
/// The payload is bounded by the server's read buffer size. A payload larger
/// than one buffer arrives as multiple independent messages: the wire
/// protocol has no framing, so one read never equals one logical message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Identifier of the session that produced this message
    pub origin: SessionId,

    /// Remote address of the origin, used in the envelope
    pub origin_addr: SocketAddr,

    /// Decoded UTF-8 payload
    pub text: String,

    /// When the chunk was read off the wire
    pub received_at: DateTime<Local>,
}

impl Message {
    /// Create a message stamped with the current local time
    pub fn new(origin: SessionId, origin_addr: SocketAddr, text: impl Into<String>) -> Self {
        Self {
            origin,
            origin_addr,
            text: text.into(),
            received_at: Local::now(),
        }
    }

    /// Format the peer-originated broadcast envelope
    ///
    /// `[HH:MM:SS] <origin-address>: <payload>`
    pub fn envelope(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.received_at.format("%H:%M:%S"),
            self.origin_addr,
            self.text
        )
    }
}

/// Format the operator-originated broadcast envelope
///
/// `[HH:MM:SS] SERVER: <payload>`
pub fn server_envelope(text: &str) -> String {
    format!("[{}] SERVER: {}", Local::now().format("%H:%M:%S"), text)
}

/// Presence notification for a newly registered session
pub fn joined_notice(addr: SocketAddr) -> String {
    format!("{addr} joined the chat")
}

/// Presence notification for a departed session
pub fn left_notice(addr: SocketAddr) -> String {
    format!("{addr} left the chat")
}
