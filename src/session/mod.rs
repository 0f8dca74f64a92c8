//! Client session lifecycle
//!
//! Each accepted connection becomes one session: a read-loop task that
//! exclusively owns the read half and the session state, plus a clonable
//! [`SessionHandle`] held by the registry for broadcast targeting.
//!
//! Lifecycle: `Connecting → Active → Closing → Closed`. Teardown always
//! passes through `Closing`, whether triggered by a clean peer EOF, a
//! transport error, or a server-wide shutdown.

pub mod handle;
pub mod reader;
pub mod state;

pub use handle::SessionHandle;
pub use state::{CloseReason, SessionId, SessionPhase, SessionState};

pub(crate) use reader::SessionReader;
