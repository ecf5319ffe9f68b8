//! Presence for Ludo rooms: which sessions are live, and which room
//! channels they listen on.
//!
//! 1. **Bridge**: the [`PresenceBridge`] trait the room coordinator
//!    talks to: attach a session to a room channel, deliver events.
//! 2. **Registry**: [`SessionRegistry`], the in-process implementation
//!    backed by one event channel per connected socket.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room coordinator (above)  ← issues attach / notify
//!     ↕
//! Presence (this crate)     ← live sessions + room channels
//!     ↕
//! Server connection tasks   ← connect / disconnect, drain event channels
//! ```
//!
//! Absence is normal here. A session can vanish between a room write and
//! the attach that follows it; the bridge reports that as
//! [`Attachment::Absent`] or a zero delivery count, never as an error.

mod bridge;
mod error;
mod registry;
mod session;

pub use bridge::{Attachment, PresenceBridge};
pub use error::PresenceError;
pub use registry::SessionRegistry;
pub use session::{EventReceiver, EventSender, SessionInfo};
