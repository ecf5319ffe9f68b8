//! Wire protocol for Ludo rooms.
//!
//! This crate defines the vocabulary shared by every other layer:
//!
//! - **Identity** ([`SessionId`], [`RoomToken`], [`Color`]): who is
//!   talking and which room/slot they mean.
//! - **Events** ([`RoomEvent`]): the real-time notifications pushed to
//!   room members.
//! - **Envelopes** ([`Envelope`], [`Payload`], [`ClientRequest`],
//!   [`ServerMessage`]): what travels over the socket.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, types out.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room coordinator (tokens, colors)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientRequest, Color, Envelope, Payload, RoomEvent, RoomToken,
    ServerMessage, SessionId,
};
