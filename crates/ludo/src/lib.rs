//! # Ludo
//!
//! Room sessions for four-player Ludo over WebSockets.
//!
//! A client connects, receives its session id in a `Welcome` frame, and
//! then creates or joins rooms. Each request gets a reply on the same
//! socket. Room events (`roomCreated`, `playerJoined`) arrive as separate
//! `Event` frames whenever they happen.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ludo::prelude::*;
//!
//! # async fn run() -> Result<(), LudoError> {
//! let server = LudoServer::builder()
//!     .config(ServerConfig::from_env())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::LudoError;
pub use server::{LudoServer, LudoServerBuilder, SharedCoordinator};

pub mod prelude {
    pub use crate::{LudoError, LudoServer, LudoServerBuilder, ServerConfig, SharedCoordinator};

    pub use ludo_presence::{PresenceBridge, SessionRegistry};
    pub use ludo_protocol::{
        ClientRequest, Codec, Color, Envelope, JsonCodec, Payload, RoomEvent, RoomToken,
        ServerMessage, SessionId,
    };
    pub use ludo_room::{
        GameStatus, MemoryRoomStore, Room, RoomCoordinator, RoomError, RoomJoin, RoomStore,
    };
}
