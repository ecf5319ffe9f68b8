//! Room sessions for Ludo: creating rooms, admitting players under
//! concurrency, and telling everyone about it.
//!
//! # Key types
//!
//! - [`RoomCoordinator`]: create/join orchestration and lifecycle moves
//! - [`RoomStore`]: durable room documents with compare-and-swap writes
//! - [`MemoryRoomStore`]: the bundled in-process store
//! - [`Broadcaster`]: best-effort notifications over a presence bridge
//! - [`allocate_color`]: picks the next free player slot
//! - [`Room`], [`Player`], [`Piece`], [`GameState`], [`GameStatus`]:
//!   the persisted room document
//!
//! # Flow of a join
//!
//! ```text
//! join_room ─→ store.get_room ─→ allocate_color ─→ store.add_player (CAS)
//!                   ↑                                   │ conflict
//!                   └───────────── re-read ─────────────┘
//!                                                       │ ok
//!                                    presence.attach ←──┘
//!                                          │
//!                                 broadcaster.notify_room(playerJoined)
//! ```

mod allocator;
mod broadcast;
mod config;
mod coordinator;
mod error;
mod model;
mod store;

pub use allocator::{allocate_color, first_free_color};
pub use broadcast::Broadcaster;
pub use config::CoordinatorConfig;
pub use coordinator::{RoomCoordinator, RoomJoin};
pub use error::{RoomError, StoreError};
pub use model::{
    ChatEntry, GameState, GameStatus, MAX_PLAYERS, PIECES_PER_PLAYER, Piece,
    Player, Room,
};
pub use store::{MemoryRoomStore, RoomStore, StoredRoom};
