//! Player slot allocation.
//!
//! Pure functions over a snapshot of the room. Two callers looking at the
//! same snapshot always get the same answer; whether that answer is still
//! free by the time it is written is the store's problem (see
//! [`RoomStore::add_player`](crate::RoomStore::add_player)).

use ludo_protocol::Color;

use crate::{Room, RoomError};

/// First color of [`Color::ALL`] not present in `in_use`, or `None` when
/// all four are taken.
pub fn first_free_color(in_use: &[Color]) -> Option<Color> {
    Color::ALL.into_iter().find(|c| !in_use.contains(c))
}

/// The color the next player admitted to `room` receives.
///
/// # Errors
/// Returns [`RoomError::RoomFull`] if every color is taken.
pub fn allocate_color(room: &Room) -> Result<Color, RoomError> {
    first_free_color(&room.colors_in_use())
        .ok_or_else(|| RoomError::RoomFull(room.token.clone()))
}
