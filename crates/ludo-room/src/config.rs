//! Coordinator tuning.

/// Default number of compare-and-swap attempts per join.
pub const DEFAULT_MAX_JOIN_ATTEMPTS: u32 = 3;

/// Knobs for [`RoomCoordinator`](crate::RoomCoordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How many conflicting writes a join (or a create, on token
    /// collision) absorbs before giving up with
    /// [`RoomError::Transient`](crate::RoomError::Transient).
    /// `0` is treated as `1`.
    pub max_join_attempts: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_join_attempts: DEFAULT_MAX_JOIN_ATTEMPTS,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_max_join_attempts(mut self, attempts: u32) -> Self {
        self.max_join_attempts = attempts;
        self
    }

    /// Effective attempt budget, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_join_attempts.max(1)
    }
}
