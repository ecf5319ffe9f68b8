//! Integration tests for the room coordinator.
//!
//! These drive `RoomCoordinator` against the in-memory store and a real
//! `SessionRegistry`, reading events off the same channels a connection
//! writer would drain.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use ludo_presence::{EventReceiver, SessionRegistry};
use ludo_protocol::{Color, RoomEvent, RoomToken, SessionId};
use ludo_room::{
    CoordinatorConfig, GameStatus, MemoryRoomStore, Player, Room, RoomCoordinator,
    RoomError, RoomStore, StoreError, StoredRoom,
};
use tokio::sync::mpsc;

type Coordinator<S = MemoryRoomStore> = RoomCoordinator<S, Arc<SessionRegistry>>;

fn coordinator() -> (Coordinator, Arc<SessionRegistry>) {
    let registry = Arc::new(SessionRegistry::new());
    (
        RoomCoordinator::new(MemoryRoomStore::new(), Arc::clone(&registry)),
        registry,
    )
}

async fn connect(registry: &SessionRegistry) -> (SessionId, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (registry.connect(tx).await, rx)
}

fn joined(token: &RoomToken, who: &SessionId, color: Color) -> RoomEvent {
    RoomEvent::PlayerJoined {
        token: token.clone(),
        joiner_session_id: who.clone(),
        color,
    }
}

// ---------------------------------------------------------------------------
// Create / join walkthrough
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_then_join_full_walkthrough() {
    let (coordinator, registry) = coordinator();
    let (s0, mut rx0) = connect(&registry).await;
    let (s1, mut rx1) = connect(&registry).await;

    // Owner gets red and a private roomCreated.
    let created = coordinator.create_room(&s0).await.unwrap();
    assert_eq!(created.color, Color::Red);
    assert!(!created.already_joined);
    let token = created.token.clone();
    assert_eq!(
        rx0.try_recv().unwrap(),
        RoomEvent::RoomCreated { token: token.clone(), color: Color::Red }
    );
    assert!(rx1.try_recv().is_err(), "roomCreated is not broadcast");

    // S1 gets blue; everyone attached hears about it, S1 included.
    let join = coordinator.join_room(&token, &s1).await.unwrap();
    assert_eq!(join.color, Color::Blue);
    assert!(!join.already_joined);
    assert_eq!(rx0.try_recv().unwrap(), joined(&token, &s1, Color::Blue));
    assert_eq!(rx1.try_recv().unwrap(), joined(&token, &s1, Color::Blue));

    // Joining again is a no-op.
    let again = coordinator.join_room(&token, &s1).await.unwrap();
    assert_eq!(again.color, Color::Blue);
    assert!(again.already_joined);
    assert!(rx0.try_recv().is_err());
    assert!(rx1.try_recv().is_err());
    assert_eq!(coordinator.get_room(&token).await.unwrap().players.len(), 2);

    // Fill the room, then one more.
    let (s2, _rx2) = connect(&registry).await;
    let (s3, _rx3) = connect(&registry).await;
    let (s4, _rx4) = connect(&registry).await;
    assert_eq!(coordinator.join_room(&token, &s2).await.unwrap().color, Color::Green);
    assert_eq!(coordinator.join_room(&token, &s3).await.unwrap().color, Color::Yellow);

    let err = coordinator.join_room(&token, &s4).await.unwrap_err();
    assert!(matches!(err, RoomError::RoomFull(t) if t == token));

    let room = coordinator.get_room(&token).await.unwrap();
    assert_eq!(
        room.colors_in_use(),
        vec![Color::Red, Color::Blue, Color::Green, Color::Yellow]
    );
    assert_eq!(registry.members(&token).await.len(), 4);
}

#[tokio::test]
async fn test_create_room_persists_waiting_room_with_owner() {
    let (coordinator, registry) = coordinator();
    let (s0, _rx0) = connect(&registry).await;

    let created = coordinator.create_room(&s0).await.unwrap();
    let room = coordinator.get_room(&created.token).await.unwrap();

    assert_eq!(room.owner_session_id, s0);
    assert_eq!(room.status(), GameStatus::Waiting);
    assert_eq!(room.players.len(), 1);
    assert_eq!(room.players[0].pieces[3].piece_id, "red-4");
    assert_eq!(registry.members(&created.token).await, vec![s0]);
}

#[tokio::test]
async fn test_create_room_tokens_are_unique() {
    let (coordinator, _registry) = coordinator();
    let owner = SessionId::new("owner");

    let mut tokens = HashSet::new();
    for _ in 0..200 {
        let created = coordinator.create_room(&owner).await.unwrap();
        assert_eq!(created.token.as_str().len(), 32);
        tokens.insert(created.token);
    }
    assert_eq!(tokens.len(), 200);
    assert_eq!(coordinator.store().room_count().await, 200);
}

#[tokio::test]
async fn test_join_room_owner_rejoin_is_already_joined() {
    let (coordinator, registry) = coordinator();
    let (s0, mut rx0) = connect(&registry).await;
    let token = coordinator.create_room(&s0).await.unwrap().token;
    let _ = rx0.try_recv();

    let join = coordinator.join_room(&token, &s0).await.unwrap();
    assert_eq!(join.color, Color::Red);
    assert!(join.already_joined);
    assert!(rx0.try_recv().is_err());
}

#[tokio::test]
async fn test_join_room_colors_follow_join_order() {
    let (coordinator, _registry) = coordinator();
    let token = coordinator.create_room(&SessionId::new("a")).await.unwrap().token;

    let mut colors = vec![Color::Red];
    for who in ["b", "c", "d"] {
        colors.push(coordinator.join_room(&token, &SessionId::new(who)).await.unwrap().color);
    }
    assert_eq!(colors, Color::ALL.to_vec());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_join_room_unknown_token_is_not_found() {
    let (coordinator, _registry) = coordinator();

    let err = coordinator
        .join_room(&RoomToken::new("nope"), &SessionId::new("s1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::NotFound(t) if t.as_str() == "nope"));
}

#[tokio::test]
async fn test_join_room_ongoing_room_is_not_joinable() {
    let (coordinator, registry) = coordinator();
    let (s0, _rx0) = connect(&registry).await;
    let token = coordinator.create_room(&s0).await.unwrap().token;
    coordinator.transition(&token, GameStatus::Ongoing).await.unwrap();

    let err = coordinator
        .join_room(&token, &SessionId::new("late"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RoomError::NotJoinable { status: GameStatus::Ongoing, .. }
    ));
    assert_eq!(coordinator.get_room(&token).await.unwrap().players.len(), 1);
}

#[tokio::test]
async fn test_join_room_absent_session_still_joins() {
    let (coordinator, registry) = coordinator();
    let (s0, mut rx0) = connect(&registry).await;
    let token = coordinator.create_room(&s0).await.unwrap().token;
    let _ = rx0.try_recv();

    // Never connected: nothing to attach, but the write stands.
    let ghost = SessionId::new("ghost");
    let join = coordinator.join_room(&token, &ghost).await.unwrap();

    assert_eq!(join.color, Color::Blue);
    assert_eq!(rx0.try_recv().unwrap(), joined(&token, &ghost, Color::Blue));
    assert_eq!(registry.members(&token).await, vec![s0]);
}

#[tokio::test]
async fn test_create_room_absent_owner_still_creates() {
    let (coordinator, registry) = coordinator();

    let created = coordinator.create_room(&SessionId::new("offline")).await.unwrap();

    assert_eq!(created.color, Color::Red);
    assert!(coordinator.get_room(&created.token).await.is_ok());
    assert!(registry.members(&created.token).await.is_empty());
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_transition_walks_the_lifecycle() {
    let (coordinator, _registry) = coordinator();
    let token = coordinator.create_room(&SessionId::new("s0")).await.unwrap().token;

    for next in [
        GameStatus::Ongoing,
        GameStatus::Paused,
        GameStatus::Ongoing,
        GameStatus::Finished,
    ] {
        let room = coordinator.transition(&token, next).await.unwrap();
        assert_eq!(room.status(), next);
    }

    let err = coordinator
        .transition(&token, GameStatus::Ongoing)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::InvalidTransition { from: GameStatus::Finished, .. }));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_join_room_concurrent_joiners_get_distinct_colors() {
    for _ in 0..20 {
        let (coordinator, _registry) = coordinator();
        let coordinator = Arc::new(coordinator);
        let token = coordinator.create_room(&SessionId::new("owner")).await.unwrap().token;

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let coordinator = Arc::clone(&coordinator);
                let token = token.clone();
                tokio::spawn(async move {
                    coordinator.join_room(&token, &SessionId::new(format!("p{i}"))).await
                })
            })
            .collect();

        let mut won = Vec::new();
        let mut full = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(join) => won.push(join.color),
                Err(RoomError::RoomFull(_)) => full += 1,
                Err(other) => panic!("unexpected join error: {other}"),
            }
        }

        assert_eq!(won.len(), 3);
        assert_eq!(full, 2);

        let room = coordinator.get_room(&token).await.unwrap();
        let colors: HashSet<Color> = room.colors_in_use().into_iter().collect();
        assert_eq!(colors.len(), 4, "colors must be pairwise distinct");
        assert_eq!(room.players.len(), 4);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_join_room_concurrent_same_session_seats_once() {
    let (coordinator, _registry) = coordinator();
    let coordinator = Arc::new(coordinator);
    let token = coordinator.create_room(&SessionId::new("owner")).await.unwrap().token;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let token = token.clone();
            tokio::spawn(async move {
                coordinator.join_room(&token, &SessionId::new("retrying")).await
            })
        })
        .collect();

    let mut fresh = 0;
    for handle in handles {
        let join = handle.await.unwrap().unwrap();
        assert_eq!(join.color, Color::Blue);
        if !join.already_joined {
            fresh += 1;
        }
    }

    assert_eq!(fresh, 1);
    assert_eq!(coordinator.get_room(&token).await.unwrap().players.len(), 2);
}

// ---------------------------------------------------------------------------
// Retry budget
// ---------------------------------------------------------------------------

/// A store that loses the first few writes to an invisible competitor.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryRoomStore,
    add_conflicts: AtomicU32,
    duplicate_creates: AtomicU32,
    add_calls: AtomicU32,
}

impl FlakyStore {
    fn with_add_conflicts(n: u32) -> Self {
        let store = Self::default();
        store.add_conflicts.store(n, Ordering::SeqCst);
        store
    }

    fn with_duplicate_creates(n: u32) -> Self {
        let store = Self::default();
        store.duplicate_creates.store(n, Ordering::SeqCst);
        store
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl RoomStore for FlakyStore {
    async fn create_room(&self, room: Room) -> Result<RoomToken, StoreError> {
        if Self::take(&self.duplicate_creates) {
            return Err(StoreError::DuplicateToken(room.token));
        }
        self.inner.create_room(room).await
    }

    async fn get_room(&self, token: &RoomToken) -> Result<StoredRoom, StoreError> {
        self.inner.get_room(token).await
    }

    async fn add_player(
        &self,
        token: &RoomToken,
        player: Player,
        expected_player_count: usize,
    ) -> Result<StoredRoom, StoreError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take(&self.add_conflicts) {
            return Err(StoreError::Conflict {
                token: token.clone(),
                reason: "simulated".into(),
            });
        }
        self.inner.add_player(token, player, expected_player_count).await
    }

    async fn set_status(
        &self,
        token: &RoomToken,
        expected: GameStatus,
        next: GameStatus,
    ) -> Result<StoredRoom, StoreError> {
        self.inner.set_status(token, expected, next).await
    }
}

fn flaky(store: FlakyStore) -> Coordinator<FlakyStore> {
    RoomCoordinator::new(store, Arc::new(SessionRegistry::new()))
}

#[tokio::test]
async fn test_join_room_recovers_within_retry_budget() {
    let coordinator = flaky(FlakyStore::with_add_conflicts(2));
    let token = coordinator.create_room(&SessionId::new("owner")).await.unwrap().token;

    let join = coordinator.join_room(&token, &SessionId::new("s1")).await.unwrap();

    assert_eq!(join.color, Color::Blue);
    assert_eq!(coordinator.store().add_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_join_room_exhausted_retries_is_transient() {
    let coordinator = flaky(FlakyStore::with_add_conflicts(3));
    let token = coordinator.create_room(&SessionId::new("owner")).await.unwrap().token;

    let err = coordinator
        .join_room(&token, &SessionId::new("s1"))
        .await
        .unwrap_err();

    assert!(matches!(err, RoomError::Transient(_)));
    assert_eq!(coordinator.store().add_calls.load(Ordering::SeqCst), 3);
    assert_eq!(coordinator.get_room(&token).await.unwrap().players.len(), 1);
}

#[tokio::test]
async fn test_join_room_attempt_budget_is_configurable() {
    let registry = Arc::new(SessionRegistry::new());
    let coordinator = RoomCoordinator::with_config(
        FlakyStore::with_add_conflicts(4),
        registry,
        CoordinatorConfig::default().with_max_join_attempts(5),
    );
    let token = coordinator.create_room(&SessionId::new("owner")).await.unwrap().token;

    let join = coordinator.join_room(&token, &SessionId::new("s1")).await.unwrap();
    assert_eq!(join.color, Color::Blue);
}

#[tokio::test]
async fn test_create_room_retries_token_collision() {
    let coordinator = flaky(FlakyStore::with_duplicate_creates(2));

    let created = coordinator.create_room(&SessionId::new("owner")).await.unwrap();
    assert_eq!(created.color, Color::Red);
    assert_eq!(coordinator.store().inner.room_count().await, 1);
}

#[tokio::test]
async fn test_create_room_persistent_collision_is_transient() {
    let coordinator = flaky(FlakyStore::with_duplicate_creates(3));

    let err = coordinator.create_room(&SessionId::new("owner")).await.unwrap_err();
    assert!(matches!(err, RoomError::Transient(_)));
    assert_eq!(coordinator.store().inner.room_count().await, 0);
}
