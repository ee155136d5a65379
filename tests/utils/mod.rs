use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use doudizhu::{
    sort_hand, Audience, Card, ChannelRoom, GameError, GameEvent, GamePhase, GameSession,
    InMemoryLeaderboard, RestoredSeat, SeatAssignment, SessionConfig, SessionRestore,
    SessionSnapshot, SEAT_COUNT,
};

pub const PLAYER_IDS: [&str; SEAT_COUNT] = ["p0", "p1", "p2"];
pub const PLAYER_NAMES: [&str; SEAT_COUNT] = ["alice", "bob", "carol"];

/// Parses whitespace-separated card codes like `"S3 H4 B R"` into a sorted
/// hand.
pub fn cards(codes: &str) -> Vec<Card> {
    let mut cards: Vec<Card> = codes
        .split_whitespace()
        .map(|code| Card::from_string(code).unwrap())
        .collect();
    sort_hand(&mut cards);
    cards
}

/// A session wired to an in-process room channel and leaderboard.
pub struct TestSetup {
    pub session: Arc<GameSession>,
    #[allow(dead_code)]
    pub room: Arc<ChannelRoom>,
    pub leaderboard: Arc<InMemoryLeaderboard>,
    pub receiver: broadcast::Receiver<(Audience, GameEvent)>,
}

impl TestSetup {
    pub fn player_id(seat: usize) -> &'static str {
        PLAYER_IDS[seat]
    }

    pub async fn snapshot(&self, seat: usize) -> SessionSnapshot {
        self.session
            .snapshot(Self::player_id(seat))
            .await
            .expect("known seat")
    }

    pub async fn current_seat(&self) -> usize {
        self.snapshot(0).await.current_seat
    }

    pub async fn bid(&self, seat: usize, take: bool) -> Result<(), GameError> {
        self.session.handle_bid(Self::player_id(seat), take).await
    }

    pub async fn play(&self, seat: usize, codes: &str) -> Result<(), GameError> {
        self.session
            .handle_play_cards(Self::player_id(seat), &cards(codes))
            .await
    }

    pub async fn play_spec(&self, seat: usize, spec: &str) -> Result<(), GameError> {
        self.session
            .handle_play_spec(Self::player_id(seat), spec)
            .await
    }

    pub async fn pass(&self, seat: usize) -> Result<(), GameError> {
        self.session.handle_pass(Self::player_id(seat)).await
    }

    /// Pulls every event delivered so far off the room channel.
    pub fn drain_events(&mut self) -> Vec<(Audience, GameEvent)> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(item) => events.push(item),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }

    /// Blocks until an event of the given type arrives.
    pub async fn wait_for(&mut self, event_type: &str) -> GameEvent {
        loop {
            match self.receiver.recv().await {
                Ok((_, event)) if event.event_type() == event_type => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    panic!("room channel closed before {event_type}")
                }
            }
        }
    }
}

fn seats() -> [SeatAssignment; SEAT_COUNT] {
    let mut index = 0;
    PLAYER_IDS.map(|id| {
        let assignment = SeatAssignment {
            id: id.to_string(),
            name: PLAYER_NAMES[index].to_string(),
        };
        index += 1;
        assignment
    })
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn test_config(seed: u64) -> SessionConfig {
    SessionConfig {
        bid_timeout: Duration::from_secs(15),
        play_timeout: Duration::from_secs(30),
        rng_seed: Some(seed),
    }
}

/// Builds a fresh session in Init with a fixed seed.
pub struct TestSetupBuilder {
    seed: u64,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self { seed: 42 }
    }

    #[allow(dead_code)]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> TestSetup {
        init_tracing();
        let room = Arc::new(ChannelRoom::new(1024));
        let receiver = room.subscribe();
        let leaderboard = Arc::new(InMemoryLeaderboard::new());
        let session = GameSession::new(
            "test-room",
            seats(),
            Arc::clone(&room) as Arc<dyn doudizhu::RoomBroadcaster>,
            Arc::clone(&leaderboard) as Arc<dyn doudizhu::Leaderboard>,
            test_config(self.seed),
        );
        TestSetup {
            session,
            room,
            leaderboard,
            receiver,
        }
    }

    /// Builds and deals, leaving the session in Bidding.
    pub async fn start(self) -> TestSetup {
        let setup = self.build();
        setup.session.start().await.expect("fresh session starts");
        setup
    }
}

/// Builds a mid-game session in Playing with exact hands, bypassing the deal.
pub struct GameBuilder {
    hands: [Vec<Card>; SEAT_COUNT],
    landlord: usize,
    current: usize,
    last_played: Vec<Card>,
    last_player: Option<usize>,
    consecutive_passes: u8,
}

impl GameBuilder {
    pub fn new() -> Self {
        Self {
            hands: [Vec::new(), Vec::new(), Vec::new()],
            landlord: 0,
            current: 0,
            last_played: Vec::new(),
            last_player: None,
            consecutive_passes: 0,
        }
    }

    pub fn with_hand(mut self, seat: usize, codes: &str) -> Self {
        self.hands[seat] = cards(codes);
        self
    }

    pub fn with_landlord(mut self, seat: usize) -> Self {
        self.landlord = seat;
        self
    }

    pub fn with_current(mut self, seat: usize) -> Self {
        self.current = seat;
        self
    }

    pub fn with_table(mut self, codes: &str, played_by: usize) -> Self {
        self.last_played = cards(codes);
        self.last_player = Some(played_by);
        self
    }

    pub fn with_consecutive_passes(mut self, passes: u8) -> Self {
        self.consecutive_passes = passes;
        self
    }

    /// Restores a session from a stored snapshot instead of the builder's
    /// own fields.
    pub fn build_from(self, restore: SessionRestore) -> TestSetup {
        init_tracing();
        let room = Arc::new(ChannelRoom::new(1024));
        let receiver = room.subscribe();
        let leaderboard = Arc::new(InMemoryLeaderboard::new());
        let session = GameSession::restore(
            "test-room",
            restore,
            Arc::clone(&room) as Arc<dyn doudizhu::RoomBroadcaster>,
            Arc::clone(&leaderboard) as Arc<dyn doudizhu::Leaderboard>,
            test_config(42),
        )
        .expect("valid stored state");
        TestSetup {
            session,
            room,
            leaderboard,
            receiver,
        }
    }

    pub fn build(self) -> TestSetup {
        init_tracing();
        let room = Arc::new(ChannelRoom::new(1024));
        let receiver = room.subscribe();
        let leaderboard = Arc::new(InMemoryLeaderboard::new());

        let mut index = 0;
        let seats = PLAYER_IDS.map(|id| {
            let seat = RestoredSeat {
                id: id.to_string(),
                name: PLAYER_NAMES[index].to_string(),
                hand: self.hands[index].clone(),
                is_landlord: index == self.landlord,
            };
            index += 1;
            seat
        });

        let restore = SessionRestore {
            seats,
            bottom_cards: Vec::new(),
            phase: GamePhase::Playing,
            current_seat: self.current,
            last_played_cards: self.last_played,
            last_player: self.last_player,
            consecutive_passes: self.consecutive_passes,
            bid_passes: 0,
        };
        let session = GameSession::restore(
            "test-room",
            restore,
            Arc::clone(&room) as Arc<dyn doudizhu::RoomBroadcaster>,
            Arc::clone(&leaderboard) as Arc<dyn doudizhu::Leaderboard>,
            test_config(42),
        )
        .expect("valid restore state");

        TestSetup {
            session,
            room,
            leaderboard,
            receiver,
        }
    }
}
