use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::game::cards::{Card, HandType};

/// Events that can occur during a Dou Dizhu game.
///
/// Events represent facts about things that have already happened. The
/// session composes them while it mutates state and hands them to the room
/// for delivery only after its lock is released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEvent {
    /// Cards have been dealt and bidding begins
    GameStarted { room_id: String },

    /// Private delivery of one seat's dealt hand
    HandDealt {
        room_id: String,
        seat: usize,
        cards: Vec<Card>,
    },

    /// A seat is being asked whether it wants the landlord role
    BidAsked { room_id: String, seat: usize },

    /// A seat answered the bid prompt
    BidPlaced {
        room_id: String,
        seat: usize,
        take: bool,
    },

    /// Bidding resolved; the landlord picks up the bottom cards
    LandlordAssigned {
        room_id: String,
        seat: usize,
        bottom_cards: Vec<Card>,
        by_default: bool,
    },

    /// The turn has moved to another seat
    TurnChanged { room_id: String, seat: usize },

    /// A seat played a classified hand
    CardsPlayed {
        room_id: String,
        seat: usize,
        cards: Vec<Card>,
        hand_type: HandType,
        cards_remaining: usize,
    },

    /// A seat passed its turn
    Passed { room_id: String, seat: usize },

    /// Both opponents passed; this seat plays freely
    TableCleared { room_id: String, seat: usize },

    /// A seat's turn timer expired and the session acted for it
    PlayerTimeout { room_id: String, seat: usize },

    /// The game has been completed
    GameOver {
        room_id: String,
        winner_seat: usize,
        landlord_seat: usize,
        landlord_won: bool,
    },
}

impl GameEvent {
    /// Get the room_id associated with this event
    pub fn room_id(&self) -> &str {
        match self {
            GameEvent::GameStarted { room_id, .. } => room_id,
            GameEvent::HandDealt { room_id, .. } => room_id,
            GameEvent::BidAsked { room_id, .. } => room_id,
            GameEvent::BidPlaced { room_id, .. } => room_id,
            GameEvent::LandlordAssigned { room_id, .. } => room_id,
            GameEvent::TurnChanged { room_id, .. } => room_id,
            GameEvent::CardsPlayed { room_id, .. } => room_id,
            GameEvent::Passed { room_id, .. } => room_id,
            GameEvent::TableCleared { room_id, .. } => room_id,
            GameEvent::PlayerTimeout { room_id, .. } => room_id,
            GameEvent::GameOver { room_id, .. } => room_id,
        }
    }

    /// Get a human-readable description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            GameEvent::GameStarted { .. } => "game_started",
            GameEvent::HandDealt { .. } => "hand_dealt",
            GameEvent::BidAsked { .. } => "bid_asked",
            GameEvent::BidPlaced { .. } => "bid_placed",
            GameEvent::LandlordAssigned { .. } => "landlord_assigned",
            GameEvent::TurnChanged { .. } => "turn_changed",
            GameEvent::CardsPlayed { .. } => "cards_played",
            GameEvent::Passed { .. } => "passed",
            GameEvent::TableCleared { .. } => "table_cleared",
            GameEvent::PlayerTimeout { .. } => "player_timeout",
            GameEvent::GameOver { .. } => "game_over",
        }
    }
}

/// Transport-facing side of a room: how the session reaches its three seats.
///
/// Implementations must not block on slow clients; the session calls these
/// outside its state lock but still on the game's hot path.
#[async_trait]
pub trait RoomBroadcaster: Send + Sync {
    /// Deliver an event to every seat in the room.
    async fn broadcast(&self, event: GameEvent);

    /// Deliver an event to a single seat (private hand delivery).
    async fn send_to_seat(&self, seat: usize, event: GameEvent);
}

/// Which seats an outbound event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    All,
    Seat(usize),
}

/// A [`RoomBroadcaster`] backed by a tokio broadcast channel; subscribers
/// receive `(audience, event)` pairs and filter per connection. Suitable for
/// in-process hosts and tests.
#[derive(Debug, Clone)]
pub struct ChannelRoom {
    sender: broadcast::Sender<(Audience, GameEvent)>,
}

impl ChannelRoom {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<(Audience, GameEvent)> {
        self.sender.subscribe()
    }

    fn send(&self, audience: Audience, event: GameEvent) {
        match self.sender.send((audience, event)) {
            Ok(receiver_count) => {
                debug!(receivers = receiver_count, "Room event emitted");
            }
            Err(_) => {
                debug!("Room event emitted with no receivers");
            }
        }
    }
}

#[async_trait]
impl RoomBroadcaster for ChannelRoom {
    async fn broadcast(&self, event: GameEvent) {
        self.send(Audience::All, event);
    }

    async fn send_to_seat(&self, seat: usize, event: GameEvent) {
        self.send(Audience::Seat(seat), event);
    }
}
