// Library crate for the Dou Dizhu game core
// This file exposes the public API for integration tests

pub mod game;
pub mod leaderboard;
pub mod manager;
pub mod room;

// Re-export commonly used types for easier access in tests
pub use game::cards::{
    can_beat_with_hand, find_smallest_beating, pick_cards, sort_hand, Card, HandError, HandType,
    ParsedHand, Rank, Suit,
};
pub use game::session::{
    GameError, GamePhase, GameSession, RestoredSeat, SeatAssignment, SessionConfig,
    SessionRestore, SessionSnapshot, SEAT_COUNT,
};
pub use leaderboard::{InMemoryLeaderboard, Leaderboard, LeaderboardError, MatchRecord};
pub use manager::{ManagerError, SessionManager};
pub use room::{Audience, ChannelRoom, GameEvent, RoomBroadcaster};
