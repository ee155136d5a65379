pub mod cards;
pub mod session;

pub use cards::{Card, HandType, ParsedHand, Rank, Suit};
pub use session::{GameError, GamePhase, GameSession, SeatAssignment, SessionConfig};
