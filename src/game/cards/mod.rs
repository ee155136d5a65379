pub mod basic;
pub mod finder;
pub mod hands;


pub use basic::{sort_hand, Card, Color, Rank, Suit, RANK_COUNT};
pub use finder::{can_beat_with_hand, find_smallest_beating, pick_cards};
pub use hands::{HandAnalysis, HandError, HandType, ParsedHand};
