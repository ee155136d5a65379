use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use super::hands::HandError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, EnumIter,
)]
pub enum Suit {
    Diamond = 0,
    Club = 1,
    Heart = 2,
    Spade = 3,
    Joker = 4,
}

impl PartialOrd for Suit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Suit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Suit::Diamond => "D",
                Suit::Club => "C",
                Suit::Heart => "H",
                Suit::Spade => "S",
                Suit::Joker => "J",
            }
        )
    }
}

impl TryFrom<&str> for Suit {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "D" => Ok(Suit::Diamond),
            "C" => Ok(Suit::Club),
            "H" => Ok(Suit::Heart),
            "S" => Ok(Suit::Spade),
            "J" => Ok(Suit::Joker),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Color {
    Black,
    Red,
}

/// Number of distinct ranks, including both jokers.
pub const RANK_COUNT: usize = 15;

/// Rank strength order used everywhere in the engine: 3 is weakest, the red
/// joker is strongest, and 2 outranks the ace. The discriminant doubles as
/// the index into fixed-size per-rank count tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, EnumIter,
)]
pub enum Rank {
    Three = 0,
    Four = 1,
    Five = 2,
    Six = 3,
    Seven = 4,
    Eight = 5,
    Nine = 6,
    Ten = 7,
    Jack = 8,
    Queen = 9,
    King = 10,
    Ace = 11,
    Two = 12,
    BlackJoker = 13,
    RedJoker = 14,
}

impl Rank {
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Rank> {
        Rank::iter().nth(index)
    }

    pub fn is_joker(&self) -> bool {
        matches!(self, Rank::BlackJoker | Rank::RedJoker)
    }

    /// Whether this rank may take part in a straight, pair straight or plane
    /// run. 2 and the jokers never chain.
    pub fn is_chainable(&self) -> bool {
        !matches!(self, Rank::Two | Rank::BlackJoker | Rank::RedJoker)
    }

    /// The next rank up in strength order, if any.
    pub fn successor(&self) -> Option<Rank> {
        Rank::from_index(self.index() + 1)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Rank::Three => "3",
                Rank::Four => "4",
                Rank::Five => "5",
                Rank::Six => "6",
                Rank::Seven => "7",
                Rank::Eight => "8",
                Rank::Nine => "9",
                Rank::Ten => "10",
                Rank::Jack => "J",
                Rank::Queen => "Q",
                Rank::King => "K",
                Rank::Ace => "A",
                Rank::Two => "2",
                Rank::BlackJoker => "B",
                Rank::RedJoker => "R",
            }
        )
    }
}

impl TryFrom<&str> for Rank {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "3" => Ok(Rank::Three),
            "4" => Ok(Rank::Four),
            "5" => Ok(Rank::Five),
            "6" => Ok(Rank::Six),
            "7" => Ok(Rank::Seven),
            "8" => Ok(Rank::Eight),
            "9" => Ok(Rank::Nine),
            "10" | "T" => Ok(Rank::Ten),
            "J" => Ok(Rank::Jack),
            "Q" => Ok(Rank::Queen),
            "K" => Ok(Rank::King),
            "A" => Ok(Rank::Ace),
            "2" => Ok(Rank::Two),
            "B" => Ok(Rank::BlackJoker),
            "R" => Ok(Rank::RedJoker),
            _ => Err(s.to_string()),
        }
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Card {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.rank.cmp(&other.rank) {
            std::cmp::Ordering::Equal => self.suit.cmp(&other.suit),
            other => other,
        }
    }
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { suit, rank }
    }

    pub fn black_joker() -> Self {
        Self::new(Rank::BlackJoker, Suit::Joker)
    }

    pub fn red_joker() -> Self {
        Self::new(Rank::RedJoker, Suit::Joker)
    }

    pub fn color(&self) -> Color {
        match (self.suit, self.rank) {
            (Suit::Joker, Rank::RedJoker) => Color::Red,
            (Suit::Joker, _) => Color::Black,
            (Suit::Heart | Suit::Diamond, _) => Color::Red,
            _ => Color::Black,
        }
    }

    pub fn from_string(s: &str) -> Result<Self, HandError> {
        // Joker codes have no suit letter
        if let Ok(rank @ (Rank::BlackJoker | Rank::RedJoker)) = Rank::try_from(s) {
            return Ok(Self::new(rank, Suit::Joker));
        }
        if s.len() < 2 || !s.is_ascii() {
            return Err(HandError::InvalidCardCode(s.to_string()));
        }

        let suit =
            Suit::try_from(&s[0..1]).map_err(|_| HandError::InvalidCardCode(s.to_string()))?;
        let rank =
            Rank::try_from(&s[1..]).map_err(|_| HandError::InvalidCardCode(s.to_string()))?;
        if suit == Suit::Joker || rank.is_joker() {
            return Err(HandError::InvalidCardCode(s.to_string()));
        }

        Ok(Self::new(rank, suit))
    }

    /// The full 54-card deck: four cards of every rank 3..2 plus one of each
    /// joker.
    pub fn full_deck() -> Vec<Card> {
        let mut cards = Vec::with_capacity(54);
        for suit in Suit::iter().filter(|s| *s != Suit::Joker) {
            for rank in Rank::iter().filter(|r| !r.is_joker()) {
                cards.push(Card::new(rank, suit));
            }
        }
        cards.push(Card::black_joker());
        cards.push(Card::red_joker());
        cards
    }

    pub fn shuffled_deck(rng: &mut impl Rng) -> Vec<Card> {
        let mut cards = Self::full_deck();
        cards.shuffle(rng);
        cards
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rank.is_joker() {
            write!(f, "{}", self.rank)
        } else {
            write!(f, "{}{}", self.suit, self.rank)
        }
    }
}

/// Sorts a hand strictly descending by rank (suit breaks ties); player hands
/// are kept in this order for the whole game.
pub fn sort_hand(hand: &mut [Card]) {
    hand.sort_by(|a, b| b.cmp(a));
}
