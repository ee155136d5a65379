use std::fmt;

use strum::IntoEnumIterator;
use thiserror::Error;

use super::basic::{Card, Rank, RANK_COUNT};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandError {
    #[error("No cards selected")]
    EmptySelection,
    #[error("Cards do not form a legal hand")]
    InvalidCombination,
    #[error("Unrecognized card code: {0}")]
    InvalidCardCode(String),
    #[error("Unrecognized rank token: {0}")]
    UnknownRankToken(String),
    #[error("Not enough {0} in hand")]
    NotEnoughOfRank(Rank),
}

/// The closed set of legal hand shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum HandType {
    Single,
    Pair,
    Trio,
    TrioWithSingle,
    TrioWithPair,
    Straight,
    PairStraight,
    Plane,
    PlaneWithSingles,
    PlaneWithPairs,
    Bomb,
    FourWithTwo,
    FourWithTwoPairs,
    Rocket,
}

impl HandType {
    /// Sequence shapes compare by length as well as key rank.
    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            HandType::Straight
                | HandType::PairStraight
                | HandType::Plane
                | HandType::PlaneWithSingles
                | HandType::PlaneWithPairs
        )
    }
}

impl fmt::Display for HandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HandType::Single => "Single",
                HandType::Pair => "Pair",
                HandType::Trio => "Trio",
                HandType::TrioWithSingle => "Trio with single",
                HandType::TrioWithPair => "Trio with pair",
                HandType::Straight => "Straight",
                HandType::PairStraight => "Pair straight",
                HandType::Plane => "Plane",
                HandType::PlaneWithSingles => "Plane with singles",
                HandType::PlaneWithPairs => "Plane with pairs",
                HandType::Bomb => "Bomb",
                HandType::FourWithTwo => "Four with two",
                HandType::FourWithTwoPairs => "Four with two pairs",
                HandType::Rocket => "Rocket",
            }
        )
    }
}

/// Per-rank multiplicity table for one classification or search call.
///
/// A fixed 15-slot array indexed by rank discriminant, so grouping is
/// deterministic and iteration is always in ascending rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandAnalysis {
    pub(crate) counts: [u8; RANK_COUNT],
}

impl HandAnalysis {
    pub fn of(cards: &[Card]) -> Self {
        let mut counts = [0u8; RANK_COUNT];
        for card in cards {
            counts[card.rank.index()] += 1;
        }
        Self { counts }
    }

    pub fn count(&self, rank: Rank) -> u8 {
        self.counts[rank.index()]
    }

    /// Ranks that appear exactly `n` times, ascending.
    pub fn ranks_with_count(&self, n: u8) -> Vec<Rank> {
        self.ranks_matching(|count| count == n)
    }

    /// Ranks that appear at least `n` times, ascending.
    pub fn ranks_with_at_least(&self, n: u8) -> Vec<Rank> {
        self.ranks_matching(|count| count >= n)
    }

    pub fn distinct_ranks(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    fn ranks_matching(&self, pred: impl Fn(u8) -> bool) -> Vec<Rank> {
        Rank::iter()
            .filter(|rank| {
                let count = self.counts[rank.index()];
                count > 0 && pred(count)
            })
            .collect()
    }
}

/// A classified play: its shape, the rank that decides strength, and (for
/// sequence shapes) the run length in distinct ranks.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedHand {
    pub hand_type: HandType,
    pub key_rank: Rank,
    pub length: usize,
    pub cards: Vec<Card>,
}

impl ParsedHand {
    /// Classifies a non-empty card selection, testing shapes in strict
    /// priority order: rocket, bomb, four-with-kickers, trio-with-kickers,
    /// plane, straight, pair straight, then plain single/pair.
    pub fn classify(cards: &[Card]) -> Result<ParsedHand, HandError> {
        if cards.is_empty() {
            return Err(HandError::EmptySelection);
        }

        let analysis = HandAnalysis::of(cards);
        let total = cards.len();

        if let Some(hand) = Self::match_rocket(cards, &analysis, total) {
            return Ok(hand);
        }
        if let Some(hand) = Self::match_bomb(cards, &analysis, total) {
            return Ok(hand);
        }
        if let Some(hand) = Self::match_four_with_kickers(cards, &analysis, total) {
            return Ok(hand);
        }
        if let Some(hand) = Self::match_trio_with_kickers(cards, &analysis, total) {
            return Ok(hand);
        }
        if let Some(hand) = Self::match_plane(cards, &analysis, total) {
            return Ok(hand);
        }
        if let Some(hand) = Self::match_straight(cards, &analysis, total) {
            return Ok(hand);
        }
        if let Some(hand) = Self::match_pair_straight(cards, &analysis, total) {
            return Ok(hand);
        }
        if let Some(hand) = Self::match_simple(cards, &analysis, total) {
            return Ok(hand);
        }

        Err(HandError::InvalidCombination)
    }

    /// Whether this hand may be played on top of `last` ("legal response"
    /// relation, not a total order; a single never beats a pair).
    pub fn can_beat(&self, last: &ParsedHand) -> bool {
        if self.hand_type == HandType::Rocket {
            return last.hand_type != HandType::Rocket;
        }
        if last.hand_type == HandType::Rocket {
            return false;
        }
        if self.hand_type == HandType::Bomb && last.hand_type != HandType::Bomb {
            return true;
        }
        if last.hand_type == HandType::Bomb && self.hand_type != HandType::Bomb {
            return false;
        }
        if self.hand_type != last.hand_type {
            return false;
        }
        if self.hand_type.is_sequence() && self.length != last.length {
            return false;
        }
        self.key_rank > last.key_rank
    }

    fn make(hand_type: HandType, key_rank: Rank, length: usize, cards: &[Card]) -> ParsedHand {
        ParsedHand {
            hand_type,
            key_rank,
            length,
            cards: cards.to_vec(),
        }
    }

    fn match_rocket(cards: &[Card], analysis: &HandAnalysis, total: usize) -> Option<ParsedHand> {
        if total == 2
            && analysis.count(Rank::BlackJoker) == 1
            && analysis.count(Rank::RedJoker) == 1
        {
            return Some(Self::make(HandType::Rocket, Rank::RedJoker, 0, cards));
        }
        None
    }

    fn match_bomb(cards: &[Card], analysis: &HandAnalysis, total: usize) -> Option<ParsedHand> {
        if total != 4 {
            return None;
        }
        let quad = analysis.ranks_with_count(4);
        quad.first()
            .map(|&rank| Self::make(HandType::Bomb, rank, 0, cards))
    }

    fn match_four_with_kickers(
        cards: &[Card],
        analysis: &HandAnalysis,
        total: usize,
    ) -> Option<ParsedHand> {
        let quad = *analysis.ranks_with_count(4).first()?;
        match total {
            // Quad plus exactly two extra cards (the extras may themselves
            // form a pair)
            6 => Some(Self::make(HandType::FourWithTwo, quad, 0, cards)),
            // Quad plus exactly two extra pairs of distinct ranks
            8 => {
                let pairs = analysis.ranks_with_count(2);
                if pairs.len() == 2 {
                    Some(Self::make(HandType::FourWithTwoPairs, quad, 0, cards))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn match_trio_with_kickers(
        cards: &[Card],
        analysis: &HandAnalysis,
        total: usize,
    ) -> Option<ParsedHand> {
        let trios = analysis.ranks_with_count(3);
        if trios.len() != 1 {
            return None;
        }
        let trio = trios[0];
        match total {
            3 => Some(Self::make(HandType::Trio, trio, 0, cards)),
            4 => Some(Self::make(HandType::TrioWithSingle, trio, 0, cards)),
            5 => {
                // The two extras must be a genuine pair
                let pairs = analysis.ranks_with_count(2);
                if pairs.len() == 1 {
                    Some(Self::make(HandType::TrioWithPair, trio, 0, cards))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn match_plane(cards: &[Card], analysis: &HandAnalysis, total: usize) -> Option<ParsedHand> {
        let body: Vec<Rank> = analysis.ranks_with_at_least(3);
        if body.len() < 2 {
            return None;
        }
        if !body.iter().all(|r| r.is_chainable()) || !ranks_consecutive(&body) {
            return None;
        }
        let run = body.len();
        // Anything beyond three cards per body rank is a kicker; kickers may
        // not reuse a run rank, so a quad inside the run disqualifies it.
        if body.iter().any(|&r| analysis.count(r) > 3) {
            return None;
        }
        let extras = total - 3 * run;
        let key = body[0];
        if extras == 0 {
            return Some(Self::make(HandType::Plane, key, run, cards));
        }
        if extras == run {
            return Some(Self::make(HandType::PlaneWithSingles, key, run, cards));
        }
        if extras == 2 * run {
            let kicker_pairs = analysis.ranks_with_count(2);
            if kicker_pairs.len() == run {
                return Some(Self::make(HandType::PlaneWithPairs, key, run, cards));
            }
        }
        None
    }

    fn match_straight(cards: &[Card], analysis: &HandAnalysis, total: usize) -> Option<ParsedHand> {
        if total < 5 || analysis.distinct_ranks() != total {
            return None;
        }
        let ranks = analysis.ranks_with_count(1);
        if ranks.iter().all(|r| r.is_chainable()) && ranks_consecutive(&ranks) {
            return Some(Self::make(HandType::Straight, ranks[0], total, cards));
        }
        None
    }

    fn match_pair_straight(
        cards: &[Card],
        analysis: &HandAnalysis,
        total: usize,
    ) -> Option<ParsedHand> {
        let pairs = analysis.ranks_with_count(2);
        if pairs.len() < 3 || pairs.len() * 2 != total {
            return None;
        }
        if pairs.iter().all(|r| r.is_chainable()) && ranks_consecutive(&pairs) {
            return Some(Self::make(
                HandType::PairStraight,
                pairs[0],
                pairs.len(),
                cards,
            ));
        }
        None
    }

    fn match_simple(cards: &[Card], analysis: &HandAnalysis, total: usize) -> Option<ParsedHand> {
        match total {
            1 => Some(Self::make(HandType::Single, cards[0].rank, 0, cards)),
            2 => {
                let pairs = analysis.ranks_with_count(2);
                pairs
                    .first()
                    .map(|&rank| Self::make(HandType::Pair, rank, 0, cards))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ParsedHand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.hand_type, self.key_rank)
    }
}

/// True when the already-sorted ranks form a gap-free ascending run.
pub(crate) fn ranks_consecutive(ranks: &[Rank]) -> bool {
    ranks
        .windows(2)
        .all(|pair| pair[1].index() == pair[0].index() + 1)
}
