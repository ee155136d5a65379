//! Response search over a player hand: extracting concrete cards from a
//! textual rank selection, and finding the smallest legal answer to an
//! opponent's play.
//!
//! All searches walk ranks in ascending strength within ascending
//! multiplicity groups, so the first hit is always the cheapest set of cards
//! that works. `find_smallest_beating` and `can_beat_with_hand` share the
//! same search core, so one returns `Some` exactly when the other returns
//! true.

use strum::IntoEnumIterator;

use super::basic::{Card, Rank};
use super::hands::{HandAnalysis, HandError, HandType, ParsedHand};

/// Text token that selects both jokers as a rocket.
const ROCKET_TOKEN: &str = "rocket";

/// Resolves a free-text rank selection like `"334455"` or `"QQ"` against a
/// hand, pulling that many physical cards of each requested rank. Which
/// suits get pulled is immaterial to the rules, so cards are taken in hand
/// order. The literal token `rocket` selects both jokers.
pub fn pick_cards(hand: &[Card], spec: &str) -> Result<Vec<Card>, HandError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(HandError::EmptySelection);
    }

    if spec.eq_ignore_ascii_case(ROCKET_TOKEN) {
        let analysis = HandAnalysis::of(hand);
        if analysis.count(Rank::BlackJoker) == 0 {
            return Err(HandError::NotEnoughOfRank(Rank::BlackJoker));
        }
        if analysis.count(Rank::RedJoker) == 0 {
            return Err(HandError::NotEnoughOfRank(Rank::RedJoker));
        }
        return Ok(take_cards(hand, &[(Rank::RedJoker, 1), (Rank::BlackJoker, 1)]));
    }

    let mut needed = [0u8; super::basic::RANK_COUNT];
    for token in tokenize_ranks(spec)? {
        needed[token.index()] += 1;
    }

    let analysis = HandAnalysis::of(hand);
    let mut request = Vec::new();
    for rank in Rank::iter() {
        let count = needed[rank.index()];
        if count == 0 {
            continue;
        }
        if analysis.count(rank) < count {
            return Err(HandError::NotEnoughOfRank(rank));
        }
        request.push((rank, count as usize));
    }

    Ok(take_cards(hand, &request))
}

/// Splits a rank spec into rank tokens. `10` is the only two-character
/// token; everything else is a single character.
fn tokenize_ranks(spec: &str) -> Result<Vec<Rank>, HandError> {
    let mut ranks = Vec::new();
    let mut chars = spec.chars();
    while let Some(ch) = chars.next() {
        let token = if ch == '1' {
            match chars.next() {
                Some('0') => "10".to_string(),
                _ => return Err(HandError::UnknownRankToken(ch.to_string())),
            }
        } else {
            ch.to_ascii_uppercase().to_string()
        };
        let rank = Rank::try_from(token.as_str())
            .map_err(|_| HandError::UnknownRankToken(token.clone()))?;
        ranks.push(rank);
    }
    Ok(ranks)
}

/// Searches `hand` for the smallest legal response to `last`. `None` for
/// `last` is a free play, answered with the hand's single lowest card; the
/// hand is kept sorted descending, so that is its last element.
///
/// Returns `None` when no legal response exists.
pub fn find_smallest_beating(hand: &[Card], last: Option<&ParsedHand>) -> Option<Vec<Card>> {
    let last = match last {
        Some(last) => last,
        None => return hand.last().map(|card| vec![*card]),
    };

    if last.hand_type == HandType::Rocket {
        return None;
    }

    let analysis = HandAnalysis::of(hand);
    if let Some(cards) = find_same_type(hand, &analysis, last) {
        return Some(cards);
    }
    if last.hand_type != HandType::Bomb {
        if let Some(rank) = smallest_bomb(&analysis, None) {
            return Some(take_cards(hand, &[(rank, 4)]));
        }
    }
    if analysis.count(Rank::BlackJoker) > 0 && analysis.count(Rank::RedJoker) > 0 {
        return Some(take_cards(hand, &[(Rank::RedJoker, 1), (Rank::BlackJoker, 1)]));
    }
    None
}

/// Existence-only mirror of [`find_smallest_beating`]: true iff some legal
/// response to `last` exists in `hand`. Short-circuits on the bomb/rocket
/// escapes before running the same-type search.
pub fn can_beat_with_hand(hand: &[Card], last: Option<&ParsedHand>) -> bool {
    let last = match last {
        Some(last) => last,
        None => return !hand.is_empty(),
    };

    if last.hand_type == HandType::Rocket {
        return false;
    }

    let analysis = HandAnalysis::of(hand);
    if analysis.count(Rank::BlackJoker) > 0 && analysis.count(Rank::RedJoker) > 0 {
        return true;
    }
    let bomb_floor = match last.hand_type {
        HandType::Bomb => Some(last.key_rank),
        _ => None,
    };
    if smallest_bomb(&analysis, bomb_floor).is_some() {
        return true;
    }
    if last.hand_type == HandType::Bomb {
        // No higher bomb and no rocket
        return false;
    }
    find_same_type(hand, &analysis, last).is_some()
}

/// Smallest same-shape (and same-length) response strictly above `last`.
fn find_same_type(hand: &[Card], analysis: &HandAnalysis, last: &ParsedHand) -> Option<Vec<Card>> {
    match last.hand_type {
        HandType::Single => {
            let rank = smallest_supplier(analysis, 1, last.key_rank, &[])?;
            Some(take_cards(hand, &[(rank, 1)]))
        }
        HandType::Pair => {
            let rank = smallest_supplier(analysis, 2, last.key_rank, &[])?;
            Some(take_cards(hand, &[(rank, 2)]))
        }
        HandType::Trio => {
            let rank = smallest_supplier(analysis, 3, last.key_rank, &[])?;
            Some(take_cards(hand, &[(rank, 3)]))
        }
        HandType::TrioWithSingle => find_trio_with_kicker(hand, analysis, last.key_rank, 1),
        HandType::TrioWithPair => find_trio_with_kicker(hand, analysis, last.key_rank, 2),
        HandType::Bomb => {
            let rank = smallest_bomb(analysis, Some(last.key_rank))?;
            Some(take_cards(hand, &[(rank, 4)]))
        }
        HandType::FourWithTwo => find_four_with_kickers(hand, analysis, last.key_rank, false),
        HandType::FourWithTwoPairs => find_four_with_kickers(hand, analysis, last.key_rank, true),
        HandType::Straight => find_run(hand, analysis, last.key_rank, last.length, 1, 0),
        HandType::PairStraight => find_run(hand, analysis, last.key_rank, last.length, 2, 0),
        HandType::Plane => find_run(hand, analysis, last.key_rank, last.length, 3, 0),
        HandType::PlaneWithSingles => find_run(hand, analysis, last.key_rank, last.length, 3, 1),
        HandType::PlaneWithPairs => find_run(hand, analysis, last.key_rank, last.length, 3, 2),
        HandType::Rocket => None,
    }
}

/// Smallest rank above `floor` able to supply `needed` cards, scanning
/// multiplicity groups in order: ranks holding exactly `needed` first, then
/// progressively larger groups (so pairs are broken before trios, trios
/// before quads). `excluded` ranks are skipped.
fn smallest_supplier(
    analysis: &HandAnalysis,
    needed: u8,
    floor: Rank,
    excluded: &[Rank],
) -> Option<Rank> {
    for group in needed..=4 {
        let found = analysis
            .ranks_with_count(group)
            .into_iter()
            .find(|rank| *rank > floor && !excluded.contains(rank));
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Like [`smallest_supplier`] with no rank floor.
fn smallest_kicker(analysis: &HandAnalysis, needed: u8, excluded: &[Rank]) -> Option<Rank> {
    for group in needed..=4 {
        let found = analysis
            .ranks_with_count(group)
            .into_iter()
            .find(|rank| !excluded.contains(rank));
        if found.is_some() {
            return found;
        }
    }
    None
}

fn smallest_bomb(analysis: &HandAnalysis, above: Option<Rank>) -> Option<Rank> {
    analysis
        .ranks_with_count(4)
        .into_iter()
        .find(|rank| above.map_or(true, |floor| *rank > floor))
}

/// Trio response with a single or pair kicker. Every eligible trio rank is
/// tried before giving up, since a small trio may lack kickers a larger one
/// can complete.
fn find_trio_with_kicker(
    hand: &[Card],
    analysis: &HandAnalysis,
    floor: Rank,
    kicker_size: u8,
) -> Option<Vec<Card>> {
    for body in analysis.ranks_with_at_least(3) {
        if body <= floor {
            continue;
        }
        let remainder = remove_ranks(analysis, &[(body, 3)]);
        if let Some(kicker) = smallest_kicker(&remainder, kicker_size, &[body]) {
            return Some(take_cards(
                hand,
                &[(body, 3), (kicker, kicker_size as usize)],
            ));
        }
    }
    None
}

/// Quad response with two single kickers or two pair kickers.
fn find_four_with_kickers(
    hand: &[Card],
    analysis: &HandAnalysis,
    floor: Rank,
    pair_kickers: bool,
) -> Option<Vec<Card>> {
    for body in analysis.ranks_with_count(4) {
        if body <= floor {
            continue;
        }
        let kickers = if pair_kickers {
            collect_kicker_units(analysis, &[body], 2, 2)
        } else {
            collect_kicker_units(analysis, &[body], 2, 1)
        };
        if let Some(kickers) = kickers {
            let mut request = vec![(body, 4)];
            request.extend(kickers);
            return Some(take_cards(hand, &request));
        }
    }
    None
}

/// Lowest same-length run strictly above `key`, with `copies` cards of each
/// run rank and optional kicker units (`kicker_size` 0 for none, 1 for
/// singles, 2 for pairs; one unit per run rank).
fn find_run(
    hand: &[Card],
    analysis: &HandAnalysis,
    key: Rank,
    length: usize,
    copies: u8,
    kicker_size: u8,
) -> Option<Vec<Card>> {
    let mut start = key.successor()?;
    loop {
        let Some(run) = run_at(start, length) else {
            return None;
        };
        if run.iter().all(|&r| analysis.count(r) >= copies) {
            let body: Vec<(Rank, usize)> = run.iter().map(|&r| (r, copies as usize)).collect();
            if kicker_size == 0 {
                return Some(take_cards(hand, &body));
            }
            let remainder = remove_ranks(analysis, &body);
            if let Some(kickers) = collect_kicker_units(&remainder, &run, length, kicker_size) {
                let mut request = body;
                request.extend(kickers);
                return Some(take_cards(hand, &request));
            }
            // Kickers can fail for this start rank yet exist for a later one
        }
        start = start.successor()?;
        if !start.is_chainable() {
            return None;
        }
    }
}

/// The ranks `start..start+length`, or `None` if the run would leave
/// chainable territory.
fn run_at(start: Rank, length: usize) -> Option<Vec<Rank>> {
    let mut run = Vec::with_capacity(length);
    let mut rank = start;
    for step in 0..length {
        if !rank.is_chainable() {
            return None;
        }
        run.push(rank);
        if step + 1 < length {
            rank = rank.successor()?;
        }
    }
    Some(run)
}

/// Picks `units` kicker units of `unit_size` cards each from the cheapest
/// available groups, never touching `excluded` ranks. Pair units never reuse
/// a rank; single units may reuse one at most twice (two singles out of one
/// pair is a legal kicker set, but a third would put a trio in the selection
/// and change its shape).
fn collect_kicker_units(
    analysis: &HandAnalysis,
    excluded: &[Rank],
    units: usize,
    unit_size: u8,
) -> Option<Vec<(Rank, usize)>> {
    let mut remainder = analysis.clone();
    let mut taken: Vec<Rank> = excluded.to_vec();
    let mut picked: Vec<(Rank, usize)> = Vec::with_capacity(units);
    for _ in 0..units {
        let rank = smallest_kicker(&remainder, unit_size, &taken)?;
        remainder = remove_ranks(&remainder, &[(rank, unit_size as usize)]);
        let total = if let Some(entry) = picked.iter_mut().find(|(r, _)| *r == rank) {
            entry.1 += unit_size as usize;
            entry.1
        } else {
            picked.push((rank, unit_size as usize));
            unit_size as usize
        };
        if unit_size >= 2 || total >= 2 {
            taken.push(rank);
        }
    }
    Some(picked)
}

/// A copy of `analysis` with the listed cards removed.
fn remove_ranks(analysis: &HandAnalysis, removals: &[(Rank, usize)]) -> HandAnalysis {
    let mut copy = analysis.clone();
    for (rank, n) in removals {
        let slot = &mut copy.counts[rank.index()];
        *slot = slot.saturating_sub(*n as u8);
    }
    copy
}

/// Pulls `count` physical cards of each requested rank out of `hand`, in
/// hand order. Callers have already verified availability.
fn take_cards(hand: &[Card], request: &[(Rank, usize)]) -> Vec<Card> {
    let mut remaining: Vec<(Rank, usize)> = request.to_vec();
    let mut picked = Vec::new();
    for card in hand {
        if let Some(entry) = remaining
            .iter_mut()
            .find(|(rank, left)| *rank == card.rank && *left > 0)
        {
            entry.1 -= 1;
            picked.push(*card);
        }
    }
    picked
}
