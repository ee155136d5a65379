use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::game::cards::{
    can_beat_with_hand, find_smallest_beating, pick_cards, sort_hand, Card, HandError, ParsedHand,
};
use crate::leaderboard::Leaderboard;
use crate::room::{GameEvent, RoomBroadcaster};

pub const SEAT_COUNT: usize = 3;
const CARDS_PER_SEAT: usize = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Init,
    Bidding,
    Playing,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Game has not started")]
    GameNotStart,
    #[error("Game has already started")]
    GameStarted,
    #[error("Invalid cards: {0}")]
    InvalidCards(#[from] HandError),
    #[error("Cannot beat the last played hand")]
    CannotBeat,
    #[error("Must play - both opponents passed")]
    MustPlay,
    #[error("Unknown player")]
    UnknownPlayer,
}

/// One seat's player. The hand is owned exclusively by the session and kept
/// sorted strictly descending by rank.
#[derive(Debug, Clone)]
pub struct GamePlayer {
    pub id: String,
    pub name: String,
    pub seat: usize,
    pub hand: Vec<Card>,
    pub is_landlord: bool,
    pub is_offline: bool,
}

/// Timer durations and RNG seeding for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a seat gets to answer the bid prompt
    pub bid_timeout: Duration,
    /// How long a seat gets to play or pass
    pub play_timeout: Duration,
    /// Fixed seed for deterministic shuffling and tie-breaking (tests);
    /// `None` seeds from the OS
    pub rng_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bid_timeout: Duration::from_secs(15),
            play_timeout: Duration::from_secs(30),
            rng_seed: None,
        }
    }
}

/// Seat assignment supplied by the room when the game is created.
#[derive(Debug, Clone)]
pub struct SeatAssignment {
    pub id: String,
    pub name: String,
}

/// Public per-seat info carried by a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatInfo {
    pub player_id: String,
    pub player_name: String,
    pub seat: usize,
    pub cards_remaining: usize,
    pub is_landlord: bool,
    pub is_offline: bool,
}

/// Everything a reconnecting client needs to rebuild its view, taken under
/// the read lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub room_id: String,
    pub phase: GamePhase,
    pub seats: Vec<SeatInfo>,
    /// The requester's own hand
    pub hand: Vec<Card>,
    /// Empty until the landlord has picked them up
    pub bottom_cards: Vec<Card>,
    /// The bidder during Bidding, the player during Playing
    pub current_seat: usize,
    pub last_played: Option<ParsedHand>,
    /// The requester must play on its turn (free play is forced)
    pub must_play: bool,
    /// The requester holds some legal response to the last played hand
    pub can_beat: bool,
    /// Set once the session has ended
    pub winner_seat: Option<usize>,
}

/// Persisted shape of one seat for session restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoredSeat {
    pub id: String,
    pub name: String,
    pub hand: Vec<Card>,
    pub is_landlord: bool,
}

/// State needed to rebuild a session from a stored room snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRestore {
    pub seats: [RestoredSeat; SEAT_COUNT],
    pub bottom_cards: Vec<Card>,
    pub phase: GamePhase,
    pub current_seat: usize,
    /// Cards of the hand currently on the table, empty for a free play
    pub last_played_cards: Vec<Card>,
    pub last_player: Option<usize>,
    pub consecutive_passes: u8,
    pub bid_passes: u8,
}

struct SessionState {
    phase: GamePhase,
    players: Vec<GamePlayer>,
    bottom_cards: Vec<Card>,
    current_player: usize,
    current_bidder: usize,
    last_played: Option<ParsedHand>,
    last_player: Option<usize>,
    consecutive_passes: u8,
    bid_passes: u8,
    winner: Option<usize>,
    /// Bumped every turn change; a pending timer whose epoch no longer
    /// matches is stale and must no-op
    turn_epoch: u64,
    rng: StdRng,
}

impl SessionState {
    fn seat_of(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    fn bump_epoch(&mut self) -> u64 {
        self.turn_epoch += 1;
        self.turn_epoch
    }

    fn landlord_seat(&self) -> Option<usize> {
        self.players.iter().position(|p| p.is_landlord)
    }

    /// Whether `seat` faces a forced free play (nothing on the table, or the
    /// table hand is its own).
    fn free_play_forced(&self, seat: usize) -> bool {
        self.last_played.is_none() || self.last_player == Some(seat)
    }
}

/// Where an outbound event goes once the state lock is released.
enum Outbound {
    All(GameEvent),
    Seat(usize, GameEvent),
}

#[derive(Clone, Copy)]
struct TimerSpec {
    epoch: u64,
    duration: Duration,
}

struct SeatResult {
    player_id: String,
    player_name: String,
    is_winner: bool,
    is_landlord: bool,
}

/// The authoritative state machine for one room's game.
///
/// All mutating entry points serialize on the internal write lock; outbound
/// events are composed under the lock and delivered only after it drops, so
/// a slow client can never stall the game. Each turn arms a fresh timeout
/// task; timer and late commands race for the lock and the loser fails its
/// precondition check.
pub struct GameSession {
    room_id: String,
    config: SessionConfig,
    broadcaster: Arc<dyn RoomBroadcaster>,
    leaderboard: Arc<dyn Leaderboard>,
    state: RwLock<SessionState>,
}

impl GameSession {
    pub fn new(
        room_id: impl Into<String>,
        seats: [SeatAssignment; SEAT_COUNT],
        broadcaster: Arc<dyn RoomBroadcaster>,
        leaderboard: Arc<dyn Leaderboard>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let players = seats
            .into_iter()
            .enumerate()
            .map(|(seat, assignment)| GamePlayer {
                id: assignment.id,
                name: assignment.name,
                seat,
                hand: Vec::new(),
                is_landlord: false,
                is_offline: false,
            })
            .collect();

        Arc::new(Self {
            room_id: room_id.into(),
            broadcaster,
            leaderboard,
            state: RwLock::new(SessionState {
                phase: GamePhase::Init,
                players,
                bottom_cards: Vec::new(),
                current_player: 0,
                current_bidder: 0,
                last_played: None,
                last_player: None,
                consecutive_passes: 0,
                bid_passes: 0,
                winner: None,
                turn_epoch: 0,
                rng: new_rng(&config),
            }),
            config,
        })
    }

    /// Rebuilds a session from a stored room snapshot. The caller replays no
    /// moves; the restored state is picked up exactly where it left off.
    /// Call [`GameSession::resume`] afterwards to re-arm the turn timer.
    pub fn restore(
        room_id: impl Into<String>,
        restore: SessionRestore,
        broadcaster: Arc<dyn RoomBroadcaster>,
        leaderboard: Arc<dyn Leaderboard>,
        config: SessionConfig,
    ) -> Result<Arc<Self>, GameError> {
        let last_played = if restore.last_played_cards.is_empty() {
            None
        } else {
            Some(ParsedHand::classify(&restore.last_played_cards)?)
        };
        let players = restore
            .seats
            .into_iter()
            .enumerate()
            .map(|(seat, stored)| {
                let mut hand = stored.hand;
                sort_hand(&mut hand);
                GamePlayer {
                    id: stored.id,
                    name: stored.name,
                    seat,
                    hand,
                    is_landlord: stored.is_landlord,
                    is_offline: false,
                }
            })
            .collect();

        Ok(Arc::new(Self {
            room_id: room_id.into(),
            broadcaster,
            leaderboard,
            state: RwLock::new(SessionState {
                phase: restore.phase,
                players,
                bottom_cards: restore.bottom_cards,
                current_player: restore.current_seat % SEAT_COUNT,
                current_bidder: restore.current_seat % SEAT_COUNT,
                last_played,
                last_player: restore.last_player,
                consecutive_passes: restore.consecutive_passes,
                bid_passes: restore.bid_passes,
                winner: None,
                turn_epoch: 0,
                rng: new_rng(&config),
            }),
            config,
        }))
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub async fn phase(&self) -> GamePhase {
        self.state.read().await.phase
    }

    /// Re-arms the turn timer after a restore.
    pub async fn resume(self: &Arc<Self>) {
        let timer = {
            let mut state = self.state.write().await;
            match state.phase {
                GamePhase::Bidding => Some(TimerSpec {
                    epoch: state.bump_epoch(),
                    duration: self.config.bid_timeout,
                }),
                GamePhase::Playing => Some(TimerSpec {
                    epoch: state.bump_epoch(),
                    duration: self.config.play_timeout,
                }),
                _ => None,
            }
        };
        self.arm_timer(timer);
    }

    /// Deals and moves Init → Bidding.
    pub async fn start(self: &Arc<Self>) -> Result<(), GameError> {
        let (outbound, timer) = {
            let mut state = self.state.write().await;
            if state.phase != GamePhase::Init {
                return Err(GameError::GameStarted);
            }

            let mut deck = Card::shuffled_deck(&mut state.rng);
            state.bottom_cards = deck.split_off(SEAT_COUNT * CARDS_PER_SEAT);
            for seat in 0..SEAT_COUNT {
                let mut hand: Vec<Card> = deck.drain(..CARDS_PER_SEAT).collect();
                sort_hand(&mut hand);
                state.players[seat].hand = hand;
            }
            state.phase = GamePhase::Bidding;
            let first = state.rng.random_range(0..SEAT_COUNT);
            state.current_bidder = first;

            info!(room_id = %self.room_id, first_bidder = first, "Game started, dealing");

            let mut outbound = vec![Outbound::All(GameEvent::GameStarted {
                room_id: self.room_id.clone(),
            })];
            for player in &state.players {
                outbound.push(Outbound::Seat(
                    player.seat,
                    GameEvent::HandDealt {
                        room_id: self.room_id.clone(),
                        seat: player.seat,
                        cards: player.hand.clone(),
                    },
                ));
            }
            outbound.push(Outbound::All(GameEvent::BidAsked {
                room_id: self.room_id.clone(),
                seat: first,
            }));

            let timer = TimerSpec {
                epoch: state.bump_epoch(),
                duration: self.config.bid_timeout,
            };
            (outbound, timer)
        };

        self.dispatch(outbound).await;
        self.arm_timer(Some(timer));
        Ok(())
    }

    /// Answer the bid prompt: `true` takes the landlord role immediately.
    pub async fn handle_bid(
        self: &Arc<Self>,
        player_id: &str,
        take: bool,
    ) -> Result<(), GameError> {
        let (outbound, timer) = {
            let mut state = self.state.write().await;
            let seat = state.seat_of(player_id).ok_or(GameError::UnknownPlayer)?;
            match state.phase {
                GamePhase::Bidding => {}
                GamePhase::Init => return Err(GameError::GameNotStart),
                GamePhase::Playing | GamePhase::Ended => return Err(GameError::GameStarted),
            }
            if seat != state.current_bidder {
                return Err(GameError::NotYourTurn);
            }
            self.apply_bid(&mut state, seat, take)
        };

        self.dispatch(outbound).await;
        self.arm_timer(timer);
        Ok(())
    }

    /// Play a concrete card selection.
    pub async fn handle_play_cards(
        self: &Arc<Self>,
        player_id: &str,
        cards: &[Card],
    ) -> Result<(), GameError> {
        let (outbound, timer, results) = {
            let mut state = self.state.write().await;
            let seat = self.playing_seat(&state, player_id)?;
            self.apply_play(&mut state, seat, cards.to_vec())?
        };

        self.dispatch(outbound).await;
        self.arm_timer(timer);
        self.record_results(results).await;
        Ok(())
    }

    /// Play from a free-text rank selection like `"334455"` or `"rocket"`.
    pub async fn handle_play_spec(
        self: &Arc<Self>,
        player_id: &str,
        spec: &str,
    ) -> Result<(), GameError> {
        let (outbound, timer, results) = {
            let mut state = self.state.write().await;
            let seat = self.playing_seat(&state, player_id)?;
            let cards = pick_cards(&state.players[seat].hand, spec)?;
            self.apply_play(&mut state, seat, cards)?
        };

        self.dispatch(outbound).await;
        self.arm_timer(timer);
        self.record_results(results).await;
        Ok(())
    }

    /// Pass the turn. Rejected with `MustPlay` when the table is clear.
    pub async fn handle_pass(self: &Arc<Self>, player_id: &str) -> Result<(), GameError> {
        let (outbound, timer) = {
            let mut state = self.state.write().await;
            let seat = self.playing_seat(&state, player_id)?;
            self.apply_pass(&mut state, seat)?
        };

        self.dispatch(outbound).await;
        self.arm_timer(timer);
        Ok(())
    }

    /// Transition to Ended with the given winning seat. Invoked internally
    /// on hand-empty detection; calling it on an ended session is a no-op.
    pub async fn end_game(self: &Arc<Self>, winner_seat: usize) -> Result<(), GameError> {
        if winner_seat >= SEAT_COUNT {
            return Err(GameError::UnknownPlayer);
        }
        let (outbound, results) = {
            let mut state = self.state.write().await;
            if state.phase == GamePhase::Ended {
                return Ok(());
            }
            if state.phase == GamePhase::Init {
                return Err(GameError::GameNotStart);
            }
            let mut outbound = Vec::new();
            let results = self.finish_game(&mut state, winner_seat, &mut outbound);
            (outbound, results)
        };

        self.dispatch(outbound).await;
        self.record_results(Some(results)).await;
        Ok(())
    }

    /// Marks a seat as disconnected. The turn timer keeps running; expiry
    /// acts on the seat's behalf, which is what keeps the room progressing.
    pub async fn set_offline(&self, player_id: &str, offline: bool) -> Result<(), GameError> {
        let mut state = self.state.write().await;
        let seat = state.seat_of(player_id).ok_or(GameError::UnknownPlayer)?;
        state.players[seat].is_offline = offline;
        debug!(room_id = %self.room_id, seat, offline, "Seat presence changed");
        Ok(())
    }

    /// Read-only view for rehydrating a reconnecting client.
    pub async fn snapshot(&self, player_id: &str) -> Result<SessionSnapshot, GameError> {
        let state = self.state.read().await;
        let seat = state.seat_of(player_id).ok_or(GameError::UnknownPlayer)?;
        let player = &state.players[seat];

        let current_seat = match state.phase {
            GamePhase::Bidding => state.current_bidder,
            _ => state.current_player,
        };
        let must_play = state.phase == GamePhase::Playing
            && seat == state.current_player
            && state.free_play_forced(seat);
        let can_beat = if state.free_play_forced(seat) {
            !player.hand.is_empty()
        } else {
            can_beat_with_hand(&player.hand, state.last_played.as_ref())
        };

        Ok(SessionSnapshot {
            room_id: self.room_id.clone(),
            phase: state.phase,
            seats: state
                .players
                .iter()
                .map(|p| SeatInfo {
                    player_id: p.id.clone(),
                    player_name: p.name.clone(),
                    seat: p.seat,
                    cards_remaining: p.hand.len(),
                    is_landlord: p.is_landlord,
                    is_offline: p.is_offline,
                })
                .collect(),
            hand: player.hand.clone(),
            bottom_cards: if state.landlord_seat().is_some() {
                state.bottom_cards.clone()
            } else {
                Vec::new()
            },
            current_seat,
            last_played: state.last_played.clone(),
            must_play,
            can_beat,
            winner_seat: state.winner,
        })
    }

    /// Serializable state for the storage collaborator.
    pub async fn persistable(&self) -> SessionRestore {
        let state = self.state.read().await;
        let stored_seat = |p: &GamePlayer| RestoredSeat {
            id: p.id.clone(),
            name: p.name.clone(),
            hand: p.hand.clone(),
            is_landlord: p.is_landlord,
        };
        SessionRestore {
            seats: [
                stored_seat(&state.players[0]),
                stored_seat(&state.players[1]),
                stored_seat(&state.players[2]),
            ],
            bottom_cards: state.bottom_cards.clone(),
            phase: state.phase,
            current_seat: match state.phase {
                GamePhase::Bidding => state.current_bidder,
                _ => state.current_player,
            },
            last_played_cards: state
                .last_played
                .as_ref()
                .map(|h| h.cards.clone())
                .unwrap_or_default(),
            last_player: state.last_player,
            consecutive_passes: state.consecutive_passes,
            bid_passes: state.bid_passes,
        }
    }

    // ------------------------------------------------------------------
    // Mutation core (always called with the write lock held)
    // ------------------------------------------------------------------

    fn playing_seat(&self, state: &SessionState, player_id: &str) -> Result<usize, GameError> {
        let seat = state.seat_of(player_id).ok_or(GameError::UnknownPlayer)?;
        match state.phase {
            GamePhase::Playing => {}
            GamePhase::Init | GamePhase::Bidding | GamePhase::Ended => {
                return Err(GameError::GameNotStart)
            }
        }
        if seat != state.current_player {
            return Err(GameError::NotYourTurn);
        }
        Ok(seat)
    }

    fn apply_bid(
        &self,
        state: &mut SessionState,
        seat: usize,
        take: bool,
    ) -> (Vec<Outbound>, Option<TimerSpec>) {
        let mut outbound = vec![Outbound::All(GameEvent::BidPlaced {
            room_id: self.room_id.clone(),
            seat,
            take,
        })];

        if take {
            self.assign_landlord(state, seat, false, &mut outbound);
        } else {
            state.bid_passes += 1;
            if state.bid_passes as usize == SEAT_COUNT {
                // Nobody wants it: random assignment keeps the game moving
                let chosen = state.rng.random_range(0..SEAT_COUNT);
                self.assign_landlord(state, chosen, true, &mut outbound);
            } else {
                state.current_bidder = (seat + 1) % SEAT_COUNT;
                outbound.push(Outbound::All(GameEvent::BidAsked {
                    room_id: self.room_id.clone(),
                    seat: state.current_bidder,
                }));
            }
        }

        let duration = match state.phase {
            GamePhase::Bidding => self.config.bid_timeout,
            _ => self.config.play_timeout,
        };
        let timer = TimerSpec {
            epoch: state.bump_epoch(),
            duration,
        };
        (outbound, Some(timer))
    }

    fn assign_landlord(
        &self,
        state: &mut SessionState,
        seat: usize,
        by_default: bool,
        outbound: &mut Vec<Outbound>,
    ) {
        state.players[seat].is_landlord = true;
        let bottom = state.bottom_cards.clone();
        state.players[seat].hand.extend(bottom.iter().copied());
        sort_hand(&mut state.players[seat].hand);
        state.phase = GamePhase::Playing;
        state.current_player = seat;
        state.last_played = None;
        state.last_player = None;
        state.consecutive_passes = 0;

        info!(room_id = %self.room_id, seat, by_default, "Landlord assigned");

        outbound.push(Outbound::All(GameEvent::LandlordAssigned {
            room_id: self.room_id.clone(),
            seat,
            bottom_cards: bottom,
            by_default,
        }));
        outbound.push(Outbound::All(GameEvent::TurnChanged {
            room_id: self.room_id.clone(),
            seat,
        }));
    }

    #[allow(clippy::type_complexity)]
    fn apply_play(
        &self,
        state: &mut SessionState,
        seat: usize,
        cards: Vec<Card>,
    ) -> Result<(Vec<Outbound>, Option<TimerSpec>, Option<Vec<SeatResult>>), GameError> {
        verify_owned(&state.players[seat].hand, &cards)?;
        let parsed = ParsedHand::classify(&cards)?;

        if let Some(last) = &state.last_played {
            if state.last_player != Some(seat) && !parsed.can_beat(last) {
                return Err(GameError::CannotBeat);
            }
        }

        remove_cards(&mut state.players[seat].hand, &cards);
        let cards_remaining = state.players[seat].hand.len();
        state.last_played = Some(parsed.clone());
        state.last_player = Some(seat);
        state.consecutive_passes = 0;

        let mut outbound = vec![Outbound::All(GameEvent::CardsPlayed {
            room_id: self.room_id.clone(),
            seat,
            cards,
            hand_type: parsed.hand_type,
            cards_remaining,
        })];

        if cards_remaining == 0 {
            let results = self.finish_game(state, seat, &mut outbound);
            return Ok((outbound, None, Some(results)));
        }

        state.current_player = (seat + 1) % SEAT_COUNT;
        outbound.push(Outbound::All(GameEvent::TurnChanged {
            room_id: self.room_id.clone(),
            seat: state.current_player,
        }));
        let timer = TimerSpec {
            epoch: state.bump_epoch(),
            duration: self.config.play_timeout,
        };
        Ok((outbound, Some(timer), None))
    }

    fn apply_pass(
        &self,
        state: &mut SessionState,
        seat: usize,
    ) -> Result<(Vec<Outbound>, Option<TimerSpec>), GameError> {
        if state.free_play_forced(seat) {
            return Err(GameError::MustPlay);
        }

        state.consecutive_passes += 1;
        state.current_player = (seat + 1) % SEAT_COUNT;
        let mut outbound = vec![Outbound::All(GameEvent::Passed {
            room_id: self.room_id.clone(),
            seat,
        })];

        if state.consecutive_passes as usize >= SEAT_COUNT - 1 {
            // Back to the seat that played last: the table clears and its
            // next play is free
            state.last_played = None;
            state.last_player = None;
            state.consecutive_passes = 0;
            outbound.push(Outbound::All(GameEvent::TableCleared {
                room_id: self.room_id.clone(),
                seat: state.current_player,
            }));
        }
        outbound.push(Outbound::All(GameEvent::TurnChanged {
            room_id: self.room_id.clone(),
            seat: state.current_player,
        }));

        let timer = TimerSpec {
            epoch: state.bump_epoch(),
            duration: self.config.play_timeout,
        };
        Ok((outbound, Some(timer)))
    }

    fn finish_game(
        &self,
        state: &mut SessionState,
        winner_seat: usize,
        outbound: &mut Vec<Outbound>,
    ) -> Vec<SeatResult> {
        state.phase = GamePhase::Ended;
        state.winner = Some(winner_seat);
        // Kill any pending timer
        state.bump_epoch();

        let landlord_seat = state.landlord_seat().unwrap_or(winner_seat);
        let landlord_won = winner_seat == landlord_seat;

        info!(
            room_id = %self.room_id,
            winner_seat,
            landlord_won,
            "Game over"
        );

        outbound.push(Outbound::All(GameEvent::GameOver {
            room_id: self.room_id.clone(),
            winner_seat,
            landlord_seat,
            landlord_won,
        }));

        state
            .players
            .iter()
            .map(|p| SeatResult {
                player_id: p.id.clone(),
                player_name: p.name.clone(),
                // Farmers win together
                is_winner: if landlord_won {
                    p.is_landlord
                } else {
                    !p.is_landlord
                },
                is_landlord: p.is_landlord,
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn arm_timer(self: &Arc<Self>, timer: Option<TimerSpec>) {
        let Some(timer) = timer else { return };
        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(timer.duration).await;
            session.fire_timeout(timer.epoch).await;
        });
    }

    /// Timeout path: races client commands for the write lock; stale epochs
    /// (the turn already advanced) drop out silently.
    async fn fire_timeout(self: &Arc<Self>, epoch: u64) {
        let (outbound, timer, results) = {
            let mut state = self.state.write().await;
            if state.turn_epoch != epoch {
                return;
            }
            match state.phase {
                GamePhase::Bidding => {
                    let seat = state.current_bidder;
                    info!(room_id = %self.room_id, seat, "Bid timer expired, auto-passing");
                    let mut outbound = vec![Outbound::All(GameEvent::PlayerTimeout {
                        room_id: self.room_id.clone(),
                        seat,
                    })];
                    let (bid_outbound, timer) = self.apply_bid(&mut state, seat, false);
                    outbound.extend(bid_outbound);
                    (outbound, timer, None)
                }
                GamePhase::Playing => {
                    let seat = state.current_player;
                    let mut outbound = vec![Outbound::All(GameEvent::PlayerTimeout {
                        room_id: self.room_id.clone(),
                        seat,
                    })];
                    if state.free_play_forced(seat) {
                        // Forced free play: shed the smallest card
                        let cards = find_smallest_beating(&state.players[seat].hand, None)
                            .unwrap_or_default();
                        info!(room_id = %self.room_id, seat, "Play timer expired, auto-playing");
                        match self.apply_play(&mut state, seat, cards) {
                            Ok((play_outbound, timer, results)) => {
                                outbound.extend(play_outbound);
                                (outbound, timer, results)
                            }
                            Err(error) => {
                                warn!(room_id = %self.room_id, seat, %error, "Auto-play failed");
                                return;
                            }
                        }
                    } else {
                        info!(room_id = %self.room_id, seat, "Play timer expired, auto-passing");
                        match self.apply_pass(&mut state, seat) {
                            Ok((pass_outbound, timer)) => {
                                outbound.extend(pass_outbound);
                                (outbound, timer, None)
                            }
                            Err(error) => {
                                warn!(room_id = %self.room_id, seat, %error, "Auto-pass failed");
                                return;
                            }
                        }
                    }
                }
                GamePhase::Init | GamePhase::Ended => return,
            }
        };

        self.dispatch(outbound).await;
        self.arm_timer(timer);
        self.record_results(results).await;
    }

    // ------------------------------------------------------------------
    // Post-lock delivery
    // ------------------------------------------------------------------

    async fn dispatch(&self, outbound: Vec<Outbound>) {
        for item in outbound {
            match item {
                Outbound::All(event) => self.broadcaster.broadcast(event).await,
                Outbound::Seat(seat, event) => self.broadcaster.send_to_seat(seat, event).await,
            }
        }
    }

    async fn record_results(&self, results: Option<Vec<SeatResult>>) {
        let Some(results) = results else { return };
        for result in results {
            if let Err(error) = self
                .leaderboard
                .record_result(
                    &result.player_id,
                    &result.player_name,
                    result.is_winner,
                    result.is_landlord,
                )
                .await
            {
                // Result recording must never block game-over finalization
                warn!(
                    room_id = %self.room_id,
                    player_id = %result.player_id,
                    %error,
                    "Failed to record game result"
                );
            }
        }
    }
}

fn new_rng(config: &SessionConfig) -> StdRng {
    match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Multiset containment check, suit included; duplicate requests are caught
/// because each match is consumed.
fn verify_owned(hand: &[Card], cards: &[Card]) -> Result<(), HandError> {
    let mut pool = hand.to_vec();
    for card in cards {
        match pool.iter().position(|c| c == card) {
            Some(index) => {
                pool.swap_remove(index);
            }
            None => return Err(HandError::NotEnoughOfRank(card.rank)),
        }
    }
    Ok(())
}

fn remove_cards(hand: &mut Vec<Card>, cards: &[Card]) {
    for card in cards {
        if let Some(index) = hand.iter().position(|c| c == card) {
            hand.remove(index);
        }
    }
}
