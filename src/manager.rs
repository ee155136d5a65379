use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::game::session::{
    GameError, GameSession, SeatAssignment, SessionConfig, SessionRestore, SEAT_COUNT,
};
use crate::leaderboard::Leaderboard;
use crate::room::RoomBroadcaster;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    #[error("Room {0} already has a running game")]
    RoomExists(String),
    #[error("Room {0} has no running game")]
    RoomNotFound(String),
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Registry of running sessions, one per room.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<GameSession>>>,
    leaderboard: Arc<dyn Leaderboard>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(leaderboard: Arc<dyn Leaderboard>, config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            leaderboard,
            config,
        }
    }

    /// Creates a session for the room and deals the first hand.
    pub async fn start_game(
        &self,
        room_id: &str,
        seats: [SeatAssignment; SEAT_COUNT],
        broadcaster: Arc<dyn RoomBroadcaster>,
    ) -> Result<Arc<GameSession>, ManagerError> {
        let session = {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(room_id) {
                return Err(ManagerError::RoomExists(room_id.to_string()));
            }
            let session = GameSession::new(
                room_id,
                seats,
                broadcaster,
                Arc::clone(&self.leaderboard),
                self.config.clone(),
            );
            sessions.insert(room_id.to_string(), Arc::clone(&session));
            session
        };

        info!(room_id, "Session created");
        session.start().await?;
        Ok(session)
    }

    /// Rebuilds a stored session and re-arms its turn timer.
    pub async fn restore_game(
        &self,
        room_id: &str,
        restore: SessionRestore,
        broadcaster: Arc<dyn RoomBroadcaster>,
    ) -> Result<Arc<GameSession>, ManagerError> {
        let session = GameSession::restore(
            room_id,
            restore,
            broadcaster,
            Arc::clone(&self.leaderboard),
            self.config.clone(),
        )?;
        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(room_id) {
                return Err(ManagerError::RoomExists(room_id.to_string()));
            }
            sessions.insert(room_id.to_string(), Arc::clone(&session));
        }

        info!(room_id, "Session restored");
        session.resume().await;
        Ok(session)
    }

    pub async fn get(&self, room_id: &str) -> Result<Arc<GameSession>, ManagerError> {
        self.sessions
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| ManagerError::RoomNotFound(room_id.to_string()))
    }

    /// Drops the session for a room, typically after game over.
    pub async fn remove(&self, room_id: &str) -> Result<(), ManagerError> {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(room_id) {
            Some(_) => {
                info!(room_id, "Session removed");
                Ok(())
            }
            None => Err(ManagerError::RoomNotFound(room_id.to_string())),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
