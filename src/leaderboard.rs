use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Error)]
pub enum LeaderboardError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// One per-seat result row written at game end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub player_id: String,
    pub player_name: String,
    pub is_winner: bool,
    pub is_landlord: bool,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// Storage collaborator for game results. Called exactly once per seat when
/// a game ends; failures are logged by the session and never block game-over
/// finalization.
#[async_trait]
pub trait Leaderboard: Send + Sync {
    async fn record_result(
        &self,
        player_id: &str,
        player_name: &str,
        is_winner: bool,
        is_landlord: bool,
    ) -> Result<(), LeaderboardError>;
}

/// In-memory leaderboard for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct InMemoryLeaderboard {
    records: RwLock<Vec<MatchRecord>>,
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<MatchRecord> {
        self.records.read().await.clone()
    }

    pub async fn wins(&self, player_id: &str) -> usize {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.player_id == player_id && r.is_winner)
            .count()
    }
}

#[async_trait]
impl Leaderboard for InMemoryLeaderboard {
    async fn record_result(
        &self,
        player_id: &str,
        player_name: &str,
        is_winner: bool,
        is_landlord: bool,
    ) -> Result<(), LeaderboardError> {
        let mut records = self.records.write().await;
        records.push(MatchRecord {
            player_id: player_id.to_string(),
            player_name: player_name.to_string(),
            is_winner,
            is_landlord,
            recorded_at: chrono::Utc::now(),
        });
        Ok(())
    }
}
