//! Game export/import for quick and dirty state restoration.
//!
//! A snapshot holds every row belonging to one game so it can be saved to
//! disk and loaded back into a fresh engine.

use super::game::unique_room_code;
use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema version for snapshot format compatibility
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Schema version for forward compatibility
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub game: Game,
    pub players: Vec<Player>,
    pub prompts: Vec<Prompt>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub votes: Vec<Vote>,
}

impl GameSnapshot {
    /// Validate the snapshot before import
    pub fn validate(&self) -> GameResult<()> {
        if self.schema_version > SNAPSHOT_SCHEMA_VERSION {
            return Err(GameError::UnsupportedSnapshot(self.schema_version));
        }

        let game_id = &self.game.id;
        if let Some(p) = self.players.iter().find(|p| &p.game_id != game_id) {
            tracing::warn!(player_id = %p.id, "Snapshot player belongs to another game");
            return Err(GameError::PlayerNotFound);
        }
        if let Some(p) = self.prompts.iter().find(|p| &p.game_id != game_id) {
            tracing::warn!(prompt_id = %p.id, "Snapshot prompt belongs to another game");
            return Err(GameError::PromptNotFound);
        }
        for sub in &self.submissions {
            if !self.prompts.iter().any(|p| p.id == sub.prompt_id) {
                return Err(GameError::PromptNotFound);
            }
        }
        for vote in &self.votes {
            if !self.submissions.iter().any(|s| s.id == vote.submission_id) {
                return Err(GameError::SubmissionNotFound);
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl AppState {
    /// Capture every row of a game
    pub async fn export_game(&self, game_id: &str) -> GameResult<GameSnapshot> {
        let store = self.store.read().await;
        let game = store.game(game_id)?.clone();

        let mut prompts: Vec<Prompt> = store
            .prompts
            .values()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect();
        prompts.sort_by_key(|p| (p.round, p.order));

        let submissions = prompts
            .iter()
            .flat_map(|p| store.submissions_for(&p.id))
            .cloned()
            .collect();
        let votes = prompts
            .iter()
            .flat_map(|p| store.votes_for(&p.id))
            .cloned()
            .collect();

        Ok(GameSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            game,
            players: store.players_in(game_id),
            prompts,
            submissions,
            votes,
        })
    }

    /// Load a snapshot, replacing any existing rows of that game
    pub async fn import_game(&self, mut snapshot: GameSnapshot) -> GameResult<GameId> {
        snapshot.validate()?;

        let mut store = self.store.write().await;
        let game_id = snapshot.game.id.clone();
        if store.delete_game(&game_id).is_some() {
            tracing::info!(%game_id, "Replacing existing game from snapshot");
        }

        // Another live game owns this room code; the import gets a fresh one
        if store.game_by_room_code(&snapshot.game.room_code).is_some() {
            let room_code = unique_room_code(&store);
            tracing::warn!(
                %game_id,
                taken = %snapshot.game.room_code,
                %room_code,
                "Room code already in use, reassigning"
            );
            snapshot.game.room_code = room_code;
        }

        for player in snapshot.players {
            store.players.insert(player.id.clone(), player);
        }
        for prompt in snapshot.prompts {
            store.prompts.insert(prompt.id.clone(), prompt);
        }
        for sub in snapshot.submissions {
            store.submissions.insert(sub.id.clone(), sub);
        }
        for vote in snapshot.votes {
            store.votes.insert(vote.id.clone(), vote);
        }
        store.games.insert(game_id.clone(), snapshot.game);

        tracing::info!(%game_id, "Game imported");
        Ok(game_id)
    }

    /// Export a game to a JSON file
    pub async fn save_game(&self, game_id: &str, path: &Path) -> std::io::Result<()> {
        let snapshot = self
            .export_game(game_id)
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))?;
        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, json).await
    }

    /// Import a game from a JSON file
    pub async fn load_game(&self, path: &Path) -> std::io::Result<GameId> {
        let json = tokio::fs::read_to_string(path).await?;
        let snapshot = GameSnapshot::from_json(&json)?;
        self.import_game(snapshot)
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }
}
