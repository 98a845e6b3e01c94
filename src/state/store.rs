//! In-memory tables with the lookups the engine needs.
//!
//! Every engine operation holds the store's write lock for its whole body, so
//! each call behaves as one serializable transaction.

use crate::error::{GameError, GameResult};
use crate::types::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Store {
    pub games: HashMap<GameId, Game>,
    pub players: HashMap<PlayerId, Player>,
    pub prompts: HashMap<PromptId, Prompt>,
    pub submissions: HashMap<SubmissionId, Submission>,
    pub votes: HashMap<VoteId, Vote>,
}

impl Store {
    pub fn game(&self, game_id: &str) -> GameResult<&Game> {
        self.games.get(game_id).ok_or(GameError::GameNotFound)
    }

    pub fn game_mut(&mut self, game_id: &str) -> GameResult<&mut Game> {
        self.games.get_mut(game_id).ok_or(GameError::GameNotFound)
    }

    pub fn game_by_room_code(&self, room_code: &str) -> Option<&Game> {
        let code = room_code.trim().to_uppercase();
        self.games.values().find(|g| g.room_code == code)
    }

    pub fn player(&self, player_id: &str) -> GameResult<&Player> {
        self.players.get(player_id).ok_or(GameError::PlayerNotFound)
    }

    pub fn player_mut(&mut self, player_id: &str) -> GameResult<&mut Player> {
        self.players
            .get_mut(player_id)
            .ok_or(GameError::PlayerNotFound)
    }

    pub fn prompt(&self, prompt_id: &str) -> GameResult<&Prompt> {
        self.prompts.get(prompt_id).ok_or(GameError::PromptNotFound)
    }

    /// All players of a game, cloned, in seat order
    pub fn players_in(&self, game_id: &str) -> Vec<Player> {
        let mut players: Vec<Player> = self
            .players
            .values()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect();
        players.sort_by_key(|p| p.seat);
        players
    }

    pub fn active_fighter_count(&self, game_id: &str) -> usize {
        self.players
            .values()
            .filter(|p| p.game_id == game_id && p.is_active_fighter())
            .count()
    }

    /// Prompts of one round in round order
    pub fn prompts_in_round(&self, game_id: &str, round: u32) -> Vec<&Prompt> {
        let mut prompts: Vec<&Prompt> = self
            .prompts
            .values()
            .filter(|p| p.game_id == game_id && p.round == round)
            .collect();
        prompts.sort_by_key(|p| p.order);
        prompts
    }

    pub fn submissions_for(&self, prompt_id: &str) -> Vec<&Submission> {
        self.submissions
            .values()
            .filter(|s| s.prompt_id == prompt_id)
            .collect()
    }

    pub fn submission_by(&self, prompt_id: &str, player_id: &str) -> Option<&Submission> {
        self.submissions
            .values()
            .find(|s| s.prompt_id == prompt_id && s.player_id == player_id)
    }

    pub fn votes_for(&self, prompt_id: &str) -> Vec<&Vote> {
        self.votes
            .values()
            .filter(|v| v.prompt_id == prompt_id)
            .collect()
    }

    pub fn has_voted(&self, prompt_id: &str, player_id: &str) -> bool {
        self.votes
            .values()
            .any(|v| v.prompt_id == prompt_id && v.player_id == player_id)
    }

    /// Votes cast for a given submission
    pub fn vote_count(&self, submission_id: &str) -> u32 {
        self.votes
            .values()
            .filter(|v| v.submission_id == submission_id)
            .count() as u32
    }

    /// Drop every prompt of a game together with its submissions and votes
    pub fn purge_prompts(&mut self, game_id: &str) -> usize {
        let prompt_ids: Vec<PromptId> = self
            .prompts
            .values()
            .filter(|p| p.game_id == game_id)
            .map(|p| p.id.clone())
            .collect();

        self.submissions
            .retain(|_, s| !prompt_ids.contains(&s.prompt_id));
        self.votes.retain(|_, v| !prompt_ids.contains(&v.prompt_id));
        for id in &prompt_ids {
            self.prompts.remove(id);
        }
        prompt_ids.len()
    }

    /// Remove a game and everything that belongs to it
    pub fn delete_game(&mut self, game_id: &str) -> Option<Game> {
        self.purge_prompts(game_id);
        self.players.retain(|_, p| p.game_id != game_id);
        self.games.remove(game_id)
    }
}
