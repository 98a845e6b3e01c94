use super::game::require_status;
use super::{AppState, Store};
use crate::error::{GameError, GameResult};
use crate::types::*;

/// Combatants and their corner men never judge their own battle
pub fn is_eligible_voter(voter: &Player, assigned_to: &[PlayerId]) -> bool {
    if assigned_to.contains(&voter.id) {
        return false;
    }
    let supports_combatant = voter.role == PlayerRole::CornerMan
        && voter
            .team_id
            .as_ref()
            .is_some_and(|captain| assigned_to.contains(captain));
    !supports_combatant
}

/// Every player of the game allowed to vote on a matchup between `assigned_to`
pub fn eligible_voters(store: &Store, game_id: &str, assigned_to: &[PlayerId]) -> Vec<Player> {
    store
        .players_in(game_id)
        .into_iter()
        .filter(|p| is_eligible_voter(p, assigned_to))
        .collect()
}

impl AppState {
    /// Cast a vote on the battle currently being judged
    pub async fn submit_vote(
        &self,
        game_id: &str,
        voter_id: &str,
        prompt_id: &str,
        submission_id: &str,
    ) -> GameResult<Vote> {
        let mut store = self.store.write().await;
        self.submit_vote_in(&mut store, game_id, voter_id, prompt_id, submission_id)
    }

    pub(crate) fn submit_vote_in(
        &self,
        store: &mut Store,
        game_id: &str,
        voter_id: &str,
        prompt_id: &str,
        submission_id: &str,
    ) -> GameResult<Vote> {
        let game = store.game(game_id)?;
        require_status(game, GameStatus::Voting)?;

        let prompt = store
            .prompts
            .get(prompt_id)
            .filter(|p| p.game_id == game_id)
            .ok_or(GameError::PromptNotFound)?;
        if game.current_prompt_id.as_deref() != Some(prompt_id)
            || game.round_status != Some(RoundStatus::Voting)
        {
            return Err(GameError::VotingClosed);
        }

        let voter = store
            .players
            .get(voter_id)
            .filter(|p| p.game_id == game_id)
            .ok_or(GameError::PlayerNotFound)?;
        if !is_eligible_voter(voter, &prompt.assigned_to) {
            return Err(GameError::IneligibleVoter);
        }
        if store.has_voted(prompt_id, voter_id) {
            return Err(GameError::AlreadyVoted);
        }

        store
            .submissions
            .get(submission_id)
            .filter(|s| s.prompt_id == prompt_id)
            .ok_or(GameError::SubmissionNotFound)?;

        let vote = Vote {
            id: ulid::Ulid::new().to_string(),
            prompt_id: prompt_id.to_string(),
            player_id: voter_id.to_string(),
            submission_id: submission_id.to_string(),
        };
        let eligible = eligible_voters(store, game_id, &prompt.assigned_to).len();
        store.votes.insert(vote.id.clone(), vote.clone());

        let cast = store.votes_for(prompt_id).len();
        tracing::debug!(game_id, prompt_id, voter_id, cast, eligible, "Vote cast");

        let game = store.game_mut(game_id)?;
        if cast >= eligible {
            tracing::info!(game_id, prompt_id, "Every vote is in, revealing");
            game.round_status = Some(RoundStatus::Reveal);
        }
        game.touch();

        Ok(vote)
    }
}
