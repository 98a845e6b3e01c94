use super::game::require_status;
use super::{AppState, Store};
use crate::error::{GameError, GameResult};
use crate::scheduler::FollowUp;
use crate::types::*;
use chrono::Utc;

/// Trim and check an answer against the prompt's constraints
pub(crate) fn validate_answer(
    text: &str,
    prompt_type: Option<PromptType>,
    max_chars: usize,
) -> GameResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(GameError::InvalidAnswer("answer is empty".to_string()));
    }
    if text.chars().count() > max_chars {
        return Err(GameError::InvalidAnswer(format!(
            "answer exceeds {} characters",
            max_chars
        )));
    }
    if prompt_type == Some(PromptType::Jab) && text.split_whitespace().count() > 1 {
        return Err(GameError::InvalidAnswer(
            "jab answers must be a single word".to_string(),
        ));
    }
    Ok(text.to_string())
}

/// Answers still owed for the current round. Only unresolved matchups count;
/// bye prompts never block voting.
pub(crate) fn missing_submissions(store: &Store, game_id: &str, round: u32) -> usize {
    store
        .prompts_in_round(game_id, round)
        .into_iter()
        .filter(|p| p.is_matchup() && p.outcome.is_none())
        .flat_map(|p| {
            p.assigned_to
                .iter()
                .filter(move |pid| store.submission_by(&p.id, pid).is_none())
        })
        .count()
}

pub(crate) fn insert_submission(
    store: &mut Store,
    prompt_id: &str,
    player_id: &str,
    text: String,
    attack_type: Option<AttackType>,
) -> SubmissionId {
    let submission = Submission {
        id: ulid::Ulid::new().to_string(),
        prompt_id: prompt_id.to_string(),
        player_id: player_id.to_string(),
        text,
        submitted_at: Some(Utc::now()),
        attack_type,
    };
    let id = submission.id.clone();
    store.submissions.insert(id.clone(), submission);
    id
}

impl AppState {
    /// Record a player's answer. Once every required answer is in, voting
    /// opens on the first matchup.
    pub async fn submit_answer(
        &self,
        game_id: &str,
        player_id: &str,
        prompt_id: &str,
        text: &str,
        attack_type: Option<AttackType>,
    ) -> GameResult<(SubmissionId, Vec<FollowUp>)> {
        let mut store = self.store.write().await;

        let game = store.game(game_id)?;
        require_status(game, GameStatus::Prompts)?;
        let round = game.current_round;
        let round_rules = game.ruleset.rules().round(round);

        store
            .players
            .get(player_id)
            .filter(|p| p.game_id == game_id)
            .ok_or(GameError::PlayerNotFound)?;

        let prompt = store
            .prompts
            .get(prompt_id)
            .filter(|p| p.game_id == game_id && p.round == round)
            .ok_or(GameError::PromptNotFound)?;
        if !prompt.is_assigned(player_id) {
            return Err(GameError::NotAssigned);
        }
        if store.submission_by(prompt_id, player_id).is_some() {
            return Err(GameError::AlreadySubmitted);
        }

        let text = validate_answer(text, prompt.prompt_type, self.config.max_answer_chars)?;
        if attack_type.is_some() && !round_rules.attack_types {
            return Err(GameError::AttackNotAllowed);
        }

        let submission_id = insert_submission(&mut store, prompt_id, player_id, text, attack_type);
        tracing::debug!(game_id, player_id, prompt_id, "Answer submitted");
        store.game_mut(game_id)?.touch();

        let follow_ups = self.maybe_enter_voting_in(&mut store, game_id)?;
        Ok((submission_id, follow_ups))
    }

    /// Open voting if the writing phase has nothing left to wait for
    pub(crate) fn maybe_enter_voting_in(
        &self,
        store: &mut Store,
        game_id: &str,
    ) -> GameResult<Vec<FollowUp>> {
        let game = store.game(game_id)?;
        if game.status != GameStatus::Prompts {
            return Ok(Vec::new());
        }

        let missing = missing_submissions(store, game_id, game.current_round);
        if missing > 0 {
            tracing::debug!(game_id, missing, "Waiting for answers");
            return Ok(Vec::new());
        }

        tracing::info!(game_id, round = game.current_round, "All answers in, voting opens");
        self.advance_in(store, game_id)
    }
}
