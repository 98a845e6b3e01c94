//! Bot driver.
//!
//! Bots answer as soon as their prompts exist and vote after a short jittered
//! delay, going through the same validation as human players.

use crate::error::GameResult;
use crate::rules::MAX_NAME_CHARS;
use crate::state::{eligible_voters, insert_submission, AppState, Store};
use crate::types::*;
use rand::seq::IndexedRandom;
use rand::Rng;

const BOT_ANSWERS: &[&str] = &[
    "A suspiciously large spoon",
    "My landlord, in a trench coat",
    "Three raccoons and a dream",
    "Whatever is in the back of the fridge",
    "An apology written in glitter",
    "The sound a fax machine makes",
    "Grandma's secret karaoke career",
    "A strongly worded sticky note",
    "Unpaid interns, but pigeons",
    "Emotional support cheese",
    "A tax audit with extra steps",
    "Beige, but louder",
];

const BOT_JABS: &[&str] = &[
    "Moist", "Yeet", "Brunch", "Llamas", "Regret", "Kazoo", "Vibes", "Spreadsheets", "Gravy",
    "Nope",
];

const FALLBACK_NAMES: &[&str] = &["Botty", "Clanker", "Gizmo", "Sprocket", "Widget"];

/// Pick a canned answer that fits the prompt
pub fn bot_answer(prompt_type: Option<PromptType>) -> String {
    let pool = match prompt_type {
        Some(PromptType::Jab) => BOT_JABS,
        _ => BOT_ANSWERS,
    };
    pool.choose(&mut rand::rng())
        .copied()
        .unwrap_or("Beep")
        .to_string()
}

fn bot_attack() -> AttackType {
    match rand::rng().random_range(0..3) {
        0 => AttackType::Jab,
        1 => AttackType::Haymaker,
        _ => AttackType::FlyingKick,
    }
}

/// Generate a bot name not in `taken` (lowercased names already in the game)
pub fn bot_name(taken: &[String]) -> String {
    for _ in 0..10 {
        if let Some(name) = petname::petname(2, " ") {
            let name = title_case(&name);
            if name.chars().count() <= MAX_NAME_CHARS && !taken.contains(&name.to_lowercase()) {
                return name;
            }
        }
    }

    // Petname collisions are unlikely; number the fallback until it is free
    (1..)
        .flat_map(|n| FALLBACK_NAMES.iter().map(move |base| format!("{} {}", base, n)))
        .find(|name| !taken.contains(&name.to_lowercase()))
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

fn title_case(words: &str) -> String {
    words
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl AppState {
    /// Fill in answers for every bot assignee of the current round's open prompts
    pub(crate) fn answer_for_bots_in(&self, store: &mut Store, game_id: &str) -> GameResult<usize> {
        let game = store.game(game_id)?;
        let round = game.current_round;
        let attacks = game.ruleset.rules().round(round).attack_types;

        let pending: Vec<(PromptId, PlayerId, Option<PromptType>)> = store
            .prompts_in_round(game_id, round)
            .into_iter()
            .filter(|p| p.outcome.is_none())
            .flat_map(|p| {
                p.assigned_to
                    .iter()
                    .filter(|pid| store.players.get(*pid).is_some_and(|pl| pl.is_bot))
                    .filter(|pid| store.submission_by(&p.id, pid).is_none())
                    .map(|pid| (p.id.clone(), pid.clone(), p.prompt_type))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (prompt_id, bot_id, prompt_type) in &pending {
            let attack = attacks.then(bot_attack);
            insert_submission(store, prompt_id, bot_id, bot_answer(*prompt_type), attack);
        }

        if !pending.is_empty() {
            tracing::debug!(game_id, answers = pending.len(), "Bots answered");
        }
        Ok(pending.len())
    }

    /// Deferred bot voting for `prompt_id`. Does nothing if that battle is no
    /// longer open.
    pub async fn cast_bot_votes(&self, game_id: &str, prompt_id: &str) -> GameResult<usize> {
        let mut store = self.store.write().await;
        self.cast_bot_votes_in(&mut store, game_id, prompt_id)
    }

    fn cast_bot_votes_in(
        &self,
        store: &mut Store,
        game_id: &str,
        prompt_id: &str,
    ) -> GameResult<usize> {
        let Some(game) = store.games.get(game_id) else {
            tracing::warn!(game_id, prompt_id, "Stale bot votes: game is gone");
            return Ok(0);
        };
        if game.status != GameStatus::Voting
            || game.current_prompt_id.as_deref() != Some(prompt_id)
            || game.round_status != Some(RoundStatus::Voting)
        {
            tracing::warn!(game_id, prompt_id, "Stale bot votes: battle is no longer open");
            return Ok(0);
        }
        let Some(prompt) = store.prompts.get(prompt_id) else {
            tracing::warn!(game_id, prompt_id, "Stale bot votes: prompt is gone");
            return Ok(0);
        };

        let choices: Vec<SubmissionId> = prompt
            .assigned_to
            .iter()
            .filter_map(|pid| store.submission_by(prompt_id, pid).map(|s| s.id.clone()))
            .collect();
        if choices.is_empty() {
            tracing::warn!(game_id, prompt_id, "No answers to vote on");
            return Ok(0);
        }

        let bots: Vec<PlayerId> = eligible_voters(store, game_id, &prompt.assigned_to)
            .into_iter()
            .filter(|p| p.is_bot && !store.has_voted(prompt_id, &p.id))
            .map(|p| p.id)
            .collect();

        let mut cast = 0;
        for bot_id in bots {
            let Some(choice) = choices.choose(&mut rand::rng()).cloned() else {
                break;
            };
            match self.submit_vote_in(store, game_id, &bot_id, prompt_id, &choice) {
                Ok(_) => cast += 1,
                Err(e) => {
                    tracing::warn!(game_id, prompt_id, %bot_id, error = %e, "Bot vote rejected");
                    break;
                }
            }
        }

        tracing::debug!(game_id, prompt_id, cast, "Bots voted");
        Ok(cast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Ruleset;
    use crate::state::test_support::*;

    #[test]
    fn test_jab_answers_are_single_words() {
        for _ in 0..20 {
            let answer = bot_answer(Some(PromptType::Jab));
            assert_eq!(answer.split_whitespace().count(), 1);
        }
        assert!(!bot_answer(None).is_empty());
    }

    #[test]
    fn test_bot_name_avoids_taken() {
        let name = bot_name(&[]);
        assert!(!name.is_empty());
        assert!(name.chars().count() <= 24);

        let taken = vec![name.to_lowercase()];
        for _ in 0..5 {
            assert_ne!(bot_name(&taken).to_lowercase(), taken[0]);
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("brave otter"), "Brave Otter");
    }

    #[tokio::test]
    async fn test_all_bot_round_reaches_voting() {
        let fx = fixture(Ruleset::Classic, 0, 0).await;
        // The VIP is the only human; three more bots make four fighters
        for _ in 0..3 {
            fx.state
                .add_bot(&fx.game_id, &fx.vip.id, &fx.vip_credential)
                .await
                .unwrap();
        }
        {
            // Make the VIP a bot too so nobody owes an answer
            let mut store = fx.state.store.write().await;
            store.player_mut(&fx.vip.id).unwrap().is_bot = true;
        }

        let follow_ups = fx.state.start_round1(&fx.game_id).await.unwrap();
        let game = fx.state.get_game(&fx.game_id).await.unwrap();
        assert_eq!(game.status, GameStatus::Voting);
        assert_eq!(game.round_status, Some(RoundStatus::Voting));
        assert!(matches!(
            follow_ups.as_slice(),
            [crate::scheduler::FollowUp::CastBotVotes { .. }]
        ));
    }

    #[tokio::test]
    async fn test_bot_votes_fill_battle_and_reveal() {
        let fx = fixture(Ruleset::Classic, 1, 2).await;
        fx.state.start_round1(&fx.game_id).await.unwrap();
        answer_all(&fx.state, &fx.game_id).await;

        let game = fx.state.get_game(&fx.game_id).await.unwrap();
        let prompt_id = game.current_prompt_id.unwrap();
        // Seats 0v1 fight first; the two bots judge
        let cast = fx.state.cast_bot_votes(&fx.game_id, &prompt_id).await.unwrap();
        assert_eq!(cast, 2);

        let game = fx.state.get_game(&fx.game_id).await.unwrap();
        assert_eq!(game.round_status, Some(RoundStatus::Reveal));

        // Firing again is stale
        assert_eq!(
            fx.state.cast_bot_votes(&fx.game_id, &prompt_id).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_stale_bot_votes_for_deleted_game() {
        let state = AppState::new();
        assert_eq!(state.cast_bot_votes("gone", "nothing").await.unwrap(), 0);
    }
}
