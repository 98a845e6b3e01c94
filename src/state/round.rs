//! Round boundaries.
//!
//! Moving between rounds happens in two committed steps: `close_round` reads
//! the finished round's prompts and settles the bracket, then `open_round`
//! purges those prompts and seeds the next round.

use super::game::require_status;
use super::{AppState, Store};
use crate::auth::require_vip;
use crate::error::{GameError, GameResult};
use crate::pairing;
use crate::rules::MIN_PLAYERS;
use crate::scheduler::FollowUp;
use crate::types::*;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// One finished pairing of the previous round and how each side fared
struct MatchupRecord {
    pair: [PlayerId; 2],
    wins: [u32; 2],
    first_answer: [Option<DateTime<Utc>>; 2],
}

fn matchup_records(store: &Store, game_id: &str, round: u32) -> Vec<MatchupRecord> {
    let mut records: Vec<MatchupRecord> = Vec::new();

    for prompt in store.prompts_in_round(game_id, round) {
        let [left, right] = match prompt.assigned_to.as_slice() {
            [l, r] => [l.clone(), r.clone()],
            _ => continue,
        };

        let idx = match records.iter().position(|r| {
            (r.pair[0] == left && r.pair[1] == right) || (r.pair[0] == right && r.pair[1] == left)
        }) {
            Some(idx) => idx,
            None => {
                records.push(MatchupRecord {
                    pair: [left, right],
                    wins: [0, 0],
                    first_answer: [None, None],
                });
                records.len() - 1
            }
        };
        let record = &mut records[idx];

        for (i, player_id) in record.pair.clone().iter().enumerate() {
            let won = prompt
                .outcome
                .as_ref()
                .and_then(|o| o.winner_id.as_ref())
                .is_some_and(|w| w == player_id);
            if won {
                record.wins[i] += 1;
            }

            let submitted = store
                .submission_by(&prompt.id, player_id)
                .and_then(|s| s.submitted_at);
            record.first_answer[i] = match (record.first_answer[i], submitted) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
    }

    records
}

/// Which side of a finished matchup keeps fighting: more HP, then more
/// battles won, then the earlier answer, then the first assigned.
fn bracket_survivor(record: &MatchupRecord, hp: [u32; 2]) -> usize {
    let by_answer = match record.first_answer {
        [Some(a), Some(b)] => a.cmp(&b).reverse(),
        [Some(_), None] => Ordering::Greater,
        [None, Some(_)] => Ordering::Less,
        [None, None] => Ordering::Equal,
    };
    let ordering = hp[0]
        .cmp(&hp[1])
        .then(record.wins[0].cmp(&record.wins[1]))
        .then(by_answer);

    match ordering {
        Ordering::Less => 1,
        _ => 0,
    }
}

impl AppState {
    /// Leave the lobby and open round 1
    pub async fn start_round1(&self, game_id: &str) -> GameResult<Vec<FollowUp>> {
        let mut store = self.store.write().await;
        require_status(store.game(game_id)?, GameStatus::Lobby)?;

        let players = store.players_in(game_id).len();
        if players < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers(MIN_PLAYERS));
        }

        tracing::info!(game_id, players, "Starting game");
        self.open_round_in(&mut store, game_id, 1)
    }

    /// VIP control from ROUND_RESULTS: close the finished round, then open the next
    pub async fn next_round(
        &self,
        game_id: &str,
        vip_id: &str,
        credential: &str,
    ) -> GameResult<Vec<FollowUp>> {
        let next = {
            let mut store = self.store.write().await;
            require_vip(&store, game_id, vip_id, credential, "start the next round")?;

            let game = store.game(game_id)?;
            require_status(game, GameStatus::RoundResults)?;
            if game.current_round >= game.max_rounds {
                return Err(GameError::NoMoreRounds);
            }
            let next = game.current_round + 1;

            self.close_round_in(&mut store, game_id)?;
            next
        };

        self.open_round(game_id, next).await
    }

    /// Settle the bracket for the round that just ended
    pub async fn close_round(&self, game_id: &str) -> GameResult<()> {
        let mut store = self.store.write().await;
        require_status(store.game(game_id)?, GameStatus::RoundResults)?;
        self.close_round_in(&mut store, game_id)
    }

    /// Open `round` if the game is still waiting on it.
    /// A game that moved on in the meantime is left alone.
    pub async fn open_round(&self, game_id: &str, round: u32) -> GameResult<Vec<FollowUp>> {
        let mut store = self.store.write().await;

        let Some(game) = store.games.get(game_id) else {
            tracing::warn!(game_id, round, "Stale open_round: game is gone");
            return Ok(Vec::new());
        };
        if game.status != GameStatus::RoundResults || game.current_round + 1 != round {
            tracing::warn!(
                game_id,
                round,
                status = ?game.status,
                current_round = game.current_round,
                "Stale open_round"
            );
            return Ok(Vec::new());
        }

        self.open_round_in(&mut store, game_id, round)
    }

    pub(crate) fn close_round_in(&self, store: &mut Store, game_id: &str) -> GameResult<()> {
        let game = store.game(game_id)?;
        let closing = game.current_round;
        if game.last_closed_round >= closing {
            tracing::debug!(game_id, closing, "Round already closed");
            return Ok(());
        }

        if game.ruleset.rules().bracket_round == Some(closing + 1) {
            self.resolve_brackets_in(store, game_id, closing)?;
        }

        let game = store.game_mut(game_id)?;
        game.last_closed_round = closing;
        game.touch();
        tracing::info!(game_id, round = closing, "Round closed");
        Ok(())
    }

    /// Turn each finished matchup of `round` into a team: the weaker side
    /// becomes the corner man of the stronger.
    fn resolve_brackets_in(&self, store: &mut Store, game_id: &str, round: u32) -> GameResult<()> {
        for record in matchup_records(store, game_id, round) {
            let a = store.player(&record.pair[0])?;
            let b = store.player(&record.pair[1])?;
            if !a.is_active_fighter() || !b.is_active_fighter() {
                continue;
            }

            let survivor = bracket_survivor(&record, [a.hp, b.hp]);
            let captain_id = record.pair[survivor].clone();
            let corner_id = &record.pair[1 - survivor];

            let corner = store.player_mut(corner_id)?;
            corner.role = PlayerRole::CornerMan;
            corner.knocked_out = true;
            corner.team_id = Some(captain_id.clone());
            tracing::info!(
                game_id,
                captain = %captain_id,
                corner = %corner.name,
                "Bracket resolved into a team"
            );
        }
        Ok(())
    }

    pub(crate) fn open_round_in(
        &self,
        store: &mut Store,
        game_id: &str,
        round: u32,
    ) -> GameResult<Vec<FollowUp>> {
        let game = store.game(game_id)?;
        if game.last_closed_round + 1 < round {
            return Err(GameError::RoundNotClosed(round - 1));
        }
        let rules = game.ruleset.rules();
        let round_rules = rules.round(round);

        let purged = store.purge_prompts(game_id);
        let final_hp = rules.final_round_hp.filter(|_| rules.is_final_round(round));
        for player in store.players.values_mut().filter(|p| p.game_id == game_id) {
            player.win_streak = 0;
            if let Some(hp) = final_hp.filter(|_| player.is_active_fighter()) {
                player.hp = hp;
                player.max_hp = hp;
            }
        }

        let game = store.game_mut(game_id)?;
        game.current_round = round;
        game.current_prompt_id = None;
        game.round_status = None;
        game.touch();
        tracing::info!(game_id, round, name = round_rules.name, purged, "Opening round");

        let active = store.active_fighter_count(game_id);
        if active <= 1 {
            return self.finish_game_in(store, game_id);
        }
        if rules.is_penultimate_round(round)
            && rules.early_exit_survivors.is_some_and(|n| active <= n)
        {
            tracing::info!(game_id, round, active, "Too few fighters for this round, skipping it");
            return self.end_round_in(store, game_id);
        }

        let players = store.players_in(game_id);
        let plan = pairing::generate(&players, round, rules);
        if !plan.has_matchups() {
            tracing::info!(game_id, round, "No matchups this round, skipping to results");
            if rules.is_final_round(round) {
                return self.finish_game_in(store, game_id);
            }
            return self.end_round_in(store, game_id);
        }

        let slots = pairing::prompt_slots(&plan, round_rules.prompts_per_matchup);
        let mut used = store.game(game_id)?.used_prompt_indices.clone();
        let texts = self
            .prompt_pool
            .pick(&mut used, slots.len(), &mut rand::rng());

        for (slot, text) in slots.into_iter().zip(texts) {
            let prompt = Prompt {
                id: ulid::Ulid::new().to_string(),
                game_id: game_id.to_string(),
                round,
                order: slot.order,
                text,
                assigned_to: slot.assigned_to,
                prompt_type: round_rules.prompt_type,
                outcome: None,
            };
            store.prompts.insert(prompt.id.clone(), prompt);
        }

        let game = store.game_mut(game_id)?;
        game.used_prompt_indices = used;
        game.status = GameStatus::Prompts;
        game.touch();

        self.answer_for_bots_in(store, game_id)?;
        self.maybe_enter_voting_in(store, game_id)
    }
}
