//! Battle resolution and the in-round progression that follows it.

use super::game::require_status;
use super::vote::eligible_voters;
use super::{AppState, Store};
use crate::auth::require_vip;
use crate::damage::{self, Combatant, Side};
use crate::error::GameResult;
use crate::pairing::has_corner_man;
use crate::scheduler::FollowUp;
use crate::types::*;
use chrono::Utc;

fn combatant(store: &Store, prompt_id: &str, player_id: &str) -> GameResult<Combatant> {
    let player = store.player(player_id)?;
    let submission = store.submission_by(prompt_id, player_id);
    Ok(Combatant {
        hp: player.hp,
        win_streak: player.win_streak,
        special_bar: player.special_bar,
        votes: submission.map(|s| store.vote_count(&s.id)).unwrap_or(0),
        submitted_at: submission.and_then(|s| s.submitted_at),
        attack_type: submission.and_then(|s| s.attack_type),
    })
}

/// Next prompt of the round still worth fighting: a matchup with no result
/// whose assignees are both still standing
fn next_votable_prompt(store: &Store, game_id: &str, round: u32) -> Option<PromptId> {
    store
        .prompts_in_round(game_id, round)
        .into_iter()
        .find(|p| {
            p.is_matchup()
                && p.outcome.is_none()
                && p.assigned_to.iter().all(|id| {
                    store
                        .players
                        .get(id)
                        .is_some_and(|pl| pl.is_active_fighter())
                })
        })
        .map(|p| p.id.clone())
}

impl AppState {
    /// VIP control during voting: the first call closes voting early, the
    /// second resolves the revealed battle.
    pub async fn next_battle(
        &self,
        game_id: &str,
        vip_id: &str,
        credential: &str,
    ) -> GameResult<Vec<FollowUp>> {
        let mut store = self.store.write().await;
        require_vip(&store, game_id, vip_id, credential, "advance the battle")?;

        let game = store.game(game_id)?;
        require_status(game, GameStatus::Voting)?;
        let Some(prompt_id) = game.current_prompt_id.clone() else {
            tracing::warn!(game_id, "Voting without a current prompt, advancing");
            return self.advance_in(&mut store, game_id);
        };

        if game.round_status == Some(RoundStatus::Voting) {
            tracing::info!(game_id, %prompt_id, "Voting closed early by VIP");
            let game = store.game_mut(game_id)?;
            game.round_status = Some(RoundStatus::Reveal);
            game.touch();
            return Ok(Vec::new());
        }

        self.resolve_battle_in(&mut store, game_id, &prompt_id)
    }

    /// Resolve `prompt_id` if it is still the battle being judged.
    /// Stale calls are logged and ignored.
    pub async fn resolve_battle(
        &self,
        game_id: &str,
        prompt_id: &str,
    ) -> GameResult<Vec<FollowUp>> {
        let mut store = self.store.write().await;

        let Some(game) = store.games.get(game_id) else {
            tracing::warn!(game_id, prompt_id, "Stale resolve: game is gone");
            return Ok(Vec::new());
        };
        if game.status != GameStatus::Voting || game.current_prompt_id.as_deref() != Some(prompt_id)
        {
            tracing::warn!(game_id, prompt_id, "Stale resolve: prompt is no longer current");
            return Ok(Vec::new());
        }

        self.resolve_battle_in(&mut store, game_id, prompt_id)
    }

    pub(crate) fn resolve_battle_in(
        &self,
        store: &mut Store,
        game_id: &str,
        prompt_id: &str,
    ) -> GameResult<Vec<FollowUp>> {
        let Some(prompt) = store.prompts.get(prompt_id).cloned() else {
            tracing::warn!(game_id, prompt_id, "Prompt vanished before resolution");
            return self.advance_in(store, game_id);
        };
        if prompt.outcome.is_some() {
            tracing::warn!(game_id, prompt_id, "Battle already resolved");
            return Ok(Vec::new());
        }
        let [left_id, right_id] = match prompt.assigned_to.as_slice() {
            [l, r] => [l.clone(), r.clone()],
            _ => {
                tracing::warn!(game_id, prompt_id, "Bye prompt reached resolution, skipping");
                return self.advance_in(store, game_id);
            }
        };

        let game = store.game(game_id)?;
        let round = game.current_round;
        let rules = game.ruleset.rules();
        let round_rules = rules.round(round);

        let left = combatant(store, prompt_id, &left_id)?;
        let right = combatant(store, prompt_id, &right_id)?;
        let result = damage::calculate(rules, round, &left, &right);

        let id_of = |side: Side| match side {
            Side::Left => left_id.clone(),
            Side::Right => right_id.clone(),
        };

        let mut knocked_out = Vec::new();
        for side in [Side::Left, Side::Right] {
            let after = result.side(side);
            let player = store.player_mut(&id_of(side))?;
            player.hp = after.hp;
            player.win_streak = after.win_streak;
            player.special_bar = after.special_bar;
            if after.knocked_out && !player.knocked_out {
                player.knocked_out = true;
                knocked_out.push(player.id.clone());
            }
        }

        // Early rounds recruit the knocked-out loser into the winner's corner
        if let (Some(winner), Some(loser)) = (result.winner, result.loser()) {
            if round_rules.forms_teams && result.side(loser).knocked_out {
                let winner_id = id_of(winner);
                let players = store.players_in(game_id);
                if has_corner_man(&players, &winner_id) {
                    tracing::warn!(
                        game_id,
                        %winner_id,
                        "Winner already has a corner man, assigning a second"
                    );
                }
                let loser = store.player_mut(&id_of(loser))?;
                loser.role = PlayerRole::CornerMan;
                loser.team_id = Some(winner_id);
            }
        }

        let outcome = BattleOutcome {
            kind: result.kind,
            winner_id: result.winner.map(id_of),
            loser_id: result.loser().map(id_of),
            votes: [left.votes, right.votes],
            damage: [result.left.damage_taken, result.right.damage_taken],
            knocked_out,
            resolved_at: Utc::now(),
        };
        tracing::info!(
            game_id,
            prompt_id,
            kind = ?outcome.kind,
            votes = ?outcome.votes,
            damage = ?outcome.damage,
            instant_ko = ?result.instant_ko,
            knocked_out = outcome.knocked_out.len(),
            "Battle resolved"
        );
        // Sudden death repeats only while it stays undecided
        let sudden_death_winner = outcome
            .winner_id
            .clone()
            .filter(|_| prompt.prompt_type == Some(PromptType::SuddenDeath));
        if let Some(p) = store.prompts.get_mut(prompt_id) {
            p.outcome = Some(outcome);
        }

        let game = store.game_mut(game_id)?;
        game.current_prompt_id = None;
        game.round_status = None;
        game.touch();

        if let Some(winner_id) = sudden_death_winner {
            tracing::info!(game_id, prompt_id, %winner_id, "Sudden death decided");
            return self.finish_game_with_in(store, game_id, Some(winner_id));
        }
        self.advance_in(store, game_id)
    }

    /// Decide what happens after a battle: the next matchup, sudden death,
    /// the end of the round, or the end of the game.
    pub(crate) fn advance_in(
        &self,
        store: &mut Store,
        game_id: &str,
    ) -> GameResult<Vec<FollowUp>> {
        let game = store.game(game_id)?;
        let round = game.current_round;
        let rules = game.ruleset.rules();
        let active = store.active_fighter_count(game_id);

        if active <= 1 {
            return self.finish_game_in(store, game_id);
        }

        if rules.is_penultimate_round(round)
            && rules.early_exit_survivors.is_some_and(|n| active <= n)
        {
            tracing::info!(
                game_id,
                round,
                active,
                "Survivor threshold reached, closing round early"
            );
            return self.end_round_in(store, game_id);
        }

        if let Some(prompt_id) = next_votable_prompt(store, game_id, round) {
            return self.open_voting_in(store, game_id, &prompt_id);
        }

        if rules.is_final_round(round) {
            if active == 2 {
                return self.start_sudden_death_in(store, game_id);
            }
            return self.finish_game_in(store, game_id);
        }
        self.end_round_in(store, game_id)
    }

    pub(crate) fn end_round_in(
        &self,
        store: &mut Store,
        game_id: &str,
    ) -> GameResult<Vec<FollowUp>> {
        let game = store.game_mut(game_id)?;
        game.status = GameStatus::RoundResults;
        game.current_prompt_id = None;
        game.round_status = None;
        game.touch();
        tracing::info!(game_id, round = game.current_round, "Round complete");
        Ok(Vec::new())
    }

    fn open_voting_in(
        &self,
        store: &mut Store,
        game_id: &str,
        prompt_id: &str,
    ) -> GameResult<Vec<FollowUp>> {
        let prompt = store.prompt(prompt_id)?;
        let voters = eligible_voters(store, game_id, &prompt.assigned_to);
        let bot_voters = voters.iter().filter(|p| p.is_bot).count();

        let game = store.game_mut(game_id)?;
        game.status = GameStatus::Voting;
        game.current_prompt_id = Some(prompt_id.to_string());
        game.round_status = Some(if voters.is_empty() {
            RoundStatus::Reveal
        } else {
            RoundStatus::Voting
        });
        game.touch();

        tracing::info!(game_id, prompt_id, voters = voters.len(), "Battle open for voting");
        if voters.is_empty() {
            tracing::warn!(game_id, prompt_id, "Nobody can vote on this battle, revealing");
            return Ok(Vec::new());
        }

        if bot_voters == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![FollowUp::CastBotVotes {
            game_id: game_id.to_string(),
            prompt_id: prompt_id.to_string(),
            delay_ms: self.config.bot_delay_ms(),
        }])
    }

    /// Pit the last two fighters against each other on a fresh prompt
    fn start_sudden_death_in(
        &self,
        store: &mut Store,
        game_id: &str,
    ) -> GameResult<Vec<FollowUp>> {
        let fighters: Vec<PlayerId> = store
            .players_in(game_id)
            .into_iter()
            .filter(|p| p.is_active_fighter())
            .map(|p| p.id)
            .collect();

        if eligible_voters(store, game_id, &fighters).is_empty() {
            tracing::info!(game_id, "Nobody can judge a sudden death, ending on points");
            return self.finish_game_in(store, game_id);
        }

        let game = store.game(game_id)?;
        let round = game.current_round;
        let order = store.prompts_in_round(game_id, round).len() as u32;
        let mut used = game.used_prompt_indices.clone();
        let text = self
            .prompt_pool
            .pick(&mut used, 1, &mut rand::rng())
            .into_iter()
            .next()
            .unwrap_or_default();

        let prompt = Prompt {
            id: ulid::Ulid::new().to_string(),
            game_id: game_id.to_string(),
            round,
            order,
            text,
            assigned_to: fighters,
            prompt_type: Some(PromptType::SuddenDeath),
            outcome: None,
        };
        tracing::info!(game_id, prompt_id = %prompt.id, "Sudden death");
        store.prompts.insert(prompt.id.clone(), prompt);

        let game = store.game_mut(game_id)?;
        game.used_prompt_indices = used;
        game.status = GameStatus::Prompts;
        game.current_prompt_id = None;
        game.round_status = None;
        game.touch();

        self.answer_for_bots_in(store, game_id)?;
        self.maybe_enter_voting_in(store, game_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use crate::rules::Ruleset;
    use crate::state::test_support::*;

    async fn current_prompt(state: &AppState, game_id: &str) -> Prompt {
        let store = state.store.read().await;
        let id = store.game(game_id).unwrap().current_prompt_id.clone().unwrap();
        store.prompt(&id).unwrap().clone()
    }

    /// Every eligible voter backs the left combatant
    async fn sweep_left(fx: &Fixture) -> Prompt {
        let prompt = current_prompt(&fx.state, &fx.game_id).await;
        let (voters, choice) = {
            let store = fx.state.store.read().await;
            let voters: Vec<PlayerId> = eligible_voters(&store, &fx.game_id, &prompt.assigned_to)
                .into_iter()
                .map(|p| p.id)
                .collect();
            let choice = store
                .submission_by(&prompt.id, &prompt.assigned_to[0])
                .unwrap()
                .id
                .clone();
            (voters, choice)
        };
        for voter in voters {
            fx.state
                .submit_vote(&fx.game_id, &voter, &prompt.id, &choice)
                .await
                .unwrap();
        }
        prompt
    }

    #[tokio::test]
    async fn test_resolve_applies_damage_and_records_outcome() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        fx.state.start_round1(&fx.game_id).await.unwrap();
        answer_all(&fx.state, &fx.game_id).await;

        let prompt = sweep_left(&fx).await;
        fx.state
            .next_battle(&fx.game_id, &fx.vip.id, &fx.vip_credential)
            .await
            .unwrap();

        let store = fx.state.store.read().await;
        let outcome = store.prompt(&prompt.id).unwrap().outcome.clone().unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Decisive);
        assert_eq!(outcome.winner_id.as_deref(), Some(prompt.assigned_to[0].as_str()));
        assert_eq!(outcome.votes, [2, 0]);
        assert_eq!(outcome.damage, [0, 35]);

        let loser = store.player(&prompt.assigned_to[1]).unwrap();
        assert_eq!(loser.hp, 65);
        let winner = store.player(&prompt.assigned_to[0]).unwrap();
        assert_eq!(winner.win_streak, 1);

        // Moved on to the next battle
        let game = store.game(&fx.game_id).unwrap();
        assert_eq!(game.status, GameStatus::Voting);
        assert_ne!(game.current_prompt_id.as_deref(), Some(prompt.id.as_str()));
    }

    #[tokio::test]
    async fn test_stale_resolve_is_noop() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        fx.state.start_round1(&fx.game_id).await.unwrap();
        answer_all(&fx.state, &fx.game_id).await;
        let prompt = current_prompt(&fx.state, &fx.game_id).await;

        assert!(fx
            .state
            .resolve_battle(&fx.game_id, "not-current")
            .await
            .unwrap()
            .is_empty());
        assert!(fx
            .state
            .resolve_battle("no-such-game", &prompt.id)
            .await
            .unwrap()
            .is_empty());

        fx.state
            .resolve_battle(&fx.game_id, &prompt.id)
            .await
            .unwrap();
        // Second resolution of the same prompt changes nothing
        let before = fx.state.get_players(&fx.game_id).await;
        fx.state
            .resolve_battle(&fx.game_id, &prompt.id)
            .await
            .unwrap();
        let after = fx.state.get_players(&fx.game_id).await;
        let hp = |ps: &[Player]| ps.iter().map(|p| p.hp).collect::<Vec<_>>();
        assert_eq!(hp(&before), hp(&after));
    }

    #[tokio::test]
    async fn test_next_battle_requires_vip() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        fx.state.start_round1(&fx.game_id).await.unwrap();
        answer_all(&fx.state, &fx.game_id).await;

        let (guest, guest_cred) = &fx.others[0];
        let err = fx
            .state
            .next_battle(&fx.game_id, &guest.id, guest_cred)
            .await
            .unwrap_err();
        assert_eq!(err, GameError::NotVip("advance the battle"));

        let err = fx
            .state
            .next_battle(&fx.game_id, &fx.vip.id, "forged")
            .await
            .unwrap_err();
        assert_eq!(err, GameError::Unauthorized);
    }

    #[tokio::test]
    async fn test_no_votes_leaves_hp_untouched() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        fx.state.start_round1(&fx.game_id).await.unwrap();
        answer_all(&fx.state, &fx.game_id).await;
        let prompt = current_prompt(&fx.state, &fx.game_id).await;

        for _ in 0..2 {
            fx.state
                .next_battle(&fx.game_id, &fx.vip.id, &fx.vip_credential)
                .await
                .unwrap();
        }

        let store = fx.state.store.read().await;
        let outcome = store.prompt(&prompt.id).unwrap().outcome.clone().unwrap();
        assert_eq!(outcome.kind, OutcomeKind::NoVotes);
        assert!(store.players_in(&fx.game_id).iter().all(|p| p.hp == 100));
    }

    #[tokio::test]
    async fn test_knockout_forms_team_in_opening_round() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        fx.state.start_round1(&fx.game_id).await.unwrap();
        answer_all(&fx.state, &fx.game_id).await;

        let loser_id = current_prompt(&fx.state, &fx.game_id).await.assigned_to[1].clone();
        fx.state
            .store
            .write()
            .await
            .player_mut(&loser_id)
            .unwrap()
            .hp = 10;

        let prompt = sweep_left(&fx).await;
        fx.state
            .next_battle(&fx.game_id, &fx.vip.id, &fx.vip_credential)
            .await
            .unwrap();

        let store = fx.state.store.read().await;
        let loser = store.player(&loser_id).unwrap();
        assert!(loser.knocked_out);
        assert_eq!(loser.role, PlayerRole::CornerMan);
        assert_eq!(loser.team_id.as_deref(), Some(prompt.assigned_to[0].as_str()));
        let outcome = store.prompt(&prompt.id).unwrap().outcome.clone().unwrap();
        assert_eq!(outcome.knocked_out, vec![loser_id.clone()]);
    }

    #[tokio::test]
    async fn test_dead_matchups_are_skipped() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        fx.state.start_round1(&fx.game_id).await.unwrap();
        answer_all(&fx.state, &fx.game_id).await;

        let first = current_prompt(&fx.state, &fx.game_id).await;
        fx.state
            .store
            .write()
            .await
            .player_mut(&first.assigned_to[1])
            .unwrap()
            .hp = 10;
        sweep_left(&fx).await;
        fx.state
            .next_battle(&fx.game_id, &fx.vip.id, &fx.vip_credential)
            .await
            .unwrap();

        // The remaining battles of that pair are skipped, so the round only
        // visits prompts of the other matchup from here on
        for _ in 0..3 {
            let game = fx.state.get_game(&fx.game_id).await.unwrap();
            if game.status != GameStatus::Voting {
                break;
            }
            let prompt = current_prompt(&fx.state, &fx.game_id).await;
            assert!(!prompt.is_assigned(&first.assigned_to[1]));
            for _ in 0..2 {
                fx.state
                    .next_battle(&fx.game_id, &fx.vip.id, &fx.vip_credential)
                    .await
                    .unwrap();
            }
        }

        let game = fx.state.get_game(&fx.game_id).await.unwrap();
        assert_eq!(game.status, GameStatus::RoundResults);
    }

    fn sudden_deaths(store: &Store, game_id: &str) -> Vec<Prompt> {
        let round = store.game(game_id).unwrap().current_round;
        store
            .prompts_in_round(game_id, round)
            .into_iter()
            .filter(|p| p.prompt_type == Some(PromptType::SuddenDeath))
            .cloned()
            .collect()
    }

    /// Knock `corner` out into the corner of `captain`
    fn make_corner_man(store: &mut Store, corner: &str, captain: &str) {
        let p = store.player_mut(corner).unwrap();
        p.role = PlayerRole::CornerMan;
        p.knocked_out = true;
        p.team_id = Some(captain.to_string());
    }

    /// Final classic round with the VIP and the first human still fighting
    /// and the other two already in a corner. Runs the progression that
    /// follows a finished round.
    async fn final_duel(fx: &Fixture, backing: [&str; 2]) -> Vec<FollowUp> {
        let mut store = fx.state.store.write().await;
        store.purge_prompts(&fx.game_id);
        make_corner_man(&mut store, &fx.others[1].0.id, backing[0]);
        make_corner_man(&mut store, &fx.others[2].0.id, backing[1]);

        let game = store.game_mut(&fx.game_id).unwrap();
        game.status = GameStatus::Voting;
        game.current_round = 3;
        game.current_prompt_id = None;
        game.round_status = None;

        fx.state.advance_in(&mut store, &fx.game_id).unwrap()
    }

    /// Cast one vote per voter, each backing the given side of the current prompt
    async fn vote_sides(fx: &Fixture, votes: &[(&str, usize)]) -> Prompt {
        let prompt = current_prompt(&fx.state, &fx.game_id).await;
        for (voter, side) in votes {
            let choice = {
                let store = fx.state.store.read().await;
                store
                    .submission_by(&prompt.id, &prompt.assigned_to[*side])
                    .unwrap()
                    .id
                    .clone()
            };
            fx.state
                .submit_vote(&fx.game_id, voter, &prompt.id, &choice)
                .await
                .unwrap();
        }
        prompt
    }

    #[tokio::test]
    async fn test_sudden_death_decisive_win_ends_game() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        // The corner men back each other, so both may judge the duel
        let (c, d) = (fx.others[1].0.id.clone(), fx.others[2].0.id.clone());
        final_duel(&fx, [d.as_str(), c.as_str()]).await;

        let duel = {
            let store = fx.state.store.read().await;
            let duels = sudden_deaths(&store, &fx.game_id);
            assert_eq!(duels.len(), 1);
            assert_eq!(store.game(&fx.game_id).unwrap().status, GameStatus::Prompts);
            duels[0].clone()
        };
        assert!(duel.is_assigned(&fx.vip.id));
        assert!(duel.is_assigned(&fx.others[0].0.id));

        // The left fighter trails on HP, so only the duel can crown them
        fx.state
            .store
            .write()
            .await
            .player_mut(&duel.assigned_to[0])
            .unwrap()
            .hp = 30;

        answer_all(&fx.state, &fx.game_id).await;
        vote_sides(&fx, &[(c.as_str(), 0), (d.as_str(), 0)]).await;
        let follow_ups = fx
            .state
            .next_battle(&fx.game_id, &fx.vip.id, &fx.vip_credential)
            .await
            .unwrap();
        assert!(matches!(
            follow_ups.as_slice(),
            [FollowUp::CleanupGame { .. }]
        ));

        let store = fx.state.store.read().await;
        let outcome = store.prompt(&duel.id).unwrap().outcome.clone().unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Decisive);
        assert!(outcome.knocked_out.is_empty());
        assert_eq!(store.player(&duel.assigned_to[1]).unwrap().hp, 48);

        let game = store.game(&fx.game_id).unwrap();
        assert_eq!(game.status, GameStatus::Results);
        assert_eq!(game.winner_id.as_deref(), Some(duel.assigned_to[0].as_str()));
        assert_eq!(sudden_deaths(&store, &fx.game_id).len(), 1);
    }

    #[tokio::test]
    async fn test_sudden_death_tie_deals_another_duel() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        let (c, d) = (fx.others[1].0.id.clone(), fx.others[2].0.id.clone());
        final_duel(&fx, [d.as_str(), c.as_str()]).await;

        answer_all(&fx.state, &fx.game_id).await;
        let duel = vote_sides(&fx, &[(c.as_str(), 0), (d.as_str(), 1)]).await;
        fx.state
            .next_battle(&fx.game_id, &fx.vip.id, &fx.vip_credential)
            .await
            .unwrap();

        let store = fx.state.store.read().await;
        let outcome = store.prompt(&duel.id).unwrap().outcome.clone().unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Tie);
        assert_eq!(outcome.damage, [26, 26]);

        let game = store.game(&fx.game_id).unwrap();
        assert_eq!(game.status, GameStatus::Prompts);
        assert!(game.winner_id.is_none());
        let duels = sudden_deaths(&store, &fx.game_id);
        assert_eq!(duels.len(), 2);
        assert!(duels.iter().any(|p| p.outcome.is_none()));
    }

    #[tokio::test]
    async fn test_sudden_death_without_judges_ends_on_points() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        let (a, b) = (fx.vip.id.clone(), fx.others[0].0.id.clone());
        {
            let mut store = fx.state.store.write().await;
            store.player_mut(&a).unwrap().hp = 40;
            store.player_mut(&b).unwrap().hp = 90;
        }
        // Each corner backs a finalist, so nobody is left to vote
        let follow_ups = final_duel(&fx, [a.as_str(), b.as_str()]).await;
        assert!(matches!(
            follow_ups.as_slice(),
            [FollowUp::CleanupGame { .. }]
        ));

        let store = fx.state.store.read().await;
        assert!(sudden_deaths(&store, &fx.game_id).is_empty());
        let game = store.game(&fx.game_id).unwrap();
        assert_eq!(game.status, GameStatus::Results);
        assert_eq!(game.winner_id.as_deref(), Some(b.as_str()));
    }

    #[tokio::test]
    async fn test_penultimate_round_closes_early_at_two_survivors() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        {
            let mut store = fx.state.store.write().await;
            store.game_mut(&fx.game_id).unwrap().status = GameStatus::RoundResults;
        }
        fx.state.close_round(&fx.game_id).await.unwrap();
        fx.state.open_round(&fx.game_id, 2).await.unwrap();
        answer_all(&fx.state, &fx.game_id).await;

        // Everyone outside the first battle drops out mid-round
        let prompt = current_prompt(&fx.state, &fx.game_id).await;
        {
            let mut store = fx.state.store.write().await;
            for id in fx.all_ids() {
                if !prompt.is_assigned(&id) {
                    make_corner_man(&mut store, &id, &prompt.assigned_to[0]);
                }
            }
        }
        for _ in 0..2 {
            fx.state
                .next_battle(&fx.game_id, &fx.vip.id, &fx.vip_credential)
                .await
                .unwrap();
        }

        let store = fx.state.store.read().await;
        let game = store.game(&fx.game_id).unwrap();
        assert_eq!(game.current_round, 2);
        assert_eq!(game.status, GameStatus::RoundResults);

        // The pair's second battle was still fightable but never opened
        let rematch = store
            .prompts_in_round(&fx.game_id, 2)
            .into_iter()
            .find(|p| p.id != prompt.id && p.assigned_to == prompt.assigned_to)
            .unwrap();
        assert!(rematch.outcome.is_none());
    }

    #[tokio::test]
    async fn test_captain_takes_second_corner_man() {
        let fx = fixture(Ruleset::Classic, 3, 0).await;
        fx.state.start_round1(&fx.game_id).await.unwrap();
        answer_all(&fx.state, &fx.game_id).await;

        let prompt = current_prompt(&fx.state, &fx.game_id).await;
        let captain = prompt.assigned_to[0].clone();
        let loser = prompt.assigned_to[1].clone();
        let outsiders: Vec<PlayerId> = fx
            .all_ids()
            .into_iter()
            .filter(|id| !prompt.is_assigned(id))
            .collect();
        let (first_corner, judge) = (outsiders[0].clone(), outsiders[1].clone());
        {
            let mut store = fx.state.store.write().await;
            make_corner_man(&mut store, &first_corner, &captain);
            store.player_mut(&loser).unwrap().hp = 10;
        }

        vote_sides(&fx, &[(judge.as_str(), 0)]).await;
        fx.state
            .next_battle(&fx.game_id, &fx.vip.id, &fx.vip_credential)
            .await
            .unwrap();

        let store = fx.state.store.read().await;
        let corners: Vec<&Player> = store
            .players
            .values()
            .filter(|p| p.game_id == fx.game_id && p.team_id.as_deref() == Some(captain.as_str()))
            .collect();
        assert_eq!(corners.len(), 2);
        assert!(corners.iter().all(|p| p.role == PlayerRole::CornerMan));
        assert!(corners.iter().any(|p| p.id == loser));
        assert!(store.player(&captain).unwrap().is_active_fighter());
    }
}
