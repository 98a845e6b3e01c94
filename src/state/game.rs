use super::{AppState, Store};
use crate::auth::{generate_credential, hash_credential, require_vip};
use crate::bot;
use crate::error::{GameError, GameResult};
use crate::rules::{Ruleset, MAX_NAME_CHARS};
use crate::scheduler::FollowUp;
use crate::types::*;
use chrono::Utc;
use rand::Rng;
use std::cmp::Ordering;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

/// Generate a random room code (5 characters)
fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// A room code no other live game holds
pub(crate) fn unique_room_code(store: &Store) -> String {
    // Collisions are rare with 28M combinations, but room codes must be unique
    loop {
        let code = generate_room_code();
        if store.game_by_room_code(&code).is_none() {
            return code;
        }
    }
}

pub(crate) fn require_status(game: &Game, expected: GameStatus) -> GameResult<()> {
    if game.status != expected {
        return Err(GameError::InvalidPhase {
            expected,
            actual: game.status,
        });
    }
    Ok(())
}

fn validate_name(name: &str) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidName("name is empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(GameError::InvalidName(format!(
            "name exceeds {} characters",
            MAX_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

/// Active fighters first, then HP descending, then join order
fn standings_order(a: &Player, b: &Player) -> Ordering {
    b.is_active_fighter()
        .cmp(&a.is_active_fighter())
        .then_with(|| b.hp.cmp(&a.hp))
        .then_with(|| a.seat.cmp(&b.seat))
}

/// The sole survivor, or the healthiest survivor when the game ends on points
fn pick_winner(players: &[Player]) -> Option<&Player> {
    players
        .iter()
        .filter(|p| p.is_active_fighter())
        .max_by(|a, b| {
            a.hp.cmp(&b.hp)
                .then_with(|| a.special_bar.total_cmp(&b.special_bar))
                .then_with(|| b.seat.cmp(&a.seat))
        })
}

impl AppState {
    /// Initialize a new game in the lobby
    pub async fn create_game(&self, ruleset: Ruleset) -> Game {
        let mut store = self.store.write().await;

        let room_code = unique_room_code(&store);

        let now = Utc::now();
        let game = Game {
            id: ulid::Ulid::new().to_string(),
            room_code,
            version: 1,
            ruleset,
            status: GameStatus::Lobby,
            current_round: 1,
            max_rounds: ruleset.rules().max_rounds,
            current_prompt_id: None,
            round_status: None,
            used_prompt_indices: Vec::new(),
            last_closed_round: 0,
            winner_id: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        };

        tracing::info!(
            game_id = %game.id,
            room_code = %game.room_code,
            ?ruleset,
            "Game created"
        );
        store.games.insert(game.id.clone(), game.clone());
        game
    }

    pub async fn get_game(&self, game_id: &str) -> Option<Game> {
        self.store.read().await.games.get(game_id).cloned()
    }

    pub async fn get_players(&self, game_id: &str) -> Vec<Player> {
        self.store.read().await.players_in(game_id)
    }

    /// Join a lobby by room code. Returns the player and their session credential.
    pub async fn join_game(&self, room_code: &str, name: &str) -> GameResult<(Player, String)> {
        let mut store = self.store.write().await;
        let game_id = store
            .game_by_room_code(room_code)
            .map(|g| g.id.clone())
            .ok_or(GameError::GameNotFound)?;

        let credential = generate_credential();
        let player =
            self.add_player_in(&mut store, &game_id, name, hash_credential(&credential), false)?;
        Ok((player, credential))
    }

    /// Seat a player directly by game id, bypassing the room code.
    /// Used by hosts that drive the engine without a lobby screen.
    pub async fn add_player(
        &self,
        game_id: &str,
        name: &str,
        is_bot: bool,
    ) -> GameResult<(Player, String)> {
        let mut store = self.store.write().await;
        let credential = generate_credential();
        let player =
            self.add_player_in(&mut store, game_id, name, hash_credential(&credential), is_bot)?;
        Ok((player, credential))
    }

    /// Add a bot with a generated name (VIP only)
    pub async fn add_bot(
        &self,
        game_id: &str,
        vip_id: &str,
        credential: &str,
    ) -> GameResult<Player> {
        let mut store = self.store.write().await;
        require_vip(&store, game_id, vip_id, credential, "add bots")?;

        let taken: Vec<String> = store
            .players_in(game_id)
            .iter()
            .map(|p| p.name.to_lowercase())
            .collect();
        let name = bot::bot_name(&taken);
        self.add_player_in(&mut store, game_id, &name, String::new(), true)
    }

    fn add_player_in(
        &self,
        store: &mut Store,
        game_id: &str,
        name: &str,
        credential_hash: String,
        is_bot: bool,
    ) -> GameResult<Player> {
        require_status(store.game(game_id)?, GameStatus::Lobby)?;
        let name = validate_name(name)?;

        let existing = store.players_in(game_id);
        let lowered = name.to_lowercase();
        if existing.iter().any(|p| p.name.to_lowercase() == lowered) {
            return Err(GameError::NameTaken);
        }

        let mut player = Player::new(
            game_id,
            existing.len() as u32,
            name,
            credential_hash,
            is_bot,
        );
        // First joiner hosts the game
        player.is_vip = existing.is_empty();

        tracing::info!(
            game_id,
            player_id = %player.id,
            name = %player.name,
            is_bot,
            is_vip = player.is_vip,
            "Player joined"
        );
        store.players.insert(player.id.clone(), player.clone());
        store.game_mut(game_id)?.touch();
        Ok(player)
    }

    /// Players ordered for a leaderboard
    pub async fn standings(&self, game_id: &str) -> GameResult<Vec<Player>> {
        let store = self.store.read().await;
        store.game(game_id)?;
        let mut players = store.players_in(game_id);
        players.sort_by(standings_order);
        Ok(players)
    }

    /// Move a game to RESULTS and schedule its cleanup
    pub(crate) fn finish_game_in(
        &self,
        store: &mut Store,
        game_id: &str,
    ) -> GameResult<Vec<FollowUp>> {
        self.finish_game_with_in(store, game_id, None)
    }

    /// Like `finish_game_in`, but a battle that decided the game names its
    /// own winner instead of the standings picking one
    pub(crate) fn finish_game_with_in(
        &self,
        store: &mut Store,
        game_id: &str,
        decided_by: Option<PlayerId>,
    ) -> GameResult<Vec<FollowUp>> {
        let players = store.players_in(game_id);
        let winner = match &decided_by {
            Some(id) => players.iter().find(|p| &p.id == id),
            None => pick_winner(&players),
        };
        let winner_id = winner.map(|p| p.id.clone());

        match winner {
            Some(w) => tracing::info!(game_id, winner = %w.name, hp = w.hp, "Game over"),
            None => tracing::warn!(game_id, "Game over without a surviving fighter"),
        }

        let game = store.game_mut(game_id)?;
        game.status = GameStatus::Results;
        game.current_prompt_id = None;
        game.round_status = None;
        game.winner_id = winner_id;
        game.finished_at = Some(Utc::now());
        game.touch();

        Ok(vec![FollowUp::CleanupGame {
            game_id: game_id.to_string(),
            delay_ms: self.config.idle_cleanup.as_millis() as u64,
        }])
    }

    /// Delete a game once it has been idle for the configured timeout.
    /// A game that saw activity since the cleanup was scheduled is re-armed
    /// for the remaining time.
    pub async fn cleanup_game(&self, game_id: &str) -> Vec<FollowUp> {
        let mut store = self.store.write().await;
        let Some(game) = store.games.get(game_id) else {
            tracing::debug!(game_id, "Cleanup target already gone");
            return Vec::new();
        };

        let idle = (Utc::now() - game.updated_at)
            .to_std()
            .unwrap_or_default();
        if idle >= self.config.idle_cleanup {
            store.delete_game(game_id);
            tracing::info!(game_id, "Deleted idle game");
            return Vec::new();
        }

        let remaining = self.config.idle_cleanup - idle;
        tracing::debug!(
            game_id,
            remaining_secs = remaining.as_secs(),
            "Game still active, re-arming cleanup"
        );
        vec![FollowUp::CleanupGame {
            game_id: game_id.to_string(),
            delay_ms: remaining.as_millis() as u64,
        }]
    }

    /// Delete every game idle beyond the configured timeout
    pub async fn sweep_idle_games(&self) -> usize {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let stale: Vec<GameId> = store
            .games
            .values()
            .filter(|g| {
                (now - g.updated_at).to_std().unwrap_or_default() >= self.config.idle_cleanup
            })
            .map(|g| g.id.clone())
            .collect();

        for game_id in &stale {
            store.delete_game(game_id);
        }
        if !stale.is_empty() {
            tracing::info!("Idle sweep removed {} games", stale.len());
        }
        stale.len()
    }
}
