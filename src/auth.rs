//! Session credentials and the VIP guard

use crate::error::{GameError, GameResult};
use crate::state::Store;
use crate::types::Player;
use sha2::{Digest, Sha256};

/// Fresh opaque session token handed to a joining player
pub fn generate_credential() -> String {
    ulid::Ulid::new().to_string()
}

/// Only this digest is ever stored
pub fn hash_credential(credential: &str) -> String {
    hex::encode(Sha256::digest(credential.as_bytes()))
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check a presented credential against a player's stored digest
pub fn verify_credential(player: &Player, credential: &str) -> bool {
    // Bots carry no credential and can only act through the engine itself
    if player.credential_hash.is_empty() {
        return false;
    }
    let presented = hash_credential(credential);
    constant_time_eq(player.credential_hash.as_bytes(), presented.as_bytes())
}

/// Resolve a player of `game_id` whose credential matches
pub fn require_player<'a>(
    store: &'a Store,
    game_id: &str,
    player_id: &str,
    credential: &str,
) -> GameResult<&'a Player> {
    let player = store
        .players
        .get(player_id)
        .filter(|p| p.game_id == game_id)
        .ok_or(GameError::Unauthorized)?;

    if !verify_credential(player, credential) {
        tracing::warn!(player_id, "Rejected credential");
        return Err(GameError::Unauthorized);
    }
    Ok(player)
}

/// Like `require_player`, but the player must also be the VIP
pub fn require_vip<'a>(
    store: &'a Store,
    game_id: &str,
    player_id: &str,
    credential: &str,
    action: &'static str,
) -> GameResult<&'a Player> {
    let player = require_player(store, game_id, player_id, credential)?;
    if !player.is_vip {
        tracing::warn!(player_id, action, "Non-VIP attempted privileged action");
        return Err(GameError::NotVip(action));
    }
    Ok(player)
}
