use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use witbrawl::bot;
use witbrawl::commands::handle_command;
use witbrawl::config::EngineConfig;
use witbrawl::protocol::{ClientMessage, PlayerInfo, ServerMessage};
use witbrawl::scheduler::{spawn_idle_sweeper, TokioScheduler};
use witbrawl::state::AppState;
use witbrawl::types::*;

#[derive(Clone, Copy)]
enum VipAction {
    Start,
    NextBattle,
    NextRound,
}

const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Polls to wait on outstanding bot votes before the VIP forces the reveal
const MAX_VOTE_WAIT_POLLS: u32 = 20;

fn log_standings(players: &[PlayerInfo]) {
    for (rank, p) in players.iter().enumerate() {
        tracing::info!(
            rank = rank + 1,
            name = %p.name,
            hp = p.hp,
            role = ?p.role,
            knocked_out = p.knocked_out,
            "Standing"
        );
    }
}

fn log_battle(prompt: &Prompt, players: &[PlayerInfo]) {
    let Some(outcome) = &prompt.outcome else {
        return;
    };
    let name = |id: &Option<PlayerId>| {
        id.as_ref()
            .and_then(|id| players.iter().find(|p| &p.id == id))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "-".to_string())
    };
    tracing::info!(
        prompt = %prompt.text,
        kind = ?outcome.kind,
        winner = %name(&outcome.winner_id),
        loser = %name(&outcome.loser_id),
        votes = ?outcome.votes,
        damage = ?outcome.damage,
        knocked_out = outcome.knocked_out.len(),
        "Battle resolved"
    );
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "witbrawl=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting witbrawl exhibition...");

    let state = Arc::new(AppState::with_config(EngineConfig::from_env()));
    let scheduler = TokioScheduler::new(state.clone());
    spawn_idle_sweeper(state.clone());

    let game = state.create_game(state.config.default_ruleset).await;
    tracing::info!(room_code = %game.room_code, ruleset = ?game.ruleset, "Exhibition game created");

    // The first bot holds the VIP seat and drives the game
    let (vip, credential) = match state
        .add_player(&game.id, &bot::bot_name(&[]), true)
        .await
    {
        Ok(seated) => seated,
        Err(e) => {
            tracing::error!("Failed to seat the VIP bot: {}", e);
            return;
        }
    };
    for _ in 1..state.config.exhibition_bots {
        if let Err(e) = state.add_bot(&game.id, &vip.id, &credential).await {
            tracing::error!("Failed to add bot: {}", e);
            return;
        }
    }

    let vip_command = |action: VipAction| {
        let (game_id, player_id, credential) =
            (game.id.clone(), vip.id.clone(), credential.clone());
        match action {
            VipAction::Start => ClientMessage::StartGame {
                game_id,
                player_id,
                credential,
            },
            VipAction::NextBattle => ClientMessage::NextBattle {
                game_id,
                player_id,
                credential,
            },
            VipAction::NextRound => ClientMessage::NextRound {
                game_id,
                player_id,
                credential,
            },
        }
    };

    let mut vote_wait = 0;
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;

        let get_state = ClientMessage::GetState {
            game_id: game.id.clone(),
        };
        let (current, players) = match handle_command(get_state, &state, &scheduler).await {
            ServerMessage::GameState { game, players, .. } => (game, players),
            other => {
                tracing::error!(?other, "Lost the exhibition game");
                return;
            }
        };

        let command = match (current.status, current.round_status) {
            (GameStatus::Lobby, _) => vip_command(VipAction::Start),
            (GameStatus::Prompts, _) => continue,
            (GameStatus::Voting, Some(RoundStatus::Voting)) if vote_wait < MAX_VOTE_WAIT_POLLS => {
                vote_wait += 1;
                continue;
            }
            (GameStatus::Voting, _) => {
                vote_wait = 0;
                vip_command(VipAction::NextBattle)
            }
            (GameStatus::RoundResults, _) => {
                tracing::info!(round = current.current_round, "Round over");
                log_standings(&players);
                vip_command(VipAction::NextRound)
            }
            (GameStatus::Results, _) => {
                let winner = current
                    .winner_id
                    .as_ref()
                    .and_then(|id| players.iter().find(|p| &p.id == id))
                    .map(|p| p.name.as_str())
                    .unwrap_or("nobody");
                tracing::info!(%winner, "Exhibition finished");
                log_standings(&players);
                return;
            }
        };

        let resolving = current.current_prompt_id.clone();
        match handle_command(command, &state, &scheduler).await {
            ServerMessage::Error { code, msg } => {
                tracing::warn!(%code, "VIP command rejected: {}", msg);
            }
            ServerMessage::GameState { players, .. } => {
                let Some(prompt_id) = resolving else {
                    continue;
                };
                let store = state.store.read().await;
                if let Ok(prompt) = store.prompt(&prompt_id) {
                    log_battle(prompt, &players);
                }
            }
            _ => {}
        }
    }
}
