//! Command dispatch
//!
//! Entry point for the host platform. Credentials are checked here, then the
//! matching engine operation runs and any follow-ups go to the scheduler.

use crate::auth::{require_player, require_vip};
use crate::error::{GameError, GameResult};
use crate::protocol::{ClientMessage, PlayerInfo, ServerMessage};
use crate::scheduler::{dispatch, Scheduler};
use crate::state::AppState;

/// Unwrap an engine result or return it as an error message
macro_rules! try_cmd {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => return error_response(&e),
        }
    };
}

fn error_response(e: &GameError) -> ServerMessage {
    if e.is_authorization() {
        tracing::warn!(code = e.code(), "Rejected command: {}", e);
    } else {
        tracing::debug!(code = e.code(), "Command failed: {}", e);
    }
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    }
}

async fn authorize_player(
    state: &AppState,
    game_id: &str,
    player_id: &str,
    credential: &str,
) -> GameResult<()> {
    let store = state.store.read().await;
    require_player(&store, game_id, player_id, credential).map(|_| ())
}

async fn authorize_vip(
    state: &AppState,
    game_id: &str,
    player_id: &str,
    credential: &str,
    action: &'static str,
) -> GameResult<()> {
    let store = state.store.read().await;
    require_vip(&store, game_id, player_id, credential, action).map(|_| ())
}

/// Full view of a game: players in standings order plus this round's prompts
pub async fn game_state(state: &AppState, game_id: &str) -> ServerMessage {
    let players = try_cmd!(state.standings(game_id).await);
    let store = state.store.read().await;
    let game = try_cmd!(store.game(game_id)).clone();
    let prompts = store
        .prompts_in_round(game_id, game.current_round)
        .into_iter()
        .cloned()
        .collect();

    ServerMessage::GameState {
        game,
        players: players.iter().map(PlayerInfo::from).collect(),
        prompts,
    }
}

/// Handle one client command and return the response
pub async fn handle_command(
    msg: ClientMessage,
    state: &AppState,
    scheduler: &dyn Scheduler,
) -> ServerMessage {
    match msg {
        ClientMessage::CreateGame { ruleset } => {
            let ruleset = ruleset.unwrap_or(state.config.default_ruleset);
            let game = state.create_game(ruleset).await;
            ServerMessage::GameCreated { game }
        }

        ClientMessage::JoinGame { room_code, name } => {
            let (player, credential) = try_cmd!(state.join_game(&room_code, &name).await);
            ServerMessage::Joined {
                player: PlayerInfo::from(&player),
                credential,
            }
        }

        // VIP commands
        ClientMessage::AddBot {
            game_id,
            player_id,
            credential,
        } => {
            let bot = try_cmd!(state.add_bot(&game_id, &player_id, &credential).await);
            ServerMessage::BotAdded {
                player: PlayerInfo::from(&bot),
            }
        }

        ClientMessage::StartGame {
            game_id,
            player_id,
            credential,
        } => {
            try_cmd!(
                authorize_vip(state, &game_id, &player_id, &credential, "start the game").await
            );
            let follow_ups = try_cmd!(state.start_round1(&game_id).await);
            dispatch(scheduler, follow_ups);
            game_state(state, &game_id).await
        }

        ClientMessage::NextBattle {
            game_id,
            player_id,
            credential,
        } => {
            let follow_ups = try_cmd!(state.next_battle(&game_id, &player_id, &credential).await);
            dispatch(scheduler, follow_ups);
            game_state(state, &game_id).await
        }

        ClientMessage::NextRound {
            game_id,
            player_id,
            credential,
        } => {
            let follow_ups = try_cmd!(state.next_round(&game_id, &player_id, &credential).await);
            dispatch(scheduler, follow_ups);
            game_state(state, &game_id).await
        }

        // Player commands
        ClientMessage::SubmitAnswer {
            game_id,
            player_id,
            credential,
            prompt_id,
            text,
            attack_type,
        } => {
            try_cmd!(authorize_player(state, &game_id, &player_id, &credential).await);
            let (submission_id, follow_ups) = try_cmd!(
                state
                    .submit_answer(&game_id, &player_id, &prompt_id, &text, attack_type)
                    .await
            );
            dispatch(scheduler, follow_ups);
            ServerMessage::AnswerAccepted { submission_id }
        }

        ClientMessage::SubmitVote {
            game_id,
            player_id,
            credential,
            prompt_id,
            submission_id,
        } => {
            try_cmd!(authorize_player(state, &game_id, &player_id, &credential).await);
            let vote = try_cmd!(
                state
                    .submit_vote(&game_id, &player_id, &prompt_id, &submission_id)
                    .await
            );
            ServerMessage::VoteAccepted { vote_id: vote.id }
        }

        ClientMessage::GetState { game_id } => game_state(state, &game_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Ruleset;
    use crate::scheduler::testing::RecordingScheduler;
    use crate::scheduler::FollowUp;
    use crate::types::*;

    async fn create(state: &AppState, scheduler: &RecordingScheduler) -> Game {
        match handle_command(
            ClientMessage::CreateGame { ruleset: None },
            state,
            scheduler,
        )
        .await
        {
            ServerMessage::GameCreated { game } => game,
            other => panic!("unexpected response: {:?}", other),
        }
    }

    async fn join(
        state: &AppState,
        scheduler: &RecordingScheduler,
        room_code: &str,
        name: &str,
    ) -> (PlayerInfo, String) {
        match handle_command(
            ClientMessage::JoinGame {
                room_code: room_code.to_string(),
                name: name.to_string(),
            },
            state,
            scheduler,
        )
        .await
        {
            ServerMessage::Joined { player, credential } => (player, credential),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_uses_default_ruleset() {
        let state = AppState::new();
        let scheduler = RecordingScheduler::default();
        let game = create(&state, &scheduler).await;
        assert_eq!(game.ruleset, Ruleset::Classic);
        assert_eq!(game.status, GameStatus::Lobby);
    }

    #[tokio::test]
    async fn test_start_game_requires_vip() {
        let state = AppState::new();
        let scheduler = RecordingScheduler::default();
        let game = create(&state, &scheduler).await;
        join(&state, &scheduler, &game.room_code, "Host").await;
        let (guest, guest_cred) = join(&state, &scheduler, &game.room_code, "Guest").await;

        let response = handle_command(
            ClientMessage::StartGame {
                game_id: game.id.clone(),
                player_id: guest.id,
                credential: guest_cred,
            },
            &state,
            &scheduler,
        )
        .await;

        match response {
            ServerMessage::Error { code, .. } => assert_eq!(code, "NOT_VIP"),
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(
            state.get_game(&game.id).await.unwrap().status,
            GameStatus::Lobby
        );
    }

    #[tokio::test]
    async fn test_submit_with_bad_credential() {
        let state = AppState::new();
        let scheduler = RecordingScheduler::default();
        let game = create(&state, &scheduler).await;
        let (host, _) = join(&state, &scheduler, &game.room_code, "Host").await;

        let response = handle_command(
            ClientMessage::SubmitAnswer {
                game_id: game.id,
                player_id: host.id,
                credential: "forged".to_string(),
                prompt_id: "p".to_string(),
                text: "hi".to_string(),
                attack_type: None,
            },
            &state,
            &scheduler,
        )
        .await;

        match response {
            ServerMessage::Error { code, .. } => assert_eq!(code, "UNAUTHORIZED"),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bot_votes_are_dispatched() {
        let state = AppState::new();
        let scheduler = RecordingScheduler::default();
        let game = create(&state, &scheduler).await;
        let (host, host_cred) = join(&state, &scheduler, &game.room_code, "Host").await;
        let (guest, guest_cred) = join(&state, &scheduler, &game.room_code, "Guest").await;
        for _ in 0..2 {
            let response = handle_command(
                ClientMessage::AddBot {
                    game_id: game.id.clone(),
                    player_id: host.id.clone(),
                    credential: host_cred.clone(),
                },
                &state,
                &scheduler,
            )
            .await;
            assert!(matches!(response, ServerMessage::BotAdded { .. }));
        }

        let response = handle_command(
            ClientMessage::StartGame {
                game_id: game.id.clone(),
                player_id: host.id.clone(),
                credential: host_cred.clone(),
            },
            &state,
            &scheduler,
        )
        .await;
        let prompts = match response {
            ServerMessage::GameState { game, prompts, .. } => {
                assert_eq!(game.status, GameStatus::Prompts);
                prompts
            }
            other => panic!("unexpected response: {:?}", other),
        };

        // Host and guest fight each other; bots already answered their own prompts
        for prompt in prompts.iter().filter(|p| p.is_matchup()) {
            for (id, cred) in [(&host.id, &host_cred), (&guest.id, &guest_cred)] {
                if !prompt.is_assigned(id) {
                    continue;
                }
                let response = handle_command(
                    ClientMessage::SubmitAnswer {
                        game_id: game.id.clone(),
                        player_id: id.clone(),
                        credential: cred.clone(),
                        prompt_id: prompt.id.clone(),
                        text: "zinger".to_string(),
                        attack_type: None,
                    },
                    &state,
                    &scheduler,
                )
                .await;
                assert!(matches!(response, ServerMessage::AnswerAccepted { .. }));
            }
        }

        let tasks = scheduler.take();
        assert!(matches!(
            tasks.as_slice(),
            [FollowUp::CastBotVotes { .. }]
        ));
        let game = state.get_game(&game.id).await.unwrap();
        assert_eq!(game.status, GameStatus::Voting);
    }

    #[tokio::test]
    async fn test_get_state_unknown_game() {
        let state = AppState::new();
        let scheduler = RecordingScheduler::default();
        let response = handle_command(
            ClientMessage::GetState {
                game_id: "missing".to_string(),
            },
            &state,
            &scheduler,
        )
        .await;
        match response {
            ServerMessage::Error { code, .. } => assert_eq!(code, "GAME_NOT_FOUND"),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
