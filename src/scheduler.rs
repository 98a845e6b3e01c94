//! Deferred work.
//!
//! Engine operations never schedule anything themselves; they return
//! `FollowUp` intents and the caller hands them to a `Scheduler`.

use crate::state::AppState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FollowUp {
    CastBotVotes {
        game_id: String,
        prompt_id: String,
        delay_ms: u64,
    },
    CleanupGame {
        game_id: String,
        delay_ms: u64,
    },
}

impl FollowUp {
    pub fn delay(&self) -> Duration {
        match self {
            FollowUp::CastBotVotes { delay_ms, .. } | FollowUp::CleanupGame { delay_ms, .. } => {
                Duration::from_millis(*delay_ms)
            }
        }
    }
}

/// Fire-and-forget deferred invocation. No ordering is guaranteed relative
/// to other calls into the engine.
pub trait Scheduler: Send + Sync {
    fn run_after(&self, delay: Duration, task: FollowUp);
}

pub fn dispatch(scheduler: &dyn Scheduler, follow_ups: Vec<FollowUp>) {
    for task in follow_ups {
        scheduler.run_after(task.delay(), task);
    }
}

/// Run one follow-up against the engine, returning whatever it yields next
pub async fn execute(state: &AppState, task: FollowUp) -> Vec<FollowUp> {
    match task {
        FollowUp::CastBotVotes {
            game_id, prompt_id, ..
        } => {
            if let Err(e) = state.cast_bot_votes(&game_id, &prompt_id).await {
                tracing::error!(%game_id, %prompt_id, error = %e, "Scheduled bot voting failed");
            }
            Vec::new()
        }
        FollowUp::CleanupGame { game_id, .. } => state.cleanup_game(&game_id).await,
    }
}

/// Scheduler backed by tokio timers
#[derive(Clone)]
pub struct TokioScheduler {
    state: Arc<AppState>,
}

impl TokioScheduler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl Scheduler for TokioScheduler {
    fn run_after(&self, delay: Duration, task: FollowUp) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(?task, "Running scheduled task");
            let next = execute(&scheduler.state, task).await;
            dispatch(&scheduler, next);
        });
    }
}

/// Spawn a background task that periodically deletes idle games
pub fn spawn_idle_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.sweep_interval);
        // First tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let removed = state.sweep_idle_games().await;
            if removed > 0 {
                tracing::debug!(removed, "Idle sweep finished");
            }
        }
    });
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records scheduled tasks instead of running them
    #[derive(Default)]
    pub struct RecordingScheduler {
        pub tasks: Mutex<Vec<FollowUp>>,
    }

    impl RecordingScheduler {
        pub fn take(&self) -> Vec<FollowUp> {
            std::mem::take(&mut *self.tasks.lock().unwrap())
        }
    }

    impl Scheduler for RecordingScheduler {
        fn run_after(&self, _delay: Duration, task: FollowUp) {
            self.tasks.lock().unwrap().push(task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingScheduler;
    use super::*;
    use crate::config::EngineConfig;
    use crate::rules::Ruleset;
    use crate::types::GameStatus;

    #[test]
    fn test_follow_up_serialization() {
        let task = FollowUp::CastBotVotes {
            game_id: "g".to_string(),
            prompt_id: "p".to_string(),
            delay_ms: 450,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["op"], "cast_bot_votes");
        assert_eq!(json["delay_ms"], 450);
        assert_eq!(task.delay(), Duration::from_millis(450));
    }

    #[test]
    fn test_dispatch_hands_every_task_over() {
        let scheduler = RecordingScheduler::default();
        dispatch(
            &scheduler,
            vec![
                FollowUp::CleanupGame {
                    game_id: "a".to_string(),
                    delay_ms: 1,
                },
                FollowUp::CleanupGame {
                    game_id: "b".to_string(),
                    delay_ms: 2,
                },
            ],
        );
        assert_eq!(scheduler.take().len(), 2);
    }

    #[tokio::test]
    async fn test_execute_stale_bot_votes_is_noop() {
        let state = AppState::new();
        let next = execute(
            &state,
            FollowUp::CastBotVotes {
                game_id: "gone".to_string(),
                prompt_id: "gone".to_string(),
                delay_ms: 0,
            },
        )
        .await;
        assert!(next.is_empty());
    }

    #[tokio::test]
    async fn test_tokio_scheduler_runs_cleanup() {
        let state = Arc::new(AppState::with_config(EngineConfig {
            idle_cleanup: Duration::ZERO,
            ..EngineConfig::default()
        }));
        let game = state.create_game(Ruleset::Classic).await;
        assert_eq!(game.status, GameStatus::Lobby);

        let scheduler = TokioScheduler::new(state.clone());
        scheduler.run_after(
            Duration::from_millis(10),
            FollowUp::CleanupGame {
                game_id: game.id.clone(),
                delay_ms: 10,
            },
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(state.get_game(&game.id).await.is_none());
    }
}
