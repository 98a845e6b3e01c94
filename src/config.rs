//! Engine configuration loaded from environment variables

use crate::rules::{Ruleset, MIN_PLAYERS};
use std::time::Duration;

/// Runtime knobs for the engine and its scheduled work
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Lower bound of the bot "thinking time" jitter window
    pub bot_delay_min_ms: u64,
    /// Upper bound of the bot "thinking time" jitter window
    pub bot_delay_max_ms: u64,
    /// Games idle longer than this are deleted by the sweeper
    pub idle_cleanup: Duration,
    /// How often the idle sweeper runs
    pub sweep_interval: Duration,
    pub max_answer_chars: usize,
    /// Ruleset used when a caller does not pick one
    pub default_ruleset: Ruleset,
    /// Seats filled by the exhibition binary
    pub exhibition_bots: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bot_delay_min_ms: 300,
            bot_delay_max_ms: 900,
            idle_cleanup: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(300),
            max_answer_chars: 140,
            default_ruleset: Ruleset::Classic,
            exhibition_bots: 7,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, trimmed);
            None
        }
    }
}

impl EngineConfig {
    /// Load config from environment, falling back to defaults per field
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut bot_delay_min_ms =
            env_parse("BOT_DELAY_MIN_MS").unwrap_or(defaults.bot_delay_min_ms);
        let mut bot_delay_max_ms =
            env_parse("BOT_DELAY_MAX_MS").unwrap_or(defaults.bot_delay_max_ms);
        if bot_delay_min_ms > bot_delay_max_ms {
            tracing::warn!(
                "BOT_DELAY_MIN_MS ({}) exceeds BOT_DELAY_MAX_MS ({}), using defaults",
                bot_delay_min_ms,
                bot_delay_max_ms
            );
            bot_delay_min_ms = defaults.bot_delay_min_ms;
            bot_delay_max_ms = defaults.bot_delay_max_ms;
        }

        let idle_cleanup = env_parse::<u64>("IDLE_CLEANUP_HOURS")
            .and_then(|h| match h.checked_mul(60 * 60) {
                Some(secs) => Some(Duration::from_secs(secs)),
                None => {
                    tracing::warn!("IDLE_CLEANUP_HOURS ({}) is out of range, using default", h);
                    None
                }
            })
            .unwrap_or(defaults.idle_cleanup);

        let sweep_interval = env_parse::<u64>("CLEANUP_SWEEP_SECONDS")
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);

        let max_answer_chars = env_parse::<usize>("MAX_ANSWER_CHARS")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_answer_chars);

        let default_ruleset = env_parse::<Ruleset>("DEFAULT_RULESET")
            .unwrap_or(defaults.default_ruleset);

        let exhibition_bots = match env_parse::<usize>("EXHIBITION_BOTS") {
            Some(n) if n < MIN_PLAYERS => {
                tracing::warn!(
                    "EXHIBITION_BOTS ({}) is below the {} players a game needs, using default",
                    n,
                    MIN_PLAYERS
                );
                defaults.exhibition_bots
            }
            Some(n) => n,
            None => defaults.exhibition_bots,
        };

        tracing::info!(
            bot_delay_min_ms,
            bot_delay_max_ms,
            idle_cleanup_secs = idle_cleanup.as_secs(),
            ?default_ruleset,
            "Engine config loaded"
        );

        Self {
            bot_delay_min_ms,
            bot_delay_max_ms,
            idle_cleanup,
            sweep_interval,
            max_answer_chars,
            default_ruleset,
            exhibition_bots,
        }
    }

    /// Pick a jittered bot delay inside the configured window
    pub fn bot_delay_ms(&self) -> u64 {
        use rand::Rng;
        if self.bot_delay_max_ms <= self.bot_delay_min_ms {
            return self.bot_delay_min_ms;
        }
        rand::rng().random_range(self.bot_delay_min_ms..=self.bot_delay_max_ms)
    }
}
