//! Ruleset tables.
//!
//! Two round schemes exist and are selected per game at creation time.
//! Everything that differs between them lives in the static tables below so
//! the damage calculator, pairing generator and round controller never branch
//! on the ruleset name itself.

use crate::types::{AttackType, PromptType};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum damage a fully one-sided vote deals at multiplier 1.0
pub const DAMAGE_CAP: f64 = 35.0;
/// Flat bonus when the winner lands their second consecutive win
pub const COMBO_BONUS: f64 = 15.0;
/// Special bar value that triggers an instant knockout
pub const SPECIAL_BAR_MAX: f64 = 3.0;
pub const DEFAULT_MAX_HP: u32 = 100;
pub const MIN_PLAYERS: usize = 3;
pub const MAX_NAME_CHARS: usize = 24;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Ruleset {
    /// Three rounds, combo streaks, any damage can knock out
    #[default]
    Classic,
    /// Four rounds, special bar, bracket resolution and attack types
    Tournament,
}

impl FromStr for Ruleset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Ok(Ruleset::Classic),
            "tournament" => Ok(Ruleset::Tournament),
            other => Err(format!("Unknown ruleset: {}", other)),
        }
    }
}

/// Whether ordinary damage may drive HP to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpFloor {
    Zero,
    /// Ordinary damage stops at 1 HP; only instant knockouts can kill
    One,
}

#[derive(Debug, Clone)]
pub struct RoundRules {
    pub name: &'static str,
    pub multiplier: f64,
    /// Prompts each two-player matchup battles over (byes always get one)
    pub prompts_per_matchup: u32,
    pub hp_floor: HpFloor,
    /// A knockout turns the loser into the winner's corner man
    pub forms_teams: bool,
    /// Fighters who already captain a corner man sit this round out
    pub captain_bye: bool,
    pub prompt_type: Option<PromptType>,
    pub attack_types: bool,
}

#[derive(Debug, Clone)]
pub struct Rules {
    pub max_rounds: u32,
    pub combo_streak: bool,
    pub special_bar: bool,
    /// Round whose opening first resolves the previous round's matchups into teams
    pub bracket_round: Option<u32>,
    /// In the penultimate round, close early once this few fighters remain
    pub early_exit_survivors: Option<usize>,
    /// HP and max HP given to every fighter when the final round opens
    pub final_round_hp: Option<u32>,
    rounds: &'static [RoundRules],
}

static CLASSIC_ROUNDS: [RoundRules; 3] = [
    RoundRules {
        name: "Opening",
        multiplier: 1.0,
        prompts_per_matchup: 3,
        hp_floor: HpFloor::Zero,
        forms_teams: true,
        captain_bye: false,
        prompt_type: None,
        attack_types: false,
    },
    RoundRules {
        name: "Cull",
        multiplier: 1.3,
        prompts_per_matchup: 2,
        hp_floor: HpFloor::Zero,
        forms_teams: true,
        captain_bye: true,
        prompt_type: None,
        attack_types: false,
    },
    RoundRules {
        name: "Showdown",
        multiplier: 1.5,
        prompts_per_matchup: 3,
        hp_floor: HpFloor::Zero,
        forms_teams: false,
        captain_bye: false,
        prompt_type: None,
        attack_types: false,
    },
];

static TOURNAMENT_ROUNDS: [RoundRules; 4] = [
    RoundRules {
        name: "Opening",
        multiplier: 1.0,
        prompts_per_matchup: 1,
        hp_floor: HpFloor::One,
        forms_teams: true,
        captain_bye: false,
        prompt_type: None,
        attack_types: false,
    },
    RoundRules {
        name: "Cull",
        multiplier: 1.3,
        prompts_per_matchup: 2,
        hp_floor: HpFloor::One,
        forms_teams: true,
        captain_bye: false,
        prompt_type: None,
        attack_types: false,
    },
    RoundRules {
        name: "Gauntlet",
        multiplier: 1.0,
        prompts_per_matchup: 2,
        hp_floor: HpFloor::One,
        forms_teams: false,
        captain_bye: false,
        prompt_type: Some(PromptType::Jab),
        attack_types: false,
    },
    RoundRules {
        name: "Showdown",
        multiplier: 1.5,
        prompts_per_matchup: 3,
        hp_floor: HpFloor::Zero,
        forms_teams: false,
        captain_bye: false,
        prompt_type: None,
        attack_types: true,
    },
];

static CLASSIC: Rules = Rules {
    max_rounds: 3,
    combo_streak: true,
    special_bar: false,
    bracket_round: None,
    early_exit_survivors: Some(2),
    final_round_hp: None,
    rounds: &CLASSIC_ROUNDS,
};

static TOURNAMENT: Rules = Rules {
    max_rounds: 4,
    combo_streak: false,
    special_bar: true,
    bracket_round: Some(2),
    early_exit_survivors: Some(2),
    final_round_hp: Some(200),
    rounds: &TOURNAMENT_ROUNDS,
};

impl Ruleset {
    pub fn rules(self) -> &'static Rules {
        match self {
            Ruleset::Classic => &CLASSIC,
            Ruleset::Tournament => &TOURNAMENT,
        }
    }
}

impl Rules {
    /// Rules for a 1-based round number, clamped into the table
    pub fn round(&self, round: u32) -> &RoundRules {
        let idx = (round.max(1) as usize - 1).min(self.rounds.len() - 1);
        &self.rounds[idx]
    }

    pub fn is_final_round(&self, round: u32) -> bool {
        round >= self.max_rounds
    }

    pub fn is_penultimate_round(&self, round: u32) -> bool {
        round + 1 == self.max_rounds
    }
}

impl AttackType {
    /// Damage multiplier applied to what this attacker deals
    pub fn dealt(self) -> f64 {
        match self {
            AttackType::Jab => 1.0,
            AttackType::Haymaker => 2.0,
            AttackType::FlyingKick => 3.0,
        }
    }

    /// Damage multiplier applied to what this attacker takes when it loses
    pub fn received(self) -> f64 {
        match self {
            AttackType::Jab => 1.0,
            AttackType::Haymaker => 2.0,
            AttackType::FlyingKick => 4.0,
        }
    }
}
