use crate::rules::{Ruleset, DEFAULT_MAX_HP};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type GameId = String;
pub type PlayerId = String;
pub type PromptId = String;
pub type SubmissionId = String;
pub type VoteId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Lobby,
    Prompts,
    Voting,
    RoundResults,
    Results,
}

/// Sub-state of VOTING
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    Voting,
    Reveal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub room_code: String,
    pub version: u64,
    pub ruleset: Ruleset,
    pub status: GameStatus,
    pub current_round: u32,
    pub max_rounds: u32,
    /// Set only while status is VOTING
    pub current_prompt_id: Option<PromptId>,
    /// Only meaningful while status is VOTING
    pub round_status: Option<RoundStatus>,
    #[serde(default)]
    pub used_prompt_indices: Vec<usize>,
    /// Highest round whose bracket bookkeeping has committed
    #[serde(default)]
    pub last_closed_round: u32,
    #[serde(default)]
    pub winner_id: Option<PlayerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Game {
    /// Bump version and activity timestamp after a mutation
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerRole {
    Fighter,
    CornerMan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub game_id: GameId,
    pub name: String,
    /// SHA-256 hex digest of the session credential
    pub credential_hash: String,
    pub hp: u32,
    pub max_hp: u32,
    pub knocked_out: bool,
    pub role: PlayerRole,
    /// Captain this corner man supports
    pub team_id: Option<PlayerId>,
    pub is_vip: bool,
    pub is_bot: bool,
    pub win_streak: u32,
    pub special_bar: f64,
    /// Join order within the game, used for deterministic bracket seeding
    pub seat: u32,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn new(
        game_id: &str,
        seat: u32,
        name: String,
        credential_hash: String,
        is_bot: bool,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            game_id: game_id.to_string(),
            name,
            credential_hash,
            hp: DEFAULT_MAX_HP,
            max_hp: DEFAULT_MAX_HP,
            knocked_out: false,
            role: PlayerRole::Fighter,
            team_id: None,
            is_vip: false,
            is_bot,
            win_streak: 0,
            special_bar: 0.0,
            seat,
            joined_at: Utc::now(),
        }
    }

    /// Still in the fight
    pub fn is_active_fighter(&self) -> bool {
        self.role == PlayerRole::Fighter && !self.knocked_out
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    /// Single-word answers only
    Jab,
    SuddenDeath,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    Jab,
    Haymaker,
    FlyingKick,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    NoVotes,
    Decisive,
    /// Equal votes, nobody knocked out
    Tie,
    /// Equal votes where tie damage knocked out exactly one side
    TieKnockout,
    /// Equal votes that would have knocked out both; earlier answer survived
    DoubleKoTieBreak,
}

/// Recorded result of one resolved prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub kind: OutcomeKind,
    pub winner_id: Option<PlayerId>,
    pub loser_id: Option<PlayerId>,
    /// Votes per assignee, same order as `Prompt::assigned_to`
    pub votes: [u32; 2],
    /// Damage taken per assignee, same order as `Prompt::assigned_to`
    pub damage: [u32; 2],
    pub knocked_out: Vec<PlayerId>,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: PromptId,
    pub game_id: GameId,
    pub round: u32,
    /// Position in round order
    pub order: u32,
    pub text: String,
    /// One id for a bye, two for a matchup
    pub assigned_to: Vec<PlayerId>,
    #[serde(default)]
    pub prompt_type: Option<PromptType>,
    #[serde(default)]
    pub outcome: Option<BattleOutcome>,
}

impl Prompt {
    pub fn is_matchup(&self) -> bool {
        self.assigned_to.len() == 2
    }

    pub fn is_assigned(&self, player_id: &str) -> bool {
        self.assigned_to.iter().any(|id| id == player_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub prompt_id: PromptId,
    pub player_id: PlayerId,
    pub text: String,
    /// Earlier submission wins a double-KO tie
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attack_type: Option<AttackType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub prompt_id: PromptId,
    /// The voter
    pub player_id: PlayerId,
    pub submission_id: SubmissionId,
}
