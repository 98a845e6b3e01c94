//! Engine error taxonomy.
//!
//! Authorization and input errors are returned to the caller as rejected
//! operations. Stale scheduled work never surfaces here: those paths log and
//! return an empty follow-up list instead.

use crate::types::GameStatus;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Invalid or missing credential")]
    Unauthorized,

    #[error("Only the VIP can {0}")]
    NotVip(&'static str),

    #[error("Game not found")]
    GameNotFound,

    #[error("Player not found")]
    PlayerNotFound,

    #[error("Prompt not found")]
    PromptNotFound,

    #[error("Submission not found")]
    SubmissionNotFound,

    #[error("Expected game status {expected:?}, but game is in {actual:?}")]
    InvalidPhase {
        expected: GameStatus,
        actual: GameStatus,
    },

    #[error("Voting for this prompt is closed")]
    VotingClosed,

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Already submitted an answer for this prompt")]
    AlreadySubmitted,

    #[error("Player is not assigned to this prompt")]
    NotAssigned,

    #[error("Player may not vote on this battle")]
    IneligibleVoter,

    #[error("Name is already taken")]
    NameTaken,

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    #[error("Attack types are not available in this round")]
    AttackNotAllowed,

    #[error("At least {0} players are required to start")]
    NotEnoughPlayers(usize),

    #[error("The final round has already been played")]
    NoMoreRounds,

    #[error("Round {0} must be closed before the next round opens")]
    RoundNotClosed(u32),

    #[error("Unsupported snapshot schema version {0}")]
    UnsupportedSnapshot(u32),
}

impl GameError {
    /// Stable machine-readable code for the command surface
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Unauthorized => "UNAUTHORIZED",
            GameError::NotVip(_) => "NOT_VIP",
            GameError::GameNotFound => "GAME_NOT_FOUND",
            GameError::PlayerNotFound => "PLAYER_NOT_FOUND",
            GameError::PromptNotFound => "PROMPT_NOT_FOUND",
            GameError::SubmissionNotFound => "SUBMISSION_NOT_FOUND",
            GameError::InvalidPhase { .. } => "INVALID_PHASE",
            GameError::VotingClosed => "VOTING_CLOSED",
            GameError::AlreadyVoted => "ALREADY_VOTED",
            GameError::AlreadySubmitted => "ALREADY_SUBMITTED",
            GameError::NotAssigned => "NOT_ASSIGNED",
            GameError::IneligibleVoter => "INELIGIBLE_VOTER",
            GameError::NameTaken => "NAME_TAKEN",
            GameError::InvalidName(_) => "INVALID_NAME",
            GameError::InvalidAnswer(_) => "INVALID_ANSWER",
            GameError::AttackNotAllowed => "ATTACK_NOT_ALLOWED",
            GameError::NotEnoughPlayers(_) => "NOT_ENOUGH_PLAYERS",
            GameError::NoMoreRounds => "NO_MORE_ROUNDS",
            GameError::RoundNotClosed(_) => "ROUND_NOT_CLOSED",
            GameError::UnsupportedSnapshot(_) => "UNSUPPORTED_SNAPSHOT",
        }
    }

    /// Authorization failures are never retried by callers
    pub fn is_authorization(&self) -> bool {
        matches!(self, GameError::Unauthorized | GameError::NotVip(_))
    }
}
