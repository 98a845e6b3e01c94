use crate::rules::Ruleset;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateGame {
        /// Falls back to the configured default
        #[serde(default)]
        ruleset: Option<Ruleset>,
    },
    JoinGame {
        room_code: String,
        name: String,
    },
    // VIP-only messages
    AddBot {
        game_id: GameId,
        player_id: PlayerId,
        credential: String,
    },
    StartGame {
        game_id: GameId,
        player_id: PlayerId,
        credential: String,
    },
    NextBattle {
        game_id: GameId,
        player_id: PlayerId,
        credential: String,
    },
    NextRound {
        game_id: GameId,
        player_id: PlayerId,
        credential: String,
    },
    // Player messages
    SubmitAnswer {
        game_id: GameId,
        player_id: PlayerId,
        credential: String,
        prompt_id: PromptId,
        text: String,
        #[serde(default)]
        attack_type: Option<AttackType>,
    },
    SubmitVote {
        game_id: GameId,
        player_id: PlayerId,
        credential: String,
        prompt_id: PromptId,
        submission_id: SubmissionId,
    },
    GetState {
        game_id: GameId,
    },
}

/// Public view of a player (no credential digest)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub knocked_out: bool,
    pub role: PlayerRole,
    pub team_id: Option<PlayerId>,
    pub is_vip: bool,
    pub is_bot: bool,
    pub win_streak: u32,
    pub special_bar: f64,
}

impl From<&Player> for PlayerInfo {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            hp: p.hp,
            max_hp: p.max_hp,
            knocked_out: p.knocked_out,
            role: p.role,
            team_id: p.team_id.clone(),
            is_vip: p.is_vip,
            is_bot: p.is_bot,
            win_streak: p.win_streak,
            special_bar: p.special_bar,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    GameCreated {
        game: Game,
    },
    Joined {
        player: PlayerInfo,
        /// Session credential; only its digest is kept server-side
        credential: String,
    },
    BotAdded {
        player: PlayerInfo,
    },
    AnswerAccepted {
        submission_id: SubmissionId,
    },
    VoteAccepted {
        vote_id: VoteId,
    },
    GameState {
        game: Game,
        /// In standings order
        players: Vec<PlayerInfo>,
        /// Current round's prompts in round order
        prompts: Vec<Prompt>,
    },
    Error {
        code: String,
        msg: String,
    },
}
