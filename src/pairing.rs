//! Bracket seeding for each round.
//!
//! Pure functions over a snapshot of the game's players. The round controller
//! turns the resulting slots into prompt rows.

use crate::rules::Rules;
use crate::types::{Player, PlayerId, PlayerRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchup {
    pub left: PlayerId,
    pub right: PlayerId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingPlan {
    pub matchups: Vec<Matchup>,
    pub byes: Vec<PlayerId>,
}

impl PairingPlan {
    pub fn has_matchups(&self) -> bool {
        !self.matchups.is_empty()
    }
}

/// One prompt to create, in round order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSlot {
    pub order: u32,
    pub assigned_to: Vec<PlayerId>,
}

/// Whether any corner man is already attached to `captain_id`
pub fn has_corner_man(players: &[Player], captain_id: &str) -> bool {
    players
        .iter()
        .any(|p| p.role == PlayerRole::CornerMan && p.team_id.as_deref() == Some(captain_id))
}

/// Players allowed to fight in `round`, in seat order.
///
/// The opening round takes every fighter; later rounds drop anyone already
/// knocked out.
pub fn eligible_fighters(players: &[Player], round: u32) -> Vec<&Player> {
    let mut eligible: Vec<&Player> = players
        .iter()
        .filter(|p| {
            if round <= 1 {
                p.role == PlayerRole::Fighter
            } else {
                p.is_active_fighter()
            }
        })
        .collect();
    eligible.sort_by(|a, b| a.seat.cmp(&b.seat).then_with(|| a.id.cmp(&b.id)));
    eligible
}

/// Seed the matchups for `round`.
///
/// Captains get a bye in rounds that grant one; the rest pair off
/// sequentially and an odd fighter out gets a bye.
pub fn generate(players: &[Player], round: u32, rules: &Rules) -> PairingPlan {
    let round_rules = rules.round(round);
    let mut plan = PairingPlan::default();
    let mut pool = Vec::new();

    for player in eligible_fighters(players, round) {
        if round_rules.captain_bye && has_corner_man(players, &player.id) {
            tracing::debug!("{} captains a team, granting bye", player.name);
            plan.byes.push(player.id.clone());
        } else {
            pool.push(player.id.clone());
        }
    }

    let mut chunks = pool.chunks_exact(2);
    for pair in chunks.by_ref() {
        plan.matchups.push(Matchup {
            left: pair[0].clone(),
            right: pair[1].clone(),
        });
    }
    if let [odd] = chunks.remainder() {
        plan.byes.push(odd.clone());
    }

    tracing::info!(
        "Round {} pairing: {} matchups, {} byes",
        round,
        plan.matchups.len(),
        plan.byes.len()
    );
    plan
}

/// Expand a plan into prompt slots.
///
/// Matchup prompts interleave so each pair's battles are spread through the
/// round; every bye gets one single-assignee prompt at the end.
pub fn prompt_slots(plan: &PairingPlan, prompts_per_matchup: u32) -> Vec<PromptSlot> {
    let mut slots = Vec::new();
    let mut order = 0;

    for _ in 0..prompts_per_matchup.max(1) {
        for matchup in &plan.matchups {
            slots.push(PromptSlot {
                order,
                assigned_to: vec![matchup.left.clone(), matchup.right.clone()],
            });
            order += 1;
        }
    }

    for bye in &plan.byes {
        slots.push(PromptSlot {
            order,
            assigned_to: vec![bye.clone()],
        });
        order += 1;
    }

    slots
}
