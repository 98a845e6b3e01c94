//! Vote-to-damage resolution for a single matchup.
//!
//! `calculate` never mutates anything: it returns a `CombatResult` describing
//! both combatants after the battle, and the battle resolver alone writes that
//! back to the player records.

use crate::rules::{HpFloor, Rules, COMBO_BONUS, DAMAGE_CAP, SPECIAL_BAR_MAX};
use crate::types::{AttackType, OutcomeKind};
use chrono::{DateTime, Utc};

/// A combatant's state going into the battle
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub hp: u32,
    pub win_streak: u32,
    pub special_bar: f64,
    /// Votes for this combatant's answer
    pub votes: u32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub attack_type: Option<AttackType>,
}

impl Combatant {
    pub fn new(hp: u32, votes: u32) -> Self {
        Self {
            hp,
            win_streak: 0,
            special_bar: 0.0,
            votes,
            submitted_at: None,
            attack_type: None,
        }
    }

    fn attack(&self) -> AttackType {
        self.attack_type.unwrap_or(AttackType::Jab)
    }

    fn unchanged(&self) -> CombatantResult {
        CombatantResult {
            hp: self.hp,
            knocked_out: self.hp == 0,
            win_streak: self.win_streak,
            special_bar: self.special_bar,
            damage_taken: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// What forced an unconditional knockout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantKo {
    /// Third consecutive win
    Combo,
    SpecialBar,
}

/// A combatant's state after the battle
#[derive(Debug, Clone, PartialEq)]
pub struct CombatantResult {
    pub hp: u32,
    pub knocked_out: bool,
    pub win_streak: u32,
    pub special_bar: f64,
    pub damage_taken: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombatResult {
    pub kind: OutcomeKind,
    pub winner: Option<Side>,
    pub left: CombatantResult,
    pub right: CombatantResult,
    pub instant_ko: Option<InstantKo>,
}

impl CombatResult {
    pub fn side(&self, side: Side) -> &CombatantResult {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn loser(&self) -> Option<Side> {
        self.winner.map(Side::other)
    }

    fn from_sides(
        kind: OutcomeKind,
        winner: Option<Side>,
        first: (Side, CombatantResult),
        second: CombatantResult,
        instant_ko: Option<InstantKo>,
    ) -> Self {
        let (left, right) = match first.0 {
            Side::Left => (first.1, second),
            Side::Right => (second, first.1),
        };
        Self {
            kind,
            winner,
            left,
            right,
            instant_ko,
        }
    }
}

/// Subtract whole damage from HP under the round's floor policy
fn apply_damage(hp: u32, damage: u32, floor: HpFloor) -> u32 {
    let remaining = hp.saturating_sub(damage);
    match floor {
        HpFloor::Zero => remaining,
        HpFloor::One if hp == 0 => 0,
        HpFloor::One => remaining.max(1),
    }
}

/// Scale vote damage by the attack declarations when the round uses them
fn attack_scaled(damage: f64, attacker: &Combatant, defender: &Combatant, enabled: bool) -> f64 {
    if !enabled {
        return damage;
    }
    let dealt = damage * attacker.attack().dealt();
    let received = damage * defender.attack().received();
    dealt.max(received)
}

/// Which side answered first. Missing timestamps count as latest; a full
/// tie keeps the left (first assigned) combatant.
pub fn earlier_side(left: &Combatant, right: &Combatant) -> Side {
    match (left.submitted_at, right.submitted_at) {
        (Some(l), Some(r)) if r < l => Side::Right,
        (None, Some(_)) => Side::Right,
        _ => Side::Left,
    }
}

/// Resolve one matchup.
pub fn calculate(rules: &Rules, round: u32, left: &Combatant, right: &Combatant) -> CombatResult {
    let total_votes = left.votes + right.votes;
    if total_votes == 0 {
        return CombatResult {
            kind: OutcomeKind::NoVotes,
            winner: None,
            left: left.unchanged(),
            right: right.unchanged(),
            instant_ko: None,
        };
    }

    if left.votes == right.votes {
        return resolve_tie(rules, round, left, right);
    }

    let (winner_side, winner, loser) = if left.votes > right.votes {
        (Side::Left, left, right)
    } else {
        (Side::Right, right, left)
    };

    let round_rules = rules.round(round);
    let vote_damage =
        (winner.votes as f64 / total_votes as f64) * DAMAGE_CAP * round_rules.multiplier;
    let mut damage = attack_scaled(vote_damage, winner, loser, round_rules.attack_types);

    // Streak bonuses look at the streak before this win
    let mut instant_ko = None;
    if rules.combo_streak {
        match winner.win_streak {
            0 => {}
            1 => damage += COMBO_BONUS,
            _ => instant_ko = Some(InstantKo::Combo),
        }
    }

    let mut winner_bar = winner.special_bar;
    if rules.special_bar {
        winner_bar = (winner_bar + 1.0).min(SPECIAL_BAR_MAX);
        if winner_bar >= SPECIAL_BAR_MAX {
            instant_ko.get_or_insert(InstantKo::SpecialBar);
            winner_bar = 0.0;
        }
    }

    let loser_hp = if instant_ko.is_some() {
        0
    } else {
        apply_damage(loser.hp, damage.floor() as u32, round_rules.hp_floor)
    };

    let winner_result = CombatantResult {
        hp: winner.hp,
        knocked_out: false,
        win_streak: winner.win_streak + 1,
        special_bar: winner_bar,
        damage_taken: 0,
    };
    let loser_result = CombatantResult {
        hp: loser_hp,
        knocked_out: loser_hp == 0,
        win_streak: 0,
        special_bar: loser.special_bar,
        damage_taken: loser.hp - loser_hp,
    };

    CombatResult::from_sides(
        OutcomeKind::Decisive,
        Some(winner_side),
        (winner_side, winner_result),
        loser_result,
        instant_ko,
    )
}

fn resolve_tie(rules: &Rules, round: u32, left: &Combatant, right: &Combatant) -> CombatResult {
    let round_rules = rules.round(round);
    let tie_damage = 0.5 * DAMAGE_CAP * round_rules.multiplier;

    let left_hp = apply_damage(
        left.hp,
        attack_scaled(tie_damage, right, left, round_rules.attack_types).floor() as u32,
        round_rules.hp_floor,
    );
    let right_hp = apply_damage(
        right.hp,
        attack_scaled(tie_damage, left, right, round_rules.attack_types).floor() as u32,
        round_rules.hp_floor,
    );

    let after = |c: &Combatant, hp: u32, win_streak: u32| CombatantResult {
        hp,
        knocked_out: hp == 0,
        win_streak,
        special_bar: c.special_bar,
        damage_taken: c.hp.saturating_sub(hp),
    };

    match (left_hp == 0, right_hp == 0) {
        (true, true) => {
            let survivor_side = earlier_side(left, right);
            let (survivor, fallen) = match survivor_side {
                Side::Left => (left, right),
                Side::Right => (right, left),
            };
            tracing::debug!(
                ?survivor_side,
                "Double knockout on a tie, earlier answer survives at 1 HP"
            );
            CombatResult::from_sides(
                OutcomeKind::DoubleKoTieBreak,
                Some(survivor_side),
                (survivor_side, after(survivor, 1, survivor.win_streak + 1)),
                after(fallen, 0, 0),
                None,
            )
        }
        (true, false) => CombatResult {
            kind: OutcomeKind::TieKnockout,
            winner: Some(Side::Right),
            left: after(left, 0, 0),
            right: after(right, right_hp, right.win_streak + 1),
            instant_ko: None,
        },
        (false, true) => CombatResult {
            kind: OutcomeKind::TieKnockout,
            winner: Some(Side::Left),
            left: after(left, left_hp, left.win_streak + 1),
            right: after(right, 0, 0),
            instant_ko: None,
        },
        (false, false) => CombatResult {
            kind: OutcomeKind::Tie,
            winner: None,
            left: after(left, left_hp, 0),
            right: after(right, right_hp, 0),
            instant_ko: None,
        },
    }
}
