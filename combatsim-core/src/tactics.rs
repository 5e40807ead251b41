//! Decision policies.
//!
//! A policy looks at the roster and turns one combatant's turn into an
//! [`Intent`]. Deciding is pure; [`Tactics::act`] hands the decision to the
//! [`RulesEngine`].

use crate::combatant::Combatant;
use crate::dice::Advantage;
use crate::rules::{ActionContext, Intent, Resolution, RulesEngine, RulesError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tactics {
    /// Attack the living enemy with the fewest hit points.
    #[default]
    TargetWeakest,
    /// Spend level 1 slots on healing itself, then hurt allies.
    Healer,
    /// Open with the first known spell on up to two enemies.
    Mage,
}

impl Tactics {
    pub fn name(&self) -> &'static str {
        match self {
            Tactics::TargetWeakest => "Target Weakest",
            Tactics::Healer => "Healer",
            Tactics::Mage => "Mage",
        }
    }

    /// What `actor` wants to do this turn, if anything.
    pub fn decide(&self, roster: &[Combatant], actor: usize) -> Option<Intent> {
        let me = roster.get(actor)?;
        if !me.is_alive() {
            return None;
        }
        let decision = match self {
            Tactics::TargetWeakest => None,
            Tactics::Healer => heal(roster, actor),
            Tactics::Mage => blast(roster, actor),
        };
        decision.or_else(|| attack_weakest(roster, actor))
    }

    /// Take `actor`'s turn. A combatant at 0 hit points does nothing.
    pub fn act(
        &self,
        roster: &mut [Combatant],
        actor: usize,
        ctx: &mut ActionContext<'_>,
    ) -> Result<Option<Resolution>, RulesError> {
        let me = roster.get(actor).ok_or(RulesError::NoSuchCombatant(actor))?;
        if !me.is_alive() {
            ctx.log(format!("{} is down and cannot act", me.name));
            return Ok(None);
        }
        match self.decide(roster, actor) {
            Some(intent) => RulesEngine::new().resolve(roster, intent, ctx).map(Some),
            None => {
                ctx.log(format!("{} has no one to fight", roster[actor].name));
                Ok(None)
            }
        }
    }
}

/// Living enemies of `actor`, in roster order.
pub fn enemies(roster: &[Combatant], actor: usize) -> impl Iterator<Item = usize> + '_ {
    let me = &roster[actor];
    roster
        .iter()
        .enumerate()
        .filter(move |(_, other)| other.is_alive() && me.is_enemy_of(other))
        .map(|(index, _)| index)
}

/// Allies of `actor` that are not dead, in roster order.
pub fn allies(roster: &[Combatant], actor: usize) -> impl Iterator<Item = usize> + '_ {
    let me = &roster[actor];
    roster
        .iter()
        .enumerate()
        .filter(move |(_, other)| !other.is_dead() && me.is_ally_of(other))
        .map(|(index, _)| index)
}

/// The living enemy with the fewest hit points; the first one wins ties.
pub fn weakest_enemy(roster: &[Combatant], actor: usize) -> Option<usize> {
    enemies(roster, actor).fold(None, |weakest: Option<usize>, candidate| match weakest {
        Some(current) if roster[current].hp() <= roster[candidate].hp() => Some(current),
        _ => Some(candidate),
    })
}

fn attack_weakest(roster: &[Combatant], actor: usize) -> Option<Intent> {
    let target = weakest_enemy(roster, actor)?;
    Some(Intent::Attack {
        attacker: actor,
        target,
        weapon: weapon_for(&roster[actor], &roster[target]),
        advantage: Advantage::Normal,
    })
}

/// First weapon that can reach `target`, falling back to the first one.
fn weapon_for(me: &Combatant, target: &Combatant) -> usize {
    let Some(distance) = me.distance_to(target) else {
        return 0;
    };
    me.weapons()
        .iter()
        .position(|weapon| weapon.range_penalty(distance).is_some())
        .unwrap_or(0)
}

fn cast(actor: usize, spell: &str, level: u8, targets: Vec<usize>) -> Intent {
    Intent::CastSpell {
        caster: actor,
        spell: spell.to_string(),
        level,
        targets,
    }
}

fn heal(roster: &[Combatant], actor: usize) -> Option<Intent> {
    let me = &roster[actor];
    if me.spell_slots.available(1) == 0 {
        return None;
    }
    let spell = me.spells().first()?;
    let engine = RulesEngine::new();

    let mut candidates = std::iter::once(actor)
        .filter(|_| me.hit_points().is_damaged())
        .chain(allies(roster, actor).filter(|&ally| roster[ally].hit_points().is_damaged()));

    candidates
        .find(|&target| engine.check_cast(roster, actor, &spell.name, 1, &[target]).is_ok())
        .map(|target| cast(actor, &spell.name, 1, vec![target]))
}

fn blast(roster: &[Combatant], actor: usize) -> Option<Intent> {
    let me = &roster[actor];
    let spell = me.spells().first()?;
    if !me.can_cast_at(spell.level) {
        return None;
    }
    let engine = RulesEngine::new();
    let castable = |targets: &[usize]| {
        engine
            .check_cast(roster, actor, &spell.name, spell.level, targets)
            .is_ok()
    };

    let in_range: Vec<usize> = enemies(roster, actor)
        .filter(|&enemy| castable(&[enemy]))
        .take(2)
        .collect();

    if in_range.len() == 2 && castable(&in_range) {
        return Some(cast(actor, &spell.name, spell.level, in_range));
    }
    in_range
        .first()
        .map(|&enemy| cast(actor, &spell.name, spell.level, vec![enemy]))
}
