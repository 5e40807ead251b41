//! Combat rules engine with an Intent/Resolution split.
//!
//! 1. Tactics suggest an [`Intent`] (what a combatant wants to do)
//! 2. [`RulesEngine`] validates it, rolls, and applies the result to the roster
//! 3. A [`Resolution`] describes what happened
//!
//! Resolution is all-or-nothing up to the first roll: every check that can
//! reject an action runs before any hit point or spell slot changes.

use crate::combatant::Combatant;
use crate::dice::{Advantage, RollSource};
use crate::events::EventSink;
use crate::grid::Position;
use crate::items::DamageType;
use crate::spells::{Casting, Spell};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// An action that breaks the rules. The roster is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RulesError {
    #[error("No combatant at roster index {0}")]
    NoSuchCombatant(usize),

    #[error("{0} cannot act at 0 hit points")]
    Incapacitated(String),

    #[error("{attacker} has no weapon in slot {index}")]
    NoSuchWeapon { attacker: String, index: usize },

    #[error("{caster} does not know the spell {spell}")]
    UnknownSpell { caster: String, spell: String },

    #[error("{spell} cannot be cast below level {minimum} (requested level {requested})")]
    SpellLevelTooLow {
        spell: String,
        minimum: u8,
        requested: u8,
    },

    #[error("{caster} has no level {level} spell slots left")]
    NoSpellSlot { caster: String, level: u8 },

    #[error("{target} is {distance:.1} feet away, beyond the {range}-foot range of {spell}")]
    OutOfRange {
        spell: String,
        target: String,
        distance: f64,
        range: u32,
    },

    #[error("{target} is {distance:.1} feet away, beyond the {long}-foot long range of {weapon}")]
    WeaponOutOfRange {
        weapon: String,
        target: String,
        distance: f64,
        long: u32,
    },

    #[error("At least {min} targets required, got {got}")]
    TooFewTargets { min: usize, got: usize },

    #[error("At most {max} targets allowed, got {got}")]
    TooManyTargets { max: usize, got: usize },

    #[error("{0} is targeted more than once")]
    DuplicateTarget(String),

    #[error("Targets do not fit in a {radius}-foot sphere")]
    TargetsOutsideArea { radius: u32 },

    #[error("Cell ({x}, {y}) is already occupied")]
    CellOccupied { x: i32, y: i32 },

    #[error("Cell ({x}, {y}) is off the grid")]
    OffGrid { x: i32, y: i32 },
}

// ============================================================================
// Intents and Resolutions
// ============================================================================

/// What a combatant wants to do. Combatants are roster indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Attack a target with an equipped weapon
    Attack {
        attacker: usize,
        target: usize,
        weapon: usize,
        advantage: Advantage,
    },

    /// Cast a known spell at a slot level (0 for cantrips)
    CastSpell {
        caster: usize,
        spell: String,
        level: u8,
        targets: Vec<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackOutcome {
    /// The kept d20.
    pub roll: i32,
    pub total: i32,
    pub critical: bool,
    pub hit: bool,
    pub damage_taken: i32,
    pub damage_type: DamageType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastOutcome {
    pub spell: String,
    pub level: u8,
    /// Summed magnitude of every effect.
    pub magnitude: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Attack(AttackOutcome),
    Cast(CastOutcome),
}

/// The result of resolving an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Outcome,
    /// Every message logged while resolving, in order.
    pub narrative: String,
}

impl Resolution {
    pub fn new(outcome: Outcome, narrative: impl Into<String>) -> Self {
        Self {
            outcome,
            narrative: narrative.into(),
        }
    }

    pub fn attack(&self) -> Option<&AttackOutcome> {
        match &self.outcome {
            Outcome::Attack(attack) => Some(attack),
            Outcome::Cast(_) => None,
        }
    }

    pub fn cast(&self) -> Option<&CastOutcome> {
        match &self.outcome {
            Outcome::Cast(cast) => Some(cast),
            Outcome::Attack(_) => None,
        }
    }
}

// ============================================================================
// Action Context
// ============================================================================

/// The collaborators an action needs: a roll source and an event sink.
pub struct ActionContext<'a> {
    rolls: &'a mut dyn RollSource,
    sink: &'a mut dyn EventSink,
    transcript: Vec<String>,
}

impl<'a> ActionContext<'a> {
    pub fn new(rolls: &'a mut dyn RollSource, sink: &'a mut dyn EventSink) -> Self {
        Self {
            rolls,
            sink,
            transcript: Vec::new(),
        }
    }

    pub fn rolls(&mut self) -> &mut (dyn RollSource + 'a) {
        &mut *self.rolls
    }

    /// Report something that happened.
    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(target: "combat", "{message}");
        self.sink.log(&message);
        self.transcript.push(message);
    }

    fn take_narrative(&mut self) -> String {
        std::mem::take(&mut self.transcript).join(" ")
    }
}

// ============================================================================
// Rules Engine
// ============================================================================

/// Resolves intents against a roster.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesEngine;

impl RulesEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        roster: &mut [Combatant],
        intent: Intent,
        ctx: &mut ActionContext<'_>,
    ) -> Result<Resolution, RulesError> {
        let outcome = match intent {
            Intent::Attack {
                attacker,
                target,
                weapon,
                advantage,
            } => Outcome::Attack(self.resolve_attack(roster, attacker, target, weapon, advantage, ctx)?),
            Intent::CastSpell {
                caster,
                spell,
                level,
                targets,
            } => Outcome::Cast(self.resolve_cast_spell(roster, caster, &spell, level, &targets, ctx)?),
        };
        Ok(Resolution::new(outcome, ctx.take_narrative()))
    }

    /// Weapon attack: d20 against armor class, then damage on a hit.
    pub fn resolve_attack(
        &self,
        roster: &mut [Combatant],
        attacker: usize,
        target: usize,
        weapon: usize,
        advantage: Advantage,
        ctx: &mut ActionContext<'_>,
    ) -> Result<AttackOutcome, RulesError> {
        let attacker_ref = roster.get(attacker).ok_or(RulesError::NoSuchCombatant(attacker))?;
        let target_ref = roster.get(target).ok_or(RulesError::NoSuchCombatant(target))?;

        if !attacker_ref.is_alive() {
            return Err(RulesError::Incapacitated(attacker_ref.name.clone()));
        }
        let weapon_ref = attacker_ref
            .weapon(weapon)
            .ok_or_else(|| RulesError::NoSuchWeapon {
                attacker: attacker_ref.name.clone(),
                index: weapon,
            })?;

        let advantage = match attacker_ref.distance_to(target_ref) {
            Some(distance) => {
                let penalty = weapon_ref.range_penalty(distance).ok_or_else(|| RulesError::WeaponOutOfRange {
                    weapon: weapon_ref.name.clone(),
                    target: target_ref.name.clone(),
                    distance,
                    long: weapon_ref.range.map_or(0, |(_, long)| long),
                })?;
                advantage.combine(penalty)
            }
            None => advantage,
        };

        let target_ac = target_ref.armor_class();
        let attack = attacker_ref.attack_roll(weapon_ref, advantage, ctx.rolls());
        let hit = attack.critical || attack.total >= target_ac;

        let attack_line = format!(
            "{} attacks {} with {} ({} vs AC {})",
            attacker_ref.name, target_ref.name, weapon_ref.name, attack.total, target_ac
        );
        let damage_type = weapon_ref.damage_type;

        if !hit {
            ctx.log(format!("{attack_line} and misses"));
            return Ok(AttackOutcome {
                roll: attack.natural,
                total: attack.total,
                critical: false,
                hit: false,
                damage_taken: 0,
                damage_type,
            });
        }

        let damage = attacker_ref.damage_roll(weapon_ref, attack.critical, ctx.rolls());
        let damage_taken = roster[target].take_damage(damage, damage_type);
        let target_ref = &roster[target];

        ctx.log(format!(
            "{attack_line} and {} for {} {} damage ({} HP)",
            if attack.critical { "crits" } else { "hits" },
            damage_taken,
            damage_type,
            target_ref.hp()
        ));
        if !target_ref.is_alive() {
            ctx.log(format!("{} falls", target_ref.name));
        }

        Ok(AttackOutcome {
            roll: attack.natural,
            total: attack.total,
            critical: attack.critical,
            hit: true,
            damage_taken,
            damage_type,
        })
    }

    /// Check a cast without changing anything. Returns the spell to cast.
    pub fn check_cast<'r>(
        &self,
        roster: &'r [Combatant],
        caster: usize,
        spell_name: &str,
        level: u8,
        targets: &[usize],
    ) -> Result<&'r Spell, RulesError> {
        let caster_ref = roster.get(caster).ok_or(RulesError::NoSuchCombatant(caster))?;
        if let Some(&missing) = targets.iter().find(|&&t| t >= roster.len()) {
            return Err(RulesError::NoSuchCombatant(missing));
        }
        let mut seen = HashSet::new();
        if let Some(&repeated) = targets.iter().find(|&&t| !seen.insert(t)) {
            return Err(RulesError::DuplicateTarget(roster[repeated].name.clone()));
        }
        if !caster_ref.is_alive() {
            return Err(RulesError::Incapacitated(caster_ref.name.clone()));
        }

        let spell = caster_ref
            .spell(spell_name)
            .ok_or_else(|| RulesError::UnknownSpell {
                caster: caster_ref.name.clone(),
                spell: spell_name.to_string(),
            })?;

        if level < spell.level {
            return Err(RulesError::SpellLevelTooLow {
                spell: spell.name.clone(),
                minimum: spell.level,
                requested: level,
            });
        }
        if !caster_ref.can_cast_at(level) {
            return Err(RulesError::NoSpellSlot {
                caster: caster_ref.name.clone(),
                level,
            });
        }

        if let Some(from) = caster_ref.position {
            for &target in targets {
                let Some(to) = roster[target].position else {
                    continue;
                };
                let distance = from.distance_to(to);
                if distance > f64::from(spell.range) {
                    return Err(RulesError::OutOfRange {
                        spell: spell.name.clone(),
                        target: roster[target].name.clone(),
                        distance,
                        range: spell.range,
                    });
                }
            }
        }

        let positions: Option<Vec<Position>> = targets.iter().map(|&t| roster[t].position).collect();
        match positions {
            Some(positions) => spell.area.check(&positions)?,
            None => spell.area.check_count(targets.len())?,
        }

        for effect in &spell.effects {
            effect.check_targets(caster, targets)?;
        }

        Ok(spell)
    }

    /// Cast a spell: validate, spend one slot (not for cantrips), then run
    /// every effect in order.
    pub fn resolve_cast_spell(
        &self,
        roster: &mut [Combatant],
        caster: usize,
        spell_name: &str,
        level: u8,
        targets: &[usize],
        ctx: &mut ActionContext<'_>,
    ) -> Result<CastOutcome, RulesError> {
        let spell = self.check_cast(roster, caster, spell_name, level, targets)?.clone();
        tracing::debug!(
            target: "combat",
            school = spell.school.name(),
            casting_time = spell.casting_time.description(),
            "casting {}",
            spell.name
        );

        if level > 0 {
            roster[caster].spell_slots.use_slot(level);
        }
        let casting = Casting::new(caster, &roster[caster], &spell, level);

        let target_names: Vec<&str> = targets.iter().map(|&t| roster[t].name.as_str()).collect();
        let message = if target_names.is_empty() {
            format!("{} casts {} at level {}", roster[caster].name, spell.name, level)
        } else {
            format!(
                "{} casts {} at level {} on {}",
                roster[caster].name,
                spell.name,
                level,
                target_names.join(", ")
            )
        };
        ctx.log(message);

        let mut magnitude = 0;
        for effect in &spell.effects {
            magnitude += effect.activate(roster, &casting, targets, ctx)?;
        }

        Ok(CastOutcome {
            spell: spell.name,
            level,
            magnitude,
        })
    }
}
