//! Spells and the effect pipeline.
//!
//! A [`Spell`] carries an ordered list of [`SpellEffect`] trees. Each node
//! picks its targets (the caster, or the targets supplied to the cast) and
//! does one thing to them: heal, damage, gate an inner effect behind a saving
//! throw, or pipe one effect's magnitude into another.
//!
//! The tree is interpreted in two passes. [`SpellEffect::check_targets`]
//! validates target counts without touching anything, and
//! [`SpellEffect::activate`] applies the effect. The rules engine always runs
//! the first pass before spending a slot.

use crate::ability::Ability;
use crate::combatant::Combatant;
use crate::dice::Dice;
use crate::items::DamageType;
use crate::rules::{ActionContext, RulesError};
use crate::targeting::Area;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Schools of magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpellSchool {
    Abjuration,
    #[default]
    Conjuration,
    Divination,
    Enchantment,
    Evocation,
    Illusion,
    Necromancy,
    Transmutation,
}

impl SpellSchool {
    pub fn name(&self) -> &'static str {
        match self {
            SpellSchool::Abjuration => "Abjuration",
            SpellSchool::Conjuration => "Conjuration",
            SpellSchool::Divination => "Divination",
            SpellSchool::Enchantment => "Enchantment",
            SpellSchool::Evocation => "Evocation",
            SpellSchool::Illusion => "Illusion",
            SpellSchool::Necromancy => "Necromancy",
            SpellSchool::Transmutation => "Transmutation",
        }
    }
}

/// How long it takes to cast a spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastingTime {
    #[default]
    Action,
    BonusAction,
    Reaction,
}

impl CastingTime {
    pub fn description(&self) -> &'static str {
        match self {
            CastingTime::Action => "1 action",
            CastingTime::BonusAction => "1 bonus action",
            CastingTime::Reaction => "1 reaction",
        }
    }
}

// ============================================================================
// Effects
// ============================================================================

/// Which combatants an effect node applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    /// The caster, whatever targets were supplied.
    SelfOnly,
    /// The targets supplied to the cast.
    Supplied {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
}

impl Default for TargetMode {
    fn default() -> Self {
        TargetMode::Supplied {
            min: None,
            max: None,
        }
    }
}

impl TargetMode {
    pub fn resolve(&self, caster: usize, supplied: &[usize]) -> Result<Vec<usize>, RulesError> {
        match *self {
            TargetMode::SelfOnly => Ok(vec![caster]),
            TargetMode::Supplied { min, max } => {
                let got = supplied.len();
                if let Some(min) = min.filter(|&min| got < min) {
                    return Err(RulesError::TooFewTargets { min, got });
                }
                if let Some(max) = max.filter(|&max| got > max) {
                    return Err(RulesError::TooManyTargets { max, got });
                }
                Ok(supplied.to_vec())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// `(dice * cast level) + spellcasting bonus` hit points restored.
    Heal { dice: Dice },
    /// `(dice * cast level) + spellcasting bonus` damage.
    Damage { dice: Dice, damage_type: DamageType },
    /// Like `Damage`, but the dice scale with caster level instead.
    CantripDamage { dice: Dice, damage_type: DamageType },
    /// Each target saves; a failure takes the inner effect in full, a
    /// success takes it scaled by `multiplier`, or not at all.
    SavingThrow {
        ability: Ability,
        effect: Box<SpellEffect>,
        #[serde(default)]
        multiplier: Option<f64>,
    },
    /// Run `source`, then run `sink` with the magnitude `source` produced.
    Piped {
        source: Box<SpellEffect>,
        sink: Box<SpellEffect>,
    },
}

/// One node of an effect tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellEffect {
    #[serde(default)]
    pub targets: TargetMode,
    pub kind: EffectKind,
}

/// Caster-side numbers for one cast, fixed before any effect runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Casting {
    pub caster: usize,
    pub spell: String,
    pub level: u8,
    pub caster_level: u8,
    pub spellcasting_bonus: i32,
    pub spell_dc: i32,
}

impl Casting {
    pub fn new(caster_index: usize, caster: &Combatant, spell: &Spell, level: u8) -> Self {
        Self {
            caster: caster_index,
            spell: spell.name.clone(),
            level,
            caster_level: caster.level,
            spellcasting_bonus: caster.spellcasting_bonus(),
            spell_dc: caster.spell_dc(),
        }
    }
}

/// Caster levels at which a cantrip gains a die.
const CANTRIP_TIERS: [u8; 4] = [1, 5, 11, 17];

/// Number of cantrip dice for a caster level: one per tier reached, so none
/// at level 0.
pub fn cantrip_dice_count(caster_level: u8) -> u32 {
    CANTRIP_TIERS.iter().filter(|&&tier| tier <= caster_level).count() as u32
}

fn scaled(amount: i32, scale: Option<f64>) -> i32 {
    match scale {
        Some(scale) => (f64::from(amount) * scale).floor() as i32,
        None => amount,
    }
}

impl SpellEffect {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            targets: TargetMode::default(),
            kind,
        }
    }

    pub fn heal(dice: Dice) -> Self {
        Self::new(EffectKind::Heal { dice })
    }

    pub fn damage(dice: Dice, damage_type: DamageType) -> Self {
        Self::new(EffectKind::Damage { dice, damage_type })
    }

    pub fn cantrip_damage(dice: Dice, damage_type: DamageType) -> Self {
        Self::new(EffectKind::CantripDamage { dice, damage_type })
    }

    /// All-or-nothing save against `effect`.
    pub fn saving_throw(ability: Ability, effect: SpellEffect) -> Self {
        Self::new(EffectKind::SavingThrow {
            ability,
            effect: Box::new(effect),
            multiplier: None,
        })
    }

    pub fn piped(source: SpellEffect, sink: SpellEffect) -> Self {
        Self::new(EffectKind::Piped {
            source: Box::new(source),
            sink: Box::new(sink),
        })
    }

    /// On a successful save the inner effect still lands, scaled.
    /// Only meaningful on a saving throw node.
    pub fn on_save(mut self, scale: f64) -> Self {
        if let EffectKind::SavingThrow { multiplier, .. } = &mut self.kind {
            *multiplier = Some(scale);
        }
        self
    }

    pub fn on_caster(mut self) -> Self {
        self.targets = TargetMode::SelfOnly;
        self
    }

    pub fn with_target_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.targets = TargetMode::Supplied { min, max };
        self
    }

    /// Validate target counts through the whole tree.
    pub fn check_targets(&self, caster: usize, supplied: &[usize]) -> Result<(), RulesError> {
        let targets = self.targets.resolve(caster, supplied)?;
        match &self.kind {
            EffectKind::SavingThrow { effect, .. } => {
                for target in targets {
                    effect.check_targets(caster, &[target])?;
                }
                Ok(())
            }
            EffectKind::Piped { source, sink } => {
                source.check_targets(caster, &targets)?;
                sink.check_targets(caster, &targets)
            }
            _ => Ok(()),
        }
    }

    /// Apply the effect, returning its magnitude: hit points restored or
    /// damage actually taken, summed over targets.
    pub fn activate(
        &self,
        roster: &mut [Combatant],
        cast: &Casting,
        supplied: &[usize],
        ctx: &mut ActionContext<'_>,
    ) -> Result<i32, RulesError> {
        self.apply(roster, cast, supplied, None, None, ctx)
    }

    fn apply(
        &self,
        roster: &mut [Combatant],
        cast: &Casting,
        supplied: &[usize],
        piped: Option<i32>,
        scale: Option<f64>,
        ctx: &mut ActionContext<'_>,
    ) -> Result<i32, RulesError> {
        let targets = self.targets.resolve(cast.caster, supplied)?;

        match &self.kind {
            EffectKind::Heal { dice } => {
                let amount = piped.unwrap_or_else(|| roll_amount(dice, u32::from(cast.level), cast, ctx));
                let amount = scaled(amount, scale);
                let mut total = 0;
                for target in targets {
                    let healed = roster[target].heal(amount);
                    ctx.log(format!(
                        "{} heals {} for {} ({} HP)",
                        cast.spell,
                        roster[target].name,
                        healed,
                        roster[target].hp()
                    ));
                    total += healed;
                }
                Ok(total)
            }

            EffectKind::Damage { dice, damage_type } => {
                let amount = piped.unwrap_or_else(|| roll_amount(dice, u32::from(cast.level), cast, ctx));
                Ok(deal_damage(roster, cast, &targets, scaled(amount, scale), *damage_type, ctx))
            }

            EffectKind::CantripDamage { dice, damage_type } => {
                let count = cantrip_dice_count(cast.caster_level);
                let amount = piped.unwrap_or_else(|| roll_amount(dice, count, cast, ctx));
                Ok(deal_damage(roster, cast, &targets, scaled(amount, scale), *damage_type, ctx))
            }

            EffectKind::SavingThrow {
                ability,
                effect,
                multiplier,
            } => {
                let mut total = 0;
                for target in targets {
                    let save = roster[target].saving_throw(*ability, cast.spell_dc, ctx.rolls());
                    ctx.log(format!(
                        "{} {} a DC {} {} save against {} ({})",
                        roster[target].name,
                        if save.success { "makes" } else { "fails" },
                        save.dc,
                        ability.abbreviation(),
                        cast.spell,
                        save.total
                    ));
                    let scale = match (save.success, multiplier) {
                        (false, _) => scale,
                        (true, Some(multiplier)) => Some(scale.unwrap_or(1.0) * multiplier),
                        (true, None) => continue,
                    };
                    total += effect.apply(roster, cast, &[target], piped, scale, ctx)?;
                }
                Ok(total)
            }

            EffectKind::Piped { source, sink } => {
                let magnitude = source.apply(roster, cast, &targets, piped, scale, ctx)?;
                if magnitude != 0 {
                    sink.apply(roster, cast, &targets, Some(magnitude), None, ctx)
                } else {
                    sink.apply(roster, cast, &targets, None, scale, ctx)
                }
            }
        }
    }
}

fn roll_amount(dice: &Dice, times: u32, cast: &Casting, ctx: &mut ActionContext<'_>) -> i32 {
    (dice.repeated(times).total(ctx.rolls()) + cast.spellcasting_bonus).max(0)
}

fn deal_damage(
    roster: &mut [Combatant],
    cast: &Casting,
    targets: &[usize],
    amount: i32,
    damage_type: DamageType,
    ctx: &mut ActionContext<'_>,
) -> i32 {
    let mut total = 0;
    for &target in targets {
        let taken = roster[target].take_damage(amount, damage_type);
        ctx.log(format!(
            "{} takes {} {} damage from {} ({} HP)",
            roster[target].name,
            taken,
            damage_type,
            cast.spell,
            roster[target].hp()
        ));
        total += taken;
    }
    total
}

// ============================================================================
// Spells
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    pub name: String,
    /// Minimum slot level; 0 for cantrips.
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub school: SpellSchool,
    #[serde(default)]
    pub casting_time: CastingTime,
    /// Range in feet.
    #[serde(default)]
    pub range: u32,
    #[serde(default)]
    pub area: Area,
    #[serde(default)]
    pub effects: Vec<SpellEffect>,
}

impl Spell {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: 0,
            school: SpellSchool::default(),
            casting_time: CastingTime::default(),
            range: 0,
            area: Area::default(),
            effects: Vec::new(),
        }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn with_school(mut self, school: SpellSchool) -> Self {
        self.school = school;
        self
    }

    pub fn with_casting_time(mut self, casting_time: CastingTime) -> Self {
        self.casting_time = casting_time;
        self
    }

    pub fn with_range(mut self, range: u32) -> Self {
        self.range = range;
        self
    }

    pub fn with_area(mut self, area: Area) -> Self {
        self.area = area;
        self
    }

    pub fn with_effect(mut self, effect: SpellEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }
}

// ============================================================================
// Spell Database
// ============================================================================

static SPELL_DATABASE: LazyLock<HashMap<String, Spell>> = LazyLock::new(build_spell_database);

/// Look up a spell by name (case-insensitive).
pub fn get_spell(name: &str) -> Option<&'static Spell> {
    SPELL_DATABASE.get(&name.to_lowercase())
}

pub fn all_spells() -> impl Iterator<Item = &'static Spell> {
    SPELL_DATABASE.values()
}

pub fn spells_by_level(level: u8) -> impl Iterator<Item = &'static Spell> {
    SPELL_DATABASE.values().filter(move |s| s.level == level)
}

fn build_spell_database() -> HashMap<String, Spell> {
    let spells = [
        // Cantrips
        Spell::new("Acid Splash")
            .with_range(60)
            .with_area(Area::sphere(5).with_max_targets(2))
            .with_effect(SpellEffect::saving_throw(
                Ability::Dexterity,
                SpellEffect::cantrip_damage(Dice::new(1, 6), DamageType::Acid),
            )),
        Spell::new("Sacred Flame")
            .with_school(SpellSchool::Evocation)
            .with_range(60)
            .with_area(Area::single())
            .with_effect(SpellEffect::saving_throw(
                Ability::Dexterity,
                SpellEffect::cantrip_damage(Dice::new(1, 8), DamageType::Radiant),
            )),
        // 1st level
        Spell::new("Cure Wounds")
            .with_level(1)
            .with_school(SpellSchool::Evocation)
            .with_range(5)
            .with_area(Area::single())
            .with_effect(SpellEffect::heal(Dice::new(1, 8))),
        Spell::new("Healing Word")
            .with_level(1)
            .with_school(SpellSchool::Evocation)
            .with_casting_time(CastingTime::BonusAction)
            .with_range(60)
            .with_area(Area::single())
            .with_effect(SpellEffect::heal(Dice::new(1, 4))),
        Spell::new("Inflict Wounds")
            .with_level(1)
            .with_school(SpellSchool::Necromancy)
            .with_range(5)
            .with_area(Area::single())
            .with_effect(SpellEffect::damage(Dice::new(3, 10), DamageType::Necrotic)),
        Spell::new("Thunderwave")
            .with_level(1)
            .with_school(SpellSchool::Evocation)
            .with_range(15)
            .with_area(Area::sphere(15))
            .with_effect(
                SpellEffect::saving_throw(
                    Ability::Constitution,
                    SpellEffect::damage(Dice::new(2, 8), DamageType::Thunder),
                )
                .on_save(0.5),
            ),
        // 3rd level
        Spell::new("Vampiric Touch")
            .with_level(3)
            .with_school(SpellSchool::Necromancy)
            .with_range(5)
            .with_area(Area::single())
            .with_effect(SpellEffect::piped(
                SpellEffect::damage(Dice::new(1, 6), DamageType::Necrotic),
                SpellEffect::heal(Dice::new(1, 6)).on_caster(),
            )),
    ];

    spells
        .into_iter()
        .map(|spell| (spell.name.to_lowercase(), spell))
        .collect()
}
