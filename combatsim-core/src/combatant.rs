//! Combat participants.
//!
//! A [`Combatant`] is built from a [`CombatantConfig`]. Every config field
//! has a default, so a partial definition still yields a playable creature;
//! contradictory definitions are rejected with a [`ConfigError`].
//!
//! Combatants never leave the roster. A combatant at 0 hit points is either
//! [`LifeState::Unconscious`] or [`LifeState::Dead`]; both are inert.

use crate::ability::{Ability, AbilityScore, AbilityScores};
use crate::dice::{Advantage, Dice, RollSource, SharedModifier};
use crate::grid::Position;
use crate::items::{Armor, DamageType, Weapon};
use crate::spells::Spell;
use crate::tactics::Tactics;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Highest level a config may ask for.
pub const MAX_LEVEL: u8 = 30;

// ============================================================================
// Identity
// ============================================================================

/// Unique identifier for combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Side in a fight. Combatants without a team are hostile to everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Team(pub u32);

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team {}", self.0)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{ability} was given both a score ({score}) and a bonus ({bonus:+})")]
    ConflictingAbility {
        ability: Ability,
        score: u8,
        bonus: i32,
    },

    #[error("{ability} score {score} is outside 1-30")]
    ScoreOutOfRange { ability: Ability, score: u8 },

    #[error("{ability} bonus {bonus:+} is outside -5 to +10")]
    BonusOutOfRange { ability: Ability, bonus: i32 },

    #[error("Cannot have both a flat armor class ({armor_class}) and worn armor ({armor})")]
    ConflictingArmor { armor_class: i32, armor: String },

    #[error("Maximum hit points must be at least 1, got {0}")]
    InvalidMaxHp(i32),

    #[error("Level {0} is above the maximum of 30")]
    LevelOutOfRange(u8),
}

// ============================================================================
// Hit Points
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub maximum: i32,
}

impl HitPoints {
    pub fn new(maximum: i32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    /// Lose up to `amount` hit points, stopping at 0.
    pub fn take_damage(&mut self, amount: i32) -> DamageResult {
        let amount = amount.max(0);
        let before = self.current;
        self.current = (self.current - amount).max(0);
        DamageResult {
            damage_taken: before - self.current,
            overflow: amount - before,
            dropped_to_zero: before > 0 && self.current == 0,
        }
    }

    /// Regain up to `amount` hit points, stopping at the maximum.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let old = self.current;
        self.current = (self.current + amount.max(0)).min(self.maximum);
        self.current - old
    }

    pub fn is_damaged(&self) -> bool {
        self.current < self.maximum
    }
}

/// Result of taking damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageResult {
    pub damage_taken: i32,
    /// How far the damage went past 0 hit points (negative if it did not).
    pub overflow: i32,
    pub dropped_to_zero: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeState {
    Conscious,
    Unconscious,
    Dead,
}

// ============================================================================
// Spell Slots
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotInfo {
    pub total: u8,
    pub used: u8,
}

impl SlotInfo {
    pub fn available(&self) -> u8 {
        self.total.saturating_sub(self.used)
    }
}

/// Spell slot tracking, one entry per spell level starting at level 1.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpellSlots {
    pub slots: Vec<SlotInfo>,
}

impl SpellSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// `counts[0]` level 1 slots, `counts[1]` level 2 slots, and so on.
    pub fn from_counts(counts: &[u8]) -> Self {
        Self {
            slots: counts
                .iter()
                .map(|&total| SlotInfo { total, used: 0 })
                .collect(),
        }
    }

    /// Remaining slots of `level`. Level 0 and unknown levels have none.
    pub fn available(&self, level: u8) -> u8 {
        self.slot(level).map(SlotInfo::available).unwrap_or(0)
    }

    pub fn use_slot(&mut self, level: u8) -> bool {
        if level == 0 {
            return false;
        }
        match self.slots.get_mut(level as usize - 1) {
            Some(slot) if slot.available() > 0 => {
                slot.used += 1;
                true
            }
            _ => false,
        }
    }

    fn slot(&self, level: u8) -> Option<&SlotInfo> {
        if level == 0 {
            return None;
        }
        self.slots.get(level as usize - 1)
    }
}

// ============================================================================
// Class Rules
// ============================================================================

/// How maximum hit points are derived when not given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitPointFormula {
    /// Roll the hit die once per level.
    #[default]
    Rolled,
    /// Take the maximum of the hit die at first level, roll the rest.
    MaxFirstLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponProficiency {
    #[default]
    None,
    All,
    /// Proficient with weapons of these names (case-insensitive).
    Named(Vec<String>),
}

/// The parts of a creature's rules that differ between monsters and
/// player characters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassRules {
    pub hit_points: HitPointFormula,
    pub weapon_proficiency: WeaponProficiency,
}

impl ClassRules {
    /// Monsters roll every hit die and never add proficiency to attacks.
    pub fn monster() -> Self {
        Self {
            hit_points: HitPointFormula::Rolled,
            weapon_proficiency: WeaponProficiency::None,
        }
    }

    /// Characters take a full first hit die and know every weapon.
    pub fn character() -> Self {
        Self {
            hit_points: HitPointFormula::MaxFirstLevel,
            weapon_proficiency: WeaponProficiency::All,
        }
    }

    pub fn is_proficient(&self, weapon: &Weapon) -> bool {
        match &self.weapon_proficiency {
            WeaponProficiency::None => false,
            WeaponProficiency::All => true,
            WeaponProficiency::Named(names) => names
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&weapon.name)),
        }
    }

    /// Maximum hit points for `level` levels of `hit_die`, never below 1.
    pub fn roll_max_hp(
        &self,
        hit_die: &Dice,
        level: u8,
        con_bonus: i32,
        rolls: &mut dyn RollSource,
    ) -> i32 {
        let levels = i32::from(level.max(1));
        let mut total = con_bonus.saturating_mul(levels);
        let rolled_levels = match self.hit_points {
            HitPointFormula::Rolled => levels,
            HitPointFormula::MaxFirstLevel => {
                total = total.saturating_add(hit_die.max());
                levels - 1
            }
        };
        for _ in 0..rolled_levels {
            total = total.saturating_add(hit_die.total(rolls));
        }
        total.max(1)
    }
}

/// Proficiency bonus for a level: +2 at levels 1-4, +3 at 5-8, and so on.
pub fn proficiency_for_level(level: u8) -> i32 {
    1 + (i32::from(level) + 3) / 4
}

// ============================================================================
// Configuration
// ============================================================================

/// An ability given either as a raw score or as the bonus it should carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AbilityInput")]
pub struct AbilitySpec {
    pub score: Option<u8>,
    pub bonus: Option<i32>,
}

impl AbilitySpec {
    pub fn score(score: u8) -> Self {
        Self {
            score: Some(score),
            bonus: None,
        }
    }

    pub fn bonus(bonus: i32) -> Self {
        Self {
            score: None,
            bonus: Some(bonus),
        }
    }

    pub fn resolve(&self, ability: Ability) -> Result<AbilityScore, ConfigError> {
        match (self.score, self.bonus) {
            (Some(score), Some(bonus)) => Err(ConfigError::ConflictingAbility {
                ability,
                score,
                bonus,
            }),
            (Some(score), None) if !(AbilityScore::MIN..=AbilityScore::MAX).contains(&score) => {
                Err(ConfigError::ScoreOutOfRange { ability, score })
            }
            (Some(score), None) => Ok(AbilityScore::new(score)),
            (None, Some(bonus)) if !(AbilityScore::MIN_BONUS..=AbilityScore::MAX_BONUS).contains(&bonus) => {
                Err(ConfigError::BonusOutOfRange { ability, bonus })
            }
            (None, Some(bonus)) => Ok(AbilityScore::from_bonus(bonus)),
            (None, None) => Ok(AbilityScore::default()),
        }
    }
}

impl From<u8> for AbilitySpec {
    fn from(score: u8) -> Self {
        Self::score(score)
    }
}

/// Accepts `15` as well as `{"score": 15}` / `{"bonus": 2}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AbilityInput {
    Score(u8),
    Spec {
        #[serde(default)]
        score: Option<u8>,
        #[serde(default)]
        bonus: Option<i32>,
    },
}

impl From<AbilityInput> for AbilitySpec {
    fn from(input: AbilityInput) -> Self {
        match input {
            AbilityInput::Score(score) => Self::score(score),
            AbilityInput::Spec { score, bonus } => Self { score, bonus },
        }
    }
}

/// Everything needed to build a [`Combatant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatantConfig {
    pub name: String,
    pub level: u8,
    pub proficiency: Option<i32>,
    pub strength: AbilitySpec,
    pub dexterity: AbilitySpec,
    pub constitution: AbilitySpec,
    pub intelligence: AbilitySpec,
    pub wisdom: AbilitySpec,
    pub charisma: AbilitySpec,
    pub hit_die: Dice,
    pub max_hp: Option<i32>,
    pub armor_class: Option<i32>,
    pub armor: Option<Armor>,
    pub weapons: Vec<Weapon>,
    pub resistances: Vec<DamageType>,
    pub team: Option<Team>,
    pub spellcasting: Option<Ability>,
    pub spells: Vec<Spell>,
    pub spell_slots: Vec<u8>,
    pub initiative: Option<Dice>,
    pub position: Option<Position>,
    pub tactics: Tactics,
    pub rules: ClassRules,
}

impl Default for CombatantConfig {
    fn default() -> Self {
        Self {
            name: "Nameless".to_string(),
            level: 1,
            proficiency: None,
            strength: AbilitySpec::default(),
            dexterity: AbilitySpec::default(),
            constitution: AbilitySpec::default(),
            intelligence: AbilitySpec::default(),
            wisdom: AbilitySpec::default(),
            charisma: AbilitySpec::default(),
            hit_die: Dice::new(1, 8),
            max_hp: None,
            armor_class: None,
            armor: None,
            weapons: Vec::new(),
            resistances: Vec::new(),
            team: None,
            spellcasting: None,
            spells: Vec::new(),
            spell_slots: Vec::new(),
            initiative: None,
            position: None,
            tactics: Tactics::default(),
            rules: ClassRules::monster(),
        }
    }
}

impl CombatantConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a config from JSON; omitted fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn ability(&self, ability: Ability) -> AbilitySpec {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn with_score(self, ability: Ability, score: u8) -> Self {
        self.with_ability(ability, AbilitySpec::score(score))
    }

    pub fn with_ability(mut self, ability: Ability, spec: AbilitySpec) -> Self {
        match ability {
            Ability::Strength => self.strength = spec,
            Ability::Dexterity => self.dexterity = spec,
            Ability::Constitution => self.constitution = spec,
            Ability::Intelligence => self.intelligence = spec,
            Ability::Wisdom => self.wisdom = spec,
            Ability::Charisma => self.charisma = spec,
        }
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn with_proficiency(mut self, proficiency: i32) -> Self {
        self.proficiency = Some(proficiency);
        self
    }

    pub fn with_hit_die(mut self, hit_die: Dice) -> Self {
        self.hit_die = hit_die;
        self
    }

    pub fn with_max_hp(mut self, max_hp: i32) -> Self {
        self.max_hp = Some(max_hp);
        self
    }

    pub fn with_armor_class(mut self, armor_class: i32) -> Self {
        self.armor_class = Some(armor_class);
        self
    }

    pub fn with_armor(mut self, armor: Armor) -> Self {
        self.armor = Some(armor);
        self
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapons.push(weapon);
        self
    }

    pub fn with_resistance(mut self, damage_type: DamageType) -> Self {
        self.resistances.push(damage_type);
        self
    }

    pub fn with_team(mut self, team: Team) -> Self {
        self.team = Some(team);
        self
    }

    pub fn with_spellcasting(mut self, ability: Ability) -> Self {
        self.spellcasting = Some(ability);
        self
    }

    pub fn with_spell(mut self, spell: Spell) -> Self {
        self.spells.push(spell);
        self
    }

    pub fn with_spell_slots(mut self, slots: &[u8]) -> Self {
        self.spell_slots = slots.to_vec();
        self
    }

    pub fn with_initiative(mut self, initiative: Dice) -> Self {
        self.initiative = Some(initiative);
        self
    }

    pub fn at(mut self, position: impl Into<Position>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn with_tactics(mut self, tactics: Tactics) -> Self {
        self.tactics = tactics;
        self
    }

    pub fn with_rules(mut self, rules: ClassRules) -> Self {
        self.rules = rules;
        self
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// A d20 attack roll against armor class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRoll {
    pub natural: i32,
    pub total: i32,
    pub critical: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavingThrow {
    pub ability: Ability,
    pub natural: i32,
    pub total: i32,
    pub dc: i32,
    pub success: bool,
}

#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub level: u8,
    pub proficiency: i32,
    pub abilities: AbilityScores,
    hit_points: HitPoints,
    life: LifeState,
    armor: Option<Armor>,
    natural_armor: Option<i32>,
    weapons: Vec<Weapon>,
    pub resistances: HashSet<DamageType>,
    pub team: Option<Team>,
    pub spellcasting: Option<Ability>,
    spells: Vec<Spell>,
    pub spell_slots: SpellSlots,
    initiative: Option<Dice>,
    /// Situational bonus on attack rolls; clones of it stay in sync.
    pub roll_bonus: SharedModifier,
    pub position: Option<Position>,
    pub tactics: Tactics,
    pub rules: ClassRules,
}

impl Combatant {
    /// Build and validate a combatant. Hit points are rolled from `rolls`
    /// unless the config gives them.
    pub fn new(config: CombatantConfig, rolls: &mut dyn RollSource) -> Result<Self, ConfigError> {
        if config.level > MAX_LEVEL {
            return Err(ConfigError::LevelOutOfRange(config.level));
        }

        let mut abilities = AbilityScores::default();
        for ability in Ability::all() {
            abilities.set(ability, config.ability(ability).resolve(ability)?);
        }

        if let (Some(armor_class), Some(armor)) = (config.armor_class, &config.armor) {
            return Err(ConfigError::ConflictingArmor {
                armor_class,
                armor: armor.name.clone(),
            });
        }

        let max_hp = match config.max_hp {
            Some(max_hp) if max_hp < 1 => return Err(ConfigError::InvalidMaxHp(max_hp)),
            Some(max_hp) => max_hp,
            None => config.rules.roll_max_hp(
                &config.hit_die,
                config.level,
                abilities.bonus(Ability::Constitution),
                rolls,
            ),
        };

        let mut weapons = config.weapons;
        if weapons.is_empty() {
            weapons.push(Weapon::unarmed_strike());
        }

        Ok(Self {
            id: CombatantId::new(),
            name: config.name,
            level: config.level,
            proficiency: config
                .proficiency
                .unwrap_or_else(|| proficiency_for_level(config.level)),
            abilities,
            hit_points: HitPoints::new(max_hp),
            life: LifeState::Conscious,
            armor: config.armor,
            natural_armor: config.armor_class,
            weapons,
            resistances: config.resistances.into_iter().collect(),
            team: config.team,
            spellcasting: config.spellcasting,
            spells: config.spells,
            spell_slots: SpellSlots::from_counts(&config.spell_slots),
            initiative: config.initiative,
            roll_bonus: SharedModifier::default(),
            position: config.position,
            tactics: config.tactics,
            rules: config.rules,
        })
    }

    // ------------------------------------------------------------------
    // Abilities
    // ------------------------------------------------------------------

    pub fn ability(&self, ability: Ability) -> AbilityScore {
        self.abilities.get(ability)
    }

    pub fn bonus(&self, ability: Ability) -> i32 {
        self.abilities.bonus(ability)
    }

    pub fn set_ability_score(&mut self, ability: Ability, score: AbilityScore) {
        self.abilities.set(ability, score);
    }

    // ------------------------------------------------------------------
    // Hit points
    // ------------------------------------------------------------------

    pub fn hp(&self) -> i32 {
        self.hit_points.current
    }

    pub fn max_hp(&self) -> i32 {
        self.hit_points.maximum
    }

    pub fn hit_points(&self) -> HitPoints {
        self.hit_points
    }

    pub fn life_state(&self) -> LifeState {
        self.life
    }

    pub fn is_alive(&self) -> bool {
        self.hit_points.current > 0
    }

    pub fn is_dead(&self) -> bool {
        self.life == LifeState::Dead
    }

    pub fn is_resistant(&self, damage_type: DamageType) -> bool {
        self.resistances.contains(&damage_type)
    }

    /// Apply damage of a type, halving it (rounded down) on resistance.
    /// Returns the hit points actually lost.
    pub fn take_damage(&mut self, amount: i32, damage_type: DamageType) -> i32 {
        let amount = amount.max(0);
        let amount = if self.is_resistant(damage_type) {
            amount / 2
        } else {
            amount
        };
        self.lose_hit_points(amount)
    }

    fn lose_hit_points(&mut self, amount: i32) -> i32 {
        if self.life == LifeState::Dead {
            return 0;
        }
        let result = self.hit_points.take_damage(amount);
        if self.hit_points.current == 0 {
            self.life = if result.overflow >= self.hit_points.maximum {
                LifeState::Dead
            } else {
                LifeState::Unconscious
            };
        }
        result.damage_taken
    }

    /// Regain hit points. The dead regain nothing.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if self.life == LifeState::Dead {
            return 0;
        }
        let gained = self.hit_points.heal(amount);
        if self.hit_points.current > 0 {
            self.life = LifeState::Conscious;
        }
        gained
    }

    // ------------------------------------------------------------------
    // Armor
    // ------------------------------------------------------------------

    /// Worn armor first, then natural armor, then 10 + dexterity.
    pub fn armor_class(&self) -> i32 {
        let dex = self.bonus(Ability::Dexterity);
        match (&self.armor, self.natural_armor) {
            (Some(armor), _) => armor.armor_class(dex),
            (None, Some(natural)) => natural,
            (None, None) => 10 + dex,
        }
    }

    pub fn armor(&self) -> Option<&Armor> {
        self.armor.as_ref()
    }

    /// Put on armor, returning whatever was worn before.
    pub fn equip_armor(&mut self, armor: Armor) -> Option<Armor> {
        self.armor.replace(armor)
    }

    pub fn unequip_armor(&mut self) -> Option<Armor> {
        self.armor.take()
    }

    // ------------------------------------------------------------------
    // Weapons
    // ------------------------------------------------------------------

    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    pub fn weapon(&self, index: usize) -> Option<&Weapon> {
        self.weapons.get(index)
    }

    /// Add a weapon. The default unarmed strike is replaced by the first
    /// real weapon.
    pub fn equip_weapon(&mut self, weapon: Weapon) {
        if self.weapons.len() == 1 && self.weapons[0].is_unarmed() {
            self.weapons.clear();
        }
        self.weapons.push(weapon);
    }

    pub fn is_proficient(&self, weapon: &Weapon) -> bool {
        self.rules.is_proficient(weapon)
    }

    /// Finesse weapons use the better of strength and dexterity; other
    /// melee weapons use strength and ranged weapons dexterity.
    pub fn weapon_ability_bonus(&self, weapon: &Weapon) -> i32 {
        let strength = self.bonus(Ability::Strength);
        let dexterity = self.bonus(Ability::Dexterity);
        if weapon.is_finesse() {
            strength.max(dexterity)
        } else if weapon.melee {
            strength
        } else {
            dexterity
        }
    }

    pub fn attack_modifier(&self, weapon: &Weapon) -> i32 {
        let base = weapon
            .attack_mod
            .unwrap_or_else(|| self.weapon_ability_bonus(weapon));
        let proficiency = if self.is_proficient(weapon) {
            self.proficiency
        } else {
            0
        };
        base + proficiency + self.roll_bonus.get()
    }

    pub fn damage_modifier(&self, weapon: &Weapon) -> i32 {
        weapon
            .damage_mod
            .unwrap_or_else(|| self.weapon_ability_bonus(weapon))
    }

    /// Roll to hit with a weapon. A natural 20 is a critical hit.
    pub fn attack_roll(
        &self,
        weapon: &Weapon,
        advantage: Advantage,
        rolls: &mut dyn RollSource,
    ) -> AttackRoll {
        let natural = roll_d20(advantage, rolls);
        AttackRoll {
            natural,
            total: natural + self.attack_modifier(weapon),
            critical: natural == 20,
        }
    }

    /// Roll weapon damage; a critical doubles the dice, not the total.
    pub fn damage_roll(&self, weapon: &Weapon, critical: bool, rolls: &mut dyn RollSource) -> i32 {
        let dice = if critical {
            weapon.damage.repeated(2)
        } else {
            weapon.damage.clone()
        };
        (dice.total(rolls) + self.damage_modifier(weapon)).max(0)
    }

    // ------------------------------------------------------------------
    // Spellcasting
    // ------------------------------------------------------------------

    pub fn spells(&self) -> &[Spell] {
        &self.spells
    }

    pub fn spell(&self, name: &str) -> Option<&Spell> {
        self.spells
            .iter()
            .find(|spell| spell.name.eq_ignore_ascii_case(name))
    }

    pub fn knows_spell(&self, name: &str) -> bool {
        self.spell(name).is_some()
    }

    pub fn learn_spell(&mut self, spell: Spell) {
        if !self.knows_spell(&spell.name) {
            self.spells.push(spell);
        }
    }

    /// Bonus of the spellcasting ability, 0 for non-casters.
    pub fn spellcasting_bonus(&self) -> i32 {
        self.spellcasting
            .map(|ability| self.bonus(ability))
            .unwrap_or(0)
    }

    pub fn spell_dc(&self) -> i32 {
        8 + self.proficiency + self.spellcasting_bonus()
    }

    /// Whether a spell of `level` could be cast right now, slots permitting.
    pub fn can_cast_at(&self, level: u8) -> bool {
        level == 0 || self.spell_slots.available(level) > 0
    }

    // ------------------------------------------------------------------
    // Rolls
    // ------------------------------------------------------------------

    pub fn saving_throw(&self, ability: Ability, dc: i32, rolls: &mut dyn RollSource) -> SavingThrow {
        let natural = roll_d20(Advantage::Normal, rolls);
        let total = natural + self.bonus(ability);
        SavingThrow {
            ability,
            natural,
            total,
            dc,
            success: total >= dc,
        }
    }

    /// Initiative dice, by default `1d20` plus the current dexterity bonus.
    pub fn initiative_dice(&self) -> Dice {
        match &self.initiative {
            Some(dice) => dice.clone(),
            None => Dice::new(1, 20) + self.bonus(Ability::Dexterity),
        }
    }

    pub fn roll_initiative(&self, rolls: &mut dyn RollSource) -> i32 {
        self.initiative_dice().total(rolls)
    }

    // ------------------------------------------------------------------
    // Sides
    // ------------------------------------------------------------------

    /// Same team. Unaffiliated combatants have no allies.
    pub fn is_ally_of(&self, other: &Combatant) -> bool {
        self.id != other.id && self.team.is_some() && self.team == other.team
    }

    pub fn is_enemy_of(&self, other: &Combatant) -> bool {
        self.id != other.id && !self.is_ally_of(other)
    }

    pub fn distance_to(&self, other: &Combatant) -> Option<f64> {
        Some(self.position?.distance_to(other.position?))
    }
}

impl fmt::Display for Combatant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (HP {}/{}, AC {})",
            self.name,
            self.hp(),
            self.max_hp(),
            self.armor_class()
        )
    }
}

fn roll_d20(advantage: Advantage, rolls: &mut dyn RollSource) -> i32 {
    let d20 = Dice::new(1, 20);
    match advantage {
        Advantage::Normal => d20.total(rolls),
        Advantage::Advantage => d20.repeated(2).roll(rolls).into_iter().max().unwrap_or(1),
        Advantage::Disadvantage => d20.repeated(2).roll(rolls).into_iter().min().unwrap_or(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{get_weapon, ArmorType};
    use crate::testing::ScriptedRolls;

    fn build(config: CombatantConfig) -> Combatant {
        Combatant::new(config, &mut ScriptedRolls::constant(1)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let c = build(CombatantConfig::default());
        assert_eq!(c.name, "Nameless");
        assert_eq!(c.level, 1);
        assert_eq!(c.proficiency, 2);
        assert_eq!(c.armor_class(), 10);
        assert_eq!(c.weapons().len(), 1);
        assert!(c.weapons()[0].is_unarmed());
        assert_eq!(c.team, None);
        assert_eq!(c.spellcasting_bonus(), 0);
        assert_eq!(c.life_state(), LifeState::Conscious);
    }

    #[test]
    fn test_proficiency_by_level() {
        assert_eq!(proficiency_for_level(1), 2);
        assert_eq!(proficiency_for_level(4), 2);
        assert_eq!(proficiency_for_level(5), 3);
        assert_eq!(proficiency_for_level(17), 6);
        assert_eq!(build(CombatantConfig::default().with_proficiency(7)).proficiency, 7);
    }

    #[test]
    fn test_conflicting_ability_rejected() {
        let config = CombatantConfig::default().with_ability(
            Ability::Strength,
            AbilitySpec {
                score: Some(15),
                bonus: Some(2),
            },
        );
        let err = Combatant::new(config, &mut ScriptedRolls::constant(1)).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingAbility { ability: Ability::Strength, .. }));
    }

    #[test]
    fn test_ability_score_range() {
        let config = CombatantConfig::default().with_score(Ability::Wisdom, 31);
        assert_eq!(
            Combatant::new(config, &mut ScriptedRolls::constant(1)).unwrap_err(),
            ConfigError::ScoreOutOfRange {
                ability: Ability::Wisdom,
                score: 31
            }
        );
    }

    #[test]
    fn test_ability_bonus_range() {
        let config = CombatantConfig::default().with_ability(Ability::Strength, AbilitySpec::bonus(i32::MAX));
        assert_eq!(
            Combatant::new(config, &mut ScriptedRolls::constant(1)).unwrap_err(),
            ConfigError::BonusOutOfRange {
                ability: Ability::Strength,
                bonus: i32::MAX
            }
        );

        let json = CombatantConfig::from_json(r#"{"charisma": {"bonus": -6}}"#).unwrap();
        assert!(matches!(
            Combatant::new(json, &mut ScriptedRolls::constant(1)),
            Err(ConfigError::BonusOutOfRange { ability: Ability::Charisma, bonus: -6 })
        ));
        let edge = CombatantConfig::default().with_ability(Ability::Strength, AbilitySpec::bonus(10));
        assert_eq!(build(edge).bonus(Ability::Strength), 10);
    }

    #[test]
    fn test_oversized_hit_die_does_not_overflow() {
        let config = CombatantConfig::default()
            .with_hit_die(Dice::new(70000, 70000))
            .with_level(2)
            .with_rules(ClassRules::character());
        let c = build(config);
        assert_eq!(c.max_hp(), i32::MAX);

        let json = r#"{"hit_die": "70000d70000", "rules": {"hit_points": "max_first_level"}}"#;
        assert!(CombatantConfig::from_json(json).is_err());
    }

    #[test]
    fn test_ability_from_bonus() {
        let c = build(CombatantConfig::default().with_ability(Ability::Dexterity, AbilitySpec::bonus(3)));
        assert_eq!(c.bonus(Ability::Dexterity), 3);
        assert_eq!(c.armor_class(), 13);
    }

    #[test]
    fn test_conflicting_armor_rejected() {
        let config = CombatantConfig::default()
            .with_armor_class(14)
            .with_armor(Armor::new("Leather Armor", ArmorType::Light, 11));
        assert!(matches!(
            Combatant::new(config, &mut ScriptedRolls::constant(1)),
            Err(ConfigError::ConflictingArmor { armor_class: 14, .. })
        ));
    }

    #[test]
    fn test_invalid_max_hp() {
        assert_eq!(
            Combatant::new(CombatantConfig::default().with_max_hp(0), &mut ScriptedRolls::constant(1))
                .unwrap_err(),
            ConfigError::InvalidMaxHp(0)
        );
    }

    #[test]
    fn test_level_out_of_range() {
        assert_eq!(
            Combatant::new(CombatantConfig::default().with_level(31), &mut ScriptedRolls::constant(1))
                .unwrap_err(),
            ConfigError::LevelOutOfRange(31)
        );
    }

    #[test]
    fn test_armor_class_sources() {
        let flat = build(CombatantConfig::default().with_armor_class(14));
        assert_eq!(flat.armor_class(), 14);

        let natural = build(
            CombatantConfig::default()
                .with_score(Ability::Dexterity, 15)
                .with_armor(Armor::custom("Natural", 12, Some(0))),
        );
        assert_eq!(natural.armor_class(), 12);

        let uncapped = build(
            CombatantConfig::default()
                .with_score(Ability::Dexterity, 20)
                .with_armor(Armor::custom("Test", 12, None)),
        );
        assert_eq!(uncapped.armor_class(), 17);
    }

    #[test]
    fn test_equip_armor_returns_previous() {
        let mut c = build(CombatantConfig::default().with_score(Ability::Dexterity, 14));
        assert_eq!(c.armor_class(), 12);
        assert!(c.equip_armor(Armor::new("Chain Mail", ArmorType::Heavy, 16)).is_none());
        assert_eq!(c.armor_class(), 16);
        let previous = c.equip_armor(Armor::new("Leather Armor", ArmorType::Light, 11));
        assert_eq!(previous.map(|a| a.name), Some("Chain Mail".to_string()));
        assert_eq!(c.armor_class(), 13);
        c.unequip_armor();
        assert_eq!(c.armor_class(), 12);
    }

    #[test]
    fn test_max_hp_is_at_least_one() {
        let c = build(
            CombatantConfig::default()
                .with_hit_die(Dice::new(1, 1))
                .with_score(Ability::Constitution, 2),
        );
        assert_eq!(c.max_hp(), 1);
        assert_eq!(c.hp(), 1);
    }

    #[test]
    fn test_hit_point_formulas() {
        let monster = ClassRules::monster();
        let character = ClassRules::character();
        let d8 = Dice::new(1, 8);

        // Three levels of 1d8 rolling 4 each, +1 con per level.
        let mut rolls = ScriptedRolls::constant(4);
        assert_eq!(monster.roll_max_hp(&d8, 3, 1, &mut rolls), 15);
        assert_eq!(character.roll_max_hp(&d8, 3, 1, &mut rolls), 8 + 4 + 4 + 3);
        assert_eq!(character.roll_max_hp(&d8, 1, 0, &mut rolls), 8);
    }

    #[test]
    fn test_spell_dc() {
        let c = build(
            CombatantConfig::default()
                .with_score(Ability::Wisdom, 12)
                .with_spellcasting(Ability::Wisdom)
                .with_proficiency(2),
        );
        assert_eq!(c.spellcasting_bonus(), 1);
        assert_eq!(c.spell_dc(), 11);
    }

    #[test]
    fn test_take_damage_and_resistance() {
        let mut c = build(CombatantConfig::default().with_max_hp(6));
        assert_eq!(c.take_damage(1, DamageType::Acid), 1);
        assert_eq!(c.hp(), 5);

        let mut resistant = build(
            CombatantConfig::default()
                .with_max_hp(6)
                .with_resistance(DamageType::Acid),
        );
        assert_eq!(resistant.take_damage(1, DamageType::Acid), 0);
        assert_eq!(resistant.hp(), 6);
        assert_eq!(resistant.take_damage(3, DamageType::Acid), 1);
        assert_eq!(resistant.hp(), 5);
        assert_eq!(resistant.take_damage(3, DamageType::Fire), 3);
        assert_eq!(resistant.hp(), 2);
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut c = build(CombatantConfig::default().with_max_hp(10));
        assert_eq!(c.take_damage(14, DamageType::Slashing), 10);
        assert_eq!(c.hp(), 0);
        assert!(!c.is_alive());
        assert_eq!(c.life_state(), LifeState::Unconscious);
        assert_eq!(c.take_damage(-5, DamageType::Slashing), 0);
        assert_eq!(c.hp(), 0);
    }

    #[test]
    fn test_massive_damage_kills() {
        let mut c = build(CombatantConfig::default().with_max_hp(10));
        c.take_damage(20, DamageType::Slashing);
        assert_eq!(c.life_state(), LifeState::Dead);
        assert_eq!(c.heal(5), 0);
        assert_eq!(c.hp(), 0);
    }

    #[test]
    fn test_damage_while_down_can_kill() {
        let mut c = build(CombatantConfig::default().with_max_hp(10));
        c.take_damage(10, DamageType::Slashing);
        assert_eq!(c.life_state(), LifeState::Unconscious);
        c.take_damage(9, DamageType::Slashing);
        assert_eq!(c.life_state(), LifeState::Unconscious);
        c.take_damage(10, DamageType::Slashing);
        assert!(c.is_dead());
    }

    #[test]
    fn test_heal_clamps_and_revives() {
        let mut c = build(CombatantConfig::default().with_max_hp(10));
        c.take_damage(10, DamageType::Slashing);
        assert_eq!(c.heal(4), 4);
        assert_eq!(c.life_state(), LifeState::Conscious);
        assert_eq!(c.heal(100), 6);
        assert_eq!(c.hp(), 10);
        assert_eq!(c.heal(-3), 0);
    }

    #[test]
    fn test_weapon_ability_bonus() {
        let c = build(
            CombatantConfig::default()
                .with_score(Ability::Strength, 16)
                .with_score(Ability::Dexterity, 12),
        );
        let dagger = get_weapon("Dagger").unwrap();
        let bow = get_weapon("Shortbow").unwrap();
        let club = get_weapon("Club").unwrap();
        assert_eq!(c.weapon_ability_bonus(&dagger), 3);
        assert_eq!(c.weapon_ability_bonus(&bow), 1);
        assert_eq!(c.weapon_ability_bonus(&club), 3);
    }

    #[test]
    fn test_monsters_skip_proficiency() {
        let club = get_weapon("Club").unwrap();
        let monster = build(CombatantConfig::default().with_score(Ability::Strength, 14));
        let hero = build(
            CombatantConfig::default()
                .with_score(Ability::Strength, 14)
                .with_rules(ClassRules::character()),
        );
        assert_eq!(monster.attack_modifier(&club), 2);
        assert_eq!(hero.attack_modifier(&club), 4);
    }

    #[test]
    fn test_named_proficiency() {
        let rules = ClassRules {
            weapon_proficiency: WeaponProficiency::Named(vec!["longsword".to_string()]),
            ..ClassRules::default()
        };
        assert!(rules.is_proficient(&get_weapon("Longsword").unwrap()));
        assert!(!rules.is_proficient(&get_weapon("Club").unwrap()));
    }

    #[test]
    fn test_attack_roll_override_and_bonus() {
        let weapon = Weapon::new("Claw", Dice::new(1, 4), DamageType::Slashing).with_attack_mod(5);
        let c = build(CombatantConfig::default().with_weapon(weapon.clone()));

        let roll = c.attack_roll(&weapon, Advantage::Normal, &mut ScriptedRolls::new([5]));
        assert_eq!(roll.total, 10);
        assert!(!roll.critical);

        c.roll_bonus.set(2);
        let roll = c.attack_roll(&weapon, Advantage::Normal, &mut ScriptedRolls::new([5]));
        assert_eq!(roll.total, 12);
    }

    #[test]
    fn test_attack_roll_advantage() {
        let weapon = Weapon::new("Claw", Dice::new(1, 4), DamageType::Slashing).with_attack_mod(0);
        let c = build(CombatantConfig::default());
        let adv = c.attack_roll(&weapon, Advantage::Advantage, &mut ScriptedRolls::new([3, 17]));
        assert_eq!(adv.natural, 17);
        let dis = c.attack_roll(&weapon, Advantage::Disadvantage, &mut ScriptedRolls::new([3, 17]));
        assert_eq!(dis.natural, 3);
    }

    #[test]
    fn test_critical_is_natural_only() {
        let weapon = Weapon::new("Claw", Dice::new(1, 4), DamageType::Slashing).with_attack_mod(5);
        let c = build(CombatantConfig::default());
        assert!(c.attack_roll(&weapon, Advantage::Normal, &mut ScriptedRolls::new([20])).critical);
        let modified = c.attack_roll(&weapon, Advantage::Normal, &mut ScriptedRolls::new([15]));
        assert_eq!(modified.total, 20);
        assert!(!modified.critical);
    }

    #[test]
    fn test_critical_doubles_dice() {
        let weapon = Weapon::new("Claw", Dice::new(1, 6), DamageType::Slashing).with_damage_mod(2);
        let c = build(CombatantConfig::default());
        assert_eq!(c.damage_roll(&weapon, false, &mut ScriptedRolls::constant(6)), 8);
        assert_eq!(c.damage_roll(&weapon, true, &mut ScriptedRolls::constant(6)), 14);
    }

    #[test]
    fn test_damage_roll_never_negative() {
        let weapon = Weapon::new("Twig", Dice::new(1, 1), DamageType::Bludgeoning).with_damage_mod(-4);
        let c = build(CombatantConfig::default());
        assert_eq!(c.damage_roll(&weapon, false, &mut ScriptedRolls::constant(1)), 0);
    }

    #[test]
    fn test_saving_throw() {
        let c = build(CombatantConfig::default().with_score(Ability::Dexterity, 14));
        let save = c.saving_throw(Ability::Dexterity, 12, &mut ScriptedRolls::new([10]));
        assert_eq!(save.total, 12);
        assert!(save.success);
        let save = c.saving_throw(Ability::Dexterity, 12, &mut ScriptedRolls::new([9]));
        assert!(!save.success);
    }

    #[test]
    fn test_initiative() {
        let fixed = build(CombatantConfig::default().with_initiative(Dice::new(1, 1) + 3));
        assert_eq!(fixed.roll_initiative(&mut ScriptedRolls::constant(1)), 4);

        let mut default = build(CombatantConfig::default().with_score(Ability::Dexterity, 14));
        assert_eq!(default.roll_initiative(&mut ScriptedRolls::new([10])), 12);
        default.set_ability_score(Ability::Dexterity, AbilityScore::new(18));
        assert_eq!(default.roll_initiative(&mut ScriptedRolls::new([10])), 14);
    }

    #[test]
    fn test_equip_weapon_replaces_unarmed() {
        let mut c = build(CombatantConfig::default());
        c.equip_weapon(get_weapon("Mace").unwrap());
        assert_eq!(c.weapons().len(), 1);
        assert_eq!(c.weapons()[0].name, "Mace");
        c.equip_weapon(get_weapon("Dagger").unwrap());
        assert_eq!(c.weapons().len(), 2);
    }

    #[test]
    fn test_spell_slots() {
        let mut slots = SpellSlots::from_counts(&[2, 1]);
        assert_eq!(slots.available(1), 2);
        assert_eq!(slots.available(0), 0);
        assert_eq!(slots.available(5), 0);
        assert!(slots.use_slot(2));
        assert!(!slots.use_slot(2));
        assert_eq!(slots.available(2), 0);
        assert_eq!(slots.available(1), 2);
        assert!(!slots.use_slot(0));
    }

    #[test]
    fn test_sides() {
        let a = build(CombatantConfig::default().with_team(Team(1)));
        let b = build(CombatantConfig::default().with_team(Team(1)));
        let c = build(CombatantConfig::default().with_team(Team(2)));
        let loner = build(CombatantConfig::default());
        let other_loner = build(CombatantConfig::default());

        assert!(a.is_ally_of(&b));
        assert!(a.is_enemy_of(&c));
        assert!(loner.is_enemy_of(&other_loner));
        assert!(loner.is_enemy_of(&a));
        assert!(!a.is_enemy_of(&a));
        assert!(!loner.is_ally_of(&loner));
    }

    #[test]
    fn test_config_from_json() {
        let config = CombatantConfig::from_json(
            r#"{
                "name": "Kobold",
                "strength": 7,
                "dexterity": {"bonus": 2},
                "max_hp": 5,
                "armor_class": 12,
                "team": 2,
                "weapons": [{"name": "Dagger", "damage": "1d4", "damage_type": "piercing", "attack_mod": 4, "damage_mod": 2}]
            }"#,
        )
        .unwrap();
        let kobold = build(config);
        assert_eq!(kobold.name, "Kobold");
        assert_eq!(kobold.bonus(Ability::Strength), -2);
        assert_eq!(kobold.bonus(Ability::Dexterity), 2);
        assert_eq!(kobold.max_hp(), 5);
        assert_eq!(kobold.armor_class(), 12);
        assert_eq!(kobold.team, Some(Team(2)));
        assert_eq!(kobold.level, 1);
    }
}
