//! Weapons, armor, and the standard equipment tables.
//!
//! Combatants and bestiary entries reference these tables by name.

use crate::dice::{Advantage, Dice};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Damage Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    Slashing,
    Piercing,
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Thunder,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Force,
    Psychic,
}

impl DamageType {
    pub fn name(&self) -> &'static str {
        match self {
            DamageType::Slashing => "slashing",
            DamageType::Piercing => "piercing",
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Thunder => "thunder",
            DamageType::Acid => "acid",
            DamageType::Poison => "poison",
            DamageType::Necrotic => "necrotic",
            DamageType::Radiant => "radiant",
            DamageType::Force => "force",
            DamageType::Psychic => "psychic",
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Weapons
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponProperty {
    Finesse,
    Light,
    Heavy,
    TwoHanded,
    Thrown,
    Ammunition,
    Loading,
    Reach,
}

fn default_melee() -> bool {
    true
}

/// A weapon.
///
/// `attack_mod` and `damage_mod` replace the ability bonus a wielder would
/// otherwise add; creature stat blocks use them to pin their printed numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub damage: Dice,
    pub damage_type: DamageType,
    #[serde(default = "default_melee")]
    pub melee: bool,
    #[serde(default)]
    pub properties: Vec<WeaponProperty>,
    #[serde(default)]
    pub range: Option<(u32, u32)>,
    #[serde(default)]
    pub attack_mod: Option<i32>,
    #[serde(default)]
    pub damage_mod: Option<i32>,
}

impl Weapon {
    pub const UNARMED_STRIKE: &'static str = "Unarmed Strike";

    /// A melee weapon with no properties.
    pub fn new(name: impl Into<String>, damage: Dice, damage_type: DamageType) -> Self {
        Self {
            name: name.into(),
            damage,
            damage_type,
            melee: true,
            properties: Vec::new(),
            range: None,
            attack_mod: None,
            damage_mod: None,
        }
    }

    /// The attack every combatant falls back on.
    pub fn unarmed_strike() -> Self {
        Self::new(Self::UNARMED_STRIKE, Dice::new(1, 1), DamageType::Bludgeoning)
    }

    /// Make this a ranged weapon with normal and long range in feet.
    pub fn ranged(mut self, normal: u32, long: u32) -> Self {
        self.melee = false;
        self.range = Some((normal, long));
        self
    }

    /// Set throwing range; the weapon stays a melee weapon.
    pub fn with_range(mut self, normal: u32, long: u32) -> Self {
        self.range = Some((normal, long));
        self
    }

    /// Disadvantage past normal range, `None` past long range. Melee
    /// weapons, thrown ones included, are not limited.
    pub fn range_penalty(&self, distance: f64) -> Option<Advantage> {
        match self.range {
            Some((_, long)) if !self.melee && distance > f64::from(long) => None,
            Some((normal, _)) if !self.melee && distance > f64::from(normal) => {
                Some(Advantage::Disadvantage)
            }
            _ => Some(Advantage::Normal),
        }
    }

    pub fn with_properties(mut self, properties: Vec<WeaponProperty>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_attack_mod(mut self, attack_mod: i32) -> Self {
        self.attack_mod = Some(attack_mod);
        self
    }

    pub fn with_damage_mod(mut self, damage_mod: i32) -> Self {
        self.damage_mod = Some(damage_mod);
        self
    }

    pub fn has_property(&self, property: WeaponProperty) -> bool {
        self.properties.contains(&property)
    }

    pub fn is_finesse(&self) -> bool {
        self.has_property(WeaponProperty::Finesse)
    }

    pub fn is_unarmed(&self) -> bool {
        self.name == Self::UNARMED_STRIKE
    }
}

// ============================================================================
// Armor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmorType {
    Light,
    Medium,
    Heavy,
}

impl ArmorType {
    /// Cap on the dexterity bonus added to the armor's base AC.
    pub fn max_dex(&self) -> Option<i32> {
        match self {
            ArmorType::Light => None,
            ArmorType::Medium => Some(2),
            ArmorType::Heavy => Some(0),
        }
    }
}

/// Worn armor, or a creature's natural armor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Armor {
    pub name: String,
    pub base_ac: i32,
    #[serde(default)]
    pub max_dex: Option<i32>,
}

impl Armor {
    pub fn new(name: impl Into<String>, armor_type: ArmorType, base_ac: i32) -> Self {
        Self::custom(name, base_ac, armor_type.max_dex())
    }

    /// Armor with an explicit dexterity cap (`None` for uncapped).
    pub fn custom(name: impl Into<String>, base_ac: i32, max_dex: Option<i32>) -> Self {
        Self {
            name: name.into(),
            base_ac,
            max_dex,
        }
    }

    /// Armor class granted to a wearer with the given dexterity bonus.
    pub fn armor_class(&self, dex_bonus: i32) -> i32 {
        let dex = match self.max_dex {
            Some(cap) => dex_bonus.min(cap),
            None => dex_bonus,
        };
        self.base_ac + dex
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Get a standard weapon by name.
pub fn get_weapon(name: &str) -> Option<Weapon> {
    let name_lower = name.to_lowercase();
    WEAPONS
        .iter()
        .find(|w| w.name.to_lowercase() == name_lower)
        .cloned()
}

/// Get a standard armor by name.
pub fn get_armor(name: &str) -> Option<Armor> {
    let name_lower = name.to_lowercase();
    ARMORS
        .iter()
        .find(|a| a.name.to_lowercase() == name_lower)
        .cloned()
}

lazy_static::lazy_static! {
    /// Standard weapons.
    pub static ref WEAPONS: Vec<Weapon> = vec![
        Weapon::unarmed_strike(),

        // Simple melee
        Weapon::new("Club", Dice::new(1, 4), DamageType::Bludgeoning)
            .with_properties(vec![WeaponProperty::Light]),
        Weapon::new("Dagger", Dice::new(1, 4), DamageType::Piercing)
            .with_properties(vec![WeaponProperty::Finesse, WeaponProperty::Light, WeaponProperty::Thrown])
            .with_range(20, 60),
        Weapon::new("Mace", Dice::new(1, 6), DamageType::Bludgeoning),
        Weapon::new("Quarterstaff", Dice::new(1, 6), DamageType::Bludgeoning),
        Weapon::new("Spear", Dice::new(1, 6), DamageType::Piercing)
            .with_properties(vec![WeaponProperty::Thrown])
            .with_range(20, 60),

        // Martial melee
        Weapon::new("Shortsword", Dice::new(1, 6), DamageType::Piercing)
            .with_properties(vec![WeaponProperty::Finesse, WeaponProperty::Light]),
        Weapon::new("Scimitar", Dice::new(1, 6), DamageType::Slashing)
            .with_properties(vec![WeaponProperty::Finesse, WeaponProperty::Light]),
        Weapon::new("Rapier", Dice::new(1, 8), DamageType::Piercing)
            .with_properties(vec![WeaponProperty::Finesse]),
        Weapon::new("Longsword", Dice::new(1, 8), DamageType::Slashing),
        Weapon::new("Greataxe", Dice::new(1, 12), DamageType::Slashing)
            .with_properties(vec![WeaponProperty::Heavy, WeaponProperty::TwoHanded]),
        Weapon::new("Greatsword", Dice::new(2, 6), DamageType::Slashing)
            .with_properties(vec![WeaponProperty::Heavy, WeaponProperty::TwoHanded]),

        // Ranged
        Weapon::new("Shortbow", Dice::new(1, 6), DamageType::Piercing)
            .with_properties(vec![WeaponProperty::Ammunition, WeaponProperty::TwoHanded])
            .ranged(80, 320),
        Weapon::new("Light Crossbow", Dice::new(1, 8), DamageType::Piercing)
            .with_properties(vec![WeaponProperty::Ammunition, WeaponProperty::Loading, WeaponProperty::TwoHanded])
            .ranged(80, 320),
        Weapon::new("Longbow", Dice::new(1, 8), DamageType::Piercing)
            .with_properties(vec![WeaponProperty::Ammunition, WeaponProperty::Heavy, WeaponProperty::TwoHanded])
            .ranged(150, 600),
    ];

    /// Standard armor.
    pub static ref ARMORS: Vec<Armor> = vec![
        Armor::new("Leather Armor", ArmorType::Light, 11),
        Armor::new("Studded Leather", ArmorType::Light, 12),
        Armor::new("Chain Shirt", ArmorType::Medium, 13),
        Armor::new("Scale Mail", ArmorType::Medium, 14),
        Armor::new("Chain Mail", ArmorType::Heavy, 16),
        Armor::new("Plate Armor", ArmorType::Heavy, 18),
    ];
}
