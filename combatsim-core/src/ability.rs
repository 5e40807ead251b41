//! Ability scores.
//!
//! An [`AbilityScore`] is a raw score in `1..=30`. Everything that matters in
//! combat reads its bonus, so scores compare and add through their bonuses.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// The six abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

// ============================================================================
// Ability Score
// ============================================================================

/// A single ability score.
///
/// Equality and ordering look only at the bonus: 14 and 15 are equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityScore(u8);

impl AbilityScore {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 30;
    /// Bonus of a score of 1.
    pub const MIN_BONUS: i32 = -5;
    /// Bonus of a score of 30.
    pub const MAX_BONUS: i32 = 10;

    /// A score clamped into `1..=30`.
    pub fn new(score: u8) -> Self {
        Self(score.clamp(Self::MIN, Self::MAX))
    }

    /// The smallest odd score carrying `bonus`, clamped into `1..=30`.
    pub fn from_bonus(bonus: i32) -> Self {
        let score = 1 + 2 * (bonus.clamp(Self::MIN_BONUS, Self::MAX_BONUS) + 5);
        Self(score.clamp(i32::from(Self::MIN), i32::from(Self::MAX)) as u8)
    }

    pub fn score(&self) -> u8 {
        self.0
    }

    pub fn bonus(&self) -> i32 {
        (i32::from(self.0) - 10).div_euclid(2)
    }
}

impl Default for AbilityScore {
    fn default() -> Self {
        Self(10)
    }
}

impl fmt::Display for AbilityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:+})", self.0, self.bonus())
    }
}

impl PartialEq for AbilityScore {
    fn eq(&self, other: &Self) -> bool {
        self.bonus() == other.bonus()
    }
}

impl Eq for AbilityScore {}

impl PartialOrd for AbilityScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AbilityScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bonus().cmp(&other.bonus())
    }
}

impl PartialEq<i32> for AbilityScore {
    fn eq(&self, other: &i32) -> bool {
        self.bonus() == *other
    }
}

impl PartialOrd<i32> for AbilityScore {
    fn partial_cmp(&self, other: &i32) -> Option<Ordering> {
        Some(self.bonus().cmp(other))
    }
}

impl Add<i32> for AbilityScore {
    type Output = i32;

    fn add(self, rhs: i32) -> i32 {
        self.bonus() + rhs
    }
}

impl Add<AbilityScore> for i32 {
    type Output = i32;

    fn add(self, rhs: AbilityScore) -> i32 {
        self + rhs.bonus()
    }
}

impl Add for AbilityScore {
    type Output = i32;

    fn add(self, rhs: AbilityScore) -> i32 {
        self.bonus() + rhs.bonus()
    }
}

impl Sub<i32> for AbilityScore {
    type Output = i32;

    fn sub(self, rhs: i32) -> i32 {
        self.bonus() - rhs
    }
}

impl Sub<AbilityScore> for i32 {
    type Output = i32;

    fn sub(self, rhs: AbilityScore) -> i32 {
        self - rhs.bonus()
    }
}

// ============================================================================
// Ability Scores
// ============================================================================

/// All six scores of a combatant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: AbilityScore,
    pub dexterity: AbilityScore,
    pub constitution: AbilityScore,
    pub intelligence: AbilityScore,
    pub wisdom: AbilityScore,
    pub charisma: AbilityScore,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: AbilityScore::new(str),
            dexterity: AbilityScore::new(dex),
            constitution: AbilityScore::new(con),
            intelligence: AbilityScore::new(int),
            wisdom: AbilityScore::new(wis),
            charisma: AbilityScore::new(cha),
        }
    }

    pub fn get(&self, ability: Ability) -> AbilityScore {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, score: AbilityScore) {
        match ability {
            Ability::Strength => self.strength = score,
            Ability::Dexterity => self.dexterity = score,
            Ability::Constitution => self.constitution = score,
            Ability::Intelligence => self.intelligence = score,
            Ability::Wisdom => self.wisdom = score,
            Ability::Charisma => self.charisma = score,
        }
    }

    pub fn bonus(&self, ability: Ability) -> i32 {
        self.get(ability).bonus()
    }
}
