//! Dice rolling system.
//!
//! A [`Dice`] value is one or more die groups (`2d6`, `1d20`) plus a list of
//! additive modifiers. Rolling never collapses groups into one number: every
//! group produces its own total, so [`Dice::roll`] always returns a `Vec`,
//! even for a single group.
//!
//! All randomness flows through a [`RollSource`], which callers pass in
//! explicitly. Production code uses [`RandomRolls`]; tests script the
//! results with [`crate::testing::ScriptedRolls`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("Too many dice: {0} (at most {max})", max = DieGroup::MAX_COUNT)]
    TooManyDice(u32),
    #[error("No dice specified")]
    NoDice,
}

// ============================================================================
// Roll Sources
// ============================================================================

/// Anything that can produce die results.
pub trait RollSource {
    /// Roll one die with `faces` sides. The result is in `1..=faces`.
    fn roll_die(&mut self, faces: u32) -> u32;
}

/// Uniformly random die results from a ChaCha8 generator.
#[derive(Debug, Clone)]
pub struct RandomRolls {
    rng: ChaCha8Rng,
}

impl RandomRolls {
    /// Seed from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Reproducible rolls for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomRolls {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RollSource for RandomRolls {
    fn roll_die(&mut self, faces: u32) -> u32 {
        self.rng.gen_range(1..=faces.max(1))
    }
}

// ============================================================================
// Advantage
// ============================================================================

/// Advantage state for d20 rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Build from independent advantage/disadvantage flags.
    /// Having both cancels out to a normal roll.
    pub fn from_flags(advantage: bool, disadvantage: bool) -> Advantage {
        match (advantage, disadvantage) {
            (true, false) => Advantage::Advantage,
            (false, true) => Advantage::Disadvantage,
            _ => Advantage::Normal,
        }
    }

    /// Combine two advantage states (advantage + disadvantage = normal).
    pub fn combine(self, other: Advantage) -> Advantage {
        match (self, other) {
            (Advantage::Normal, x) | (x, Advantage::Normal) => x,
            (Advantage::Advantage, Advantage::Disadvantage) => Advantage::Normal,
            (Advantage::Disadvantage, Advantage::Advantage) => Advantage::Normal,
            (Advantage::Advantage, Advantage::Advantage) => Advantage::Advantage,
            (Advantage::Disadvantage, Advantage::Disadvantage) => Advantage::Disadvantage,
        }
    }
}

// ============================================================================
// Modifiers
// ============================================================================

/// A modifier whose value can change after it has been added to dice.
///
/// Clones share the same value: setting it through one handle changes every
/// roll made by every [`Dice`] holding a clone.
#[derive(Debug, Clone, Default)]
pub struct SharedModifier(Arc<AtomicI32>);

impl SharedModifier {
    pub fn new(value: i32) -> Self {
        Self(Arc::new(AtomicI32::new(value)))
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, value: i32) {
        self.0.store(value, Ordering::Relaxed);
    }

    pub fn adjust(&self, delta: i32) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }
}

impl PartialEq for SharedModifier {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

/// An additive modifier on a dice roll.
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    Fixed(i32),
    Shared(SharedModifier),
}

impl Modifier {
    pub fn value(&self) -> i32 {
        match self {
            Modifier::Fixed(value) => *value,
            Modifier::Shared(shared) => shared.get(),
        }
    }
}

impl From<i32> for Modifier {
    fn from(value: i32) -> Self {
        Modifier::Fixed(value)
    }
}

impl From<SharedModifier> for Modifier {
    fn from(shared: SharedModifier) -> Self {
        Modifier::Shared(shared)
    }
}

// ============================================================================
// Dice
// ============================================================================

/// `count` dice with `faces` sides each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DieGroup {
    pub count: u32,
    pub faces: u32,
}

impl DieGroup {
    /// Largest count accepted from notation.
    pub const MAX_COUNT: u32 = 1000;
    /// Largest die accepted from notation.
    pub const MAX_FACES: u32 = 1000;

    pub fn new(count: u32, faces: u32) -> Self {
        Self { count, faces }
    }

    /// Parse a single group such as `d6` or `5d20`.
    fn parse(s: &str) -> Result<Self, DiceError> {
        let pieces: Vec<&str> = s.split('d').collect();
        if pieces.len() != 2 {
            return Err(DiceError::InvalidNotation(s.to_string()));
        }

        let count: u32 = if pieces[0].is_empty() {
            1
        } else {
            pieces[0]
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
        };
        let faces: u32 = pieces[1]
            .parse()
            .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
        if faces == 0 || faces > Self::MAX_FACES {
            return Err(DiceError::InvalidDieSize(faces));
        }
        if count > Self::MAX_COUNT {
            return Err(DiceError::TooManyDice(count));
        }

        Ok(Self { count, faces })
    }

    fn roll(&self, rolls: &mut dyn RollSource) -> i32 {
        (0..self.count)
            .map(|_| i32::try_from(rolls.roll_die(self.faces)).unwrap_or(i32::MAX))
            .fold(0, i32::saturating_add)
    }

    fn max(&self) -> i32 {
        i32::try_from(u64::from(self.count) * u64::from(self.faces)).unwrap_or(i32::MAX)
    }

    fn min(&self) -> i32 {
        i32::try_from(self.count).unwrap_or(i32::MAX)
    }
}

impl fmt::Display for DieGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.faces)
    }
}

/// Die groups plus modifiers.
///
/// Every group is rolled separately and each group's sum is increased by the
/// total of all modifiers. [`Dice::average`] and [`Dice::max`] describe the
/// sum of those per-group results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dice {
    groups: Vec<DieGroup>,
    modifiers: Vec<Modifier>,
}

impl Dice {
    /// A single group of `count` dice with `faces` sides.
    pub fn new(count: u32, faces: u32) -> Self {
        Self {
            groups: vec![DieGroup::new(count, faces)],
            modifiers: Vec::new(),
        }
    }

    /// Dice with no groups; rolls to an empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse dice notation: `group(,group)*` followed by any number of
    /// `+N` / `-N` modifiers, e.g. `2d6+3` or `1d20,1d20-1`.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let split = notation
            .find(|c: char| c == '+' || c == '-')
            .unwrap_or(notation.len());
        let (head, tail) = notation.split_at(split);

        let groups = head
            .split(',')
            .map(|group| DieGroup::parse(group.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        let modifiers = Self::parse_modifiers(tail, &notation)?;

        Ok(Self { groups, modifiers })
    }

    /// One group per notation string, e.g. `["1d20", "1d20"]`.
    pub fn parse_all<S: AsRef<str>>(notations: &[S]) -> Result<Self, DiceError> {
        let mut dice = Dice::empty();
        for notation in notations {
            let parsed = Dice::parse(notation.as_ref())?;
            dice.groups.extend(parsed.groups);
            dice.modifiers.extend(parsed.modifiers);
        }
        Ok(dice)
    }

    fn parse_modifiers(tail: &str, notation: &str) -> Result<Vec<Modifier>, DiceError> {
        let mut modifiers = Vec::new();
        let mut rest = tail.trim();

        while !rest.is_empty() {
            let sign = if rest.starts_with('-') { -1 } else { 1 };
            let body = &rest[1..];
            let end = body
                .find(|c: char| c == '+' || c == '-')
                .unwrap_or(body.len());
            let value: i32 = body[..end]
                .trim()
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.to_string()))?;
            modifiers.push(Modifier::Fixed(sign * value));
            rest = body[end..].trim_start();
        }

        Ok(modifiers)
    }

    pub fn groups(&self) -> &[DieGroup] {
        &self.groups
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Current sum of all modifiers.
    pub fn modifier_total(&self) -> i32 {
        self.modifiers
            .iter()
            .map(Modifier::value)
            .fold(0, i32::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn with_modifier(mut self, modifier: impl Into<Modifier>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    /// Roll every group; one result per group.
    pub fn roll(&self, rolls: &mut dyn RollSource) -> Vec<i32> {
        let bonus = self.modifier_total();
        self.groups
            .iter()
            .map(|group| group.roll(rolls).saturating_add(bonus))
            .collect()
    }

    /// Roll every group and add the results together.
    pub fn total(&self, rolls: &mut dyn RollSource) -> i32 {
        self.roll(rolls).into_iter().fold(0, i32::saturating_add)
    }

    /// Expected value of [`Dice::total`].
    pub fn average(&self) -> f64 {
        let bonus = f64::from(self.modifier_total());
        self.groups
            .iter()
            .map(|g| f64::from(g.count) * (f64::from(g.faces) + 1.0) / 2.0 + bonus)
            .sum()
    }

    /// Largest possible value of [`Dice::total`].
    pub fn max(&self) -> i32 {
        let bonus = self.modifier_total();
        self.groups
            .iter()
            .map(|g| g.max().saturating_add(bonus))
            .fold(0, i32::saturating_add)
    }

    /// Smallest possible value of [`Dice::total`].
    pub fn min(&self) -> i32 {
        let bonus = self.modifier_total();
        self.groups
            .iter()
            .map(|g| g.min().saturating_add(bonus))
            .fold(0, i32::saturating_add)
    }

    /// The die groups repeated `times` times; modifiers are kept as they are.
    pub fn repeated(&self, times: u32) -> Dice {
        Dice {
            groups: (0..times).flat_map(|_| self.groups.iter().copied()).collect(),
            modifiers: self.modifiers.clone(),
        }
    }
}

impl Add<i32> for Dice {
    type Output = Dice;

    fn add(self, rhs: i32) -> Dice {
        self.with_modifier(Modifier::Fixed(rhs))
    }
}

impl Sub<i32> for Dice {
    type Output = Dice;

    fn sub(self, rhs: i32) -> Dice {
        self.with_modifier(Modifier::Fixed(rhs.saturating_neg()))
    }
}

impl Add<Modifier> for Dice {
    type Output = Dice;

    fn add(self, rhs: Modifier) -> Dice {
        self.with_modifier(rhs)
    }
}

impl Add<SharedModifier> for Dice {
    type Output = Dice;

    fn add(self, rhs: SharedModifier) -> Dice {
        self.with_modifier(Modifier::Shared(rhs))
    }
}

impl Mul<u32> for Dice {
    type Output = Dice;

    fn mul(self, rhs: u32) -> Dice {
        self.repeated(rhs)
    }
}

impl Mul<u32> for &Dice {
    type Output = Dice;

    fn mul(self, rhs: u32) -> Dice {
        self.repeated(rhs)
    }
}

impl FromStr for Dice {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dice::parse(s)
    }
}

impl TryFrom<String> for Dice {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Dice::parse(&value)
    }
}

impl From<Dice> for String {
    fn from(dice: Dice) -> Self {
        dice.to_string()
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self.groups.iter().map(|g| g.to_string()).collect();
        write!(f, "{}", groups.join(","))?;

        let bonus = self.modifier_total();
        if bonus > 0 {
            write!(f, "+{bonus}")
        } else if bonus < 0 {
            write!(f, "-{}", bonus.abs())
        } else {
            Ok(())
        }
    }
}
