//! Turn-based tabletop combat engine.
//!
//! This crate provides:
//! - Dice notation, rolling and statistics
//! - Combatants built from declarative configs, with hit points, armor,
//!   weapons, spells and spell slots
//! - An Intent/Resolution rules engine for attacks and spells, with spell
//!   effects composed as data
//! - Area targeting on an optional grid
//! - Scripted tactics and an initiative-ordered encounter loop
//!
//! All randomness flows through a [`RollSource`], so any fight can be replayed
//! from a seed or scripted die by die.
//!
//! # Quick Start
//!
//! ```
//! use combatsim_core::{bestiary, Encounter, RandomRolls, Team};
//!
//! let mut rolls = RandomRolls::seeded(7);
//! let configs = [
//!     bestiary::get("Knight").unwrap().with_team(Team(1)),
//!     bestiary::get("Kobold").unwrap().with_team(Team(2)),
//!     bestiary::get("Kobold").unwrap().with_team(Team(2)),
//! ];
//!
//! let mut encounter = Encounter::from_configs(configs, &mut rolls).unwrap();
//! let summary = encounter.run(&mut rolls).unwrap();
//! println!("{summary}");
//! print!("{}", encounter.sink());
//! ```

pub mod ability;
pub mod bestiary;
pub mod combatant;
pub mod dice;
pub mod encounter;
pub mod events;
pub mod grid;
pub mod items;
pub mod rules;
pub mod spells;
pub mod tactics;
pub mod targeting;
pub mod testing;

// Primary public API
pub use ability::{Ability, AbilityScore, AbilityScores};
pub use combatant::{
    ClassRules, Combatant, CombatantConfig, CombatantId, ConfigError, LifeState, Team,
};
pub use dice::{Advantage, Dice, DiceError, Modifier, RandomRolls, RollSource, SharedModifier};
pub use encounter::{Encounter, EncounterConfig, EncounterState, EncounterSummary};
pub use events::{Event, EventLog, EventSink, NullSink};
pub use grid::{Grid, GridError, Position};
pub use items::{Armor, ArmorType, DamageType, Weapon, WeaponProperty};
pub use rules::{ActionContext, Intent, Outcome, Resolution, RulesEngine, RulesError};
pub use spells::{get_spell, Spell, SpellEffect};
pub use tactics::Tactics;
pub use targeting::Area;
