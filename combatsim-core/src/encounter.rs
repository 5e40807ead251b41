//! The encounter loop.
//!
//! An [`Encounter`] owns its roster for the whole fight. Initiative is rolled
//! once, then rounds run in that fixed order until at most one side has
//! living members, or the round limit is reached.

use crate::combatant::{Combatant, CombatantConfig, ConfigError, Team};
use crate::dice::RollSource;
use crate::events::{EventLog, EventSink};
use crate::rules::{ActionContext, RulesError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

fn default_max_rounds() -> u32 {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterConfig {
    /// Rounds to run before calling a stalemate.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterState {
    NotStarted,
    InitiativeRolled,
    RoundInProgress,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    /// Roster index.
    pub combatant: usize,
    pub roll: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterSummary {
    pub rounds: u32,
    /// The team left standing, if the survivors all share one.
    pub winner: Option<Team>,
    pub survivors: Vec<String>,
    /// The round limit ended the fight.
    pub stalemate: bool,
}

impl fmt::Display for EncounterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stalemate {
            write!(f, "Stalemate after {} rounds", self.rounds)?;
        } else {
            write!(f, "Over after {} rounds", self.rounds)?;
        }
        if let Some(team) = self.winner {
            write!(f, ", {team} wins")?;
        }
        if self.survivors.is_empty() {
            write!(f, "; no survivors")
        } else {
            write!(f, "; survivors: {}", self.survivors.join(", "))
        }
    }
}

/// Number of sides with living members. Each unaffiliated combatant is a
/// side of its own.
pub fn sides_remaining(roster: &[Combatant]) -> usize {
    let mut teams = HashSet::new();
    let mut unaffiliated = 0;
    for combatant in roster.iter().filter(|c| c.is_alive()) {
        match combatant.team {
            Some(team) => {
                teams.insert(team);
            }
            None => unaffiliated += 1,
        }
    }
    teams.len() + unaffiliated
}

pub struct Encounter<S: EventSink = EventLog> {
    combatants: Vec<Combatant>,
    initiative: Vec<InitiativeEntry>,
    round: u32,
    state: EncounterState,
    config: EncounterConfig,
    sink: S,
}

impl Encounter<EventLog> {
    /// An encounter that records every event in an [`EventLog`].
    pub fn new(combatants: Vec<Combatant>) -> Self {
        Self::with_sink(combatants, EventLog::new())
    }

    /// Build every combatant from its config, then start an encounter.
    pub fn from_configs(
        configs: impl IntoIterator<Item = CombatantConfig>,
        rolls: &mut dyn RollSource,
    ) -> Result<Self, ConfigError> {
        let combatants = configs
            .into_iter()
            .map(|config| Combatant::new(config, rolls))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(combatants))
    }
}

impl<S: EventSink> Encounter<S> {
    pub fn with_sink(combatants: Vec<Combatant>, sink: S) -> Self {
        Self {
            combatants,
            initiative: Vec::new(),
            round: 0,
            state: EncounterState::NotStarted,
            config: EncounterConfig::default(),
            sink,
        }
    }

    pub fn with_config(mut self, config: EncounterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn combatants_mut(&mut self) -> &mut [Combatant] {
        &mut self.combatants
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn state(&self) -> EncounterState {
        self.state
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn initiative(&self) -> &[InitiativeEntry] {
        &self.initiative
    }

    /// Turn order as roster indices.
    pub fn turn_order(&self) -> Vec<usize> {
        self.initiative.iter().map(|entry| entry.combatant).collect()
    }

    pub fn is_over(&self) -> bool {
        sides_remaining(&self.combatants) <= 1
    }

    /// Roll initiative for everyone, highest first; ties keep roster order.
    /// Only the first call rolls.
    pub fn roll_initiative(&mut self, rolls: &mut dyn RollSource) -> &[InitiativeEntry] {
        if self.state != EncounterState::NotStarted {
            return &self.initiative;
        }

        let mut entries: Vec<InitiativeEntry> = self
            .combatants
            .iter()
            .enumerate()
            .map(|(index, combatant)| InitiativeEntry {
                combatant: index,
                roll: combatant.roll_initiative(rolls),
            })
            .collect();
        entries.sort_by(|a, b| b.roll.cmp(&a.roll));

        for entry in &entries {
            let message = format!(
                "{} rolls {} for initiative",
                self.combatants[entry.combatant].name, entry.roll
            );
            tracing::debug!(target: "combat", "{message}");
            self.sink.log(&message);
        }

        self.initiative = entries;
        self.state = EncounterState::InitiativeRolled;
        &self.initiative
    }

    /// Run one full pass of the initiative order. Returns whether the
    /// encounter is over.
    pub fn run_round(&mut self, rolls: &mut dyn RollSource) -> Result<bool, RulesError> {
        match self.state {
            EncounterState::Over => return Ok(true),
            EncounterState::NotStarted => {
                self.roll_initiative(rolls);
            }
            EncounterState::InitiativeRolled | EncounterState::RoundInProgress => {}
        }
        if self.is_over() {
            self.finish();
            return Ok(true);
        }

        self.round += 1;
        self.state = EncounterState::RoundInProgress;
        self.sink.begin_round(self.round);
        tracing::debug!(round = self.round, "round begins");

        let mut over = false;
        for actor in self.turn_order() {
            // The unconscious still get their skip logged.
            if self.combatants[actor].is_dead() {
                continue;
            }
            let tactics = self.combatants[actor].tactics;
            let mut ctx = ActionContext::new(&mut *rolls, &mut self.sink);
            tactics.act(&mut self.combatants, actor, &mut ctx)?;
            over |= self.is_over();
        }

        if over || self.round >= self.config.max_rounds {
            self.finish();
        }
        Ok(self.state == EncounterState::Over)
    }

    /// Run rounds until the encounter ends.
    pub fn run(&mut self, rolls: &mut dyn RollSource) -> Result<EncounterSummary, RulesError> {
        while !self.run_round(rolls)? {}
        Ok(self.summary())
    }

    pub fn summary(&self) -> EncounterSummary {
        let survivors: Vec<&Combatant> = self.combatants.iter().filter(|c| c.is_alive()).collect();
        let winner = match survivors.first().and_then(|c| c.team) {
            Some(team) if survivors.iter().all(|c| c.team == Some(team)) => Some(team),
            _ => None,
        };
        EncounterSummary {
            rounds: self.round,
            winner,
            survivors: survivors.iter().map(|c| c.name.clone()).collect(),
            stalemate: self.state == EncounterState::Over && !self.is_over(),
        }
    }

    fn finish(&mut self) {
        self.state = EncounterState::Over;
        let message = self.summary().to_string();
        tracing::info!(target: "combat", "{message}");
        self.sink.log(&message);
    }
}
