//! Battle grid: positions in feet, at most one combatant per cell.

use crate::combatant::{Combatant, CombatantId};
use crate::rules::RulesError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
}

/// A cell on the grid, in feet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in feet.
    pub fn distance_to(&self, other: Position) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A bounded grid tracking which combatant stands in which cell.
///
/// The grid owns occupancy; each combatant's `position` mirrors its cell.
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: HashMap<Position, CombatantId>,
}

impl Grid {
    /// A grid covering `0..width` by `0..height`.
    pub fn new(width: i32, height: i32) -> Result<Self, GridError> {
        if width <= 0 || height <= 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: HashMap::new(),
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        (0..self.width).contains(&position.x) && (0..self.height).contains(&position.y)
    }

    pub fn occupant(&self, position: Position) -> Option<CombatantId> {
        self.cells.get(&position).copied()
    }

    /// Put a combatant on the grid, or move it if it is already placed.
    pub fn place(
        &mut self,
        combatant: &mut Combatant,
        position: Position,
    ) -> Result<(), RulesError> {
        if !self.contains(position) {
            return Err(RulesError::OffGrid {
                x: position.x,
                y: position.y,
            });
        }
        match self.occupant(position) {
            Some(id) if id != combatant.id => {
                return Err(RulesError::CellOccupied {
                    x: position.x,
                    y: position.y,
                })
            }
            _ => {}
        }

        self.clear_cell_of(combatant);
        self.cells.insert(position, combatant.id);
        combatant.position = Some(position);
        Ok(())
    }

    /// Move a placed combatant. Fails without side effects when the target
    /// cell is taken or off the grid.
    pub fn move_combatant(
        &mut self,
        combatant: &mut Combatant,
        to: Position,
    ) -> Result<(), RulesError> {
        self.place(combatant, to)
    }

    /// Take a combatant off the grid.
    pub fn remove(&mut self, combatant: &mut Combatant) {
        self.clear_cell_of(combatant);
        combatant.position = None;
    }

    fn clear_cell_of(&mut self, combatant: &Combatant) {
        if let Some(previous) = combatant.position {
            if self.occupant(previous) == Some(combatant.id) {
                self.cells.remove(&previous);
            }
        }
    }

    /// Distance between two placed combatants.
    pub fn distance(&self, a: &Combatant, b: &Combatant) -> Option<f64> {
        Some(a.position?.distance_to(b.position?))
    }

    pub fn occupied(&self) -> usize {
        self.cells.len()
    }
}
