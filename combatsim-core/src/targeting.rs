//! Area-of-effect shapes used to validate spell targets.

use crate::grid::Position;
use crate::rules::RulesError;
use serde::{Deserialize, Serialize};

/// The shape a set of targets must fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Area {
    /// No geometric constraint.
    Any {
        #[serde(default)]
        max_targets: Option<usize>,
    },
    /// Every target within one sphere of `radius` feet.
    Sphere {
        radius: u32,
        #[serde(default)]
        max_targets: Option<usize>,
    },
}

impl Area {
    pub fn any() -> Self {
        Area::Any { max_targets: None }
    }

    pub fn single() -> Self {
        Area::Any {
            max_targets: Some(1),
        }
    }

    pub fn sphere(radius: u32) -> Self {
        Area::Sphere {
            radius,
            max_targets: None,
        }
    }

    pub fn with_max_targets(self, max: usize) -> Self {
        match self {
            Area::Any { .. } => Area::Any {
                max_targets: Some(max),
            },
            Area::Sphere { radius, .. } => Area::Sphere {
                radius,
                max_targets: Some(max),
            },
        }
    }

    pub fn max_targets(&self) -> Option<usize> {
        match self {
            Area::Any { max_targets } | Area::Sphere { max_targets, .. } => *max_targets,
        }
    }

    /// Check only the number of targets.
    pub fn check_count(&self, count: usize) -> Result<(), RulesError> {
        match self.max_targets() {
            Some(max) if count > max => Err(RulesError::TooManyTargets { max, got: count }),
            _ => Ok(()),
        }
    }

    /// Check the number of targets and their placement.
    pub fn check(&self, positions: &[Position]) -> Result<(), RulesError> {
        self.check_count(positions.len())?;
        match self {
            Area::Any { .. } => Ok(()),
            Area::Sphere { radius, .. } if fits_sphere(positions, *radius) => Ok(()),
            Area::Sphere { radius, .. } => Err(RulesError::TargetsOutsideArea { radius: *radius }),
        }
    }

    pub fn contains(&self, positions: &[Position]) -> bool {
        self.check(positions).is_ok()
    }
}

impl Default for Area {
    fn default() -> Self {
        Area::any()
    }
}

/// Whether every position lies within `radius` of the center of their
/// bounding box. Works on doubled coordinates to stay in integers.
fn fits_sphere(positions: &[Position], radius: u32) -> bool {
    let Some(first) = positions.first() else {
        return true;
    };
    let (min_x, max_x, min_y, max_y) = positions.iter().fold(
        (first.x, first.x, first.y, first.y),
        |(min_x, max_x, min_y, max_y), p| {
            (min_x.min(p.x), max_x.max(p.x), min_y.min(p.y), max_y.max(p.y))
        },
    );

    let center_x = i64::from(min_x) + i64::from(max_x);
    let center_y = i64::from(min_y) + i64::from(max_y);
    let reach = 2 * i64::from(radius);

    positions.iter().all(|p| {
        let dx = 2 * i64::from(p.x) - center_x;
        let dy = 2 * i64::from(p.y) - center_y;
        dx * dx + dy * dy <= reach * reach
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(points: &[(i32, i32)]) -> Vec<Position> {
        points.iter().map(|&p| Position::from(p)).collect()
    }

    #[test]
    fn test_sphere_accepts_pair_on_diameter() {
        assert!(Area::sphere(5).contains(&at(&[(-5, 0), (5, 0)])));
        assert!(Area::sphere(5).contains(&at(&[(7, 6), (17, 6)])));
    }

    #[test]
    fn test_sphere_rejects_spread_pair() {
        assert!(!Area::sphere(5).contains(&at(&[(-6, 0), (5, 0)])));
        assert!(!Area::sphere(5).contains(&at(&[(7, 6), (17, 7)])));
        assert_eq!(
            Area::sphere(5).check(&at(&[(-6, 0), (5, 0)])),
            Err(RulesError::TargetsOutsideArea { radius: 5 })
        );
    }

    #[test]
    fn test_zero_radius() {
        assert!(Area::sphere(0).contains(&at(&[(0, 0)])));
        assert!(!Area::sphere(0).contains(&at(&[(0, 0), (1, 0)])));
        assert!(Area::sphere(0).contains(&[]));
    }

    #[test]
    fn test_max_targets() {
        let area = Area::sphere(5).with_max_targets(2);
        assert!(area.contains(&at(&[(0, 0), (5, 0)])));
        assert_eq!(
            area.check(&at(&[(0, 0), (1, 0), (2, 0)])),
            Err(RulesError::TooManyTargets { max: 2, got: 3 })
        );
        assert_eq!(area.check_count(3), Err(RulesError::TooManyTargets { max: 2, got: 3 }));
        assert!(area.check_count(2).is_ok());
    }

    #[test]
    fn test_any_has_no_geometry() {
        assert!(Area::any().contains(&at(&[(0, 0), (500, 500)])));
        assert!(!Area::single().contains(&at(&[(0, 0), (1, 1)])));
    }

    #[test]
    fn test_area_from_json() {
        let area: Area = serde_json::from_str(r#"{"shape": "sphere", "radius": 5, "max_targets": 2}"#).unwrap();
        assert_eq!(area, Area::sphere(5).with_max_targets(2));
        let area: Area = serde_json::from_str(r#"{"shape": "any"}"#).unwrap();
        assert_eq!(area, Area::any());
    }
}
