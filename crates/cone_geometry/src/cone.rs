//! Cone model: a silhouette triangle seen side-on is the axial section of the pile.

use std::f64::consts::PI;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr, VariantNames};
use tracing::debug;

use crate::{
    calibration::CalibrationParams,
    geometry::{distance, triangle_height},
    triangle::{SideLabel, Triangle},
    Point,
};

/// Rule deciding which side of the triangle models the cone's base diameter.
///
/// The rules disagree for skewed triangles, so the choice is part of a deployment's
/// configuration rather than something inferred from the points.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BaseSelectionPolicy {
    /// Points 0 and 1 are the base, point 2 is the apex
    #[default]
    FixedFirstTwo,
    /// The longest side is the base
    LongestSide,
    /// The side with the smallest vertical extent is the base
    MostHorizontal,
}

/// Base side and apex chosen by a [`BaseSelectionPolicy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseSelection {
    pub side: SideLabel,
    pub base: [Point; 2],
    pub apex: Point,
}

impl BaseSelectionPolicy {
    /// Apply the rule to three vertices. Ties go to the earliest side in AB, BC, CA order.
    pub fn select(self, vertices: &[Point; 3]) -> BaseSelection {
        let side = match self {
            Self::FixedFirstTwo => SideLabel::AB,
            Self::LongestSide => best_side(vertices, |a, b| distance(a, b)),
            Self::MostHorizontal => best_side(vertices, |a, b| -(b.y - a.y).abs()),
        };

        let (i, j) = side.indices();
        let apex = 3 - i - j;
        BaseSelection {
            side,
            base: [vertices[i], vertices[j]],
            apex: vertices[apex],
        }
    }
}

/// Side maximising `score`, first side winning ties
fn best_side(vertices: &[Point; 3], score: impl Fn(Point, Point) -> f64) -> SideLabel {
    let mut best = SideLabel::AB;
    let mut best_score = f64::NEG_INFINITY;
    for side in SideLabel::iter() {
        let (i, j) = side.indices();
        let s = score(vertices[i], vertices[j]);
        if s > best_score {
            best = side;
            best_score = s;
        }
    }
    best
}

/// Cone dimensions in metric units.
///
/// All fields are zero when the triangle cannot describe a cone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConeMetrics {
    pub volume: f64,
    pub radius: f64,
    pub height: f64,
    pub base_length: f64,
    /// `volume * k_den`
    pub mass: f64,
}

impl ConeMetrics {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.volume == 0.0
    }
}

/// Turns a triangle plus calibration into [`ConeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConeVolumeModel {
    pub policy: BaseSelectionPolicy,
}

impl ConeVolumeModel {
    pub fn new(policy: BaseSelectionPolicy) -> Self {
        Self { policy }
    }

    /// Compute cone metrics for a triangle.
    ///
    /// `calibration.scale_factor` must describe the triangle's frame: 1.0 for original-frame
    /// points, original/display for display-frame points.
    pub fn compute(&self, triangle: &Triangle, calibration: &CalibrationParams) -> ConeMetrics {
        self.compute_points(triangle.points(), calibration)
    }

    /// Compute cone metrics from raw points; anything other than exactly three is degenerate.
    pub fn compute_points(&self, points: &[Point], calibration: &CalibrationParams) -> ConeMetrics {
        let vertices = match points {
            &[a, b, c] => [a, b, c],
            _ => return ConeMetrics::zero(),
        };
        if !calibration.is_valid() {
            debug!("Invalid calibration {:?}, reporting zero metrics", calibration);
            return ConeMetrics::zero();
        }

        let selection = self.policy.select(&vertices);
        let [b1, b2] = selection.base;

        let base_length_m = calibration.to_metres(distance(b1, b2));
        let height_m = calibration.to_metres(triangle_height(b1, b2, selection.apex));
        let radius_m = base_length_m / 2.0;

        if !(height_m > 0.0 && radius_m > 0.0) {
            return ConeMetrics::zero();
        }

        let volume = PI / 3.0 * radius_m * radius_m * height_m * calibration.k_vol;
        debug!(
            "Cone via {} (base {}): r={:.3} m, h={:.3} m, V={:.3} m3",
            self.policy, selection.side, radius_m, height_m, volume
        );

        ConeMetrics {
            volume,
            radius: radius_m,
            height: height_m,
            base_length: base_length_m,
            mass: volume * calibration.k_den,
        }
    }
}
