//! Per-pile detection and calibration settings.
//!
//! Adding a pile type means adding a [`PileKind`] variant and its row in
//! [`PileProfile::builtin`]; segmentation and classification never branch on the pile.

use cone_geometry::{CalibrationParams, DEFAULT_K_DEN, DEFAULT_K_VOL};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    error::{DetectError, Result},
    types::{ConeCenterBand, RegionOfInterest},
};

/// Piles with a configured overhead camera.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum PileKind {
    #[serde(rename = "ZIF1")]
    #[strum(serialize = "ZIF1")]
    Zif1,
    #[serde(rename = "ZIF2")]
    #[strum(serialize = "ZIF2")]
    Zif2,
}

impl PileKind {
    /// Parse a pile identifier, mapping unknown names to a configuration error
    pub fn from_id(pile_id: &str) -> Result<Self> {
        pile_id
            .trim()
            .parse()
            .map_err(|_| DetectError::UnknownPileConfiguration(pile_id.to_string()))
    }
}

/// How a pile's triangle is found automatically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetectorKind {
    /// Threshold, contour and center-band classification
    #[default]
    ContourTriangle,
    /// No automatic detector for this pile; detection always reports "not found"
    Placeholder,
}

/// Complete settings for one pile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PileProfile {
    pub kind: PileKind,
    pub roi: RegionOfInterest,
    pub cone_center: ConeCenterBand,
    pub threshold: u8,
    pub k_vol: f64,
    pub k_den: f64,
    pub pixel_size_m: f64,
    pub detector: DetectorKind,
}

/// Camera configuration entry; every field falls back to the built-in profile.
///
/// Keys the core does not use (camera host, channel name, credentials) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileOverride {
    /// `[x1, x2, y1, y2]` in original image pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<[u32; 4]>,
    /// `[min_pct, max_pct]` of ROI width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cone_center: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k_vol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k_den: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_size_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector: Option<DetectorKind>,
}

impl PileProfile {
    /// Factory settings for each pile camera
    pub fn builtin(kind: PileKind) -> Self {
        let (roi, cone_center, threshold) = match kind {
            PileKind::Zif1 => ([1125, 1545, 345, 615], (45.0, 65.0), 50),
            PileKind::Zif2 => ([716, 1180, 170, 360], (40.0, 60.0), 85),
        };
        Self {
            kind,
            roi: RegionOfInterest::from_array(roi),
            cone_center: ConeCenterBand {
                min_pct: cone_center.0,
                max_pct: cone_center.1,
            },
            threshold,
            k_vol: DEFAULT_K_VOL,
            k_den: DEFAULT_K_DEN,
            pixel_size_m: 0.1,
            detector: DetectorKind::ContourTriangle,
        }
    }

    /// Built-in profile looked up by identifier
    pub fn for_id(pile_id: &str) -> Result<Self> {
        Ok(Self::builtin(PileKind::from_id(pile_id)?))
    }

    /// Apply configured values on top of this profile and validate the result
    pub fn with_override(&self, config: &ProfileOverride) -> Result<Self> {
        let profile = Self {
            kind: self.kind,
            roi: config.roi.map(RegionOfInterest::from_array).unwrap_or(self.roi),
            cone_center: match config.cone_center {
                Some(band) => ConeCenterBand::from_array(band)?,
                None => self.cone_center,
            },
            threshold: config.threshold.unwrap_or(self.threshold),
            k_vol: config.k_vol.unwrap_or(self.k_vol),
            k_den: config.k_den.unwrap_or(self.k_den),
            pixel_size_m: config.pixel_size_m.unwrap_or(self.pixel_size_m),
            detector: config.detector.unwrap_or(self.detector),
        };
        profile.validated()
    }

    /// Check band and calibration; the ROI is checked against the image at detection time
    pub fn validated(self) -> Result<Self> {
        self.cone_center.validated()?;
        self.calibration()?;
        Ok(self)
    }

    /// Calibration for triangles in the original image frame
    pub fn calibration(&self) -> Result<CalibrationParams> {
        let calibration = CalibrationParams::new(self.pixel_size_m, 1.0)?
            .with_k_vol(self.k_vol)?
            .with_k_den(self.k_den)?;
        Ok(calibration)
    }
}
