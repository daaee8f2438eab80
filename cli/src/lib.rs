use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ab_glyph::{FontRef, InvalidFont, PxScale};
use chrono::{DateTime, Local};
use cone_geometry::{BaseSelectionPolicy, ConeMetrics};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut, text_size};
use pile_detect::{DetectError, Measurement, PileProfile, PileSession, ProfileOverride};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error("Failed to load overlay font: {0}")]
    Font(#[from] InvalidFont),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Deployment configuration: per-pile camera overrides and the measurement rules.
///
/// ```toml
/// base_policy = "longest_side"
///
/// [piles.ZIF2]
/// roi = [716, 1180, 170, 360]
/// threshold = 90
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PileConfig {
    /// Which triangle side is the cone base
    #[serde(default)]
    pub base_policy: BaseSelectionPolicy,
    /// `[width, height]` of the canvas images are fitted into for vertex editing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<[u32; 2]>,
    /// Camera overrides keyed by pile identifier
    #[serde(default)]
    pub piles: BTreeMap<String, ProfileOverride>,
}

impl PileConfig {
    /// Load PileConfig from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load PileConfig from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load PileConfig from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load PileConfig from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Save PileConfig to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Save PileConfig to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        let content = self.to_json()?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PileConfig)
    }

    /// Override table for a pile; keys match the identifier case-insensitively
    pub fn camera_config(&self, pile_id: &str) -> Option<&ProfileOverride> {
        self.piles.get(pile_id).or_else(|| {
            self.piles
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(pile_id.trim()))
                .map(|(_, config)| config)
        })
    }

    /// Session for a pile with this configuration's overrides, policy and canvas
    pub fn session(&self, pile_id: &str) -> Result<PileSession, CliError> {
        let session = PileSession::for_pile(pile_id, self.camera_config(pile_id))?
            .with_policy(self.base_policy);
        Ok(match self.canvas {
            Some([width, height]) => session.with_canvas(width, height),
            None => session,
        })
    }
}

const EDGE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BASE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const VERTEX_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const LABEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_TEXT: Rgb<u8> = Rgb([0, 0, 0]);
const METADATA_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const METADATA_TEXT: Rgb<u8> = Rgb([255, 255, 255]);

const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Capture details printed in the overlay's metadata block.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLabel {
    pub pile: String,
    pub captured_at: DateTime<Local>,
    pub pixel_size_m: f64,
    pub k_vol: f64,
    pub k_den: f64,
}

impl OverlayLabel {
    /// Label for a frame of `profile`'s pile captured now
    pub fn for_profile(profile: &PileProfile) -> Self {
        Self {
            pile: profile.kind.to_string(),
            captured_at: Local::now(),
            pixel_size_m: profile.pixel_size_m,
            k_vol: profile.k_vol,
            k_den: profile.k_den,
        }
    }

    /// Metadata block lines; only the timestamp when there is no volume
    pub fn lines(&self, metrics: &ConeMetrics) -> Vec<String> {
        let mut lines = vec![self.captured_at.format("%d.%m.%Y %H:%M:%S").to_string()];
        if metrics.volume <= 0.0 {
            return lines;
        }

        lines.extend([
            String::new(),
            format!("Cone {}", self.pile),
            format!("Volume: {:.2} m³", metrics.volume),
            format!("Mass: {:.2} t", metrics.mass),
            format!("Radius: {:.2} m", metrics.radius),
            format!("Height: {:.2} m", metrics.height),
            String::new(),
            "-".repeat(30),
            String::new(),
            format!("Pixel size: {:.4} m", self.pixel_size_m),
            format!("Volume factor: {:.2}", self.k_vol),
            format!("Density: {:.2} t/m³", self.k_den),
        ]);
        lines
    }
}

/// Copy of `image` with the measured triangle drawn on it.
///
/// The base side is red, the other sides green, vertices are filled dots. Each side gets
/// its length on a white tag just outside the triangle, and `label` is printed in the
/// bottom-left corner. Text sizes grow with images wider than 1000 px.
pub fn draw_overlay(
    image: &DynamicImage,
    measurement: &Measurement,
    label: &OverlayLabel,
) -> Result<RgbImage, CliError> {
    let font = FontRef::try_from_slice(FONT_DATA)?;
    let mut canvas = image.to_rgb8();
    let scale = (canvas.width() as f32 / 1000.0).max(1.0);
    let points = measurement.triangle.points();

    for side in &measurement.sides {
        let (i, j) = side.label.indices();
        let (Some(a), Some(b)) = (points.get(i), points.get(j)) else {
            continue;
        };
        let color = if side.is_base { BASE_COLOR } else { EDGE_COLOR };
        for offset in [-1.0f32, 0.0, 1.0] {
            draw_line_segment_mut(
                &mut canvas,
                (a.x as f32 + offset, a.y as f32),
                (b.x as f32 + offset, b.y as f32),
                color,
            );
            draw_line_segment_mut(
                &mut canvas,
                (a.x as f32, a.y as f32 + offset),
                (b.x as f32, b.y as f32 + offset),
                color,
            );
        }
    }

    for p in points {
        draw_filled_circle_mut(&mut canvas, (p.x.round() as i32, p.y.round() as i32), 5, VERTEX_COLOR);
    }

    draw_side_labels(&mut canvas, measurement, &font, scale);
    draw_metadata(&mut canvas, &label.lines(&measurement.metrics), &font, scale);
    Ok(canvas)
}

fn draw_side_labels(canvas: &mut RgbImage, measurement: &Measurement, font: &FontRef, scale: f32) {
    let points = measurement.triangle.points();
    let text_scale = PxScale::from(12.0 * scale);
    let offset = 20.0 * scale;
    let padding = (4.0 * scale) as i32;

    for side in &measurement.sides {
        let (i, j) = side.label.indices();
        let (Some(a), Some(b)) = (points.get(i), points.get(j)) else {
            continue;
        };
        let (dx, dy) = ((b.x - a.x) as f32, (b.y - a.y) as f32);
        let length = dx.hypot(dy);
        if length == 0.0 {
            continue;
        }

        // Left-hand normal of the side, away from the triangle for A-B-C order
        let center_x = (a.x + b.x) as f32 / 2.0 - dy / length * offset;
        let center_y = (a.y + b.y) as f32 / 2.0 + dx / length * offset;

        let text = format!("{}: {:.0}px ({:.2}m)", side.label, side.length_px, side.length_m);
        let (width, height) = text_size(text_scale, font, &text);
        let x = center_x as i32 - width as i32 / 2;
        let y = center_y as i32 - height as i32 / 2;

        shade(
            canvas,
            (x - padding, y - padding),
            (x + width as i32 + padding, y + height as i32 + padding),
            LABEL_BACKGROUND,
            200,
        );
        draw_text_mut(canvas, LABEL_TEXT, x, y, text_scale, font, &text);
    }
}

fn draw_metadata(canvas: &mut RgbImage, lines: &[String], font: &FontRef, scale: f32) {
    let text_scale = PxScale::from(14.0 * scale);
    let margin = (15.0 * scale) as i32;
    let padding = (8.0 * scale) as i32;
    let line_height = (14.0 * scale) as i32 + (5.0 * scale) as i32;

    let max_width = lines
        .iter()
        .map(|line| text_size(text_scale, font, line).0 as i32)
        .max()
        .unwrap_or(0);
    let bottom = canvas.height() as i32 - margin;
    let top = bottom - line_height * lines.len() as i32;

    shade(
        canvas,
        (margin - padding, top - padding),
        (margin + max_width + padding, bottom + padding),
        METADATA_BACKGROUND,
        180,
    );
    for (n, line) in lines.iter().enumerate() {
        draw_text_mut(canvas, METADATA_TEXT, margin, top + line_height * n as i32, text_scale, font, line);
    }
}

/// Blend `color` into the rectangle `[from, to)` with the given opacity, clipped to the image
fn shade(canvas: &mut RgbImage, from: (i32, i32), to: (i32, i32), color: Rgb<u8>, alpha: u8) {
    let (width, height) = canvas.dimensions();
    let clip = |v: i32, max: u32| v.clamp(0, max as i32) as u32;
    let alpha = alpha as u16;

    for y in clip(from.1, height)..clip(to.1, height) {
        for x in clip(from.0, width)..clip(to.0, width) {
            let pixel = canvas.get_pixel_mut(x, y);
            for (channel, target) in pixel.0.iter_mut().zip(color.0) {
                *channel = ((target as u16 * alpha + *channel as u16 * (255 - alpha)) / 255) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pile_detect::PileCommand;

    const TOML_CONFIG: &str = r#"
base_policy = "most_horizontal"

[piles.ZIF1]
trassir_ip = "10.1.2.3"
password = "secret"
threshold = 60

[piles.zif2]
roi = [700, 1200, 150, 380]
cone_center = [35.0, 65.0]
k_vol = 0.9
"#;

    #[test]
    fn test_toml_config_ignores_camera_keys() {
        let config = PileConfig::from_toml(TOML_CONFIG).unwrap();
        assert_eq!(config.base_policy, BaseSelectionPolicy::MostHorizontal);
        assert_eq!(config.camera_config("ZIF1").unwrap().threshold, Some(60));
        assert_eq!(config.camera_config("ZIF2").unwrap().roi, Some([700, 1200, 150, 380]));
        assert!(config.canvas.is_none());
    }

    #[test]
    fn test_session_applies_overrides() {
        let config = PileConfig::from_toml(TOML_CONFIG).unwrap();
        let session = config.session("ZIF2").unwrap();
        assert_eq!(session.profile().roi.to_array(), [700, 1200, 150, 380]);
        assert_eq!(session.profile().threshold, 85);
        assert_eq!(session.profile().k_vol, 0.9);
        assert_eq!(session.policy(), BaseSelectionPolicy::MostHorizontal);

        assert!(matches!(
            config.session("ZIF5"),
            Err(CliError::Detect(DetectError::UnknownPileConfiguration(_)))
        ));
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let config = PileConfig::from_json(r#"{"piles": {"ZIF1": {"cone_center": [80, 20]}}}"#).unwrap();
        assert!(matches!(
            config.session("ZIF1"),
            Err(CliError::Detect(DetectError::InvalidConeCenter { .. }))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = PileConfig {
            canvas: Some([800, 600]),
            ..PileConfig::from_toml(TOML_CONFIG).unwrap()
        };

        let toml_path = dir.path().join("piles.toml");
        config.to_toml_file(&toml_path).unwrap();
        assert_eq!(PileConfig::from_file(&toml_path).unwrap(), config);

        let json_path = dir.path().join("piles.json");
        config.to_json_file(&json_path).unwrap();
        assert_eq!(PileConfig::from_file(&json_path).unwrap(), config);

        let yaml_path = dir.path().join("piles.yaml");
        fs::write(&yaml_path, "piles: {}").unwrap();
        assert!(matches!(PileConfig::from_file(&yaml_path), Err(CliError::UnsupportedFileFormat)));
    }

    fn label() -> OverlayLabel {
        OverlayLabel {
            pile: "ZIF1".to_string(),
            captured_at: Local.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).single().unwrap(),
            pixel_size_m: 0.1,
            k_vol: 1.0,
            k_den: 1.7,
        }
    }

    #[test]
    fn test_label_lines() {
        let metrics = ConeMetrics {
            volume: 1234.5,
            radius: 15.0,
            height: 25.0,
            base_length: 30.0,
            mass: 2098.65,
        };
        let lines = label().lines(&metrics);
        assert_eq!(lines[0], "01.05.2024 08:30:00");
        assert!(lines.contains(&"Cone ZIF1".to_string()));
        assert!(lines.contains(&"Volume: 1234.50 m³".to_string()));
        assert!(lines.contains(&"Pixel size: 0.1000 m".to_string()));
        assert_eq!(lines.last().unwrap(), "Density: 1.70 t/m³");

        assert_eq!(label().lines(&ConeMetrics::zero()), vec!["01.05.2024 08:30:00".to_string()]);
    }

    #[test]
    fn test_label_from_profile() {
        let session = PileConfig::default().session("zif2").unwrap();
        let label = OverlayLabel::for_profile(session.profile());
        assert_eq!(label.pile, "ZIF2");
        assert_eq!(label.k_den, session.profile().k_den);
    }

    #[test]
    fn test_overlay_draws_triangle_and_text() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(800, 600, Rgb([0, 0, 0])));
        let mut session = PileConfig::default().session("ZIF1").unwrap();
        for (x, y) in [(450.0, 500.0), (750.0, 500.0), (600.0, 250.0)] {
            session.execute(PileCommand::AddVertex { x, y }).unwrap();
        }
        let measurement = session.execute(PileCommand::Measure).unwrap();

        let overlay = draw_overlay(&image, &measurement, &label()).unwrap();
        assert_eq!(overlay.dimensions(), (800, 600));
        assert_eq!(*overlay.get_pixel(520, 500), BASE_COLOR);
        assert_eq!(*overlay.get_pixel(600, 250), VERTEX_COLOR);
        assert_eq!(*overlay.get_pixel(600, 400), Rgb([0, 0, 0]));

        // Base length tag is centred 20 px below the middle of AB.
        let tag: Vec<_> = (540..660)
            .flat_map(|x| (505..536).map(move |y| (x, y)))
            .map(|(x, y)| *overlay.get_pixel(x, y))
            .collect();
        assert!(tag.contains(&Rgb([200, 200, 200])));
        assert!(tag.iter().any(|p| p.0[0] < 100));

        // Metadata text in the bottom-left corner.
        let metadata_text = (0..330)
            .flat_map(|x| (300..600).map(move |y| (x, y)))
            .any(|(x, y)| overlay.get_pixel(x, y).0.iter().all(|&c| c > 200));
        assert!(metadata_text);
    }

    #[test]
    fn test_overlay_without_triangle_has_timestamp_only() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 300, Rgb([0, 0, 0])));
        let measurement = PileConfig::default().session("ZIF1").unwrap().measurement().unwrap();

        let overlay = draw_overlay(&image, &measurement, &label()).unwrap();
        let lit_rows: Vec<u32> = (0..300)
            .filter(|&y| (0..400).any(|x| overlay.get_pixel(x, y).0[0] > 200))
            .collect();
        assert!(!lit_rows.is_empty());
        assert!(lit_rows.iter().all(|&y| y > 250));
    }
}
