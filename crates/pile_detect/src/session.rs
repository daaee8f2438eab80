use std::path::Path;

use cone_geometry::{
    BaseSelectionPolicy, ConeVolumeModel, DisplayTransform, Frame, Point, Triangle,
    DEFAULT_PICK_TOLERANCE,
};
use image::DynamicImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, info};

use crate::{
    error::{DetectError, Result},
    orchestrator::DetectionOrchestrator,
    profiles::{PileProfile, ProfileOverride},
    types::Measurement,
};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum PileCommand {
    /// Replace the triangle with one detected in the loaded image
    #[serde(rename = "auto_detect")]
    AutoDetect {
        #[serde(default)]
        threshold: Option<u8>,
    },

    /// Append a vertex, evicting the oldest once three are placed
    #[serde(rename = "add_vertex")]
    AddVertex { x: f64, y: f64 },

    /// Drag an existing vertex to a new position
    #[serde(rename = "move_vertex")]
    MoveVertex {
        #[schemars(range(min = 0, max = 2))]
        index: usize,
        x: f64,
        y: f64,
    },

    /// Remove all vertices
    #[serde(rename = "clear")]
    Clear,

    /// Recompute sides and cone metrics without changing the triangle
    #[serde(rename = "measure")]
    Measure,
}

impl PileCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PileCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::AutoDetect { .. } => "Detect the pile triangle in the loaded image using the pile profile",
            Self::AddVertex { .. } => "Place a triangle vertex; a fourth vertex replaces the oldest",
            Self::MoveVertex { .. } => "Move vertex 0, 1 or 2 to a new position",
            Self::Clear => "Remove every vertex of the triangle",
            Self::Measure => "Report side lengths, volume and mass for the current triangle",
        }
    }

    /// Get parameter requirements for the command
    pub fn parameters_info(&self) -> Vec<(&'static str, &'static str, bool)> {
        match self {
            Self::AutoDetect { .. } => vec![
                ("threshold", "Binarization threshold 0-255, overrides the pile profile", false),
            ],
            Self::AddVertex { .. } => vec![
                ("x", "Horizontal position in session coordinates", true),
                ("y", "Vertical position in session coordinates", true),
            ],
            Self::MoveVertex { .. } => vec![
                ("index", "Vertex index (0-2)", true),
                ("x", "Horizontal position in session coordinates", true),
                ("y", "Vertical position in session coordinates", true),
            ],
            Self::Clear | Self::Measure => vec![],
        }
    }
}

/// Interactive measurement state for one pile.
///
/// Vertex commands are expressed in display pixels when a canvas is set and in original
/// pixels otherwise. Every command returns the resulting [`Measurement`].
pub struct PileSession {
    profile: PileProfile,
    policy: BaseSelectionPolicy,
    canvas: Option<(u32, u32)>,
    image: Option<DynamicImage>,
    display: Option<DisplayTransform>,
    triangle: Triangle,
    orchestrator: DetectionOrchestrator,
}

impl PileSession {
    pub fn new(profile: PileProfile) -> Self {
        Self {
            profile,
            policy: BaseSelectionPolicy::default(),
            canvas: None,
            image: None,
            display: None,
            triangle: Triangle::new(Frame::Original),
            orchestrator: DetectionOrchestrator::new(),
        }
    }

    /// Session for a named pile with optional camera configuration
    pub fn for_pile(pile_id: &str, camera_config: Option<&ProfileOverride>) -> Result<Self> {
        let profile = DetectionOrchestrator::resolve_profile(pile_id, None, camera_config)?;
        Ok(Self::new(profile))
    }

    pub fn with_policy(mut self, policy: BaseSelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Show images fitted into a canvas; vertex commands then use display pixels
    pub fn with_canvas(mut self, width: u32, height: u32) -> Self {
        self.canvas = Some((width, height));
        self
    }

    pub fn with_orchestrator(mut self, orchestrator: DetectionOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Load an image from file, discarding the current triangle
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let image = image::open(path.as_ref())?;
        info!("Loaded image {} ({}x{})", path.as_ref().display(), image.width(), image.height());
        self.set_image(image)
    }

    /// Load an image from encoded bytes, discarding the current triangle
    pub fn load_image_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let image = image::load_from_memory(bytes)?;
        self.set_image(image)
    }

    /// Set the image directly, discarding the current triangle
    pub fn set_image(&mut self, image: DynamicImage) -> Result<()> {
        self.display = match self.canvas {
            Some(canvas) => Some(DisplayTransform::fit((image.width(), image.height()), canvas)?),
            None => None,
        };
        self.image = Some(image);
        self.triangle = Triangle::new(self.input_frame());
        Ok(())
    }

    pub fn image(&self) -> Option<&DynamicImage> {
        self.image.as_ref()
    }

    pub fn triangle(&self) -> &Triangle {
        &self.triangle
    }

    pub fn profile(&self) -> &PileProfile {
        &self.profile
    }

    pub fn policy(&self) -> BaseSelectionPolicy {
        self.policy
    }

    pub fn display(&self) -> Option<&DisplayTransform> {
        self.display.as_ref()
    }

    /// Frame in which vertex commands are interpreted
    pub fn input_frame(&self) -> Frame {
        if self.display.is_some() {
            Frame::Display
        } else {
            Frame::Original
        }
    }

    /// Index of the vertex under the pointer, for starting a drag
    pub fn vertex_at(&self, x: f64, y: f64) -> Option<usize> {
        self.triangle.vertex_at(x, y, DEFAULT_PICK_TOLERANCE)
    }

    pub fn execute(&mut self, command: PileCommand) -> Result<Measurement> {
        debug!("Executing {}", command);
        match command {
            PileCommand::AutoDetect { threshold } => self.auto_detect(threshold)?,
            PileCommand::AddVertex { x, y } => {
                self.triangle.add_vertex(Point::new(x, y));
            }
            PileCommand::MoveVertex { index, x, y } => {
                if !self.triangle.update_vertex(index, Point::new(x, y)) {
                    return Err(DetectError::VertexOutOfRange {
                        index,
                        len: self.triangle.len(),
                    });
                }
            }
            PileCommand::Clear => self.triangle.clear(),
            PileCommand::Measure => {}
        }
        self.measurement()
    }

    fn auto_detect(&mut self, threshold: Option<u8>) -> Result<()> {
        let image = self.image.as_ref().ok_or(DetectError::NoImageLoaded)?;

        let mut profile = self.profile.clone();
        if let Some(threshold) = threshold {
            profile.threshold = threshold;
        }

        match self.orchestrator.detect_with_profile(image, &profile)? {
            Some(detection) => {
                let detected = detection.to_triangle();
                self.triangle = match &self.display {
                    Some(display) => display.to_display(&detected),
                    None => detected,
                };
            }
            None => info!("No pile detected for {}, keeping current triangle", profile.kind),
        }
        Ok(())
    }

    /// Sides and cone metrics of the current triangle, reported in the original frame
    pub fn measurement(&self) -> Result<Measurement> {
        let triangle = match &self.display {
            Some(display) => display.to_original(&self.triangle),
            None => self.triangle.clone(),
        };

        let base = self.profile.calibration()?;
        let calibration = match &self.display {
            Some(display) => display.calibration_for(&triangle, &base),
            None => base,
        };

        let metrics = ConeVolumeModel::new(self.policy).compute(&triangle, &calibration);
        let sides = triangle.sides(&calibration, self.policy);

        Ok(Measurement {
            triangle,
            sides,
            metrics,
            policy: self.policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::tests::pile_image;
    use crate::profiles::PileKind;
    use image::{Rgb, RgbImage};

    fn small_roi() -> ProfileOverride {
        ProfileOverride {
            roi: Some([50, 350, 40, 290]),
            ..Default::default()
        }
    }

    fn session() -> PileSession {
        PileSession::for_pile("ZIF2", None).unwrap()
    }

    #[test]
    fn test_command_names() {
        let names = PileCommand::command_names();
        assert_eq!(names, &["auto_detect", "add_vertex", "move_vertex", "clear", "measure"]);
        assert_eq!(PileCommand::Clear.to_string(), "clear");
    }

    #[test]
    fn test_command_json_shape() {
        let cmd: PileCommand = serde_json::from_str(r#"{"type":"move_vertex","params":{"index":1,"x":3.0,"y":4.5}}"#).unwrap();
        assert_eq!(cmd, PileCommand::MoveVertex { index: 1, x: 3.0, y: 4.5 });

        let cmd: PileCommand = serde_json::from_str(r#"{"type":"auto_detect","params":{}}"#).unwrap();
        assert_eq!(cmd, PileCommand::AutoDetect { threshold: None });

        let schema = serde_json::to_string(&PileCommand::schema()).unwrap();
        assert!(schema.contains("add_vertex"));
    }

    #[test]
    fn test_fourth_vertex_evicts_oldest() {
        let mut session = session();
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (5.0, 8.0), (7.0, 9.0)] {
            session.execute(PileCommand::AddVertex { x, y }).unwrap();
        }
        assert_eq!(
            session.triangle().points(),
            &[Point::new(10.0, 0.0), Point::new(5.0, 8.0), Point::new(7.0, 9.0)]
        );
    }

    #[test]
    fn test_drag_and_clear() {
        let mut session = session();
        for (x, y) in [(0.0, 0.0), (100.0, 0.0), (50.0, 100.0)] {
            session.execute(PileCommand::AddVertex { x, y }).unwrap();
        }
        let before = session.execute(PileCommand::Measure).unwrap();

        let index = session.vertex_at(52.0, 97.0).unwrap();
        assert_eq!(index, 2);
        let after = session
            .execute(PileCommand::MoveVertex { index, x: 50.0, y: 200.0 })
            .unwrap();
        assert!((after.metrics.volume - 2.0 * before.metrics.volume).abs() < 1e-9);

        let err = session
            .execute(PileCommand::MoveVertex { index: 5, x: 0.0, y: 0.0 })
            .unwrap_err();
        assert!(matches!(err, DetectError::VertexOutOfRange { index: 5, len: 3 }));

        let cleared = session.execute(PileCommand::Clear).unwrap();
        assert!(cleared.triangle.is_empty());
        assert!(cleared.metrics.is_zero());
        assert!(cleared.sides.is_empty());
    }

    #[test]
    fn test_measure_uses_profile_calibration() {
        // pixel_size_m 0.1: base 10 m, height 10 m.
        let mut session = session();
        for (x, y) in [(0.0, 0.0), (100.0, 0.0), (50.0, 100.0)] {
            session.execute(PileCommand::AddVertex { x, y }).unwrap();
        }
        let m = session.execute(PileCommand::Measure).unwrap();
        let expected = std::f64::consts::PI / 3.0 * 25.0 * 10.0;
        assert!((m.metrics.volume - expected).abs() < 1e-9);
        assert!((m.metrics.mass - expected * 1.7).abs() < 1e-9);
        assert_eq!(m.sides.len(), 3);
        assert!(m.sides[0].is_base);
        assert!((m.sides[0].length_m - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_auto_detect_requires_image() {
        let err = session()
            .execute(PileCommand::AutoDetect { threshold: None })
            .unwrap_err();
        assert!(matches!(err, DetectError::NoImageLoaded));
    }

    #[test]
    fn test_auto_detect_miss_keeps_triangle() {
        let mut session = PileSession::for_pile("ZIF2", Some(&small_roi())).unwrap();
        session
            .set_image(DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 300, Rgb([200, 200, 200]))))
            .unwrap();
        session.execute(PileCommand::AddVertex { x: 1.0, y: 2.0 }).unwrap();

        let m = session.execute(PileCommand::AutoDetect { threshold: None }).unwrap();
        assert_eq!(m.triangle.points(), &[Point::new(1.0, 2.0)]);
    }

    #[test]
    fn test_load_image_clears_triangle() {
        let mut session = session();
        session.execute(PileCommand::AddVertex { x: 1.0, y: 2.0 }).unwrap();
        session
            .set_image(DynamicImage::ImageRgb8(RgbImage::new(20, 20)))
            .unwrap();
        assert!(session.triangle().is_empty());
    }

    #[test]
    fn test_load_encoded_image() {
        let mut bytes = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([90, 90, 90])))
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();

        let mut session = session().with_canvas(16, 16);
        session.execute(PileCommand::AddVertex { x: 1.0, y: 2.0 }).unwrap();
        session.load_image_from_bytes(bytes.get_ref()).unwrap();

        assert_eq!(session.image().unwrap().width(), 32);
        assert!(session.triangle().is_empty());
        assert_eq!(session.display().unwrap().display_height, 12);

        assert!(matches!(
            session.load_image_from_bytes(b"not an image"),
            Err(DetectError::ImageLoad(_))
        ));
    }

    #[test]
    fn test_display_session_reports_original_frame() {
        let image = pile_image(400, 300, [(80, 270), (320, 270), (200, 80)], 40);
        let mut session = PileSession::new(
            PileProfile::builtin(PileKind::Zif2).with_override(&small_roi()).unwrap(),
        )
        .with_canvas(200, 200);
        session.set_image(image).unwrap();
        assert_eq!(session.input_frame(), Frame::Display);
        assert_eq!(session.display().unwrap().display_width, 200);

        let m = session.execute(PileCommand::AutoDetect { threshold: None }).unwrap();
        assert_eq!(session.triangle().frame(), Frame::Display);
        assert_eq!(m.triangle.frame(), Frame::Original);

        let [left, right, _] = m.triangle.vertices().unwrap();
        assert!((left.x - 80.0).abs() <= 8.0);
        assert!((right.x - 320.0).abs() <= 8.0);

        // Same volume whether measured from display or original coordinates.
        let original = PileSession::new(session.profile().clone());
        let direct = ConeVolumeModel::new(original.policy())
            .compute(&m.triangle, &original.profile().calibration().unwrap());
        assert!((m.metrics.volume - direct.volume).abs() < 1e-6 * direct.volume.max(1.0));
    }
}
