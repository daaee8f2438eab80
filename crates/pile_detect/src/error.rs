use cone_geometry::GeometryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Unknown pile configuration: {0}")]
    UnknownPileConfiguration(String),

    #[error("Invalid ROI [{x1}, {x2}, {y1}, {y2}] for {width}x{height} image: {reason}")]
    InvalidRoi {
        x1: u32,
        x2: u32,
        y1: u32,
        y2: u32,
        width: u32,
        height: u32,
        reason: &'static str,
    },

    #[error("Invalid cone center band [{min_pct}, {max_pct}]: expected 0 <= min <= max <= 100")]
    InvalidConeCenter { min_pct: f64, max_pct: f64 },

    #[error(transparent)]
    InvalidCalibration(#[from] GeometryError),

    #[error("Vertex index {index} out of range for triangle with {len} points")]
    VertexOutOfRange { index: usize, len: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectError {
    /// Setup mistakes the operator must fix, as opposed to image conditions.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownPileConfiguration(_)
                | Self::InvalidRoi { .. }
                | Self::InvalidConeCenter { .. }
                | Self::InvalidCalibration(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DetectError>;
