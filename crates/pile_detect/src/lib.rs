//! # Ore Pile Detection Library
//!
//! Finds the triangular silhouette of a conical ore pile in an overhead camera frame and
//! turns it into volume and mass estimates.
//!
//! ## Core Features
//!
//! - **Trait-based Architecture**: preprocessing, contour extraction and triangle
//!   classification are swappable trait objects
//! - **Per-pile Profiles**: ROI, cone-center band, threshold and calibration per camera,
//!   overridable from configuration
//! - **Interactive Sessions**: place, drag and clear vertices or auto-detect them
//! - **GeoJSON Export**: the measured triangle with its metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pile_detect::{DetectionOrchestrator, PileCommand, PileSession};
//!
//! let image = image::open("zif2.jpg")?;
//! let triangle = DetectionOrchestrator::new().detect(&image, "ZIF2", None, None)?;
//! println!("{:?}", triangle);
//!
//! let mut session = PileSession::for_pile("ZIF2", None)?;
//! session.load_image("zif2.jpg")?;
//! let measurement = session.execute(PileCommand::AutoDetect { threshold: None })?;
//! println!("{:.2} m3, {:.2} t", measurement.metrics.volume, measurement.metrics.mass);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Segmenter
//!
//! ```rust
//! use pile_detect::{Segmenter, algorithms::*};
//!
//! let segmenter = Segmenter::builder()
//!     .with_inverted_threshold(60)
//!     .add_preprocessor(OpeningPreprocessor { radius: 3 })
//!     .set_contour_extractor(ExternalContourExtractor)
//!     .build();
//! assert!(segmenter.info().contains("2 preprocessors"));
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod profiles;
pub mod orchestrator;
pub mod session;
pub mod io;

// Re-exports for convenience
pub use error::{DetectError, Result};
pub use types::{ConeCenterBand, Contour, DetectedTriangle, Measurement, RegionOfInterest};
pub use traits::*;
pub use pipeline::{Segmenter, builder::SegmenterBuilder};
pub use profiles::{DetectorKind, PileKind, PileProfile, ProfileOverride};
pub use orchestrator::{Detection, DetectionOrchestrator};
pub use session::{PileCommand, PileSession};
