pub mod preprocessing;
pub mod extraction;
pub mod classification;

pub use preprocessing::*;
pub use extraction::*;
pub use classification::*;
