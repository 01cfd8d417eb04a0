//! Compute module - Geometry, rasterization and chord selection strategies.

mod anchors;
mod candidates;
mod canvas;
mod darkness;
mod edges;
mod hough;
mod raster;
mod rng;

pub mod strategy;

pub use anchors::*;
pub use candidates::*;
pub use canvas::*;
pub use darkness::*;
pub use edges::*;
pub use hough::*;
pub use raster::*;
pub use rng::*;
