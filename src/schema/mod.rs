//! Schema module - Parameter, input and result types for chord selection.

mod chord;
mod image;
mod job;
mod params;

pub use chord::*;
pub use image::*;
pub use job::*;
pub use params::*;
