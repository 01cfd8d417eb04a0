//! String art - Chord selection for thread-and-nail portraits.
//!
//! Given a grayscale image and a ring of anchors (nails), this crate picks an
//! ordered sequence of chords (strings between two anchors) whose overlaid
//! rendering approximates the image.
//!
//! # Architecture
//!
//! - `schema`: Parameters, images, chords and job files
//! - `compute`: Anchor layout, rasterization, candidate sets and the strategies
//! - `job`: Running a job on a worker thread with streamed chord events
//!
//! # Example
//!
//! ```rust,no_run
//! use string_art::{
//!     compute::{DarknessMap, strategy::{CancelToken, REGISTRY}},
//!     schema::{IntensityGrid, StrategyParams},
//! };
//!
//! let image = IntensityGrid::filled(200, 200, 255);
//! let darkness = DarknessMap::from_intensity(&image);
//! let params = StrategyParams {
//!     algorithm: "coverage".to_string(),
//!     ..Default::default()
//! };
//!
//! let cancel = CancelToken::new();
//! let mut print = |from: usize, to: usize| println!("{from} -> {to}");
//! let result = REGISTRY
//!     .run(&darkness, &params, Some(&mut print), Some(&cancel))
//!     .unwrap();
//! println!("{} strings", result.len());
//! ```

pub mod compute;
pub mod job;
pub mod schema;

// Re-export commonly used types
pub use compute::strategy::{
    CancelToken, ProgressSink, REGISTRY, Strategy, StrategyError, generate_string_vectors,
};
pub use compute::{AnchorLayout, DarknessMap, render_chords};
pub use job::{JobContext, JobEvent, JobHandle};
pub use schema::{ChordVector, GenerateResult, IntensityGrid, JobConfig, StrategyParams};
