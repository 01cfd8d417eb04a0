//! Ink canvas used by rendering-based strategies and previews.

use super::{AnchorLayout, ChordMask, ChordRasterizer, DarknessMap};
use crate::schema::{Chord, ChordVector, ConfigError, IntensityGrid};

/// Per-pixel ink coverage in [0, 1]; starts as blank background.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub ink: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            ink: vec![0.0; width * height],
            width,
            height,
        }
    }

    /// Draw a chord with opaque ink.
    pub fn draw(&mut self, mask: &ChordMask) {
        for &p in mask.pixels() {
            self.ink[p as usize] = 1.0;
        }
    }

    /// Sum of squared differences against the target.
    pub fn sse(&self, target: &DarknessMap) -> f64 {
        self.ink
            .iter()
            .zip(target.data.iter())
            .map(|(&i, &d)| {
                let diff = (i - d) as f64;
                diff * diff
            })
            .sum()
    }

    /// Darkness still missing: `max(target - ink, 0)`.
    pub fn residual(&self, target: &DarknessMap) -> Vec<f32> {
        self.ink
            .iter()
            .zip(target.data.iter())
            .map(|(&i, &d)| (d - i).max(0.0))
            .collect()
    }

    /// 8-bit preview, white background with black ink.
    pub fn to_intensity(&self) -> IntensityGrid {
        IntensityGrid {
            width: self.width,
            height: self.height,
            data: self
                .ink
                .iter()
                .map(|&i| (255.0 * (1.0 - i.clamp(0.0, 1.0))).round() as u8)
                .collect(),
        }
    }
}

/// Render a chord list on a blank canvas, as a client preview would.
pub fn render_chords(
    chords: &[ChordVector],
    width: usize,
    height: usize,
    n_anchors: usize,
    line_width: usize,
    margin: f64,
) -> Result<IntensityGrid, ConfigError> {
    let layout = AnchorLayout::generate(n_anchors, width, height, margin)?;
    let raster = ChordRasterizer::new(width, height, line_width);
    let mut canvas = Canvas::new(width, height);

    for (idx, v) in chords.iter().enumerate() {
        if v.from >= n_anchors || v.to >= n_anchors {
            return Err(ConfigError::InvalidParameter(format!(
                "chord {idx} references anchor outside 0..{n_anchors}"
            )));
        }
        let Some(chord) = Chord::new(v.from, v.to) else {
            return Err(ConfigError::InvalidParameter(format!(
                "chord {idx} connects anchor {} to itself",
                v.from
            )));
        };
        canvas.draw(&raster.chord_mask(&layout, chord));
    }

    log::debug!("Rendered {} chords on {}x{} canvas", chords.len(), width, height);
    Ok(canvas.to_intensity())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_diagonal() {
        let vectors = [ChordVector { from: 0, to: 2 }];
        let img = render_chords(&vectors, 100, 100, 4, 3, 10.0).unwrap();

        assert_eq!((img.width, img.height), (100, 100));
        assert!(img.data.iter().any(|&v| v < 255));
        assert!(img.mean() > 200.0);
    }

    #[test]
    fn test_render_rejects_bad_anchor() {
        let vectors = [ChordVector { from: 0, to: 9 }];
        assert!(render_chords(&vectors, 50, 50, 4, 1, 5.0).is_err());
    }

    #[test]
    fn test_sse_and_residual() {
        let target = DarknessMap::from_values(2, 1, vec![1.0, 0.25]);
        let mut canvas = Canvas::new(2, 1);
        assert!((canvas.sse(&target) - (1.0 + 0.0625)).abs() < 1e-9);

        let raster = ChordRasterizer::new(2, 1, 1);
        let mask = raster.mask(
            crate::compute::Point { x: 0.0, y: 0.0 },
            crate::compute::Point { x: 0.0, y: 0.0 },
        );
        canvas.draw(&mask);
        assert_eq!(canvas.residual(&target), vec![0.0, 0.25]);
        assert!((canvas.sse(&target) - 0.0625).abs() < 1e-9);
    }
}
