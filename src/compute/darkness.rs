//! Darkness map: the target "ink demand" of a run.

use crate::schema::IntensityGrid;

/// H×W grid of ink demand in [0, 1] (0 = background, 1 = full ink).
#[derive(Debug, Clone, PartialEq)]
pub struct DarknessMap {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl DarknessMap {
    /// `darkness = 1 - intensity / 255`.
    pub fn from_intensity(grid: &IntensityGrid) -> Self {
        let data = grid
            .data
            .iter()
            .map(|&v| 1.0 - v as f32 / 255.0)
            .collect();
        Self {
            data,
            width: grid.width,
            height: grid.height,
        }
    }

    /// Build from raw darkness values, clamping into [0, 1].
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), width * height);
        let data = values.into_iter().map(|v| v.clamp(0.0, 1.0)).collect();
        Self {
            data,
            width,
            height,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total ink demand.
    pub fn total(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }

    /// Source intensity in unit range (1 = white), as seen by edge detection.
    pub fn intensity_unit(&self) -> Vec<f32> {
        self.data.iter().map(|&d| 1.0 - d).collect()
    }

    /// Box-filter downsample by an integer factor.
    ///
    /// Output dimensions are `max(1, dim / factor)`; each output pixel averages
    /// the block it covers.
    pub fn downsample(&self, factor: usize) -> Self {
        let factor = factor.max(1);
        if factor == 1 {
            return self.clone();
        }

        let out_w = (self.width / factor).max(1);
        let out_h = (self.height / factor).max(1);
        let mut data = vec![0.0f32; out_w * out_h];

        for oy in 0..out_h {
            let y0 = oy * factor;
            let y1 = ((oy + 1) * factor).min(self.height);
            for ox in 0..out_w {
                let x0 = ox * factor;
                let x1 = ((ox + 1) * factor).min(self.width);

                let mut sum = 0.0f32;
                let mut count = 0usize;
                for y in y0..y1 {
                    for x in x0..x1 {
                        sum += self.data[y * self.width + x];
                        count += 1;
                    }
                }
                data[oy * out_w + ox] = if count > 0 { sum / count as f32 } else { 0.0 };
            }
        }

        Self {
            data,
            width: out_w,
            height: out_h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let grid = IntensityGrid::new(3, 1, vec![255, 0, 51]).unwrap();
        let map = DarknessMap::from_intensity(&grid);
        assert_eq!(map.data[0], 0.0);
        assert_eq!(map.data[1], 1.0);
        assert!((map.data[2] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_blank_image_total_zero() {
        let map = DarknessMap::from_intensity(&IntensityGrid::filled(30, 30, 255));
        assert_eq!(map.total(), 0.0);
    }

    #[test]
    fn test_downsample_average() {
        let map = DarknessMap::from_values(4, 2, vec![1.0, 0.0, 0.5, 0.5, 1.0, 0.0, 0.5, 0.5]);
        let small = map.downsample(2);
        assert_eq!((small.width, small.height), (2, 1));
        assert!((small.data[0] - 0.5).abs() < 1e-6);
        assert!((small.data[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_downsample_identity() {
        let map = DarknessMap::from_values(3, 3, vec![0.1; 9]);
        assert_eq!(map.downsample(1), map);
    }
}
