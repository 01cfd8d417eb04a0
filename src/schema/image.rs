//! Input intensity grid.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Row-major grid of 8-bit grayscale intensities (0 = black, 255 = white).
///
/// Produced by an external preprocessing step (decoding, resizing, contrast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntensityGrid {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl IntensityGrid {
    /// Wrap raw pixels, checking the dimensions.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ConfigError> {
        let grid = Self {
            width,
            height,
            data,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Uniform grid filled with `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Check that the grid is non-empty and the pixel count matches.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 || self.data.len() != self.width * self.height {
            return Err(ConfigError::InvalidDimensions);
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    /// Mean intensity.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch() {
        assert!(IntensityGrid::new(3, 3, vec![0; 8]).is_err());
        assert!(IntensityGrid::new(0, 3, vec![]).is_err());
        assert!(IntensityGrid::new(3, 3, vec![0; 9]).is_ok());
    }

    #[test]
    fn test_get_set() {
        let mut grid = IntensityGrid::filled(4, 2, 255);
        grid.set(3, 1, 10);
        assert_eq!(grid.get(3, 1), 10);
        assert_eq!(grid.data[7], 10);
    }
}
