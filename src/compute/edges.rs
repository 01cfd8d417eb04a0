//! Edge detection for candidate reduction.
//!
//! Canny on an 8-bit grayscale copy of the image via `imageproc`. Thresholds
//! are fractions of the maximum Sobel magnitude so the detector is
//! independent of image contrast.

use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::sobel_gradients;

use crate::schema::EdgeDetectionConfig;

/// Smoothing `imageproc::edges::canny` applies before its gradient.
const CANNY_SIGMA: f32 = 1.4;

/// Binary edge map.
#[derive(Debug, Clone)]
pub struct EdgeMap {
    pub edges: Vec<bool>,
    pub width: usize,
    pub height: usize,
}

impl EdgeMap {
    fn empty(width: usize, height: usize) -> Self {
        Self {
            edges: vec![false; width * height],
            width,
            height,
        }
    }

    /// Edge pixel coordinates in row-major order.
    pub fn points(&self) -> Vec<(usize, usize)> {
        self.edges
            .iter()
            .enumerate()
            .filter(|&(_, &e)| e)
            .map(|(i, _)| (i % self.width, i / self.width))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.edges.iter().filter(|&&e| e).count()
    }
}

/// Quantize a unit-range intensity grid to an 8-bit image.
pub fn to_gray_image(intensity: &[f32], width: usize, height: usize) -> GrayImage {
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let v = intensity[y as usize * width + x as usize];
        Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8])
    })
}

/// Extra blur so that together with canny's own pass the total is `sigma`.
fn pre_blur_sigma(sigma: f32) -> f32 {
    (sigma * sigma - CANNY_SIGMA * CANNY_SIGMA).max(0.0).sqrt()
}

/// Run the full detector on a unit-range intensity grid.
pub fn detect_edges(
    intensity: &[f32],
    width: usize,
    height: usize,
    config: &EdgeDetectionConfig,
) -> EdgeMap {
    if width == 0 || height == 0 {
        return EdgeMap::empty(width, height);
    }

    let mut gray = to_gray_image(intensity, width, height);
    let extra = pre_blur_sigma(config.sigma);
    if extra > 0.0 {
        gray = gaussian_blur_f32(&gray, extra);
    }

    // Same smoothing and kernel canny uses, so thresholds line up
    let magnitude = sobel_gradients(&gaussian_blur_f32(&gray, CANNY_SIGMA));
    let max_mag = magnitude.pixels().map(|p| p[0]).max().unwrap_or(0) as f32;
    if max_mag <= 0.0 {
        return EdgeMap::empty(width, height);
    }

    let low = config.low_threshold * max_mag;
    let high = (config.high_threshold * max_mag).max(low);
    let detected = canny(&gray, low, high);

    EdgeMap {
        edges: detected.pixels().map(|p| p[0] > 0).collect(),
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_grid(width: usize, height: usize, at: usize) -> Vec<f32> {
        (0..width * height)
            .map(|i| if i % width < at { 0.0 } else { 1.0 })
            .collect()
    }

    #[test]
    fn test_gray_image_quantization() {
        let image = to_gray_image(&[0.0, 0.5, 1.0, 2.0], 2, 2);
        assert_eq!(image.get_pixel(0, 0)[0], 0);
        assert_eq!(image.get_pixel(1, 0)[0], 128);
        assert_eq!(image.get_pixel(0, 1)[0], 255);
        assert_eq!(image.get_pixel(1, 1)[0], 255);
    }

    #[test]
    fn test_pre_blur_tops_up_to_sigma() {
        assert_eq!(pre_blur_sigma(1.0), 0.0);
        let extra = pre_blur_sigma(2.0);
        let total = (extra * extra + CANNY_SIGMA * CANNY_SIGMA).sqrt();
        assert!((total - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_flat_image_has_no_edges() {
        let map = detect_edges(&vec![1.0; 400], 20, 20, &EdgeDetectionConfig::default());
        assert_eq!(map.count(), 0);
        assert_eq!(map.edges.len(), 400);
    }

    #[test]
    fn test_vertical_step_edge() {
        let width = 40;
        let height = 40;
        let grid = step_grid(width, height, 20);

        let map = detect_edges(&grid, width, height, &EdgeDetectionConfig::default());
        assert!(map.count() >= height / 2);
        // Edges hug the step
        for (x, _) in map.points() {
            assert!((16..=23).contains(&x), "edge at x={}", x);
        }
    }

    #[test]
    fn test_thresholds_scale_with_contrast() {
        let width = 40;
        let height = 40;
        let faint: Vec<f32> = step_grid(width, height, 20)
            .into_iter()
            .map(|v| 0.4 + 0.2 * v)
            .collect();

        let map = detect_edges(&faint, width, height, &EdgeDetectionConfig::default());
        assert!(map.count() > 0);
    }
}
