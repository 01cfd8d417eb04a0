//! Chord rasterization.
//!
//! Every mask in a run comes from [`ChordRasterizer::mask`], so scores compared
//! across iterations and strategies always see the same pixels. The rule:
//!
//! 1. Each endpoint is rounded to the nearest pixel and clamped into the grid.
//! 2. The centre line is traced with integer Bresenham from the lower-index
//!    anchor to the higher-index anchor.
//! 3. Each centre pixel is stamped with a `t×t` square brush covering offsets
//!    `-(t-1)/2 ..= t/2` on both axes (clipped at the border).
//! 4. Pixels are stored as sorted, de-duplicated row-major indices.

use super::{AnchorLayout, Point};
use crate::schema::Chord;

/// Sparse boolean coverage mask over an H×W grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordMask {
    pixels: Vec<u32>,
}

impl ChordMask {
    /// Covered pixel indices in ascending order.
    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Dot product of the mask against a dense grid.
    #[inline]
    pub fn dot(&self, grid: &[f32]) -> f64 {
        self.pixels.iter().map(|&p| grid[p as usize] as f64).sum()
    }

    /// Expand into a dense boolean grid.
    pub fn to_dense(&self, width: usize, height: usize) -> Vec<bool> {
        let mut dense = vec![false; width * height];
        for &p in &self.pixels {
            dense[p as usize] = true;
        }
        dense
    }
}

/// Renders anchor pairs into coverage masks.
#[derive(Debug, Clone, Copy)]
pub struct ChordRasterizer {
    width: usize,
    height: usize,
    thickness: usize,
}

impl ChordRasterizer {
    pub fn new(width: usize, height: usize, thickness: usize) -> Self {
        Self {
            width,
            height,
            thickness: thickness.max(1),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Mask for the segment between two points.
    pub fn mask(&self, a: Point, b: Point) -> ChordMask {
        let (x0, y0) = self.to_pixel(a);
        let (x1, y1) = self.to_pixel(b);

        let lo = -((self.thickness as i64 - 1) / 2);
        let hi = self.thickness as i64 / 2;
        let w = self.width as i64;
        let h = self.height as i64;

        let mut pixels = Vec::new();
        for (cx, cy) in bresenham(x0, y0, x1, y1) {
            for dy in lo..=hi {
                let y = cy + dy;
                if y < 0 || y >= h {
                    continue;
                }
                for dx in lo..=hi {
                    let x = cx + dx;
                    if x < 0 || x >= w {
                        continue;
                    }
                    pixels.push((y * w + x) as u32);
                }
            }
        }

        pixels.sort_unstable();
        pixels.dedup();
        ChordMask { pixels }
    }

    /// Mask for a chord of the given layout.
    pub fn chord_mask(&self, layout: &AnchorLayout, chord: Chord) -> ChordMask {
        self.mask(layout.get(chord.a()), layout.get(chord.b()))
    }

    fn to_pixel(&self, p: Point) -> (i64, i64) {
        let x = (p.x.round() as i64).clamp(0, self.width as i64 - 1);
        let y = (p.y.round() as i64).clamp(0, self.height as i64 - 1);
        (x, y)
    }
}

/// Integer Bresenham line including both endpoints.
pub fn bresenham(mut x0: i64, mut y0: i64, x1: i64, y1: i64) -> Vec<(i64, i64)> {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut points = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    loop {
        points.push((x0, y0));
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
    points
}
