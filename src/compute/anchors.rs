//! Anchor layout on the circle.
//!
//! Anchors are the nails of the physical piece: `n` points evenly spaced on a
//! circle centred in the image.

use serde::{Deserialize, Serialize};

use crate::schema::{ConfigError, MIN_ANCHORS};

/// A 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn distance_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_sq(other).sqrt()
    }
}

/// Immutable anchor coordinates for one run.
#[derive(Debug, Clone)]
pub struct AnchorLayout {
    points: Vec<Point>,
    center: Point,
    radius: f64,
}

impl AnchorLayout {
    /// Place `n_anchors` anchors at angles `2πk/n` on a circle of radius
    /// `min(width, height)/2 - margin` centred at `(width/2, height/2)`.
    pub fn generate(
        n_anchors: usize,
        width: usize,
        height: usize,
        margin: f64,
    ) -> Result<Self, ConfigError> {
        if n_anchors < MIN_ANCHORS {
            return Err(ConfigError::TooFewAnchors(n_anchors));
        }
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if !margin.is_finite() || margin < 0.0 {
            return Err(ConfigError::InvalidMargin(margin));
        }

        let cx = width as f64 / 2.0;
        let cy = height as f64 / 2.0;
        let radius = cx.min(cy) - margin;
        if radius <= 0.0 {
            return Err(ConfigError::NonPositiveRadius(radius));
        }

        let points = (0..n_anchors)
            .map(|k| {
                let theta = 2.0 * std::f64::consts::PI * k as f64 / n_anchors as f64;
                Point {
                    x: cx + radius * theta.cos(),
                    y: cy + radius * theta.sin(),
                }
            })
            .collect();

        log::debug!(
            "Generated {} anchors (center=({:.1}, {:.1}), radius={:.2})",
            n_anchors,
            cx,
            cy,
            radius
        );

        Ok(Self {
            points,
            center: Point { x: cx, y: cy },
            radius,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Point {
        self.points[index]
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn center(&self) -> Point {
        self.center
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Euclidean distance between two anchors.
    #[inline]
    pub fn chord_length(&self, i: usize, j: usize) -> f64 {
        self.points[i].distance(&self.points[j])
    }

    /// Index of the anchor nearest to `p`; ties go to the lowest index.
    pub fn nearest(&self, p: Point) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (k, anchor) in self.points.iter().enumerate() {
            let d = anchor.distance_sq(&p);
            if d < best_dist {
                best_dist = d;
                best = k;
            }
        }
        best
    }
}
