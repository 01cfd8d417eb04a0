//! Progressive probabilistic Hough transform.
//!
//! Edge points are visited in random order and vote into a (rho, theta)
//! accumulator. As soon as one point lifts a bin above the threshold, the line
//! through it is walked in both directions (bridging gaps up to `line_gap`),
//! its pixels are removed from the edge set and, when long enough, reported
//! as a segment. Their votes are withdrawn so later points are not attracted
//! by an already extracted line.

use rand::Rng;
use rand::seq::SliceRandom;

use super::EdgeMap;

/// Number of angle bins over [-π/2, π/2).
const THETA_BINS: usize = 180;

/// Fixed-point shift used while walking a line.
const SHIFT: u32 = 16;

/// Detected segment endpoints in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub start: (usize, usize),
    pub end: (usize, usize),
}

impl LineSegment {
    pub fn length(&self) -> f64 {
        let dx = self.end.0 as f64 - self.start.0 as f64;
        let dy = self.end.1 as f64 - self.start.1 as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Segment extraction settings.
#[derive(Debug, Clone, Copy)]
pub struct HoughParams {
    pub threshold: usize,
    pub line_length: usize,
    pub line_gap: usize,
}

struct Accumulator {
    votes: Vec<u32>,
    cos: Vec<f64>,
    sin: Vec<f64>,
    offset: i64,
    rows: usize,
}

impl Accumulator {
    fn new(width: usize, height: usize) -> Self {
        let diag = ((width * width + height * height) as f64).sqrt().ceil() as usize;
        let rows = 2 * diag + 1;
        let (cos, sin) = (0..THETA_BINS)
            .map(|j| {
                let theta = -std::f64::consts::FRAC_PI_2
                    + std::f64::consts::PI * j as f64 / THETA_BINS as f64;
                (theta.cos(), theta.sin())
            })
            .unzip();
        Self {
            votes: vec![0; rows * THETA_BINS],
            cos,
            sin,
            offset: diag as i64,
            rows,
        }
    }

    #[inline]
    fn bin(&self, x: usize, y: usize, j: usize) -> usize {
        let rho = (self.cos[j] * x as f64 + self.sin[j] * y as f64).round() as i64 + self.offset;
        debug_assert!(rho >= 0 && (rho as usize) < self.rows);
        rho as usize * THETA_BINS + j
    }

    /// Add the votes of one point; returns the best bin (votes, theta index).
    fn vote(&mut self, x: usize, y: usize) -> (u32, usize) {
        let mut best = (0, 0);
        for j in 0..THETA_BINS {
            let b = self.bin(x, y, j);
            self.votes[b] += 1;
            if self.votes[b] > best.0 {
                best = (self.votes[b], j);
            }
        }
        best
    }

    fn unvote(&mut self, x: usize, y: usize) {
        for j in 0..THETA_BINS {
            let b = self.bin(x, y, j);
            self.votes[b] = self.votes[b].saturating_sub(1);
        }
    }
}

/// Fixed-point walker along the line direction.
struct Walker {
    x_major: bool,
    x0: i64,
    y0: i64,
    dx: i64,
    dy: i64,
}

impl Walker {
    fn new(x: usize, y: usize, theta_cos: f64, theta_sin: f64) -> Self {
        // Line direction is perpendicular to the normal (cos, sin)
        let a = -theta_sin;
        let b = theta_cos;
        let one = (1i64 << SHIFT) as f64;
        let half = 1i64 << (SHIFT - 1);

        if a.abs() > b.abs() {
            Self {
                x_major: true,
                x0: x as i64,
                y0: ((y as i64) << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
            }
        } else {
            Self {
                x_major: false,
                x0: ((x as i64) << SHIFT) + half,
                y0: y as i64,
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
            }
        }
    }

    /// Pixel positions in direction `k` (0 forward, 1 backward), unbounded.
    fn steps(&self, k: usize) -> impl Iterator<Item = (i64, i64)> + '_ {
        let sign = if k == 0 { 1 } else { -1 };
        (0i64..).map(move |n| {
            let px = self.x0 + sign * n * self.dx;
            let py = self.y0 + sign * n * self.dy;
            if self.x_major {
                (px, py >> SHIFT)
            } else {
                (px >> SHIFT, py)
            }
        })
    }
}

/// Extract line segments from an edge map.
pub fn probabilistic_hough<R: Rng>(
    edges: &EdgeMap,
    params: HoughParams,
    rng: &mut R,
) -> Vec<LineSegment> {
    let width = edges.width;
    let height = edges.height;
    let in_bounds =
        |x: i64, y: i64| x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height;

    let mut mask = edges.edges.clone();
    let mut acc = Accumulator::new(width, height);
    let mut points = edges.points();
    points.shuffle(rng);

    let threshold = params.threshold.max(1) as u32;
    let mut segments = Vec::new();

    for (x, y) in points {
        if !mask[y * width + x] {
            continue;
        }

        let (votes, theta) = acc.vote(x, y);
        if votes < threshold {
            continue;
        }

        let walker = Walker::new(x, y, acc.cos[theta], acc.sin[theta]);

        // Pass 1: find the extent in both directions
        let mut ends = [(x, y); 2];
        for (k, end) in ends.iter_mut().enumerate() {
            let mut gap = 0;
            for (px, py) in walker.steps(k) {
                if !in_bounds(px, py) {
                    break;
                }
                let (ux, uy) = (px as usize, py as usize);
                if mask[uy * width + ux] {
                    gap = 0;
                    *end = (ux, uy);
                } else {
                    gap += 1;
                    if gap > params.line_gap {
                        break;
                    }
                }
            }
        }

        let good = ends[0].0.abs_diff(ends[1].0) >= params.line_length
            || ends[0].1.abs_diff(ends[1].1) >= params.line_length;

        // Pass 2: consume the pixels of the walked line
        for (k, &end) in ends.iter().enumerate() {
            for (px, py) in walker.steps(k) {
                if !in_bounds(px, py) {
                    break;
                }
                let (ux, uy) = (px as usize, py as usize);
                let idx = uy * width + ux;
                if mask[idx] {
                    if good {
                        acc.unvote(ux, uy);
                    }
                    mask[idx] = false;
                }
                if (ux, uy) == end {
                    break;
                }
            }
        }

        if good {
            segments.push(LineSegment {
                start: ends[0],
                end: ends[1],
            });
        }
    }

    log::debug!(
        "Hough transform extracted {} segments from {} edge pixels",
        segments.len(),
        edges.count()
    );
    segments
}
