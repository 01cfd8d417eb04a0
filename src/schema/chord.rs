//! Chord and result types.

use serde::{Deserialize, Serialize};

/// Canonical unordered pair of distinct anchor indices, stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Chord {
    a: usize,
    b: usize,
}

impl Chord {
    /// Build a canonical chord. Returns `None` for self-loops.
    pub fn new(i: usize, j: usize) -> Option<Self> {
        match i.cmp(&j) {
            std::cmp::Ordering::Less => Some(Self { a: i, b: j }),
            std::cmp::Ordering::Greater => Some(Self { a: j, b: i }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Lower anchor index.
    #[inline]
    pub fn a(&self) -> usize {
        self.a
    }

    /// Higher anchor index.
    #[inline]
    pub fn b(&self) -> usize {
        self.b
    }

    /// Whether `anchor` is one of the endpoints.
    #[inline]
    pub fn touches(&self, anchor: usize) -> bool {
        self.a == anchor || self.b == anchor
    }

    /// Endpoint opposite `anchor`, if `anchor` is an endpoint.
    pub fn other(&self, anchor: usize) -> Option<usize> {
        if anchor == self.a {
            Some(self.b)
        } else if anchor == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// All chords between `n_anchors` anchors in lexicographic order.
    pub fn enumerate(n_anchors: usize) -> impl Iterator<Item = Chord> {
        (0..n_anchors).flat_map(move |a| ((a + 1)..n_anchors).map(move |b| Chord { a, b }))
    }

    /// Wire representation.
    #[inline]
    pub fn to_vector(self) -> ChordVector {
        ChordVector {
            from: self.a,
            to: self.b,
        }
    }
}

/// A drawn string as delivered to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordVector {
    pub from: usize,
    pub to: usize,
}

/// Why a strategy stopped producing chords.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Produced `n_strings` chords.
    Completed,
    /// No remaining candidate improves the objective.
    NoImprovement,
    /// Cancellation token was raised; the committed prefix is returned.
    Cancelled,
}

/// Output of a strategy run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResult {
    /// Chords in commit order.
    pub chords: Vec<ChordVector>,
    /// Reason the run ended.
    pub stop_reason: StopReason,
}

impl GenerateResult {
    #[inline]
    pub fn len(&self) -> usize {
        self.chords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chord_canonical() {
        let c = Chord::new(7, 2).unwrap();
        assert_eq!((c.a(), c.b()), (2, 7));
        assert_eq!(c, Chord::new(2, 7).unwrap());
        assert!(Chord::new(3, 3).is_none());
    }

    #[test]
    fn test_chord_other() {
        let c = Chord::new(1, 4).unwrap();
        assert_eq!(c.other(1), Some(4));
        assert_eq!(c.other(4), Some(1));
        assert_eq!(c.other(2), None);
        assert!(c.touches(4));
        assert!(!c.touches(0));
    }

    #[test]
    fn test_enumerate_count_and_order() {
        let all: Vec<_> = Chord::enumerate(5).collect();
        assert_eq!(all.len(), 10);
        assert_eq!(all[0], Chord::new(0, 1).unwrap());
        assert_eq!(all[9], Chord::new(3, 4).unwrap());
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_vector_serialization() {
        let v = Chord::new(5, 3).unwrap().to_vector();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"from":3,"to":5}"#);
    }
}
