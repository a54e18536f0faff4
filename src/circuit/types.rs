//! Core types for circuit representation.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a node in the circuit's node arena.
///
/// Ids are handed out per circuit instance in creation order and stay valid
/// for the lifetime of the circuit; nodes are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// A recorded series of `(abscissa, value)` points.
///
/// The abscissa is time, a swept source value, a frequency or a phase,
/// depending on which analysis filled the series.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct History {
    points: Vec<(f64, f64)>,
}

impl History {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point.
    pub fn push(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
    }

    /// Remove all points.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Number of recorded points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points in recording order.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// The abscissa values.
    pub fn xs(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(x, _)| x)
    }

    /// The recorded values.
    pub fn ys(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(_, y)| y)
    }

    /// The most recently recorded point.
    pub fn last(&self) -> Option<(f64, f64)> {
        self.points.last().copied()
    }
}
