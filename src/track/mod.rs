//! Walking rays through a bound model.

mod line;
mod tracker;

pub use line::LineTrack;
pub use tracker::Tracker;

use crate::math::Point3;
use crate::CellId;

/// One stretch of a ray inside one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSegment {
    pub cell: CellId,
    pub entry: Point3,
    pub exit: Point3,
    pub length: f64,
}

/// The ordered segments produced by walking one ray.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    segments: Vec<TrackSegment>,
}

impl Track {
    #[must_use]
    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    #[must_use]
    pub fn into_segments(self) -> Vec<TrackSegment> {
        self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of the segment lengths. Overlapping cells count once per cell.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|s| s.length).sum()
    }

    /// Cell numbers in the order they were crossed.
    #[must_use]
    pub fn cells(&self) -> Vec<CellId> {
        self.segments.iter().map(|s| s.cell).collect()
    }

    /// Total path length inside `cell`.
    #[must_use]
    pub fn length_in(&self, cell: CellId) -> f64 {
        self.segments
            .iter()
            .filter(|s| s.cell == cell)
            .map(|s| s.length)
            .sum()
    }
}

impl From<Vec<TrackSegment>> for Track {
    fn from(segments: Vec<TrackSegment>) -> Self {
        Self { segments }
    }
}
