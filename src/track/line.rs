use tracing::{instrument, trace, warn};

use crate::cell::BoundCell;
use crate::error::{CellGeoError, GeometryError, Result, TrackError};
use crate::math::{unit, Point3, Vector3};
use crate::registry::BoundModel;

use super::{Track, TrackSegment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackState {
    /// Between cells, looking for the next entry.
    Seeking,
    /// Inside one or more cells, looking for the next boundary.
    Inside,
    Exited,
}

/// Walks a ray through a bound model, recording the cells it crosses.
///
/// At every step the cells the ray is inside of just past the current
/// position are active, decided with [`BoundCell::contains_along`] so that
/// shallow crossings are seen at any angle. The next event is the nearest exit from an active
/// cell or entry into an inactive one; each active cell receives a segment
/// up to that event. The walk ends at the maximum range, or when no further
/// boundary lies ahead. An unbounded final stretch is not recorded.
#[derive(Debug, Clone)]
pub struct LineTrack {
    origin: Point3,
    direction: Vector3,
    max_range: f64,
    max_segments: Option<usize>,
}

impl LineTrack {
    /// Creates an unbounded ray.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] for a zero direction.
    pub fn new(origin: Point3, direction: Vector3) -> Result<Self> {
        let direction = unit(&direction).ok_or(GeometryError::ZeroVector)?;
        Ok(Self {
            origin,
            direction,
            max_range: f64::INFINITY,
            max_segments: None,
        })
    }

    /// Creates the ray from `start` to `end`, stopping at `end`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] if the points coincide.
    pub fn between(start: Point3, end: Point3) -> Result<Self> {
        let track = Self::new(start, end - start)?;
        Ok(track.with_max_range((end - start).norm()))
    }

    /// Stops the walk after `max_range` along the ray.
    #[must_use]
    pub fn with_max_range(mut self, max_range: f64) -> Self {
        self.max_range = max_range;
        self
    }

    /// Overrides the model's segment budget for this ray.
    #[must_use]
    pub fn with_max_segments(mut self, max_segments: usize) -> Self {
        self.max_segments = Some(max_segments);
        self
    }

    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Unit direction of the ray.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    #[must_use]
    pub fn max_range(&self) -> f64 {
        self.max_range
    }

    fn point_at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }

    /// Walks the ray.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::TrackingStalled`], carrying the segments found
    /// so far, once the walk would record more segments than the budget
    /// allows. Every step either records segments or crosses a gap between
    /// cells, so the walk also stalls after twice the budget in steps.
    #[instrument(level = "debug", skip(model), fields(origin = ?self.origin, direction = ?self.direction))]
    pub fn execute(&self, model: &BoundModel<'_>) -> Result<Track> {
        let settings = model.settings();
        let budget = self.max_segments.unwrap_or(settings.max_segments);
        let step_limit = budget.saturating_mul(2).saturating_add(1);
        let mut segments: Vec<TrackSegment> = Vec::new();
        let mut state = TrackState::Seeking;
        let mut t = 0.0;
        let mut steps = 0usize;

        while state != TrackState::Exited {
            let remaining = self.max_range - t;
            if remaining <= settings.min_step {
                break;
            }
            steps += 1;
            if steps > step_limit {
                return Err(stalled(segments));
            }

            let here = self.point_at(t);
            let (active, inactive): (Vec<&BoundCell<'_>>, Vec<&BoundCell<'_>>) = model
                .cells()
                .iter()
                .partition(|c| c.contains_along(&here, &self.direction));

            let next = active
                .iter()
                .filter_map(|c| c.exit_surface(&here, &self.direction))
                .chain(
                    inactive
                        .iter()
                        .filter_map(|c| c.entry_surface(&here, &self.direction)),
                )
                .map(|(_, d)| t + d)
                .reduce(f64::min);

            state = if active.is_empty() {
                TrackState::Seeking
            } else {
                TrackState::Inside
            };
            trace!(?state, t, ?next, active = active.len(), "step");

            let end = match next {
                Some(end) if end < self.max_range => end,
                _ if self.max_range.is_finite() => self.max_range,
                _ => break,
            };
            if state == TrackState::Seeking && next.is_none() {
                break;
            }

            if segments.len() + active.len() > budget {
                return Err(stalled(segments));
            }
            let (entry, exit) = (self.point_at(t), self.point_at(end));
            segments.extend(active.iter().map(|c| TrackSegment {
                cell: c.number(),
                entry,
                exit,
                length: end - t,
            }));

            if end >= self.max_range {
                state = TrackState::Exited;
            }
            t = end;
        }

        Ok(Track::from(segments))
    }
}

fn stalled(partial: Vec<TrackSegment>) -> CellGeoError {
    warn!(segments = partial.len(), "tracking stalled");
    TrackError::TrackingStalled { partial }.into()
}
