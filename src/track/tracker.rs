use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::registry::BoundModel;

use super::{LineTrack, Track};

/// Runs rays against one bound model, optionally in parallel.
///
/// The model is only read, so any number of rays may walk it at once.
#[derive(Debug, Clone, Copy)]
pub struct Tracker<'m, 'a> {
    model: &'m BoundModel<'a>,
}

impl<'m, 'a> Tracker<'m, 'a> {
    #[must_use]
    pub fn new(model: &'m BoundModel<'a>) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn model(&self) -> &'m BoundModel<'a> {
        self.model
    }

    /// Walks a single ray.
    ///
    /// # Errors
    ///
    /// See [`LineTrack::execute`].
    pub fn track(&self, ray: &LineTrack) -> Result<Track> {
        ray.execute(self.model)
    }

    /// Walks every ray on the rayon pool. Results keep the order of `rays`.
    #[must_use]
    pub fn track_many(&self, rays: &[LineTrack]) -> Vec<Result<Track>> {
        debug!(rays = rays.len(), "tracking in parallel");
        rays.par_iter().map(|ray| ray.execute(self.model)).collect()
    }
}
