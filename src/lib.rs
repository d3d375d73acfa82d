//! Constructive-solid-geometry cell core.
//!
//! Implicit surfaces are combined through signed boolean [`rule::Rule`]s into
//! numbered [`cell::Cell`]s. A [`registry::Model`] owns the surface and cell
//! registries; binding it yields a read-only view that answers containment
//! queries and walks rays with [`track::LineTrack`].

pub mod cell;
pub mod config;
pub mod error;
pub mod geometry;
pub mod math;
pub mod registry;
pub mod rule;
pub mod track;

/// Public number of a registered surface.
pub type SurfaceId = u32;

/// Public number of a registered cell.
pub type CellId = u32;

pub use cell::{BoundCell, Cell};
pub use config::Settings;
pub use error::{CellGeoError, Result};
pub use registry::{BoundModel, CellRegistry, Model, SurfaceRegistry};
pub use rule::{HeadRule, Minimizer, Rule};
pub use track::{LineTrack, Track, TrackSegment, Tracker};
