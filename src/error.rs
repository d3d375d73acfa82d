use thiserror::Error;

use crate::track::TrackSegment;

/// Top-level error type for the cell geometry core.
#[derive(Debug, Error)]
pub enum CellGeoError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Track(#[from] TrackError),
}

/// Errors related to surface construction and evaluation.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("surface has no card form: {0}")]
    Unrepresentable(String),
}

/// Errors raised while building, resolving or minimising boolean rules.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("cyclic cell reference: {}", format_cycle(.0))]
    CyclicReference(Vec<u32>),

    #[error("{count} distinct literals exceed the minimisation limit of {limit}")]
    TooManyLiterals { count: usize, limit: usize },

    #[error("cell complement #{0} has not been resolved")]
    UnresolvedReference(u32),

    #[error("prime implicant search exceeded the limit of {limit} implicants")]
    ImplicantLimit { limit: usize },

    #[error("rule reduces to the {} region and has no card form", region_name(.universe))]
    ConstantRegion { universe: bool },
}

/// Errors raised by the surface and cell registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("surface {0} not found")]
    SurfaceNotFound(u32),

    #[error("cell {0} not found")]
    CellNotFound(u32),

    #[error("surface {0} already exists")]
    DuplicateSurface(u32),

    #[error("cell {0} already exists")]
    DuplicateCell(u32),

    #[error("renumbering maps more than one entry onto {0}")]
    RenumberConflict(u32),

    #[error("number {0} exceeds the largest allowed number")]
    NumberOutOfRange(u32),

    #[error("no free numbers left")]
    NumbersExhausted,
}

/// Errors raised while walking a ray through the cells.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("tracking stalled after {} segments", .partial.len())]
    TrackingStalled { partial: Vec<TrackSegment> },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn region_name(universe: &bool) -> &'static str {
    if *universe {
        "universal"
    } else {
        "empty"
    }
}

fn format_cycle(cells: &[u32]) -> String {
    cells
        .iter()
        .map(|c| format!("#{c}"))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Convenience type alias for results using [`CellGeoError`].
pub type Result<T> = std::result::Result<T, CellGeoError>;
