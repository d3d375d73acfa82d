//! Tunable tolerances and limits.
//!
//! Every numeric threshold the core uses is defined here once. Operations take
//! a [`Settings`] value explicitly; nothing reads process-wide state.

/// Half-width of the band around a surface inside which a point counts as
/// lying on it.
pub const SIDE_TOLERANCE: f64 = 1e-8;

/// Tolerance on normalised surface coefficients when deciding whether two
/// surfaces describe the same geometry.
pub const EQUALITY_TOLERANCE: f64 = 1e-6;

/// Default ceiling on distinct literals for exhaustive minterm evaluation.
pub const DEFAULT_LITERAL_LIMIT: usize = 12;

/// Absolute ceiling on distinct literals. Minterms are encoded in a `u64`
/// and the truth table is enumerated in full, so anything larger is never
/// attempted regardless of configuration.
pub const MAX_LITERAL_LIMIT: usize = 30;

/// Default ceiling on the implicants a single prime-implicant search may
/// generate. The search over `n` literals can produce up to `3^n` of them.
pub const DEFAULT_IMPLICANT_LIMIT: usize = 200_000;

/// Largest surface or cell number. Surface literals are signed `i32`.
pub const MAX_NUMBER: u32 = 0x7FFF_FFFF;

/// Default number of segments a single track may produce.
pub const DEFAULT_MAX_SEGMENTS: usize = 10_000;

/// Smallest distance a tracked ray must advance to accept a boundary.
pub const MIN_STEP: f64 = 1e-7;

/// Cosine below which a ray counts as running along a surface rather than
/// crossing it.
pub const GRAZING_COSINE: f64 = 1e-9;

/// Runtime configuration for a model build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// See [`SIDE_TOLERANCE`].
    pub side_tolerance: f64,
    /// See [`EQUALITY_TOLERANCE`].
    pub equality_tolerance: f64,
    /// Literal ceiling for minimisation, clamped to [`MAX_LITERAL_LIMIT`].
    pub literal_limit: usize,
    /// See [`DEFAULT_IMPLICANT_LIMIT`].
    pub implicant_limit: usize,
    /// Segment budget for a single track.
    pub max_segments: usize,
    /// See [`MIN_STEP`].
    pub min_step: f64,
    /// See [`GRAZING_COSINE`].
    pub grazing_cosine: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            side_tolerance: SIDE_TOLERANCE,
            equality_tolerance: EQUALITY_TOLERANCE,
            literal_limit: DEFAULT_LITERAL_LIMIT,
            implicant_limit: DEFAULT_IMPLICANT_LIMIT,
            max_segments: DEFAULT_MAX_SEGMENTS,
            min_step: MIN_STEP,
            grazing_cosine: GRAZING_COSINE,
        }
    }
}

impl Settings {
    /// Returns the literal ceiling actually applied.
    #[must_use]
    pub fn effective_literal_limit(&self) -> usize {
        self.literal_limit.min(MAX_LITERAL_LIMIT)
    }

    /// Returns a copy with a different literal ceiling.
    #[must_use]
    pub fn with_literal_limit(mut self, limit: usize) -> Self {
        self.literal_limit = limit;
        self
    }

    /// Returns a copy with a different implicant ceiling.
    #[must_use]
    pub fn with_implicant_limit(mut self, limit: usize) -> Self {
        self.implicant_limit = limit;
        self
    }

    /// Returns a copy with a different segment budget.
    #[must_use]
    pub fn with_max_segments(mut self, max_segments: usize) -> Self {
        self.max_segments = max_segments;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_step_clears_side_band() {
        assert!(MIN_STEP > SIDE_TOLERANCE);
        assert!(GRAZING_COSINE < SIDE_TOLERANCE);
    }

    #[test]
    fn literal_limit_is_clamped() {
        let s = Settings::default().with_literal_limit(64);
        assert_eq!(s.effective_literal_limit(), MAX_LITERAL_LIMIT);
        assert_eq!(Settings::default().effective_literal_limit(), 12);
    }
}
