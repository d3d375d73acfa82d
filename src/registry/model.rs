use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::cell::{BoundCell, Cell};
use crate::config::Settings;
use crate::error::Result;
use crate::geometry::Surface;
use crate::math::Point3;
use crate::rule::Minimizer;
use crate::{CellId, SurfaceId};

use super::{check_number, CellRegistry, SurfaceRegistry};

/// A complete geometry: settings plus the surface and cell registries.
///
/// The model is the explicit context every build step runs against; there
/// is no shared global registry.
#[derive(Debug, Default)]
pub struct Model {
    settings: Settings,
    surfaces: SurfaceRegistry,
    cells: CellRegistry,
}

impl Model {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            surfaces: SurfaceRegistry::with_tolerance(settings.equality_tolerance),
            cells: CellRegistry::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    pub fn surfaces_mut(&mut self) -> &mut SurfaceRegistry {
        &mut self.surfaces
    }

    #[must_use]
    pub fn cells(&self) -> &CellRegistry {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut CellRegistry {
        &mut self.cells
    }

    /// Boolean minimiser configured from the model settings.
    #[must_use]
    pub fn minimizer(&self) -> Minimizer {
        Minimizer::new(&self.settings)
    }

    /// Registers a surface, returning its signed number.
    ///
    /// # Errors
    ///
    /// See [`SurfaceRegistry::register_signed`].
    pub fn add_surface(&mut self, surface: impl Into<Surface>) -> Result<i32> {
        self.surfaces.register_signed(surface)
    }

    /// Adds a cell after checking that every surface it uses exists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RegistryError::SurfaceNotFound`] for unknown
    /// surfaces and [`crate::error::RegistryError::DuplicateCell`] if the
    /// number is taken.
    pub fn add_cell(&mut self, cell: Cell) -> Result<CellId> {
        for id in cell.head().all_surfaces() {
            self.surfaces.get(id)?;
        }
        self.cells.add(cell)
    }

    /// Renumbers surfaces in the registry and in every cell rule.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RegistryError::RenumberConflict`] if two
    /// surfaces would share a number and
    /// [`crate::error::RegistryError::NumberOutOfRange`] for targets above
    /// [`crate::config::MAX_NUMBER`]; nothing changes in either case.
    #[instrument(level = "debug", skip_all, fields(entries = mapping.len()))]
    pub fn renumber_surfaces(&mut self, mapping: &BTreeMap<SurfaceId, SurfaceId>) -> Result<()> {
        for &to in mapping.values() {
            check_number(to)?;
        }
        self.surfaces.renumber(mapping)?;
        self.cells.renumber_surfaces(mapping)
    }

    /// Renumbers cells and every `#N` reference.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RegistryError::RenumberConflict`] if two
    /// cells would share a number; nothing changes in that case.
    pub fn renumber_cells(&mut self, mapping: &BTreeMap<CellId, CellId>) -> Result<()> {
        self.cells.renumber(mapping)
    }

    /// Renumbers surfaces and cells sequentially from the given starts.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RegistryError::RenumberConflict`] if the
    /// sequential numbering cannot be applied.
    pub fn compact_numbering(&mut self, first_surface: SurfaceId, first_cell: CellId) -> Result<()> {
        let surfaces = self.surfaces.sequential_mapping(first_surface);
        let cells = self.cells.sequential_mapping(first_cell);
        debug!(surfaces = surfaces.len(), cells = cells.len(), "compacting numbering");
        self.renumber_surfaces(&surfaces)?;
        self.renumber_cells(&cells)
    }

    /// Resolves every `#N` reference in the model.
    ///
    /// # Errors
    ///
    /// See [`CellRegistry::resolve_complements`].
    pub fn resolve_complements(&mut self) -> Result<()> {
        self.cells.resolve_complements()
    }

    /// Freezes the model into a read-only view for point queries and
    /// tracking.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RuleError::UnresolvedReference`] if a cell
    /// still holds `#N` references and
    /// [`crate::error::RegistryError::SurfaceNotFound`] if a rule names a
    /// missing surface.
    pub fn bind(&self) -> Result<BoundModel<'_>> {
        let cells = self
            .cells
            .iter()
            .map(|cell| cell.bind(&self.surfaces, &self.settings))
            .collect::<Result<Vec<_>>>()?;
        Ok(BoundModel {
            cells,
            settings: self.settings,
        })
    }

    /// The first cell, in insertion order, that contains `point`.
    ///
    /// # Errors
    ///
    /// See [`Model::bind`].
    pub fn find_cell(&self, point: &Point3) -> Result<Option<CellId>> {
        Ok(self.bind()?.find_cell(point))
    }

    /// Clears both registries; settings are kept.
    pub fn reset(&mut self) {
        self.surfaces.reset();
        self.cells.reset();
    }
}

/// Read-only view of a model with every cell bound to its surfaces.
///
/// Shareable across threads: nothing in it can be mutated.
#[derive(Debug, Clone)]
pub struct BoundModel<'a> {
    cells: Vec<BoundCell<'a>>,
    settings: Settings,
}

impl<'a> BoundModel<'a> {
    /// Bound cells in insertion order.
    #[must_use]
    pub fn cells(&self) -> &[BoundCell<'a>] {
        &self.cells
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The first cell that contains `point`.
    #[must_use]
    pub fn find_cell(&self, point: &Point3) -> Option<CellId> {
        self.cells
            .iter()
            .find(|c| c.contains(point))
            .map(BoundCell::number)
    }

    /// Every cell that contains `point`; more than one means the point is
    /// on a shared boundary or the cells overlap.
    #[must_use]
    pub fn cells_at(&self, point: &Point3) -> Vec<CellId> {
        self.cells
            .iter()
            .filter(|c| c.contains(point))
            .map(BoundCell::number)
            .collect()
    }
}
