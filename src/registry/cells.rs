use std::collections::BTreeMap;

use slotmap::SlotMap;
use tracing::{debug, instrument};

use crate::cell::{resolve_references, Cell};
use crate::error::{RegistryError, Result};
use crate::rule::{HeadRule, Rule};
use crate::{CellId, SurfaceId};

use super::{check_number, next_free};

slotmap::new_key_type! {
    /// Arena key of a stored cell.
    pub struct CellKey;
}

/// Numbered store of cells, iterated in insertion order.
#[derive(Debug, Default)]
pub struct CellRegistry {
    store: SlotMap<CellKey, Cell>,
    numbers: BTreeMap<CellId, CellKey>,
    order: Vec<CellKey>,
}

impl CellRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number an unnumbered cell receives: one above the largest in use, or
    /// the smallest free one once the range is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NumbersExhausted`] if every number is taken.
    pub fn next_number(&self) -> Result<CellId> {
        next_free(self.numbers.keys().copied(), |n| self.numbers.contains_key(&n))
    }

    /// Adds a cell and returns its number. A cell numbered 0 receives
    /// [`CellRegistry::next_number`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateCell`] if the number is taken and
    /// [`RegistryError::NumberOutOfRange`] above [`crate::config::MAX_NUMBER`].
    pub fn add(&mut self, mut cell: Cell) -> Result<CellId> {
        if cell.number() == 0 {
            cell.set_number(self.next_number()?);
        }
        let number = check_number(cell.number())?;
        if self.numbers.contains_key(&number) {
            return Err(RegistryError::DuplicateCell(number).into());
        }
        debug!(cell = number, rule = %cell.head(), "adding cell");
        let key = self.store.insert(cell);
        self.numbers.insert(number, key);
        self.order.push(key);
        Ok(number)
    }

    /// Returns the cell numbered `number`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CellNotFound`] for unknown numbers.
    pub fn get(&self, number: CellId) -> Result<&Cell> {
        self.numbers
            .get(&number)
            .and_then(|&key| self.store.get(key))
            .ok_or_else(|| RegistryError::CellNotFound(number).into())
    }

    fn get_mut(&mut self, number: CellId) -> Result<&mut Cell> {
        self.numbers
            .get(&number)
            .and_then(|&key| self.store.get_mut(key))
            .ok_or_else(|| RegistryError::CellNotFound(number).into())
    }

    /// Replaces the rule of cell `number`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CellNotFound`] for unknown numbers.
    pub fn set_rule(&mut self, number: CellId, rule: Rule) -> Result<()> {
        self.get_mut(number)?.set_rule(rule);
        Ok(())
    }

    /// Removes and returns cell `number`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CellNotFound`] for unknown numbers.
    pub fn remove(&mut self, number: CellId) -> Result<Cell> {
        let key = self
            .numbers
            .remove(&number)
            .ok_or(RegistryError::CellNotFound(number))?;
        self.order.retain(|&k| k != key);
        self.store
            .remove(key)
            .ok_or_else(|| RegistryError::CellNotFound(number).into())
    }

    #[must_use]
    pub fn contains(&self, number: CellId) -> bool {
        self.numbers.contains_key(&number)
    }

    /// Cells in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.order.iter().filter_map(|&key| self.store.get(key))
    }

    /// Cell numbers in ascending order.
    pub fn numbers(&self) -> impl Iterator<Item = CellId> + '_ {
        self.numbers.keys().copied()
    }

    /// Numbers of the cells whose rule mentions `surface`.
    #[must_use]
    pub fn cells_using_surface(&self, surface: SurfaceId) -> Vec<CellId> {
        self.iter()
            .filter(|c| c.head().all_surfaces().contains(&surface))
            .map(Cell::number)
            .collect()
    }

    /// Mapping that renumbers every cell sequentially from `first` in
    /// insertion order.
    #[must_use]
    pub fn sequential_mapping(&self, first: CellId) -> BTreeMap<CellId, CellId> {
        self.iter().map(Cell::number).zip(first..).collect()
    }

    fn remapped(&self, mapping: &BTreeMap<CellId, CellId>) -> Result<BTreeMap<CellId, CellKey>> {
        let mut out = BTreeMap::new();
        for (&number, &key) in &self.numbers {
            let new_number = check_number(mapping.get(&number).copied().unwrap_or(number))?;
            if out.insert(new_number, key).is_some() {
                return Err(RegistryError::RenumberConflict(new_number).into());
            }
        }
        Ok(out)
    }

    /// Renumbers cells and rewrites every `#N` reference accordingly.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RenumberConflict`] if two cells would end up
    /// with the same number and [`RegistryError::NumberOutOfRange`] for
    /// targets above [`crate::config::MAX_NUMBER`]. The registry is
    /// unchanged on error.
    #[instrument(level = "debug", skip_all, fields(entries = mapping.len()))]
    pub fn renumber(&mut self, mapping: &BTreeMap<CellId, CellId>) -> Result<()> {
        let numbers = self.remapped(mapping)?;
        for (&number, &key) in &numbers {
            if let Some(cell) = self.store.get_mut(key) {
                cell.set_number(number);
                cell.head_mut().renumber_cells(mapping);
            }
        }
        self.numbers = numbers;
        Ok(())
    }

    /// Applies a surface renumbering to every cell rule.
    ///
    /// Every rule is rewritten before any is stored, so a failure leaves
    /// every cell untouched.
    pub(crate) fn renumber_surfaces(&mut self, mapping: &BTreeMap<SurfaceId, SurfaceId>) -> Result<()> {
        let renumbered = self
            .store
            .iter()
            .map(|(key, cell)| -> Result<(CellKey, HeadRule)> {
                let mut head = cell.head().clone();
                head.renumber_surfaces(mapping)?;
                Ok((key, head))
            })
            .collect::<Result<Vec<_>>>()?;
        for (key, head) in renumbered {
            if let Some(cell) = self.store.get_mut(key) {
                *cell.head_mut() = head;
            }
        }
        Ok(())
    }

    /// Resolves every `#N` reference in every cell.
    ///
    /// All rules are resolved against the current registry before any is
    /// replaced, so a failure leaves every cell untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RuleError::CyclicReference`] for loops and
    /// [`RegistryError::CellNotFound`] for references to unknown cells.
    #[instrument(level = "debug", skip(self), fields(cells = self.len()))]
    pub fn resolve_complements(&mut self) -> Result<()> {
        let resolved = self
            .iter()
            .filter(|c| !c.head().is_resolved())
            .map(|c| -> Result<(CellId, Rule)> {
                Ok((c.number(), resolve_references(c.rule(), c.number(), self)?))
            })
            .collect::<Result<Vec<_>>>()?;
        for (number, rule) in resolved {
            self.set_rule(number, rule)?;
        }
        Ok(())
    }

    /// Removes every cell.
    pub fn reset(&mut self) {
        self.store.clear();
        self.numbers.clear();
        self.order.clear();
    }
}
