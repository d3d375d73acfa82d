use std::collections::BTreeMap;

use slotmap::SlotMap;
use tracing::{debug, instrument};

use crate::config::EQUALITY_TOLERANCE;
use crate::error::{RegistryError, Result};
use crate::geometry::{ImplicitSurface, Orientation, Surface, SurfaceCard};
use crate::SurfaceId;

use super::{check_number, next_free, signed};

slotmap::new_key_type! {
    /// Arena key of a stored surface.
    pub struct SurfaceKey;
}

/// Numbered, deduplicated store of surfaces.
///
/// Surfaces live in a slot-map arena; their public numbers map onto arena
/// keys, so renumbering never moves the surfaces themselves.
#[derive(Debug)]
pub struct SurfaceRegistry {
    store: SlotMap<SurfaceKey, Surface>,
    numbers: BTreeMap<SurfaceId, SurfaceKey>,
    tolerance: f64,
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::with_tolerance(EQUALITY_TOLERANCE)
    }
}

impl SurfaceRegistry {
    /// Creates an empty registry with the default equality tolerance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry that treats surfaces whose normalised
    /// coefficients differ by at most `tolerance` as the same surface.
    #[must_use]
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            store: SlotMap::with_key(),
            numbers: BTreeMap::new(),
            tolerance,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// Number the next registered surface receives: one above the largest
    /// in use, or the smallest free one once the range is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NumbersExhausted`] if every number is taken.
    pub fn next_id(&self) -> Result<SurfaceId> {
        next_free(self.numbers.keys().copied(), |id| self.numbers.contains_key(&id))
    }

    /// Finds a stored surface geometrically equal to `surface`.
    #[must_use]
    pub fn find(&self, surface: &Surface) -> Option<(SurfaceId, Orientation)> {
        self.numbers.iter().find_map(|(&id, &key)| {
            self.store
                .get(key)
                .and_then(|stored| stored.compare(surface, self.tolerance))
                .map(|orientation| (id, orientation))
        })
    }

    /// Registers a surface and returns its number.
    ///
    /// A surface equal to one already stored (in either orientation) is not
    /// added again; the existing number is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NumbersExhausted`] if no number is free.
    pub fn register(&mut self, surface: impl Into<Surface>) -> Result<SurfaceId> {
        Ok(self.register_signed(surface)?.unsigned_abs())
    }

    /// Registers a surface and returns its number, negated when the surface
    /// matched a stored one with the opposite orientation.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NumbersExhausted`] if no number is free.
    pub fn register_signed(&mut self, surface: impl Into<Surface>) -> Result<i32> {
        let surface = surface.into();
        if let Some((id, orientation)) = self.find(&surface) {
            debug!(id, ?orientation, kind = surface.kind_name(), "surface already registered");
            return signed(id, orientation == Orientation::Same);
        }
        let id = self.next_id()?;
        self.attach(id, surface);
        signed(id, true)
    }

    /// Registers a surface under a chosen number.
    ///
    /// A geometric duplicate still resolves to the existing (signed) number.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateSurface`] if `id` already holds a
    /// different surface and [`RegistryError::NumberOutOfRange`] above
    /// [`crate::config::MAX_NUMBER`].
    pub fn insert(&mut self, id: SurfaceId, surface: impl Into<Surface>) -> Result<i32> {
        check_number(id)?;
        let surface = surface.into();
        if let Some((existing, orientation)) = self.find(&surface) {
            return signed(existing, orientation == Orientation::Same);
        }
        if self.numbers.contains_key(&id) {
            return Err(RegistryError::DuplicateSurface(id).into());
        }
        let literal = signed(id, true)?;
        self.attach(id, surface);
        Ok(literal)
    }

    fn attach(&mut self, id: SurfaceId, surface: Surface) {
        debug!(id, kind = surface.kind_name(), "registering surface");
        let key = self.store.insert(surface);
        self.numbers.insert(id, key);
    }

    /// Returns the surface numbered `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SurfaceNotFound`] for unknown numbers.
    pub fn get(&self, id: SurfaceId) -> Result<&Surface> {
        self.numbers
            .get(&id)
            .and_then(|&key| self.store.get(key))
            .ok_or_else(|| RegistryError::SurfaceNotFound(id).into())
    }

    #[must_use]
    pub fn contains(&self, id: SurfaceId) -> bool {
        self.numbers.contains_key(&id)
    }

    /// Surface numbers in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.numbers.keys().copied()
    }

    /// Surfaces in ascending number order.
    pub fn iter(&self) -> impl Iterator<Item = (SurfaceId, &Surface)> + '_ {
        self.numbers
            .iter()
            .filter_map(|(&id, &key)| self.store.get(key).map(|s| (id, s)))
    }

    /// Mapping that renumbers every surface sequentially from `first`,
    /// keeping the current order.
    #[must_use]
    pub fn sequential_mapping(&self, first: SurfaceId) -> BTreeMap<SurfaceId, SurfaceId> {
        self.numbers.keys().copied().zip(first..).collect()
    }

    /// Number table after applying `mapping`, without changing anything.
    fn remapped(
        &self,
        mapping: &BTreeMap<SurfaceId, SurfaceId>,
    ) -> Result<BTreeMap<SurfaceId, SurfaceKey>> {
        let mut out = BTreeMap::new();
        for (&id, &key) in &self.numbers {
            let new_id = check_number(mapping.get(&id).copied().unwrap_or(id))?;
            if out.insert(new_id, key).is_some() {
                return Err(RegistryError::RenumberConflict(new_id).into());
            }
        }
        Ok(out)
    }

    /// Renumbers surfaces; numbers missing from `mapping` are kept.
    ///
    /// Cell rules are not touched, so outside the crate renumbering goes
    /// through [`crate::registry::Model::renumber_surfaces`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RenumberConflict`] if two surfaces would end
    /// up with the same number and [`RegistryError::NumberOutOfRange`] for
    /// targets above [`crate::config::MAX_NUMBER`]. The registry is
    /// unchanged on error.
    #[instrument(level = "debug", skip_all, fields(entries = mapping.len()))]
    pub(crate) fn renumber(&mut self, mapping: &BTreeMap<SurfaceId, SurfaceId>) -> Result<()> {
        self.numbers = self.remapped(mapping)?;
        Ok(())
    }

    /// Card form of every surface in number order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GeometryError::Unrepresentable`] for surfaces
    /// without a card form.
    pub fn cards(&self) -> Result<Vec<(SurfaceId, SurfaceCard)>> {
        self.iter()
            .map(|(id, s)| -> Result<(SurfaceId, SurfaceCard)> { Ok((id, s.card()?)) })
            .collect()
    }

    /// Removes every surface.
    pub fn reset(&mut self) {
        self.store.clear();
        self.numbers.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::CellGeoError;
    use crate::geometry::{Cylinder, Plane, Quadric, Sphere};
    use crate::math::{Point3, Vector3};

    #[test]
    fn register_is_idempotent() {
        let mut reg = SurfaceRegistry::new();
        let a = reg.register(Sphere::new(Point3::origin(), 3.0).unwrap()).unwrap();
        let b = reg.register(Sphere::new(Point3::origin(), 3.0 + 1e-9).unwrap()).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn equal_geometry_across_kinds() {
        let mut reg = SurfaceRegistry::new();
        let cyl = reg.register(Cylinder::new(Point3::new(0.0, 0.0, 5.0), Vector3::z(), 2.0).unwrap()).unwrap();
        // x^2 + y^2 - 4 = 0
        let gq = Quadric::new([1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -4.0]).unwrap();
        assert_eq!(reg.register(gq).unwrap(), cyl);
    }

    #[test]
    fn thin_cylinders_stay_distinct() {
        let mut reg = SurfaceRegistry::new();
        let thin = |r| Cylinder::new(Point3::new(3.0, -2.0, 0.0), Vector3::z(), r).unwrap();
        let a = reg.register(thin(0.001)).unwrap();
        let b = reg.register(thin(0.0012)).unwrap();
        assert_ne!(a, b);
        assert_eq!(reg.register(thin(0.001)).unwrap(), a);
        let c = reg.register(Sphere::new(Point3::origin(), 0.002).unwrap()).unwrap();
        let d = reg.register(Sphere::new(Point3::origin(), 0.0021).unwrap()).unwrap();
        assert_ne!(c, d);
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn flipped_plane_is_signed() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.register_signed(Plane::pz(2.0)).unwrap();
        let flipped = Plane::new(-Vector3::z(), -2.0).unwrap();
        assert_eq!(reg.register_signed(flipped.clone()).unwrap(), -id);
        assert_eq!(reg.register(flipped).unwrap(), id.unsigned_abs());
    }

    #[test]
    fn numbers_are_sequential() {
        let mut reg = SurfaceRegistry::new();
        assert_eq!(reg.register(Plane::px(1.0)).unwrap(), 1);
        assert_eq!(reg.insert(10, Plane::px(2.0)).unwrap(), 10);
        assert_eq!(reg.register(Plane::px(3.0)).unwrap(), 11);
        assert!(matches!(
            reg.insert(10, Plane::px(4.0)).unwrap_err(),
            CellGeoError::Registry(RegistryError::DuplicateSurface(10))
        ));
        // duplicates resolve before the number check
        assert_eq!(reg.insert(10, Plane::px(1.0)).unwrap(), 1);
    }

    #[test]
    fn numbers_beyond_literal_range_are_rejected() {
        let mut reg = SurfaceRegistry::new();
        assert!(matches!(
            reg.insert(3_000_000_000, Plane::px(1.0)).unwrap_err(),
            CellGeoError::Registry(RegistryError::NumberOutOfRange(3_000_000_000))
        ));
        assert!(reg.is_empty());

        assert_eq!(reg.insert(0x7FFF_FFFF, Plane::px(1.0)).unwrap(), i32::MAX);
        // no room above the top number: registration reuses the first gap
        assert_eq!(reg.register(Plane::px(2.0)).unwrap(), 1);
        assert_eq!(reg.register_signed(Plane::new(-Vector3::x(), -1.0).unwrap()).unwrap(), -i32::MAX);

        let mapping: BTreeMap<_, _> = [(1, 0x8000_0000)].into_iter().collect();
        assert!(matches!(
            reg.renumber(&mapping).unwrap_err(),
            CellGeoError::Registry(RegistryError::NumberOutOfRange(0x8000_0000))
        ));
        assert_eq!(reg.ids().collect::<Vec<_>>(), vec![1, 0x7FFF_FFFF]);
    }

    #[test]
    fn get_unknown_surface() {
        let reg = SurfaceRegistry::new();
        assert!(matches!(
            reg.get(4).unwrap_err(),
            CellGeoError::Registry(RegistryError::SurfaceNotFound(4))
        ));
    }

    #[test]
    fn renumber_and_inverse_restore_ids() {
        let mut reg = SurfaceRegistry::new();
        for d in 1..=4 {
            reg.register(Plane::pz(f64::from(d))).unwrap();
        }
        let original: Vec<_> = reg.iter().map(|(id, s)| (id, s.clone())).collect();
        let mapping: BTreeMap<_, _> = [(1, 40), (2, 30), (3, 20), (4, 10)].into_iter().collect();
        reg.renumber(&mapping).unwrap();
        assert_eq!(reg.ids().collect::<Vec<_>>(), vec![10, 20, 30, 40]);
        assert_eq!(reg.get(40).unwrap(), &original[0].1);

        let inverse: BTreeMap<_, _> = mapping.iter().map(|(&a, &b)| (b, a)).collect();
        reg.renumber(&inverse).unwrap();
        for (id, surface) in &original {
            assert_eq!(reg.get(*id).unwrap(), surface);
        }
    }

    #[test]
    fn conflicting_renumber_leaves_registry_intact() {
        let mut reg = SurfaceRegistry::new();
        reg.register(Plane::px(1.0)).unwrap();
        reg.register(Plane::px(2.0)).unwrap();
        let mapping: BTreeMap<_, _> = [(1, 2)].into_iter().collect();
        assert!(matches!(
            reg.renumber(&mapping).unwrap_err(),
            CellGeoError::Registry(RegistryError::RenumberConflict(2))
        ));
        assert_eq!(reg.ids().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn sequential_mapping_compacts() {
        let mut reg = SurfaceRegistry::new();
        reg.insert(5, Plane::px(1.0)).unwrap();
        reg.insert(9, Plane::px(2.0)).unwrap();
        let mapping = reg.sequential_mapping(1);
        assert_eq!(mapping.into_iter().collect::<Vec<_>>(), vec![(5, 1), (9, 2)]);
    }

    #[test]
    fn cards_and_reset() {
        let mut reg = SurfaceRegistry::new();
        reg.register(Plane::px(1.5)).unwrap();
        reg.register(Sphere::new(Point3::origin(), 2.0).unwrap()).unwrap();
        let cards: Vec<String> = reg.cards().unwrap().iter().map(|(_, c)| c.to_string()).collect();
        assert_eq!(cards, vec!["px 1.5", "so 2"]);
        reg.reset();
        assert!(reg.is_empty());
        assert_eq!(reg.next_id().unwrap(), 1);
    }
}
