use std::collections::BTreeMap;

use crate::config::Settings;
use crate::error::{Result, RuleError};
use crate::geometry::{ImplicitSurface, Side, Surface};
use crate::math::{unit, Point3, Vector3};
use crate::registry::SurfaceRegistry;
use crate::{CellId, SurfaceId};

use super::Cell;

/// A cell with its surfaces looked up, ready for point and ray queries.
///
/// Borrowing keeps the bound view read-only, so many threads can query the
/// same cells at once.
#[derive(Debug, Clone)]
pub struct BoundCell<'a> {
    cell: &'a Cell,
    surfaces: BTreeMap<SurfaceId, &'a Surface>,
    settings: Settings,
}

impl<'a> BoundCell<'a> {
    pub(super) fn new(
        cell: &'a Cell,
        registry: &'a SurfaceRegistry,
        settings: &Settings,
    ) -> Result<Self> {
        if let Some(&n) = cell.head().cell_refs().first() {
            return Err(RuleError::UnresolvedReference(n).into());
        }
        let surfaces = cell
            .head()
            .all_surfaces()
            .into_iter()
            .map(|id| -> Result<(SurfaceId, &'a Surface)> { Ok((id, registry.get(id)?)) })
            .collect::<Result<_>>()?;
        Ok(Self {
            cell,
            surfaces,
            settings: *settings,
        })
    }

    #[must_use]
    pub fn cell(&self) -> &'a Cell {
        self.cell
    }

    #[must_use]
    pub fn number(&self) -> CellId {
        self.cell.number()
    }

    /// Side of surface `id` at `point`; surfaces outside the cell's rule
    /// read as positive.
    #[must_use]
    pub fn side(&self, id: SurfaceId, point: &Point3) -> Side {
        self.surfaces
            .get(&id)
            .map_or(Side::Positive, |s| s.side_within(point, self.settings.side_tolerance))
    }

    /// Returns `true` if `point` is inside the cell or on its boundary.
    #[must_use]
    pub fn contains(&self, point: &Point3) -> bool {
        self.cell.head().contains_with(|id| self.side(id, point))
    }

    /// Returns a surface that `point` lies on and that actually separates
    /// the cell from its surroundings there.
    ///
    /// A surface qualifies when pushing the point to either side of it
    /// changes the membership answer.
    #[must_use]
    pub fn on_boundary(&self, point: &Point3) -> Option<SurfaceId> {
        self.cell.head().surfaces().iter().copied().find(|&id| {
            if self.side(id, point) != Side::On {
                return false;
            }
            let forced = |side: Side| {
                move |other: SurfaceId| {
                    if other == id {
                        side
                    } else {
                        self.side(other, point)
                    }
                }
            };
            let head = self.cell.head();
            head.contains_with(forced(Side::Positive)) != head.contains_with(forced(Side::Negative))
        })
    }

    /// Side of surface `id` at `point` as seen by a ray moving along the
    /// unit vector `direction`.
    ///
    /// Off the surface this is [`BoundCell::side`]. On it, the side the ray
    /// is heading into: the sign of the surface normal against
    /// `direction`. A ray running along the surface stays [`Side::On`].
    #[must_use]
    pub fn side_along(&self, id: SurfaceId, point: &Point3, direction: &Vector3) -> Side {
        let Some(surface) = self.surfaces.get(&id) else {
            return Side::Positive;
        };
        match surface.side_within(point, self.settings.side_tolerance) {
            Side::On => surface.normal(point).map_or(Side::On, |n| {
                Side::classify(n.dot(direction), self.settings.grazing_cosine)
            }),
            side => side,
        }
    }

    /// Returns `true` if a ray at `point` moving along the unit vector
    /// `direction` is inside the cell immediately afterwards.
    ///
    /// No point is stepped off the surface, so the answer holds at any
    /// crossing angle. Surfaces the ray runs along count as
    /// [`Side::On`] and satisfy both senses.
    #[must_use]
    pub fn contains_along(&self, point: &Point3, direction: &Vector3) -> bool {
        self.cell
            .head()
            .contains_with(|id| self.side_along(id, point, direction))
    }

    /// Distance along `direction` to where a ray from `origin` first leaves
    /// the cell, with the surface crossed there.
    ///
    /// Candidate crossings closer than the minimum step are ignored. A
    /// crossing is accepted only if the ray is inside just before it and
    /// outside just after it, judged with [`BoundCell::contains_along`]
    /// looking backwards and forwards from the crossing point. Internal
    /// surfaces of a union and tangent contacts are stepped over. Distances
    /// are Euclidean regardless of the length of `direction`.
    #[must_use]
    pub fn exit_surface(&self, origin: &Point3, direction: &Vector3) -> Option<(SurfaceId, f64)> {
        self.first_crossing(origin, direction, true)
    }

    /// Distance along `direction` to where a ray from `origin` first enters
    /// the cell, with the surface crossed there.
    #[must_use]
    pub fn entry_surface(&self, origin: &Point3, direction: &Vector3) -> Option<(SurfaceId, f64)> {
        self.first_crossing(origin, direction, false)
    }

    fn first_crossing(
        &self,
        origin: &Point3,
        direction: &Vector3,
        leaving: bool,
    ) -> Option<(SurfaceId, f64)> {
        let dir = unit(direction)?;
        let mut hits: Vec<(f64, SurfaceId)> = self
            .surfaces
            .iter()
            .flat_map(|(&id, surface)| {
                surface
                    .intersect(origin, &dir)
                    .into_iter()
                    .filter(|&t| t > self.settings.min_step)
                    .map(move |t| (t, id))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));

        hits.into_iter()
            .find(|&(t, _)| {
                let at = origin + dir * t;
                let before = self.contains_along(&at, &-dir);
                let after = self.contains_along(&at, &dir);
                if leaving {
                    before && !after
                } else {
                    !before && after
                }
            })
            .map(|(t, id)| (id, t))
    }
}
