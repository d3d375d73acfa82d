use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{CellGeoError, Result};
use crate::geometry::Side;
use crate::{CellId, SurfaceId};

use super::Rule;

/// A cell's top-level rule with cached literal sets.
///
/// The optional divider is consulted only when a point sits on a boundary
/// of the main rule: if the lenient evaluation accepts the point but the
/// strict one rejects it, the divider decides strictly.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadRule {
    rule: Rule,
    surfaces: BTreeSet<SurfaceId>,
    literals: BTreeSet<i32>,
    divider: Option<Rule>,
}

impl HeadRule {
    #[must_use]
    pub fn new(rule: Rule) -> Self {
        let surfaces = rule.surface_ids();
        let literals = rule.signed_literals();
        Self {
            rule,
            surfaces,
            literals,
            divider: None,
        }
    }

    /// Returns the rule.
    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Surfaces referenced by the rule, ignoring sign.
    #[must_use]
    pub fn surfaces(&self) -> &BTreeSet<SurfaceId> {
        &self.surfaces
    }

    /// Signed literals of the rule after complements are pushed down.
    #[must_use]
    pub fn literals(&self) -> &BTreeSet<i32> {
        &self.literals
    }

    /// Surfaces referenced by the rule or the divider.
    #[must_use]
    pub fn all_surfaces(&self) -> BTreeSet<SurfaceId> {
        let mut out = self.surfaces.clone();
        if let Some(divider) = &self.divider {
            out.extend(divider.surface_ids());
        }
        out
    }

    #[must_use]
    pub fn cell_refs(&self) -> BTreeSet<CellId> {
        self.rule.cell_refs()
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.rule.is_resolved()
    }

    #[must_use]
    pub fn divider(&self) -> Option<&Rule> {
        self.divider.as_ref()
    }

    pub fn set_divider(&mut self, divider: Option<Rule>) {
        self.divider = divider;
    }

    /// Replaces the rule and refreshes the caches; the divider is kept.
    pub fn set_rule(&mut self, rule: Rule) {
        self.surfaces = rule.surface_ids();
        self.literals = rule.signed_literals();
        self.rule = rule;
    }

    fn update(&mut self, f: impl FnOnce(&Rule) -> Rule) {
        let rule = f(&self.rule);
        self.set_rule(rule);
    }

    /// Intersects the rule with `other`.
    pub fn add_intersection(&mut self, other: Rule) {
        self.update(|r| r.clone() & other);
    }

    /// Unites the rule with `other`.
    pub fn add_union(&mut self, other: Rule) {
        self.update(|r| r.clone() | other);
    }

    /// Replaces the rule with its structural complement.
    pub fn make_complement(&mut self) {
        self.update(Rule::complement);
    }

    /// See [`Rule::substitute_surface`]; the divider is rewritten too.
    pub fn substitute_surface(&mut self, from: SurfaceId, to: i32) {
        self.update(|r| r.substitute_surface(from, to));
        if let Some(d) = &mut self.divider {
            *d = d.substitute_surface(from, to);
        }
    }

    /// See [`Rule::remove_surface`].
    pub fn remove_surface(&mut self, surface: SurfaceId) {
        self.update(|r| r.remove_surface(surface));
    }

    /// Renumbers surfaces in the rule and the divider. Nothing changes on
    /// error.
    ///
    /// # Errors
    ///
    /// See [`Rule::renumber_surfaces`].
    pub fn renumber_surfaces(&mut self, mapping: &BTreeMap<SurfaceId, SurfaceId>) -> Result<()> {
        let rule = self.rule.renumber_surfaces(mapping)?;
        let divider = self
            .divider
            .as_ref()
            .map(|d| d.renumber_surfaces(mapping))
            .transpose()?;
        self.set_rule(rule);
        self.divider = divider;
        Ok(())
    }

    /// Renumbers `#N` references.
    pub fn renumber_cells(&mut self, mapping: &BTreeMap<CellId, CellId>) {
        self.update(|r| r.renumber_cells(mapping));
    }

    /// Evaluates the region membership for per-surface sides.
    ///
    /// A point on a surface satisfies both of its literals. When that makes
    /// the decision depend on the boundary (lenient true, strict false) and
    /// a divider is set, the divider is evaluated strictly instead.
    pub fn contains_with<F: Fn(SurfaceId) -> Side>(&self, side: F) -> bool {
        if !lenient(&self.rule, &side) {
            return false;
        }
        match &self.divider {
            Some(divider) if !strict(&self.rule, &side) => strict(divider, &side),
            _ => true,
        }
    }
}

/// Evaluates `rule`, letting a point on a surface satisfy both literals.
pub(crate) fn lenient<F: Fn(SurfaceId) -> Side>(rule: &Rule, side: &F) -> bool {
    rule.evaluate(&|n: i32| match side(n.unsigned_abs()) {
        Side::On => true,
        Side::Positive => n > 0,
        Side::Negative => n < 0,
    })
}

/// Evaluates `rule`, letting a point on a surface satisfy neither literal.
pub(crate) fn strict<F: Fn(SurfaceId) -> Side>(rule: &Rule, side: &F) -> bool {
    rule.evaluate(&|n: i32| match side(n.unsigned_abs()) {
        Side::On => false,
        Side::Positive => n > 0,
        Side::Negative => n < 0,
    })
}

impl From<Rule> for HeadRule {
    fn from(rule: Rule) -> Self {
        Self::new(rule)
    }
}

impl FromStr for HeadRule {
    type Err = CellGeoError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::new(s.parse()?))
    }
}

impl fmt::Display for HeadRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.rule, f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn head(s: &str) -> HeadRule {
        s.parse().unwrap()
    }

    fn sides(assign: &[(SurfaceId, Side)]) -> impl Fn(SurfaceId) -> Side + '_ {
        move |id| {
            assign
                .iter()
                .find(|(s, _)| *s == id)
                .map_or(Side::Positive, |(_, side)| *side)
        }
    }

    #[test]
    fn caches_follow_edits() {
        let mut h = head("1 -2");
        assert_eq!(h.surfaces().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        h.add_intersection(Rule::Literal(-3));
        assert_eq!(h.to_string(), "1 -2 -3");
        assert!(h.literals().contains(&-3));
        h.add_union(Rule::Literal(4));
        assert_eq!(h.to_string(), "1 -2 -3 : 4");
        h.make_complement();
        assert_eq!(h.literals().iter().copied().collect::<Vec<_>>(), vec![-4, -1, 2, 3]);
        h.remove_surface(4);
        assert!(!h.surfaces().contains(&4));
    }

    #[test]
    fn substitute_and_renumber() {
        let mut h = head("1 -2 #5");
        h.substitute_surface(2, 7);
        assert_eq!(h.to_string(), "1 -7 #5");
        let map: BTreeMap<_, _> = [(1, 11), (7, 17)].into_iter().collect();
        h.renumber_surfaces(&map).unwrap();
        let cells: BTreeMap<_, _> = [(5, 6)].into_iter().collect();
        h.renumber_cells(&cells);
        assert_eq!(h.to_string(), "11 -17 #6");
        assert!(!h.is_resolved());
    }

    #[test]
    fn on_surface_counts_as_inside() {
        let h = head("1 -2");
        assert!(h.contains_with(sides(&[(1, Side::On), (2, Side::Negative)])));
        assert!(!h.contains_with(sides(&[(1, Side::Negative), (2, Side::Negative)])));
    }

    #[test]
    fn divider_breaks_boundary_ties() {
        let mut h = head("1 : -1");
        assert!(h.contains_with(sides(&[(1, Side::On)])));
        h.set_divider(Some(Rule::Literal(3)));
        assert!(h.all_surfaces().contains(&3));
        // on surface 1: lenient true, strict false, divider decides
        assert!(h.contains_with(sides(&[(1, Side::On), (3, Side::Positive)])));
        assert!(!h.contains_with(sides(&[(1, Side::On), (3, Side::Negative)])));
        // off the boundary the divider is ignored
        assert!(h.contains_with(sides(&[(1, Side::Positive), (3, Side::Negative)])));
    }
}
