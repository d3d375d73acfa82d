//! Cells: a region rule plus material data.

mod bound;

pub use bound::BoundCell;

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::config::Settings;
use crate::error::{RegistryError, Result, RuleError};
use crate::registry::{CellRegistry, SurfaceRegistry};
use crate::rule::{HeadRule, Rule};
use crate::{CellId, SurfaceId};

/// A region of space bounded by surfaces, filled with one material.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    number: CellId,
    head: HeadRule,
    material: u32,
    density: f64,
    temperature: Option<f64>,
}

impl Cell {
    /// Creates a cell. Material `0` is void.
    ///
    /// A `number` of 0 asks the cell registry to assign the next free number.
    pub fn new(number: CellId, material: u32, density: f64, rule: impl Into<HeadRule>) -> Self {
        Self {
            number,
            head: rule.into(),
            material,
            density,
            temperature: None,
        }
    }

    /// Creates a void cell.
    pub fn void(number: CellId, rule: impl Into<HeadRule>) -> Self {
        Self::new(number, 0, 0.0, rule)
    }

    /// Creates a cell from a rule string.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] if the rule does not parse.
    pub fn parse(number: CellId, material: u32, density: f64, rule: &str) -> Result<Self> {
        Ok(Self::new(number, material, density, rule.parse::<HeadRule>()?))
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn number(&self) -> CellId {
        self.number
    }

    pub(crate) fn set_number(&mut self, number: CellId) {
        self.number = number;
    }

    #[must_use]
    pub fn head(&self) -> &HeadRule {
        &self.head
    }

    pub(crate) fn head_mut(&mut self) -> &mut HeadRule {
        &mut self.head
    }

    #[must_use]
    pub fn rule(&self) -> &Rule {
        self.head.rule()
    }

    /// Replaces the region rule.
    pub fn set_rule(&mut self, rule: Rule) {
        self.head.set_rule(rule);
    }

    #[must_use]
    pub fn material(&self) -> u32 {
        self.material
    }

    #[must_use]
    pub fn density(&self) -> f64 {
        self.density
    }

    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        self.material == 0
    }

    /// Surfaces that appear in the region rule.
    #[must_use]
    pub fn bounding_surfaces(&self) -> &BTreeSet<SurfaceId> {
        self.head.surfaces()
    }

    /// The rule in card syntax.
    ///
    /// # Errors
    ///
    /// Constants are folded out first, so the text always parses back to
    /// an equivalent rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnresolvedReference`] while the rule still holds
    /// `#N` references and [`RuleError::ConstantRegion`] when the rule folds
    /// to the universe or the empty region, which have no card form.
    pub fn boolean_string(&self) -> Result<String> {
        if let Some(&n) = self.head.cell_refs().first() {
            return Err(RuleError::UnresolvedReference(n).into());
        }
        match self.head.rule().simplify_constants() {
            Rule::Constant(universe) => Err(RuleError::ConstantRegion { universe }.into()),
            rule => Ok(rule.to_string()),
        }
    }

    /// Replaces every `#N` reference by the complement of cell `N`'s rule,
    /// recursively, leaving a rule over surfaces only.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::CyclicReference`] if the references loop back
    /// and [`RegistryError::CellNotFound`] for unknown cells.
    pub fn resolve_cell_complement(&mut self, cells: &CellRegistry) -> Result<()> {
        if self.head.is_resolved() {
            return Ok(());
        }
        let rule = resolve_references(self.head.rule(), self.number, cells)?;
        debug!(cell = self.number, %rule, "resolved cell complements");
        self.head.set_rule(rule);
        Ok(())
    }

    /// Looks up every bounding surface so the cell can answer point queries.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnresolvedReference`] for unresolved `#N`
    /// references and [`RegistryError::SurfaceNotFound`] for unknown
    /// surfaces.
    pub fn bind<'a>(
        &'a self,
        surfaces: &'a SurfaceRegistry,
        settings: &Settings,
    ) -> Result<BoundCell<'a>> {
        BoundCell::new(self, surfaces, settings)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.material)?;
        if !self.is_void() {
            write!(f, " {}", self.density)?;
        }
        write!(f, " {}", self.head)?;
        if let Some(t) = self.temperature {
            write!(f, " tmp={t}")?;
        }
        Ok(())
    }
}

/// Resolves the `#N` references of `rule`, which belongs to cell `owner`.
///
/// # Errors
///
/// See [`Cell::resolve_cell_complement`].
pub(crate) fn resolve_references(rule: &Rule, owner: CellId, cells: &CellRegistry) -> Result<Rule> {
    let mut stack = vec![owner];
    Ok(expand(rule, cells, &mut stack)?.push_complements())
}

fn expand(rule: &Rule, cells: &CellRegistry, stack: &mut Vec<CellId>) -> Result<Rule> {
    Ok(match rule {
        Rule::CellRef(n) => {
            if let Some(start) = stack.iter().position(|c| c == n) {
                let mut cycle = stack[start..].to_vec();
                cycle.push(*n);
                return Err(RuleError::CyclicReference(cycle).into());
            }
            let target = cells
                .get(*n)
                .map_err(|_| RegistryError::CellNotFound(*n))?;
            stack.push(*n);
            let inner = expand(target.rule(), cells, stack)?;
            stack.pop();
            inner.complement()
        }
        Rule::Intersection(a, b) => Rule::Intersection(
            Box::new(expand(a, cells, stack)?),
            Box::new(expand(b, cells, stack)?),
        ),
        Rule::Union(a, b) => Rule::Union(
            Box::new(expand(a, cells, stack)?),
            Box::new(expand(b, cells, stack)?),
        ),
        Rule::Complement(inner) => Rule::Complement(Box::new(expand(inner, cells, stack)?)),
        other => other.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::CellGeoError;
    use crate::geometry::Plane;
    use crate::math::Point3;

    /// Surfaces 1..=6: px -1, px 1, py -1, py 1, pz -1, pz 1.
    fn box_surfaces() -> SurfaceRegistry {
        let mut reg = SurfaceRegistry::new();
        for d in [-1.0, 1.0] {
            reg.register(Plane::px(d)).unwrap();
        }
        for d in [-1.0, 1.0] {
            reg.register(Plane::py(d)).unwrap();
        }
        for d in [-1.0, 1.0] {
            reg.register(Plane::pz(d)).unwrap();
        }
        reg
    }

    #[test]
    fn unit_box_membership() {
        let surfaces = box_surfaces();
        let cell = Cell::parse(1, 0, 0.0, "1 -2 3 -4 5 -6").unwrap();
        let bound = cell.bind(&surfaces, &Settings::default()).unwrap();

        assert!(bound.contains(&Point3::origin()));
        assert!(bound.contains(&Point3::new(0.0, 0.0, 1.0)));
        assert!(!bound.contains(&Point3::new(0.0, 0.0, 1.01)));

        assert_eq!(bound.on_boundary(&Point3::new(0.0, 0.0, 1.0)), Some(6));
        assert_eq!(bound.on_boundary(&Point3::origin()), None);
    }

    #[test]
    fn bounding_surfaces_and_string() {
        let cell = Cell::parse(3, 2, -7.8, "1 -2 (3 : -4)").unwrap();
        assert_eq!(cell.bounding_surfaces().iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(cell.boolean_string().unwrap(), "1 -2 (3 : -4)");
        assert_eq!(cell.to_string(), "3 2 -7.8 1 -2 (3 : -4)");
        assert!(!cell.is_void());
    }

    #[test]
    fn boolean_string_parses_back() {
        let mut cell = Cell::void(4, Rule::Literal(1) & Rule::Constant(true));
        assert_eq!(cell.boolean_string().unwrap(), "1");
        cell.set_rule(Rule::Literal(-2) | Rule::Constant(false) | (Rule::Literal(3) & Rule::Constant(false)));
        let text = cell.boolean_string().unwrap();
        assert_eq!(text, "-2");
        assert_eq!(text.parse::<Rule>().unwrap(), Rule::Literal(-2));

        cell.set_rule(Rule::Constant(true));
        assert!(matches!(
            cell.boolean_string().unwrap_err(),
            CellGeoError::Rule(RuleError::ConstantRegion { universe: true })
        ));
        cell.set_rule(Rule::Literal(1) & !Rule::Constant(true));
        assert!(matches!(
            cell.boolean_string().unwrap_err(),
            CellGeoError::Rule(RuleError::ConstantRegion { universe: false })
        ));
    }

    #[test]
    fn unresolved_cell_cannot_bind() {
        let surfaces = box_surfaces();
        let cell = Cell::parse(2, 0, 0.0, "-1 #1").unwrap();
        assert!(matches!(
            cell.boolean_string().unwrap_err(),
            CellGeoError::Rule(RuleError::UnresolvedReference(1))
        ));
        assert!(cell.bind(&surfaces, &Settings::default()).is_err());
    }

    #[test]
    fn missing_surface_cannot_bind() {
        let surfaces = box_surfaces();
        let cell = Cell::parse(2, 0, 0.0, "1 -9").unwrap();
        assert!(matches!(
            cell.bind(&surfaces, &Settings::default()).unwrap_err(),
            CellGeoError::Registry(RegistryError::SurfaceNotFound(9))
        ));
    }

    #[test]
    fn resolve_complement_against_registry() {
        let surfaces = box_surfaces();
        let mut cells = CellRegistry::new();
        cells.add(Cell::parse(1, 0, 0.0, "1 -2 3 -4 5 -6").unwrap()).unwrap();

        let mut outside = Cell::parse(2, 0, 0.0, "#1").unwrap();
        outside.resolve_cell_complement(&cells).unwrap();
        assert!(outside.head().is_resolved());
        assert_eq!(outside.boolean_string().unwrap(), "-1 : 2 : -3 : 4 : -5 : 6");

        let bound = outside.bind(&surfaces, &Settings::default()).unwrap();
        assert!(!bound.contains(&Point3::origin()));
        assert!(bound.contains(&Point3::new(3.0, 0.0, 0.0)));
        // the shared face belongs to both cells
        assert!(bound.contains(&Point3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn nested_references_resolve_recursively() {
        let mut cells = CellRegistry::new();
        cells.add(Cell::parse(1, 0, 0.0, "-1").unwrap()).unwrap();
        cells.add(Cell::parse(2, 0, 0.0, "-2 #1").unwrap()).unwrap();
        let mut outer = Cell::parse(3, 0, 0.0, "-3 #2").unwrap();
        outer.resolve_cell_complement(&cells).unwrap();
        // #2 = #(-2 1) = 2 : -1
        assert_eq!(outer.boolean_string().unwrap(), "-3 (2 : -1)");
    }

    #[test]
    fn self_reference_is_cyclic() {
        let mut cells = CellRegistry::new();
        cells.add(Cell::parse(1, 0, 0.0, "-1 #2").unwrap()).unwrap();
        cells.add(Cell::parse(2, 0, 0.0, "-2 #1").unwrap()).unwrap();
        let mut cell = cells.get(1).unwrap().clone();
        let err = cell.resolve_cell_complement(&cells).unwrap_err();
        match err {
            CellGeoError::Rule(RuleError::CyclicReference(cycle)) => assert_eq!(cycle, vec![1, 2, 1]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_reference_is_reported() {
        let cells = CellRegistry::new();
        let mut cell = Cell::parse(1, 0, 0.0, "#8").unwrap();
        assert!(matches!(
            cell.resolve_cell_complement(&cells).unwrap_err(),
            CellGeoError::Registry(RegistryError::CellNotFound(8))
        ));
    }
}
