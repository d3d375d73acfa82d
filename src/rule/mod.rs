//! Signed-literal boolean expressions over surface numbers.
//!
//! A [`Rule`] describes a region: a literal `n` is the positive side of
//! surface `n`, `-n` its negative side. Intersections, unions and
//! complements combine literals into cells, and `#N` refers to the
//! complement of another cell until it is resolved against the cell
//! registry.

mod algebra;
mod head_rule;
mod minterm;
mod parse;

pub use algebra::{cubes_to_rule, Cube, Division, Minimizer};
pub use head_rule::HeadRule;
pub use minterm::{Implicant, LiteralIndex, TruthTable};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::str::FromStr;

use crate::error::{CellGeoError, Result};
use crate::registry::signed;
use crate::{CellId, SurfaceId};

/// Boolean expression tree over signed surface literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Signed surface number; never zero.
    Literal(i32),
    Intersection(Box<Rule>, Box<Rule>),
    Union(Box<Rule>, Box<Rule>),
    Complement(Box<Rule>),
    /// `#N`: the complement of cell `N`, pending resolution.
    CellRef(CellId),
    /// The universal (`true`) or empty (`false`) region.
    Constant(bool),
}

impl Rule {
    /// Intersection of every rule in `rules`; the universe when empty.
    pub fn all<I: IntoIterator<Item = Rule>>(rules: I) -> Self {
        rules
            .into_iter()
            .reduce(|a, b| Self::Intersection(Box::new(a), Box::new(b)))
            .unwrap_or(Self::Constant(true))
    }

    /// Union of every rule in `rules`; the empty region when empty.
    pub fn any<I: IntoIterator<Item = Rule>>(rules: I) -> Self {
        rules
            .into_iter()
            .reduce(|a, b| Self::Union(Box::new(a), Box::new(b)))
            .unwrap_or(Self::Constant(false))
    }

    /// Evaluates the rule, asking `literal` for the truth of each signed
    /// literal.
    ///
    /// Complements are pushed down to the literals during evaluation, so a
    /// literal callback that accepts both `n` and `-n` (a point on surface
    /// `n`) is honoured under any number of complements. Unresolved cell
    /// references evaluate to `false`.
    pub fn evaluate<F: Fn(i32) -> bool>(&self, literal: &F) -> bool {
        self.eval_signed(false, literal)
    }

    fn eval_signed<F: Fn(i32) -> bool>(&self, negate: bool, literal: &F) -> bool {
        match self {
            Self::Literal(n) => literal(if negate { -n } else { *n }),
            Self::Intersection(a, b) if negate => {
                a.eval_signed(true, literal) || b.eval_signed(true, literal)
            }
            Self::Intersection(a, b) => a.eval_signed(false, literal) && b.eval_signed(false, literal),
            Self::Union(a, b) if negate => {
                a.eval_signed(true, literal) && b.eval_signed(true, literal)
            }
            Self::Union(a, b) => a.eval_signed(false, literal) || b.eval_signed(false, literal),
            Self::Complement(inner) => inner.eval_signed(!negate, literal),
            Self::CellRef(_) => false,
            Self::Constant(v) => *v != negate,
        }
    }

    /// Returns the distinct surface numbers referenced, ignoring sign.
    #[must_use]
    pub fn surface_ids(&self) -> BTreeSet<SurfaceId> {
        let mut out = BTreeSet::new();
        self.visit_literals(false, &mut |n| {
            out.insert(n.unsigned_abs());
        });
        out
    }

    /// Returns the signed literals as they act after complements are pushed
    /// down to the leaves.
    #[must_use]
    pub fn signed_literals(&self) -> BTreeSet<i32> {
        let mut out = BTreeSet::new();
        self.visit_literals(false, &mut |n| {
            out.insert(n);
        });
        out
    }

    fn visit_literals(&self, negate: bool, f: &mut impl FnMut(i32)) {
        match self {
            Self::Literal(n) => f(if negate { -n } else { *n }),
            Self::Intersection(a, b) | Self::Union(a, b) => {
                a.visit_literals(negate, f);
                b.visit_literals(negate, f);
            }
            Self::Complement(inner) => inner.visit_literals(!negate, f),
            Self::CellRef(_) | Self::Constant(_) => {}
        }
    }

    /// Returns the cells referenced through `#N`.
    #[must_use]
    pub fn cell_refs(&self) -> BTreeSet<CellId> {
        let mut out = BTreeSet::new();
        self.collect_cell_refs(&mut out);
        out
    }

    fn collect_cell_refs(&self, out: &mut BTreeSet<CellId>) {
        match self {
            Self::Intersection(a, b) | Self::Union(a, b) => {
                a.collect_cell_refs(out);
                b.collect_cell_refs(out);
            }
            Self::Complement(inner) => inner.collect_cell_refs(out),
            Self::CellRef(n) => {
                out.insert(*n);
            }
            Self::Literal(_) | Self::Constant(_) => {}
        }
    }

    /// Returns `true` if the rule contains no `#N` references.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell_refs().is_empty()
    }

    /// Number of literal leaves in the tree.
    #[must_use]
    pub fn literal_count(&self) -> usize {
        match self {
            Self::Literal(_) => 1,
            Self::Intersection(a, b) | Self::Union(a, b) => a.literal_count() + b.literal_count(),
            Self::Complement(inner) => inner.literal_count(),
            Self::CellRef(_) | Self::Constant(_) => 0,
        }
    }

    /// Structural complement: De Morgan's laws push the negation down to
    /// the literals. Cheap, never fails, but not minimal.
    #[must_use]
    pub fn complement(&self) -> Rule {
        self.pushed(true)
    }

    /// Equivalent rule with every complement pushed down to the literals.
    /// Only complements of unresolved cell references survive.
    #[must_use]
    pub fn push_complements(&self) -> Rule {
        self.pushed(false)
    }

    fn pushed(&self, negate: bool) -> Rule {
        match self {
            Self::Literal(n) => Self::Literal(if negate { -n } else { *n }),
            Self::Intersection(a, b) => {
                let (a, b) = (Box::new(a.pushed(negate)), Box::new(b.pushed(negate)));
                if negate {
                    Self::Union(a, b)
                } else {
                    Self::Intersection(a, b)
                }
            }
            Self::Union(a, b) => {
                let (a, b) = (Box::new(a.pushed(negate)), Box::new(b.pushed(negate)));
                if negate {
                    Self::Intersection(a, b)
                } else {
                    Self::Union(a, b)
                }
            }
            Self::Complement(inner) => inner.pushed(!negate),
            Self::CellRef(n) if negate => Self::Complement(Box::new(Self::CellRef(*n))),
            Self::CellRef(n) => Self::CellRef(*n),
            Self::Constant(v) => Self::Constant(*v != negate),
        }
    }

    /// Folds constants out of the tree.
    #[must_use]
    pub fn simplify_constants(&self) -> Rule {
        match self {
            Self::Intersection(a, b) => match (a.simplify_constants(), b.simplify_constants()) {
                (Self::Constant(false), _) | (_, Self::Constant(false)) => Self::Constant(false),
                (Self::Constant(true), x) | (x, Self::Constant(true)) => x,
                (x, y) => Self::Intersection(Box::new(x), Box::new(y)),
            },
            Self::Union(a, b) => match (a.simplify_constants(), b.simplify_constants()) {
                (Self::Constant(true), _) | (_, Self::Constant(true)) => Self::Constant(true),
                (Self::Constant(false), x) | (x, Self::Constant(false)) => x,
                (x, y) => Self::Union(Box::new(x), Box::new(y)),
            },
            Self::Complement(inner) => match inner.simplify_constants() {
                Self::Constant(v) => Self::Constant(!v),
                x => Self::Complement(Box::new(x)),
            },
            other => other.clone(),
        }
    }

    /// Replaces every literal of `from` with `to`, multiplying signs, so
    /// `-from` becomes `-to`.
    #[must_use]
    pub fn substitute_surface(&self, from: SurfaceId, to: i32) -> Rule {
        self.map_literals(&|n| {
            if n.unsigned_abs() == from {
                n.signum() * to
            } else {
                n
            }
        })
    }

    /// Renumbers surfaces according to `mapping`; unmapped numbers stay.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RegistryError::NumberOutOfRange`] if a target
    /// number cannot be written as a literal.
    pub fn renumber_surfaces(&self, mapping: &BTreeMap<SurfaceId, SurfaceId>) -> Result<Rule> {
        let targets = mapping
            .iter()
            .map(|(&from, &to)| -> Result<(SurfaceId, i32)> { Ok((from, signed(to, true)?)) })
            .collect::<Result<BTreeMap<SurfaceId, i32>>>()?;
        Ok(self.map_literals(&|n| {
            targets
                .get(&n.unsigned_abs())
                .map_or(n, |&to| n.signum() * to)
        }))
    }

    fn map_literals(&self, f: &impl Fn(i32) -> i32) -> Rule {
        match self {
            Self::Literal(n) => Self::Literal(f(*n)),
            Self::Intersection(a, b) => {
                Self::Intersection(Box::new(a.map_literals(f)), Box::new(b.map_literals(f)))
            }
            Self::Union(a, b) => Self::Union(Box::new(a.map_literals(f)), Box::new(b.map_literals(f))),
            Self::Complement(inner) => Self::Complement(Box::new(inner.map_literals(f))),
            other => other.clone(),
        }
    }

    /// Renumbers `#N` references according to `mapping`.
    #[must_use]
    pub fn renumber_cells(&self, mapping: &BTreeMap<CellId, CellId>) -> Rule {
        self.replace_cell_refs(&|n| Self::CellRef(mapping.get(&n).copied().unwrap_or(n)))
    }

    /// Replaces `#N` references with the rule returned by `f(N)`.
    #[must_use]
    pub fn replace_cell_refs(&self, f: &impl Fn(CellId) -> Rule) -> Rule {
        match self {
            Self::CellRef(n) => f(*n),
            Self::Intersection(a, b) => Self::Intersection(
                Box::new(a.replace_cell_refs(f)),
                Box::new(b.replace_cell_refs(f)),
            ),
            Self::Union(a, b) => {
                Self::Union(Box::new(a.replace_cell_refs(f)), Box::new(b.replace_cell_refs(f)))
            }
            Self::Complement(inner) => Self::Complement(Box::new(inner.replace_cell_refs(f))),
            other => other.clone(),
        }
    }

    /// Removes every literal of `surface`.
    ///
    /// A removed literal becomes the neutral element of its enclosing
    /// operator (universe inside an intersection, empty inside a union), so
    /// the remaining constraints are kept unchanged. Constants are folded
    /// afterwards.
    #[must_use]
    pub fn remove_surface(&self, surface: SurfaceId) -> Rule {
        self.remove_in(surface, true).simplify_constants()
    }

    fn remove_in(&self, surface: SurfaceId, in_intersection: bool) -> Rule {
        match self {
            Self::Literal(n) if n.unsigned_abs() == surface => Self::Constant(in_intersection),
            Self::Intersection(a, b) => Self::Intersection(
                Box::new(a.remove_in(surface, true)),
                Box::new(b.remove_in(surface, true)),
            ),
            Self::Union(a, b) => Self::Union(
                Box::new(a.remove_in(surface, false)),
                Box::new(b.remove_in(surface, false)),
            ),
            // the neutral element flips under a complement
            Self::Complement(inner) => {
                Self::Complement(Box::new(inner.remove_in(surface, !in_intersection)))
            }
            other => other.clone(),
        }
    }

    /// Splits a top-level intersection into its conjuncts.
    #[must_use]
    pub fn conjuncts(&self) -> Vec<&Rule> {
        let mut out = Vec::new();
        self.flatten(&mut out, true);
        out
    }

    /// Splits a top-level union into its disjuncts.
    #[must_use]
    pub fn disjuncts(&self) -> Vec<&Rule> {
        let mut out = Vec::new();
        self.flatten(&mut out, false);
        out
    }

    fn flatten<'a>(&'a self, out: &mut Vec<&'a Rule>, intersection: bool) {
        match (self, intersection) {
            (Self::Intersection(a, b), true) | (Self::Union(a, b), false) => {
                a.flatten(out, intersection);
                b.flatten(out, intersection);
            }
            _ => out.push(self),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Union(..) => 0,
            Self::Intersection(..) => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(n) => write!(f, "{n}"),
            Self::Intersection(..) => {
                for (i, part) in self.conjuncts().into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    if part.precedence() < 1 {
                        write!(f, "({part})")?;
                    } else {
                        write!(f, "{part}")?;
                    }
                }
                Ok(())
            }
            Self::Union(..) => {
                for (i, part) in self.disjuncts().into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(" : ")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
            Self::Complement(inner) => write!(f, "#({inner})"),
            Self::CellRef(n) => write!(f, "#{n}"),
            Self::Constant(true) => Ok(()),
            Self::Constant(false) => f.write_str("#()"),
        }
    }
}

impl FromStr for Rule {
    type Err = CellGeoError;

    fn from_str(s: &str) -> Result<Self> {
        parse::parse_rule(s)
    }
}

impl BitAnd for Rule {
    type Output = Rule;

    fn bitand(self, rhs: Rule) -> Rule {
        Rule::Intersection(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Rule {
    type Output = Rule;

    fn bitor(self, rhs: Rule) -> Rule {
        Rule::Union(Box::new(self), Box::new(rhs))
    }
}

impl Not for Rule {
    type Output = Rule;

    fn not(self) -> Rule {
        Rule::Complement(Box::new(self))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    fn r(s: &str) -> Rule {
        s.parse().unwrap()
    }

    fn truth(assign: &[(u32, bool)]) -> impl Fn(i32) -> bool + '_ {
        move |n| {
            let v = assign
                .iter()
                .find(|(id, _)| *id == n.unsigned_abs())
                .map_or(false, |(_, v)| *v);
            if n > 0 {
                v
            } else {
                !v
            }
        }
    }

    #[test]
    fn display_round_trips_structure() {
        let rule = r("1 -2 (3 : -4) : 5");
        assert_eq!(rule.to_string(), "1 -2 (3 : -4) : 5");
        assert_eq!(r(&rule.to_string()), rule);
    }

    #[test]
    fn complement_pushes_to_literals() {
        let c = r("1 -2 : 3").complement();
        assert_eq!(c.to_string(), "(-1 : 2) -3");
        assert!(!matches!(c, Rule::Complement(_)));
    }

    #[test]
    fn evaluate_honours_nested_complement() {
        let rule = r("#(1 -2)");
        assert!(rule.evaluate(&truth(&[(1, false), (2, false)])));
        assert!(!rule.evaluate(&truth(&[(1, true), (2, false)])));
    }

    #[test]
    fn on_surface_literal_satisfies_both_signs() {
        // callback accepting both signs of surface 1
        let both = |n: i32| n.unsigned_abs() == 1;
        assert!(r("1").evaluate(&both));
        assert!(r("-1").evaluate(&both));
        assert!(r("#(1)").evaluate(&both));
    }

    #[test]
    fn surface_and_cell_sets() {
        let rule = r("1 -2 #(3 : -1) #7");
        assert_eq!(rule.surface_ids().into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(rule.signed_literals().into_iter().collect::<Vec<_>>(), vec![-3, -2, 1]);
        assert_eq!(rule.cell_refs().into_iter().collect::<Vec<_>>(), vec![7]);
        assert!(!rule.is_resolved());
        assert_eq!(rule.literal_count(), 4);
    }

    #[test]
    fn substitute_keeps_sign() {
        assert_eq!(r("3 -3 4").substitute_surface(3, -9).to_string(), "-9 9 4");
    }

    #[test]
    fn renumber_surfaces_and_cells() {
        let map: BTreeMap<_, _> = [(1, 10), (2, 20)].into_iter().collect();
        assert_eq!(r("1 -2 3").renumber_surfaces(&map).unwrap().to_string(), "10 -20 3");
        let too_big: BTreeMap<_, _> = [(1, 3_000_000_000)].into_iter().collect();
        assert!(matches!(
            r("1 -2").renumber_surfaces(&too_big).unwrap_err(),
            CellGeoError::Registry(RegistryError::NumberOutOfRange(3_000_000_000))
        ));
        let cells: BTreeMap<_, _> = [(5, 50)].into_iter().collect();
        assert_eq!(r("1 #5 #6").renumber_cells(&cells).to_string(), "1 #50 #6");
    }

    #[test]
    fn remove_surface_uses_neutral_element() {
        assert_eq!(r("1 -2 3").remove_surface(2).to_string(), "1 3");
        assert_eq!(r("1 : -2 : 3").remove_surface(2).to_string(), "1 : 3");
        assert_eq!(r("#(1 -2)").remove_surface(2).to_string(), "#(1)");
    }

    #[test]
    fn constants_fold() {
        let rule = Rule::all([Rule::Literal(1), Rule::Constant(true)]);
        assert_eq!(rule.simplify_constants(), Rule::Literal(1));
        let rule = Rule::any([Rule::Literal(1), Rule::Constant(true)]);
        assert_eq!(rule.simplify_constants(), Rule::Constant(true));
        assert_eq!(Rule::all([]), Rule::Constant(true));
        assert_eq!(Rule::any([]), Rule::Constant(false));
    }

    #[test]
    fn operators_build_trees() {
        let rule = (Rule::Literal(1) & Rule::Literal(-2)) | !Rule::Literal(3);
        assert_eq!(rule.to_string(), "1 -2 : #(3)");
    }
}
