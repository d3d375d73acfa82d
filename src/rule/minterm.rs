//! Truth tables and Quine-McCluskey prime implicants.
//!
//! Each distinct surface of a rule is assigned a bit; a minterm is a `u64`
//! whose bit `i` is set when the point is on the positive side of the `i`-th
//! surface.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{Result, RuleError};
use crate::registry::signed;
use crate::SurfaceId;

use super::Rule;

/// Ordered assignment of surface numbers to minterm bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralIndex {
    ids: Vec<i32>,
}

impl LiteralIndex {
    /// Creates an index over the given surfaces; bit order follows the
    /// ascending surface number.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RegistryError::NumberOutOfRange`] if a
    /// number cannot be written as a literal.
    pub fn new(ids: &BTreeSet<SurfaceId>) -> Result<Self> {
        let ids = ids
            .iter()
            .map(|&id| signed(id, true))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ids })
    }

    /// Number of indexed surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Bit position of `id`, if indexed.
    #[must_use]
    pub fn bit(&self, id: SurfaceId) -> Option<usize> {
        let id = i32::try_from(id).ok()?;
        self.ids.binary_search(&id).ok()
    }

    /// Surface number at bit position `bit`.
    #[must_use]
    pub fn id(&self, bit: usize) -> SurfaceId {
        self.ids[bit].unsigned_abs()
    }

    /// Signed literal for bit position `bit`.
    #[must_use]
    pub fn literal(&self, bit: usize, positive: bool) -> i32 {
        let id = self.ids[bit];
        if positive {
            id
        } else {
            -id
        }
    }

    /// Mask with one bit set per indexed surface.
    #[must_use]
    pub fn full_mask(&self) -> u64 {
        if self.ids.len() >= 64 {
            u64::MAX
        } else {
            (1u64 << self.ids.len()) - 1
        }
    }
}

/// A product term: bits set in `care` are fixed to the matching bit of
/// `value`, the others are free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Implicant {
    value: u64,
    care: u64,
}

impl Implicant {
    /// Creates an implicant; bits of `value` outside `care` are cleared.
    #[must_use]
    pub fn new(value: u64, care: u64) -> Self {
        Self {
            value: value & care,
            care,
        }
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }

    #[must_use]
    pub fn care(&self) -> u64 {
        self.care
    }

    /// Returns `true` if `minterm` lies in this term.
    #[must_use]
    pub fn covers(&self, minterm: u64) -> bool {
        (minterm ^ self.value) & self.care == 0
    }

    /// Number of fixed literals.
    #[must_use]
    pub fn literal_count(&self) -> u32 {
        self.care.count_ones()
    }

    /// Combines two terms that differ in exactly one fixed bit.
    #[must_use]
    pub fn merge(&self, other: &Implicant) -> Option<Implicant> {
        if self.care != other.care {
            return None;
        }
        let diff = self.value ^ other.value;
        (diff.count_ones() == 1).then(|| Implicant::new(self.value, self.care & !diff))
    }

    /// Signed literals of the term, in bit order.
    #[must_use]
    pub fn literals(&self, index: &LiteralIndex) -> Vec<i32> {
        (0..index.len())
            .filter(|&bit| self.care & (1 << bit) != 0)
            .map(|bit| index.literal(bit, self.value & (1 << bit) != 0))
            .collect()
    }

    /// Conjunction of the term's literals; the universe when nothing is
    /// fixed.
    #[must_use]
    pub fn to_product(&self, index: &LiteralIndex) -> Rule {
        Rule::all(self.literals(index).into_iter().map(Rule::Literal))
    }

    /// Disjunction of the negated literals: the clause that excludes exactly
    /// this term.
    #[must_use]
    pub fn to_excluding_sum(&self, index: &LiteralIndex) -> Rule {
        Rule::any(self.literals(index).into_iter().map(|n| Rule::Literal(-n)))
    }
}

/// Rule lowered onto bit positions for fast repeated evaluation.
#[derive(Debug, Clone)]
enum Compiled {
    Bit { bit: u32, positive: bool },
    And(Box<Compiled>, Box<Compiled>),
    Or(Box<Compiled>, Box<Compiled>),
    Not(Box<Compiled>),
    Const(bool),
}

impl Compiled {
    fn lower(rule: &Rule, index: &LiteralIndex) -> std::result::Result<Self, RuleError> {
        Ok(match rule {
            Rule::Literal(n) => {
                let bit = index
                    .bit(n.unsigned_abs())
                    .and_then(|b| u32::try_from(b).ok())
                    .ok_or(RuleError::UnresolvedReference(n.unsigned_abs()))?;
                Compiled::Bit {
                    bit,
                    positive: *n > 0,
                }
            }
            Rule::Intersection(a, b) => {
                Compiled::And(Box::new(Self::lower(a, index)?), Box::new(Self::lower(b, index)?))
            }
            Rule::Union(a, b) => {
                Compiled::Or(Box::new(Self::lower(a, index)?), Box::new(Self::lower(b, index)?))
            }
            Rule::Complement(inner) => Compiled::Not(Box::new(Self::lower(inner, index)?)),
            Rule::CellRef(n) => return Err(RuleError::UnresolvedReference(*n)),
            Rule::Constant(v) => Compiled::Const(*v),
        })
    }

    fn eval(&self, minterm: u64) -> bool {
        match self {
            Compiled::Bit { bit, positive } => ((minterm >> bit) & 1 == 1) == *positive,
            Compiled::And(a, b) => a.eval(minterm) && b.eval(minterm),
            Compiled::Or(a, b) => a.eval(minterm) || b.eval(minterm),
            Compiled::Not(inner) => !inner.eval(minterm),
            Compiled::Const(v) => *v,
        }
    }
}

/// A rule lowered onto an index so it can be evaluated per minterm.
#[derive(Debug, Clone)]
pub(super) struct CompiledRule {
    root: Compiled,
}

impl CompiledRule {
    /// Lowers `rule` onto `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnresolvedReference`] for `#N` references and
    /// for surfaces missing from the index.
    pub(super) fn new(rule: &Rule, index: &LiteralIndex) -> Result<Self> {
        Ok(Self {
            root: Compiled::lower(rule, index)?,
        })
    }

    pub(super) fn eval(&self, minterm: u64) -> bool {
        self.root.eval(minterm)
    }
}

/// The full truth table of a rule over its own surfaces.
#[derive(Debug, Clone)]
pub struct TruthTable {
    index: LiteralIndex,
    true_set: Vec<u64>,
    false_set: Vec<u64>,
}

impl TruthTable {
    /// Enumerates every assignment of the rule's surfaces.
    ///
    /// The caller is responsible for bounding the literal count.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnresolvedReference`] if the rule still holds
    /// `#N` references.
    pub fn build(rule: &Rule) -> Result<Self> {
        let index = LiteralIndex::new(&rule.surface_ids())?;
        let compiled = CompiledRule::new(rule, &index)?;
        let (true_set, false_set): (Vec<u64>, Vec<u64>) =
            (0..=index.full_mask()).partition(|&m| compiled.eval(m));
        Ok(Self {
            index,
            true_set,
            false_set,
        })
    }

    #[must_use]
    pub fn index(&self) -> &LiteralIndex {
        &self.index
    }

    /// Minterms for which the rule holds.
    #[must_use]
    pub fn true_set(&self) -> &[u64] {
        &self.true_set
    }

    /// Minterms for which the rule fails.
    #[must_use]
    pub fn false_set(&self) -> &[u64] {
        &self.false_set
    }
}

/// Computes every prime implicant of the function whose on-set is
/// `minterms` over `width` bits.
///
/// `limit` caps the number of implicants generated across all merge
/// levels, minterms included.
///
/// # Errors
///
/// Returns [`RuleError::ImplicantLimit`] once more than `limit` implicants
/// have been generated.
pub fn prime_implicants(minterms: &[u64], width: usize, limit: usize) -> Result<Vec<Implicant>> {
    let full = if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    };
    let mut current: HashSet<Implicant> =
        minterms.iter().map(|&m| Implicant::new(m, full)).collect();
    let mut generated = current.len();
    if generated > limit {
        return Err(RuleError::ImplicantLimit { limit }.into());
    }
    let mut primes = Vec::new();

    while !current.is_empty() {
        // terms can only merge with a term of the same mask and one more set bit
        let mut groups: HashMap<(u64, u32), Vec<Implicant>> = HashMap::new();
        for imp in &current {
            groups
                .entry((imp.care, imp.value.count_ones()))
                .or_default()
                .push(*imp);
        }

        let mut merged = HashSet::new();
        let mut next = HashSet::new();
        for (&(care, ones), lower) in &groups {
            let Some(upper) = groups.get(&(care, ones + 1)) else {
                continue;
            };
            for a in lower {
                for b in upper {
                    if let Some(m) = a.merge(b) {
                        if next.insert(m) && generated + next.len() > limit {
                            return Err(RuleError::ImplicantLimit { limit }.into());
                        }
                        merged.insert(*a);
                        merged.insert(*b);
                    }
                }
            }
        }

        primes.extend(current.into_iter().filter(|imp| !merged.contains(imp)));
        generated += next.len();
        current = next;
    }

    primes.sort_unstable();
    Ok(primes)
}

/// Chooses a small subset of `primes` covering every minterm: essential
/// primes first, then greedily the prime covering most remaining minterms
/// (fewest literals on ties).
#[must_use]
pub fn select_cover(primes: &[Implicant], minterms: &[u64]) -> Vec<Implicant> {
    let mut uncovered: BTreeSet<u64> = minterms.iter().copied().collect();
    let mut chosen: BTreeSet<Implicant> = BTreeSet::new();

    for &m in minterms {
        let mut covering = primes.iter().filter(|p| p.covers(m));
        if let (Some(only), None) = (covering.next(), covering.next()) {
            chosen.insert(*only);
        }
    }
    uncovered.retain(|&m| !chosen.iter().any(|p| p.covers(m)));

    while !uncovered.is_empty() {
        let best = primes
            .iter()
            .filter(|p| !chosen.contains(*p))
            .map(|p| (uncovered.iter().filter(|&&m| p.covers(m)).count(), p))
            .filter(|(count, _)| *count > 0)
            .max_by(|(ca, a), (cb, b)| {
                ca.cmp(cb)
                    .then_with(|| b.literal_count().cmp(&a.literal_count()))
                    .then_with(|| b.cmp(a))
            });
        let Some((_, best)) = best else {
            break;
        };
        let best = *best;
        uncovered.retain(|&m| !best.covers(m));
        chosen.insert(best);
    }

    chosen.into_iter().collect()
}

/// Prime implicants of `minterms` reduced to a cover.
///
/// # Errors
///
/// See [`prime_implicants`].
pub fn minimal_cover(minterms: &[u64], width: usize, limit: usize) -> Result<Vec<Implicant>> {
    let primes = prime_implicants(minterms, width, limit)?;
    Ok(select_cover(&primes, minterms))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::CellGeoError;

    #[test]
    fn merge_requires_single_difference() {
        let a = Implicant::new(0b101, 0b111);
        let b = Implicant::new(0b100, 0b111);
        assert_eq!(a.merge(&b), Some(Implicant::new(0b100, 0b110)));
        let c = Implicant::new(0b110, 0b111);
        assert_eq!(a.merge(&c), None);
        assert_eq!(a.merge(&Implicant::new(0b101, 0b011)), None);
    }

    #[test]
    fn covers_ignores_free_bits() {
        let imp = Implicant::new(0b100, 0b110);
        assert!(imp.covers(0b100));
        assert!(imp.covers(0b101));
        assert!(!imp.covers(0b110));
    }

    #[test]
    fn classic_prime_implicants() {
        // f(a,b,c) = sum(0,1,2,5,6,7)
        let primes = prime_implicants(&[0, 1, 2, 5, 6, 7], 3, 100).unwrap();
        assert_eq!(primes.len(), 6);
        assert!(primes.iter().all(|p| p.literal_count() == 2));
        let cover = select_cover(&primes, &[0, 1, 2, 5, 6, 7]);
        assert_eq!(cover.len(), 3);
        for m in [0, 1, 2, 5, 6, 7] {
            assert!(cover.iter().any(|p| p.covers(m)));
        }
        for m in [3, 4] {
            assert!(!cover.iter().any(|p| p.covers(m)));
        }
    }

    #[test]
    fn full_on_set_collapses_to_universe() {
        let cover = minimal_cover(&[0, 1, 2, 3], 2, 100).unwrap();
        assert_eq!(cover, vec![Implicant::new(0, 0)]);
    }

    #[test]
    fn implicant_search_stops_at_the_limit() {
        // every minterm but the all-zero one: 2^10 - 1 minterms and 3^10 - 2^10 implicants
        let minterms: Vec<u64> = (1..1 << 10).collect();
        assert!(matches!(
            prime_implicants(&minterms, 10, 5_000).unwrap_err(),
            CellGeoError::Rule(RuleError::ImplicantLimit { limit: 5_000 })
        ));
        assert!(matches!(
            prime_implicants(&minterms, 10, 100).unwrap_err(),
            CellGeoError::Rule(RuleError::ImplicantLimit { limit: 100 })
        ));
        let primes = prime_implicants(&minterms, 10, 100_000).unwrap();
        // one single-literal prime per bit
        assert_eq!(primes.len(), 10);
        assert!(primes.iter().all(|p| p.literal_count() == 1));
    }

    #[test]
    fn truth_table_partitions_minterms() {
        let rule: Rule = "1 -2".parse().unwrap();
        let table = TruthTable::build(&rule).unwrap();
        // bit 0 = surface 1, bit 1 = surface 2
        assert_eq!(table.true_set(), &[0b01]);
        assert_eq!(table.false_set(), &[0b00, 0b10, 0b11]);
    }

    #[test]
    fn truth_table_rejects_cell_refs() {
        let rule: Rule = "1 #3".parse().unwrap();
        assert!(TruthTable::build(&rule).is_err());
    }

    #[test]
    fn implicant_to_rule() {
        let mut ids = BTreeSet::new();
        ids.extend([3, 7, 9]);
        let index = LiteralIndex::new(&ids).unwrap();
        let imp = Implicant::new(0b001, 0b011);
        assert_eq!(imp.to_product(&index).to_string(), "3 -7");
        assert_eq!(imp.to_excluding_sum(&index).to_string(), "-3 : 7");
        assert_eq!(Implicant::new(0, 0).to_product(&index), Rule::Constant(true));
    }
}
