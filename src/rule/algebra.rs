//! Exact two-level minimisation, complement, equivalence and division.

use std::collections::BTreeSet;

use tracing::{debug, instrument, warn};

use crate::config::Settings;
use crate::error::{CellGeoError, Result, RuleError};

use super::minterm::{minimal_cover, CompiledRule, Implicant, LiteralIndex, TruthTable};
use super::Rule;

/// A product of signed literals.
pub type Cube = BTreeSet<i32>;

/// Result of [`Minimizer::weak_division`]: `dividend == quotient & divisor
/// : remainder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Division {
    pub quotient: Rule,
    pub remainder: Rule,
}

/// Truth-table based boolean algebra over rules.
///
/// Every operation enumerates all assignments of the distinct surfaces
/// involved, so the number of literals is bounded by the configured limit.
/// Prime implicant generation is bounded separately by the implicant limit.
#[derive(Debug, Clone, Copy)]
pub struct Minimizer {
    limit: usize,
    implicant_limit: usize,
}

impl Default for Minimizer {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Minimizer {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            limit: settings.effective_literal_limit(),
            implicant_limit: settings.implicant_limit,
        }
    }

    /// Maximum number of distinct surfaces accepted.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Maximum number of implicants one minimisation may generate.
    #[must_use]
    pub fn implicant_limit(&self) -> usize {
        self.implicant_limit
    }

    fn cover(&self, minterms: &[u64], index: &LiteralIndex) -> Result<Vec<Implicant>> {
        minimal_cover(minterms, index.len(), self.implicant_limit)
    }

    fn sum_of_products(&self, minterms: &[u64], index: &LiteralIndex) -> Result<Rule> {
        if minterms.is_empty() {
            return Ok(Rule::Constant(false));
        }
        let cover = self.cover(minterms, index)?;
        Ok(Rule::any(cover.iter().map(|imp| imp.to_product(index))))
    }

    fn check(&self, count: usize) -> Result<()> {
        if count > self.limit {
            return Err(RuleError::TooManyLiterals {
                count,
                limit: self.limit,
            }
            .into());
        }
        Ok(())
    }

    /// Builds the truth table of `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::TooManyLiterals`] past the limit and
    /// [`RuleError::UnresolvedReference`] for `#N` references.
    pub fn truth_table(&self, rule: &Rule) -> Result<TruthTable> {
        self.check(rule.surface_ids().len())?;
        TruthTable::build(rule)
    }

    /// Minimal sum-of-products form of `rule`.
    ///
    /// A contradiction yields `Constant(false)`, a tautology
    /// `Constant(true)`.
    ///
    /// # Errors
    ///
    /// See [`Minimizer::truth_table`]; also returns
    /// [`RuleError::ImplicantLimit`] when the prime implicant search grows
    /// past the implicant limit.
    #[instrument(level = "debug", skip(self), fields(%rule))]
    pub fn minimize_dnf(&self, rule: &Rule) -> Result<Rule> {
        let table = self.truth_table(rule)?;
        self.sum_of_products(table.true_set(), table.index())
    }

    /// Minimal product-of-sums form of `rule`.
    ///
    /// # Errors
    ///
    /// See [`Minimizer::minimize_dnf`].
    #[instrument(level = "debug", skip(self), fields(%rule))]
    pub fn minimize_cnf(&self, rule: &Rule) -> Result<Rule> {
        let table = self.truth_table(rule)?;
        if table.false_set().is_empty() {
            return Ok(Rule::Constant(true));
        }
        let index = table.index();
        let cover = self.cover(table.false_set(), index)?;
        debug!(clauses = cover.len(), "product of sums");
        Ok(Rule::all(cover.iter().map(|imp| imp.to_excluding_sum(index))))
    }

    /// Exact complement of `rule` as a minimal sum of products.
    ///
    /// # Errors
    ///
    /// See [`Minimizer::minimize_dnf`].
    pub fn complement(&self, rule: &Rule) -> Result<Rule> {
        let table = self.truth_table(rule)?;
        self.sum_of_products(table.false_set(), table.index())
    }

    /// Exact complement when the rule is small enough, structural
    /// complement otherwise. Either limit of the minimiser triggers the
    /// fallback.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnresolvedReference`] for `#N` references.
    pub fn complement_or_structural(&self, rule: &Rule) -> Result<Rule> {
        match self.complement(rule) {
            Err(CellGeoError::Rule(RuleError::TooManyLiterals { count, limit })) => {
                warn!(count, limit, "falling back to structural complement");
                Ok(rule.complement())
            }
            Err(CellGeoError::Rule(RuleError::ImplicantLimit { limit })) => {
                warn!(implicants = limit, "falling back to structural complement");
                Ok(rule.complement())
            }
            other => other,
        }
    }

    /// Returns `true` if both rules select the same region for every
    /// assignment of their combined surfaces.
    ///
    /// # Errors
    ///
    /// See [`Minimizer::truth_table`]; the limit applies to the union of both
    /// literal sets.
    pub fn equivalent(&self, a: &Rule, b: &Rule) -> Result<bool> {
        let mut ids = a.surface_ids();
        ids.extend(b.surface_ids());
        self.check(ids.len())?;
        let index = LiteralIndex::new(&ids)?;
        let (ca, cb) = (CompiledRule::new(a, &index)?, CompiledRule::new(b, &index)?);
        Ok((0..=index.full_mask()).all(|m| ca.eval(m) == cb.eval(m)))
    }

    /// Returns `true` if no assignment satisfies `rule`.
    ///
    /// # Errors
    ///
    /// See [`Minimizer::truth_table`].
    pub fn is_empty(&self, rule: &Rule) -> Result<bool> {
        Ok(self.truth_table(rule)?.true_set().is_empty())
    }

    /// Returns `true` if every assignment satisfies `rule`.
    ///
    /// # Errors
    ///
    /// See [`Minimizer::truth_table`].
    pub fn is_universe(&self, rule: &Rule) -> Result<bool> {
        Ok(self.truth_table(rule)?.false_set().is_empty())
    }

    /// Cubes of the minimal sum-of-products form.
    ///
    /// # Errors
    ///
    /// See [`Minimizer::minimize_dnf`].
    pub fn dnf_cubes(&self, rule: &Rule) -> Result<Vec<Cube>> {
        let table = self.truth_table(rule)?;
        if table.true_set().is_empty() {
            return Ok(Vec::new());
        }
        let index = table.index();
        Ok(self
            .cover(table.true_set(), index)?
            .iter()
            .map(|imp| imp.literals(index).into_iter().collect())
            .collect())
    }

    /// Algebraic weak division of `dividend` by `divisor`.
    ///
    /// Both operands are taken in minimal sum-of-products form. The quotient
    /// is the largest set of cubes `Q` such that every `q & b` (`b` a divisor
    /// cube) is a dividend cube; the remainder collects the dividend cubes
    /// not produced that way.
    ///
    /// # Errors
    ///
    /// See [`Minimizer::truth_table`].
    #[instrument(level = "debug", skip(self), fields(%dividend, %divisor))]
    pub fn weak_division(&self, dividend: &Rule, divisor: &Rule) -> Result<Division> {
        let a = self.dnf_cubes(dividend)?;
        let b = self.dnf_cubes(divisor)?;

        let mut quotient: Option<BTreeSet<Cube>> = None;
        for bc in &b {
            let partial: BTreeSet<Cube> = a
                .iter()
                .filter(|ac| bc.is_subset(ac))
                .map(|ac| -> Cube { ac.difference(bc).copied().collect() })
                .collect();
            let next = match quotient {
                None => partial,
                Some(q) => q.intersection(&partial).cloned().collect(),
            };
            let done = next.is_empty();
            quotient = Some(next);
            if done {
                break;
            }
        }
        let quotient = quotient.unwrap_or_default();

        let produced: BTreeSet<Cube> = quotient
            .iter()
            .flat_map(|q| b.iter().map(move |bc| -> Cube { q.union(bc).copied().collect() }))
            .collect();
        let remainder: Vec<Cube> = a.into_iter().filter(|ac| !produced.contains(ac)).collect();
        debug!(quotient = quotient.len(), remainder = remainder.len(), "divided");

        Ok(Division {
            quotient: cubes_to_rule(quotient.iter()),
            remainder: cubes_to_rule(remainder.iter()),
        })
    }
}

/// Union of the cubes' products.
pub fn cubes_to_rule<'a, I: IntoIterator<Item = &'a Cube>>(cubes: I) -> Rule {
    Rule::any(
        cubes
            .into_iter()
            .map(|cube| Rule::all(cube.iter().map(|&n| Rule::Literal(n)))),
    )
}
