//! Theories: top rules partitioned by target predicate.
//!
//! The event-calculus schema has two target predicates — `initiatedAt` for
//! event onset and `terminatedAt` for event end — so a theory is two rule
//! lists managed together. The theory owns its top rules; each top rule owns
//! its support set and refinements.

use serde::{Deserialize, Serialize};

use crate::clause::{Clause, ClauseId};
use crate::error::{TheoryError, TheoryResult};
use crate::subsumption::subsumes;
use crate::support::compress_theory;

/// Head predicate of rules asserting event onset.
pub const INITIATED_AT: &str = "initiatedAt";
/// Head predicate of rules asserting event end.
pub const TERMINATED_AT: &str = "terminatedAt";

/// How a candidate rule entered the theory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The candidate was admitted as a new top rule.
    Admitted(ClauseId),
    /// The candidate subsumed an existing rule and was merged into it.
    MergedInto(ClauseId),
}

/// A set of top rules split into initiation and termination sub-theories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Theory {
    pub initiation: Vec<Clause>,
    pub termination: Vec<Clause>,
}

impl Theory {
    /// Create an empty theory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a top rule in the partition matching its head predicate.
    pub fn add(&mut self, clause: Clause) -> TheoryResult<()> {
        match clause.head_predicate() {
            Some(INITIATED_AT) => {
                self.initiation.push(clause);
                Ok(())
            }
            Some(TERMINATED_AT) => {
                self.termination.push(clause);
                Ok(())
            }
            Some(other) => Err(TheoryError::UnsupportedHead {
                predicate: other.to_string(),
            }),
            None => Err(TheoryError::Headless),
        }
    }

    /// Admit a freshly generated rule, merging on subsumption: when the
    /// newcomer subsumes an existing top rule, its support set is folded into
    /// that rule instead and the newcomer is discarded.
    pub fn merge_or_admit(&mut self, newcomer: Clause) -> TheoryResult<Admission> {
        let partition = match newcomer.head_predicate() {
            Some(INITIATED_AT) => &mut self.initiation,
            Some(TERMINATED_AT) => &mut self.termination,
            Some(other) => {
                return Err(TheoryError::UnsupportedHead {
                    predicate: other.to_string(),
                })
            }
            None => return Err(TheoryError::Headless),
        };

        if let Some(existing) = partition.iter_mut().find(|t| subsumes(&newcomer, t)) {
            existing.support.add_all(newcomer.support);
            existing.support.compress();
            // The merged support invalidates the refinement candidates; the
            // online loop rebuilds them before the next expansion decision.
            existing.refinements.clear();
            return Ok(Admission::MergedInto(existing.id));
        }

        let id = newcomer.id;
        partition.push(newcomer);
        Ok(Admission::Admitted(id))
    }

    /// Replace the top rule with identity `id` by `replacement`, preserving
    /// the partition. Returns `true` when a rule was replaced.
    pub fn replace(&mut self, id: ClauseId, replacement: Clause) -> bool {
        for partition in [&mut self.initiation, &mut self.termination] {
            if let Some(slot) = partition.iter_mut().find(|c| c.id == id) {
                *slot = replacement;
                return true;
            }
        }
        false
    }

    /// All top rules, initiation first.
    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        self.initiation.iter().chain(self.termination.iter())
    }

    /// Mutable view over all top rules.
    pub fn clauses_mut(&mut self) -> impl Iterator<Item = &mut Clause> {
        self.initiation.iter_mut().chain(self.termination.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.initiation.len() + self.termination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initiation.is_empty() && self.termination.is_empty()
    }

    /// Drop logically equivalent duplicates in each partition, keeping the
    /// earliest-created representative.
    pub fn compress(&mut self) {
        self.initiation = compress_theory(std::mem::take(&mut self.initiation));
        self.termination = compress_theory(std::mem::take(&mut self.termination));
    }

    /// Keep only rules whose precision reaches `threshold`.
    pub fn retain_precision(&mut self, threshold: f64) {
        self.initiation.retain(|c| c.precision() >= threshold);
        self.termination.retain(|c| c.precision() >= threshold);
    }

    /// Render the theory as rule text, one weighted clause per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for clause in self.clauses() {
            out.push_str(&clause.render_weighted());
            out.push('\n');
        }
        out
    }
}
