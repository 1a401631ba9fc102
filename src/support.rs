//! Support sets: bottom-rule witnesses backing each top rule.
//!
//! Every top rule keeps the list of most-specific clauses (bottom rules) it
//! was abstracted from. The support set is where refinement candidates come
//! from, and its compression keeps only the most specific witnesses: when one
//! support rule subsumes another, the more general one is dropped.
//!
//! This module also hosts theory-level compression (drop logically equivalent
//! duplicates, keeping the earliest-created representative).

use serde::{Deserialize, Serialize};

use crate::clause::{Clause, ClauseId};
use crate::error::{ClauseError, ClauseResult};
use crate::literal::Literal;
use crate::subsumption::{mutually_subsume, subsumes};

// ---------------------------------------------------------------------------
// Support set
// ---------------------------------------------------------------------------

/// An ordered list of bottom rules witnessing a top rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportSet {
    rules: Vec<Clause>,
}

impl SupportSet {
    /// Create an empty support set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a support set from existing bottom rules.
    pub fn from_rules(rules: Vec<Clause>) -> Self {
        Self { rules }
    }

    /// Add a bottom rule unless a structurally equal one is already present.
    pub fn add(&mut self, rule: Clause) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    /// Add every rule of another support set.
    pub fn add_all(&mut self, rules: impl IntoIterator<Item = Clause>) {
        for rule in rules {
            self.add(rule);
        }
    }

    /// Remove the rule with the given identity, if present.
    pub fn remove(&mut self, id: ClauseId) {
        self.rules.retain(|r| r.id != id);
    }

    pub fn rules(&self) -> &[Clause] {
        &self.rules
    }

    pub fn first(&self) -> Option<&Clause> {
        self.rules.first()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Clause> {
        self.rules.iter()
    }

    /// Look up body literal `literal` of support rule `rule` (both 1-based).
    ///
    /// Out-of-range indices fail with an explicit not-found error.
    pub fn literal_at(&self, rule: usize, literal: usize) -> ClauseResult<&Literal> {
        if rule < 1 || rule > self.rules.len() {
            return Err(ClauseError::SupportRuleNotFound {
                index: rule,
                len: self.rules.len(),
            });
        }
        let body = &self.rules[rule - 1].body;
        if literal < 1 || literal > body.len() {
            return Err(ClauseError::SupportLiteralNotFound {
                rule,
                literal,
                len: body.len(),
            });
        }
        Ok(&body[literal - 1])
    }

    /// Drop every rule that subsumes another member: the more general
    /// witness is discarded, the more specific ones are kept. For pairs that
    /// subsume each other (logical variants) the earliest-created member
    /// stays, so compression is idempotent.
    pub fn compress(&mut self) {
        let rules = &self.rules;
        let keep: Vec<bool> = rules
            .iter()
            .map(|p| {
                !rules.iter().any(|q| {
                    q.id != p.id
                        && subsumes(p, q)
                        && (!subsumes(q, p) || q.id < p.id)
                })
            })
            .collect();
        let mut index = 0;
        self.rules.retain(|_| {
            let kept = keep[index];
            index += 1;
            kept
        });
    }

    /// Distinct body literals across all support rules, first-occurrence
    /// order preserved. This is the refinement generator's candidate pool.
    pub fn distinct_body_literals(&self) -> Vec<Literal> {
        let mut out: Vec<Literal> = Vec::new();
        for rule in &self.rules {
            for lit in &rule.body {
                if !out.contains(lit) {
                    out.push(lit.clone());
                }
            }
        }
        out
    }
}

impl IntoIterator for SupportSet {
    type Item = Clause;
    type IntoIter = std::vec::IntoIter<Clause>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Theory compression
// ---------------------------------------------------------------------------

/// Remove clauses that are logically equivalent (mutual θ-subsumption) to
/// another member, keeping the earliest-created representative of each
/// equivalence class.
pub fn compress_theory(clauses: Vec<Clause>) -> Vec<Clause> {
    let mut kept: Vec<Clause> = Vec::with_capacity(clauses.len());
    for candidate in clauses {
        let duplicate = kept.iter().any(|k| mutually_subsume(k, &candidate));
        if !duplicate {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn lit(pred: &str, args: Vec<Term>) -> Literal {
        Literal::positive(pred, args)
    }

    fn bottom(fluent: &str, extra: &[&str]) -> Clause {
        let mut body = vec![lit(
            "happensAt",
            vec![Term::constant("walk"), Term::var("T")],
        )];
        for pred in extra {
            body.push(lit(pred, vec![Term::constant(fluent), Term::var("T")]));
        }
        Clause::new(
            lit("initiatedAt", vec![Term::constant(fluent), Term::var("T")]),
            body,
        )
    }

    #[test]
    fn add_deduplicates_structurally() {
        let mut support = SupportSet::new();
        support.add(bottom("f", &["holdsAt"]));
        support.add(bottom("f", &["holdsAt"]));
        assert_eq!(support.len(), 1);
    }

    #[test]
    fn remove_by_identity() {
        let mut support = SupportSet::new();
        let rule = bottom("f", &[]);
        let id = rule.id;
        support.add(rule);
        support.add(bottom("g", &[]));
        support.remove(id);
        assert_eq!(support.len(), 1);
    }

    #[test]
    fn literal_lookup_is_one_based() {
        let mut support = SupportSet::new();
        support.add(bottom("f", &["holdsAt"]));
        let first = support.literal_at(1, 1).unwrap();
        assert_eq!(first.predicate, "happensAt");
        let second = support.literal_at(1, 2).unwrap();
        assert_eq!(second.predicate, "holdsAt");
    }

    #[test]
    fn literal_lookup_out_of_range() {
        let mut support = SupportSet::new();
        support.add(bottom("f", &[]));
        assert!(matches!(
            support.literal_at(2, 1),
            Err(ClauseError::SupportRuleNotFound { .. })
        ));
        assert!(matches!(
            support.literal_at(1, 5),
            Err(ClauseError::SupportLiteralNotFound { .. })
        ));
        assert!(matches!(
            support.literal_at(0, 1),
            Err(ClauseError::SupportRuleNotFound { .. })
        ));
    }

    #[test]
    fn compress_drops_the_more_general_witness() {
        // general has a subset body of specific, so general subsumes it.
        let general = bottom("f", &[]);
        let specific = bottom("f", &["holdsAt"]);
        let mut support = SupportSet::from_rules(vec![general, specific.clone()]);
        support.compress();
        assert_eq!(support.len(), 1);
        assert_eq!(support.rules()[0], specific);
    }

    #[test]
    fn compress_is_idempotent() {
        let mut support = SupportSet::from_rules(vec![
            bottom("f", &[]),
            bottom("f", &["holdsAt"]),
            bottom("g", &[]),
        ]);
        support.compress();
        let after_once: Vec<String> = support.iter().map(|c| c.to_string()).collect();
        support.compress();
        let after_twice: Vec<String> = support.iter().map(|c| c.to_string()).collect();
        assert_eq!(after_once, after_twice);
    }

    #[test]
    fn compress_keeps_one_variant() {
        let a = Clause::new(
            lit("p", vec![Term::var("X")]),
            vec![lit("q", vec![Term::var("X")])],
        );
        let b = Clause::new(
            lit("p", vec![Term::var("Y")]),
            vec![lit("q", vec![Term::var("Y")])],
        );
        let mut support = SupportSet::from_rules(vec![a.clone(), b]);
        support.compress();
        assert_eq!(support.len(), 1);
        assert_eq!(support.rules()[0].id, a.id);
    }

    #[test]
    fn distinct_body_literals_union() {
        let support = SupportSet::from_rules(vec![
            bottom("f", &["holdsAt"]),
            bottom("f", &["visible"]),
        ]);
        let literals = support.distinct_body_literals();
        let rendered: Vec<String> = literals.iter().map(|l| l.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["happensAt(walk,T)", "holdsAt(f,T)", "visible(f,T)"]
        );
    }

    #[test]
    fn theory_compression_keeps_earliest() {
        let a = Clause::new(
            lit("p", vec![Term::var("X")]),
            vec![lit("q", vec![Term::var("X")])],
        );
        let b = Clause::new(
            lit("p", vec![Term::var("Z")]),
            vec![lit("q", vec![Term::var("Z")])],
        );
        let c = Clause::new(lit("r", vec![Term::var("X")]), vec![]);
        let compressed = compress_theory(vec![a.clone(), b, c.clone()]);
        assert_eq!(compressed.len(), 2);
        assert_eq!(compressed[0].id, a.id);
        assert_eq!(compressed[1].id, c.id);
    }
}
