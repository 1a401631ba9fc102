//! Horn clauses with streaming statistics and lifecycle state.
//!
//! A [`Clause`] is a rule `head :- body` plus everything the online learner
//! tracks about it: a stable identity, a weight, confusion-matrix counters,
//! the support set of bottom rules it was abstracted from, its live candidate
//! refinements, and the running statistics that feed the Hoeffding
//! specialization test.
//!
//! Body order matters only for rendering; the semantics is the conjunction.
//! Structural equality compares head and body; identity (for parent
//! back-pointers and replacement bookkeeping) goes through [`ClauseId`].

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::literal::Literal;
use crate::support::SupportSet;
use crate::term::Term;

/// Initial weight assigned to freshly created rules.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Documented non-zero floor for rule weights. Weight updates clamp here so
/// a demoted rule can always recover.
pub const WEIGHT_FLOOR: f64 = 1e-5;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Unique, niche-optimized identifier for a clause.
///
/// Uses `NonZeroU64` so that `Option<ClauseId>` is the same size as
/// `ClauseId`. IDs are monotonically increasing in creation order, which the
/// theory compressor uses as a deterministic tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ClauseId(NonZeroU64);

impl ClauseId {
    /// Allocate the next clause ID from the process-wide counter.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let raw = NEXT.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 allocations to wrap.
        ClauseId(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ClauseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Clause
// ---------------------------------------------------------------------------

/// A Horn rule together with its online-learning state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clause {
    /// Stable identity, used for parent back-pointers and replacement.
    pub id: ClauseId,
    /// Head literal; `None` only for the empty-clause sentinel.
    pub head: Option<Literal>,
    /// Body literals; order is preserved for rendering.
    pub body: Vec<Literal>,

    /// Real-valued rule weight, never below [`WEIGHT_FLOOR`].
    pub weight: f64,

    // Streaming confusion-matrix counters over groundings.
    pub tps: u64,
    pub fps: u64,
    pub fns: u64,
    pub tns: u64,
    pub total_groundings: u64,
    /// Number of examples this rule has been scored against.
    pub seen: u64,

    /// The clause this one was refined from, if any.
    pub parent: Option<ClauseId>,
    /// Bottom rules witnessing this clause.
    pub support: SupportSet,
    /// Live candidate specializations.
    pub refinements: Vec<Clause>,

    // Running statistics for the Hoeffding specialization test.
    pub previous_mean_diff: f64,
    pub previous_mean_diff_count: u64,

    // Lifecycle flags.
    pub is_top_rule: bool,
    pub is_bottom_rule: bool,
    pub eligible_for_specialization: bool,
    pub is_new: bool,
}

impl Clause {
    /// Create a top-level rule with a fresh identity.
    pub fn new(head: Literal, body: Vec<Literal>) -> Self {
        Self {
            id: ClauseId::fresh(),
            head: Some(head),
            body,
            weight: DEFAULT_WEIGHT,
            tps: 0,
            fps: 0,
            fns: 0,
            tns: 0,
            total_groundings: 0,
            seen: 0,
            parent: None,
            support: SupportSet::new(),
            refinements: Vec::new(),
            previous_mean_diff: 0.0,
            previous_mean_diff_count: 0,
            is_top_rule: true,
            is_bottom_rule: false,
            eligible_for_specialization: true,
            is_new: true,
        }
    }

    /// The empty clause: a well-formed sentinel with no head and no body.
    pub fn empty() -> Self {
        Self {
            head: None,
            is_top_rule: false,
            eligible_for_specialization: false,
            ..Self::new(Literal::positive("", vec![]), Vec::new())
        }
    }

    /// Whether this is the empty-clause sentinel.
    pub fn is_empty(&self) -> bool {
        self.head.is_none() && self.body.is_empty()
    }

    /// The head predicate symbol, if the clause has a head.
    pub fn head_predicate(&self) -> Option<&str> {
        self.head.as_ref().map(|h| h.predicate.as_str())
    }

    pub fn body_length(&self) -> usize {
        self.body.len()
    }

    /// Distinct variable names by left-to-right traversal of head then body.
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        if let Some(head) = &self.head {
            head.collect_variables(&mut vars);
        }
        for lit in &self.body {
            lit.collect_variables(&mut vars);
        }
        vars
    }

    /// Constant values occurring anywhere in the clause, duplicates removed,
    /// first-occurrence order preserved.
    pub fn constants(&self) -> Vec<String> {
        let mut all = Vec::new();
        if let Some(head) = &self.head {
            head.collect_constants(&mut all);
        }
        for lit in &self.body {
            lit.collect_constants(&mut all);
        }
        let mut distinct = Vec::new();
        for c in all {
            if !distinct.contains(&c) {
                distinct.push(c);
            }
        }
        distinct
    }

    /// Apply a substitution homomorphically to head and body, preserving all
    /// learning state. The result keeps this clause's identity: it is the
    /// same rule under renaming, not a new one.
    pub fn substitute(&self, mapping: &HashMap<String, Term>) -> Clause {
        let mut out = self.clone();
        out.head = self.head.as_ref().map(|h| h.substitute(mapping));
        out.body = self.body.iter().map(|l| l.substitute(mapping)).collect();
        out
    }

    /// Ground the clause by mapping each distinct variable to a fresh
    /// constant `skolem0`, `skolem1`, ... in left-to-right traversal order.
    ///
    /// Returns the grounded clause and the variable-to-constant mapping in
    /// assignment order; the naming is deterministic so tests can rely on it.
    pub fn skolemize(&self) -> (Clause, Vec<(String, String)>) {
        let vars = self.variables();
        let mut mapping = HashMap::with_capacity(vars.len());
        let mut pairs = Vec::with_capacity(vars.len());
        for (i, name) in vars.into_iter().enumerate() {
            let constant = format!("skolem{i}");
            mapping.insert(name.clone(), Term::Constant(constant.clone()));
            pairs.push((name, constant));
        }
        (self.substitute(&mapping), pairs)
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    /// Precision over groundings; 0 when the rule has fired on nothing.
    pub fn precision(&self) -> f64 {
        let denom = self.tps + self.fps;
        if denom == 0 {
            0.0
        } else {
            self.tps as f64 / denom as f64
        }
    }

    /// Recall over groundings; 0 when the rule has covered nothing.
    pub fn recall(&self) -> f64 {
        let denom = self.tps + self.fns;
        if denom == 0 {
            0.0
        } else {
            self.tps as f64 / denom as f64
        }
    }

    /// Harmonic mean of precision and recall; 0 when both are 0.
    pub fn fscore(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Reset all per-rule learning state: counters, example count, running
    /// means, and the refinements list. This is the only legal counter reset.
    pub fn clear_statistics(&mut self) {
        self.tps = 0;
        self.fps = 0;
        self.fns = 0;
        self.tns = 0;
        self.total_groundings = 0;
        self.seen = 0;
        self.previous_mean_diff = 0.0;
        self.previous_mean_diff_count = 0;
        self.refinements.clear();
    }

    /// Multiply the weight by `factor`, clamping below at `floor`.
    pub fn update_weight(&mut self, factor: f64, floor: f64) {
        self.weight = (self.weight * factor).max(floor);
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Canonical `head :- body1,body2.` rendering with the weight prefixed.
    pub fn render_weighted(&self) -> String {
        format!("{:.5} :: {self}", self.weight)
    }
}

impl PartialEq for Clause {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head && self.body == other.body
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(head) = &self.head else {
            return write!(f, "false.");
        };
        if self.body.is_empty() {
            return write!(f, "{head}.");
        }
        write!(f, "{head} :- ")?;
        for (i, lit) in self.body.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{lit}")?;
        }
        write!(f, ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(text_head: (&str, Vec<Term>), body: Vec<Literal>) -> Clause {
        Clause::new(Literal::positive(text_head.0, text_head.1), body)
    }

    #[test]
    fn clause_id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<ClauseId>>(),
            std::mem::size_of::<ClauseId>()
        );
    }

    #[test]
    fn fresh_ids_are_monotonic() {
        let a = ClauseId::fresh();
        let b = ClauseId::fresh();
        assert!(a < b);
    }

    #[test]
    fn variables_head_then_body() {
        let c = clause(
            ("initiatedAt", vec![Term::var("F"), Term::var("T")]),
            vec![
                Literal::positive("happensAt", vec![Term::var("E"), Term::var("T")]),
                Literal::positive("holdsAt", vec![Term::var("G"), Term::var("T")]),
            ],
        );
        assert_eq!(c.variables(), vec!["F", "T", "E", "G"]);
    }

    #[test]
    fn skolemize_is_deterministic() {
        let c = clause(
            ("p", vec![Term::var("X")]),
            vec![Literal::positive("q", vec![Term::var("X"), Term::var("Y")])],
        );
        let (ground, mapping) = c.skolemize();
        assert_eq!(ground.to_string(), "p(skolem0) :- q(skolem0,skolem1).");
        assert_eq!(
            mapping,
            vec![
                ("X".to_string(), "skolem0".to_string()),
                ("Y".to_string(), "skolem1".to_string())
            ]
        );
    }

    #[test]
    fn skolemize_round_trip() {
        let c = clause(
            ("p", vec![Term::var("X")]),
            vec![Literal::positive("q", vec![Term::var("X"), Term::var("Y")])],
        );
        let (ground, mapping) = c.skolemize();
        // Substitute the inverse mapping back; modulo renaming we recover the
        // original clause shape.
        let inverse: HashMap<String, Term> = mapping
            .into_iter()
            .map(|(var, constant)| (constant, Term::var(var)))
            .collect();
        let mut back = ground.clone();
        back.head = ground.head.as_ref().map(|h| {
            let mut lit = h.clone();
            lit.args = lit
                .args
                .iter()
                .map(|a| substitute_constants(a, &inverse))
                .collect();
            lit
        });
        back.body = ground
            .body
            .iter()
            .map(|l| {
                let mut lit = l.clone();
                lit.args = lit
                    .args
                    .iter()
                    .map(|a| substitute_constants(a, &inverse))
                    .collect();
                lit
            })
            .collect();
        assert_eq!(back.to_string(), c.to_string());
    }

    fn substitute_constants(term: &Term, mapping: &HashMap<String, Term>) -> Term {
        match term {
            Term::Constant(value) => mapping.get(value).cloned().unwrap_or_else(|| term.clone()),
            Term::Compound { functor, args } => Term::Compound {
                functor: functor.clone(),
                args: args.iter().map(|a| substitute_constants(a, mapping)).collect(),
            },
            Term::Variable { .. } => term.clone(),
        }
    }

    #[test]
    fn precision_recall_fscore() {
        let mut c = clause(("p", vec![]), vec![]);
        c.tps = 80;
        c.fps = 20;
        c.fns = 10;
        assert!((c.precision() - 0.8).abs() < 1e-9);
        assert!((c.recall() - 80.0 / 90.0).abs() < 1e-9);
        assert!((c.fscore() - 0.8421).abs() < 1e-3);
    }

    #[test]
    fn zero_denominators_yield_zero() {
        let c = clause(("p", vec![]), vec![]);
        assert_eq!(c.precision(), 0.0);
        assert_eq!(c.recall(), 0.0);
        assert_eq!(c.fscore(), 0.0);
    }

    #[test]
    fn clear_statistics_resets_everything() {
        let mut c = clause(("p", vec![]), vec![]);
        c.tps = 5;
        c.fps = 3;
        c.fns = 2;
        c.seen = 4;
        c.previous_mean_diff = 0.5;
        c.previous_mean_diff_count = 4;
        c.refinements.push(clause(("p", vec![]), vec![]));
        c.clear_statistics();
        assert_eq!(c.tps, 0);
        assert_eq!(c.fps, 0);
        assert_eq!(c.fns, 0);
        assert_eq!(c.seen, 0);
        assert_eq!(c.previous_mean_diff, 0.0);
        assert_eq!(c.previous_mean_diff_count, 0);
        assert!(c.refinements.is_empty());
    }

    #[test]
    fn weight_clamps_at_floor() {
        let mut c = clause(("p", vec![]), vec![]);
        for _ in 0..100 {
            c.update_weight(0.5, WEIGHT_FLOOR);
        }
        assert!(c.weight >= WEIGHT_FLOOR);
        assert!((c.weight - WEIGHT_FLOOR).abs() < 1e-12);
    }

    #[test]
    fn empty_clause_sentinel() {
        let e = Clause::empty();
        assert!(e.is_empty());
        assert_eq!(e.to_string(), "false.");
    }

    #[test]
    fn render_bodyless_rule() {
        let c = clause(
            ("initiatedAt", vec![Term::constant("f"), Term::var("T")]),
            vec![],
        );
        assert_eq!(c.to_string(), "initiatedAt(f,T).");
    }

    #[test]
    fn structural_equality_ignores_identity() {
        let a = clause(("p", vec![Term::var("X")]), vec![]);
        let b = clause(("p", vec![Term::var("X")]), vec![]);
        assert_ne!(a.id, b.id);
        assert_eq!(a, b);
    }
}
