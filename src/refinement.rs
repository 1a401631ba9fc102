//! Refinement generation: candidate specializations of a rule.
//!
//! A rule's refinements are built from the literals its support set offers:
//! every subset of up to `depth` unused support literals, appended to the
//! body, yields a candidate. Candidates made solely of one comparison
//! predicate are redundant and dropped, as are candidates that are logical
//! variants of each other or of an already-seen clause.

use crate::clause::Clause;
use crate::literal::Literal;
use crate::mode::ModeAtom;
use crate::subsumption::{mutually_subsume, subsumes};
use crate::support::{compress_theory, SupportSet};

/// Rebuild `clause.refinements` from its support set.
///
/// `depth` is the maximum number of literals a single refinement may add
/// (the specialization depth); `comparison` lists the mode atoms flagged as
/// comparison predicates; `seen` holds clauses whose logical variants must
/// not be generated again.
pub fn generate_refinements(
    clause: &mut Clause,
    depth: usize,
    comparison: &[ModeAtom],
    seen: &[Clause],
) {
    let candidate_literals: Vec<Literal> = clause
        .support
        .distinct_body_literals()
        .into_iter()
        .filter(|lit| !clause.body.contains(lit))
        .collect();

    // A headless clause (the empty-clause sentinel) cannot be specialized.
    let Some(head) = clause.head.clone() else {
        clause.refinements.clear();
        return;
    };

    let mut candidates: Vec<Clause> = Vec::new();
    for k in 1..=depth.max(1) {
        if k > candidate_literals.len() {
            break;
        }
        let mut subset: Vec<usize> = Vec::with_capacity(k);
        k_subsets(&candidate_literals, k, 0, &mut subset, &mut |chosen| {
            if comparison_redundant(&clause.body, chosen, comparison) {
                return;
            }
            let mut body = clause.body.clone();
            body.extend(chosen.iter().map(|l| (*l).clone()));
            candidates.push(Clause::new(head.clone(), body));
        });
    }

    // Collapse logical variants among the candidates, then against the
    // already-seen set.
    let candidates = compress_theory(candidates);
    let mut refinements: Vec<Clause> = Vec::with_capacity(candidates.len());
    for mut candidate in candidates {
        if seen.iter().any(|s| mutually_subsume(s, &candidate)) {
            continue;
        }
        candidate.parent = Some(clause.id);
        candidate.weight = clause.weight;
        candidate.is_top_rule = false;
        candidate.is_new = false;
        candidate.support = SupportSet::from_rules(
            clause
                .support
                .iter()
                .filter(|s| subsumes(&candidate, s))
                .cloned()
                .collect(),
        );
        refinements.push(candidate);
    }

    clause.refinements = refinements;
}

/// A candidate is redundant when the whole resulting body consists of
/// literals carrying the same comparison-predicate mode. A single-literal
/// body is never redundant.
fn comparison_redundant(body: &[Literal], chosen: &[&Literal], comparison: &[ModeAtom]) -> bool {
    let total = body.len() + chosen.len();
    if total < 2 {
        return false;
    }
    let mut literals = body.iter().chain(chosen.iter().copied());
    let first_mode = match literals.next().and_then(|l| l.mode.as_ref()) {
        Some(mode) => mode,
        None => return false,
    };
    let is_comparison =
        first_mode.comparison || comparison.iter().any(|c| c == first_mode);
    if !is_comparison {
        return false;
    }
    literals.all(|l| l.mode.as_ref() == Some(first_mode))
}

/// Enumerate `k`-subsets of `items` in index order, invoking `visit` with
/// each subset.
fn k_subsets<'a, F: FnMut(&[&'a Literal])>(
    items: &'a [Literal],
    k: usize,
    start: usize,
    chosen: &mut Vec<usize>,
    visit: &mut F,
) {
    if chosen.len() == k {
        let subset: Vec<&Literal> = chosen.iter().map(|&i| &items[i]).collect();
        visit(&subset);
        return;
    }
    for i in start..items.len() {
        chosen.push(i);
        k_subsets(items, k, i + 1, chosen, visit);
        chosen.pop();
    }
}
