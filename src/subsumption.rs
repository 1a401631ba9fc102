//! θ-subsumption: the generality order on clauses.
//!
//! A clause `c1` θ-subsumes `c2` iff some substitution θ over the variables
//! of `c1` makes `head(c1)θ` equal to `head(c2)` and every literal of
//! `body(c1)θ` a member of `body(c2)`. Subsumption is the workhorse relation
//! of the learner: support-set compression, refinement deduplication, and
//! merge-on-subsume admission are all phrased in terms of it.
//!
//! The engine grounds the right-hand clause with skolem constants and then
//! searches substitutions by enumerating permutations of the candidate
//! constant pool. When the left clause has more variables than the pool has
//! members, the pool is doubled until it is large enough, which gives the
//! search permutation-with-replacement semantics over the original pool.
//!
//! Worst case is factorial in the variable count, so the engine refuses
//! clauses with more than [`MAX_SUBSUMPTION_VARS`] variables and reports a
//! conservative `false` for them.

use std::collections::{HashMap, HashSet};

use crate::clause::Clause;
use crate::term::Term;

/// Variable cap above which `subsumes` returns a conservative `false`.
///
/// The event-recognition workload stays well under this; raising it makes
/// the permutation search factorially slower.
pub const MAX_SUBSUMPTION_VARS: usize = 8;

/// Test whether `general` θ-subsumes `specific`.
pub fn subsumes(general: &Clause, specific: &Clause) -> bool {
    // Fast reject on the head predicate.
    match (&general.head, &specific.head) {
        (Some(gh), Some(sh)) => {
            if gh.predicate != sh.predicate || gh.arity() != sh.arity() {
                return false;
            }
        }
        (None, None) => {}
        _ => return false,
    }

    let (ground_specific, skolem_map) = specific.skolemize();
    let target = LiteralIndex::of(&ground_specific);

    let vars = general.variables();
    if vars.is_empty() {
        return target.includes(general);
    }
    if vars.len() > MAX_SUBSUMPTION_VARS {
        return false;
    }

    // Candidate ground targets: the skolem image plus the constants already
    // present in the right-hand clause.
    let mut pool: Vec<String> = skolem_map.into_iter().map(|(_, c)| c).collect();
    pool.extend(specific.constants());
    if pool.is_empty() {
        return false;
    }
    // Double the pool until permutations can cover every variable, giving
    // with-replacement semantics over the original members.
    while pool.len() < vars.len() {
        pool.extend_from_within(..);
    }

    let mut used = vec![false; pool.len()];
    let mut assignment: Vec<usize> = Vec::with_capacity(vars.len());
    search(general, &vars, &pool, &mut used, &mut assignment, &target)
}

/// `true` iff each clause θ-subsumes the other (logical equivalence).
pub fn mutually_subsume(a: &Clause, b: &Clause) -> bool {
    subsumes(a, b) && subsumes(b, a)
}

/// Depth-first enumeration of pool permutations, testing inclusion at the
/// leaves and stopping at the first witness substitution.
fn search(
    general: &Clause,
    vars: &[String],
    pool: &[String],
    used: &mut [bool],
    assignment: &mut Vec<usize>,
    target: &LiteralIndex,
) -> bool {
    if assignment.len() == vars.len() {
        let mapping: HashMap<String, Term> = vars
            .iter()
            .zip(assignment.iter())
            .map(|(v, &i)| (v.clone(), Term::Constant(pool[i].clone())))
            .collect();
        let head_matches = match (&general.head, &target.head) {
            (Some(head), Some(t)) => head.substitute(&mapping).to_string() == *t,
            (None, None) => true,
            _ => false,
        };
        return head_matches
            && general
                .body
                .iter()
                .all(|lit| target.body.contains(&lit.substitute(&mapping).to_string()));
    }

    for i in 0..pool.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        assignment.push(i);
        if search(general, vars, pool, used, assignment, target) {
            return true;
        }
        assignment.pop();
        used[i] = false;
    }
    false
}

/// Rendered-literal view of a ground clause, for O(1) membership tests.
struct LiteralIndex {
    head: Option<String>,
    body: HashSet<String>,
}

impl LiteralIndex {
    fn of(clause: &Clause) -> Self {
        Self {
            head: clause.head.as_ref().map(|h| h.to_string()),
            body: clause.body.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// Does a (ground) candidate clause map into this one — equal head and
    /// body literals all present?
    fn includes(&self, candidate: &Clause) -> bool {
        if candidate.head.as_ref().map(|h| h.to_string()) != self.head {
            return false;
        }
        candidate
            .body
            .iter()
            .all(|lit| self.body.contains(&lit.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Literal;
    use crate::term::Term;

    fn lit(pred: &str, args: Vec<Term>) -> Literal {
        Literal::positive(pred, args)
    }

    fn var(name: &str) -> Term {
        Term::var(name)
    }

    fn con(value: &str) -> Term {
        Term::constant(value)
    }

    #[test]
    fn positive_subsumption() {
        // p(X) :- q(X,Y).  subsumes  p(a) :- q(a,b), r(a).
        let general = Clause::new(
            lit("p", vec![var("X")]),
            vec![lit("q", vec![var("X"), var("Y")])],
        );
        let specific = Clause::new(
            lit("p", vec![con("a")]),
            vec![
                lit("q", vec![con("a"), con("b")]),
                lit("r", vec![con("a")]),
            ],
        );
        assert!(subsumes(&general, &specific));
        assert!(!subsumes(&specific, &general));
    }

    #[test]
    fn head_predicate_mismatch_rejects() {
        let c1 = Clause::new(lit("p", vec![var("X")]), vec![lit("q", vec![var("X")])]);
        let c2 = Clause::new(lit("r", vec![con("a")]), vec![lit("q", vec![con("a")])]);
        assert!(!subsumes(&c1, &c2));
    }

    #[test]
    fn subsumption_is_reflexive() {
        let c = Clause::new(
            lit("initiatedAt", vec![con("f"), var("T")]),
            vec![
                lit("happensAt", vec![con("e"), var("T")]),
                Literal::negative("holdsAt", vec![con("g"), var("T")]),
            ],
        );
        assert!(subsumes(&c, &c));
    }

    #[test]
    fn negation_flags_must_agree() {
        let c1 = Clause::new(
            lit("p", vec![var("X")]),
            vec![Literal::negative("q", vec![var("X")])],
        );
        let c2 = Clause::new(lit("p", vec![con("a")]), vec![lit("q", vec![con("a")])]);
        assert!(!subsumes(&c1, &c2));
    }

    #[test]
    fn variable_sharing_constrains_matches() {
        // p(X) :- q(X,X). must not subsume p(a) :- q(a,b).
        let c1 = Clause::new(
            lit("p", vec![var("X")]),
            vec![lit("q", vec![var("X"), var("X")])],
        );
        let c2 = Clause::new(
            lit("p", vec![con("a")]),
            vec![lit("q", vec![con("a"), con("b")])],
        );
        assert!(!subsumes(&c1, &c2));

        let c3 = Clause::new(
            lit("p", vec![con("a")]),
            vec![lit("q", vec![con("a"), con("a")])],
        );
        assert!(subsumes(&c1, &c3));
    }

    #[test]
    fn more_variables_than_pool_members() {
        // Two variables, a single skolem target: the doubled pool still lets
        // both variables land on the same constant.
        let c1 = Clause::new(
            lit("p", vec![var("X")]),
            vec![lit("q", vec![var("X"), var("Y")])],
        );
        let c2 = Clause::new(lit("p", vec![var("Z")]), vec![lit("q", vec![var("Z"), var("Z")])]);
        assert!(subsumes(&c1, &c2));
    }

    #[test]
    fn over_cap_returns_conservative_false() {
        let vars: Vec<Term> = (0..=MAX_SUBSUMPTION_VARS).map(|i| var(&format!("V{i}"))).collect();
        let c1 = Clause::new(lit("p", vars.clone()), vec![lit("q", vars)]);
        assert!(!subsumes(&c1, &c1));
    }

    #[test]
    fn empty_clause_subsumes_itself_only() {
        let e1 = Clause::empty();
        let e2 = Clause::empty();
        let c = Clause::new(lit("p", vec![con("a")]), vec![]);
        assert!(subsumes(&e1, &e2));
        assert!(!subsumes(&e1, &c));
        assert!(!subsumes(&c, &e1));
    }

    #[test]
    fn mutual_subsumption_detects_variants() {
        let a = Clause::new(
            lit("p", vec![var("X")]),
            vec![lit("q", vec![var("X")])],
        );
        let b = Clause::new(
            lit("p", vec![var("Y")]),
            vec![lit("q", vec![var("Y")])],
        );
        assert!(mutually_subsume(&a, &b));
    }

    #[test]
    fn compound_arguments_subsume() {
        // initiatedAt(meeting(P,Q),T) :- happensAt(greet(P),T).
        let general = Clause::new(
            lit(
                "initiatedAt",
                vec![Term::compound("meeting", vec![var("P"), var("Q")]), var("T")],
            ),
            vec![lit(
                "happensAt",
                vec![Term::compound("greet", vec![var("P")]), var("T")],
            )],
        );
        let specific = Clause::new(
            lit(
                "initiatedAt",
                vec![
                    Term::compound("meeting", vec![con("p1"), con("p2")]),
                    con("10"),
                ],
            ),
            vec![lit(
                "happensAt",
                vec![Term::compound("greet", vec![con("p1")]), con("10")],
            )],
        );
        assert!(subsumes(&general, &specific));
    }
}
