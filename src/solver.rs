//! Crisp-logic inference: the oracle seam and the built-in forward grounder.
//!
//! The online loop treats inference as a black-box oracle: given the active
//! rules and an example's ground facts it returns the inferred state — a map
//! from ground target atoms to truth — plus the residual inertia atoms to
//! carry into the next window. [`InferenceOracle`] is that seam; swapping in
//! an external ASP backend means implementing the one method.
//!
//! [`ForwardGrounder`] is the shipped implementation: it enumerates
//! substitutions of each rule body against the fact base (positive literals
//! by binding extension, negation-as-failure checked against the closed fact
//! set) and asserts the grounded heads. Inertia follows the event-calculus
//! law: a fluent holds at the next time point if it was initiated now, or if
//! it held now and was not terminated.

use std::collections::{HashMap, HashSet};

use crate::clause::Clause;
use crate::error::{SolverError, SolverResult};
use crate::literal::Literal;
use crate::term::Term;
use crate::theory::{INITIATED_AT, TERMINATED_AT};

/// Ground target atoms mapped to their inferred truth value.
pub type InferredState = HashMap<String, bool>;

/// Cap on substitution-search steps per rule. Grounding that exceeds it
/// fails the whole inference call, and the online loop skips the example.
pub const MAX_BINDINGS: usize = 100_000;

/// Result of one crisp-inference call.
#[derive(Debug, Clone, Default)]
pub struct InferenceOutcome {
    pub state: InferredState,
    /// `holdsAt` atoms to carry into the next window.
    pub inertia: Vec<Literal>,
}

/// The external-solver seam: a pure function from rules and facts to the
/// inferred state.
pub trait InferenceOracle {
    fn crisp_inference(
        &self,
        rules: &[&Clause],
        facts: &[Literal],
    ) -> SolverResult<InferenceOutcome>;
}

// ---------------------------------------------------------------------------
// Fact base
// ---------------------------------------------------------------------------

/// Ground facts indexed by predicate and arity, with a rendered-atom set for
/// negation-as-failure checks.
pub struct FactBase {
    by_predicate: HashMap<(String, usize), Vec<Literal>>,
    rendered: HashSet<String>,
}

impl FactBase {
    pub fn new(facts: &[Literal]) -> Self {
        let mut by_predicate: HashMap<(String, usize), Vec<Literal>> = HashMap::new();
        let mut rendered = HashSet::new();
        for fact in facts {
            by_predicate
                .entry((fact.predicate.clone(), fact.arity()))
                .or_default()
                .push(fact.clone());
            rendered.insert(fact.to_string());
        }
        Self {
            by_predicate,
            rendered,
        }
    }

    fn candidates(&self, predicate: &str, arity: usize) -> &[Literal] {
        self.by_predicate
            .get(&(predicate.to_string(), arity))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Closed-world membership test on a ground atom.
    pub fn holds(&self, literal: &Literal) -> bool {
        self.rendered.contains(&literal.complement().to_string())
    }
}

// ---------------------------------------------------------------------------
// Grounding
// ---------------------------------------------------------------------------

/// Enumerate all groundings of `clause` against the fact base and return the
/// distinct grounded head atoms.
///
/// Positive body literals extend the variable bindings against matching
/// facts; negated literals are checked by negation-as-failure once the
/// positives are fully bound. Groundings that leave the head non-ground are
/// dropped.
pub fn ground_heads(clause: &Clause, facts: &FactBase) -> SolverResult<Vec<Literal>> {
    let Some(head) = &clause.head else {
        return Ok(Vec::new());
    };

    let positives: Vec<&Literal> = clause.body.iter().filter(|l| !l.negated).collect();
    let negatives: Vec<&Literal> = clause.body.iter().filter(|l| l.negated).collect();

    let mut heads: Vec<Literal> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut steps = 0usize;
    let mut bindings: HashMap<String, Term> = HashMap::new();

    solve(
        head,
        &positives,
        &negatives,
        facts,
        0,
        &mut bindings,
        &mut steps,
        &mut |grounded| {
            if seen.insert(grounded.to_string()) {
                heads.push(grounded);
            }
        },
    )?;

    Ok(heads)
}

#[allow(clippy::too_many_arguments)]
fn solve(
    head: &Literal,
    positives: &[&Literal],
    negatives: &[&Literal],
    facts: &FactBase,
    index: usize,
    bindings: &mut HashMap<String, Term>,
    steps: &mut usize,
    emit: &mut impl FnMut(Literal),
) -> SolverResult<()> {
    *steps += 1;
    if *steps > MAX_BINDINGS {
        return Err(SolverError::BindingOverflow { cap: MAX_BINDINGS });
    }

    if index == positives.len() {
        // Negation-as-failure over the closed fact set. A negated literal
        // left non-ground cannot be checked and fails the grounding.
        for negative in negatives {
            let grounded = negative.substitute(bindings);
            if !grounded.is_ground() || facts.holds(&grounded) {
                return Ok(());
            }
        }
        let grounded_head = head.substitute(bindings);
        if grounded_head.is_ground() {
            emit(grounded_head);
        }
        return Ok(());
    }

    let pattern = positives[index];
    for fact in facts.candidates(&pattern.predicate, pattern.arity()) {
        let mut extended = bindings.clone();
        if match_literal(pattern, fact, &mut extended) {
            solve(
                head, positives, negatives, facts, index + 1, &mut extended, steps, emit,
            )?;
        }
    }
    Ok(())
}

/// One-way matching of a pattern literal against a ground fact, extending
/// the bindings map.
fn match_literal(
    pattern: &Literal,
    fact: &Literal,
    bindings: &mut HashMap<String, Term>,
) -> bool {
    pattern.predicate == fact.predicate
        && pattern.args.len() == fact.args.len()
        && pattern
            .args
            .iter()
            .zip(fact.args.iter())
            .all(|(p, f)| match_term(p, f, bindings))
}

fn match_term(pattern: &Term, ground: &Term, bindings: &mut HashMap<String, Term>) -> bool {
    match (pattern, ground) {
        (Term::Variable { name, .. }, _) => match bindings.get(name) {
            Some(bound) => bound == ground,
            None => {
                bindings.insert(name.clone(), ground.clone());
                true
            }
        },
        (Term::Constant(a), Term::Constant(b)) => a == b,
        (
            Term::Compound { functor, args },
            Term::Compound {
                functor: g_functor,
                args: g_args,
            },
        ) => {
            functor == g_functor
                && args.len() == g_args.len()
                && args
                    .iter()
                    .zip(g_args.iter())
                    .all(|(p, g)| match_term(p, g, bindings))
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Forward grounder
// ---------------------------------------------------------------------------

/// The built-in crisp-inference oracle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardGrounder;

impl InferenceOracle for ForwardGrounder {
    fn crisp_inference(
        &self,
        rules: &[&Clause],
        facts: &[Literal],
    ) -> SolverResult<InferenceOutcome> {
        let base = FactBase::new(facts);

        let mut state: InferredState = HashMap::new();
        let mut initiated: Vec<Literal> = Vec::new();
        let mut terminated: HashSet<String> = HashSet::new();

        for rule in rules {
            for head in ground_heads(rule, &base)? {
                match head.predicate.as_str() {
                    TERMINATED_AT => {
                        terminated.insert(head.to_string());
                    }
                    INITIATED_AT => initiated.push(head.clone()),
                    _ => {}
                }
                state.insert(head.to_string(), true);
            }
        }

        // Event-calculus inertia: initiated fluents start holding at the
        // next time point; held fluents persist unless terminated now.
        let mut inertia: Vec<Literal> = Vec::new();
        let mut emitted: HashSet<String> = HashSet::new();
        for atom in &initiated {
            if let Some(holds) = advance(atom) {
                if emitted.insert(holds.to_string()) {
                    inertia.push(holds);
                }
            }
        }
        for fact in facts {
            if fact.predicate != "holdsAt" || fact.negated || fact.arity() != 2 {
                continue;
            }
            let termination = Literal::positive(TERMINATED_AT, fact.args.clone());
            if terminated.contains(&termination.to_string()) {
                continue;
            }
            if let Some(holds) = advance(fact) {
                if emitted.insert(holds.to_string()) {
                    inertia.push(holds);
                }
            }
        }

        Ok(InferenceOutcome { state, inertia })
    }
}

/// Turn a binary target atom over `(fluent, t)` into `holdsAt(fluent, t+1)`.
/// Non-numeric time points carry no inertia.
fn advance(atom: &Literal) -> Option<Literal> {
    if atom.arity() != 2 {
        return None;
    }
    let Term::Constant(time) = &atom.args[1] else {
        return None;
    };
    let next = time.parse::<i64>().ok()? + 1;
    Some(Literal::positive(
        "holdsAt",
        vec![atom.args[0].clone(), Term::Constant(next.to_string())],
    ))
}
