//! Mode declarations: templates constraining rule heads and bodies.
//!
//! A mode declaration is a template literal where each argument position is
//! tagged as *input* (`+`), *output* (`-`), *constant-placeholder* (`#`), or
//! don't-care. Modes serve three purposes:
//!
//! 1. Constrain which literals the refinement generator may add to a body.
//! 2. Drive the variabilization of ground atoms into bottom rules.
//! 3. Derive type-guard literals (e.g. `person(P)`) for typed variables.
//!
//! A mode atom may additionally be flagged as a *comparison predicate*
//! (numeric inequalities and the like), which the refinement generator uses
//! for redundancy detection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::literal::Literal;
use crate::term::Term;

// ---------------------------------------------------------------------------
// Argument markers
// ---------------------------------------------------------------------------

/// The role of an argument position in a mode declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgMarker {
    /// `+`: the position must be filled by an already-bound variable.
    Input,
    /// `-`: the position introduces a fresh variable.
    Output,
    /// `#`: the position keeps the ground constant as-is.
    Placeholder,
    /// No marker: the position is unconstrained.
    Ignore,
}

impl std::fmt::Display for ArgMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgMarker::Input => write!(f, "+"),
            ArgMarker::Output => write!(f, "-"),
            ArgMarker::Placeholder => write!(f, "#"),
            ArgMarker::Ignore => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Mode terms and atoms
// ---------------------------------------------------------------------------

/// One argument position of a mode atom: either a marked sort slot or a
/// nested compound template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeTerm {
    /// A marked slot, e.g. `+person` or `#fluent`.
    Slot { marker: ArgMarker, sort: String },
    /// A nested function template, e.g. `meeting(+person,+person)`.
    Compound { functor: String, args: Vec<ModeTerm> },
}

impl std::fmt::Display for ModeTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeTerm::Slot { marker, sort } => write!(f, "{marker}{sort}"),
            ModeTerm::Compound { functor, args } => {
                write!(f, "{functor}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A mode atom: a template for literals of one predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModeAtom {
    pub predicate: String,
    pub args: Vec<ModeTerm>,
    /// Marks comparison predicates (e.g. numeric inequalities) for the
    /// refinement generator's redundancy check.
    pub comparison: bool,
}

impl ModeAtom {
    /// Create a mode atom with the comparison flag unset.
    pub fn new(predicate: impl Into<String>, args: Vec<ModeTerm>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
            comparison: false,
        }
    }

    /// Flag this mode atom as a comparison predicate.
    pub fn as_comparison(mut self) -> Self {
        self.comparison = true;
        self
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Check whether a literal is consistent with this mode: same predicate,
    /// same arity, and each compound template matched recursively. Slots
    /// accept any term.
    pub fn matches(&self, literal: &Literal) -> bool {
        literal.predicate == self.predicate
            && literal.args.len() == self.args.len()
            && self
                .args
                .iter()
                .zip(literal.args.iter())
                .all(|(m, t)| mode_term_matches(m, t))
    }

    /// Variabilize a ground literal through this mode template.
    ///
    /// Constants at `+`/`-` slots are replaced by sorted variables, with the
    /// same constant+sort pair always mapped to the same variable within one
    /// `bindings` map (so co-occurring constants become shared variables
    /// across literals of a bottom rule). `#` slots keep their constant;
    /// unmarked slots keep the term unchanged. Returns `None` when the
    /// literal does not fit the template.
    pub fn variabilize(
        &self,
        literal: &Literal,
        bindings: &mut HashMap<String, String>,
        fresh: &mut usize,
    ) -> Option<Literal> {
        if literal.predicate != self.predicate || literal.args.len() != self.args.len() {
            return None;
        }
        let mut args = Vec::with_capacity(literal.args.len());
        for (mode_term, term) in self.args.iter().zip(literal.args.iter()) {
            args.push(variabilize_term(mode_term, term, bindings, fresh)?);
        }
        let mut out = Literal {
            predicate: literal.predicate.clone(),
            args,
            negated: literal.negated,
            mode: Some(self.clone()),
            type_guards: Vec::new(),
        };
        out.type_guards = self.type_guards(&out);
        Some(out)
    }

    /// Whether every constant sitting at an input (`+`) slot of `literal`
    /// already has a variable in `bindings`. Bottom-rule construction uses
    /// this to keep only body literals connected to the head.
    pub fn inputs_bound(&self, literal: &Literal, bindings: &HashMap<String, String>) -> bool {
        if literal.predicate != self.predicate || literal.args.len() != self.args.len() {
            return false;
        }
        self.args
            .iter()
            .zip(literal.args.iter())
            .all(|(m, t)| inputs_bound_term(m, t, bindings))
    }

    /// Derive type-guard literals for every sorted variable of a literal
    /// shaped by this mode, e.g. `person(P0)` for a `+person` slot bound to
    /// the variable `P0`.
    pub fn type_guards(&self, literal: &Literal) -> Vec<Literal> {
        let mut guards = Vec::new();
        for (mode_term, term) in self.args.iter().zip(literal.args.iter()) {
            collect_guards(mode_term, term, &mut guards);
        }
        guards
    }
}

impl std::fmt::Display for ModeAtom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.args.is_empty() {
            return write!(f, "{}", self.predicate);
        }
        write!(f, "{}(", self.predicate)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

fn mode_term_matches(mode: &ModeTerm, term: &Term) -> bool {
    match (mode, term) {
        (ModeTerm::Slot { .. }, _) => true,
        (
            ModeTerm::Compound { functor, args },
            Term::Compound {
                functor: t_functor,
                args: t_args,
            },
        ) => {
            functor == t_functor
                && args.len() == t_args.len()
                && args
                    .iter()
                    .zip(t_args.iter())
                    .all(|(m, t)| mode_term_matches(m, t))
        }
        (ModeTerm::Compound { .. }, _) => false,
    }
}

fn variabilize_term(
    mode: &ModeTerm,
    term: &Term,
    bindings: &mut HashMap<String, String>,
    fresh: &mut usize,
) -> Option<Term> {
    match (mode, term) {
        (
            ModeTerm::Slot {
                marker: marker @ (ArgMarker::Input | ArgMarker::Output),
                sort,
            },
            Term::Constant(value),
        ) => {
            let key = format!("{value}:{sort}");
            let name = bindings.entry(key).or_insert_with(|| {
                let name = format!("X{fresh}");
                *fresh += 1;
                name
            });
            Some(Term::typed_var(name.clone(), *marker, sort.clone()))
        }
        // Already-variable arguments pass through, as do placeholder and
        // unmarked slots.
        (ModeTerm::Slot { .. }, _) => Some(term.clone()),
        (
            ModeTerm::Compound { functor, args },
            Term::Compound {
                functor: t_functor,
                args: t_args,
            },
        ) => {
            if functor != t_functor || args.len() != t_args.len() {
                return None;
            }
            let mut out = Vec::with_capacity(t_args.len());
            for (m, t) in args.iter().zip(t_args.iter()) {
                out.push(variabilize_term(m, t, bindings, fresh)?);
            }
            Some(Term::Compound {
                functor: functor.clone(),
                args: out,
            })
        }
        (ModeTerm::Compound { .. }, _) => None,
    }
}

fn inputs_bound_term(mode: &ModeTerm, term: &Term, bindings: &HashMap<String, String>) -> bool {
    match (mode, term) {
        (
            ModeTerm::Slot {
                marker: ArgMarker::Input,
                sort,
            },
            Term::Constant(value),
        ) => bindings.contains_key(&format!("{value}:{sort}")),
        (ModeTerm::Slot { .. }, _) => true,
        (
            ModeTerm::Compound { functor, args },
            Term::Compound {
                functor: t_functor,
                args: t_args,
            },
        ) => {
            functor == t_functor
                && args.len() == t_args.len()
                && args
                    .iter()
                    .zip(t_args.iter())
                    .all(|(m, t)| inputs_bound_term(m, t, bindings))
        }
        (ModeTerm::Compound { .. }, _) => false,
    }
}

fn collect_guards(mode: &ModeTerm, term: &Term, guards: &mut Vec<Literal>) {
    match (mode, term) {
        (ModeTerm::Slot { sort, .. }, Term::Variable { name, .. }) => {
            let guard = Literal::positive(sort.clone(), vec![Term::var(name.clone())]);
            if !guards.contains(&guard) {
                guards.push(guard);
            }
        }
        (ModeTerm::Compound { args, .. }, Term::Compound { args: t_args, .. }) => {
            for (m, t) in args.iter().zip(t_args.iter()) {
                collect_guards(m, t, guards);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// A parsed mode declaration line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeDeclaration {
    /// `modeh(...)`: a head template.
    Head(ModeAtom),
    /// `modeb(...)`: a body template.
    Body(ModeAtom),
    /// `comparison(...)`: a body template flagged as a comparison predicate.
    Comparison(ModeAtom),
}

impl ModeDeclaration {
    /// The wrapped mode atom.
    pub fn atom(&self) -> &ModeAtom {
        match self {
            ModeDeclaration::Head(m) | ModeDeclaration::Body(m) | ModeDeclaration::Comparison(m) => m,
        }
    }
}
