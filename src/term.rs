//! First-order terms: variables, constants, and compounds.
//!
//! Terms are the atomic building blocks of literals and clauses. A term is
//! either a logical *variable* (name starting with an uppercase letter,
//! optionally annotated with an I/O-mode marker and a sort from the mode
//! declaration it was introduced by), a *constant* (symbolic or numeric — the
//! distinction does not matter at this layer), or a *compound* (a function
//! symbol applied to an ordered list of sub-terms).
//!
//! Equality is structural. Substitutions are keyed by variable name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::mode::ArgMarker;

/// A first-order term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// A logical variable, e.g. `X`, `T0`.
    Variable {
        /// Variable name (first character uppercase).
        name: String,
        /// I/O-mode marker from the mode declaration that introduced the
        /// variable, if any.
        marker: Option<ArgMarker>,
        /// Sort tag (e.g. `person`, `time`) from the mode declaration, if any.
        sort: Option<String>,
    },
    /// A constant, e.g. `leaving`, `p1`, `42`.
    Constant(String),
    /// A function symbol applied to sub-terms, e.g. `meeting(p1, p2)`.
    Compound { functor: String, args: Vec<Term> },
}

impl Term {
    /// A plain variable with no marker or sort annotation.
    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable {
            name: name.into(),
            marker: None,
            sort: None,
        }
    }

    /// A variable carrying the mode metadata it was introduced with.
    pub fn typed_var(name: impl Into<String>, marker: ArgMarker, sort: impl Into<String>) -> Self {
        Term::Variable {
            name: name.into(),
            marker: Some(marker),
            sort: Some(sort.into()),
        }
    }

    /// A constant term.
    pub fn constant(value: impl Into<String>) -> Self {
        Term::Constant(value.into())
    }

    /// A compound term.
    pub fn compound(functor: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Compound {
            functor: functor.into(),
            args,
        }
    }

    /// Returns `true` if this term is a variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable { .. })
    }

    /// A term is ground iff it contains no variable sub-term.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable { .. } => false,
            Term::Constant(_) => true,
            Term::Compound { args, .. } => args.iter().all(Term::is_ground),
        }
    }

    /// Collect distinct variable names in left-to-right order.
    pub fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Term::Variable { name, .. } => {
                if !out.iter().any(|v| v == name) {
                    out.push(name.clone());
                }
            }
            Term::Constant(_) => {}
            Term::Compound { args, .. } => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }

    /// Collect constant values (leaves only) in left-to-right order, with
    /// duplicates preserved.
    pub fn collect_constants(&self, out: &mut Vec<String>) {
        match self {
            Term::Variable { .. } => {}
            Term::Constant(value) => out.push(value.clone()),
            Term::Compound { args, .. } => {
                for arg in args {
                    arg.collect_constants(out);
                }
            }
        }
    }

    /// Apply a substitution homomorphically. Variables absent from the
    /// mapping are left in place; constants pass through unchanged.
    pub fn substitute(&self, mapping: &HashMap<String, Term>) -> Term {
        match self {
            Term::Variable { name, .. } => match mapping.get(name) {
                Some(replacement) => replacement.clone(),
                None => self.clone(),
            },
            Term::Constant(_) => self.clone(),
            Term::Compound { functor, args } => Term::Compound {
                functor: functor.clone(),
                args: args.iter().map(|a| a.substitute(mapping)).collect(),
            },
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Variable { name, .. } => write!(f, "{name}"),
            Term::Constant(value) => write!(f, "{value}"),
            Term::Compound { functor, args } => {
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
