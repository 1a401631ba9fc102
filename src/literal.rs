//! Literals: predicates applied to terms, with negation-as-failure.
//!
//! A literal carries its predicate symbol, ordered term arguments, a
//! negation-as-failure flag, an optional link to the mode declaration it was
//! generated from, and the type-guard literals derived for its sorted
//! variables. Equality and hashing consider only the logical content
//! (predicate, arguments, NAF flag) — mode metadata is bookkeeping, not
//! meaning.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::mode::ModeAtom;
use crate::term::Term;

/// A (possibly negated) predicate applied to terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Literal {
    pub predicate: String,
    pub args: Vec<Term>,
    /// Negation-as-failure flag; rendered as a `not ` prefix.
    pub negated: bool,
    /// The mode declaration this literal conforms to, if known.
    pub mode: Option<ModeAtom>,
    /// Type-guard literals for sorted variables, e.g. `person(P0)`.
    pub type_guards: Vec<Literal>,
}

impl Literal {
    /// A positive literal with no mode metadata.
    pub fn positive(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
            negated: false,
            mode: None,
            type_guards: Vec::new(),
        }
    }

    /// A negated literal with no mode metadata.
    pub fn negative(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            negated: true,
            ..Self::positive(predicate, args)
        }
    }

    /// Attach the mode declaration this literal was generated from.
    pub fn with_mode(mut self, mode: ModeAtom) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// A literal is ground iff all its arguments are ground.
    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Term::is_ground)
    }

    /// Collect distinct variable names in left-to-right order.
    pub fn collect_variables(&self, out: &mut Vec<String>) {
        for arg in &self.args {
            arg.collect_variables(out);
        }
    }

    /// Collect constant values in left-to-right order.
    pub fn collect_constants(&self, out: &mut Vec<String>) {
        for arg in &self.args {
            arg.collect_constants(out);
        }
    }

    /// Apply a substitution to every argument, preserving the NAF flag and
    /// mode/type metadata.
    pub fn substitute(&self, mapping: &HashMap<String, Term>) -> Literal {
        Literal {
            predicate: self.predicate.clone(),
            args: self.args.iter().map(|a| a.substitute(mapping)).collect(),
            negated: self.negated,
            mode: self.mode.clone(),
            type_guards: self
                .type_guards
                .iter()
                .map(|g| g.substitute(mapping))
                .collect(),
        }
    }

    /// The positive complement: the same atom with the NAF flag cleared.
    pub fn complement(&self) -> Literal {
        Literal {
            negated: false,
            ..self.clone()
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.predicate == other.predicate
            && self.negated == other.negated
            && self.args == other.args
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.predicate.hash(state);
        self.negated.hash(state);
        self.args.hash(state);
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.negated {
            write!(f, "not ")?;
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn holds(fluent: &str, time: &str) -> Literal {
        Literal::positive(
            "holdsAt",
            vec![Term::constant(fluent), Term::constant(time)],
        )
    }

    #[test]
    fn display_with_negation() {
        let lit = Literal::negative("holdsAt", vec![Term::var("F"), Term::var("T")]);
        assert_eq!(lit.to_string(), "not holdsAt(F,T)");
    }

    #[test]
    fn equality_ignores_mode_metadata() {
        let plain = holds("f", "1");
        let with_mode = holds("f", "1").with_mode(ModeAtom::new("holdsAt", vec![]));
        assert_eq!(plain, with_mode);
    }

    #[test]
    fn equality_respects_negation() {
        let pos = holds("f", "1");
        let neg = Literal {
            negated: true,
            ..holds("f", "1")
        };
        assert_ne!(pos, neg);
    }

    #[test]
    fn ground_check() {
        assert!(holds("f", "1").is_ground());
        let open = Literal::positive("holdsAt", vec![Term::var("F"), Term::constant("1")]);
        assert!(!open.is_ground());
    }

    #[test]
    fn substitute_grounds_literal() {
        let lit = Literal::positive("happensAt", vec![Term::var("E"), Term::var("T")]);
        let mut mapping = HashMap::new();
        mapping.insert("E".to_string(), Term::constant("walking"));
        mapping.insert("T".to_string(), Term::constant("3"));
        let out = lit.substitute(&mapping);
        assert!(out.is_ground());
        assert_eq!(out.to_string(), "happensAt(walking,3)");
    }

    #[test]
    fn complement_clears_negation() {
        let neg = Literal::negative("holdsAt", vec![Term::var("F")]);
        assert!(!neg.complement().negated);
        assert_eq!(neg.complement().predicate, "holdsAt");
    }

    #[test]
    fn zero_arity_display() {
        let lit = Literal::positive("empty", vec![]);
        assert_eq!(lit.to_string(), "empty");
    }
}
