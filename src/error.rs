//! Rich diagnostic error types for the vigil learner.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the vigil learner.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum VigilError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Clause(#[from] ClauseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Theory(#[from] TheoryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Example(#[from] ExampleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Result type used across the crate.
pub type VigilResult<T> = std::result::Result<T, VigilError>;

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Errors produced while reading rule and mode-declaration text.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("unexpected token `{found}` at offset {offset}, expected {expected}")]
    #[diagnostic(
        code(vigil::parse::unexpected_token),
        help("Rule syntax is `weight :: head :- lit1, ..., litN.` with Prolog-like terms.")
    )]
    UnexpectedToken {
        found: String,
        offset: usize,
        expected: String,
    },

    #[error("unexpected end of input, expected {expected}")]
    #[diagnostic(
        code(vigil::parse::unexpected_end),
        help("The input ended mid-clause. Check for a missing `)` or trailing literal.")
    )]
    UnexpectedEnd { expected: String },

    #[error("invalid weight token `{token}`")]
    #[diagnostic(
        code(vigil::parse::invalid_weight),
        help("A leading weight must be a real number, e.g. `0.75 :: head :- body.`")
    )]
    InvalidWeight { token: String },

    #[error("empty input, expected a clause")]
    #[diagnostic(code(vigil::parse::empty))]
    Empty,

    #[error("unknown mode declaration `{name}`")]
    #[diagnostic(
        code(vigil::parse::unknown_mode),
        help("Mode declarations are `modeh(...)`, `modeb(...)` or `comparison(...)`.")
    )]
    UnknownModeDeclaration { name: String },
}

/// Result type for parser operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

// ---------------------------------------------------------------------------
// Clause errors
// ---------------------------------------------------------------------------

/// Errors specific to clause and support-set operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ClauseError {
    #[error("support rule index {index} out of range [1, {len}]")]
    #[diagnostic(
        code(vigil::clause::support_rule_not_found),
        help("Support-set lookups are 1-based; the set currently holds {len} rules.")
    )]
    SupportRuleNotFound { index: usize, len: usize },

    #[error("literal index {literal} out of range [1, {len}] in support rule {rule}")]
    #[diagnostic(
        code(vigil::clause::support_literal_not_found),
        help("Body-literal lookups are 1-based; the rule body holds {len} literals.")
    )]
    SupportLiteralNotFound {
        rule: usize,
        literal: usize,
        len: usize,
    },

    #[error("clause weight {weight} fell below the floor {floor}")]
    #[diagnostic(
        code(vigil::clause::weight_below_floor),
        help("Weight updates must clamp at the configured floor. This is a learner bug.")
    )]
    WeightBelowFloor { weight: f64, floor: f64 },

    #[error("refinement of rule {parent} does not extend its parent's body")]
    #[diagnostic(
        code(vigil::clause::refinement_not_superset),
        help("Every refinement must keep the parent head and strictly extend the parent body.")
    )]
    RefinementNotSuperset { parent: u64 },
}

/// Result type for clause operations.
pub type ClauseResult<T> = std::result::Result<T, ClauseError>;

// ---------------------------------------------------------------------------
// Theory errors
// ---------------------------------------------------------------------------

/// Errors specific to theory management.
#[derive(Debug, Error, Diagnostic)]
pub enum TheoryError {
    #[error("cannot place rule with head predicate `{predicate}` in the theory")]
    #[diagnostic(
        code(vigil::theory::unsupported_head),
        help("Top rules must be headed by `initiatedAt` or `terminatedAt`.")
    )]
    UnsupportedHead { predicate: String },

    #[error("cannot place a headless clause in the theory")]
    #[diagnostic(code(vigil::theory::headless))]
    Headless,
}

/// Result type for theory operations.
pub type TheoryResult<T> = std::result::Result<T, TheoryError>;

// ---------------------------------------------------------------------------
// Example-stream errors
// ---------------------------------------------------------------------------

/// Errors produced by the example source.
#[derive(Debug, Error, Diagnostic)]
pub enum ExampleError {
    #[error("failed to read example stream")]
    #[diagnostic(
        code(vigil::example::io),
        help("Check that the example file exists and is readable.")
    )]
    Io(#[from] std::io::Error),

    #[error("malformed example record on line {line}: {message}")]
    #[diagnostic(
        code(vigil::example::malformed),
        help("Each line must be a JSON object: {{\"id\": .., \"facts\": [..], \"annotation\": [..]}}.")
    )]
    Malformed { line: usize, message: String },

    #[error("unparsable atom `{atom}` on line {line}")]
    #[diagnostic(
        code(vigil::example::bad_atom),
        help("Facts and annotation atoms must be ground Prolog-like literals.")
    )]
    BadAtom {
        line: usize,
        atom: String,
        #[source]
        source: ParseError,
    },
}

/// Result type for example-source operations.
pub type ExampleResult<T> = std::result::Result<T, ExampleError>;

// ---------------------------------------------------------------------------
// Solver errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the crisp-inference oracle.
///
/// A solver failure never mutates the theory: the online loop logs a warning
/// and skips the example, leaving all counters untouched.
#[derive(Debug, Error, Diagnostic)]
pub enum SolverError {
    #[error("grounding exceeded the binding cap of {cap} substitutions")]
    #[diagnostic(
        code(vigil::solver::binding_overflow),
        help(
            "The rule body matched too many substitutions against this example. \
             The example is skipped; consider tighter mode declarations."
        )
    )]
    BindingOverflow { cap: usize },

    #[error("external solver failed: {message}")]
    #[diagnostic(code(vigil::solver::backend))]
    Backend { message: String },
}

/// Result type for solver operations.
pub type SolverResult<T> = std::result::Result<T, SolverError>;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating the run configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read configuration file")]
    #[diagnostic(code(vigil::config::io))]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {message}")]
    #[diagnostic(code(vigil::config::malformed))]
    Malformed { message: String },

    #[error("hoeffding delta {value} outside (0, 1)")]
    #[diagnostic(
        code(vigil::config::bad_delta),
        help("The Hoeffding confidence parameter must be strictly between 0 and 1.")
    )]
    BadDelta { value: f64 },

    #[error("prune threshold {value} outside [0, 1]")]
    #[diagnostic(code(vigil::config::bad_prune_threshold))]
    BadPruneThreshold { value: f64 },

    #[error("specialization depth must be at least 1")]
    #[diagnostic(code(vigil::config::bad_depth))]
    BadDepth,

    #[error("weight floor {value} must be positive")]
    #[diagnostic(code(vigil::config::bad_weight_floor))]
    BadWeightFloor { value: f64 },

    #[error("unparsable comparison predicate `{atom}`")]
    #[diagnostic(
        code(vigil::config::bad_comparison),
        help("Comparison predicates are mode atoms, e.g. `lessThan(+time,+time)`.")
    )]
    BadComparison {
        atom: String,
        #[source]
        source: ParseError,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
