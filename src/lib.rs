//! # vigil
//!
//! An online inductive logic programming learner for event recognition.
//! vigil consumes a stream of labeled examples — ground facts describing a
//! time window plus the query atoms a correct theory must entail — and
//! incrementally induces weighted event-calculus rules headed by
//! `initiatedAt` (event onset) and `terminatedAt` (event end).
//!
//! ## Architecture
//!
//! - **Clause model** (`term`, `mode`, `literal`, `clause`): first-order
//!   terms, mode-declaration language bias, and rules with streaming
//!   statistics
//! - **θ-subsumption** (`subsumption`): the generality order driving
//!   compression and deduplication
//! - **Refinement** (`refinement`): candidate specializations drawn from
//!   support-set literals
//! - **Scoring** (`scoring`): precision/F-score/FOIL-gain plus the Hoeffding
//!   specialization test
//! - **Online loop** (`learner`): per-example inference, scoring, abduction
//!   and rule expansion
//! - **Oracle seam** (`solver`): crisp inference behind a trait, with a
//!   built-in forward grounder
//!
//! ## Library usage
//!
//! ```no_run
//! use vigil::config::LearnerConfig;
//! use vigil::example::read_examples;
//! use vigil::learner::Learner;
//! use vigil::parser::parse_mode_file;
//! use vigil::solver::ForwardGrounder;
//!
//! let modes = parse_mode_file("modeh(initiatedAt(#fluent,+time))").unwrap();
//! let examples = read_examples("train.jsonl").unwrap();
//! let mut learner = Learner::new(LearnerConfig::default(), &modes, ForwardGrounder).unwrap();
//! learner.run(examples.clone()).unwrap();
//! learner.rescore(&examples).unwrap();
//! println!("{}", learner.theory().render());
//! ```

pub mod clause;
pub mod config;
pub mod error;
pub mod example;
pub mod learner;
pub mod literal;
pub mod mode;
pub mod parser;
pub mod refinement;
pub mod scoring;
pub mod solver;
pub mod subsumption;
pub mod support;
pub mod term;
pub mod theory;
