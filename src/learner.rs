//! The online learning loop.
//!
//! One learner instance consumes a stream of labeled examples and maintains
//! a theory of weighted `initiatedAt`/`terminatedAt` rules. Per example the
//! loop runs crisp inference with the currently trusted rules, scores every
//! rule (including live refinement candidates) against the annotation,
//! grows new rules by conservative abduction when the example exposed
//! mistakes, and replaces rules with their best refinement once the
//! Hoeffding test says the lead is statistically real.
//!
//! The loop is strictly sequential: all counter updates and expansion
//! decisions for one example complete before the next is drawn, and a solver
//! failure skips the example without touching any state.

use std::collections::{HashMap, HashSet};

use crate::clause::Clause;
use crate::config::{LearnerConfig, RuleLearningStrategy};
use crate::error::{ClauseError, ClauseResult, VigilResult};
use crate::example::Example;
use crate::literal::Literal;
use crate::mode::{ModeAtom, ModeDeclaration};
use crate::refinement::generate_refinements;
use crate::scoring::{hoeffding_bound, specialize_decision};
use crate::solver::{ground_heads, FactBase, InferenceOracle, InferenceOutcome};
use crate::subsumption::subsumes;
use crate::support::SupportSet;
use crate::theory::{Theory, INITIATED_AT};

// ---------------------------------------------------------------------------
// Run statistics
// ---------------------------------------------------------------------------

/// Cumulative confusion counts over a whole run.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalStats {
    pub tps: u64,
    pub fps: u64,
    pub fns: u64,
    pub total_groundings: u64,
    pub examples: u64,
}

impl GlobalStats {
    pub fn precision(&self) -> f64 {
        let denom = self.tps + self.fps;
        if denom == 0 {
            0.0
        } else {
            self.tps as f64 / denom as f64
        }
    }

    pub fn recall(&self) -> f64 {
        let denom = self.tps + self.fns;
        if denom == 0 {
            0.0
        } else {
            self.tps as f64 / denom as f64
        }
    }

    pub fn fscore(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

/// Confusion counts from an evaluation pass.
pub type EvalReport = GlobalStats;

// ---------------------------------------------------------------------------
// Learner
// ---------------------------------------------------------------------------

/// An online rule learner for one event-recognition target schema.
pub struct Learner<O: InferenceOracle> {
    config: LearnerConfig,
    head_modes: Vec<ModeAtom>,
    body_modes: Vec<ModeAtom>,
    comparison_modes: Vec<ModeAtom>,
    oracle: O,
    theory: Theory,
    /// `holdsAt` atoms carried from the previous example. Cleared after
    /// every example unless `with_inertia` is set.
    inertia: Vec<Literal>,
    stats: GlobalStats,
}

impl<O: InferenceOracle> Learner<O> {
    /// Build a learner from a validated configuration and the language bias.
    pub fn new(
        config: LearnerConfig,
        declarations: &[ModeDeclaration],
        oracle: O,
    ) -> VigilResult<Self> {
        config.validate()?;
        let mut head_modes = Vec::new();
        let mut body_modes = Vec::new();
        let mut comparison_modes = config.comparison_modes()?;
        for declaration in declarations {
            match declaration {
                ModeDeclaration::Head(atom) => head_modes.push(atom.clone()),
                ModeDeclaration::Body(atom) => body_modes.push(atom.clone()),
                ModeDeclaration::Comparison(atom) => {
                    body_modes.push(atom.clone());
                    comparison_modes.push(atom.clone());
                }
            }
        }
        Ok(Self {
            config,
            head_modes,
            body_modes,
            comparison_modes,
            oracle,
            theory: Theory::new(),
            inertia: Vec::new(),
            stats: GlobalStats::default(),
        })
    }

    pub fn theory(&self) -> &Theory {
        &self.theory
    }

    pub fn stats(&self) -> &GlobalStats {
        &self.stats
    }

    /// Install an existing theory (e.g. parsed from a rule file) for
    /// evaluation or continued training.
    pub fn install_theory(&mut self, clauses: Vec<Clause>) -> VigilResult<()> {
        for mut clause in clauses {
            clause.is_new = false;
            self.theory.add(clause)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Training
    // -----------------------------------------------------------------------

    /// Consume a whole example stream in order.
    pub fn run(&mut self, examples: impl IntoIterator<Item = Example>) -> VigilResult<()> {
        for example in examples {
            self.process_example(&example)?;
        }
        tracing::info!(
            examples = self.stats.examples,
            rules = self.theory.len(),
            precision = self.stats.precision(),
            "training pass complete"
        );
        Ok(())
    }

    /// Run the per-example protocol: infer, score, grow on mistakes, expand.
    pub fn process_example(&mut self, example: &Example) -> VigilResult<()> {
        let merged = self.merged_facts(example);
        let annotation = example.annotation_strings();

        // 1-2. Crisp inference with the currently trusted rules.
        let active: Vec<&Clause> = self
            .theory
            .clauses()
            .filter(|c| !c.body.is_empty() && c.precision() >= self.config.prune_threshold)
            .collect();
        let outcome = if active.is_empty() {
            InferenceOutcome::default()
        } else {
            match self.oracle.crisp_inference(&active, &merged) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(error = %e, example = example.id, "solver failed, skipping example");
                    return Ok(());
                }
            }
        };

        // 3. Score every rule and refinement. Groundings are computed up
        // front so a solver failure here skips the example before any
        // counter moves.
        let base = FactBase::new(&merged);
        let mut groundings: Vec<(HashSet<String>, Vec<HashSet<String>>)> = Vec::new();
        for clause in self.theory.clauses() {
            let own = match rendered_heads(clause, &base) {
                Ok(own) => own,
                Err(e) => {
                    tracing::warn!(error = %e, example = example.id, "grounding failed, skipping example");
                    return Ok(());
                }
            };
            let mut refined = Vec::with_capacity(clause.refinements.len());
            for refinement in &clause.refinements {
                match rendered_heads(refinement, &base) {
                    Ok(heads) => refined.push(heads),
                    Err(e) => {
                        tracing::warn!(error = %e, example = example.id, "grounding failed, skipping example");
                        return Ok(());
                    }
                }
            }
            groundings.push((own, refined));
        }
        for (clause, (own, refined)) in self.theory.clauses_mut().zip(groundings) {
            apply_score(clause, &own, &example.annotation, &self.config, true)?;
            for (refinement, heads) in clause.refinements.iter_mut().zip(refined) {
                apply_score(refinement, &heads, &example.annotation, &self.config, true)?;
            }
        }

        // Example-level mistakes against the jointly inferred state.
        let inferred: HashSet<String> = outcome
            .state
            .iter()
            .filter(|(_, &v)| v)
            .map(|(atom, _)| atom.clone())
            .collect();
        let example_tps = inferred.intersection(&annotation).count() as u64;
        let example_fps = inferred.difference(&annotation).count() as u64;
        let example_fns = annotation.difference(&inferred).count() as u64;

        // 4-5. Mistake-driven growth: abduce bottom rules for uncovered
        // annotation atoms, admit them (merging on subsumption), and give
        // the newcomers a first score on this same example.
        if example_fps + example_fns > 0 {
            let new_rules = self.abduce(example, &merged, &inferred);
            for rule in new_rules {
                tracing::debug!(rule = %rule, "admitting abduced rule");
                self.theory.merge_or_admit(rule)?;
            }
            for clause in self.theory.clauses_mut() {
                if !clause.is_new {
                    continue;
                }
                clause.is_new = false;
                match rendered_heads(clause, &base) {
                    Ok(own) => apply_score(clause, &own, &example.annotation, &self.config, true)?,
                    Err(e) => {
                        tracing::warn!(error = %e, example = example.id, "could not score new rule")
                    }
                }
            }
        }

        // 6. Rule expansion: regenerate missing refinement lists, then run
        // the Hoeffding test on every eligible top rule.
        self.ensure_refinements();
        let config = self.config.clone();
        expand_partition(&mut self.theory.initiation, &config)?;
        expand_partition(&mut self.theory.termination, &config)?;

        // 7. Global statistics and inertia carry-over.
        self.stats.examples += 1;
        self.stats.tps += example_tps;
        self.stats.fps += example_fps;
        self.stats.fns += example_fns;
        self.stats.total_groundings += inferred.len() as u64;
        self.inertia = outcome.inertia;
        if !self.config.with_inertia {
            self.inertia.clear();
        }
        tracing::info!(
            example = example.id,
            tps = example_tps,
            fps = example_fps,
            fns = example_fns,
            rules = self.theory.len(),
            "example processed"
        );
        Ok(())
    }

    /// Final pass: clear all statistics, rescore the stream with the frozen
    /// rule set, then keep only rules meeting the prune threshold.
    pub fn rescore(&mut self, examples: &[Example]) -> VigilResult<()> {
        for clause in self.theory.clauses_mut() {
            clause.clear_statistics();
        }
        self.inertia.clear();

        for example in examples {
            let merged = self.merged_facts(example);
            let base = FactBase::new(&merged);

            let mut groundings: Vec<HashSet<String>> = Vec::new();
            let mut failed = false;
            for clause in self.theory.clauses() {
                match rendered_heads(clause, &base) {
                    Ok(own) => groundings.push(own),
                    Err(e) => {
                        tracing::warn!(error = %e, example = example.id, "grounding failed during rescore");
                        failed = true;
                        break;
                    }
                }
            }
            if failed {
                continue;
            }
            for (clause, own) in self.theory.clauses_mut().zip(groundings) {
                apply_score(clause, &own, &example.annotation, &self.config, false)?;
            }

            if self.config.with_inertia {
                let active: Vec<&Clause> = self
                    .theory
                    .clauses()
                    .filter(|c| !c.body.is_empty())
                    .collect();
                if let Ok(outcome) = self.oracle.crisp_inference(&active, &merged) {
                    self.inertia = outcome.inertia;
                }
            }
        }

        let before = self.theory.len();
        self.theory.retain_precision(self.config.prune_threshold);
        tracing::info!(
            kept = self.theory.len(),
            pruned = before - self.theory.len(),
            "rescore complete"
        );
        Ok(())
    }

    /// Measure the current theory on a held-out stream without mutating it.
    pub fn evaluate(&self, examples: &[Example]) -> VigilResult<EvalReport> {
        let mut report = EvalReport::default();
        let mut inertia: Vec<Literal> = Vec::new();

        for example in examples {
            let mut merged = example.facts.clone();
            merged.extend(inertia.iter().cloned());
            let annotation = example.annotation_strings();

            let rules: Vec<&Clause> = self
                .theory
                .clauses()
                .filter(|c| !c.body.is_empty())
                .collect();
            let outcome = if rules.is_empty() {
                InferenceOutcome::default()
            } else {
                match self.oracle.crisp_inference(&rules, &merged) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(error = %e, example = example.id, "solver failed during evaluation");
                        continue;
                    }
                }
            };

            let inferred: HashSet<String> = outcome
                .state
                .iter()
                .filter(|(_, &v)| v)
                .map(|(atom, _)| atom.clone())
                .collect();
            report.tps += inferred.intersection(&annotation).count() as u64;
            report.fps += inferred.difference(&annotation).count() as u64;
            report.fns += annotation.difference(&inferred).count() as u64;
            report.total_groundings += inferred.len() as u64;
            report.examples += 1;

            inertia = if self.config.with_inertia {
                outcome.inertia
            } else {
                Vec::new()
            };
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn merged_facts(&self, example: &Example) -> Vec<Literal> {
        let mut merged = example.facts.clone();
        merged.extend(self.inertia.iter().cloned());
        merged
    }

    /// Conservative abduction: build one bottom rule per uncovered
    /// annotation atom and wrap it in an empty-bodied top rule carrying the
    /// bottom as its singleton support.
    fn abduce(
        &self,
        example: &Example,
        merged: &[Literal],
        inferred: &HashSet<String>,
    ) -> Vec<Clause> {
        let fact_strings: HashSet<String> = merged.iter().map(|f| f.to_string()).collect();
        let mut new_rules = Vec::new();

        for atom in &example.annotation {
            if inferred.contains(&atom.to_string()) {
                continue;
            }
            let Some(head_mode) = self.head_modes.iter().find(|m| m.matches(atom)) else {
                tracing::debug!(atom = %atom, "no head mode covers uncovered atom");
                continue;
            };

            let mut bindings = HashMap::new();
            let mut fresh = 0usize;
            let Some(head) = head_mode.variabilize(atom, &mut bindings, &mut fresh) else {
                continue;
            };

            // Body of the bottom rule: every fact a body mode covers whose
            // input constants are already tied to the head.
            let mut body: Vec<Literal> = Vec::new();
            for fact in merged {
                for mode in &self.body_modes {
                    if !mode.matches(fact) || !mode.inputs_bound(fact, &bindings) {
                        continue;
                    }
                    if let Some(lit) = mode.variabilize(fact, &mut bindings, &mut fresh) {
                        if !body.contains(&lit) {
                            body.push(lit);
                        }
                        break;
                    }
                }
            }

            // For an initiation target, the fluent not yet holding is part
            // of the most specific story.
            if head.predicate == INITIATED_AT && head.arity() == 2 {
                let current = Literal::positive(
                    "holdsAt",
                    vec![atom.args[0].clone(), atom.args[1].clone()],
                );
                let guard = Literal::negative(
                    "holdsAt",
                    vec![head.args[0].clone(), head.args[1].clone()],
                );
                if !fact_strings.contains(&current.to_string())
                    && self.body_modes.iter().any(|m| m.matches(&guard))
                    && !body.contains(&guard)
                {
                    body.push(guard);
                }
            }

            if body.is_empty() {
                continue;
            }

            let mut bottom = Clause::new(head.clone(), body);
            bottom.is_top_rule = false;
            bottom.is_bottom_rule = true;

            // Conservative abduction: a bottom rule no more specific than a
            // witness some rule already carries would be dropped by support
            // compression on merge, so it yields no new rule.
            let redundant = self
                .theory
                .clauses()
                .filter(|t| t.head_predicate() == bottom.head_predicate())
                .any(|t| t.support.iter().any(|witness| subsumes(&bottom, witness)));
            if redundant {
                continue;
            }

            let mut top = Clause::new(head, Vec::new());
            top.support = SupportSet::from_rules(vec![bottom]);
            new_rules.push(top);
        }
        new_rules
    }

    /// Regenerate empty refinement lists for rules that still have room to
    /// specialize, screening out variants of other current top rules.
    fn ensure_refinements(&mut self) {
        let snapshot: Vec<Clause> = self.theory.clauses().map(strip_learning_state).collect();
        let depth = self.config.specialization_depth;
        for clause in self.theory.clauses_mut() {
            let has_room = clause
                .support
                .first()
                .is_some_and(|bottom| clause.body_length() < bottom.body_length());
            if !clause.refinements.is_empty() || !has_room {
                continue;
            }
            let seen: Vec<Clause> = snapshot
                .iter()
                .filter(|s| s.id != clause.id)
                .cloned()
                .collect();
            generate_refinements(clause, depth, &self.comparison_modes, &seen);
        }
    }
}

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

fn rendered_heads(
    clause: &Clause,
    base: &FactBase,
) -> Result<HashSet<String>, crate::error::SolverError> {
    Ok(ground_heads(clause, base)?
        .into_iter()
        .map(|h| h.to_string())
        .collect())
}

/// Update one rule's counters (and optionally its weight) from its own
/// groundings on one example.
///
/// A weight below the configured floor after the update is an invariant
/// violation and aborts the learning run.
fn apply_score(
    clause: &mut Clause,
    inferred: &HashSet<String>,
    annotation: &[Literal],
    config: &LearnerConfig,
    update_weights: bool,
) -> ClauseResult<()> {
    let annotation_set: HashSet<String> = annotation.iter().map(|a| a.to_string()).collect();
    let tps = inferred
        .iter()
        .filter(|atom| annotation_set.contains(*atom))
        .count() as u64;
    let fps = inferred.len() as u64 - tps;
    let head_predicate = clause.head_predicate().unwrap_or_default().to_string();
    let fns = annotation
        .iter()
        .filter(|a| a.predicate == head_predicate && !inferred.contains(&a.to_string()))
        .count() as u64;

    clause.tps += tps;
    clause.fps += fps;
    clause.fns += fns;
    clause.total_groundings += inferred.len() as u64 + fns;
    clause.seen += 1;

    if update_weights {
        // Multiplicative promote/demote, clamped to [floor, 1].
        if fps > 0 {
            clause.update_weight(0.5, config.weight_floor);
        } else if tps > 0 {
            clause.update_weight(2.0, config.weight_floor);
            clause.weight = clause.weight.min(1.0);
        }
    }

    if clause.weight < config.weight_floor {
        return Err(ClauseError::WeightBelowFloor {
            weight: clause.weight,
            floor: config.weight_floor,
        });
    }
    Ok(())
}

/// Run the specialization test on every rule of one partition, swapping in
/// the winning refinement where the configured strategy fires.
fn expand_partition(partition: &mut [Clause], config: &LearnerConfig) -> VigilResult<()> {
    for clause in partition.iter_mut() {
        if !clause.eligible_for_specialization || clause.seen == 0 {
            continue;
        }
        let outcome = specialize_decision(clause, config.scoring_fun);
        if outcome.best.id == clause.id {
            continue;
        }
        let fires = match config.rule_learning_strategy {
            RuleLearningStrategy::Hoeffding => {
                outcome.mean_diff > hoeffding_bound(config.hoeffding_delta, clause.seen)
            }
            RuleLearningStrategy::Greedy => outcome.mean_diff > 0.0,
        };
        if !fires {
            continue;
        }

        let best = outcome.best;
        let extends_parent = best.head == clause.head
            && best.body.len() > clause.body.len()
            && clause.body.iter().all(|lit| best.body.contains(lit));
        if !extends_parent {
            return Err(ClauseError::RefinementNotSuperset {
                parent: clause.id.get(),
            }
            .into());
        }

        let mut replacement = best;
        replacement.is_top_rule = true;
        replacement.is_new = false;
        replacement.eligible_for_specialization = true;
        replacement.clear_statistics();
        tracing::info!(from = %clause.id, to = %replacement.id, rule = %replacement, "specialized rule");
        *clause = replacement;
    }
    Ok(())
}

fn strip_learning_state(clause: &Clause) -> Clause {
    Clause {
        support: SupportSet::new(),
        refinements: Vec::new(),
        ..clause.clone()
    }
}
