//! Rule scoring and the Hoeffding specialization decision.
//!
//! Three scoring modes are supported: raw precision (the default), F-score,
//! and normalized FOIL gain against the parent rule. The per-example
//! specialization decision ranks a rule against its live refinements and
//! maintains the running mean of the best-vs-second score difference; the
//! online loop compares that mean against the Hoeffding bound to decide when
//! the best refinement has provably pulled ahead.
//!
//! All score computations are total: undefined denominators yield 0, never
//! NaN.

use serde::{Deserialize, Serialize};

use crate::clause::Clause;

/// Closed set of per-rule scoring functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScoringFunction {
    /// Precision over groundings.
    #[default]
    #[serde(rename = "default", alias = "precision")]
    Precision,
    /// Normalized FOIL gain relative to the parent rule.
    #[serde(rename = "foilgain")]
    FoilGain,
    /// Harmonic mean of precision and recall.
    #[serde(rename = "fscore")]
    FScore,
}

impl std::fmt::Display for ScoringFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringFunction::Precision => write!(f, "default"),
            ScoringFunction::FoilGain => write!(f, "foilgain"),
            ScoringFunction::FScore => write!(f, "fscore"),
        }
    }
}

/// Score a clause under the given mode. `parent` is consulted only by
/// FOIL gain; passing the clause itself as its own parent yields 0 gain.
pub fn score(mode: ScoringFunction, clause: &Clause, parent: &Clause) -> f64 {
    match mode {
        ScoringFunction::Precision => clause.precision(),
        ScoringFunction::FScore => clause.fscore(),
        ScoringFunction::FoilGain => foil_gain(clause, parent),
    }
}

/// Normalized FOIL gain: how much precision the clause gains over its
/// parent, weighted by retained true positives and normalized by the
/// parent's maximum attainable gain.
fn foil_gain(clause: &Clause, parent: &Clause) -> f64 {
    let coverage = clause.precision();
    let parent_coverage = parent.precision();
    if coverage == 0.0 {
        return 0.0;
    }
    if parent_coverage == 0.0 || parent_coverage == 1.0 {
        return 0.0;
    }
    let raw = (clause.tps as f64 * (coverage.ln() - parent_coverage.ln())).max(0.0);
    let max = parent.tps as f64 * (-parent_coverage.ln());
    if max == 0.0 {
        0.0
    } else {
        raw / max
    }
}

/// ε = √(ln(1/δ) / 2n): the margin a mean score difference must exceed,
/// after `n` observations, to declare the leader better with confidence
/// 1 − δ. With no observations the bound is infinite and nothing passes.
pub fn hoeffding_bound(delta: f64, n: u64) -> f64 {
    if n == 0 {
        return f64::INFINITY;
    }
    ((1.0 / delta).ln() / (2.0 * n as f64)).sqrt()
}

// ---------------------------------------------------------------------------
// Specialization decision
// ---------------------------------------------------------------------------

/// Outcome of one per-example specialization decision.
#[derive(Debug, Clone)]
pub struct SpecializationOutcome {
    /// Updated running mean of the best-vs-second score difference.
    pub mean_diff: f64,
    /// Highest-ranked candidate.
    pub best: Clause,
    /// Runner-up (equal to `best` when only one candidate exists).
    pub second: Clause,
}

/// Rank a rule against its refinements and update its running statistics.
///
/// Rules with no support, with a body already as long as their first bottom
/// rule, or with no live refinements are not eligible; they come back with a
/// zero mean and themselves as both candidates, and their running mean is
/// left untouched.
pub fn specialize_decision(clause: &mut Clause, mode: ScoringFunction) -> SpecializationOutcome {
    let ineligible = clause.support.is_empty()
        || clause
            .support
            .first()
            .is_some_and(|bottom| clause.body_length() >= bottom.body_length())
        || clause.refinements.is_empty();
    if ineligible {
        return SpecializationOutcome {
            mean_diff: 0.0,
            best: clause.clone(),
            second: clause.clone(),
        };
    }

    // FOIL gain compares refinements among themselves; the other modes rank
    // the rule alongside its refinements.
    let mut pool: Vec<&Clause> = Vec::with_capacity(clause.refinements.len() + 1);
    if mode != ScoringFunction::FoilGain {
        pool.push(&*clause);
    }
    pool.extend(clause.refinements.iter());

    let parent = &*clause;
    let mut ranked: Vec<(f64, &Clause)> =
        pool.into_iter().map(|c| (score(mode, c, parent), c)).collect();
    ranked.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.precision()
                    .partial_cmp(&a.precision())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| {
                b.weight
                    .partial_cmp(&a.weight)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.body_length().cmp(&b.body_length()))
    });

    let (best_score, best) = (ranked[0].0, ranked[0].1.clone());
    let (second_score, second) = match ranked.get(1) {
        Some((s, c)) => (*s, (*c).clone()),
        None => (best_score, best.clone()),
    };

    let new_diff = best_score - second_score;
    let prev_count = clause.previous_mean_diff_count as f64;
    let mean_diff =
        (clause.previous_mean_diff * prev_count + new_diff) / (prev_count + 1.0);
    clause.previous_mean_diff = mean_diff;
    clause.previous_mean_diff_count += 1;

    SpecializationOutcome {
        mean_diff,
        best,
        second,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Literal;
    use crate::term::Term;

    fn rule(tps: u64, fps: u64, fns: u64) -> Clause {
        let mut c = Clause::new(
            Literal::positive("initiatedAt", vec![Term::constant("f"), Term::var("T")]),
            vec![Literal::positive(
                "happensAt",
                vec![Term::constant("e"), Term::var("T")],
            )],
        );
        c.tps = tps;
        c.fps = fps;
        c.fns = fns;
        c
    }

    #[test]
    fn precision_and_fscore_modes() {
        let c = rule(80, 20, 10);
        let parent = rule(0, 0, 0);
        assert!((score(ScoringFunction::Precision, &c, &parent) - 0.8).abs() < 1e-9);
        assert!((score(ScoringFunction::FScore, &c, &parent) - 0.8421).abs() < 1e-3);
    }

    #[test]
    fn foil_gain_shape() {
        // Parent precision 0.5 with 100 tps; refinement precision 0.9 with
        // 45 tps. Raw gain = 45·(ln 0.9 − ln 0.5), normalized by the
        // parent's maximum 100·(−ln 0.5).
        let parent = rule(100, 100, 0);
        let refined = rule(45, 5, 0);
        let gain = score(ScoringFunction::FoilGain, &refined, &parent);
        let expected = (45.0 * (0.9f64.ln() - 0.5f64.ln())).max(0.0) / (100.0 * -(0.5f64.ln()));
        assert!((gain - expected).abs() < 1e-9);
        assert!(gain > 0.0 && gain < 1.0);
    }

    #[test]
    fn foil_gain_degenerate_parents() {
        let refined = rule(10, 0, 0);
        let saturated = rule(100, 0, 0); // parent precision 1.0
        assert_eq!(score(ScoringFunction::FoilGain, &refined, &saturated), 0.0);
        let dead = rule(0, 0, 0); // parent precision 0
        assert_eq!(score(ScoringFunction::FoilGain, &refined, &dead), 0.0);
        let unfired = rule(0, 0, 0);
        let parent = rule(50, 50, 0);
        assert_eq!(score(ScoringFunction::FoilGain, &unfired, &parent), 0.0);
    }

    #[test]
    fn hoeffding_bound_values() {
        // δ = 0.05, n = 1000: ε = √(ln 20 / 2000) ≈ 0.0387.
        let eps = hoeffding_bound(0.05, 1000);
        assert!((eps - 0.0387).abs() < 1e-3);
        // n = 100: ε ≈ 0.122, too wide for a 0.1 mean difference.
        let eps = hoeffding_bound(0.05, 100);
        assert!((eps - 0.1224).abs() < 1e-3);
        assert!(hoeffding_bound(0.05, 0).is_infinite());
    }

    fn with_refinements(base_tps: u64, base_fps: u64, refinement_stats: &[(u64, u64)]) -> Clause {
        let mut clause = rule(base_tps, base_fps, 0);
        // Give the clause a three-literal bottom rule so its one-literal
        // body leaves room to specialize.
        let bottom = Clause::new(
            clause.head.clone().unwrap(),
            vec![
                clause.body[0].clone(),
                Literal::positive("holdsAt", vec![Term::constant("p"), Term::var("T")]),
                Literal::positive("holdsAt", vec![Term::constant("q"), Term::var("T")]),
            ],
        );
        clause.support.add(bottom);
        for (i, &(tps, fps)) in refinement_stats.iter().enumerate() {
            let mut r = Clause::new(
                clause.head.clone().unwrap(),
                vec![
                    clause.body[0].clone(),
                    Literal::positive(
                        "holdsAt",
                        vec![Term::constant(format!("p{i}")), Term::var("T")],
                    ),
                ],
            );
            r.tps = tps;
            r.fps = fps;
            r.parent = Some(clause.id);
            clause.refinements.push(r);
        }
        clause
    }

    #[test]
    fn decision_not_eligible_without_refinements() {
        let mut clause = rule(10, 0, 0);
        let outcome = specialize_decision(&mut clause, ScoringFunction::Precision);
        assert_eq!(outcome.mean_diff, 0.0);
        assert_eq!(outcome.best.id, clause.id);
        assert_eq!(clause.previous_mean_diff_count, 0);
    }

    #[test]
    fn decision_ranks_best_refinement_first() {
        // Parent precision 0.5; refinements at 0.9 and 0.6.
        let mut clause = with_refinements(50, 50, &[(45, 5), (30, 20)]);
        let outcome = specialize_decision(&mut clause, ScoringFunction::Precision);
        assert!((outcome.best.precision() - 0.9).abs() < 1e-9);
        assert!((outcome.second.precision() - 0.6).abs() < 1e-9);
        assert!((outcome.mean_diff - 0.3).abs() < 1e-9);
    }

    #[test]
    fn ties_break_toward_shorter_bodies() {
        // Identical stats: the parent (shorter body) must outrank its
        // refinement.
        let mut clause = with_refinements(40, 10, &[(40, 10)]);
        let outcome = specialize_decision(&mut clause, ScoringFunction::Precision);
        assert_eq!(outcome.best.id, clause.id);
    }

    #[test]
    fn running_mean_follows_the_law() {
        let mut clause = with_refinements(50, 50, &[(45, 5), (30, 20)]);
        // diff is 0.3 on every example; after n updates the mean is 0.3.
        for _ in 0..5 {
            specialize_decision(&mut clause, ScoringFunction::Precision);
        }
        assert_eq!(clause.previous_mean_diff_count, 5);
        assert!((clause.previous_mean_diff - 0.3).abs() < 1e-9);
    }

    #[test]
    fn running_mean_averages_varying_diffs() {
        let mut clause = with_refinements(50, 50, &[(45, 5), (30, 20)]);
        specialize_decision(&mut clause, ScoringFunction::Precision);
        // Second observation with a different gap: 0.9 − 0.8 = 0.1.
        clause.refinements[1].tps = 40;
        clause.refinements[1].fps = 10;
        let outcome = specialize_decision(&mut clause, ScoringFunction::Precision);
        assert!((outcome.mean_diff - 0.2).abs() < 1e-9);
        assert_eq!(clause.previous_mean_diff_count, 2);
    }

    #[test]
    fn foilgain_pool_excludes_the_rule_itself() {
        let mut clause = with_refinements(50, 50, &[(45, 5)]);
        let outcome = specialize_decision(&mut clause, ScoringFunction::FoilGain);
        // Single refinement: best and second coincide, diff is 0.
        assert_eq!(outcome.best.to_string(), outcome.second.to_string());
        assert_eq!(clause.previous_mean_diff, 0.0);
        assert_eq!(clause.previous_mean_diff_count, 1);
    }
}
