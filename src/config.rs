//! Run configuration for the online learner.
//!
//! One immutable record, loaded once (from JSON or built in code) and
//! threaded through the public API. Nothing in the crate reads configuration
//! from module state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::mode::ModeAtom;
use crate::parser;
use crate::scoring::ScoringFunction;

/// Strategy deciding when a rule is replaced by its best refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RuleLearningStrategy {
    /// Replace once the running mean score difference beats the Hoeffding
    /// bound for the rule's sample size.
    #[default]
    #[serde(rename = "hoeffding")]
    Hoeffding,
    /// Replace as soon as any refinement pulls ahead, without a statistical
    /// guarantee.
    #[serde(rename = "other", alias = "greedy")]
    Greedy,
}

/// Configuration for one learning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Maximum number of literals a single refinement may add (default: 1).
    pub specialization_depth: usize,
    /// Minimum precision for a rule to be used during inference and kept at
    /// the final rescore (default: 0.8).
    pub prune_threshold: f64,
    /// Per-rule scoring function (default: precision).
    pub scoring_fun: ScoringFunction,
    /// Mode atoms (as text) flagged as comparison predicates, e.g.
    /// `before(+time,+time)`.
    pub comparison_predicates: Vec<String>,
    /// Lower clamp for rule weights (default: 1e-5).
    pub weight_floor: f64,
    /// Confidence parameter δ of the Hoeffding bound (default: 0.05).
    pub hoeffding_delta: f64,
    /// Rule replacement strategy (default: hoeffding).
    pub rule_learning_strategy: RuleLearningStrategy,
    /// Carry inferred inertia atoms into the next example's facts. When
    /// `false` the carried set is cleared after every example.
    pub with_inertia: bool,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            specialization_depth: 1,
            prune_threshold: 0.8,
            scoring_fun: ScoringFunction::default(),
            comparison_predicates: Vec::new(),
            weight_floor: crate::clause::WEIGHT_FLOOR,
            hoeffding_delta: 0.05,
            rule_learning_strategy: RuleLearningStrategy::default(),
            with_inertia: false,
        }
    }
}

impl LearnerConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&text).map_err(|e| ConfigError::Malformed {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its documented domain.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.specialization_depth < 1 {
            return Err(ConfigError::BadDepth);
        }
        if !(0.0..=1.0).contains(&self.prune_threshold) {
            return Err(ConfigError::BadPruneThreshold {
                value: self.prune_threshold,
            });
        }
        if !(self.hoeffding_delta > 0.0 && self.hoeffding_delta < 1.0) {
            return Err(ConfigError::BadDelta {
                value: self.hoeffding_delta,
            });
        }
        if self.weight_floor <= 0.0 {
            return Err(ConfigError::BadWeightFloor {
                value: self.weight_floor,
            });
        }
        for atom in &self.comparison_predicates {
            parser::parse_mode_declaration(&format!("comparison({atom})")).map_err(|source| {
                ConfigError::BadComparison {
                    atom: atom.clone(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    /// Parse the configured comparison predicates into mode atoms.
    pub fn comparison_modes(&self) -> ConfigResult<Vec<ModeAtom>> {
        self.comparison_predicates
            .iter()
            .map(|atom| {
                parser::parse_mode_declaration(&format!("comparison({atom})"))
                    .map(|decl| decl.atom().clone())
                    .map_err(|source| ConfigError::BadComparison {
                        atom: atom.clone(),
                        source,
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = LearnerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.specialization_depth, 1);
        assert_eq!(config.scoring_fun, ScoringFunction::Precision);
        assert_eq!(
            config.rule_learning_strategy,
            RuleLearningStrategy::Hoeffding
        );
        assert!(!config.with_inertia);
    }

    #[test]
    fn json_round_trip_with_canonical_names() {
        let json = r#"{
            "specialization_depth": 2,
            "prune_threshold": 0.7,
            "scoring_fun": "foilgain",
            "rule_learning_strategy": "other",
            "hoeffding_delta": 0.1,
            "with_inertia": true
        }"#;
        let config: LearnerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.specialization_depth, 2);
        assert_eq!(config.scoring_fun, ScoringFunction::FoilGain);
        assert_eq!(config.rule_learning_strategy, RuleLearningStrategy::Greedy);
        assert!(config.with_inertia);
        // Unset fields take defaults.
        assert!((config.weight_floor - 1e-5).abs() < 1e-12);
    }

    #[test]
    fn validation_rejects_bad_domains() {
        let mut config = LearnerConfig {
            hoeffding_delta: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadDelta { .. })
        ));

        config.hoeffding_delta = 0.05;
        config.prune_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadPruneThreshold { .. })
        ));

        config.prune_threshold = 0.8;
        config.specialization_depth = 0;
        assert!(matches!(config.validate(), Err(ConfigError::BadDepth)));

        config.specialization_depth = 1;
        config.weight_floor = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadWeightFloor { .. })
        ));
    }

    #[test]
    fn comparison_modes_parse() {
        let config = LearnerConfig {
            comparison_predicates: vec!["before(+time,+time)".into()],
            ..Default::default()
        };
        config.validate().unwrap();
        let modes = config.comparison_modes().unwrap();
        assert_eq!(modes.len(), 1);
        assert!(modes[0].comparison);
        assert_eq!(modes[0].predicate, "before");
    }

    #[test]
    fn bad_comparison_atom_is_rejected() {
        let config = LearnerConfig {
            comparison_predicates: vec!["before((".into()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadComparison { .. })
        ));
    }

    #[test]
    fn from_json_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"hoeffding_delta": 2.0}"#).unwrap();
        let err = LearnerConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::BadDelta { .. }));
    }
}
