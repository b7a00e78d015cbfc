pub mod learner;
pub mod request;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CheckName, config::LearningConfig};

/// Confidence-weighted tally for one filename token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternStatistic {
    pub ai_weight: f64,
    pub real_weight: f64,
    pub total_weight: f64,
}

impl PatternStatistic {
    /// `None` until any weight has been recorded.
    pub fn ai_ratio(&self) -> Option<f64> {
        if self.total_weight > 0.0 {
            Some((self.ai_weight / self.total_weight).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    pub fn record(&mut self, is_ai: bool, weight: f64) {
        if is_ai {
            self.ai_weight += weight;
        } else {
            self.real_weight += weight;
        }
        self.total_weight += weight;
    }

    /// Splits `weight` between the two sides by `ai_share`.
    pub fn record_split(&mut self, ai_share: f64, weight: f64) {
        let ai_share = ai_share.clamp(0.0, 1.0);
        self.ai_weight += weight * ai_share;
        self.real_weight += weight * (1.0 - ai_share);
        self.total_weight += weight;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckStatistic {
    pub observations: u64,
    pub mean_score: f64,
    pub samples: f64,
    pub correct_weight: f64,
}

impl CheckStatistic {
    pub fn accuracy_rate(&self) -> Option<f64> {
        if self.samples > 0.0 {
            Some((self.correct_weight / self.samples).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    pub fn observe(&mut self, score: f64) {
        self.observations += 1;
        self.mean_score += (score - self.mean_score) / self.observations as f64;
    }

    pub fn record(&mut self, correct: bool, confidence: f64) {
        self.samples += 1.0;
        if correct {
            self.correct_weight += confidence;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternTables {
    pub tokens: BTreeMap<String, PatternStatistic>,
    pub checks: BTreeMap<CheckName, CheckStatistic>,
    pub feedback_events: u64,
}

/// Frozen copy of the tables consulted while scoring a single upload.
pub type PatternSnapshot = PatternTables;

impl PatternTables {
    pub fn token(&self, token: &str) -> Option<&PatternStatistic> {
        self.tokens.get(token)
    }

    pub fn check(&self, check: CheckName) -> Option<&CheckStatistic> {
        self.checks.get(&check)
    }

    /// Mean `ai_ratio` over the filename's tokens that have any history.
    pub fn learned_filename_score(&self, filename: &str, learning: &LearningConfig) -> f64 {
        let ratios = learning
            .tokens(filename)
            .iter()
            .filter_map(|token| self.tokens.get(token).and_then(PatternStatistic::ai_ratio))
            .collect::<Vec<_>>();

        if ratios.is_empty() {
            0.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        }
    }

    /// Nudges a check's score by its feedback accuracy, once enough samples exist.
    pub fn enhance_score(
        &self,
        base_score: f64,
        check: CheckName,
        learning: &LearningConfig,
    ) -> (f64, Option<String>) {
        let base_score = base_score.clamp(0.0, 1.0);

        let Some(stat) = self.checks.get(&check) else {
            return (base_score, None);
        };
        if stat.samples <= learning.min_samples {
            return (base_score, None);
        }

        let accuracy = stat.accuracy_rate().unwrap_or(0.5);
        let adjustment = (accuracy - 0.5) * learning.adjustment_factor;
        let adjusted = (base_score + adjustment).clamp(0.0, 1.0);

        let note = (adjustment.abs() >= 0.005)
            .then(|| format!("Score adjusted by learning system ({adjustment:+.2})"));

        (adjusted, note)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckAccuracy {
    pub accuracy: f64,
    pub samples: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_analyses: usize,
    pub feedback_received: usize,
    pub filename_patterns_learned: usize,
    pub detection_methods_tracked: usize,
    pub accuracy_by_method: BTreeMap<CheckName, CheckAccuracy>,
}
