use std::sync::Arc;

use log::{debug, warn};

use crate::{
    AnalysisRecord,
    config::LearningConfig,
    error::Result,
    learning::{CheckAccuracy, LearningStats, PatternSnapshot},
    store::PatternStore,
};

pub struct FeedbackLearner {
    patterns: Arc<dyn PatternStore>,
    config: LearningConfig,
}

impl FeedbackLearner {
    pub fn new(patterns: Arc<dyn PatternStore>, config: LearningConfig) -> Self {
        Self { patterns, config }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn snapshot(&self) -> PatternSnapshot {
        self.patterns.snapshot()
    }

    /// Unsupervised contribution of a freshly scored record.
    pub fn observe(&self, record: &AnalysisRecord) {
        let tokens = self.config.tokens(&record.filename);
        let weight = self.config.unsupervised_weight;
        let share = record.aggregate_score;

        let result = self.patterns.update(&mut |tables| {
            for token in &tokens {
                tables
                    .tokens
                    .entry(token.clone())
                    .or_default()
                    .record_split(share, weight);
            }
            for (check, outcome) in &record.check_breakdown {
                tables.checks.entry(*check).or_default().observe(outcome.score);
            }
            Ok(())
        });

        if let Err(err) = result {
            warn!(
                "Could not record observation for {} ({}): {err}",
                record.analysis_id,
                record.filename
            );
        }
    }

    /// Applies one correction atomically and reports whether the original verdict held.
    pub fn apply_feedback(
        &self,
        record: &AnalysisRecord,
        user_says_ai: bool,
        confidence: f64,
    ) -> Result<bool> {
        let was_correct = record.is_ai_generated() == user_says_ai;
        let tokens = self.config.tokens(&record.filename);
        let before = self.patterns.snapshot();

        self.patterns.update(&mut |tables| {
            for token in &tokens {
                tables
                    .tokens
                    .entry(token.clone())
                    .or_default()
                    .record(user_says_ai, confidence);
            }
            for check in record.check_breakdown.keys() {
                tables
                    .checks
                    .entry(*check)
                    .or_default()
                    .record(was_correct, confidence);
            }
            tables.feedback_events += 1;
            Ok(())
        })?;

        if !was_correct {
            let misleading = tokens
                .iter()
                .filter(|token| {
                    before
                        .token(token)
                        .and_then(|stat| stat.ai_ratio())
                        .is_some_and(|ratio| (ratio > 0.5) != user_says_ai && ratio != 0.5)
                })
                .collect::<Vec<_>>();

            if !misleading.is_empty() {
                debug!(
                    "Misleading filename tokens for {}: {misleading:?}",
                    record.analysis_id
                );
            }
        }

        Ok(was_correct)
    }

    pub fn stats(&self, total_analyses: usize, feedback_received: usize) -> LearningStats {
        let tables = self.patterns.snapshot();

        let accuracy_by_method = tables
            .checks
            .iter()
            .filter_map(|(check, stat)| {
                stat.accuracy_rate().map(|accuracy| {
                    (
                        *check,
                        CheckAccuracy {
                            accuracy,
                            samples: stat.samples,
                        },
                    )
                })
            })
            .collect();

        LearningStats {
            total_analyses,
            feedback_received,
            filename_patterns_learned: tables.tokens.len(),
            detection_methods_tracked: tables.checks.len(),
            accuracy_by_method,
        }
    }
}
