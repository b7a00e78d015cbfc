pub mod json_file;

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use crate::{
    AnalysisRecord, MediaKind, content_key,
    error::{FalsifyError, Result},
    learning::{PatternSnapshot, PatternTables},
};

pub use json_file::JsonFileStore;

/// Keyed storage of analysis records, safe to share across request threads.
pub trait AnalysisStore: Send + Sync {
    fn get(&self, analysis_id: &str) -> Option<AnalysisRecord>;

    fn put(&self, record: AnalysisRecord) -> Result<()>;

    /// Mutates the stored record in place and returns the updated copy.
    fn update(
        &self,
        analysis_id: &str,
        apply: &mut dyn FnMut(&mut AnalysisRecord),
    ) -> Result<AnalysisRecord>;

    /// Most recent record for the same content fingerprint and media kind.
    fn latest_for_content(&self, fingerprint: &str, kind: MediaKind) -> Option<AnalysisRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn feedback_count(&self) -> usize;
}

/// Learned pattern tables. Updates are all-or-nothing.
pub trait PatternStore: Send + Sync {
    fn snapshot(&self) -> PatternSnapshot;

    fn update(&self, apply: &mut dyn FnMut(&mut PatternTables) -> Result<()>) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
struct RecordIndex {
    records: BTreeMap<String, AnalysisRecord>,
    by_content: HashMap<String, String>,
}

impl RecordIndex {
    fn insert(&mut self, record: AnalysisRecord) {
        let key = record.content_key();
        let newer = match self
            .by_content
            .get(&key)
            .and_then(|id| self.records.get(id))
        {
            Some(existing) => record.created_at >= existing.created_at,
            None => true,
        };
        if newer {
            self.by_content.insert(key, record.analysis_id.clone());
        }
        self.records.insert(record.analysis_id.clone(), record);
    }

    fn update(
        &mut self,
        analysis_id: &str,
        apply: &mut dyn FnMut(&mut AnalysisRecord),
    ) -> Result<AnalysisRecord> {
        let record = self
            .records
            .get_mut(analysis_id)
            .ok_or_else(|| FalsifyError::UnknownAnalysis(analysis_id.to_owned()))?;
        apply(record);
        Ok(record.clone())
    }

    /// Most recent record per content key.
    fn content_view(&self) -> BTreeMap<String, AnalysisRecord> {
        self.by_content
            .iter()
            .filter_map(|(key, id)| self.records.get(id).map(|r| (key.clone(), r.clone())))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryAnalysisStore {
    inner: Mutex<RecordIndex>,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = AnalysisRecord>) -> Self {
        let mut index = RecordIndex::default();
        for record in records {
            index.insert(record);
        }
        Self {
            inner: Mutex::new(index),
        }
    }

    /// Applies `change` to a copy of the index and hands the copy's content view
    /// to `commit`. The copy replaces the live index only if both succeed.
    fn transact<T>(
        &self,
        change: impl FnOnce(&mut RecordIndex) -> Result<T>,
        commit: impl FnOnce(&BTreeMap<String, AnalysisRecord>) -> Result<()>,
    ) -> Result<T> {
        let mut inner = self.inner.lock();
        let mut working = RecordIndex::clone(&inner);
        let value = change(&mut working)?;
        commit(&working.content_view())?;
        *inner = working;
        Ok(value)
    }
}

impl AnalysisStore for MemoryAnalysisStore {
    fn get(&self, analysis_id: &str) -> Option<AnalysisRecord> {
        self.inner.lock().records.get(analysis_id).cloned()
    }

    fn put(&self, record: AnalysisRecord) -> Result<()> {
        self.inner.lock().insert(record);
        Ok(())
    }

    fn update(
        &self,
        analysis_id: &str,
        apply: &mut dyn FnMut(&mut AnalysisRecord),
    ) -> Result<AnalysisRecord> {
        self.inner.lock().update(analysis_id, apply)
    }

    fn latest_for_content(&self, fingerprint: &str, kind: MediaKind) -> Option<AnalysisRecord> {
        let inner = self.inner.lock();
        inner
            .by_content
            .get(&content_key(fingerprint, kind))
            .and_then(|id| inner.records.get(id))
            .cloned()
    }

    fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    fn feedback_count(&self) -> usize {
        self.inner
            .lock()
            .records
            .values()
            .filter(|record| record.feedback.is_some())
            .count()
    }
}

/// Clones the tables, applies the mutation, and commits only on success.
#[derive(Debug, Default)]
pub struct MemoryPatternStore {
    tables: Mutex<PatternTables>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PatternStore for MemoryPatternStore {
    fn snapshot(&self) -> PatternSnapshot {
        self.tables.lock().clone()
    }

    fn update(&self, apply: &mut dyn FnMut(&mut PatternTables) -> Result<()>) -> Result<()> {
        let mut tables = self.tables.lock();
        let mut working = tables.clone();
        apply(&mut working)?;
        *tables = working;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{
        Feedback,
        detection::{ConfidenceLevel, Verdict},
    };

    pub(crate) fn stored_record(id: &str, fingerprint: &str) -> AnalysisRecord {
        AnalysisRecord {
            analysis_id: id.into(),
            filename: "sample.png".into(),
            file_fingerprint: fingerprint.into(),
            media_kind: MediaKind::Image,
            check_breakdown: BTreeMap::new(),
            aggregate_score: 0.5,
            verdict: Verdict::Suspicious,
            confidence_level: ConfidenceLevel::Medium,
            generation_method: "Unknown".into(),
            artifacts: vec![],
            image_size: None,
            format: None,
            fallback_reason: None,
            created_at: Utc::now(),
            prior_correction: None,
            feedback: None,
        }
    }

    #[test]
    fn test_update_unknown_id() {
        let store = MemoryAnalysisStore::new();
        let err = store.update("missing", &mut |_| {}).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_ANALYSIS");
        assert!(store.is_empty());
    }

    #[test]
    fn test_latest_for_content_prefers_newest() {
        let store = MemoryAnalysisStore::new();
        let mut old = stored_record("a", "ff");
        old.created_at = Utc::now() - Duration::seconds(30);
        store.put(stored_record("b", "ff")).unwrap();
        store.put(old).unwrap();

        let latest = store.latest_for_content("ff", MediaKind::Image).unwrap();
        assert_eq!(latest.analysis_id, "b");
        assert!(store.latest_for_content("ff", MediaKind::Video).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_feedback_count_follows_updates() {
        let store = MemoryAnalysisStore::new();
        store.put(stored_record("a", "01")).unwrap();
        store.put(stored_record("b", "02")).unwrap();

        let updated = store
            .update("a", &mut |record| {
                record.feedback = Some(Feedback {
                    user_says_ai: true,
                    confidence: 1.0,
                    timestamp: Utc::now(),
                })
            })
            .unwrap();
        assert!(updated.feedback.is_some());
        assert_eq!(store.feedback_count(), 1);
    }

    #[test]
    fn test_failed_commit_keeps_previous_index() {
        let store = MemoryAnalysisStore::new();
        store.put(stored_record("a", "01")).unwrap();

        let result = store.transact(
            |index| {
                index.insert(stored_record("b", "02"));
                index.update("a", &mut |record| record.aggregate_score = 0.9)
            },
            |view| {
                assert_eq!(view.len(), 2);
                Err(FalsifyError::Internal("disk full".into()))
            },
        );

        assert!(result.is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().aggregate_score, 0.5);
        assert!(store.latest_for_content("02", MediaKind::Image).is_none());
    }

    #[test]
    fn test_failed_pattern_update_leaves_tables_untouched() {
        let store = MemoryPatternStore::new();
        let result = store.update(&mut |tables| {
            tables.feedback_events += 1;
            tables.tokens.entry("xyz".into()).or_default().record(true, 1.0);
            Err(FalsifyError::Internal("abort".into()))
        });

        assert!(result.is_err());
        assert_eq!(store.snapshot(), PatternTables::default());

        store
            .update(&mut |tables| {
                tables.feedback_events += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(store.snapshot().feedback_events, 1);
    }
}
