use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
    AnalysisRecord, MediaKind,
    error::Result,
    store::{AnalysisStore, MemoryAnalysisStore},
};

/// Analysis ledger mirrored to a single JSON file on every write.
///
/// The file maps `<fingerprint>_<kind>` to the most recent record for that
/// content, so superseded analyses of the same upload are not kept across reopen.
/// A write that cannot reach disk leaves the in-memory ledger unchanged.
pub struct JsonFileStore {
    path: PathBuf,
    memory: MemoryAnalysisStore,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records: BTreeMap<String, AnalysisRecord> = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            serde_json::from_reader(reader)?
        } else {
            BTreeMap::new()
        };

        info!(
            "Opened analysis ledger {} with {} records",
            path.display(),
            records.len()
        );

        Ok(Self {
            path,
            memory: MemoryAnalysisStore::from_records(records.into_values()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &BTreeMap<String, AnalysisRecord>) -> Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Err(err) = Self::write_ledger(&tmp, records, &self.path) {
            warn!("Could not write ledger {}: {err}", self.path.display());
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }

        debug!("Persisted {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn write_ledger(
        tmp: &Path,
        records: &BTreeMap<String, AnalysisRecord>,
        target: &Path,
    ) -> Result<()> {
        {
            let file = File::create(tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(tmp, target)?;
        Ok(())
    }
}

impl AnalysisStore for JsonFileStore {
    fn get(&self, analysis_id: &str) -> Option<AnalysisRecord> {
        self.memory.get(analysis_id)
    }

    fn put(&self, record: AnalysisRecord) -> Result<()> {
        self.memory.transact(
            |index| {
                index.insert(record);
                Ok(())
            },
            |records| self.persist(records),
        )
    }

    fn update(
        &self,
        analysis_id: &str,
        apply: &mut dyn FnMut(&mut AnalysisRecord),
    ) -> Result<AnalysisRecord> {
        self.memory.transact(
            |index| index.update(analysis_id, apply),
            |records| self.persist(records),
        )
    }

    fn latest_for_content(&self, fingerprint: &str, kind: MediaKind) -> Option<AnalysisRecord> {
        self.memory.latest_for_content(fingerprint, kind)
    }

    fn len(&self) -> usize {
        self.memory.len()
    }

    fn feedback_count(&self) -> usize {
        self.memory.feedback_count()
    }
}
