//! Append-only response store: one JSON document per record
//!
//! Each submission is persisted as its own file named by a lexically
//! sortable capture timestamp, so ascending file-stem order is capture
//! order and no separate index exists to corrupt. A torn write leaves an
//! unparseable file which readers skip; readers never mutate anything.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use survey_common::types::Record;

/// File extension of stored record documents.
pub const RECORD_EXT: &str = "json";

/// Timestamp encoding used for record identifiers, millisecond resolution.
/// Lexicographic order of the encoded form equals chronological order.
const ID_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%.3f";

/// Length of the encoded timestamp prefix of an identifier.
const ID_TIMESTAMP_LEN: usize = 19;

/// Upper bound on same-millisecond collision retries before giving up.
const MAX_ID_ATTEMPTS: u32 = 1000;

/// Errors produced by the response store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to create record file: {0}")]
    Create(#[source] std::io::Error),

    #[error("unable to write record file: {0}")]
    Write(#[source] std::io::Error),

    #[error("unable to serialize record: {0}")]
    Serialize(#[from] survey_common::SurveyError),

    #[error("unable to enumerate the response store: {0}")]
    List(#[source] std::io::Error),

    #[error("identifier space exhausted at {0}")]
    IdExhausted(String),
}

/// Unique, lexically sortable record identifier.
///
/// Encodes the capture timestamp (`YYYYMMDD_HHMMSS.mmm`, UTC) plus a numeric
/// suffix when two records land in the same millisecond. Doubles as the file
/// stem of the stored document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
    fn from_timestamp(captured: DateTime<Utc>, attempt: u32) -> Self {
        let base = captured.format(ID_TIMESTAMP_FORMAT).to_string();
        if attempt == 0 {
            Self(base)
        } else {
            Self(format!("{}_{}", base, attempt))
        }
    }

    /// Parse an identifier back from a file stem.
    ///
    /// Returns `None` when the stem does not carry a valid encoded timestamp,
    /// which lets the reader ignore stray files in the store directory.
    pub fn from_stem(stem: &str) -> Option<Self> {
        let prefix = stem.get(..ID_TIMESTAMP_LEN)?;
        NaiveDateTime::parse_from_str(prefix, ID_TIMESTAMP_FORMAT).ok()?;
        Some(Self(stem.to_string()))
    }

    /// The capture time encoded in this identifier
    pub fn received_at(&self) -> Option<NaiveDateTime> {
        let prefix = self.0.get(..ID_TIMESTAMP_LEN)?;
        NaiveDateTime::parse_from_str(prefix, ID_TIMESTAMP_FORMAT).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record read back from the store, paired with its identifier
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: RecordId,
    pub record: Record,
}

/// Handle over the response store directory.
///
/// Cheap to clone; all state lives on the filesystem.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    root: PathBuf,
}

impl ResponseStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the store directory if it does not exist yet.
    ///
    /// Called once at startup; failure here is unrecoverable.
    pub async fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await.map_err(StoreError::Create)
    }

    /// Persist a record and return its assigned identifier.
    ///
    /// The identifier derives from the capture timestamp; same-millisecond
    /// collisions are resolved with a numeric suffix, using `create_new` so
    /// two concurrent writers can never claim the same identifier. Returns
    /// only after the document reached stable storage; on error the caller
    /// must not acknowledge the submission.
    pub async fn put(&self, record: &Record) -> Result<RecordId, StoreError> {
        let document = record.to_json_pretty()?;
        let captured = Utc::now();

        for attempt in 0..MAX_ID_ATTEMPTS {
            let id = RecordId::from_timestamp(captured, attempt);
            let path = self.record_path(&id);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StoreError::Create(e)),
            };

            file.write_all(&document).await.map_err(StoreError::Write)?;
            file.sync_all().await.map_err(StoreError::Write)?;

            debug!(record_id = %id, "record persisted");
            return Ok(id);
        }

        Err(StoreError::IdExhausted(
            captured.format(ID_TIMESTAMP_FORMAT).to_string(),
        ))
    }

    /// Read every persisted record in ascending identifier order.
    ///
    /// Unreadable or malformed documents are skipped with a diagnostic and
    /// never abort the listing. Only directory enumeration failure is fatal.
    /// Not atomic with respect to concurrent `put`s: a record committed
    /// mid-scan may or may not appear in this snapshot.
    pub async fn list_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let mut dir = fs::read_dir(&self.root).await.map_err(StoreError::List)?;
        let mut records = Vec::new();

        while let Some(entry) = dir.next_entry().await.map_err(StoreError::List)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let Some(id) = RecordId::from_stem(stem) else {
                warn!(file = %path.display(), "skipping file without a record identifier");
                continue;
            };

            match fs::read(&path).await {
                Ok(bytes) => match Record::from_json_slice(&bytes) {
                    Ok(record) => records.push(StoredRecord { id, record }),
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "skipping malformed record document");
                    }
                },
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable record document");
                }
            }
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.root.join(format!("{}.{}", id, RECORD_EXT))
    }
}
