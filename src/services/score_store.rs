// src/services/score_store.rs

use std::{
    fs::OpenOptions,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::{
    config::{Config, StoreBackend},
    error::AppError,
    models::attempt::{AttemptRecord, SCORE_COLUMNS},
    services::sheets::SheetsStore,
};

/// Shared, append-only table of attempt records.
///
/// No locking or reconciliation across writers: concurrent players append
/// independently and a read may miss a row written a moment earlier.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Appends one row. Fails with `AppError::StoreWrite`.
    async fn append(&self, record: &AttemptRecord) -> Result<(), AppError>;

    /// Every row in store order. Fails with `AppError::StoreRead`.
    async fn read_all(&self) -> Result<Vec<AttemptRecord>, AppError>;
}

/// Builds the store selected by `SCORE_STORE`.
pub fn build_store(config: &Config) -> Result<Arc<dyn ScoreStore>, AppError> {
    match config.store_backend {
        StoreBackend::Sheets => {
            let sheets = config.sheets.as_ref().ok_or_else(|| {
                AppError::Configuration("Google Sheets settings are missing".to_string())
            })?;
            Ok(Arc::new(SheetsStore::new(sheets)?))
        }
        StoreBackend::Csv => Ok(Arc::new(CsvFileStore::new(config.scores_csv_path.clone()))),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::default())),
    }
}

/// Local CSV file with a `Name,Score,Total,Percentage` header.
#[derive(Debug)]
pub struct CsvFileStore {
    path: PathBuf,
    // Serializes appends from this process so header and rows never interleave.
    write_lock: Mutex<()>,
}

impl CsvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvFileStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ScoreStore for CsvFileStore {
    async fn append(&self, record: &AttemptRecord) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        let record = record.clone();

        tokio::task::spawn_blocking(move || -> Result<(), AppError> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| AppError::StoreWrite(format!("{}: {}", path.display(), e)))?;
            let is_new = file
                .metadata()
                .map_err(|e| AppError::StoreWrite(e.to_string()))?
                .len()
                == 0;

            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            if is_new {
                writer
                    .write_record(SCORE_COLUMNS)
                    .map_err(|e| AppError::StoreWrite(e.to_string()))?;
            }
            writer
                .serialize(&record)
                .map_err(|e| AppError::StoreWrite(e.to_string()))?;
            writer
                .flush()
                .map_err(|e| AppError::StoreWrite(e.to_string()))?;
            Ok(())
        })
        .await?
    }

    async fn read_all(&self) -> Result<Vec<AttemptRecord>, AppError> {
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<AttemptRecord>, AppError> {
            if !path.exists() {
                return Ok(Vec::new());
            }
            let mut reader = csv::Reader::from_path(&path)
                .map_err(|e| AppError::StoreRead(format!("{}: {}", path.display(), e)))?;
            reader
                .deserialize()
                .collect::<Result<Vec<AttemptRecord>, _>>()
                .map_err(|e| AppError::StoreRead(e.to_string()))
        })
        .await?
    }
}

/// In-process store. Rows vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<AttemptRecord>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn with_records(records: Vec<AttemptRecord>) -> Self {
        MemoryStore {
            records: RwLock::new(records),
            ..Default::default()
        }
    }

    /// Makes every following `append` fail, as an unreachable store would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every following `read_all` fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn append(&self, record: &AttemptRecord) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StoreWrite("store unavailable".to_string()));
        }
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<AttemptRecord>, AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::StoreRead("store unavailable".to_string()));
        }
        Ok(self.records.read().await.clone())
    }
}
