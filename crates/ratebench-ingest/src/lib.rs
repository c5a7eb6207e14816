//! Offline ingestion: spreadsheet rate tables in, canonical store out.
//!
//! A build run discovers `*.csv` and `*.xlsx` files in the source directory,
//! normalizes and validates every file in memory, then replaces the store's
//! rate table in a single transaction. A schema failure in any file aborts
//! the whole build before anything is loaded, so a prior table is never left
//! half-replaced.

pub mod normalize;
pub mod table;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use ratebench_core::StoreError;
use ratebench_store::Store;

pub use normalize::{normalize_header, normalize_table, NormalizedFile, REQUIRED_COLUMNS};
pub use table::RawTable;

#[derive(Debug, Error)]
pub enum IngestError {
    /// A source file lacks one or more required columns.
    #[error("{file}: missing required column(s): {columns:?}")]
    Schema { file: String, columns: Vec<String> },

    #[error("no rate source files (*.csv, *.xlsx) found in {}", dir.display())]
    NoSourceFiles { dir: PathBuf },

    #[error("{file}: {message}")]
    Read { file: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub rows_loaded: usize,
    pub rows_dropped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_id: String,
    pub files: Vec<FileReport>,
    pub total_rows: usize,
    pub dropped_rows: usize,
}

/// Run a full build: read, normalize, validate, then drop-and-replace the
/// store's rate table with the concatenation of all source files.
pub fn build_store(store: &Store, source_dir: &Path) -> Result<IngestReport, IngestError> {
    let paths = discover_source_files(source_dir)?;
    if paths.is_empty() {
        return Err(IngestError::NoSourceFiles {
            dir: source_dir.to_path_buf(),
        });
    }

    let run_id = Uuid::new_v4().to_string();
    let mut files = Vec::new();
    let mut all_rows = Vec::new();
    let mut dropped_rows = 0;

    for path in &paths {
        let file = file_name(path);
        let raw = RawTable::load(path)?;
        let normalized = normalize_table(&raw, &file)?;

        tracing::info!(
            run_id = %run_id,
            file = %file,
            rows = normalized.rows.len(),
            "loaded source file"
        );
        if normalized.dropped > 0 {
            tracing::warn!(
                file = %file,
                dropped = normalized.dropped,
                "dropped rows with unparseable geozip"
            );
        }

        files.push(FileReport {
            file,
            rows_loaded: normalized.rows.len(),
            rows_dropped: normalized.dropped,
        });
        dropped_rows += normalized.dropped;
        all_rows.extend(normalized.rows);
    }

    let total_rows = store.replace_rates(&all_rows)?;
    tracing::info!(
        run_id = %run_id,
        total_rows,
        dropped_rows,
        db = %store.db_path().display(),
        "rate table rebuilt"
    );

    Ok(IngestReport {
        run_id,
        files,
        total_rows,
        dropped_rows,
    })
}

fn discover_source_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if extension == "csv" || extension == "xlsx" {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
