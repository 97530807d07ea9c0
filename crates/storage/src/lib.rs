use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use shared::domain::EvaluationRecord;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read evals file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse evals file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("record {record}: {field} has {actual} flags but {expected} components")]
    LengthMismatch {
        record: usize,
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("failed to serialize evals collection: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write evals file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Flat-file store for the full evaluation collection. Every save rewrites the
/// whole file; there is no incremental persistence.
#[derive(Debug, Clone)]
pub struct EvalStore {
    path: PathBuf,
}

impl EvalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and normalizes the collection. Records that predate annotation
    /// support get all-false flag sequences sized to their component
    /// sequences; records whose present flag sequences have the wrong length
    /// are rejected outright.
    pub fn load(&self) -> Result<Vec<EvaluationRecord>, StorageError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| StorageError::Read {
            path: self.path.clone(),
            source,
        })?;
        let mut records: Vec<EvaluationRecord> =
            serde_json::from_str(&raw).map_err(|source| StorageError::Parse {
                path: self.path.clone(),
                source,
            })?;

        for (index, record) in records.iter_mut().enumerate() {
            check_lengths(index, record)?;
            record.normalize();
        }

        Ok(records)
    }

    /// Serializes the full collection and replaces the file via
    /// temp-file-and-rename, so a failed write never truncates the previous
    /// contents.
    pub fn save(&self, records: &[EvaluationRecord]) -> Result<(), StorageError> {
        let serialized =
            serde_json::to_string_pretty(records).map_err(StorageError::Serialize)?;

        let tmp = tmp_sibling(&self.path);
        fs::write(&tmp, serialized).map_err(|source| StorageError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

fn check_lengths(index: usize, record: &EvaluationRecord) -> Result<(), StorageError> {
    if let Some(flags) = record.ground_truth_annotations.as_deref() {
        let expected = record.ground_truth_components.len();
        if flags.len() != expected {
            return Err(StorageError::LengthMismatch {
                record: index,
                field: "ground_truth_annotations",
                expected,
                actual: flags.len(),
            });
        }
    }

    if let Some(flags) = record.haiku_annotations.as_ref() {
        let expected = record.haiku_components.len();
        if !flags.len_matches(expected) {
            let actual = shared::domain::Category::ALL
                .into_iter()
                .map(|category| flags.flags(category).len())
                .find(|len| *len != expected)
                .unwrap_or(expected);
            return Err(StorageError::LengthMismatch {
                record: index,
                field: "haiku_annotations",
                expected,
                actual,
            });
        }
    }

    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
