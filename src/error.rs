//! Error types for the record store, the source watcher and the export process

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Rejection of an `add_records` call. The store is unchanged whenever one of these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("duplicate records with {key} = {value} in one batch")]
    DuplicateKey { key: String, value: String },
    #[error("record {index} in batch has no unique key field '{key}'")]
    MissingUniqueKey { key: String, index: usize },
    #[error("cannot infer a unique key: first record has no fields")]
    NoUniqueKey,
    #[error("record with {unique} has no sort key field '{key}'")]
    MissingSortKey { key: String, unique: String },
}

/// Failure to set up the source watcher. Always fatal at startup.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("couldn't find {}", .0.display())]
    MissingFile(PathBuf),
    #[error("failed to read modification time of {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to start watcher thread: {0}")]
    Thread(#[source] io::Error),
    #[error("initial export failed: {0}")]
    InitialFetch(#[from] FetchError),
}

/// A single failed export. Recoverable once the watcher is running.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("i/o error while waiting for export: {0}")]
    Io(#[from] io::Error),
    #[error("export exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },
    #[error("export did not finish within {0:?}")]
    Timeout(Duration),
    #[error("export cancelled")]
    Cancelled,
    #[error("malformed export output: {0}")]
    Parse(#[from] serde_json::Error),
}
