//! Record store - ordered records with unique-key identity
//!
//! Batches are merged atomically: the batch is validated and merged into a
//! working copy, sorted if a sort key is set, and only then committed together
//! with any new columns.

use super::columns::ColumnSet;
use super::record::{Record, Value};
use crate::error::StoreError;
use tracing::debug;

/// Outcome counts of a successful merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    unique_key: Option<String>,
    sort_key: Option<String>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn unique_key(&self) -> Option<&str> {
        self.unique_key.as_deref()
    }

    pub fn set_unique_key(&mut self, key: &str) {
        self.unique_key = Some(key.to_string());
    }

    pub fn set_sort_key(&mut self, key: &str) {
        self.sort_key = Some(key.to_string());
    }

    /// Merge a single record
    pub fn add_record(
        &mut self,
        record: Record,
        columns: &mut ColumnSet,
    ) -> Result<MergeReport, StoreError> {
        self.add_records(vec![record], columns)
    }

    /// Merge a batch of records.
    ///
    /// Identical records are skipped, records sharing a unique key value with a
    /// stored record replace it at its position, everything else is appended.
    /// Fields of added or updated records that are not yet tracked become main
    /// columns. On error neither the records nor `columns` are modified; a
    /// unique key inferred from this batch persists even if it is rejected.
    pub fn add_records(
        &mut self,
        batch: Vec<Record>,
        columns: &mut ColumnSet,
    ) -> Result<MergeReport, StoreError> {
        let Some(first) = batch.first() else {
            return Ok(MergeReport::default());
        };

        if self.unique_key.is_none() {
            let key = first.first_key().ok_or(StoreError::NoUniqueKey)?;
            debug!(key, "inferred unique key from first record");
            self.unique_key = Some(key.to_string());
        }
        let key = self.unique_key.clone().unwrap_or_default();

        check_batch_keys(&batch, &key)?;

        let mut merged = self.records.clone();
        let mut report = MergeReport::default();
        let mut new_columns: Vec<String> = Vec::new();

        for record in batch {
            if merged.contains(&record) {
                report.unchanged += 1;
                continue;
            }

            for field in record.keys() {
                if !columns.is_tracked(field) && !new_columns.iter().any(|c| c == field) {
                    new_columns.push(field.to_string());
                }
            }

            let existing = record
                .get(&key)
                .and_then(|value| merged.iter().position(|r| r.get(&key) == Some(value)));
            match existing {
                Some(pos) => {
                    merged[pos] = record;
                    report.updated += 1;
                }
                None => {
                    merged.push(record);
                    report.added += 1;
                }
            }
        }

        if let Some(sort_key) = &self.sort_key {
            sort_records(&mut merged, sort_key, &key)?;
        }

        self.records = merged;
        for column in &new_columns {
            columns.add_column(column);
        }

        debug!(
            added = report.added,
            updated = report.updated,
            unchanged = report.unchanged,
            new_columns = new_columns.len(),
            "merged batch"
        );
        Ok(report)
    }
}

/// Every record must carry the unique key, and no value may repeat within the batch
fn check_batch_keys(batch: &[Record], key: &str) -> Result<(), StoreError> {
    let mut seen: Vec<&Value> = Vec::with_capacity(batch.len());
    for (index, record) in batch.iter().enumerate() {
        let value = record.get(key).ok_or_else(|| StoreError::MissingUniqueKey {
            key: key.to_string(),
            index,
        })?;
        if seen.contains(&value) {
            return Err(StoreError::DuplicateKey {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        seen.push(value);
    }
    Ok(())
}

/// Stable ascending sort; a record without the sort key fails the whole merge
fn sort_records(records: &mut [Record], sort_key: &str, unique_key: &str) -> Result<(), StoreError> {
    if let Some(missing) = records.iter().find(|r| !r.contains(sort_key)) {
        let unique = missing
            .get(unique_key)
            .map(|v| format!("{} = {}", unique_key, v))
            .unwrap_or_else(|| unique_key.to_string());
        return Err(StoreError::MissingSortKey {
            key: sort_key.to_string(),
            unique,
        });
    }

    records.sort_by(|a, b| match (a.get(sort_key), b.get(sort_key)) {
        (Some(x), Some(y)) => x.sort_cmp(y),
        _ => std::cmp::Ordering::Equal,
    });
    Ok(())
}
