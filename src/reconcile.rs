use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ImportError;
use crate::record::{self, StudentRecord, PROTECTED_FIELDS};
use crate::store::Store;

/// Merges `incoming` into `existing` keyed by lower-cased roll.
///
/// A matched record takes the incoming fields but keeps its own `id` and
/// `createdAt`, and stays at its position. Unmatched records are appended in
/// incoming order.
pub fn merge_by_roll(
    existing: Vec<StudentRecord>,
    incoming: Vec<StudentRecord>,
) -> Vec<StudentRecord> {
    let mut merged = existing;
    let mut by_key: HashMap<String, usize> = HashMap::with_capacity(merged.len());
    for (i, r) in merged.iter().enumerate() {
        // First occurrence wins the key, later duplicates are left as they are.
        by_key.entry(r.merge_key()).or_insert(i);
    }

    for rec in incoming {
        let key = rec.merge_key();
        match by_key.get(&key) {
            Some(&i) => {
                let next = StudentRecord::overlay(&merged[i], rec, PROTECTED_FIELDS);
                merged[i] = next;
            }
            None => {
                by_key.insert(key, merged.len());
                merged.push(rec);
            }
        }
    }
    merged
}

#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub received: usize,
    pub records: Vec<StudentRecord>,
}

impl ImportBatch {
    pub fn rejected(&self) -> usize {
        self.received - self.records.len()
    }
}

/// Parses an import payload. The top level must be a JSON array; entries
/// that fail normalization are dropped.
pub fn parse_import(text: &str) -> Result<ImportBatch, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(ImportError::NotAnArray);
    };
    let records: Vec<StudentRecord> = items.iter().filter_map(record::normalize).collect();
    if records.len() != items.len() {
        debug!(
            dropped = items.len() - records.len(),
            "dropped malformed import entries"
        );
    }
    Ok(ImportBatch {
        received: items.len(),
        records,
    })
}

pub fn read_import_file(path: &Path) -> Result<String, ImportError> {
    std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_string_lossy().to_string(),
        source,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub received: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub created: usize,
    pub updated: usize,
}

/// Parses `text` and merges it into `store`. The store is only replaced once
/// the whole payload has parsed.
pub fn import_into(store: &mut Store, text: &str) -> Result<ImportSummary, ImportError> {
    let batch = parse_import(text)?;
    let rejected = batch.rejected();
    let received = batch.received;
    let accepted = batch.records.len();

    let before = store.len();
    let merged = merge_by_roll(store.records().to_vec(), batch.records);
    let created = merged.len() - before;
    store.replace_all(merged);

    let summary = ImportSummary {
        received,
        accepted,
        rejected,
        created,
        updated: accepted - created,
    };
    info!(
        received,
        accepted, rejected, created, "imported students"
    );
    Ok(summary)
}
