use anyhow::Context;
use serde_json::Value;
use tracing::{debug, warn};

use crate::db::KvSlot;
use crate::record::{self, StudentRecord, Subject};

pub const STUDENTS_KEY: &str = "srp_students_v1";

/// Partial edit of a record. `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub roll: Option<String>,
    pub subjects: Option<Vec<Subject>>,
}

/// In-memory student collection keyed by id.
///
/// The store does not check roll uniqueness; callers run form validation
/// before `add`/`update`.
#[derive(Debug, Clone, Default)]
pub struct Store {
    records: Vec<StudentRecord>,
}

impl Store {
    #[allow(dead_code)]
    pub fn from_records(records: Vec<StudentRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn add(&mut self, record: StudentRecord) {
        self.records.push(record);
    }

    pub fn find_by_id(&self, id: &str) -> Option<&StudentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Applies `patch` in place and re-derives scores. Returns false when no
    /// record has `id`.
    pub fn update(&mut self, id: &str, patch: StudentPatch) -> bool {
        let Some(rec) = self.records.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        if let Some(name) = patch.name {
            rec.name = name.trim().to_string();
        }
        if let Some(roll) = patch.roll {
            rec.roll = roll.trim().to_string();
        }
        if let Some(subjects) = patch.subjects {
            rec.set_subjects(subjects);
        }
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn replace_all(&mut self, records: Vec<StudentRecord>) {
        self.records = records;
    }

    /// True when no other record uses `roll`, ignoring case. The record with
    /// `exclude_id` is skipped so an edit can keep its own roll.
    pub fn is_roll_unique(&self, roll: &str, exclude_id: Option<&str>) -> bool {
        let key = roll.trim().to_lowercase();
        self.records
            .iter()
            .all(|r| r.roll.to_lowercase() != key || Some(r.id.as_str()) == exclude_id)
    }

    pub fn persist(&self, slot: &mut dyn KvSlot) -> anyhow::Result<()> {
        let text = serde_json::to_string(&self.records).context("failed to serialize students")?;
        slot.set(STUDENTS_KEY, &text)?;
        debug!(count = self.records.len(), "persisted students");
        Ok(())
    }

    /// Loads the persisted set. A missing, unreadable or corrupt slot gives an
    /// empty store.
    pub fn restore(slot: &dyn KvSlot) -> Store {
        let text = match slot.get(STUDENTS_KEY) {
            Ok(Some(t)) => t,
            Ok(None) => return Store::default(),
            Err(e) => {
                warn!(error = %e, "student slot unreadable; starting empty");
                return Store::default();
            }
        };
        let items = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!("student slot is not an array; starting empty");
                return Store::default();
            }
            Err(e) => {
                warn!(error = %e, "student slot is corrupt; starting empty");
                return Store::default();
            }
        };
        let records: Vec<StudentRecord> = items.iter().filter_map(record::normalize).collect();
        if records.len() != items.len() {
            warn!(
                dropped = items.len() - records.len(),
                "dropped malformed stored students"
            );
        }
        Store { records }
    }
}
