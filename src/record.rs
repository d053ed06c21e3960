use serde::{Serialize, Serializer};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::calc::{self, Grade};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub name: String,
    /// `None` is an empty mark: the entry is kept but not counted.
    #[serde(serialize_with = "serialize_marks")]
    pub marks: Option<f64>,
}

impl Subject {
    #[allow(dead_code)]
    pub fn new(name: impl Into<String>, marks: Option<f64>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            marks: marks.and_then(calc::clamp_marks),
        }
    }
}

fn serialize_marks<S: Serializer>(marks: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match marks {
        Some(v) => calc::serialize_number(v, serializer),
        None => serializer.serialize_str(""),
    }
}

/// A graded student. The derived score fields are private so they can only
/// change together with `subjects`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub roll: String,
    subjects: Vec<Subject>,
    #[serde(serialize_with = "calc::serialize_number")]
    total: f64,
    #[serde(serialize_with = "calc::serialize_number")]
    percentage: f64,
    grade: Grade,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedField {
    Id,
    CreatedAt,
}

/// Fields an import overlay never replaces on an existing record.
pub const PROTECTED_FIELDS: &[ProtectedField] = &[ProtectedField::Id, ProtectedField::CreatedAt];

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

impl StudentRecord {
    pub fn new(name: impl Into<String>, roll: impl Into<String>, subjects: Vec<Subject>) -> Self {
        Self::with_identity(new_id(), now_millis(), name, roll, subjects)
    }

    pub fn with_identity(
        id: impl Into<String>,
        created_at: i64,
        name: impl Into<String>,
        roll: impl Into<String>,
        subjects: Vec<Subject>,
    ) -> Self {
        let mut rec = Self {
            id: id.into(),
            name: name.into().trim().to_string(),
            roll: roll.into().trim().to_string(),
            subjects: Vec::new(),
            total: 0.0,
            percentage: 0.0,
            grade: Grade::F,
            created_at,
        };
        rec.set_subjects(subjects);
        rec
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn set_subjects(&mut self, subjects: Vec<Subject>) {
        let totals = calc::compute_totals(&subjects);
        self.subjects = subjects;
        self.total = totals.total;
        self.percentage = totals.percentage;
        self.grade = calc::compute_grade(totals.percentage);
    }

    /// Lower-cased roll, the key imports are correlated on.
    pub fn merge_key(&self) -> String {
        self.roll.to_lowercase()
    }

    /// Takes every field from `incoming` except the `protected` ones, which
    /// keep the values on `base`.
    pub fn overlay(
        base: &StudentRecord,
        incoming: StudentRecord,
        protected: &[ProtectedField],
    ) -> StudentRecord {
        let mut merged = incoming;
        for field in protected {
            match field {
                ProtectedField::Id => merged.id = base.id.clone(),
                ProtectedField::CreatedAt => merged.created_at = base.created_at,
            }
        }
        merged
    }
}

/// Loose string coercion for imported scalars. Falsy values (missing, null,
/// false, 0, "") read as empty.
pub fn coerce_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => {
            let x = n.as_f64().unwrap_or(0.0);
            if x == 0.0 {
                String::new()
            } else {
                calc::format_number(x)
            }
        }
        Some(Value::Bool(true)) => "true".to_string(),
        _ => String::new(),
    }
}

fn coerce_subject(v: &Value) -> Option<Subject> {
    match v {
        Value::Null => None,
        Value::Object(obj) => Some(Subject {
            name: coerce_text(obj.get("name")),
            marks: obj
                .get("marks")
                .and_then(Value::as_f64)
                .and_then(calc::clamp_marks),
        }),
        _ => Some(Subject {
            name: String::new(),
            marks: None,
        }),
    }
}

/// Validates and coerces an arbitrary JSON value into a record.
///
/// Returns `None` when the value is not an object, when the trimmed name or
/// roll is empty, or when a subject entry is `null`. Derived score fields on
/// the input are ignored and recomputed. A non-empty string `id` and a numeric
/// `createdAt` are kept; otherwise fresh ones are minted.
pub fn normalize(raw: &Value) -> Option<StudentRecord> {
    let obj = raw.as_object()?;
    let name = coerce_text(obj.get("name"));
    let roll = coerce_text(obj.get("roll"));
    if name.is_empty() || roll.is_empty() {
        return None;
    }

    let subjects = match obj.get("subjects") {
        Some(Value::Array(items)) => items
            .iter()
            .map(coerce_subject)
            .collect::<Option<Vec<_>>>()?,
        _ => Vec::new(),
    };

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => new_id(),
    };
    let created_at = obj
        .get("createdAt")
        .and_then(Value::as_f64)
        .filter(|x| x.is_finite())
        .map(|x| x as i64)
        .unwrap_or_else(now_millis);

    Some(StudentRecord::with_identity(
        id, created_at, name, roll, subjects,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_recomputes_derived_fields() {
        let raw = json!({
            "id": "abc",
            "name": "  Alexa Roy ",
            "roll": " R9 ",
            "subjects": [
                { "name": "Math", "marks": 80 },
                { "name": "Science", "marks": 70 },
                { "name": "English", "marks": 90 }
            ],
            "total": 1,
            "percentage": 99,
            "grade": "F",
            "createdAt": 1000
        });
        let rec = normalize(&raw).expect("normalized");
        assert_eq!(rec.id, "abc");
        assert_eq!(rec.name, "Alexa Roy");
        assert_eq!(rec.roll, "R9");
        assert_eq!(rec.total(), 240.0);
        assert_eq!(rec.percentage(), 80.0);
        assert_eq!(rec.grade(), Grade::A);
        assert_eq!(rec.created_at, 1000);
    }

    #[test]
    fn normalize_rejects_blank_name_or_roll() {
        assert!(normalize(&json!({ "name": "  ", "roll": "R1" })).is_none());
        assert!(normalize(&json!({ "name": "Bob", "roll": "" })).is_none());
        assert!(normalize(&json!({ "name": "Bob" })).is_none());
        assert!(normalize(&json!("Bob")).is_none());
        assert!(normalize(&Value::Null).is_none());
    }

    #[test]
    fn normalize_coerces_subjects() {
        let raw = json!({
            "name": "Bob",
            "roll": 7,
            "subjects": [
                { "name": " Math ", "marks": 130 },
                { "name": "Art", "marks": "55" },
                { "name": "Music", "marks": -4 },
                42
            ]
        });
        let rec = normalize(&raw).expect("normalized");
        assert_eq!(rec.roll, "7");
        let subjects = rec.subjects();
        assert_eq!(subjects.len(), 4);
        assert_eq!(subjects[0], Subject::new("Math", Some(100.0)));
        assert_eq!(subjects[1].marks, None);
        assert_eq!(subjects[2].marks, Some(0.0));
        assert_eq!(subjects[3], Subject::new("", None));
        assert_eq!(rec.total(), 100.0);
        assert_eq!(rec.percentage(), 50.0);
    }

    #[test]
    fn numeric_roll_and_name_use_plain_number_text() {
        let rec = normalize(&json!({ "name": 12.5, "roll": 7.0, "subjects": [{ "name": 3, "marks": 40 }] }))
            .expect("normalized");
        assert_eq!(rec.roll, "7");
        assert_eq!(rec.name, "12.5");
        assert_eq!(rec.subjects()[0].name, "3");
        assert_eq!(coerce_text(Some(&json!(0.0))), "");
        assert_eq!(coerce_text(Some(&json!(false))), "");
    }

    #[test]
    fn normalize_treats_non_array_subjects_as_empty() {
        let rec = normalize(&json!({ "name": "Bob", "roll": "R2", "subjects": "Math" }))
            .expect("normalized");
        assert!(rec.subjects().is_empty());
        assert_eq!(rec.grade(), Grade::F);
    }

    #[test]
    fn normalize_rejects_null_subject_entry() {
        let raw = json!({ "name": "Bob", "roll": "R2", "subjects": [null] });
        assert!(normalize(&raw).is_none());
    }

    #[test]
    fn normalize_mints_identity_when_missing() {
        let before = now_millis();
        let rec = normalize(&json!({ "id": "", "name": "Bob", "roll": "R2", "createdAt": "yesterday" }))
            .expect("normalized");
        assert!(!rec.id.is_empty());
        assert!(Uuid::parse_str(&rec.id).is_ok());
        assert!(rec.created_at >= before);

        let rec = normalize(&json!({ "id": 12, "name": "Bob", "roll": "R2" })).expect("normalized");
        assert_ne!(rec.id, "12");
    }

    #[test]
    fn overlay_keeps_protected_fields() {
        let base = StudentRecord::with_identity("abc", 1000, "Old", "R01", vec![]);
        let incoming = StudentRecord::with_identity(
            "new-id",
            5000,
            "New Name",
            "r01",
            vec![Subject::new("Math", Some(90.0))],
        );
        let merged = StudentRecord::overlay(&base, incoming, PROTECTED_FIELDS);
        assert_eq!(merged.id, "abc");
        assert_eq!(merged.created_at, 1000);
        assert_eq!(merged.name, "New Name");
        assert_eq!(merged.roll, "r01");
        assert_eq!(merged.grade(), Grade::APlus);
    }

    #[test]
    fn serializes_in_persisted_shape() {
        let rec = StudentRecord::with_identity(
            "abc",
            1000,
            "Bob",
            "R1",
            vec![Subject::new("Math", Some(80.0)), Subject::new("Art", None)],
        );
        let v = serde_json::to_value(&rec).expect("serialize");
        assert_eq!(
            v,
            json!({
                "id": "abc",
                "name": "Bob",
                "roll": "R1",
                "subjects": [
                    { "name": "Math", "marks": 80 },
                    { "name": "Art", "marks": "" }
                ],
                "total": 80,
                "percentage": 80,
                "grade": "A",
                "createdAt": 1000
            })
        );
    }

    #[test]
    fn set_subjects_rederives() {
        let mut rec = StudentRecord::new("Bob", "R1", vec![Subject::new("Math", Some(95.0))]);
        assert_eq!(rec.grade(), Grade::APlus);
        rec.set_subjects(vec![Subject::new("Math", Some(35.0))]);
        assert_eq!(rec.total(), 35.0);
        assert_eq!(rec.grade(), Grade::F);
    }
}
