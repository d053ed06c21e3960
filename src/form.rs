use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::calc;
use crate::error::{FieldError, SubmitError, ValidationError};
use crate::record::{self, StudentRecord, Subject};
use crate::store::{StudentPatch, Store};

/// One subject row as typed into the entry form. `marks` is whatever the
/// input widget held: a number, a numeric string, or blank.
#[derive(Debug, Clone, Default)]
pub struct SubjectInput {
    pub name: Value,
    pub marks: Value,
}

/// Raw entry form. Fields stay loose so a null or numeric field reaches
/// validation as empty or as text instead of failing to parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentForm {
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub roll: Value,
    #[serde(default)]
    pub subjects: Value,
}

impl StudentForm {
    pub fn name_text(&self) -> String {
        record::coerce_text(Some(&self.name))
    }

    pub fn roll_text(&self) -> String {
        record::coerce_text(Some(&self.roll))
    }

    /// Anything but an array has no rows; a non-object row reads as blank.
    pub fn subject_rows(&self) -> Vec<SubjectInput> {
        let Value::Array(items) = &self.subjects else {
            return Vec::new();
        };
        items
            .iter()
            .map(|v| SubjectInput {
                name: v.get("name").cloned().unwrap_or_default(),
                marks: v.get("marks").cloned().unwrap_or_default(),
            })
            .collect()
    }
}

fn parse_form_marks(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Turns form rows into subjects. Rows with neither a name nor a mark are
/// dropped; marks are clamped.
pub fn subjects_from_form(rows: &[SubjectInput]) -> Vec<Subject> {
    rows.iter()
        .filter_map(|row| {
            let name = record::coerce_text(Some(&row.name));
            let marks = parse_form_marks(&row.marks).and_then(calc::clamp_marks);
            if name.is_empty() && marks.is_none() {
                None
            } else {
                Some(Subject { name, marks })
            }
        })
        .collect()
}

pub fn validate_form(
    store: &Store,
    name: &str,
    roll: &str,
    subjects: &[Subject],
    editing_id: Option<&str>,
) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push(FieldError {
            field: "name",
            message: "Name is required.",
        });
    }
    if roll.trim().is_empty() {
        errors.push(FieldError {
            field: "roll",
            message: "Roll number is required and must be unique.",
        });
    } else if !store.is_roll_unique(roll, editing_id) {
        errors.push(FieldError {
            field: "roll",
            message: "This roll number already exists.",
        });
    }
    if subjects.is_empty() {
        errors.push(FieldError {
            field: "subjects",
            message: "Please add at least one subject or marks.",
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { errors })
    }
}

/// Validates the form and creates a record, or edits `editing_id` in place.
/// On any error the store is left untouched.
pub fn submit(
    store: &mut Store,
    form: &StudentForm,
    editing_id: Option<&str>,
) -> Result<StudentRecord, SubmitError> {
    let name = form.name_text();
    let roll = form.roll_text();
    let subjects = subjects_from_form(&form.subject_rows());

    if let Some(id) = editing_id {
        if store.find_by_id(id).is_none() {
            return Err(SubmitError::NotFound(id.to_string()));
        }
    }
    validate_form(store, &name, &roll, &subjects, editing_id)?;

    match editing_id {
        Some(id) => {
            let patch = StudentPatch {
                name: Some(name),
                roll: Some(roll),
                subjects: Some(subjects),
            };
            store.update(id, patch);
            let rec = store
                .find_by_id(id)
                .cloned()
                .ok_or_else(|| SubmitError::NotFound(id.to_string()))?;
            info!(id = %rec.id, roll = %rec.roll, "student updated");
            Ok(rec)
        }
        None => {
            let rec = StudentRecord::new(name, roll, subjects);
            info!(id = %rec.id, roll = %rec.roll, "student created");
            store.add(rec.clone());
            Ok(rec)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::Grade;
    use serde_json::json;

    fn form(v: serde_json::Value) -> StudentForm {
        serde_json::from_value(v).expect("form")
    }

    #[test]
    fn form_rows_drop_blank_and_clamp() {
        let f = form(json!({
            "name": "Bob",
            "roll": "R1",
            "subjects": [
                { "name": "Math", "marks": "105" },
                { "name": "", "marks": "" },
                { "name": "Art", "marks": "" },
                { "name": "", "marks": 40 },
                { "name": "Music", "marks": "abc" }
            ]
        }));
        let subjects = subjects_from_form(&f.subject_rows());
        assert_eq!(
            subjects,
            vec![
                Subject::new("Math", Some(100.0)),
                Subject::new("Art", None),
                Subject::new("", Some(40.0)),
                Subject::new("Music", None),
            ]
        );
    }

    #[test]
    fn submit_creates_graded_record() {
        let mut store = Store::default();
        let f = form(json!({
            "name": " Alexa Roy ",
            "roll": "R9",
            "subjects": [
                { "name": "Math", "marks": 80 },
                { "name": "Science", "marks": "70" },
                { "name": "English", "marks": 90 }
            ]
        }));
        let rec = submit(&mut store, &f, None).expect("created");
        assert_eq!(rec.name, "Alexa Roy");
        assert_eq!(rec.total(), 240.0);
        assert_eq!(rec.grade(), Grade::A);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn submit_reports_every_failing_field_and_changes_nothing() {
        let mut store = Store::default();
        let err = submit(&mut store, &form(json!({ "name": " ", "roll": "" })), None)
            .expect_err("invalid");
        let SubmitError::Validation(v) = err else {
            panic!("expected validation error");
        };
        assert!(v.has_field("name"));
        assert!(v.has_field("roll"));
        assert!(v.has_field("subjects"));
        assert!(store.is_empty());
    }

    #[test]
    fn null_and_numeric_fields_reach_validation() {
        let mut store = Store::default();
        let f = form(json!({ "name": null, "roll": false, "subjects": null }));
        let err = submit(&mut store, &f, None).expect_err("invalid");
        let SubmitError::Validation(v) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = v.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "roll", "subjects"]);
        assert!(store.is_empty());

        let f = form(json!({
            "name": "Bob",
            "roll": 7,
            "subjects": [{ "name": 3, "marks": "40" }, "junk", { "name": null, "marks": null }]
        }));
        let rec = submit(&mut store, &f, None).expect("created");
        assert_eq!(rec.roll, "7");
        assert_eq!(rec.subjects(), &[Subject::new("3", Some(40.0))][..]);
    }

    #[test]
    fn duplicate_roll_blocks_create_but_not_self_edit() {
        let mut store = Store::default();
        let first = submit(
            &mut store,
            &form(json!({ "name": "Alexa", "roll": "R01", "subjects": [{ "name": "Math", "marks": 50 }] })),
            None,
        )
        .expect("created");

        let dup = form(json!({ "name": "Bob", "roll": "r01", "subjects": [{ "name": "Math", "marks": 60 }] }));
        let err = submit(&mut store, &dup, None).expect_err("duplicate");
        match err {
            SubmitError::Validation(v) => {
                assert_eq!(v.errors[0].message, "This roll number already exists.")
            }
            other => panic!("unexpected {other:?}"),
        }

        let edited = submit(&mut store, &dup, Some(&first.id)).expect("self edit");
        assert_eq!(edited.id, first.id);
        assert_eq!(edited.created_at, first.created_at);
        assert_eq!(edited.name, "Bob");
        assert_eq!(edited.percentage(), 60.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn editing_unknown_id_is_not_found() {
        let mut store = Store::default();
        let f = form(json!({ "name": "Bob", "roll": "R1", "subjects": [{ "name": "Math", "marks": 1 }] }));
        assert!(matches!(
            submit(&mut store, &f, Some("nope")),
            Err(SubmitError::NotFound(_))
        ));
    }
}
