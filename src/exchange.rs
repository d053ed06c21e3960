use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::calc::format_number;
use crate::record::{StudentRecord, Subject};

pub const CSV_HEADER: [&str; 6] = ["Name", "Roll", "Total", "Percentage", "Grade", "Subjects"];

/// JSON export. Same shape as the persisted slot, pretty-printed.
pub fn to_json_pretty(records: &[StudentRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

fn marks_text(s: &Subject) -> String {
    s.marks.map(format_number).unwrap_or_default()
}

fn csv_field(v: &str) -> String {
    format!("\"{}\"", v.replace('"', "\"\""))
}

pub fn to_csv(records: &[StudentRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADER.join(","));
    for r in records {
        let subjects = r
            .subjects()
            .iter()
            .map(|s| format!("{}:{}", s.name, marks_text(s)))
            .collect::<Vec<_>>()
            .join("|");
        let fields = [
            r.name.clone(),
            r.roll.clone(),
            format_number(r.total()),
            format_number(r.percentage()),
            r.grade().to_string(),
            subjects,
        ];
        lines.push(
            fields
                .iter()
                .map(|f| csv_field(f))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

fn subject_rows_html(r: &StudentRecord) -> String {
    r.subjects()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let name = if s.name.is_empty() { "-" } else { s.name.as_str() };
            let marks = s.marks.map(format_number).unwrap_or_else(|| "-".to_string());
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                i + 1,
                escape_html(name),
                marks
            )
        })
        .collect()
}

/// Standalone printable result sheet for one student.
pub fn print_html(r: &StudentRecord) -> String {
    let mut rows = subject_rows_html(r);
    if rows.is_empty() {
        rows = "<tr><td colspan=\"3\">No subjects</td></tr>".to_string();
    }
    let name = escape_html(&r.name);
    let roll = escape_html(&r.roll);
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Result - {name}</title>
<style>
body{{font-family:Segoe UI,Arial,sans-serif;padding:24px;color:#222}}
h1,h2{{margin:0 0 8px}}
table{{width:100%;border-collapse:collapse;margin-top:12px}}
th,td{{border:1px solid #999;padding:6px 8px;text-align:left}}
.grid{{display:grid;grid-template-columns:1fr 1fr;gap:12px}}
.muted{{color:#666}}
</style>
</head><body>
<h1>Student Result</h1>
<div class="grid">
  <div><div class="muted">Name</div><div><strong>{name}</strong></div></div>
  <div><div class="muted">Roll No.</div><div><strong>{roll}</strong></div></div>
</div>
<h2>Subjects</h2>
<table><thead><tr><th>#</th><th>Subject</th><th>Marks</th></tr></thead><tbody>{rows}</tbody></table>
<div class="grid" style="margin-top:12px">
  <div><div class="muted">Total</div><div><strong>{total}</strong></div></div>
  <div><div class="muted">Percentage</div><div><strong>{percentage}%</strong></div></div>
  <div><div class="muted">Grade</div><div><strong>{grade}</strong></div></div>
</div>
</body></html>
"#,
        total = format_number(r.total()),
        percentage = format_number(r.percentage()),
        grade = r.grade(),
    )
}

/// `students-2024-05-01-09-30-00.json`
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("students-{}.json", at.format("%Y-%m-%d-%H-%M-%S"))
}

pub fn write_export(out_path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
    }
    std::fs::write(out_path, contents)
        .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))?;
    Ok(())
}
