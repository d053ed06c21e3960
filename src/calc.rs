use serde::{Serialize, Serializer};
use std::fmt;

use crate::record::Subject;

pub const MAX_MARKS: f64 = 100.0;

/// Bounds a raw mark to `[0, 100]`. Non-finite input is not a mark.
pub fn clamp_marks(x: f64) -> Option<f64> {
    if !x.is_finite() {
        return None;
    }
    let v = x.clamp(0.0, MAX_MARKS);
    // -0.0 survives clamp; store it as plain zero.
    Some(if v == 0.0 { 0.0 } else { v })
}

/// Two-decimal rounding, half away from zero.
pub fn round_2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub total: f64,
    pub percentage: f64,
}

/// A subject counts toward the total when it has a name and a mark.
pub fn is_countable(s: &Subject) -> bool {
    !s.name.trim().is_empty() && s.marks.is_some()
}

pub fn compute_totals(subjects: &[Subject]) -> Totals {
    let mut total = 0.0;
    let mut counted: usize = 0;
    for s in subjects.iter().filter(|s| is_countable(s)) {
        total += s.marks.unwrap_or(0.0);
        counted += 1;
    }
    let percentage = if counted > 0 {
        let max = counted as f64 * MAX_MARKS;
        round_2(total / max * 100.0)
    } else {
        0.0
    };
    Totals { total, percentage }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    APlus,
    A,
    BPlus,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// Badge class the list view paints the grade with.
    pub fn tone(self) -> &'static str {
        match self {
            Grade::APlus | Grade::A => "success",
            Grade::F => "danger",
            _ => "warn",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

const GRADE_LADDER: [(f64, Grade); 6] = [
    (90.0, Grade::APlus),
    (80.0, Grade::A),
    (70.0, Grade::BPlus),
    (60.0, Grade::B),
    (50.0, Grade::C),
    (40.0, Grade::D),
];

pub fn compute_grade(percentage: f64) -> Grade {
    GRADE_LADDER
        .iter()
        .find(|(floor, _)| percentage >= *floor)
        .map(|(_, g)| *g)
        .unwrap_or(Grade::F)
}

/// Integral values are written without a fractional part, matching the
/// number shape front ends already persist.
pub fn serialize_number<S: Serializer>(x: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if x.fract() == 0.0 && x.abs() < 9_007_199_254_740_992.0 {
        serializer.serialize_i64(*x as i64)
    } else {
        serializer.serialize_f64(*x)
    }
}

/// Text form of a number for CSV and print output (`80`, `80.5`).
pub fn format_number(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    format!("{}", x)
}
