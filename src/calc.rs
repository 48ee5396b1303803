use crate::records::StudentRecord;
use serde::Serialize;
use std::fmt;

/// Coursework (3 x 20) plus exam (100).
pub const OVERALL_OUT_OF: f64 = 160.0;

/// Half-away-from-zero rounding to 2 decimals. Used for derived averages.
pub fn round_off_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Exact percentage of an overall total. `total * 100 / 160` is always a
/// multiple of 1/8, so this is representable without error.
pub fn percentage_of(overall_total: i64) -> f64 {
    overall_total as f64 * 100.0 / OVERALL_OUT_OF
}

/// Percentage rounded to 2 decimals, ties to even on the exact value.
pub fn rounded_percentage(overall_total: i64) -> f64 {
    // hundredths = total * 10_000 / 160 = total * 125 / 2
    let doubled = overall_total * 125;
    let q = doubled.div_euclid(2);
    let hundredths = if doubled.rem_euclid(2) == 1 && q.rem_euclid(2) == 1 {
        q + 1
    } else {
        q
    };
    hundredths as f64 / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Bands are inclusive on their lower bound and checked top-down.
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 70.0 {
            Grade::A
        } else if pct >= 60.0 {
            Grade::B
        } else if pct >= 50.0 {
            Grade::C
        } else if pct >= 40.0 {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStats {
    pub coursework_total: i64,
    pub exam: i32,
    pub overall_total: i64,
    /// Rounded to 2 decimals.
    pub percentage: f64,
    pub grade: Grade,
}

/// The grade is taken from the unrounded percentage; only the reported
/// percentage is rounded. Stored marks are not range-checked, so totals are
/// widened before summing.
pub fn derive(record: &StudentRecord) -> RecordStats {
    let coursework_total: i64 = record.coursework.iter().map(|&m| i64::from(m)).sum();
    let overall_total = coursework_total + i64::from(record.exam);
    RecordStats {
        coursework_total,
        exam: record.exam,
        overall_total,
        percentage: rounded_percentage(overall_total),
        grade: Grade::from_percentage(percentage_of(overall_total)),
    }
}
