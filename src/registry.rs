//! Operations the UI calls. Every entry point except login/status requires
//! an unlocked session, and every mutation is written to disk before the
//! post-mutation view is returned.

use crate::backup;
use crate::calc::{self, Grade};
use crate::gate::{AccessGate, LoginOutcome, SessionState};
use crate::query;
use crate::records::{self, RecordStore, StoreError, StudentRecord};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAX_COURSEWORK_MARK: i32 = 20;
pub const MAX_EXAM_MARK: i32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{0} must not contain commas or line breaks")]
    IllegalCharacter(&'static str),
    #[error("{field} must be a whole number, got {value:?}")]
    NotAnInteger { field: &'static str, value: String },
    #[error("{field} must be between 0 and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i32,
        max: i32,
    },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session is locked; log in first")]
    Locked,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a student with id {0:?} already exists")]
    DuplicateId(String),
    #[error("there are no student records")]
    EmptyStore,
    #[error("change kept in memory but not saved: {0}")]
    Persist(#[source] StoreError),
    #[error("{0:#}")]
    Backup(anyhow::Error),
    #[error("bundle does not contain a readable records file: {0}")]
    BadBundle(#[source] StoreError),
}

/// Raw add-student form. Every field is the text the user typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRecordInput {
    pub id: String,
    pub name: String,
    pub m1: String,
    pub m2: String,
    pub m3: String,
    pub exam: String,
}

fn text_field(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    if t.contains(|c: char| matches!(c, ',' | '\n' | '\r')) {
        return Err(ValidationError::IllegalCharacter(field));
    }
    Ok(t.to_string())
}

fn mark_field(field: &'static str, raw: &str, max: i32) -> Result<i32, ValidationError> {
    let value = raw
        .trim()
        .parse::<i32>()
        .map_err(|_| ValidationError::NotAnInteger {
            field,
            value: raw.to_string(),
        })?;
    if !(0..=max).contains(&value) {
        return Err(ValidationError::OutOfRange { field, value, max });
    }
    Ok(value)
}

impl NewRecordInput {
    pub fn validate(&self) -> Result<StudentRecord, ValidationError> {
        let id = text_field("id", &self.id)?;
        let name = text_field("name", &self.name)?;
        let m1 = mark_field("m1", &self.m1, MAX_COURSEWORK_MARK)?;
        let m2 = mark_field("m2", &self.m2, MAX_COURSEWORK_MARK)?;
        let m3 = mark_field("m3", &self.m3, MAX_COURSEWORK_MARK)?;
        let exam = mark_field("exam", &self.exam, MAX_EXAM_MARK)?;
        Ok(StudentRecord {
            id,
            name,
            coursework: [m1, m2, m3],
            exam,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRow {
    pub id: String,
    pub name: String,
    pub coursework_marks: [i32; records::COURSEWORK_COUNT],
    pub coursework_total: i64,
    pub exam: i32,
    pub overall_total: i64,
    pub percentage: f64,
    pub grade: Grade,
}

impl ViewRow {
    pub fn from_record(r: &StudentRecord) -> Self {
        let stats = calc::derive(r);
        ViewRow {
            id: r.id.clone(),
            name: r.name.clone(),
            coursework_marks: r.coursework,
            coursework_total: stats.coursework_total,
            exam: stats.exam,
            overall_total: stats.overall_total,
            percentage: stats.percentage,
            grade: stats.grade,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsView {
    pub best: ViewRow,
    pub worst: ViewRow,
    pub average_percent: f64,
    pub student_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed { count: usize },
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub data_path: PathBuf,
    pub record_count: usize,
    pub session: SessionState,
    pub dirty: bool,
    pub load_error: Option<String>,
}

pub struct Registry {
    store: RecordStore,
    gate: AccessGate,
    load_error: Option<String>,
}

impl Registry {
    pub fn open(data_path: impl Into<PathBuf>, pin: &str) -> Self {
        let (store, load_error) = RecordStore::open(data_path);
        Registry {
            store,
            gate: AccessGate::new(pin),
            load_error: load_error.map(|e| e.to_string()),
        }
    }

    pub fn login(&mut self, pin: &str) -> LoginOutcome {
        self.gate.login(pin)
    }

    pub fn session_state(&self) -> SessionState {
        self.gate.state()
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            data_path: self.store.path().to_path_buf(),
            record_count: self.store.records().len(),
            session: self.gate.state(),
            dirty: self.store.is_dirty(),
            load_error: self.load_error.clone(),
        }
    }

    fn ensure_unlocked(&self) -> Result<(), RegistryError> {
        if self.gate.is_unlocked() {
            Ok(())
        } else {
            Err(RegistryError::Locked)
        }
    }

    fn rows(&self) -> Vec<ViewRow> {
        self.store.records().iter().map(ViewRow::from_record).collect()
    }

    pub fn list_all(&self) -> Result<Vec<ViewRow>, RegistryError> {
        self.ensure_unlocked()?;
        Ok(self.rows())
    }

    pub fn search(&self, query: &str) -> Result<Vec<ViewRow>, RegistryError> {
        self.ensure_unlocked()?;
        Ok(query::search(self.store.records(), query)
            .into_iter()
            .map(ViewRow::from_record)
            .collect())
    }

    pub fn analytics(&self) -> Result<AnalyticsView, RegistryError> {
        self.ensure_unlocked()?;
        let records = self.store.records();
        let agg = query::aggregate(records).ok_or(RegistryError::EmptyStore)?;
        Ok(AnalyticsView {
            best: ViewRow::from_record(agg.best),
            worst: ViewRow::from_record(agg.worst),
            average_percent: calc::round_off_2_decimals(agg.average_percent),
            student_count: records.len(),
        })
    }

    pub fn add_student(&mut self, input: &NewRecordInput) -> Result<Vec<ViewRow>, RegistryError> {
        self.ensure_unlocked()?;
        let record = input.validate()?;
        if self.store.contains_id(&record.id) {
            return Err(RegistryError::DuplicateId(record.id));
        }

        tracing::info!(id = %record.id, "adding student");
        self.store.add(record);
        self.store.save().map_err(RegistryError::Persist)?;
        Ok(self.rows())
    }

    pub fn remove_student(&mut self, name: &str) -> Result<RemoveOutcome, RegistryError> {
        self.ensure_unlocked()?;
        if name.trim().is_empty() {
            return Err(ValidationError::Empty("name").into());
        }

        let count = self.store.remove_by_name(name);
        if count == 0 {
            tracing::info!(name, "no student matched for removal");
            return Ok(RemoveOutcome::NotFound);
        }
        tracing::info!(name, count, "removed students");
        self.store.save().map_err(RegistryError::Persist)?;
        Ok(RemoveOutcome::Removed { count })
    }

    pub fn export_bundle(&self, out_path: &Path) -> Result<backup::ExportSummary, RegistryError> {
        self.ensure_unlocked()?;
        let summary = backup::export_store_bundle(self.store.records(), out_path)
            .map_err(RegistryError::Backup)?;
        tracing::info!(
            path = %out_path.display(),
            records = summary.record_count,
            sha256 = %summary.sha256,
            "exported store bundle"
        );
        Ok(summary)
    }

    /// Replaces every record with the bundle's contents. A bundle that does
    /// not parse leaves the current store untouched.
    pub fn import_bundle(&mut self, in_path: &Path) -> Result<(String, usize), RegistryError> {
        self.ensure_unlocked()?;
        let imported = backup::import_store_bundle(in_path).map_err(RegistryError::Backup)?;
        let parsed = records::parse_records(&imported.text).map_err(RegistryError::BadBundle)?;
        let count = parsed.records.len();

        self.store.replace_all(parsed.records);
        self.load_error = None;
        tracing::info!(
            path = %in_path.display(),
            format = %imported.bundle_format_detected,
            records = count,
            "imported store bundle"
        );
        self.store.save().map_err(RegistryError::Persist)?;
        Ok((imported.bundle_format_detected, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: &str, name: &str, marks: [&str; 4]) -> NewRecordInput {
        NewRecordInput {
            id: id.to_string(),
            name: name.to_string(),
            m1: marks[0].to_string(),
            m2: marks[1].to_string(),
            m3: marks[2].to_string(),
            exam: marks[3].to_string(),
        }
    }

    fn unlocked(dir: &Path) -> Registry {
        let mut reg = Registry::open(dir.join("studentMarks.txt"), "1701");
        assert_eq!(reg.login("1701"), LoginOutcome::Unlocked);
        reg
    }

    #[test]
    fn validate_rejects_non_numeric_marks() {
        let e = input("1", "Jo", ["1", "two", "3", "4"]).validate().unwrap_err();
        assert_eq!(
            e,
            ValidationError::NotAnInteger {
                field: "m2",
                value: "two".to_string()
            }
        );
    }

    #[test]
    fn validate_rejects_out_of_range_marks() {
        let e = input("1", "Jo", ["21", "0", "0", "0"]).validate().unwrap_err();
        assert_eq!(
            e,
            ValidationError::OutOfRange {
                field: "m1",
                value: 21,
                max: 20
            }
        );
        let e = input("1", "Jo", ["0", "0", "0", "-1"]).validate().unwrap_err();
        assert!(matches!(e, ValidationError::OutOfRange { field: "exam", .. }));
    }

    #[test]
    fn validate_rejects_text_the_file_cannot_hold() {
        assert_eq!(
            input(" ", "Jo", ["0", "0", "0", "0"]).validate().unwrap_err(),
            ValidationError::Empty("id")
        );
        assert_eq!(
            input("1", "Lovelace, Ada", ["0", "0", "0", "0"])
                .validate()
                .unwrap_err(),
            ValidationError::IllegalCharacter("name")
        );
    }

    #[test]
    fn validate_trims_and_parses() {
        let r = input(" 5555 ", " Ada Lovelace ", [" 20", "20 ", "20", "100"])
            .validate()
            .expect("valid");
        assert_eq!(r.id, "5555");
        assert_eq!(r.name, "Ada Lovelace");
        assert_eq!(r.coursework, [20, 20, 20]);
        assert_eq!(r.exam, 100);
    }

    #[test]
    fn locked_registry_rejects_everything_without_mutating() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut reg = Registry::open(dir.path().join("studentMarks.txt"), "1701");

        assert!(matches!(reg.list_all(), Err(RegistryError::Locked)));
        assert!(matches!(reg.search(""), Err(RegistryError::Locked)));
        assert!(matches!(reg.analytics(), Err(RegistryError::Locked)));
        assert!(matches!(
            reg.add_student(&input("5555", "Ada", ["1", "1", "1", "1"])),
            Err(RegistryError::Locked)
        ));
        assert!(matches!(
            reg.remove_student("Ron Herrema"),
            Err(RegistryError::Locked)
        ));
        assert!(matches!(
            reg.export_bundle(&dir.path().join("b.zip")),
            Err(RegistryError::Locked)
        ));
        assert_eq!(reg.status().record_count, 10);

        assert_eq!(reg.login("0000"), LoginOutcome::Rejected);
        assert_eq!(reg.session_state(), SessionState::Locked);
        assert_eq!(reg.login("1701"), LoginOutcome::Unlocked);
        assert_eq!(reg.list_all().expect("list").len(), 10);
    }

    #[test]
    fn seeded_store_lists_ten_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reg = unlocked(dir.path());
        let rows = reg.list_all().expect("list");
        assert_eq!(rows.len(), 10);
        let alan = rows.iter().find(|r| r.id == "8327").expect("8327");
        assert_eq!(alan.percentage, 100.0);
        assert_eq!(alan.grade, Grade::A);
    }

    #[test]
    fn add_persists_and_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut reg = unlocked(dir.path());
        let rows = reg
            .add_student(&input("5555", "Ada Lovelace", ["20", "20", "20", "100"]))
            .expect("add");
        assert_eq!(rows.len(), 11);

        let report = records::load(&dir.path().join("studentMarks.txt")).expect("reload");
        assert_eq!(
            report.records.last(),
            Some(&StudentRecord {
                id: "5555".to_string(),
                name: "Ada Lovelace".to_string(),
                coursework: [20, 20, 20],
                exam: 100,
            })
        );
    }

    #[test]
    fn add_rejects_duplicate_id_and_bad_input_without_mutating() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut reg = unlocked(dir.path());

        let e = reg
            .add_student(&input("8327", "Someone Else", ["1", "1", "1", "1"]))
            .unwrap_err();
        assert!(matches!(e, RegistryError::DuplicateId(id) if id == "8327"));

        let e = reg
            .add_student(&input("7777", "Someone Else", ["1", "1", "x", "1"]))
            .unwrap_err();
        assert!(matches!(e, RegistryError::Validation(_)));

        assert_eq!(reg.list_all().expect("list").len(), 10);
    }

    #[test]
    fn remove_persists_remaining_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("studentMarks.txt");
        let mut reg = unlocked(dir.path());

        assert_eq!(
            reg.remove_student("ron herrema").expect("remove"),
            RemoveOutcome::Removed { count: 1 }
        );
        let report = records::load(&path).expect("reload");
        assert_eq!(report.records.len(), 9);
        assert_eq!(report.declared_count, Some(9));

        assert_eq!(
            reg.remove_student("Ron Herrema").expect("remove again"),
            RemoveOutcome::NotFound
        );
        assert!(matches!(
            reg.remove_student("  "),
            Err(RegistryError::Validation(ValidationError::Empty("name")))
        ));
    }

    #[test]
    fn analytics_reports_best_worst_and_average() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reg = unlocked(dir.path());
        let a = reg.analytics().expect("analytics");
        assert_eq!(a.best.name, "Alan Shearer");
        assert_eq!(a.worst.name, "Gareth Southgate");
        assert_eq!(a.student_count, 10);
        // (46.88+75+89.38+78.75+71.88+46.25+53.75+32.5+100+88.75)/10
        assert_eq!(a.average_percent, 68.31);
    }

    #[test]
    fn analytics_on_empty_store_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("studentMarks.txt");
        std::fs::write(&path, "0\n").expect("write");
        let mut reg = Registry::open(&path, "1701");
        reg.login("1701");
        assert!(matches!(reg.analytics(), Err(RegistryError::EmptyStore)));
    }

    #[test]
    fn failed_save_keeps_the_mutation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut reg = unlocked(dir.path());
        std::fs::create_dir(dir.path().join("studentMarks.txt.saving")).expect("mkdir");

        let e = reg
            .add_student(&input("5555", "Ada Lovelace", ["20", "20", "20", "100"]))
            .unwrap_err();
        assert!(matches!(e, RegistryError::Persist(_)));
        assert!(reg.status().dirty);
        assert_eq!(reg.list_all().expect("list").len(), 11);
    }

    #[test]
    fn export_while_dirty_bundles_memory_not_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut reg = unlocked(dir.path());
        std::fs::create_dir(dir.path().join("studentMarks.txt.saving")).expect("mkdir");

        assert!(matches!(
            reg.remove_student("Ron Herrema"),
            Err(RegistryError::Persist(_))
        ));
        assert!(reg.status().dirty);

        let bundle = dir.path().join("dirty.zip");
        let summary = reg.export_bundle(&bundle).expect("export");
        assert_eq!(summary.record_count, 9);

        let imported = backup::import_store_bundle(&bundle).expect("read bundle");
        let parsed = records::parse_records(&imported.text).expect("parse bundle");
        assert_eq!(parsed.declared_count, Some(9));
        assert_eq!(parsed.records.len(), 9);
        assert!(parsed.records.iter().all(|r| r.name != "Ron Herrema"));
    }

    #[test]
    fn export_after_load_error_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("studentMarks.txt");
        std::fs::write(&path, "1\n1,A,x,2,3,4\n").expect("write");
        let mut reg = Registry::open(&path, "1701");
        reg.login("1701");

        let bundle = dir.path().join("empty.zip");
        assert_eq!(reg.export_bundle(&bundle).expect("export").record_count, 0);
        let (_, count) = reg.import_bundle(&bundle).expect("import");
        assert_eq!(count, 0);
        assert!(reg.status().load_error.is_none());
    }

    #[test]
    fn stored_marks_outside_form_ranges_are_served() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("studentMarks.txt");
        std::fs::write(&path, "2\n1,Big,2147483647,1,0,0\n2,Low,-5,0,0,-11\n").expect("write");
        let mut reg = Registry::open(&path, "1701");
        assert!(reg.status().load_error.is_none());
        reg.login("1701");

        let rows = reg.list_all().expect("list");
        assert_eq!(rows[0].coursework_total, 2_147_483_648);
        assert_eq!(rows[0].overall_total, 2_147_483_648);
        assert_eq!(rows[0].grade, Grade::A);
        assert_eq!(rows[1].overall_total, -16);
        assert_eq!(rows[1].percentage, -10.0);
        assert_eq!(rows[1].grade, Grade::F);

        assert_eq!(reg.search("big").expect("search").len(), 1);
        let a = reg.analytics().expect("analytics");
        assert_eq!(a.best.id, "1");
        assert_eq!(a.worst.id, "2");
    }

    #[test]
    fn load_error_is_reported_in_status() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("studentMarks.txt");
        std::fs::write(&path, "1\n1,A,1,2,three,4\n").expect("write");
        let reg = Registry::open(&path, "1701");
        let status = reg.status();
        assert_eq!(status.record_count, 0);
        assert!(status.load_error.expect("load error").contains("m3"));
    }

    #[test]
    fn import_replaces_store_only_when_bundle_parses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut reg = unlocked(dir.path());

        let bad = dir.path().join("bad.txt");
        std::fs::write(&bad, "1\n1,A,x,2,3,4\n").expect("write");
        assert!(matches!(
            reg.import_bundle(&bad),
            Err(RegistryError::BadBundle(_))
        ));
        assert_eq!(reg.list_all().expect("list").len(), 10);

        let bundle = dir.path().join("backup.zip");
        reg.remove_student("Jo Hyde").expect("remove");
        reg.export_bundle(&bundle).expect("export");
        reg.add_student(&input("5555", "Ada Lovelace", ["20", "20", "20", "100"]))
            .expect("add");

        let (format, count) = reg.import_bundle(&bundle).expect("import");
        assert_eq!(format, backup::BUNDLE_FORMAT_V1);
        assert_eq!(count, 9);
        assert!(reg.search("Ada").expect("search").is_empty());
    }
}
