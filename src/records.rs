use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const COURSEWORK_COUNT: usize = 3;

/// `id,name,m1,m2,m3,exam`
const FIELDS_PER_ROW: usize = 2 + COURSEWORK_COUNT + 1;

/// Default dataset written when no store file exists yet. Kept byte-for-byte
/// compatible with files written by earlier releases (no trailing newline).
pub const SEED_DATA: &str = "10\n\
1345,John Curry,8,15,7,45\n\
2345,Sam Sturtivant,14,15,14,77\n\
9876,Lee Scott,17,11,16,99\n\
3724,Matt Thompson,19,11,15,81\n\
1212,Ron Herrema,14,17,18,66\n\
8439,Jake Hobbs,10,11,10,43\n\
2344,Jo Hyde,6,15,10,55\n\
9384,Gareth Southgate,5,6,8,33\n\
8327,Alan Shearer,20,20,20,100\n\
2983,Les Ferdinand,15,17,18,92";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub coursework: [i32; COURSEWORK_COUNT],
    pub exam: i32,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {field} is not an integer: {value:?}")]
    BadNumber {
        line: usize,
        field: &'static str,
        value: String,
    },
}

impl StoreError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of parsing one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowParse {
    Record(StudentRecord),
    /// Wrong number of fields; ignored by the loader.
    Skipped,
    BadNumber { field: &'static str, value: String },
}

pub fn parse_row(line: &str) -> RowParse {
    let parts: Vec<&str> = line.trim().split(',').collect();
    if parts.len() != FIELDS_PER_ROW {
        return RowParse::Skipped;
    }

    let mut numbers = [0_i32; COURSEWORK_COUNT + 1];
    let labels = ["m1", "m2", "m3", "exam"];
    for (slot, (raw, field)) in numbers.iter_mut().zip(parts[2..].iter().zip(labels)) {
        match raw.trim().parse::<i32>() {
            Ok(n) => *slot = n,
            Err(_) => {
                return RowParse::BadNumber {
                    field,
                    value: raw.to_string(),
                }
            }
        }
    }

    RowParse::Record(StudentRecord {
        id: parts[0].to_string(),
        name: parts[1].to_string(),
        coursework: [numbers[0], numbers[1], numbers[2]],
        exam: numbers[3],
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    /// Header count. Advisory only; `records.len()` is authoritative.
    pub declared_count: Option<usize>,
    pub records: Vec<StudentRecord>,
    pub skipped_rows: usize,
}

pub fn parse_records(text: &str) -> Result<ParsedFile, StoreError> {
    let mut lines = text.lines();
    let declared_count = lines
        .next()
        .and_then(|header| header.trim().parse::<usize>().ok());

    let mut records = Vec::new();
    let mut skipped_rows = 0;
    for (idx, line) in lines.enumerate() {
        match parse_row(line) {
            RowParse::Record(r) => records.push(r),
            RowParse::Skipped => {
                if !line.trim().is_empty() {
                    tracing::debug!(line = idx + 2, "skipping malformed row");
                }
                skipped_rows += 1;
            }
            RowParse::BadNumber { field, value } => {
                return Err(StoreError::BadNumber {
                    line: idx + 2,
                    field,
                    value,
                })
            }
        }
    }

    Ok(ParsedFile {
        declared_count,
        records,
        skipped_rows,
    })
}

pub fn render_records(records: &[StudentRecord]) -> String {
    let mut out = format!("{}\n", records.len());
    for r in records {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            r.id, r.name, r.coursework[0], r.coursework[1], r.coursework[2], r.exam
        ));
    }
    out
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub records: Vec<StudentRecord>,
    pub declared_count: Option<usize>,
    pub skipped_rows: usize,
    pub seeded: bool,
}

pub fn load(path: &Path) -> Result<LoadReport, StoreError> {
    let seeded = !path.exists();
    if seeded {
        tracing::info!(path = %path.display(), "no store file found, writing seed dataset");
        std::fs::write(path, SEED_DATA).map_err(|e| StoreError::io("seed", path, e))?;
    }

    let bytes = std::fs::read(path).map_err(|e| StoreError::io("read", path, e))?;
    let parsed = parse_records(&String::from_utf8_lossy(&bytes))?;

    if let Some(declared) = parsed.declared_count {
        if declared != parsed.records.len() {
            tracing::warn!(
                declared,
                parsed = parsed.records.len(),
                "store header count does not match parsed rows"
            );
        }
    }
    warn_duplicate_ids(&parsed.records);

    Ok(LoadReport {
        records: parsed.records,
        declared_count: parsed.declared_count,
        skipped_rows: parsed.skipped_rows,
        seeded,
    })
}

/// Rewrites the whole file. Data goes to a sibling temp file first and is
/// renamed over the target.
pub fn save(path: &Path, records: &[StudentRecord]) -> Result<(), StoreError> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".saving");
    let tmp = PathBuf::from(tmp_name);

    let mut f = std::fs::File::create(&tmp).map_err(|e| StoreError::io("create", &tmp, e))?;
    f.write_all(render_records(records).as_bytes())
        .and_then(|_| f.sync_all())
        .map_err(|e| StoreError::io("write", &tmp, e))?;
    drop(f);

    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        StoreError::io("replace", path, e)
    })
}

fn warn_duplicate_ids(records: &[StudentRecord]) {
    let mut seen = HashSet::new();
    for r in records {
        if !seen.insert(r.id.as_str()) {
            tracing::warn!(id = %r.id, "duplicate student id in store file");
        }
    }
}

pub struct RecordStore {
    path: PathBuf,
    records: Vec<StudentRecord>,
    dirty: bool,
}

impl RecordStore {
    /// Loads `path`, falling back to an empty collection when the file cannot
    /// be parsed. The load error is handed back so the caller can surface it.
    pub fn open(path: impl Into<PathBuf>) -> (Self, Option<StoreError>) {
        let path = path.into();
        match load(&path) {
            Ok(report) => {
                tracing::info!(
                    path = %path.display(),
                    records = report.records.len(),
                    skipped = report.skipped_rows,
                    seeded = report.seeded,
                    "store loaded"
                );
                (
                    RecordStore {
                        path,
                        records: report.records,
                        dirty: false,
                    },
                    None,
                )
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "store load failed, starting empty"
                );
                (
                    RecordStore {
                        path,
                        records: Vec::new(),
                        dirty: false,
                    },
                    Some(e),
                )
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    /// True when memory holds changes the last save failed to write.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn add(&mut self, record: StudentRecord) {
        self.records.push(record);
    }

    pub fn remove_by_name(&mut self, name: &str) -> usize {
        let wanted = name.to_lowercase();
        let before = self.records.len();
        self.records.retain(|r| r.name.to_lowercase() != wanted);
        before - self.records.len()
    }

    pub fn replace_all(&mut self, records: Vec<StudentRecord>) {
        self.records = records;
    }

    /// Persists the collection. On failure memory is kept as-is and the store
    /// is flagged dirty.
    pub fn save(&mut self) -> Result<(), StoreError> {
        match save(&self.path, &self.records) {
            Ok(()) => {
                self.dirty = false;
                tracing::debug!(
                    path = %self.path.display(),
                    records = self.records.len(),
                    "store saved"
                );
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                tracing::error!(error = %e, "store save failed; in-memory state is ahead of disk");
                Err(e)
            }
        }
    }
}
