use std::fmt;

use chrono::NaiveDateTime;

use crate::parse;

/// Format of every timestamp this tool writes, both to the sheet and to the audit log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A worksheet (tab) name taken from the configured closed set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorksheetId(String);

impl WorksheetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorksheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed list of worksheets a session may target. The first entry is the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetSet {
    names: Vec<String>,
}

impl WorksheetSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { names: unique }
    }

    pub fn select(&self, name: &str) -> Option<WorksheetId> {
        self.names
            .iter()
            .find(|candidate| candidate.as_str() == name)
            .map(|found| WorksheetId(found.clone()))
    }

    pub fn default_worksheet(&self) -> Option<WorksheetId> {
        self.names.first().map(|name| WorksheetId(name.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One scanned or typed entry after cleaning and positional parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    pub raw_text: String,
    pub worksheet: WorksheetId,
    pub course_name: String,
    pub student_id: String,
    pub student_name: String,
}

impl ScanRecord {
    pub fn parse(raw_text: &str, worksheet: WorksheetId) -> Self {
        let [course_name, student_id, student_name] = parse::parse_fields(raw_text);
        Self {
            raw_text: raw_text.to_string(),
            worksheet,
            course_name,
            student_id,
            student_name,
        }
    }

    /// Builds a record from already separated fields (CSV import). Each field gets the
    /// same character cleaning a scanned string would.
    pub fn from_fields(
        course_name: &str,
        student_id: &str,
        student_name: &str,
        worksheet: WorksheetId,
    ) -> Self {
        let course_name = parse::normalize(course_name);
        let student_id = parse::normalize(student_id);
        let student_name = parse::normalize(student_name);
        Self {
            raw_text: format!("{course_name},{student_id},{student_name}"),
            worksheet,
            course_name,
            student_id,
            student_name,
        }
    }
}

/// The four cells appended to a worksheet, in column order A..D.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetRow {
    pub course_name: String,
    pub student_id: String,
    pub student_name: String,
    pub submitted_at: NaiveDateTime,
}

impl WorksheetRow {
    pub fn new(record: &ScanRecord, submitted_at: NaiveDateTime) -> Self {
        Self {
            course_name: record.course_name.clone(),
            student_id: record.student_id.clone(),
            student_name: record.student_name.clone(),
            submitted_at,
        }
    }

    pub fn submitted_at_text(&self) -> String {
        self.submitted_at.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn cells(&self) -> [String; 4] {
        [
            self.course_name.clone(),
            self.student_id.clone(),
            self.student_name.clone(),
            self.submitted_at_text(),
        ]
    }
}

/// Terminal result of a submission that reached the remote store.
#[derive(Debug)]
pub enum Outcome {
    Accepted {
        row: WorksheetRow,
        /// 1-based row the cells were written to
        row_index: u32,
        /// Set when the audit log could not be written; the append still stands
        log_error: Option<crate::Error>,
    },
    RejectedDuplicate {
        student_id: String,
    },
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntry {
    pub logged_at: NaiveDateTime,
    pub worksheet: WorksheetId,
    pub row: WorksheetRow,
}

impl fmt::Display for AuditLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | Sheet: {} | A: {} | B: {} | C: {} | D: {}",
            self.logged_at.format(TIMESTAMP_FORMAT),
            self.worksheet,
            self.row.course_name,
            self.row.student_id,
            self.row.student_name,
            self.row.submitted_at_text()
        )
    }
}
