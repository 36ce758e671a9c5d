//! Local append-only audit log of accepted submissions

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::AuditLogEntry;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line, creating the file on first use.
    pub fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(Error::LogWrite)?;
        writeln!(file, "{entry}").map_err(Error::LogWrite)
    }

    /// Returns up to `limit` most recent lines, oldest first, each trimmed. Blank lines
    /// count toward the window like any other line.
    ///
    /// `None` means the log file does not exist yet.
    pub fn recent(&self, limit: usize) -> Result<Option<Vec<String>>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::LogRead(err)),
        };

        let lines: Vec<&str> = content.lines().map(str::trim).collect();
        let start = lines.len().saturating_sub(limit);
        Ok(Some(lines[start..].iter().map(|line| line.to_string()).collect()))
    }
}
