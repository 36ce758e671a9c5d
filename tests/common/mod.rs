#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Barrier;

use qr_sheet_checkin::models::{WorksheetId, WorksheetSet};
use qr_sheet_checkin::sheets::{Spreadsheet, Worksheet};
use qr_sheet_checkin::{Error, Result};

pub const WORKSHEETS: [&str; 4] = ["工作表1", "工作表2", "工作表3", "工作表4"];

pub fn worksheet(name: &str) -> WorksheetId {
    WorksheetSet::new(WORKSHEETS)
        .select(name)
        .expect("test worksheet is configured")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    pub worksheet: String,
    pub row: u32,
    pub column: u32,
    pub value: String,
}

#[derive(Default)]
struct State {
    sheets: HashMap<String, Vec<Vec<String>>>,
    writes: Vec<CellWrite>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    reject_credentials: bool,
    /// Writes after this many successful ones fail
    fail_after_writes: Option<usize>,
    /// Held after the duplicate-key read has taken its snapshot
    column_gate: Option<Barrier>,
    /// Held after the row-count read has taken its snapshot
    rows_gate: Option<Barrier>,
}

/// In-memory stand-in for the remote document. Only titles passed to `new` exist.
#[derive(Clone)]
pub struct MemorySpreadsheet {
    inner: Arc<Inner>,
}

impl MemorySpreadsheet {
    pub fn new(titles: &[&str]) -> Self {
        Self::build(titles, Inner::default())
    }

    fn build(titles: &[&str], mut inner: Inner) -> Self {
        let state = inner.state.get_mut().unwrap();
        for title in titles {
            state.sheets.insert(title.to_string(), Vec::new());
        }
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn with_rejected_credentials(titles: &[&str]) -> Self {
        Self::build(
            titles,
            Inner {
                reject_credentials: true,
                ..Inner::default()
            },
        )
    }

    pub fn failing_after_writes(titles: &[&str], successful: usize) -> Self {
        Self::build(
            titles,
            Inner {
                fail_after_writes: Some(successful),
                ..Inner::default()
            },
        )
    }

    /// Two submissions both pass the duplicate read before either writes.
    pub fn with_duplicate_read_gate(titles: &[&str]) -> Self {
        Self::build(
            titles,
            Inner {
                column_gate: Some(Barrier::new(2)),
                ..Inner::default()
            },
        )
    }

    /// Two submissions both count rows before either writes.
    pub fn with_row_count_gate(titles: &[&str]) -> Self {
        Self::build(
            titles,
            Inner {
                rows_gate: Some(Barrier::new(2)),
                ..Inner::default()
            },
        )
    }

    pub fn seed(&self, title: &str, rows: &[&[&str]]) {
        let mut state = self.inner.state.lock().unwrap();
        let sheet = state.sheets.get_mut(title).expect("seeded worksheet exists");
        for row in rows {
            sheet.push(row.iter().map(|cell| cell.to_string()).collect());
        }
    }

    pub fn rows(&self, title: &str) -> Vec<Vec<String>> {
        let state = self.inner.state.lock().unwrap();
        trimmed_rows(&state.sheets[title])
    }

    pub fn writes(&self) -> Vec<CellWrite> {
        self.inner.state.lock().unwrap().writes.clone()
    }
}

fn trimmed_rows(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut rows = rows.to_vec();
    while rows
        .last()
        .is_some_and(|row| row.iter().all(|cell| cell.is_empty()))
    {
        rows.pop();
    }
    rows
}

pub struct MemoryWorksheet {
    inner: Arc<Inner>,
    title: String,
}

impl Spreadsheet for MemorySpreadsheet {
    type Worksheet = MemoryWorksheet;

    async fn open_worksheet(&self, worksheet: &WorksheetId) -> Result<MemoryWorksheet> {
        if self.inner.reject_credentials {
            return Err(Error::Authentication("invalid_grant: account disabled".to_string()));
        }
        let state = self.inner.state.lock().unwrap();
        if !state.sheets.contains_key(worksheet.as_str()) {
            return Err(Error::WorksheetNotFound(worksheet.to_string()));
        }
        Ok(MemoryWorksheet {
            inner: Arc::clone(&self.inner),
            title: worksheet.to_string(),
        })
    }
}

impl Worksheet for MemoryWorksheet {
    async fn read_column(&self, column: u32) -> Result<Vec<String>> {
        let mut values: Vec<String> = {
            let state = self.inner.state.lock().unwrap();
            state.sheets[&self.title]
                .iter()
                .map(|row| row.get(column as usize - 1).cloned().unwrap_or_default())
                .collect()
        };
        while values.last().is_some_and(|value| value.is_empty()) {
            values.pop();
        }
        if let Some(gate) = &self.inner.column_gate {
            gate.wait().await;
        }
        Ok(values)
    }

    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        let rows = {
            let state = self.inner.state.lock().unwrap();
            trimmed_rows(&state.sheets[&self.title])
        };
        if let Some(gate) = &self.inner.rows_gate {
            gate.wait().await;
        }
        Ok(rows)
    }

    async fn write_cell(&self, row: u32, column: u32, value: &str) -> Result<()> {
        let mut state = self.inner.state.lock().unwrap();
        if let Some(limit) = self.inner.fail_after_writes {
            if state.writes.len() >= limit {
                return Err(Error::Network("connection reset by peer".to_string()));
            }
        }

        let sheet = state.sheets.get_mut(&self.title).expect("opened worksheet exists");
        let (row_idx, col_idx) = (row as usize - 1, column as usize - 1);
        if sheet.len() <= row_idx {
            sheet.resize(row_idx + 1, Vec::new());
        }
        let cells = &mut sheet[row_idx];
        if cells.len() <= col_idx {
            cells.resize(col_idx + 1, String::new());
        }
        cells[col_idx] = value.to_string();

        state.writes.push(CellWrite {
            worksheet: self.title.clone(),
            row,
            column,
            value: value.to_string(),
        });
        Ok(())
    }
}
