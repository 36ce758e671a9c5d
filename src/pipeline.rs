//! The duplicate-guarded append: parse, check column B, append at the next row, audit.
//!
//! Nothing here locks the worksheet. Two submissions racing between the duplicate read
//! and the cell writes can both append.

use chrono::Local;

use crate::audit::AuditLog;
use crate::models::{AuditLogEntry, Outcome, ScanRecord, WorksheetId, WorksheetRow};
use crate::sheets::{Spreadsheet, Worksheet};
use crate::{Error, Result};

/// Column holding the student id, the duplicate key.
pub const STUDENT_ID_COLUMN: u32 = 2;

pub async fn submit<S: Spreadsheet>(
    sheets: &S,
    audit: &AuditLog,
    raw_text: &str,
    worksheet: &WorksheetId,
) -> Result<Outcome> {
    let record = ScanRecord::parse(raw_text, worksheet.clone());
    submit_record(sheets, audit, &record).await
}

pub async fn submit_record<S: Spreadsheet>(
    sheets: &S,
    audit: &AuditLog,
    record: &ScanRecord,
) -> Result<Outcome> {
    let sheet = sheets.open_worksheet(&record.worksheet).await?;
    let submitted_at = Local::now().naive_local();

    let student_id = record.student_id.trim();
    let existing = sheet.read_column(STUDENT_ID_COLUMN).await?;
    if existing
        .iter()
        .any(|value| !value.is_empty() && value.trim() == student_id)
    {
        tracing::warn!(
            worksheet = %record.worksheet,
            student_id = %student_id,
            "Duplicate entry prevented"
        );
        return Ok(Outcome::RejectedDuplicate {
            student_id: student_id.to_string(),
        });
    }

    let rows = sheet.read_all_rows().await?;
    let row_index = rows.len() as u32 + 1;
    let row = WorksheetRow::new(record, submitted_at);

    for (written, value) in (0u32..).zip(row.cells().iter()) {
        if let Err(err) = sheet.write_cell(row_index, written + 1, value).await {
            if written == 0 {
                return Err(err);
            }
            tracing::warn!(
                worksheet = %record.worksheet,
                row = row_index,
                written,
                "Cell write failed after partial row"
            );
            return Err(Error::PartialWrite {
                row: row_index,
                written,
                source: Box::new(err),
            });
        }
    }

    tracing::info!(
        worksheet = %record.worksheet,
        row = row_index,
        student_id = %row.student_id,
        "Row appended"
    );

    let entry = AuditLogEntry {
        logged_at: Local::now().naive_local(),
        worksheet: record.worksheet.clone(),
        row: row.clone(),
    };
    let log_error = match audit.append(&entry) {
        Ok(()) => None,
        Err(err) => {
            tracing::warn!(path = %audit.path().display(), error = %err, "Audit log write failed");
            Some(err)
        }
    };

    Ok(Outcome::Accepted {
        row,
        row_index,
        log_error,
    })
}
