use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::audit::AuditLog;
use crate::models::{Outcome, ScanRecord, WorksheetId};
use crate::pipeline;
use crate::sheets::Spreadsheet;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub accepted: usize,
    pub duplicates: usize,
    pub log_failures: usize,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    course_name: String,
    student_id: String,
    #[serde(default)]
    student_name: String,
}

/// Submits every CSV row in order. Stops at the first remote failure; rows before it stay
/// appended.
pub async fn import_csv<S: Spreadsheet>(
    sheets: &S,
    audit: &AuditLog,
    csv_path: &Path,
    worksheet: &WorksheetId,
) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("invalid CSV row at line {line}"))?;
        let record = ScanRecord::from_fields(
            &row.course_name,
            &row.student_id,
            &row.student_name,
            worksheet.clone(),
        );

        let outcome = pipeline::submit_record(sheets, audit, &record)
            .await
            .with_context(|| format!("submission failed at line {line}"))?;

        match outcome {
            Outcome::Accepted { log_error, .. } => {
                summary.accepted += 1;
                if log_error.is_some() {
                    summary.log_failures += 1;
                }
            }
            Outcome::RejectedDuplicate { .. } => summary.duplicates += 1,
        }
    }

    Ok(summary)
}
