//! Remote spreadsheet access
//!
//! The pipeline only sees the [`Spreadsheet`] and [`Worksheet`] traits. [`GoogleSheets`]
//! implements them against the Google Sheets v4 REST API.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::json;

use crate::auth::ServiceAccountKey;
use crate::config::Config;
use crate::models::WorksheetId;
use crate::{Error, Result};

const USER_AGENT: &str = concat!("qr-checkin/", env!("CARGO_PKG_VERSION"));
/// Same input mode a person typing into the sheet gets, so timestamps become dates.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

/// A spreadsheet document that can hand out worksheet handles.
#[allow(async_fn_in_trait)]
pub trait Spreadsheet {
    type Worksheet: Worksheet;

    /// Authenticates and selects the named worksheet.
    async fn open_worksheet(&self, worksheet: &WorksheetId) -> Result<Self::Worksheet>;
}

/// One worksheet of an opened document. Rows and columns are 1-based.
#[allow(async_fn_in_trait)]
pub trait Worksheet {
    async fn read_column(&self, column: u32) -> Result<Vec<String>>;
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>>;
    async fn write_cell(&self, row: u32, column: u32, value: &str) -> Result<()>;
}

/// Converts a 1-based column index to its letter form (1 -> A, 27 -> AA).
///
/// Panics on 0, which has no A1 form.
pub fn column_letter(column: u32) -> String {
    assert!(column >= 1, "column indices are 1-based, got 0");
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quotes a worksheet title for use in A1 notation.
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

pub fn column_range(title: &str, column: u32) -> String {
    let letter = column_letter(column);
    format!("{}!{letter}:{letter}", quote_title(title))
}

/// Panics on a 0 row or column.
pub fn cell_range(title: &str, row: u32, column: u32) -> String {
    assert!(row >= 1, "row indices are 1-based, got 0");
    format!("{}!{}{row}", quote_title(title), column_letter(column))
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// Maps a non-success response to the error taxonomy.
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        401 | 403 => Error::Authentication(format!("{what}: {status} {message}")),
        404 => Error::WorksheetNotFound(format!("{what}: {message}")),
        code => Error::Api {
            status: code,
            message,
        },
    })
}

/// Google Sheets client. Holds no token: each [`Spreadsheet::open_worksheet`] reads the
/// credentials file and authenticates again.
pub struct GoogleSheets {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    credentials: PathBuf,
}

impl GoogleSheets {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            credentials: config.credentials.clone(),
        })
    }

    fn document_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id)
        )
    }
}

impl Spreadsheet for GoogleSheets {
    type Worksheet = GoogleWorksheet;

    async fn open_worksheet(&self, worksheet: &WorksheetId) -> Result<GoogleWorksheet> {
        let key = ServiceAccountKey::from_file(&self.credentials)?;
        let token = key.access_token(&self.http).await?;

        let url = format!("{}?fields=sheets.properties.title", self.document_url());
        tracing::debug!(spreadsheet = %self.spreadsheet_id, "Fetching spreadsheet metadata");

        let response = self.http.get(&url).bearer_auth(&token).send().await?;
        let response = check_status(
            response,
            &format!("spreadsheet {}", self.spreadsheet_id),
        )
        .await?;
        let metadata: SpreadsheetMetadata = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("unreadable spreadsheet metadata: {e}")))?;

        let found = metadata
            .sheets
            .iter()
            .any(|sheet| sheet.properties.title == worksheet.as_str());
        if !found {
            return Err(Error::WorksheetNotFound(worksheet.to_string()));
        }

        Ok(GoogleWorksheet {
            http: self.http.clone(),
            token,
            values_url: format!("{}/values", self.document_url()),
            title: worksheet.as_str().to_string(),
        })
    }
}

#[derive(Debug)]
pub struct GoogleWorksheet {
    http: reqwest::Client,
    token: String,
    values_url: String,
    title: String,
}

impl GoogleWorksheet {
    fn range_url(&self, range: &str) -> String {
        format!("{}/{}", self.values_url, urlencoding::encode(range))
    }

    async fn get_values(&self, range: &str, major_dimension: &str) -> Result<Vec<Vec<String>>> {
        tracing::debug!(range = %range, "Reading values");

        let response = self
            .http
            .get(self.range_url(range))
            .query(&[("majorDimension", major_dimension)])
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = check_status(response, &format!("worksheet {}", self.title)).await?;
        let body: ValueRange = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("unreadable values response: {e}")))?;
        Ok(body.values)
    }
}

impl Worksheet for GoogleWorksheet {
    async fn read_column(&self, column: u32) -> Result<Vec<String>> {
        let mut columns = self
            .get_values(&column_range(&self.title, column), "COLUMNS")
            .await?;
        Ok(if columns.is_empty() {
            Vec::new()
        } else {
            columns.swap_remove(0)
        })
    }

    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        self.get_values(&quote_title(&self.title), "ROWS").await
    }

    async fn write_cell(&self, row: u32, column: u32, value: &str) -> Result<()> {
        let range = cell_range(&self.title, row, column);
        tracing::debug!(range = %range, "Writing cell");

        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [[value]],
        });
        let response = self
            .http
            .put(self.range_url(&range))
            .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        check_status(response, &format!("worksheet {}", self.title)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(2), "B");
        assert_eq!(column_letter(4), "D");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    #[should_panic(expected = "1-based")]
    fn column_zero_is_rejected() {
        column_letter(0);
    }

    #[test]
    #[should_panic(expected = "1-based")]
    fn row_zero_is_rejected() {
        cell_range("工作表1", 0, 1);
    }

    #[test]
    fn ranges_quote_titles() {
        assert_eq!(column_range("工作表1", 2), "'工作表1'!B:B");
        assert_eq!(cell_range("Bob's sheet", 7, 4), "'Bob''s sheet'!D7");
    }

    #[test]
    fn empty_value_range_has_no_values() {
        let body: ValueRange =
            serde_json::from_str(r#"{"range": "'工作表1'!B1:B1000", "majorDimension": "COLUMNS"}"#)
                .unwrap();
        assert!(body.values.is_empty());
    }

    #[test]
    fn metadata_lists_titles() {
        let metadata: SpreadsheetMetadata = serde_json::from_str(
            r#"{"sheets": [{"properties": {"title": "工作表1"}}, {"properties": {"title": "工作表2"}}]}"#,
        )
        .unwrap();
        let titles: Vec<&str> = metadata
            .sheets
            .iter()
            .map(|s| s.properties.title.as_str())
            .collect();
        assert_eq!(titles, vec!["工作表1", "工作表2"]);
    }
}
