//! Configuration loading
//!
//! Resolution order, highest first:
//! 1. Command-line flag
//! 2. Environment variable (both handled by clap in `main.rs`)
//! 3. TOML config file
//! 4. Compiled defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::models::{WorksheetId, WorksheetSet};
use crate::{Error, Result};

pub const DEFAULT_SPREADSHEET_ID: &str = "1A9vyxOShQvSdZIPGdHJBMwD7dGgxE_M5ICEFrNthuTI";
pub const DEFAULT_CREDENTIALS: &str = "service_account.json";
pub const DEFAULT_AUDIT_LOG: &str = "qr_scan_log.txt";
pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DEFAULT_WORKSHEETS: [&str; 4] = ["工作表1", "工作表2", "工作表3", "工作表4"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Document id of the target spreadsheet
    pub spreadsheet_id: String,
    /// Service-account key file
    pub credentials: PathBuf,
    pub audit_log: PathBuf,
    pub worksheets: Vec<String>,
    pub request_timeout_secs: u64,
    /// Spreadsheets collection endpoint of the Sheets v4 API
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.to_string(),
            credentials: PathBuf::from(DEFAULT_CREDENTIALS),
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
            worksheets: DEFAULT_WORKSHEETS.iter().map(|s| s.to_string()).collect(),
            request_timeout_secs: 30,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub spreadsheet_id: Option<String>,
    pub credentials: Option<PathBuf>,
    pub audit_log: Option<PathBuf>,
}

impl Config {
    /// Reads the TOML file when one is given, otherwise starts from defaults.
    ///
    /// Not validated here: overrides may still replace file values, so call
    /// [`Config::validate`] after [`Config::apply`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(id) = overrides.spreadsheet_id {
            self.spreadsheet_id = id;
        }
        if let Some(path) = overrides.credentials {
            self.credentials = path;
        }
        if let Some(path) = overrides.audit_log {
            self.audit_log = path;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(Error::Config("spreadsheet_id must not be empty".to_string()));
        }
        if self.worksheets.iter().all(|name| name.trim().is_empty()) {
            return Err(Error::Config("at least one worksheet must be configured".to_string()));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn worksheet_set(&self) -> WorksheetSet {
        WorksheetSet::new(
            self.worksheets
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty()),
        )
    }

    /// Picks a worksheet from the closed set, falling back to the first configured one.
    pub fn select_worksheet(&self, name: Option<&str>) -> Result<WorksheetId> {
        let set = self.worksheet_set();
        match name {
            Some(name) => set.select(name).ok_or_else(|| {
                let known: Vec<&str> = set.iter().collect();
                Error::Config(format!(
                    "worksheet '{name}' is not configured (choose one of: {})",
                    known.join(", ")
                ))
            }),
            None => set
                .default_worksheet()
                .ok_or_else(|| Error::Config("no worksheets configured".to_string())),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_four_worksheets() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.worksheet_set().iter().count(), 4);
        assert_eq!(config.select_worksheet(None).unwrap().as_str(), "工作表1");
        assert_eq!(config.audit_log, PathBuf::from("qr_scan_log.txt"));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn api_base_url_must_be_http() {
        let config = Config::from_toml_str("api_base_url = \"sheets.local\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_values_fill_in_over_defaults() {
        let config = Config::from_toml_str(
            r#"
            spreadsheet_id = "abc123"
            worksheets = ["Monday", "Tuesday"]
            "#,
        )
        .unwrap();
        assert_eq!(config.spreadsheet_id, "abc123");
        assert_eq!(config.credentials, PathBuf::from(DEFAULT_CREDENTIALS));
        assert_eq!(config.select_worksheet(Some("Tuesday")).unwrap().as_str(), "Tuesday");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("spreadsheet = \"typo\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn overrides_win_over_file() {
        let config = Config::from_toml_str("spreadsheet_id = \"from-file\"")
            .unwrap()
            .apply(Overrides {
                spreadsheet_id: Some("from-cli".to_string()),
                credentials: None,
                audit_log: Some(PathBuf::from("/tmp/scan.log")),
            });
        assert_eq!(config.spreadsheet_id, "from-cli");
        assert_eq!(config.audit_log, PathBuf::from("/tmp/scan.log"));
    }

    #[test]
    fn worksheet_outside_closed_set_is_rejected() {
        let err = Config::default().select_worksheet(Some("Sheet9")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Sheet9"));
        assert!(message.contains("工作表4"));
    }

    #[test]
    fn empty_worksheet_list_fails_validation() {
        let config = Config {
            worksheets: vec!["  ".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn override_repairs_empty_file_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr-checkin.toml");
        std::fs::write(&path, "spreadsheet_id = \"\"\n").unwrap();

        let from_file = Config::load(Some(&path)).unwrap();
        assert!(from_file.clone().validate().is_err());

        let config = from_file.apply(Overrides {
            spreadsheet_id: Some("from-cli".to_string()),
            ..Overrides::default()
        });
        config.validate().unwrap();
        assert_eq!(config.spreadsheet_id, "from-cli");
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = Config::load(Some(Path::new("/nonexistent/qr-checkin.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
