//! Record QR-code check-ins as rows of a Google Sheets worksheet, refusing student ids the
//! worksheet already holds.

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod scanner;
pub mod sheets;

pub use error::{Error, Result};
