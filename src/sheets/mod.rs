//! Google Drive/Sheets source layer for sheet-driven imports.
//!
//! Read-only: list the user's spreadsheets, list a spreadsheet's tabs, and
//! read one tab's values as raw import rows. Credentials are a user-scoped
//! OAuth access token held in `SecretString`; only method, path, and status
//! are logged.

pub mod client;

pub use client::{SheetTab, SheetsClient, SpreadsheetInfo};
