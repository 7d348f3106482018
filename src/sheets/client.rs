//! Google Drive/Sheets read client.

use std::sync::Arc;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::error::AppError;
use crate::import::source::rows_from_values;
use crate::import::RawRow;

/// Default Google Drive API base URL.
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com";

/// Default Google Sheets API base URL.
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Drive query selecting non-trashed spreadsheets.
const SPREADSHEET_QUERY: &str =
    "mimeType='application/vnd.google-apps.spreadsheet' and trashed=false";

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// One spreadsheet from the user's Drive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub modified_time: Option<String>,
}

/// One tab within a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetTab {
    #[serde(default)]
    pub sheet_id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub index: Option<u32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DriveFilesResponse {
    #[serde(default)]
    files: Vec<SpreadsheetInfo>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetTab,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Google API error envelope (the fields we act on).
#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: Option<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// SheetsClient
// ─────────────────────────────────────────────────────────────────────────────

/// Read client for the Google Drive and Sheets APIs.
#[derive(Clone)]
pub struct SheetsClient {
    client: Arc<Client>,
    drive_base_url: Url,
    sheets_base_url: Url,
    token: Arc<SecretString>,
}

impl SheetsClient {
    /// Creates a client against the production Google endpoints.
    pub fn new(client: Arc<Client>, token: SecretString) -> Self {
        Self::with_base_urls(client, token, DEFAULT_DRIVE_BASE_URL, DEFAULT_SHEETS_BASE_URL)
            .expect("default Google base URLs are valid")
    }

    /// Creates a client against explicit base URLs (used by tests).
    pub fn with_base_urls(
        client: Arc<Client>,
        token: SecretString,
        drive_base_url: &str,
        sheets_base_url: &str,
    ) -> Result<Self, AppError> {
        let drive_base_url = Url::parse(drive_base_url)
            .map_err(|e| AppError::Internal(format!("Invalid Drive base URL: {}", e)))?;
        let sheets_base_url = Url::parse(sheets_base_url)
            .map_err(|e| AppError::Internal(format!("Invalid Sheets base URL: {}", e)))?;
        Ok(Self {
            client,
            drive_base_url,
            sheets_base_url,
            token: Arc::new(token),
        })
    }

    /// Lists the user's spreadsheets, most recently modified first.
    pub async fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetInfo>, AppError> {
        let url = self
            .drive_base_url
            .join("/drive/v3/files")
            .map_err(|e| AppError::Internal(format!("Failed to build Drive URL: {}", e)))?;

        info!("[SHEETS] GET /drive/v3/files");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .query(&[
                ("q", SPREADSHEET_QUERY),
                ("orderBy", "modifiedTime desc"),
                ("pageSize", "25"),
                ("fields", "files(id,name,modifiedTime)"),
            ])
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("Drive list failed: {}", e)))?;

        let status = response.status();
        info!("[SHEETS] GET /drive/v3/files -> {}", status.as_u16());

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        let files: DriveFilesResponse = response
            .json()
            .await
            .map_err(|e| AppError::GoogleApi(format!("Failed to parse file list: {}", e)))?;

        Ok(files.files)
    }

    /// Lists the tabs of one spreadsheet.
    pub async fn list_sheet_tabs(&self, spreadsheet_id: &str) -> Result<Vec<SheetTab>, AppError> {
        let mut url = self
            .sheets_base_url
            .join("/v4/spreadsheets/")
            .map_err(|e| AppError::Internal(format!("Failed to build Sheets URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Sheets base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(spreadsheet_id);

        info!("[SHEETS] GET /v4/spreadsheets/{{id}} (tabs)");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .query(&[("fields", "sheets.properties")])
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("Tab list failed: {}", e)))?;

        let status = response.status();
        info!("[SHEETS] GET /v4/spreadsheets/{{id}} -> {}", status.as_u16());

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        let spreadsheet: SpreadsheetResponse = response
            .json()
            .await
            .map_err(|e| AppError::GoogleApi(format!("Failed to parse tab list: {}", e)))?;

        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|entry| entry.properties)
            .collect())
    }

    /// Reads one tab's values as raw import rows.
    ///
    /// The first value row is the header; fewer than two rows yields no rows
    /// (callers treat that as an empty source).
    pub async fn read_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
    ) -> Result<Vec<RawRow>, AppError> {
        let mut url = self
            .sheets_base_url
            .join("/v4/spreadsheets/")
            .map_err(|e| AppError::Internal(format!("Failed to build Sheets URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Sheets base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(spreadsheet_id)
            .push("values")
            .push(sheet_name);

        info!("[SHEETS] GET /v4/spreadsheets/{{id}}/values/{{range}}");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .query(&[("valueRenderOption", "FORMATTED_VALUE")])
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("Sheet read failed: {}", e)))?;

        let status = response.status();
        info!(
            "[SHEETS] GET /v4/spreadsheets/{{id}}/values/{{range}} -> {}",
            status.as_u16()
        );

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        let range: ValueRangeResponse = response
            .json()
            .await
            .map_err(|e| AppError::GoogleApi(format!("Failed to parse sheet values: {}", e)))?;

        Ok(rows_from_values(range.values))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Handling
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a non-2xx Google API response to an `AppError`.
async fn parse_error_response(response: reqwest::Response, status: reqwest::StatusCode) -> AppError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return AppError::RateLimited {
            retry_after_secs: retry_after,
        };
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return AppError::NotAuthenticated;
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GoogleErrorResponse>(&body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| {
            format!(
                "HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            )
        });

    AppError::GoogleApi(message)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_client(mock_url: &str) -> SheetsClient {
        SheetsClient::with_base_urls(
            Arc::new(Client::new()),
            SecretString::new("google_token".to_string()),
            mock_url,
            mock_url,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_spreadsheets() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(header("Authorization", "Bearer google_token"))
            .and(query_param("orderBy", "modifiedTime desc"))
            .and(query_param("pageSize", "25"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [
                    { "id": "abc", "name": "Leads Q1", "modifiedTime": "2024-03-05T00:00:00Z" },
                    { "id": "def", "name": "Leads Q2" }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let files = client.list_spreadsheets().await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, "abc");
        assert_eq!(files[0].name, "Leads Q1");
        assert!(files[1].modified_time.is_none());
    }

    #[tokio::test]
    async fn test_list_sheet_tabs() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/abc"))
            .and(query_param("fields", "sheets.properties"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sheets": [
                    { "properties": { "sheetId": 0, "title": "Sheet1", "index": 0 } },
                    { "properties": { "sheetId": 99, "title": "Regional", "index": 1 } }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let tabs = client.list_sheet_tabs("abc").await.unwrap();

        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].title, "Sheet1");
        assert_eq!(tabs[1].sheet_id, Some(99));
    }

    #[tokio::test]
    async fn test_read_rows_shapes_values() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/abc/values/Sheet1"))
            .and(query_param("valueRenderOption", "FORMATTED_VALUE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "range": "Sheet1!A1:B3",
                "values": [
                    ["Business", "Number"],
                    ["Acme", "555-1234"],
                    ["Globex"]
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rows = client.read_rows("abc", "Sheet1").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].columns,
            vec![
                ("Business".to_string(), "Acme".to_string()),
                ("Number".to_string(), "555-1234".to_string()),
            ]
        );
        assert_eq!(rows[1].columns[1].1, "");
    }

    #[tokio::test]
    async fn test_sheet_names_with_spaces_are_encoded() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path_regex(r"^/v4/spreadsheets/abc/values/March(%20| )Leads$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "values": [] })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let rows = client.read_rows("abc", "March Leads").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_header_only_sheet_reads_as_empty() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/abc/values/Sheet1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "values": [["Business", "Number"]]
            })))
            .mount(&mock_server)
            .await;

        let rows = client.read_rows("abc", "Sheet1").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_google_error_message_is_surfaced() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": { "code": 404, "message": "Requested entity was not found." }
            })))
            .mount(&mock_server)
            .await;

        let result = client.list_sheet_tabs("missing").await;

        match result.unwrap_err() {
            AppError::GoogleApi(msg) => assert!(msg.contains("not found")),
            e => panic!("Expected GoogleApi, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_expired_token_maps_to_not_authenticated() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let result = client.list_spreadsheets().await;
        assert!(matches!(result.unwrap_err(), AppError::NotAuthenticated));
    }
}
