//! Environment-driven configuration.
//!
//! Credentials are read from the process environment (a `.env` file is
//! honored when present). Tokens are held in `SecretString` and never logged.

use secrecy::SecretString;

use crate::error::AppError;

/// Default HubSpot API base URL.
pub const DEFAULT_HUBSPOT_BASE_URL: &str = "https://api.hubapi.com";

/// Runtime configuration for the import pipeline.
pub struct Config {
    /// HubSpot private-app token.
    pub hubspot_token: SecretString,
    /// HubSpot API base URL (overridable for tests / mock servers).
    pub hubspot_base_url: String,
    /// Google OAuth access token for the Sheets-driven import variant.
    pub google_token: Option<SecretString>,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MissingToken` if `HUBSPOT_PRIVATE_APP_TOKEN` is
    /// unset or empty.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let token = std::env::var("HUBSPOT_PRIVATE_APP_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(AppError::MissingToken)?;

        let base_url = std::env::var("HUBSPOT_BASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HUBSPOT_BASE_URL.to_string());

        let google_token = std::env::var("GOOGLE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::new);

        Ok(Self {
            hubspot_token: SecretString::new(token),
            hubspot_base_url: base_url,
            google_token,
        })
    }
}
