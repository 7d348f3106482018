use thiserror::Error;

/// Patterns (lowercase) that indicate sensitive data not safe for user-facing
/// output. Used by `contains_sensitive()` for case-insensitive matching.
pub(crate) const SENSITIVE_PATTERNS: &[&str] = &[
    "bearer ",
    "refresh_token",
    "access_token",
    "client_secret",
    "authorization:",
];

/// Returns true if the message contains any sensitive pattern (case-insensitive).
fn contains_sensitive(msg: &str) -> bool {
    let lower = msg.to_ascii_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Sanitizes a message before it is attributed to a row or printed.
/// If sensitive content is detected, returns the fallback instead.
pub fn sanitize_message(msg: &str, fallback: &str) -> String {
    if contains_sensitive(msg) {
        fallback.into()
    } else {
        msg.to_string()
    }
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Auth ──────────────────────────────────────────────────────────────────
    #[error("HUBSPOT_PRIVATE_APP_TOKEN is required")]
    MissingToken,

    #[error("Not authenticated")]
    NotAuthenticated,

    // ── API ───────────────────────────────────────────────────────────────────
    /// A non-2xx response from the HubSpot API. The raw response body is kept
    /// so the retry layer can inspect it for an invalid property name.
    #[error("HubSpot error: {message}")]
    HubSpot {
        message: String,
        body: Option<String>,
    },

    #[error("Rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Google API error: {0}")]
    GoogleApi(String),

    // ── Batch ─────────────────────────────────────────────────────────────────
    #[error("Batch size must not exceed {max} items (got {got})")]
    BatchTooLarge { got: usize, max: usize },

    // ── Source ────────────────────────────────────────────────────────────────
    #[error("Invalid CSV: {0}")]
    CsvInvalid(String),

    #[error("Source is empty or has no data rows")]
    SourceEmpty,

    // ── Network ───────────────────────────────────────────────────────────────
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The message shown to end users when this error is attributed to a row.
    /// Never leaks tokens or credential fragments.
    pub fn row_message(&self) -> String {
        match self {
            AppError::HubSpot { message, .. } => {
                sanitize_message(message, "A HubSpot error occurred")
            }
            AppError::RateLimited { retry_after_secs } => match retry_after_secs {
                Some(secs) => format!("Rate limited, retry after {} seconds", secs),
                None => "Rate limited".to_string(),
            },
            other => sanitize_message(&other.to_string(), "Create failed"),
        }
    }
}
