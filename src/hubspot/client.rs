//! HubSpot CRM v3 create and batch-create client.
//!
//! Wire shapes:
//!
//! - `POST /crm/v3/objects/{object}` with `{"properties": {...}}` → `{"id": ...}`
//! - `POST /crm/v3/objects/{object}/batch/create` with
//!   `{"inputs": [{"properties": {...}}, ...]}` → `{"results": [{"id": ...}, ...]}`
//!
//! A batch call never exceeds 100 inputs; larger batches are rejected before
//! any network I/O. Batch-level failures are atomic, so the caller falls back
//! to single creates rather than assuming partial success.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::error::AppError;
use crate::hubspot::ObjectType;
use crate::import::{CreatedRecord, PropertySet, RecordCreator};

/// Hard cap on items per batch-create call.
pub const MAX_BATCH_INPUTS: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

/// One record in a create / batch-create request.
#[derive(Debug, Serialize)]
struct CreateInput<'a> {
    properties: &'a PropertySet,
}

/// Request body for batch create.
#[derive(Debug, Serialize)]
struct BatchCreateRequest<'a> {
    inputs: Vec<CreateInput<'a>>,
}

/// Response body for a single create.
#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
}

/// Response body for batch create.
#[derive(Debug, Deserialize)]
struct BatchCreateResponse {
    results: Vec<CreateResponse>,
}

/// HubSpot error response format (the fields we act on).
#[derive(Debug, Deserialize)]
struct HubSpotErrorResponse {
    message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// HubSpotClient
// ─────────────────────────────────────────────────────────────────────────────

/// Client for HubSpot CRM v3 object creation.
#[derive(Clone)]
pub struct HubSpotClient {
    /// Shared HTTP client.
    client: Arc<Client>,
    /// API base URL (e.g., "https://api.hubapi.com").
    base_url: Url,
    /// Private-app token for authentication.
    token: Arc<SecretString>,
}

impl HubSpotClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if `base_url` is not a valid URL.
    pub fn new(client: Arc<Client>, base_url: &str, token: SecretString) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Internal(format!("Invalid HubSpot base URL: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            token: Arc::new(token),
        })
    }

    /// Binds this client to one object type, yielding a [`RecordCreator`].
    pub fn creator_for(&self, object: ObjectType) -> ObjectCreator {
        ObjectCreator {
            client: self.clone(),
            object,
        }
    }

    /// Creates a single record.
    ///
    /// # Errors
    ///
    /// - `AppError::HubSpot` - validation or other API error (body preserved)
    /// - `AppError::RateLimited` - HTTP 429
    /// - `AppError::NotAuthenticated` - HTTP 401
    /// - `AppError::ConnectionFailed` - network error
    pub async fn create_one(
        &self,
        object: ObjectType,
        properties: &PropertySet,
    ) -> Result<CreatedRecord, AppError> {
        let url = self.build_objects_url(object, None)?;
        let path = format!("/crm/v3/objects/{}", object);

        info!("[HUBSPOT] POST {}", path);

        let response = self
            .client
            .post(url)
            .bearer_auth(self.token.expose_secret())
            .json(&CreateInput { properties })
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("Create request failed: {}", e)))?;

        let status = response.status();
        info!("[HUBSPOT] POST {} -> {}", path, status.as_u16());

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        let created: CreateResponse = response.json().await.map_err(|e| {
            AppError::HubSpot {
                message: format!("Failed to parse create response: {}", e),
                body: None,
            }
        })?;

        Ok(CreatedRecord { id: created.id })
    }

    /// Creates up to [`MAX_BATCH_INPUTS`] records in one call.
    ///
    /// # Errors
    ///
    /// - `AppError::BatchTooLarge` - more than 100 items, rejected before any
    ///   network call
    /// - otherwise as [`create_one`](Self::create_one); any error means the
    ///   whole batch failed
    pub async fn batch_create(
        &self,
        object: ObjectType,
        items: &[PropertySet],
    ) -> Result<Vec<CreatedRecord>, AppError> {
        if items.len() > MAX_BATCH_INPUTS {
            return Err(AppError::BatchTooLarge {
                got: items.len(),
                max: MAX_BATCH_INPUTS,
            });
        }

        let url = self.build_objects_url(object, Some("batch/create"))?;
        let path = format!("/crm/v3/objects/{}/batch/create", object);

        let request = BatchCreateRequest {
            inputs: items
                .iter()
                .map(|properties| CreateInput { properties })
                .collect(),
        };

        info!("[HUBSPOT] POST {} ({} inputs)", path, items.len());

        let response = self
            .client
            .post(url)
            .bearer_auth(self.token.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("Batch create failed: {}", e)))?;

        let status = response.status();
        info!("[HUBSPOT] POST {} -> {}", path, status.as_u16());

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        let batch: BatchCreateResponse = response.json().await.map_err(|e| {
            AppError::HubSpot {
                message: format!("Failed to parse batch create response: {}", e),
                body: None,
            }
        })?;

        Ok(batch
            .results
            .into_iter()
            .map(|r| CreatedRecord { id: r.id })
            .collect())
    }

    /// Builds `/crm/v3/objects/{object}[/{suffix}]`.
    fn build_objects_url(&self, object: ObjectType, suffix: Option<&str>) -> Result<Url, AppError> {
        let path = match suffix {
            Some(suffix) => format!("/crm/v3/objects/{}/{}", object.path_segment(), suffix),
            None => format!("/crm/v3/objects/{}", object.path_segment()),
        };
        self.base_url
            .join(&path)
            .map_err(|e| AppError::Internal(format!("Failed to build objects URL: {}", e)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ObjectCreator
// ─────────────────────────────────────────────────────────────────────────────

/// A [`HubSpotClient`] bound to one object type.
#[derive(Clone)]
pub struct ObjectCreator {
    client: HubSpotClient,
    object: ObjectType,
}

impl RecordCreator for ObjectCreator {
    fn create_one<'a>(
        &'a self,
        properties: &'a PropertySet,
    ) -> Pin<Box<dyn Future<Output = Result<CreatedRecord, AppError>> + Send + 'a>> {
        Box::pin(self.client.create_one(self.object, properties))
    }

    fn batch_create<'a>(
        &'a self,
        items: &'a [PropertySet],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CreatedRecord>, AppError>> + Send + 'a>> {
        Box::pin(self.client.batch_create(self.object, items))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Handling
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a non-2xx response to an `AppError`, preserving the raw body.
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

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("Unable to read error body"));

    let message = serde_json::from_str::<HubSpotErrorResponse>(&body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| {
            format!(
                "HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            )
        });

    AppError::HubSpot {
        message,
        body: Some(body),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
