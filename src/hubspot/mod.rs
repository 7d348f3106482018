//! HubSpot CRM v3 HTTP client layer.
//!
//! This module provides a thin typed client for the two create operations the
//! import pipeline depends on. Key features:
//!
//! - **Secure credential handling** via `secrecy::SecretString`
//! - **Safe logging** that never leaks tokens or property values: only HTTP
//!   method, path, and status codes are logged
//! - **Error-body preservation** so the retry layer can inspect validation
//!   failures for the offending property name

pub mod client;
pub mod error_body;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use client::{HubSpotClient, ObjectCreator};
pub use error_body::ErrorBody;

/// CRM object type targeted by an import run.
///
/// Serializes lowercase to match the `/crm/v3/objects/{object}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Contacts,
    Companies,
    Deals,
}

impl ObjectType {
    /// The path segment used in CRM v3 object URLs.
    pub fn path_segment(self) -> &'static str {
        match self {
            ObjectType::Contacts => "contacts",
            ObjectType::Companies => "companies",
            ObjectType::Deals => "deals",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contacts" => Ok(ObjectType::Contacts),
            "companies" => Ok(ObjectType::Companies),
            "deals" => Ok(ObjectType::Deals),
            other => Err(format!(
                "unknown object type {:?} (expected contacts, companies, or deals)",
                other
            )),
        }
    }
}
