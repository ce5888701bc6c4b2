use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A provisioned store as reported by `GET /stores`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Store {
    pub name: String,
    pub engine: String,
    #[serde(default)]
    pub status: String,
    pub url: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Store {
    pub fn status_kind(&self) -> StoreStatus {
        StoreStatus::classify(&self.status)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StoreEngine {
    #[default]
    WooCommerce,
    Medusa,
}

impl StoreEngine {
    pub const ALL: [StoreEngine; 2] = [StoreEngine::WooCommerce, StoreEngine::Medusa];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WooCommerce => "woocommerce",
            Self::Medusa => "medusa",
        }
    }
}

impl fmt::Display for StoreEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEngine(pub String);

impl fmt::Display for UnknownEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown store engine '{}' (expected one of: woocommerce, medusa)",
            self.0
        )
    }
}

impl std::error::Error for UnknownEngine {}

impl FromStr for StoreEngine {
    type Err = UnknownEngine;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "woocommerce" => Ok(Self::WooCommerce),
            "medusa" => Ok(Self::Medusa),
            _ => Err(UnknownEngine(value.to_string())),
        }
    }
}

/// Lifecycle of a store. Status strings coming off the wire are classified
/// case-insensitively; anything unrecognised counts as still provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreStatus {
    Provisioning,
    Ready,
    Failed,
}

impl StoreStatus {
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "ready" => Self::Ready,
            "failed" => Self::Failed,
            _ => Self::Provisioning,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Provisioning => "Provisioning",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Provisioning => "status-provisioning",
            Self::Ready => "status-ready",
            Self::Failed => "status-failed",
        }
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateStoreRequest {
    #[serde(default)]
    pub engine: StoreEngine,
}

/// Body of every non-2xx response from the provisioning API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteStoreResponse {
    pub store: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
