//! HTTP client for querying a Vitals health endpoint.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Body served by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    #[serde(default)]
    pub checks: Vec<CheckEntry>,
}

impl HealthBody {
    pub fn is_up(&self) -> bool {
        self.status == "UP"
    }
}

/// One probe in a [`HealthBody`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tabled)]
pub struct CheckEntry {
    #[tabled(rename = "Probe")]
    pub name: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Error", display_with = "display_error")]
    pub error: Option<String>,
}

fn display_error(error: &Option<String>) -> String {
    error.clone().unwrap_or_default()
}

/// HTTP client for a Vitals server.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client pointing at the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET the health endpoint at `path`.
    ///
    /// 503 carries a regular body listing the failing probes, so it is not
    /// treated as an error.
    pub async fn get_health(&self, path: &str) -> Result<HealthBody> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if status != StatusCode::OK && status != StatusCode::SERVICE_UNAVAILABLE {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}
