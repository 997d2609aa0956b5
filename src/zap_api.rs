use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::errors::{ProbeError, ProbeResult};

/// Where the proxy's API listens
#[derive(Debug, Clone)]
pub struct ZapApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ZapApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(rename = "Result")]
    result: String,
}

/// Blocking client for the HUD actions of the proxy's JSON API
pub struct ZapApiClient {
    config: ZapApiConfig,
    http: reqwest::blocking::Client,
}

impl ZapApiClient {
    pub fn new(config: ZapApiConfig) -> ProbeResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            // Talk to the API directly, never through the proxy under test.
            .no_proxy()
            .build()
            .map_err(|e| ProbeError::Api(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// URL of a `JSON/{component}/action/{name}/` endpoint
    pub fn action_url(&self, component: &str, action: &str) -> ProbeResult<Url> {
        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            ProbeError::Api(format!("Invalid API URL {}: {}", self.config.base_url, e))
        })?;
        url.set_path(&format!("JSON/{}/action/{}/", component, action));
        if let Some(key) = &self.config.api_key {
            url.query_pairs_mut().append_pair("apikey", key);
        }
        Ok(url)
    }

    /// Clear the progress of every tutorial task. Completes before returning.
    pub fn reset_tutorial_tasks(&self) -> ProbeResult<()> {
        info!("Resetting tutorial tasks");
        self.call_action("hud", "resetTutorialTasks")
    }

    fn call_action(&self, component: &str, action: &str) -> ProbeResult<()> {
        let url = self.action_url(component, action)?;
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| ProbeError::Api(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProbeError::Api(format!(
                "{}/{} returned {}: {}",
                component, action, status, body
            )));
        }

        let body: ActionResponse = response
            .json()
            .map_err(|e| ProbeError::Api(format!("Unexpected response: {}", e)))?;
        if body.result != "OK" {
            return Err(ProbeError::Api(format!(
                "{}/{} returned Result={}",
                component, action, body.result
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "zap_api_test.rs"]
mod zap_api_test;
