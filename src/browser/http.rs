use anyhow::{Context, Result, bail};
use std::time::Duration;
use tracing::debug;

use crate::app::config::AppConfig;

/// Plain HTTP access to the portal, for when no browser is available
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("{} returned {}", url, status);
        }
        resp.text()
            .await
            .with_context(|| format!("failed to read body of {}", url))
    }
}
