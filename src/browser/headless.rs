use anyhow::{Context, Result};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tracing::{debug, error, info};

use crate::app::config::AppConfig;
use crate::browser::session::ChromeSession;

/// Launch a private headless Chromium and open a blank page in it
pub async fn launch_headless(config: &AppConfig) -> Result<ChromeSession> {
    let viewport = Viewport {
        width: 1920,
        height: 1080,
        ..Default::default()
    };

    let browser_config = BrowserConfig::builder()
        .viewport(viewport)
        .no_sandbox()
        .arg(format!("--user-agent={}", config.user_agent))
        .arg("--disable-dev-shm-usage")
        .arg("--disable-gpu")
        .build()
        .map_err(anyhow::Error::msg)?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("failed to launch headless browser")?;

    let handler_task = tokio::task::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("Failed to open a page in the headless browser: {}", e);
        e
    })?;
    page.evaluate_on_new_document("Object.defineProperty(navigator, 'webdriver', { get: () => undefined })")
        .await
        .map_err(|e| {
            error!("Failed to hide webdriver flag: {}", e);
            e
        })?;
    debug!("Headless page ready");
    info!("✓ Launched headless browser");

    Ok(ChromeSession::new(browser, page, handler_task, true, config))
}
