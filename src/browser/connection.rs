use anyhow::{Context, Result, anyhow};
use chromiumoxide::Browser;
use futures::StreamExt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::app::config::AppConfig;
use crate::browser::session::ChromeSession;

const CONNECT_RETRIES: u32 = 5;
const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Attach to a browser already listening on `config.debug_port` and open a
/// fresh tab in it. Closing the session closes only that tab.
pub async fn connect_to_browser(config: &AppConfig) -> Result<ChromeSession> {
    let browser_url = format!("http://localhost:{}", config.debug_port);
    debug!("Connecting to existing browser at {}", browser_url);

    let mut retries = CONNECT_RETRIES;
    let (browser, mut handler) = loop {
        match Browser::connect(&browser_url).await {
            Ok(res) => {
                info!("✓ Connected to browser on port {}", config.debug_port);
                break res;
            }
            Err(e) if retries > 1 => {
                retries -= 1;
                debug!("Browser port not ready ({}), retries left: {}", e, retries);
                sleep(RETRY_INTERVAL).await;
            }
            Err(e) => {
                warn!("Could not connect to browser on port {}: {}", config.debug_port, e);
                return Err(anyhow!("no browser listening on port {}: {}", config.debug_port, e));
            }
        }
    };

    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    let page = browser
        .new_page("about:blank")
        .await
        .context("failed to open a tab on the attached browser")?;

    Ok(ChromeSession::new(browser, page, handler_task, false, config))
}
