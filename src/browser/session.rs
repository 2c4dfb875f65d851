use anyhow::{Context, Result, anyhow, bail};
use chromiumoxide::cdp::browser_protocol::page::{GetNavigationHistoryParams, NavigateToHistoryEntryParams};
use chromiumoxide::{Browser, Page};
use serde_json::Value;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::app::config::AppConfig;
use crate::browser::scripts::{
    CLICK_LINK_JS, CLICK_XPATH_JS, FILL_INPUT_JS, SCROLL_TO_LINK_JS, XPATH_EXISTS_JS, invoke,
};

/// What the search flow needs from a rendering browser.
///
/// Element lookups take XPath expressions. Every call acts on the single
/// page the session owns; nothing here is safe to use concurrently.
#[allow(async_fn_in_trait)]
pub trait PortalSession {
    async fn goto(&self, url: &str) -> Result<()>;

    /// Rendered HTML of the current page
    async fn content(&self) -> Result<String>;

    /// Click the first anchor whose text contains `text`. `Ok(false)` when
    /// no such anchor exists.
    async fn click_link_by_text(&self, text: &str) -> Result<bool>;

    /// Run a script in the page, ignoring its value
    async fn execute(&self, script: &str) -> Result<()>;

    async fn element_exists(&self, xpath: &str) -> Result<bool>;

    async fn fill_input(&self, xpath: &str, value: &str) -> Result<()>;

    async fn click_element(&self, xpath: &str) -> Result<()>;

    async fn press_enter(&self, xpath: &str) -> Result<()>;

    async fn go_back(&self) -> Result<()>;
}

/// A chromiumoxide page plus the browser it lives in
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    /// Launched by us (close the whole browser) or attached (close our tab only)
    owned: bool,
    scroll_wait: Duration,
    js_timeout: Duration,
}

impl ChromeSession {
    pub(crate) fn new(browser: Browser, page: Page, handler: JoinHandle<()>, owned: bool, config: &AppConfig) -> Self {
        Self {
            browser,
            page,
            handler,
            owned,
            scroll_wait: config.scroll_wait(),
            js_timeout: Duration::from_secs(config.http_timeout_secs),
        }
    }

    async fn call_js(&self, function: &str, args: &[&str]) -> Result<Value> {
        let eval_future = self.page.evaluate(invoke(function, args));
        let eval_result = timeout(self.js_timeout, eval_future)
            .await
            .map_err(|_| anyhow!("script timed out after {:?}", self.js_timeout))??;
        eval_result
            .into_value()
            .map_err(|e| anyhow!("failed to read script result: {}", e))
    }

    async fn call_js_flag(&self, function: &str, args: &[&str]) -> Result<bool> {
        Ok(self.call_js(function, args).await?.as_bool().unwrap_or(false))
    }

    pub async fn close(mut self) -> Result<()> {
        let closed = if self.owned {
            debug!("Closing launched browser");
            match self.browser.close().await {
                Ok(_) => {
                    let _ = self.browser.wait().await;
                    Ok(())
                }
                Err(e) => Err(anyhow!("failed to close browser: {}", e)),
            }
        } else {
            debug!("Closing our tab on the attached browser");
            self.page
                .close()
                .await
                .map_err(|e| anyhow!("failed to close tab: {}", e))
        };
        self.handler.abort();
        closed
    }
}

impl PortalSession for ChromeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("failed to open {}", url))?;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.page.content().await.context("failed to read page content")
    }

    async fn click_link_by_text(&self, text: &str) -> Result<bool> {
        if !self.call_js_flag(SCROLL_TO_LINK_JS, &[text]).await? {
            return Ok(false);
        }
        sleep(self.scroll_wait).await;
        self.call_js_flag(CLICK_LINK_JS, &[text]).await
    }

    async fn execute(&self, script: &str) -> Result<()> {
        let eval_future = self.page.evaluate(script);
        timeout(self.js_timeout, eval_future)
            .await
            .map_err(|_| anyhow!("script timed out after {:?}", self.js_timeout))?
            .context("script failed")?;
        Ok(())
    }

    async fn element_exists(&self, xpath: &str) -> Result<bool> {
        self.call_js_flag(XPATH_EXISTS_JS, &[xpath]).await
    }

    async fn fill_input(&self, xpath: &str, value: &str) -> Result<()> {
        if !self.call_js_flag(FILL_INPUT_JS, &[xpath, value]).await? {
            bail!("input {} disappeared before it could be filled", xpath);
        }
        Ok(())
    }

    async fn click_element(&self, xpath: &str) -> Result<()> {
        if !self.call_js_flag(CLICK_XPATH_JS, &[xpath]).await? {
            bail!("element {} disappeared before it could be clicked", xpath);
        }
        Ok(())
    }

    async fn press_enter(&self, xpath: &str) -> Result<()> {
        self.page
            .find_xpath(xpath)
            .await
            .with_context(|| format!("element {} not found", xpath))?
            .press_key("Enter")
            .await
            .context("failed to press Enter")?;
        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        let history = self
            .page
            .execute(GetNavigationHistoryParams::default())
            .await
            .context("failed to read navigation history")?;
        let previous = usize::try_from(history.current_index - 1)
            .ok()
            .and_then(|i| history.entries.get(i))
            .ok_or_else(|| anyhow!("no previous page in history"))?;
        self.page
            .execute(NavigateToHistoryEntryParams::new(previous.id))
            .await
            .context("failed to navigate back")?;
        Ok(())
    }
}
