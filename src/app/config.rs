use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BrowserMode {
    /// Launch a private headless Chromium
    Headless,
    /// Attach to a browser already listening on `debug_port`
    Attach,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_portal_url")]
    pub portal_url: String,
    #[serde(default = "default_program_marker")]
    pub program_marker: String,
    #[serde(default = "default_fallback_year")]
    pub fallback_year: i32,
    #[serde(default = "default_college_code")]
    pub college_code: String,
    #[serde(default = "default_browser")]
    pub browser: BrowserMode,
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,
    #[serde(default = "default_page_load_wait_ms")]
    pub page_load_wait_ms: u64,
    #[serde(default = "default_back_wait_ms")]
    pub back_wait_ms: u64,
    #[serde(default = "default_scroll_wait_ms")]
    pub scroll_wait_ms: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub dump_pages_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path.unwrap_or_else(|| Path::new("config.toml"));
        if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            let cfg: AppConfig = toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file: {}", path.display()))?;
            return Ok(cfg);
        }
        Ok(AppConfig::default())
    }

    pub fn page_load_wait(&self) -> Duration {
        Duration::from_millis(self.page_load_wait_ms)
    }

    pub fn back_wait(&self) -> Duration {
        Duration::from_millis(self.back_wait_ms)
    }

    pub fn scroll_wait(&self) -> Duration {
        Duration::from_millis(self.scroll_wait_ms)
    }

    /// Zero waits, for driving fake sessions in tests
    #[cfg(test)]
    pub fn without_waits() -> Self {
        Self {
            page_load_wait_ms: 0,
            back_wait_ms: 0,
            scroll_wait_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            portal_url: default_portal_url(),
            program_marker: default_program_marker(),
            fallback_year: default_fallback_year(),
            college_code: default_college_code(),
            browser: default_browser(),
            debug_port: default_debug_port(),
            page_load_wait_ms: default_page_load_wait_ms(),
            back_wait_ms: default_back_wait_ms(),
            scroll_wait_ms: default_scroll_wait_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            user_agent: default_user_agent(),
            output_dir: default_output_dir(),
            dump_pages_dir: None,
        }
    }
}

fn default_portal_url() -> String {
    "https://results.beup.ac.in/".to_string()
}

fn default_program_marker() -> String {
    "B.Tech".to_string()
}

fn default_fallback_year() -> i32 {
    2024
}

fn default_college_code() -> String {
    "124".to_string()
}

fn default_browser() -> BrowserMode {
    BrowserMode::Headless
}

fn default_debug_port() -> u16 {
    9222
}

fn default_page_load_wait_ms() -> u64 {
    3000
}

fn default_back_wait_ms() -> u64 {
    1000
}

fn default_scroll_wait_ms() -> u64 {
    1000
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}
