use tracing::{info, warn};

use crate::app::config::{AppConfig, BrowserMode};
use crate::browser::connection::connect_to_browser;
use crate::browser::headless::launch_headless;
use crate::browser::session::ChromeSession;

/// What a run was granted: a live browser, or plain HTTP only
pub enum Capability {
    Interactive(ChromeSession),
    /// Why no browser could be had
    Stateless(String),
}

impl Capability {
    /// Never fails; a browser that cannot be started degrades to `Stateless`
    pub async fn acquire(config: &AppConfig) -> Self {
        let session = match config.browser {
            BrowserMode::Headless => launch_headless(config).await,
            BrowserMode::Attach => connect_to_browser(config).await,
        };
        match session {
            Ok(session) => Self::Interactive(session),
            Err(e) => {
                warn!("Browser unavailable, continuing with plain HTTP only: {:#}", e);
                Self::Stateless(format!("{:#}", e))
            }
        }
    }

    pub fn session(&self) -> Option<&ChromeSession> {
        match self {
            Self::Interactive(session) => Some(session),
            Self::Stateless(_) => None,
        }
    }

    /// The session, or why there is none
    pub fn session_or_reason(&self) -> Result<&ChromeSession, &str> {
        match self {
            Self::Interactive(session) => Ok(session),
            Self::Stateless(reason) => Err(reason.as_str()),
        }
    }

    pub async fn release(self) {
        if let Self::Interactive(session) = self {
            match session.close().await {
                Ok(()) => info!("Browser session closed"),
                Err(e) => warn!("Error closing browser session: {:#}", e),
            }
        }
    }
}
