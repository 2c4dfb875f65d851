use thiserror::Error;

/// Failures that abort a whole request. Everything per-student or
/// per-navigation is folded into `StudentResult::error` instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("result catalog is unavailable or empty")]
    CatalogUnavailable,

    #[error("no matching semester results found.\n{diagnostic}")]
    NoMatch { diagnostic: String },

    #[error("interactive browser session unavailable: {0}")]
    InteractiveUnavailable(String),

    #[error("no results found for the specified criteria")]
    NoResults,
}
