use c2md_core::ParseError;
use c2md_engine::{FetchError, PersistError};
use thiserror::Error;

use crate::config::ConfigError;

/// Everything that ends a run; the display text is what the user sees.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("URL error: {0}")]
    Url(#[from] ParseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The client message already names the short link.
    #[error("{0}")]
    ShortLink(FetchError),
    #[error("{0}")]
    Title(FetchError),
    #[error("Fetch error: {0}")]
    Fetch(FetchError),
    #[error("Write error: {0}")]
    Write(#[from] PersistError),
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}
