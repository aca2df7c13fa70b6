//! The `confluence2md` command: flags, configuration, logging and the
//! fetch-convert-write pipeline.
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod run;

pub use cli::Cli;
pub use config::{ConfigError, Overrides, Settings};
pub use error::AppError;
pub use run::{run, Outcome, RunOptions};
