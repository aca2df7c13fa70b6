//! Logger setup for the binary.
//!
//! Records go to stderr so stdout carries only the Markdown or JSON payload.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use c2md_logging::level_for_verbosity;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Stderr only.
    Terminal,
    /// Stderr plus the given file, truncated on start.
    TerminalAndFile(PathBuf),
}

impl LogDestination {
    pub fn from_log_file(log_file: Option<&Path>) -> Self {
        match log_file {
            Some(path) => LogDestination::TerminalAndFile(path.to_path_buf()),
            None => LogDestination::Terminal,
        }
    }
}

/// Install the global logger. When the log file cannot be created the
/// terminal logger is still installed and the error is returned.
pub fn initialize(verbose: u8, destination: &LogDestination) -> anyhow::Result<()> {
    let level = level_for_verbosity(verbose);
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    let mut file_error = None;
    if let LogDestination::TerminalAndFile(path) = destination {
        match create_file_logger(level, config, path) {
            Ok(logger) => loggers.push(logger),
            Err(err) => file_error = Some(err),
        }
    }

    CombinedLogger::init(loggers).context("a global logger is already installed")?;
    match file_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    path: &Path,
) -> anyhow::Result<Box<WriteLogger<File>>> {
    let file = File::create(path)
        .with_context(|| format!("could not create log file {}", path.display()))?;
    Ok(WriteLogger::new(level, config, file))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::LogDestination;

    #[test]
    fn log_file_selects_combined_destination() {
        assert_eq!(LogDestination::from_log_file(None), LogDestination::Terminal);
        assert_eq!(
            LogDestination::from_log_file(Some(Path::new("run.log"))),
            LogDestination::TerminalAndFile(PathBuf::from("run.log"))
        );
    }
}
