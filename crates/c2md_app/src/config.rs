//! Connection settings from `.env` files, the process environment and CLI
//! overrides, in increasing precedence.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use c2md_core::PageRef;
use c2md_engine::Auth;
use c2md_logging::c2md_debug;
use thiserror::Error;

pub const BASE_URL_VAR: &str = "CONFLUENCE_BASE_URL";
pub const USERNAME_VAR: &str = "CONFLUENCE_USERNAME";
pub const TOKEN_VAR: &str = "CONFLUENCE_TOKEN";

/// Per-user fallback looked up in the home directory.
pub const HOME_ENV_FILE: &str = ".confluence_2_md.env";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {}. Set via environment variables or .env file.", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("cannot read {path}: {message}")]
    EnvFile { path: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Without trailing slash.
    pub base_url: String,
    pub username: String,
    pub token: String,
}

impl Settings {
    /// Read `.env` (see [`env_file_candidates`]) and the process environment,
    /// then apply `overrides`. Never modifies the process environment.
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from);
        let file_vars = match find_env_file(&env_file_candidates(&cwd, home.as_deref())) {
            Some(path) => {
                c2md_debug!("Loading settings from {}", path.display());
                read_env_file(&path)?
            }
            None => HashMap::new(),
        };
        Ok(Self::resolve(
            &file_vars,
            |key| std::env::var(key).ok(),
            overrides,
        ))
    }

    /// Merge the three layers; empty values count as unset.
    pub fn resolve(
        file_vars: &HashMap<String, String>,
        env: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Self {
        let pick = |key: &str, over: &Option<String>| {
            over.clone()
                .filter(|v| !v.is_empty())
                .or_else(|| env(key).filter(|v| !v.is_empty()))
                .or_else(|| file_vars.get(key).filter(|v| !v.is_empty()).cloned())
                .unwrap_or_default()
        };

        Self {
            base_url: pick(BASE_URL_VAR, &overrides.base_url)
                .trim_end_matches('/')
                .to_string(),
            username: pick(USERNAME_VAR, &overrides.username),
            token: pick(TOKEN_VAR, &overrides.token),
        }
    }

    /// A full page URL names its own site; that wins over configuration
    /// unless `--base-url` was given explicitly.
    pub fn apply_page_base(mut self, page_ref: &PageRef, base_url_overridden: bool) -> Self {
        if base_url_overridden {
            return self;
        }
        if let Some(base) = &page_ref.base_url {
            self.base_url = base.trim_end_matches('/').to_string();
        }
        self
    }

    /// Username is optional: without one a bearer token is sent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.base_url.is_empty() {
            missing.push(BASE_URL_VAR);
        }
        if self.token.is_empty() {
            missing.push(TOKEN_VAR);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }

    pub fn auth(&self) -> Auth {
        if self.username.is_empty() {
            Auth::Bearer(self.token.clone())
        } else {
            Auth::Basic {
                username: self.username.clone(),
                token: self.token.clone(),
            }
        }
    }
}

pub fn env_file_candidates(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = vec![cwd.join(".env")];
    if let Some(home) = home {
        candidates.push(home.join(HOME_ENV_FILE));
    }
    candidates
}

pub fn find_env_file(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let env_file_error = |err: dotenvy::Error| ConfigError::EnvFile {
        path: path.display().to_string(),
        message: err.to_string(),
    };
    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(env_file_error)? {
        let (key, value) = item.map_err(env_file_error)?;
        vars.insert(key, value);
    }
    Ok(vars)
}
