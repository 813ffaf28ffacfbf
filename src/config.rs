// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Snowsaw reads two kinds of configuration files:
//!
//! 1. __Application settings__ in TOML format. These decide where snowblocks
//!    are searched for, and how verbose snowsaw should be. Settings files are
//!    layered, i.e., a settings file in the current working directory
//!    overrides fields of the user-level settings file in the home directory.
//! 2. __Snowblock configurations__ in JSON format. Every snowblock carries a
//!    `snowblock.json` at its top-level that lists the tasks to reconcile.
//!
//! # Snowblock Configuration Layout
//!
//! A snowblock configuration is a JSON array of __tasks__. Each task is a JSON
//! object mapping directive names to directive payloads. Directive order
//! inside of a task is preserved exactly as declared.
//!
//! ```json
//! [
//!   { "defaults": { "link": { "create": true } } },
//!   { "clean": ["~"] },
//!   { "link": { "~/.vimrc": null, "~/.config/nvim": "nvim" } }
//! ]
//! ```

use crate::path::{expand, PathError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// File name of the configuration file at the top-level of a snowblock.
pub const SNOWBLOCK_CONFIG_FILE: &str = "snowblock.json";

/// Snowblock base directory used when nothing else is configured.
pub const DEFAULT_BASE_DIR: &str = "snowblocks";

/// Log level used when nothing else is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Application settings layout.
///
/// Every field is optional so that multiple settings files can be layered on
/// top of each other through [`Settings::merge`].
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Verbosity of snowsaw's logging, e.g., "debug", "info", "warn".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Where to find snowblocks.
    #[serde(default)]
    pub snowblocks: SnowblockSettings,
}

impl Settings {
    /// Load and layer a listing of settings files.
    ///
    /// Files that do not exist are ignored. Fields of files later in the
    /// listing override fields of files earlier in the listing.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if an existing file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if a file is not valid TOML.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn load(paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Result<Self> {
        let mut settings = Settings::default();
        let mut found = false;
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                continue;
            }

            debug!("load settings file {}", path.display());
            let content = read_to_string(path).map_err(|err| ConfigError::Read {
                source: err,
                path: path.to_path_buf(),
            })?;
            settings = settings.merge(content.parse()?);
            found = true;
        }

        if !found {
            debug!("no settings files found, using application defaults");
        }

        Ok(settings)
    }

    /// Layer other settings on top of these settings.
    pub fn merge(self, other: Settings) -> Self {
        Self {
            log_level: other.log_level.or(self.log_level),
            snowblocks: SnowblockSettings {
                base_dirs: other.snowblocks.base_dirs.or(self.snowblocks.base_dirs),
                paths: other.snowblocks.paths.or(self.snowblocks.paths),
            },
        }
    }

    /// Effective log level.
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Effective listing of snowblock base directories.
    pub fn base_dirs(&self) -> Vec<PathBuf> {
        match &self.snowblocks.base_dirs {
            Some(base_dirs) if !base_dirs.is_empty() => base_dirs.clone(),
            _ => vec![PathBuf::from(DEFAULT_BASE_DIR)],
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every configured path.
        if let Some(base_dirs) = settings.snowblocks.base_dirs.as_mut() {
            expand_all(base_dirs)?;
        }

        if let Some(paths) = settings.snowblocks.paths.as_mut() {
            expand_all(paths)?;
        }

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Snowblock location settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SnowblockSettings {
    /// Directories whose subdirectories are all treated as snowblocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dirs: Option<Vec<PathBuf>>,

    /// Individual snowblock directories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<PathBuf>>,
}

fn expand_all(paths: &mut [PathBuf]) -> Result<()> {
    for path in paths.iter_mut() {
        *path = expand(path.to_string_lossy())?;
    }

    Ok(())
}

/// Unit of a snowblock configuration.
///
/// Maps directive names to their payload in declaration order.
#[derive(Default, Debug, PartialEq, Clone)]
pub struct Task(Map<String, Value>);

impl Task {
    /// Construct new task from directive mapping.
    pub fn new(directives: Map<String, Value>) -> Self {
        Self(directives)
    }

    /// Iterate through directives in declaration order.
    pub fn directives(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, payload)| (name.as_str(), payload))
    }

    /// Payload of target directive.
    pub fn get(&self, directive: &str) -> Option<&Value> {
        self.0.get(directive)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Task {
    fn from(directives: Map<String, Value>) -> Self {
        Self::new(directives)
    }
}

/// Parse snowblock configuration into its listing of tasks.
///
/// # Errors
///
/// - Return [`ConfigError::Json`] if data is not valid JSON.
/// - Return [`ConfigError::NotAList`] if top-level is not an array.
/// - Return [`ConfigError::MalformedTask`] if an array element is not an
///   object.
pub fn parse_tasks(data: &str) -> Result<Vec<Task>> {
    let document: Value = serde_json::from_str(data)?;
    let Value::Array(items) = document else {
        return Err(ConfigError::NotAList);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(directives) => Ok(Task::new(directives)),
            _ => Err(ConfigError::MalformedTask { index }),
        })
        .collect()
}

/// Read snowblock configuration file into its listing of tasks.
///
/// # Errors
///
/// - Return [`ConfigError::Read`] if file cannot be read.
/// - Return any error of [`parse_tasks`].
pub fn read_tasks(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let path = path.as_ref();
    let content = read_to_string(path).map_err(|err| ConfigError::Read {
        source: err,
        path: path.to_path_buf(),
    })?;

    parse_tasks(&content)
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("could not read config file {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize settings.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize settings.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to decode snowblock configuration.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Snowblock configuration is not a list of tasks.
    #[error("configuration file must be a list of tasks")]
    NotAList,

    /// Task of snowblock configuration is not a directive mapping.
    #[error("task {index} must map directive names to payloads")]
    MalformedTask { index: usize },

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] PathError),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
