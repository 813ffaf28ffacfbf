// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Shared execution context of a snowblock run.
//!
//! The context holds the resolved snowblock directory, the option defaults
//! declared through the "defaults" pseudo-directive, and the name of the
//! current host. It is owned by exactly one dispatcher, and handed out to
//! directive handlers by shared reference only. Thus, handlers can read the
//! defaults, but never alter them.
//!
//! # Defaults Cascade
//!
//! Every option a directive handler understands is resolved in three tiers:
//!
//! 1. Value set on the entry itself.
//! 2. Value set for the directive through the "defaults" pseudo-directive.
//! 3. Built-in default of the handler.
//!
//! See [`resolve`].

use crate::path::{expand, PathError};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve option through the defaults cascade.
///
/// Entry-level value wins over directive-level default, which wins over the
/// built-in default.
pub fn resolve<T>(entry: Option<T>, directive_default: Option<T>, builtin: T) -> T {
    entry.or(directive_default).unwrap_or(builtin)
}

/// Execution context of a snowblock.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    snowblock_dir: PathBuf,
    defaults: Map<String, Value>,
    hostname: String,
}

impl Context {
    /// Construct new context for target snowblock directory.
    ///
    /// Hostname is taken from the operating system.
    ///
    /// # Errors
    ///
    /// - Return [`ContextError::InvalidDirectory`] if snowblock directory does
    ///   not exist.
    /// - Return [`ContextError::Expansion`] if snowblock directory cannot be
    ///   expanded.
    pub fn new(snowblock_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            snowblock_dir: resolve_snowblock_dir(snowblock_dir.as_ref())?,
            defaults: Map::new(),
            hostname: gethostname::gethostname().to_string_lossy().into_owned(),
        })
    }

    /// Override hostname that host-conditional entries are matched against.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Point context at another snowblock directory.
    ///
    /// Performs tilde expansion, symlink resolution, and absolutization.
    ///
    /// # Errors
    ///
    /// - Return [`ContextError::InvalidDirectory`] if snowblock directory does
    ///   not exist.
    /// - Return [`ContextError::Expansion`] if snowblock directory cannot be
    ///   expanded.
    pub fn set_snowblock_dir(&mut self, snowblock_dir: impl AsRef<Path>) -> Result<()> {
        self.snowblock_dir = resolve_snowblock_dir(snowblock_dir.as_ref())?;
        Ok(())
    }

    /// Absolute, symlink-free path to snowblock directory.
    pub fn snowblock_dir(&self) -> &Path {
        self.snowblock_dir.as_path()
    }

    /// Name of current host.
    pub fn hostname(&self) -> &str {
        self.hostname.as_str()
    }

    /// Replace all directive defaults.
    ///
    /// Defaults are never merged. The previous mapping is dropped in full.
    pub fn set_defaults(&mut self, defaults: Map<String, Value>) {
        debug!("replace defaults for {} directive(s)", defaults.len());
        self.defaults = defaults;
    }

    /// Deep copy of all directive defaults.
    pub fn defaults(&self) -> Map<String, Value> {
        self.defaults.clone()
    }

    /// Decode defaults of target directive into typed options.
    ///
    /// Yields `T::default()` when no defaults were declared for the directive.
    ///
    /// # Errors
    ///
    /// - Return [`ContextError::MalformedDefaults`] if declared defaults do not
    ///   match the layout of `T`.
    pub fn directive_defaults<T>(&self, directive: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.defaults.get(directive) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
                ContextError::MalformedDefaults {
                    source: err,
                    directive: directive.to_string(),
                }
            }),
        }
    }
}

fn resolve_snowblock_dir(path: &Path) -> Result<PathBuf> {
    let expanded = expand(path.to_string_lossy())?;
    match expanded.canonicalize() {
        Ok(resolved) if resolved.is_dir() => Ok(resolved),
        _ => Err(ContextError::InvalidDirectory { path: expanded }),
    }
}

/// Execution context error types.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// Snowblock directory does not exist.
    #[error("nonexistent snowblock directory {:?}", path.display())]
    InvalidDirectory { path: PathBuf },

    /// Snowblock directory cannot be expanded.
    #[error(transparent)]
    Expansion(#[from] PathError),

    /// Defaults of a directive do not match the options it understands.
    #[error("malformed defaults for directive {directive:?}")]
    MalformedDefaults {
        #[source]
        source: serde_json::Error,
        directive: String,
    },
}

/// Friendly result alias :3
type Result<T, E = ContextError> = std::result::Result<T, E>;
