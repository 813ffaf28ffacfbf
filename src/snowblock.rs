// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Snowblock discovery and bootstrapping.
//!
//! A __snowblock__ is a self-contained directory of dotfiles that carries a
//! `snowblock.json` at its top-level. Snowblocks are usually grouped inside of
//! __base directories__, where every direct subdirectory is a candidate
//! snowblock:
//!
//! ```text
//! snowblocks/
//! ├── git/
//! │   ├── snowblock.json
//! │   └── gitconfig
//! └── vim/
//!     ├── snowblock.json
//!     └── vimrc
//! ```
//!
//! Every snowblock is bootstrapped independently with its own dispatcher and
//! execution context. A failing snowblock never stops the others.

use crate::{
    config::{read_tasks, ConfigError, SNOWBLOCK_CONFIG_FILE},
    directive::Registry,
    dispatch::{DispatchError, DispatchReport, Dispatcher},
    path::{absolute, expand, PathError},
};

use std::{
    fs::read_dir,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, info_span, warn};

/// Snowblock directory with its configuration file.
///
/// A snowblock is either __discovered__ inside of a base directory, or
/// __explicit__, i.e., named directly by the user. Discovered snowblocks
/// without configuration file are skipped. Explicit snowblocks must exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snowblock {
    dir: PathBuf,
    config: PathBuf,
    explicit: bool,
}

impl Snowblock {
    /// Construct discovered snowblock for target directory.
    ///
    /// Configuration is expected at `snowblock.json` inside the directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let config = dir.join(SNOWBLOCK_CONFIG_FILE);
        Self {
            dir,
            config,
            explicit: false,
        }
    }

    /// Construct explicit snowblock for target directory.
    pub fn explicit(dir: impl Into<PathBuf>) -> Self {
        Self {
            explicit: true,
            ..Self::new(dir)
        }
    }

    /// Construct explicit snowblock from configuration file.
    ///
    /// The parent directory of the file becomes the snowblock directory.
    pub fn from_config_file(config: impl AsRef<Path>) -> Self {
        let config = absolute(config);
        let dir = config
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        Self {
            dir,
            config,
            explicit: true,
        }
    }

    /// Name of snowblock, i.e., name of its directory.
    pub fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.dir.display().to_string())
    }

    pub fn dir(&self) -> &Path {
        self.dir.as_path()
    }

    pub fn config(&self) -> &Path {
        self.config.as_path()
    }

    /// Check if snowblock carries a configuration file.
    pub fn has_config(&self) -> bool {
        self.config.is_file()
    }

    /// Check if snowblock was named directly instead of discovered.
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Read configuration, and dispatch its tasks.
    ///
    /// # Errors
    ///
    /// - Return [`SnowblockError::Config`] if configuration cannot be read.
    /// - Return [`SnowblockError::Dispatch`] if snowblock directory is invalid.
    pub fn run(&self, registry: &Registry) -> Result<DispatchReport> {
        let mut dispatcher = Dispatcher::new(&self.dir, registry)?;
        let tasks = read_tasks(&self.config)?;
        let report = dispatcher.dispatch(&tasks);

        if report.is_success() {
            info!("==> all tasks executed successfully");
        } else {
            error!("==> some tasks were not executed successfully");
        }

        Ok(report)
    }
}

/// Find every snowblock candidate inside of target base directories.
///
/// Base directories that do not exist are reported and ignored. Candidates
/// are sorted by name per base directory.
///
/// # Errors
///
/// - Return [`SnowblockError::Expansion`] if base directory cannot be
///   expanded.
/// - Return [`SnowblockError::ReadBaseDir`] if existing base directory cannot
///   be listed.
pub fn discover(base_dirs: impl IntoIterator<Item = impl AsRef<Path>>) -> Result<Vec<Snowblock>> {
    let mut snowblocks = Vec::new();
    for base_dir in base_dirs {
        let base_dir = absolute(expand(base_dir.as_ref().to_string_lossy())?);
        if !base_dir.is_dir() {
            warn!("ignoring nonexistent base directory {}", base_dir.display());
            continue;
        }

        let listing = read_dir(&base_dir).map_err(|err| SnowblockError::ReadBaseDir {
            source: err,
            path: base_dir.clone(),
        })?;
        let mut candidates = listing
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect::<Vec<_>>();
        candidates.sort();

        debug!("found {} candidate(s) in {}", candidates.len(), base_dir.display());
        snowblocks.extend(candidates.into_iter().map(Snowblock::new));
    }

    Ok(snowblocks)
}

/// Outcome of bootstrapping a set of snowblocks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BootstrapSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

impl BootstrapSummary {
    /// True if no snowblock failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Bootstrap every snowblock in sequence.
///
/// Discovered snowblocks without configuration file are skipped. Explicit
/// snowblocks that do not exist, or lack their configuration file, fail.
pub fn bootstrap(snowblocks: &[Snowblock], registry: &Registry) -> BootstrapSummary {
    let mut summary = BootstrapSummary::default();
    for snowblock in snowblocks {
        let name = snowblock.name();
        let _span = info_span!("snowblock", name = name.as_str()).entered();

        if !snowblock.is_explicit() && !snowblock.has_config() {
            info!("skipping {} without {SNOWBLOCK_CONFIG_FILE}", snowblock.dir().display());
            summary.skipped.push(name);
            continue;
        }

        info!("bootstrapping {}", snowblock.dir().display());
        match snowblock.run(registry) {
            Ok(report) if report.is_success() => summary.succeeded.push(name),
            Ok(_) => summary.failed.push(name),
            Err(err) => {
                error!("{err}");
                summary.failed.push(name);
            }
        }
    }

    summary
}

/// Snowblock error types.
#[derive(Debug, thiserror::Error)]
pub enum SnowblockError {
    /// Snowblock configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Snowblock cannot be dispatched.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Base directory cannot be expanded.
    #[error(transparent)]
    Expansion(#[from] PathError),

    /// Base directory cannot be listed.
    #[error("failed to read base directory {}", path.display())]
    ReadBaseDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = SnowblockError> = std::result::Result<T, E>;
