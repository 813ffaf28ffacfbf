// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for files that snowblocks declare, and
//! for the application settings files that snowsaw reads on startup. Most of
//! the helpers here are purely lexical, i.e., they never touch the file
//! system, so that link targets can be computed for paths that do not exist
//! yet.

use std::{
    env::VarError,
    path::{Component, Path, PathBuf},
};

/// Upper bound of symbolic links followed by [`real_path`].
const MAX_LINK_DEPTH: usize = 40;

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(PathError::NoWayHome)
}

/// Determine the default search list of application settings files.
///
/// The user-level file `~/.snowsaw.toml` comes first, followed by
/// `snowsaw.toml` in the current working directory. Files later in the list
/// take precedence over earlier ones. Does not check if any of the paths
/// returned actually exist.
pub fn default_settings_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(home) = home_dir() {
        paths.push(home.join(".snowsaw.toml"));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("snowsaw.toml"));
    }

    paths
}

/// Perform tilde and environment variable expansion on a declared path.
///
/// Variables that are not set are left as-is, e.g., `$NOPE/vimrc` stays
/// `$NOPE/vimrc`.
///
/// # Errors
///
/// - Return [`PathError::Expansion`] if a referenced environment variable
///   holds non-unicode data.
pub fn expand(path: impl AsRef<str>) -> Result<PathBuf> {
    let home = || dirs::home_dir().map(|home| home.to_string_lossy().into_owned());
    shellexpand::full_with_context(path.as_ref(), home, lookup_var)
        .map(|expanded| PathBuf::from(expanded.into_owned()))
        .map_err(|err| PathError::Expansion {
            source: err,
            path: path.as_ref().to_string(),
        })
}

fn lookup_var(name: &str) -> std::result::Result<Option<String>, VarError> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Make path absolute relative to the current working directory.
///
/// The result is lexically normalized, symbolic links are left untouched.
pub fn absolute(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return normalize(path);
    }

    match std::env::current_dir() {
        Ok(cwd) => normalize(cwd.join(path)),
        Err(_) => normalize(path),
    }
}

/// Lexically normalize a path.
///
/// Removes `.` components, and folds `..` components into their parent
/// without consulting the file system. Leading `..` components of relative
/// paths are preserved, and `..` at the root stays at the root.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut normal = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => match normal.components().next_back() {
                Some(Component::Normal(_)) => {
                    normal.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => continue,
                _ => normal.push(".."),
            },
            other => normal.push(other),
        }
    }

    normal
}

/// Compute path of `target` relative to directory `base`.
///
/// Both paths are expected to be absolute. The result is what a symbolic link
/// placed inside `base` must contain to reach `target`.
pub fn relative_to(target: impl AsRef<Path>, base: impl AsRef<Path>) -> PathBuf {
    let target = normalize(target);
    let base = normalize(base);
    let target_parts = target.components().collect::<Vec<_>>();
    let base_parts = base.components().collect::<Vec<_>>();
    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(lhs, rhs)| lhs == rhs)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }

    for part in &target_parts[common..] {
        relative.push(part);
    }

    if relative.as_os_str().is_empty() {
        relative.push(".");
    }

    relative
}

/// Resolve a path the way `realpath` would, even for dangling links.
///
/// Follows the chain of symbolic links starting at `path` until it reaches a
/// path that is not a link, then canonicalizes the longest existing ancestor
/// of the result. Unlike [`std::fs::canonicalize`] this never fails, because
/// the whole point is to find out where a broken link was pointing to.
pub fn real_path(path: impl AsRef<Path>) -> PathBuf {
    let mut current = absolute(path);
    for _ in 0..MAX_LINK_DEPTH {
        match std::fs::read_link(&current) {
            Ok(target) => {
                let parent = current.parent().map(Path::to_path_buf).unwrap_or_default();
                current = normalize(parent.join(target));
            }
            Err(_) => break,
        }
    }

    canonicalize_existing(&current)
}

fn canonicalize_existing(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if let Ok(real) = ancestor.canonicalize() {
            if let Ok(rest) = path.strip_prefix(ancestor) {
                return real.join(rest);
            }
        }
    }

    path.to_path_buf()
}

/// Path resolution error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PathError {
    /// No way to determine user's home directory.
    #[error("cannot determine absolute path to user's home directory")]
    NoWayHome,

    /// Shell expansion of a declared path failed.
    #[error("failed to expand path {path:?}")]
    Expansion {
        #[source]
        source: shellexpand::LookupError<VarError>,
        path: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
