// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Removal of dead links.
//!
//! The "clean" directive takes a list of directories, and removes every broken
//! symbolic link directly inside of them that pointed into the snowblock
//! directory:
//!
//! ```json
//! { "clean": ["~", "~/.config"] }
//! ```
//!
//! Broken links pointing anywhere else are never touched. The sweep does not
//! descend into subdirectories.

use crate::{
    context::Context,
    directive::{decode_payload, ensure_owned, DirectiveHandler, Outcome, Report, Result},
    path::{expand, normalize, real_path, PathError},
};

use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, instrument, warn};

/// Directive name owned by [`Clean`].
pub const DIRECTIVE: &str = "clean";

/// Handler of the "clean" directive.
#[derive(Debug, Default, Clone, Copy)]
pub struct Clean;

impl Clean {
    /// Construct handler behind trait object for [`crate::directive::Registry`].
    pub fn boxed() -> Box<dyn DirectiveHandler> {
        Box::new(Self)
    }
}

impl DirectiveHandler for Clean {
    fn name(&self) -> &'static str {
        DIRECTIVE
    }

    fn can_handle(&self, directive: &str) -> bool {
        directive == DIRECTIVE
    }

    #[instrument(skip(self, context, payload), level = "debug")]
    fn handle(&self, context: &Context, directive: &str, payload: &Value) -> Result<Report> {
        ensure_owned(self, directive)?;
        let declared: Vec<String> = decode_payload(directive, payload)?;

        let mut report = Report::new();
        let mut seen: Vec<PathBuf> = Vec::new();
        for target in declared {
            let dir = match resolve_target(context, &target) {
                Ok(dir) => dir,
                Err(err) => {
                    warn!("{err}");
                    report.record(target, Outcome::Failed { reason: err.to_string() });
                    continue;
                }
            };

            if seen.contains(&dir) {
                debug!("ignoring duplicate target {}", dir.display());
                continue;
            }
            seen.push(dir.clone());

            let outcome = match sweep(context.snowblock_dir(), &dir) {
                Ok(0) => Outcome::Unchanged,
                Ok(_) => Outcome::Applied,
                Err(err) => {
                    warn!("{err}");
                    Outcome::Failed { reason: err.to_string() }
                }
            };
            report.record(target, outcome);
        }

        if report.is_success() {
            info!("=> all targets have been cleaned");
        } else {
            error!("some targets were not successfully cleaned");
        }

        Ok(report)
    }
}

/// Expand target, and anchor it to snowblock directory if relative.
fn resolve_target(context: &Context, target: &str) -> Result<PathBuf, CleanError> {
    let expanded = expand(target)?;
    if expanded.is_absolute() {
        Ok(normalize(expanded))
    } else {
        Ok(normalize(context.snowblock_dir().join(expanded)))
    }
}

/// Remove dead links in `dir` that resolve into `snowblock_dir`.
///
/// Returns the number of links removed. Every entry is attempted even if an
/// earlier removal failed.
///
/// # Errors
///
/// - Return [`CleanError::ReadDir`] if `dir` cannot be listed.
/// - Return [`CleanError::Remove`] if any dead link could not be removed.
fn sweep(snowblock_dir: &Path, dir: &Path) -> Result<usize, CleanError> {
    if !dir.is_dir() {
        debug!("ignoring nonexistent directory {}", dir.display());
        return Ok(0);
    }

    let listing = fs::read_dir(dir).map_err(|err| CleanError::ReadDir {
        source: err,
        path: dir.to_path_buf(),
    })?;

    let mut removed = 0;
    let mut failure = None;
    for entry in listing.flatten() {
        let path = entry.path();
        if path.exists() || !path.is_symlink() {
            continue;
        }

        if !real_path(&path).starts_with(snowblock_dir) {
            continue;
        }

        info!("removing invalid link {}", path.display());
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => {
                let err = CleanError::Remove { source: err, path };
                warn!("{err}");
                failure.get_or_insert(err);
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(removed),
    }
}

/// Clean sweep failures.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    /// Target cannot be expanded.
    #[error(transparent)]
    Expansion(#[from] PathError),

    /// Target directory cannot be listed.
    #[error("failed to read directory {}", path.display())]
    ReadDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Dead link cannot be removed.
    #[error("failed to remove invalid link {}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::directive::DirectiveError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::os::unix::fs::{symlink, PermissionsExt};

    fn setup() -> anyhow::Result<(tempfile::TempDir, PathBuf, PathBuf, Context)> {
        let root = tempfile::tempdir()?;
        let base = root.path().canonicalize()?;
        let snowblock = base.join("snowblock");
        let home = base.join("home");
        fs::create_dir_all(&snowblock)?;
        fs::create_dir_all(&home)?;
        let context = Context::new(&snowblock)?;

        Ok((root, snowblock, home, context))
    }

    #[test]
    fn remove_dead_links_into_snowblock() -> anyhow::Result<()> {
        let (_root, snowblock, home, context) = setup()?;
        let live = snowblock.join("vimrc");
        fs::write(&live, "set nocompatible")?;
        symlink(&live, home.join(".vimrc"))?;
        symlink(snowblock.join("gone"), home.join(".gone"))?;
        symlink(snowblock.join("nested/gone"), home.join(".nested"))?;
        let target = home.display().to_string();

        let report = Clean.handle(&context, DIRECTIVE, &json!([target.clone()]))?;

        assert!(report.is_success());
        assert_eq!(report.outcome(&target), Some(&Outcome::Applied));
        assert!(home.join(".vimrc").exists());
        assert!(fs::symlink_metadata(home.join(".gone")).is_err());
        assert!(fs::symlink_metadata(home.join(".nested")).is_err());

        Ok(())
    }

    #[test]
    fn never_remove_foreign_dead_links() -> anyhow::Result<()> {
        let (_root, _snowblock, home, context) = setup()?;
        let foreign = home.join(".foreign");
        symlink("/definitely/not/in/snowblock", &foreign)?;
        let target = home.display().to_string();

        let report = Clean.handle(&context, DIRECTIVE, &json!([target.clone()]))?;

        assert_eq!(report.outcome(&target), Some(&Outcome::Unchanged));
        assert!(fs::symlink_metadata(&foreign)?.file_type().is_symlink());

        Ok(())
    }

    #[test]
    fn does_not_descend_into_subdirectories() -> anyhow::Result<()> {
        let (_root, snowblock, home, context) = setup()?;
        let config = home.join(".config");
        fs::create_dir_all(&config)?;
        symlink(snowblock.join("gone"), config.join("gone"))?;

        Clean.handle(&context, DIRECTIVE, &json!([home.display().to_string()]))?;

        assert!(fs::symlink_metadata(config.join("gone")).is_ok());

        Ok(())
    }

    #[test]
    fn nonexistent_target_is_not_a_failure() -> anyhow::Result<()> {
        let (_root, _snowblock, home, context) = setup()?;
        let target = home.join("missing").display().to_string();

        let report = Clean.handle(&context, DIRECTIVE, &json!([target.clone()]))?;

        assert!(report.is_success());
        assert_eq!(report.outcome(&target), Some(&Outcome::Unchanged));

        Ok(())
    }

    #[test]
    fn relative_targets_anchor_to_snowblock() -> anyhow::Result<()> {
        let (_root, snowblock, _home, context) = setup()?;
        let sub = snowblock.join("sub");
        fs::create_dir_all(&sub)?;
        symlink(snowblock.join("gone"), sub.join("dead"))?;

        let report = Clean.handle(&context, DIRECTIVE, &json!(["sub", "./sub/../sub"]))?;

        assert_eq!(report.entries().len(), 1);
        assert_eq!(report.outcome("sub"), Some(&Outcome::Applied));
        assert!(fs::symlink_metadata(sub.join("dead")).is_err());

        Ok(())
    }

    #[test]
    fn failed_removal_fails_only_its_target() -> anyhow::Result<()> {
        let (_root, snowblock, home, context) = setup()?;
        let locked = home.join("locked");
        let open = home.join("open");
        fs::create_dir_all(&locked)?;
        fs::create_dir_all(&open)?;
        symlink(snowblock.join("gone"), locked.join("dead"))?;
        symlink(snowblock.join("gone"), open.join("dead"))?;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555))?;

        // INVARIANT: Root ignores directory permissions.
        let check = locked.join(".write-check");
        if fs::write(&check, "").is_ok() {
            fs::remove_file(&check)?;
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
            return Ok(());
        }

        let locked_target = locked.display().to_string();
        let open_target = open.display().to_string();
        let report = Clean.handle(
            &context,
            DIRECTIVE,
            &json!([locked_target.clone(), open_target.clone()]),
        );
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
        let report = report?;

        assert!(!report.is_success());
        assert!(report.outcome(&locked_target).is_some_and(Outcome::is_failure));
        assert_eq!(report.outcome(&open_target), Some(&Outcome::Applied));
        assert!(fs::symlink_metadata(locked.join("dead")).is_ok());
        assert!(fs::symlink_metadata(open.join("dead")).is_err());

        Ok(())
    }

    #[test]
    fn reject_malformed_payload() -> anyhow::Result<()> {
        let (_root, _snowblock, _home, context) = setup()?;
        let result = Clean.handle(&context, DIRECTIVE, &json!({ "~": true }));
        assert!(matches!(result, Err(DirectiveError::MalformedPayload { .. })));

        Ok(())
    }
}
