// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Symbolic link reconciliation.
//!
//! The "link" directive maps link destinations to sources inside of the
//! snowblock directory:
//!
//! ```json
//! {
//!   "link": {
//!     "~/.vimrc": null,
//!     "~/.gitconfig": "git/config",
//!     "~/.config/nvim": { "path": "nvim", "create": true, "relink": true },
//!     "~/.xinitrc": { "hosts": { "desk": "x/desk", "-": "x/default" } }
//!   }
//! }
//! ```
//!
//! A `null` source means the basename of the destination with one leading dot
//! stripped, e.g., `~/.vimrc` links to `vimrc`. Sources are resolved relative
//! to the snowblock directory.
//!
//! # Options
//!
//! - `relative`: Link through a path relative to the destination's directory
//!   instead of an absolute path.
//! - `force`: Remove whatever occupies the destination, including regular
//!   files and whole directories.
//! - `relink`: Replace symbolic links at the destination that point elsewhere.
//! - `create`: Create missing parent directories of the destination.
//! - `hosts`: Map host names to alternate sources. The sentinel host `-`
//!   applies to any host without its own entry. If the current host has no
//!   entry and no sentinel exists, the link is skipped.
//!
//! All options cascade: entry value, then "defaults" of the directive, then
//! `false` or empty.

use crate::{
    context::{resolve, Context},
    directive::{
        decode_payload, ensure_owned, DirectiveHandler, Outcome, Report, Result, ANY_HOST,
    },
    path::{absolute, expand, normalize, relative_to, PathError},
};

use serde::Deserialize;
use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{error, info, instrument, warn};

/// Directive name owned by [`Link`].
pub const DIRECTIVE: &str = "link";

/// Options of a link entry, and of link defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    /// Source path relative to snowblock directory. Ignored in defaults.
    pub path: Option<String>,
    pub relative: Option<bool>,
    pub force: Option<bool>,
    pub relink: Option<bool>,
    pub create: Option<bool>,
    pub hosts: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum LinkSource {
    Path(String),
    Options(LinkOptions),
}

impl From<Option<LinkSource>> for LinkOptions {
    fn from(source: Option<LinkSource>) -> Self {
        match source {
            None => LinkOptions::default(),
            Some(LinkSource::Path(path)) => LinkOptions {
                path: Some(path),
                ..Default::default()
            },
            Some(LinkSource::Options(options)) => options,
        }
    }
}

/// Link entry with every option resolved through the defaults cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkSpec {
    relative: bool,
    force: bool,
    relink: bool,
    create: bool,
    hosts: BTreeMap<String, String>,
    source: Option<String>,
}

impl LinkSpec {
    fn resolve(entry: LinkOptions, defaults: &LinkOptions) -> Self {
        Self {
            relative: resolve(entry.relative, defaults.relative, false),
            force: resolve(entry.force, defaults.force, false),
            relink: resolve(entry.relink, defaults.relink, false),
            create: resolve(entry.create, defaults.create, false),
            hosts: resolve(entry.hosts, defaults.hosts.clone(), BTreeMap::new()),
            source: entry.path.filter(|path| !path.is_empty()),
        }
    }
}

/// What the file system holds at a link destination.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Destination {
    /// Nothing at all.
    Missing,

    /// Symbolic link whose target does not exist.
    Dangling(PathBuf),

    /// Symbolic link whose target exists.
    Link(PathBuf),

    /// Regular file or directory.
    Occupied,
}

impl Destination {
    fn inspect(path: &Path) -> Self {
        match fs::symlink_metadata(path) {
            Err(_) => Self::Missing,
            Ok(meta) if meta.file_type().is_symlink() => match fs::read_link(path) {
                Ok(current) if path.exists() => Self::Link(current),
                Ok(current) => Self::Dangling(current),
                Err(_) => Self::Occupied,
            },
            Ok(_) => Self::Occupied,
        }
    }
}

/// Successful reconciliation of a link entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkChange {
    Created { destination: PathBuf, target: PathBuf },
    Unchanged { destination: PathBuf, target: PathBuf },
    Skipped,
}

/// Handler of the "link" directive.
#[derive(Debug, Default, Clone, Copy)]
pub struct Link;

impl Link {
    /// Construct handler behind trait object for [`crate::directive::Registry`].
    pub fn boxed() -> Box<dyn DirectiveHandler> {
        Box::new(Self)
    }

    fn reconcile(
        &self,
        context: &Context,
        declared: &str,
        spec: LinkSpec,
    ) -> Result<LinkChange, LinkError> {
        let destination = absolute(expand(declared)?);
        let mut source = match spec.source {
            Some(source) => expand(source)?,
            None => PathBuf::from(default_source(&destination)),
        };

        if !spec.hosts.is_empty() {
            if let Some(host_source) = spec.hosts.get(context.hostname()) {
                source = expand(host_source)?;
            } else if let Some(any_source) = spec.hosts.get(ANY_HOST) {
                source = expand(any_source)?;
                info!(
                    "applying default link {declared} -> {}",
                    context.snowblock_dir().join(&source).display()
                );
            } else {
                for host_source in spec.hosts.values() {
                    warn!(
                        "skipped host specific link {declared} -> {}",
                        context.snowblock_dir().join(host_source).display()
                    );
                }
                return Ok(LinkChange::Skipped);
            }
        }

        let absolute_source = normalize(context.snowblock_dir().join(&source));
        if !absolute_source.exists() {
            return Err(LinkError::NonexistentTarget {
                destination,
                target: absolute_source,
            });
        }

        let target = if spec.relative {
            relative_to(&absolute_source, parent_dir(&destination))
        } else {
            absolute_source.clone()
        };

        if spec.create {
            create_parent(&destination)?;
        }

        if spec.force || spec.relink {
            remove_conflict(&destination, &target, spec.force)?;
        }

        link(destination, target, &absolute_source)
    }
}

impl DirectiveHandler for Link {
    fn name(&self) -> &'static str {
        DIRECTIVE
    }

    fn can_handle(&self, directive: &str) -> bool {
        directive == DIRECTIVE
    }

    #[instrument(skip(self, context, payload), level = "debug")]
    fn handle(&self, context: &Context, directive: &str, payload: &Value) -> Result<Report> {
        ensure_owned(self, directive)?;
        let defaults: LinkOptions = context.directive_defaults(DIRECTIVE)?;

        // INVARIANT: Decode every entry before touching the file system.
        let links: Map<String, Value> = decode_payload(directive, payload)?;
        let mut entries = Vec::with_capacity(links.len());
        for (destination, source) in links {
            let source: Option<LinkSource> = decode_payload(directive, &source)?;
            entries.push((destination, LinkSpec::resolve(source.into(), &defaults)));
        }

        let mut report = Report::new();
        for (declared, spec) in entries {
            let outcome = match self.reconcile(context, &declared, spec) {
                Ok(LinkChange::Created { destination, target }) => {
                    info!("creating link {} -> {}", destination.display(), target.display());
                    Outcome::Applied
                }
                Ok(LinkChange::Unchanged { destination, target }) => {
                    info!("link already exists {} -> {}", destination.display(), target.display());
                    Outcome::Unchanged
                }
                Ok(LinkChange::Skipped) => Outcome::Skipped,
                Err(err) => {
                    warn!("{err}");
                    Outcome::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            report.record(declared, outcome);
        }

        if report.is_success() {
            info!("=> all links have been set up");
        } else {
            error!("some links were not successfully set up");
        }

        Ok(report)
    }
}

/// Derive source from destination basename with one leading dot stripped.
fn default_source(destination: &Path) -> String {
    let basename = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match basename.strip_prefix('.') {
        Some(stripped) => stripped.to_string(),
        None => basename,
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("/"))
}

fn create_parent(destination: &Path) -> Result<(), LinkError> {
    let parent = parent_dir(destination);
    if parent.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(parent).map_err(|err| LinkError::CreateDirectory {
        source: err,
        path: parent.to_path_buf(),
    })?;
    info!("creating directory {}", parent.display());

    Ok(())
}

fn remove_conflict(destination: &Path, target: &Path, force: bool) -> Result<(), LinkError> {
    let removal = match Destination::inspect(destination) {
        Destination::Link(current) | Destination::Dangling(current) if current != target => {
            fs::remove_file(destination)
        }
        Destination::Occupied if force => {
            if destination.is_dir() {
                fs::remove_dir_all(destination)
            } else {
                fs::remove_file(destination)
            }
        }
        _ => return Ok(()),
    };

    removal.map_err(|err| LinkError::Remove {
        source: err,
        path: destination.to_path_buf(),
    })?;
    info!("removing {}", destination.display());

    Ok(())
}

fn link(destination: PathBuf, target: PathBuf, absolute_source: &Path) -> Result<LinkChange, LinkError> {
    let source_exists = absolute_source.exists();
    match Destination::inspect(&destination) {
        Destination::Dangling(current) if current != target => {
            Err(LinkError::InvalidLink { destination, current })
        }
        Destination::Missing if source_exists => match create_symlink(&target, &destination) {
            Ok(()) => Ok(LinkChange::Created { destination, target }),
            Err(err) => Err(LinkError::Symlink {
                source: err,
                destination,
                target,
            }),
        },
        Destination::Occupied => Err(LinkError::AlreadyExists { destination }),
        Destination::Link(current) if current != target => {
            Err(LinkError::IncorrectLink { destination, current })
        }
        Destination::Link(_) if source_exists => Ok(LinkChange::Unchanged { destination, target }),
        Destination::Missing | Destination::Dangling(_) | Destination::Link(_) => {
            Err(LinkError::NonexistentTarget {
                destination,
                target: absolute_source.to_path_buf(),
            })
        }
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    let resolved = parent_dir(link).join(target);
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Link reconciliation failures.
///
/// None of these abort the directive. They only fail the entry they belong to.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Declared path cannot be expanded.
    #[error(transparent)]
    Expansion(#[from] PathError),

    /// Source of link does not exist.
    #[error("nonexistent target {} -> {}", destination.display(), target.display())]
    NonexistentTarget { destination: PathBuf, target: PathBuf },

    /// Parent directory of destination cannot be created.
    #[error("failed to create directory {}", path.display())]
    CreateDirectory {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Conflicting destination cannot be removed.
    #[error("failed to remove {}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Destination is a dangling link to somewhere else.
    #[error("invalid link {} -> {}", destination.display(), current.display())]
    InvalidLink { destination: PathBuf, current: PathBuf },

    /// Destination is a regular file or directory.
    #[error("{} already exists but is a regular file or directory", destination.display())]
    AlreadyExists { destination: PathBuf },

    /// Destination links to somewhere else.
    #[error("incorrect link {} -> {}", destination.display(), current.display())]
    IncorrectLink { destination: PathBuf, current: PathBuf },

    /// Symbolic link cannot be created.
    #[error("linking failed {} -> {}", destination.display(), target.display())]
    Symlink {
        #[source]
        source: std::io::Error,
        destination: PathBuf,
        target: PathBuf,
    },
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::directive::DirectiveError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use simple_test_case::test_case;
    use std::os::unix::fs::{symlink, PermissionsExt};
    use tempfile::TempDir;

    /// Check if file permissions actually restrict us, i.e., not running as root.
    fn permissions_enforced(read_only_dir: &Path) -> bool {
        let check = read_only_dir.join(".write-check");
        match fs::write(&check, "") {
            Ok(()) => {
                let _ = fs::remove_file(&check);
                false
            }
            Err(_) => true,
        }
    }

    struct Fixture {
        _root: TempDir,
        snowblock: PathBuf,
        home: PathBuf,
        context: Context,
    }

    impl Fixture {
        fn new() -> anyhow::Result<Self> {
            let root = tempfile::tempdir()?;
            let base = root.path().canonicalize()?;
            let snowblock = base.join("snowblock");
            let home = base.join("home");
            fs::create_dir_all(&snowblock)?;
            fs::create_dir_all(&home)?;
            let context = Context::new(&snowblock)?.with_hostname("desk");

            Ok(Self {
                _root: root,
                snowblock,
                home,
                context,
            })
        }

        fn source(&self, name: &str) -> anyhow::Result<PathBuf> {
            let path = self.snowblock.join(name);
            fs::create_dir_all(parent_dir(&path))?;
            fs::write(&path, name)?;
            Ok(path)
        }

        fn dest(&self, name: &str) -> String {
            self.home.join(name).display().to_string()
        }

        fn link(&self, payload: Value) -> Result<Report> {
            Link.handle(&self.context, DIRECTIVE, &payload)
        }
    }

    #[test_case("/home/u/.vimrc", "vimrc"; "strip leading dot")]
    #[test_case("/home/u/vimrc", "vimrc"; "no dot")]
    #[test_case("/home/u/..hidden", ".hidden"; "strip only one dot")]
    #[test]
    fn default_source_from_basename(destination: &str, expect: &str) {
        pretty_assertions::assert_eq!(default_source(Path::new(destination)), expect);
    }

    #[test]
    fn create_link_from_basename() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let source = fixture.source("vimrc")?;
        let dest = fixture.dest(".vimrc");

        let report = fixture.link(json!({ dest.clone(): null }))?;

        assert!(report.is_success());
        assert_eq!(report.outcome(&dest), Some(&Outcome::Applied));
        assert_eq!(fs::read_link(&dest)?, source);

        Ok(())
    }

    #[test]
    fn reconcile_twice_is_idempotent() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.source("vimrc")?;
        fixture.source("git/config")?;
        let payload = json!({
            fixture.dest(".vimrc"): null,
            fixture.dest(".gitconfig"): "git/config",
            fixture.dest(".config/git/config"): { "path": "git/config", "create": true, "relative": true },
        });

        let first = fixture.link(payload.clone())?;
        assert!(first.is_success());
        assert!(first.entries().iter().all(|entry| entry.outcome == Outcome::Applied));

        let second = fixture.link(payload)?;
        assert!(second.is_success());
        assert!(second.entries().iter().all(|entry| entry.outcome == Outcome::Unchanged));

        Ok(())
    }

    #[test]
    fn nonexistent_source_leaves_destination_alone() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let dest = fixture.dest(".zshrc");

        let report = fixture.link(json!({ dest.clone(): { "force": true, "create": true } }))?;

        assert!(!report.is_success());
        assert!(fs::symlink_metadata(&dest).is_err());

        Ok(())
    }

    #[test]
    fn regular_file_without_force_fails() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.source("vimrc")?;
        let dest = fixture.dest(".vimrc");
        fs::write(&dest, "mine")?;

        let report = fixture.link(json!({ dest.clone(): null }))?;

        assert!(!report.is_success());
        assert_eq!(fs::read_to_string(&dest)?, "mine");

        Ok(())
    }

    #[test]
    fn relink_keeps_regular_files() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.source("vimrc")?;
        let dest = fixture.dest(".vimrc");
        fs::write(&dest, "mine")?;

        let report = fixture.link(json!({ dest.clone(): { "relink": true } }))?;

        assert!(!report.is_success());
        assert_eq!(fs::read_to_string(&dest)?, "mine");

        Ok(())
    }

    #[test]
    fn force_replaces_directory() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let source = fixture.source("nvim/init.lua")?;
        let dest = fixture.dest(".config/nvim");
        fs::create_dir_all(&dest)?;
        fs::write(Path::new(&dest).join("old.vim"), "old")?;

        let report = fixture.link(json!({ dest.clone(): { "path": "nvim", "force": true } }))?;

        assert!(report.is_success());
        assert_eq!(fs::read_link(&dest)?, parent_dir(&source));

        Ok(())
    }

    #[test]
    fn incorrect_link_fails_unless_relinked() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let source = fixture.source("vimrc")?;
        let other = fixture.source("other")?;
        let dest = fixture.dest(".vimrc");
        symlink(&other, &dest)?;

        let report = fixture.link(json!({ dest.clone(): null }))?;
        assert!(!report.is_success());
        assert_eq!(fs::read_link(&dest)?, other);

        let report = fixture.link(json!({ dest.clone(): { "relink": true } }))?;
        assert!(report.is_success());
        assert_eq!(fs::read_link(&dest)?, source);

        Ok(())
    }

    #[test]
    fn dangling_link_elsewhere_is_invalid() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.source("vimrc")?;
        let dest = fixture.dest(".vimrc");
        symlink(fixture.home.join("gone"), &dest)?;

        let report = fixture.link(json!({ dest.clone(): null }))?;

        assert!(!report.is_success());
        assert_eq!(fs::read_link(&dest)?, fixture.home.join("gone"));

        Ok(())
    }

    #[test]
    fn relative_link_points_from_destination_dir() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.source("vimrc")?;
        let dest = fixture.dest(".vimrc");

        let report = fixture.link(json!({ dest.clone(): { "relative": true } }))?;

        assert!(report.is_success());
        assert_eq!(fs::read_link(&dest)?, PathBuf::from("../snowblock/vimrc"));
        assert_eq!(fs::read_to_string(&dest)?, "vimrc");

        Ok(())
    }

    #[test]
    fn missing_parent_without_create_fails() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.source("vimrc")?;
        let dest = fixture.dest("nested/dir/.vimrc");

        let report = fixture.link(json!({ dest.clone(): null }))?;
        assert!(!report.is_success());

        let report = fixture.link(json!({ dest.clone(): { "create": true } }))?;
        assert!(report.is_success());
        assert!(Path::new(&dest).exists());

        Ok(())
    }

    #[test]
    fn failed_parent_creation_does_not_stop_siblings() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.source("vimrc")?;
        fixture.source("zshrc")?;
        fs::write(fixture.home.join("blocker"), "regular file")?;
        let blocked = fixture.dest("blocker/nested/.vimrc");
        let zshrc = fixture.dest(".zshrc");

        let report = fixture.link(json!({
            blocked.clone(): { "create": true },
            zshrc.clone(): { "create": true },
        }))?;

        assert!(!report.is_success());
        assert!(report.outcome(&blocked).is_some_and(Outcome::is_failure));
        assert_eq!(report.outcome(&zshrc), Some(&Outcome::Applied));
        assert_eq!(fs::read_to_string(fixture.home.join("blocker"))?, "regular file");

        Ok(())
    }

    #[test]
    fn failed_removal_leaves_destination_in_place() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.source("vimrc")?;
        fixture.source("zshrc")?;
        let locked = fixture.home.join("locked");
        fs::create_dir_all(&locked)?;
        let vimrc = fixture.dest("locked/.vimrc");
        let zshrc = fixture.dest(".zshrc");
        fs::write(&vimrc, "mine")?;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555))?;
        if !permissions_enforced(&locked) {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
            return Ok(());
        }

        let report = fixture.link(json!({
            vimrc.clone(): { "force": true },
            zshrc.clone(): null,
        }));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
        let report = report?;

        assert!(report.outcome(&vimrc).is_some_and(Outcome::is_failure));
        assert_eq!(report.outcome(&zshrc), Some(&Outcome::Applied));
        assert_eq!(fs::read_to_string(&vimrc)?, "mine");

        Ok(())
    }

    #[test]
    fn host_specific_source() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let desk = fixture.source("xinitrc.desk")?;
        fixture.source("xinitrc.laptop")?;
        let dest = fixture.dest(".xinitrc");

        let report = fixture.link(json!({
            dest.clone(): { "hosts": { "desk": "xinitrc.desk", "laptop": "xinitrc.laptop" } }
        }))?;

        assert!(report.is_success());
        assert_eq!(fs::read_link(&dest)?, desk);

        Ok(())
    }

    #[test]
    fn host_fallback_source() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let fallback = fixture.source("xinitrc")?;
        fixture.source("xinitrc.laptop")?;
        let dest = fixture.dest(".xinitrc");

        let report = fixture.link(json!({
            dest.clone(): { "hosts": { "laptop": "xinitrc.laptop", "-": "xinitrc" } }
        }))?;

        assert!(report.is_success());
        assert_eq!(fs::read_link(&dest)?, fallback);

        Ok(())
    }

    #[test]
    fn host_mismatch_skips_entry() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.source("xinitrc.laptop")?;
        let dest = fixture.dest(".xinitrc");
        fs::write(&dest, "untouched")?;

        let report = fixture.link(json!({
            dest.clone(): { "hosts": { "laptop": "xinitrc.laptop" }, "force": true }
        }))?;

        assert!(report.is_success());
        assert_eq!(report.outcome(&dest), Some(&Outcome::Skipped));
        assert_eq!(fs::read_to_string(&dest)?, "untouched");

        Ok(())
    }

    #[test]
    fn directive_defaults_cascade() -> anyhow::Result<()> {
        let mut fixture = Fixture::new()?;
        fixture.source("vimrc")?;
        fixture.source("zshrc")?;
        let vimrc = fixture.dest(".vimrc");
        let zshrc = fixture.dest(".zshrc");
        fs::write(&vimrc, "mine")?;
        fs::write(&zshrc, "mine")?;
        let defaults = json!({ "link": { "force": true } });
        fixture.context.set_defaults(defaults.as_object().cloned().unwrap_or_default());

        let report = fixture.link(json!({
            vimrc.clone(): null,
            zshrc.clone(): { "force": false },
        }))?;

        assert_eq!(report.outcome(&vimrc), Some(&Outcome::Applied));
        assert!(report.outcome(&zshrc).is_some_and(Outcome::is_failure));
        assert_eq!(fs::read_to_string(&zshrc)?, "mine");

        Ok(())
    }

    #[test]
    fn failing_entry_does_not_stop_siblings() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.source("vimrc")?;
        let missing = fixture.dest(".missing");
        let vimrc = fixture.dest(".vimrc");

        let report = fixture.link(json!({ missing.clone(): null, vimrc.clone(): null }))?;

        assert!(!report.is_success());
        assert!(report.outcome(&missing).is_some_and(Outcome::is_failure));
        assert_eq!(report.outcome(&vimrc), Some(&Outcome::Applied));

        Ok(())
    }

    #[test]
    fn reject_foreign_directive() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let result = Link.handle(&fixture.context, "clean", &json!([]));
        assert!(matches!(result, Err(DirectiveError::Unsupported { .. })));

        Ok(())
    }

    #[test]
    fn reject_malformed_payload() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        assert!(matches!(
            fixture.link(json!(["~/.vimrc"])),
            Err(DirectiveError::MalformedPayload { .. })
        ));
        assert!(matches!(
            fixture.link(json!({ "~/.vimrc": 42 })),
            Err(DirectiveError::MalformedPayload { .. })
        ));

        Ok(())
    }
}
