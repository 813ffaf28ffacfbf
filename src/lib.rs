// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bootstrap dotfiles through declarative snowblocks.
//!
//! Snowsaw reconciles the file system against what a __snowblock__ declares.
//! A snowblock is a directory of dotfiles with a `snowblock.json` listing
//! __tasks__, and every task maps __directive__ names to payloads:
//!
//! ```json
//! [
//!   { "defaults": { "link": { "create": true, "relink": true } } },
//!   { "clean": ["~"] },
//!   { "link": { "~/.vimrc": null, "~/.config/nvim": "nvim" } },
//!   { "shell": [["git submodule update --init", "Updating submodules"]] }
//! ]
//! ```
//!
//! Reconciliation is idempotent. Running the same snowblock twice leaves the
//! file system untouched the second time around.
//!
//! # See Also
//!
//! 1. [`dispatch::Dispatcher`]
//! 2. [`directive::DirectiveHandler`]
//! 3. [`snowblock::bootstrap`]

pub mod config;
pub mod context;
pub mod directive;
pub mod dispatch;
pub mod path;
pub mod snowblock;

pub use config::{Settings, Task};
pub use context::Context;
pub use directive::{DirectiveHandler, Outcome, Registry, Report};
pub use dispatch::{DispatchReport, Dispatcher};
pub use snowblock::{bootstrap, discover, BootstrapSummary, Snowblock};
