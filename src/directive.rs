// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Directive handling.
//!
//! A __directive__ is a named operation declared inside of a snowblock task,
//! e.g., "link", "clean", or "shell". Each directive is reconciled by a
//! __directive handler__ that knows how to converge the file system toward
//! what the directive's payload declares.
//!
//! # Handler Contract
//!
//! A handler states which directive names it accepts through
//! [`DirectiveHandler::can_handle`], and performs the reconciliation through
//! [`DirectiveHandler::handle`]. Reconciliation is best-effort: every item of a
//! payload is attempted, and the outcome of each item is recorded in a
//! [`Report`] instead of interrupting the remaining items. Only faults that
//! make the payload as a whole unusable are returned as [`DirectiveError`].
//!
//! # Registry
//!
//! Snowsaw does not load handlers at runtime. Instead, a [`Registry`] of
//! handler factories is assembled on startup. [`Registry::core`] provides the
//! built-in handlers, and library users may [`Registry::register`] their own.
//!
//! # See Also
//!
//! 1. [`link`]
//! 2. [`clean`]
//! 3. [`shell`]

pub mod clean;
pub mod link;
pub mod shell;

use crate::context::{Context, ContextError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::{Debug, Formatter, Result as FmtResult};

/// Name of the pseudo-directive that sets directive defaults.
pub const DEFAULTS_DIRECTIVE: &str = "defaults";

/// Sentinel host name matching any host.
///
/// A single minus is not a valid host name according to RFC 1123, so it never
/// collides with an actual host.
pub const ANY_HOST: &str = "-";

/// Reconcile directives of snowblock tasks.
pub trait DirectiveHandler {
    /// Short name of the handler used in log messages.
    fn name(&self) -> &'static str;

    /// Check if handler accepts target directive.
    fn can_handle(&self, directive: &str) -> bool;

    /// Reconcile payload of target directive.
    ///
    /// The context is only lent to the handler for the duration of the call.
    ///
    /// # Errors
    ///
    /// - Return [`DirectiveError::Unsupported`] if handler does not accept
    ///   target directive.
    /// - Return [`DirectiveError::MalformedPayload`] if payload does not
    ///   match the layout the handler expects.
    /// - Return [`DirectiveError::Context`] if directive defaults are
    ///   malformed.
    fn handle(&self, context: &Context, directive: &str, payload: &Value) -> Result<Report>;
}

/// Outcome of reconciling one item of a directive payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// File system or process state was changed to converge.
    Applied,

    /// Item already converged, nothing was done.
    Unchanged,

    /// Item does not apply to this run, e.g., it targets another host.
    Skipped,

    /// Item failed to converge.
    Failed { reason: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcome of reconciling one item, tagged by what the item was about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Item as declared, e.g., a link destination or a command line.
    pub subject: String,

    /// What happened to the item.
    pub outcome: Outcome,
}

/// Per-item outcomes of reconciling a directive payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    entries: Vec<Entry>,
}

impl Report {
    /// Construct new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record outcome of an item.
    pub fn record(&mut self, subject: impl Into<String>, outcome: Outcome) {
        self.entries.push(Entry {
            subject: subject.into(),
            outcome,
        });
    }

    /// Recorded outcomes in reconciliation order.
    pub fn entries(&self) -> &[Entry] {
        self.entries.as_slice()
    }

    /// Outcome recorded for target subject.
    pub fn outcome(&self, subject: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|entry| entry.subject == subject)
            .map(|entry| &entry.outcome)
    }

    /// True if no item failed.
    pub fn is_success(&self) -> bool {
        !self.entries.iter().any(|entry| entry.outcome.is_failure())
    }
}

/// Construct a directive handler.
pub type HandlerFactory = fn() -> Box<dyn DirectiveHandler>;

/// Startup-time listing of available directive handlers.
#[derive(Clone, Default)]
pub struct Registry {
    factories: Vec<HandlerFactory>,
}

impl Registry {
    /// Construct registry without any handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Construct registry with the built-in link, clean, and shell handlers.
    pub fn core() -> Self {
        let mut registry = Self::empty();
        registry
            .register(link::Link::boxed)
            .register(clean::Clean::boxed)
            .register(shell::Shell::boxed);
        registry
    }

    /// Add handler factory to registry.
    pub fn register(&mut self, factory: HandlerFactory) -> &mut Self {
        self.factories.push(factory);
        self
    }

    /// Construct one instance of every registered handler.
    pub fn instantiate(&self) -> Vec<Box<dyn DirectiveHandler>> {
        self.factories.iter().map(|factory| factory()).collect()
    }

    /// Names of registered handlers.
    pub fn names(&self) -> Vec<&'static str> {
        self.instantiate().iter().map(|handler| handler.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Debug for Registry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("Registry")
            .field("handlers", &self.names())
            .finish()
    }
}

/// Reject directive that handler does not own.
///
/// # Errors
///
/// - Return [`DirectiveError::Unsupported`] if handler cannot handle
///   directive.
pub(crate) fn ensure_owned(handler: &dyn DirectiveHandler, directive: &str) -> Result<()> {
    if !handler.can_handle(directive) {
        return Err(DirectiveError::Unsupported {
            handler: handler.name(),
            directive: directive.to_string(),
        });
    }

    Ok(())
}

/// Decode directive payload into handler specific layout.
///
/// # Errors
///
/// - Return [`DirectiveError::MalformedPayload`] if payload does not match
///   layout of `T`.
pub(crate) fn decode_payload<T>(directive: &str, payload: &Value) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(payload.clone()).map_err(|err| DirectiveError::MalformedPayload {
        source: err,
        directive: directive.to_string(),
    })
}

/// Directive handling error types.
#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    /// Handler invoked for directive it does not own.
    #[error("handler {handler:?} cannot handle directive {directive:?}")]
    Unsupported {
        handler: &'static str,
        directive: String,
    },

    /// Payload does not match layout expected by handler.
    #[error("malformed payload for directive {directive:?}")]
    MalformedPayload {
        #[source]
        source: serde_json::Error,
        directive: String,
    },

    /// Directive defaults are unusable.
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Friendly result alias :3
pub type Result<T, E = DirectiveError> = std::result::Result<T, E>;
