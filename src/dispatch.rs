// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Directive dispatch.
//!
//! The [`Dispatcher`] walks the tasks of one snowblock, and routes every
//! directive to each handler that accepts it. Dispatch is fail-soft: a failing
//! directive never stops the directives and tasks after it.
//!
//! # Ordering
//!
//! Within a task, every "defaults" directive is applied before any other
//! directive of that task. All remaining directives run in declaration order.
//! Thus, `{"link": {..}, "defaults": {"link": {"force": true}}}` links with
//! `force` in effect.

use crate::{
    config::Task,
    context::{Context, ContextError},
    directive::{DirectiveHandler, Registry, Report, DEFAULTS_DIRECTIVE},
};

use serde_json::Value;
use std::path::Path;
use tracing::{debug, error, instrument};

/// Route directives of snowblock tasks to their handlers.
pub struct Dispatcher {
    context: Context,
    handlers: Vec<Box<dyn DirectiveHandler>>,
}

impl Dispatcher {
    /// Construct new dispatcher for target snowblock directory.
    ///
    /// Every handler of the registry is instantiated exactly once.
    ///
    /// # Errors
    ///
    /// - Return [`DispatchError::Context`] if snowblock directory is invalid.
    pub fn new(snowblock_dir: impl AsRef<Path>, registry: &Registry) -> Result<Self> {
        Ok(Self::with_context(Context::new(snowblock_dir)?, registry))
    }

    /// Construct new dispatcher around an existing context.
    pub fn with_context(context: Context, registry: &Registry) -> Self {
        Self {
            context,
            handlers: registry.instantiate(),
        }
    }

    /// Execution context owned by dispatcher.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Dispatch every directive of every task in order.
    ///
    /// Returns per-directive results. Use [`DispatchReport::is_success`] to
    /// get the aggregate outcome.
    #[instrument(skip(self, tasks), level = "debug")]
    pub fn dispatch(&mut self, tasks: &[Task]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (index, task) in tasks.iter().enumerate() {
            debug!("dispatch task {index} with {} directive(s)", task.len());

            // INVARIANT: Defaults of a task must be in effect for every other
            //   directive of that same task.
            for (directive, payload) in task.directives() {
                if directive == DEFAULTS_DIRECTIVE {
                    let result = self.apply_defaults(payload);
                    report.push(directive, result);
                }
            }

            for (directive, payload) in task.directives() {
                if directive != DEFAULTS_DIRECTIVE {
                    self.route(directive, payload, &mut report);
                }
            }
        }

        report
    }

    fn apply_defaults(&mut self, payload: &Value) -> DirectiveResult {
        match payload {
            Value::Object(defaults) => {
                self.context.set_defaults(defaults.clone());
                DirectiveResult::DefaultsApplied
            }
            _ => {
                error!("defaults must map directive names to options");
                DirectiveResult::Faulted {
                    handler: DEFAULTS_DIRECTIVE,
                    reason: "defaults must map directive names to options".into(),
                }
            }
        }
    }

    fn route(&self, directive: &str, payload: &Value, report: &mut DispatchReport) {
        let mut handled = false;
        for handler in self.handlers.iter().filter(|handler| handler.can_handle(directive)) {
            handled = true;
            let result = match handler.handle(&self.context, directive, payload) {
                Ok(outcome) => DirectiveResult::Handled {
                    handler: handler.name(),
                    report: outcome,
                },
                Err(err) => {
                    error!("handler {:?} failed on directive {directive:?}: {err}", handler.name());
                    DirectiveResult::Faulted {
                        handler: handler.name(),
                        reason: err.to_string(),
                    }
                }
            };
            report.push(directive, result);
        }

        if !handled {
            error!("directive {directive:?} not handled");
            report.push(directive, DirectiveResult::Unhandled);
        }
    }
}

/// Result of dispatching one directive to one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveResult {
    /// Defaults pseudo-directive replaced context defaults.
    DefaultsApplied,

    /// Handler reconciled payload.
    Handled {
        handler: &'static str,
        report: Report,
    },

    /// Handler could not process payload at all.
    Faulted {
        handler: &'static str,
        reason: String,
    },

    /// No handler accepts directive.
    Unhandled,
}

impl DirectiveResult {
    pub fn is_success(&self) -> bool {
        match self {
            Self::DefaultsApplied => true,
            Self::Handled { report, .. } => report.is_success(),
            Self::Faulted { .. } | Self::Unhandled => false,
        }
    }
}

/// Per-directive results of a dispatch in processing order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    results: Vec<(String, DirectiveResult)>,
}

impl DispatchReport {
    fn push(&mut self, directive: &str, result: DirectiveResult) {
        self.results.push((directive.to_string(), result));
    }

    /// Directive names paired with their results.
    pub fn results(&self) -> &[(String, DirectiveResult)] {
        self.results.as_slice()
    }

    /// Results recorded for target directive.
    pub fn results_for<'a>(&'a self, directive: &'a str) -> impl Iterator<Item = &'a DirectiveResult> {
        self.results
            .iter()
            .filter(move |(name, _)| name == directive)
            .map(|(_, result)| result)
    }

    /// True if every directive succeeded.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, result)| result.is_success())
    }
}

/// Dispatch error types.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Execution context cannot be set up.
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Friendly result alias :3
type Result<T, E = DispatchError> = std::result::Result<T, E>;
