// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Shell command execution.
//!
//! The "shell" directive runs a list of commands through the user's shell
//! with the snowblock directory as the working directory. Each command may be
//! declared in one of three forms:
//!
//! ```json
//! {
//!   "shell": [
//!     "git submodule update --init",
//!     ["vim +PlugInstall +qall", "Installing vim plugins"],
//!     { "command": "fc-cache -f", "description": "Refreshing fonts", "stdout": true, "host": "desk" }
//!   ]
//! }
//! ```
//!
//! Standard streams are discarded unless `stdin`, `stdout`, or `stderr` are
//! enabled on the command or through the directive's defaults. A command with
//! a `host` only runs on that host, or on any host if `host` is `-`.

use crate::{
    context::{resolve, Context},
    directive::{
        decode_payload, ensure_owned, DirectiveError, DirectiveHandler, Outcome, Report, Result,
        ANY_HOST,
    },
};

use serde::Deserialize;
use serde_json::Value;
use std::{
    path::Path,
    process::{Command, ExitStatus, Stdio},
};
use tracing::{error, info, instrument, warn};

/// Directive name owned by [`Shell`].
pub const DIRECTIVE: &str = "shell";

/// Shell used when `$SHELL` is not set.
pub const FALLBACK_SHELL: &str = "/bin/sh";

/// Stream inheritance defaults of the "shell" directive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamDefaults {
    pub stdin: Option<bool>,
    pub stdout: Option<bool>,
    pub stderr: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum CommandSpec {
    Line(String),
    Pair(Vec<String>),
    Descriptor {
        command: String,
        description: Option<String>,
        stdin: Option<bool>,
        stdout: Option<bool>,
        stderr: Option<bool>,
        host: Option<String>,
    },
}

/// Command with description, streams, and host gate resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ShellCommand {
    command: String,
    description: Option<String>,
    stdin: bool,
    stdout: bool,
    stderr: bool,
    host: Option<String>,
}

impl ShellCommand {
    fn resolve(spec: CommandSpec, defaults: &StreamDefaults) -> Option<Self> {
        let (command, description, stdin, stdout, stderr, host) = match spec {
            CommandSpec::Line(command) => (command, None, None, None, None, None),
            CommandSpec::Pair(mut pair) => {
                if pair.is_empty() {
                    return None;
                }
                let description = (pair.len() > 1).then(|| pair.swap_remove(1));
                (pair.swap_remove(0), description, None, None, None, None)
            }
            CommandSpec::Descriptor {
                command,
                description,
                stdin,
                stdout,
                stderr,
                host,
            } => (command, description, stdin, stdout, stderr, host),
        };

        Some(Self {
            command,
            description,
            stdin: resolve(stdin, defaults.stdin, false),
            stdout: resolve(stdout, defaults.stdout, false),
            stderr: resolve(stderr, defaults.stderr, false),
            host,
        })
    }

    fn runs_on(&self, hostname: &str) -> bool {
        match self.host.as_deref() {
            None | Some(ANY_HOST) => true,
            Some(host) => host == hostname,
        }
    }

    fn run(&self, shell: &str, working_dir: &Path) -> Result<(), ShellError> {
        let status = Command::new(shell)
            .arg("-c")
            .arg(&self.command)
            .current_dir(working_dir)
            .stdin(stdio(self.stdin))
            .stdout(stdio(self.stdout))
            .stderr(stdio(self.stderr))
            .status()
            .map_err(|err| ShellError::Spawn {
                source: err,
                command: self.command.clone(),
            })?;

        if !status.success() {
            return Err(ShellError::Failed {
                command: self.command.clone(),
                status,
            });
        }

        Ok(())
    }
}

fn stdio(inherit: bool) -> Stdio {
    if inherit {
        Stdio::inherit()
    } else {
        Stdio::null()
    }
}

/// Determine shell to run commands with.
fn user_shell() -> String {
    match std::env::var("SHELL") {
        Ok(shell) if !shell.is_empty() => shell,
        _ => FALLBACK_SHELL.to_string(),
    }
}

/// Handler of the "shell" directive.
#[derive(Debug, Default, Clone, Copy)]
pub struct Shell;

impl Shell {
    /// Construct handler behind trait object for [`crate::directive::Registry`].
    pub fn boxed() -> Box<dyn DirectiveHandler> {
        Box::new(Self)
    }
}

impl DirectiveHandler for Shell {
    fn name(&self) -> &'static str {
        DIRECTIVE
    }

    fn can_handle(&self, directive: &str) -> bool {
        directive == DIRECTIVE
    }

    #[instrument(skip(self, context, payload), level = "debug")]
    fn handle(&self, context: &Context, directive: &str, payload: &Value) -> Result<Report> {
        ensure_owned(self, directive)?;
        let defaults: StreamDefaults = context.directive_defaults(DIRECTIVE)?;

        // INVARIANT: Reject malformed commands before running any of them.
        let specs: Vec<CommandSpec> = decode_payload(directive, payload)?;
        let mut commands = Vec::with_capacity(specs.len());
        for spec in specs {
            let command = ShellCommand::resolve(spec, &defaults).ok_or_else(|| {
                DirectiveError::MalformedPayload {
                    source: <serde_json::Error as serde::de::Error>::custom("empty command"),
                    directive: directive.to_string(),
                }
            })?;
            commands.push(command);
        }

        let shell = user_shell();
        let mut report = Report::new();
        for command in commands {
            if !command.runs_on(context.hostname()) {
                info!("skipping command [{}]", command.command);
                report.record(command.command, Outcome::Skipped);
                continue;
            }

            match &command.description {
                Some(description) => info!("{description} [{}]", command.command),
                None => info!("{}", command.command),
            }

            let outcome = match command.run(&shell, context.snowblock_dir()) {
                Ok(()) => Outcome::Applied,
                Err(err) => {
                    warn!("{err}");
                    Outcome::Failed { reason: err.to_string() }
                }
            };
            report.record(command.command, outcome);
        }

        if report.is_success() {
            info!("=> all commands have been executed");
        } else {
            error!("some commands were not successfully executed");
        }

        Ok(report)
    }
}

/// Command execution failures.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Shell process could not be started.
    #[error("command [{command}] could not be started")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },

    /// Command exited unsuccessfully.
    #[error("command [{command}] failed with {status}")]
    Failed { command: String, status: ExitStatus },
}
