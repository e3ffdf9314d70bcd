//! Clean + dry-run make invocation.
//!
//! The database is built from what `make -n` *would* run, so the tree is
//! cleaned first to make sure every compile step shows up in the log.

use crate::compile_commands::{CompileCommands, CompileRecord};
use crate::config::{MakeConfig, Target};
use crate::error::{BuildError, Result};
use crate::log_parser::LogParser;
use crate::system_includes::IncludeLookup;
use log::{info, warn};
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Environment variables removed before running make.
///
/// `MAKEFLAGS` inherited from an outer make would override `-n` handling
/// and job settings of the dry run.
pub const SCRUBBED_ENV: &[&str] = &["MAKEFLAGS"];

/// The make executable to use when none is configured.
///
/// Prefers `gmake`, which is GNU make on BSD and macOS systems.
pub fn default_make() -> String {
    if which::which("gmake").is_ok() {
        "gmake".to_string()
    } else {
        "make".to_string()
    }
}

/// A make invocation: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeCommand {
    program: String,
    args: Vec<String>,
}

impl MakeCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `make -n <keyboard>:<keymap> [extra args]`.
    pub fn dry_run(target: &Target, config: &MakeConfig) -> Self {
        let program = config.program.clone().unwrap_or_else(default_make);
        let mut args = vec!["-n".to_string(), target.make_goal()];
        args.extend(config.args.iter().cloned());
        Self { program, args }
    }

    /// `make clean` using the same executable.
    pub fn clean(&self) -> Self {
        Self::new(self.program.clone(), ["clean"])
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Build the process, running in `root` with a scrubbed environment.
    pub fn to_command(&self, root: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(root);
        for var in SCRUBBED_ENV {
            cmd.env_remove(var);
        }
        cmd
    }
}

impl fmt::Display for MakeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        match shlex::try_join(words) {
            Ok(line) => f.write_str(&line),
            Err(_) => write!(f, "{} {}", self.program, self.args.join(" ")),
        }
    }
}

/// Run `make clean` in `root`, discarding its output.
///
/// Failures are logged and otherwise ignored; a stale tree only means the
/// dry run may miss some files.
pub fn clean(root: &Path, command: &MakeCommand) {
    let clean = command.clean();
    info!("Making clean with {}", clean);

    let status = clean
        .to_command(root)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => {}
        Ok(status) => warn!("`{}` exited with {}", clean, status),
        Err(e) => warn!("Failed to run `{}`: {}", clean, e),
    }
}

/// Run the dry-run build and parse its output while it is produced.
///
/// Returns no records unless make exits successfully.
pub fn run<L: IncludeLookup>(
    root: &Path,
    command: &MakeCommand,
    parser: &mut LogParser<L>,
) -> Result<CompileCommands> {
    info!("Gathering build instructions from {}", command);

    let mut child = command
        .to_command(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| BuildError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let records = match child.stdout.take() {
        Some(stdout) => drain(&mut child, BufReader::new(stdout), parser)?,
        None => Vec::new(),
    };

    let status = child.wait()?;
    if !status.success() {
        return Err(BuildError::CommandFailed {
            command: command.to_string(),
            status,
        });
    }

    info!("Found {} compile commands", records.len());
    Ok(CompileCommands::new(records))
}

/// Parse `reader` until it ends; on a read error, kill and reap `child`.
///
/// The read error is returned as is, not masked by the killed exit status.
fn drain<L: IncludeLookup, R: BufRead>(
    child: &mut Child,
    reader: R,
    parser: &mut LogParser<L>,
) -> Result<Vec<CompileRecord>> {
    match parser.parse(reader) {
        Ok(records) => Ok(records),
        Err(e) => {
            // Stop make from blocking on a pipe nobody reads anymore.
            let _ = child.kill();
            let _ = child.wait();
            Err(e)
        }
    }
}

/// Clean, then dry-run, resolving system includes from `PATH`.
pub fn generate(root: &Path, command: &MakeCommand) -> Result<CompileCommands> {
    clean(root, command);
    let mut parser = LogParser::new(root);
    run(root, command, &mut parser)
}
