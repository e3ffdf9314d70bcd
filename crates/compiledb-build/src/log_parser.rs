//! Dry-run build log parsing.
//!
//! `make -n` prints the recipe of every compile step instead of running it.
//! For each source file the recipe announces the file with
//!
//! ```text
//! printf "Compiling: quantum/keymap.c" | $(AWK_CMD)
//! ```
//!
//! and somewhat later runs the compiler inside a captured subshell:
//!
//! ```text
//! LOG=$(arm-none-eabi-gcc -c ... quantum/keymap.c -o keymap.o 2>&1) && ...
//! ```
//!
//! [`LogParser`] pairs each announcement with the next compiler command and
//! turns the pair into a [`CompileRecord`]. This only works for logs in
//! exactly that shape; it is not a general build log parser.

use crate::compile_commands::CompileRecord;
use crate::system_includes::{IncludeLookup, SystemIncludeResolver, ToolchainLookup};
use log::debug;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Start of the progress message printed before each compile step.
pub const FILE_MARKER: &str = "printf \"Compiling: ";

/// Shell assignment that captures the compiler's output.
pub const COMMAND_OPENER: &str = "LOG=$(";

/// Token ending the captured compiler command.
pub const COMMAND_TERMINATOR: &str = "&&";

/// Flags removed from every command; clang rejects them.
pub const STRIPPED_FLAGS: &[&str] = &["-mno-thumb-interwork"];

/// Where the parser is within the current build step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Looking for a `Compiling: <file>` announcement.
    #[default]
    AwaitingFile,
    /// Announcement seen; looking for the command that compiles `file`.
    AwaitingCommand { file: String },
}

/// Returns the file named by a `printf "Compiling: <file>` marker.
///
/// The path runs up to the closing quote, or to the end of the line if the
/// quote is missing. Markers with an empty path are ignored.
pub fn match_file_marker(line: &str) -> Option<&str> {
    line.match_indices(FILE_MARKER).find_map(|(idx, _)| {
        let rest = &line[idx + FILE_MARKER.len()..];
        let path = rest.split('"').next().unwrap_or(rest);
        (!path.is_empty()).then_some(path)
    })
}

/// Returns the command captured by `LOG=$(<command>&&`.
///
/// The capture stops at the first `&&` after at least one character.
pub fn match_command(line: &str) -> Option<&str> {
    line.match_indices(COMMAND_OPENER).find_map(|(idx, _)| {
        let rest = &line[idx + COMMAND_OPENER.len()..];
        let first = rest.chars().next()?.len_utf8();
        let end = rest[first..].find(COMMAND_TERMINATOR)?;
        Some(&rest[..first + end])
    })
}

/// Turns a captured command into the final shell-quoted command string.
///
/// Returns `None` if the capture is not valid shell words or is empty.
fn rewrite_command<L: IncludeLookup>(
    resolver: &mut SystemIncludeResolver<L>,
    captured: &str,
) -> Option<String> {
    let mut args = shlex::split(captured)?;
    let compiler = args.first()?.clone();

    let includes: Vec<String> = resolver
        .resolve(&compiler)
        .iter()
        .map(|dir| format!("-I{}", dir.display()))
        .collect();
    args.extend(includes);
    args.retain(|arg| !STRIPPED_FLAGS.contains(&arg.as_str()));

    if args.is_empty() {
        return None;
    }

    match shlex::try_join(args.iter().map(String::as_str)) {
        Ok(command) => Some(command),
        Err(e) => {
            debug!("Cannot quote command for {}: {}", compiler, e);
            None
        }
    }
}

/// State machine turning a dry-run build log into compile records.
#[derive(Debug)]
pub struct LogParser<L = ToolchainLookup> {
    directory: PathBuf,
    resolver: SystemIncludeResolver<L>,
    state: ParserState,
}

impl LogParser<ToolchainLookup> {
    /// Create a parser whose records are relative to `directory`.
    ///
    /// Relative compiler paths in the log are resolved against `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let resolver = SystemIncludeResolver::in_dir(directory.clone());
        Self::with_resolver(directory, resolver)
    }
}

impl<L: IncludeLookup> LogParser<L> {
    pub fn with_resolver(directory: impl Into<PathBuf>, resolver: SystemIncludeResolver<L>) -> Self {
        Self {
            directory: directory.into(),
            resolver,
            state: ParserState::AwaitingFile,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Feed one log line, returning a record if it completes a build step.
    ///
    /// A marker and its command may share a line. While a command is
    /// pending, further markers are ignored.
    pub fn feed_line(&mut self, line: &str) -> Option<CompileRecord> {
        if self.state == ParserState::AwaitingFile {
            if let Some(file) = match_file_marker(line) {
                debug!("Compiling {}", file);
                self.state = ParserState::AwaitingCommand {
                    file: file.to_string(),
                };
            }
        }

        if self.state == ParserState::AwaitingFile {
            return None;
        }

        let captured = match_command(line)?;
        let command = rewrite_command(&mut self.resolver, captured)?;

        match std::mem::take(&mut self.state) {
            ParserState::AwaitingCommand { file } => Some(CompileRecord {
                directory: self.directory.clone(),
                command,
                file,
            }),
            ParserState::AwaitingFile => None,
        }
    }

    /// End of input: forget any announced file that never got a command.
    pub fn finish(&mut self) {
        if let ParserState::AwaitingCommand { file } = std::mem::take(&mut self.state) {
            debug!("No compile command found for {}", file);
        }
    }

    /// Stream records out of `reader` as they are recognized.
    pub fn records<R: BufRead>(&mut self, reader: R) -> Records<'_, R, L> {
        Records {
            parser: self,
            reader,
            buf: Vec::new(),
        }
    }

    /// Parse a whole log.
    pub fn parse<R: BufRead>(&mut self, reader: R) -> crate::Result<Vec<CompileRecord>> {
        self.records(reader).collect()
    }
}

/// Iterator over the records of a log, see [`LogParser::records`].
///
/// Lines that are not valid UTF-8 are decoded lossily.
pub struct Records<'p, R, L> {
    parser: &'p mut LogParser<L>,
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead, L: IncludeLookup> Iterator for Records<'_, R, L> {
    type Item = crate::Result<CompileRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.parser.finish();
                    return None;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&self.buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    if let Some(record) = self.parser.feed_line(line) {
                        return Some(Ok(record));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Parse a dry-run log using the toolchain on `PATH` for system includes.
pub fn parse_dry_run<R: BufRead>(
    reader: R,
    directory: impl Into<PathBuf>,
) -> crate::Result<Vec<CompileRecord>> {
    LogParser::new(directory).parse(reader)
}
