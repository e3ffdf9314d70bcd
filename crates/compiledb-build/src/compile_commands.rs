//! compile_commands.json records.
//!
//! The JSON Compilation Database format is an array of
//! `{directory, command, file}` objects. This module holds the record type
//! produced by the log parser and the database that reads and writes it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name tooling looks for at the project root.
pub const DATABASE_FILE_NAME: &str = "compile_commands.json";

/// A single compile command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRecord {
    /// The build root the command is interpreted against.
    pub directory: PathBuf,

    /// The full compilation command, shell-quoted per token.
    pub command: String,

    /// The source file path exactly as the build log printed it.
    pub file: String,
}

impl CompileRecord {
    /// Split `command` back into its argument list.
    ///
    /// Returns `None` if the command is not valid shell words.
    pub fn arguments(&self) -> Option<Vec<String>> {
        shlex::split(&self.command)
    }
}

/// A compilation database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileCommands {
    commands: Vec<CompileRecord>,
}

impl CompileCommands {
    pub fn new(commands: Vec<CompileRecord>) -> Self {
        Self { commands }
    }

    /// Load compile commands from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse compile commands from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> crate::Result<Self> {
        let commands: Vec<CompileRecord> = serde_json::from_str(json)?;
        Ok(Self { commands })
    }

    /// Get all compile commands.
    pub fn commands(&self) -> &[CompileRecord] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Serialize the database as JSON indented by four spaces.
    pub fn to_json(&self) -> crate::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.commands.serialize(&mut ser)?;
        let json = String::from_utf8(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(json)
    }

    /// Write the whole database to `path`, replacing any previous file.
    pub fn write_to_file(&self, path: &Path) -> crate::Result<()> {
        let mut json = self.to_json()?;
        json.push('\n');
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl From<Vec<CompileRecord>> for CompileCommands {
    fn from(commands: Vec<CompileRecord>) -> Self {
        Self::new(commands)
    }
}
