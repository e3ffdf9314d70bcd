//! Compilation database generation from dry-run make logs.
//!
//! This crate provides:
//! - A parser for `make -n` output that recovers per-file compile commands
//! - System include discovery for cross toolchains
//! - compile_commands.json reading and writing
//! - Tool configuration (`compiledb.toml`)
//!
//! # Example
//!
//! ```toml
//! # compiledb.toml
//! [compile]
//! keyboard = "planck/rev6"
//! keymap = "default"
//!
//! [make]
//! program = "gmake"
//! ```

mod compile_commands;
mod config;
mod dry_run;
mod error;
mod log_parser;
mod system_includes;

pub use compile_commands::{CompileCommands, CompileRecord, DATABASE_FILE_NAME};
pub use config::{Config, MakeConfig, Target, TargetSection, CONFIG_FILE_NAME};
pub use dry_run::{clean, default_make, generate, run, MakeCommand};
pub use error::{BuildError, Result};
pub use log_parser::{match_command, match_file_marker, parse_dry_run, LogParser, ParserState, Records};
pub use system_includes::{
    include_dirs_under, IncludeLookup, SystemIncludeResolver, ToolchainLookup,
    DEFAULT_CACHE_CAPACITY,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_config() {
        let toml = r#"
[compiledb]
keyboard = "planck/rev6"
keymap = "default"
        "#;

        let config: Config = toml::from_str(toml).expect("Failed to parse config");
        let target = config.resolve_target(None, None).expect("Failed to resolve target");
        assert_eq!(target.make_goal(), "planck/rev6:default");
    }
}
