//! Tool configuration (compiledb.toml format).

use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file looked up at the project root.
pub const CONFIG_FILE_NAME: &str = "compiledb.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Target shared with the regular build.
    #[serde(default)]
    pub compile: TargetSection,

    /// Target for this tool only; wins over `[compile]`.
    #[serde(default)]
    pub compiledb: TargetSection,

    /// How to invoke make.
    #[serde(default)]
    pub make: MakeConfig,
}

/// Keyboard/keymap pair, either half optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSection {
    #[serde(default)]
    pub keyboard: Option<String>,

    #[serde(default)]
    pub keymap: Option<String>,
}

/// Make invocation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeConfig {
    /// Make executable (default: `gmake` if installed, else `make`).
    #[serde(default)]
    pub program: Option<String>,

    /// Extra arguments for the dry-run invocation.
    #[serde(default)]
    pub args: Vec<String>,
}

/// A fully resolved build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub keyboard: String,
    pub keymap: String,
}

impl Target {
    /// The make goal building this target, `<keyboard>:<keymap>`.
    pub fn make_goal(&self) -> String {
        format!("{}:{}", self.keyboard, self.keymap)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `compiledb.toml` from `root`, or the defaults if there is none.
    pub fn load(root: &Path) -> crate::Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            log::debug!("Loading config from {}", path.display());
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Pick the target: command line, then `[compiledb]`, then `[compile]`.
    pub fn resolve_target(
        &self,
        keyboard: Option<&str>,
        keymap: Option<&str>,
    ) -> crate::Result<Target> {
        let keyboard = keyboard
            .map(str::to_string)
            .or_else(|| self.compiledb.keyboard.clone())
            .or_else(|| self.compile.keyboard.clone())
            .filter(|s| !s.is_empty())
            .ok_or(BuildError::MissingKeyboard)?;

        let keymap = keymap
            .map(str::to_string)
            .or_else(|| self.compiledb.keymap.clone())
            .or_else(|| self.compile.keymap.clone())
            .filter(|s| !s.is_empty())
            .ok_or(BuildError::MissingKeymap)?;

        Ok(Target { keyboard, keymap })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[compile]
keyboard = "planck/rev6"
keymap = "default"

[compiledb]
keymap = "vim"

[make]
program = "gmake"
args = ["-j1", "SKIP_GIT=yes"]
        "#;

        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.compile.keyboard.as_deref(), Some("planck/rev6"));
        assert_eq!(config.compiledb.keyboard, None);
        assert_eq!(config.make.program.as_deref(), Some("gmake"));
        assert_eq!(config.make.args, vec!["-j1", "SKIP_GIT=yes"]);

        let target = config.resolve_target(None, None).unwrap();
        assert_eq!(target.keyboard, "planck/rev6");
        assert_eq!(target.keymap, "vim");
        assert_eq!(target.make_goal(), "planck/rev6:vim");
    }

    #[test]
    fn test_command_line_wins() {
        let config = Config {
            compiledb: TargetSection {
                keyboard: Some("preonic/rev3".to_string()),
                keymap: Some("default".to_string()),
            },
            ..Config::default()
        };

        let target = config.resolve_target(Some("planck/rev6"), None).unwrap();

        assert_eq!(target.keyboard, "planck/rev6");
        assert_eq!(target.keymap, "default");
    }

    #[test]
    fn test_missing_target() {
        let config = Config::default();

        assert!(matches!(
            config.resolve_target(None, Some("default")),
            Err(BuildError::MissingKeyboard)
        ));
        assert!(matches!(
            config.resolve_target(Some("planck/rev6"), None),
            Err(BuildError::MissingKeymap)
        ));
        assert!(matches!(
            config.resolve_target(Some(""), Some("default")),
            Err(BuildError::MissingKeyboard)
        ));
    }

    #[test]
    fn test_load_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[compile]\nkeyboard = \"planck/rev6\"\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.compile.keyboard.as_deref(), Some("planck/rev6"));
        assert!(matches!(
            config.resolve_target(None, None),
            Err(BuildError::MissingKeymap)
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[compile\n").unwrap();

        assert!(matches!(
            Config::load(dir.path()),
            Err(BuildError::ParseToml(_))
        ));
    }
}
