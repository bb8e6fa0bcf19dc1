//! `sections.toml`: defaults for `render` and `check`. Command-line flags win.

use std::path::{Path, PathBuf};

use render::{RenderOptions, Target};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "sections.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub check: CheckConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Output format when `--to` is not given.
    #[serde(default)]
    pub to: Target,

    #[serde(default = "default_explicit_ids")]
    pub explicit_ids: bool,

    #[serde(default = "default_heading_level")]
    pub heading_level: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            to: Target::default(),
            explicit_ids: default_explicit_ids(),
            heading_level: default_heading_level(),
        }
    }
}

impl RenderConfig {
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            explicit_ids: self.explicit_ids,
            heading_level: self.heading_level,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    /// Treat warnings as failures.
    #[serde(default)]
    pub deny_warnings: bool,
}

fn default_explicit_ids() -> bool {
    true
}

fn default_heading_level() -> u8 {
    1
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Load the explicit config file, or `sections.toml` in `dir` if it exists,
/// or the defaults.
pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = dir.join(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                tracing::debug!("no config file, using defaults");
                return Ok(Config::default());
            }
            candidate
        }
    };

    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = parse(&text, &path)?;
    tracing::info!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn parse(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse("", Path::new("sections.toml")).unwrap();
        assert_eq!(config.render.to, Target::Markdown);
        assert!(config.render.explicit_ids);
        assert_eq!(config.render.heading_level, 1);
        assert!(!config.check.deny_warnings);
    }

    #[test]
    fn reads_all_keys() {
        let text = "[render]\nto = \"html\"\nexplicit_ids = false\nheading_level = 2\n\n[check]\ndeny_warnings = true\n";
        let config = parse(text, Path::new("x.toml")).unwrap();
        assert_eq!(config.render.to, Target::Html);
        assert_eq!(
            config.render.options(),
            RenderOptions {
                explicit_ids: false,
                heading_level: 2
            }
        );
        assert!(config.check.deny_warnings);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("[render]\ncolour = \"red\"\n", Path::new("x.toml")).unwrap_err();
        assert!(err.to_string().contains("unknown field"), "{err}");

        let err = parse("[render]\nto = \"pdf\"\n", Path::new("x.toml")).unwrap_err();
        assert!(err.to_string().starts_with("invalid config 'x.toml'"), "{err}");
    }

    #[test]
    fn load_picks_up_file_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load(None, dir.path()).unwrap().check.deny_warnings);

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[check]\ndeny_warnings = true\n").unwrap();
        assert!(load(None, dir.path()).unwrap().check.deny_warnings);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load(Some(&missing), dir.path()),
            Err(ConfigError::Read { .. })
        ));
    }
}
