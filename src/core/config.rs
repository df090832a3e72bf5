//! Run configuration
//!
//! Parameters arrive as command-line flags or `REFLOAD_*` environment
//! variables; clap merges the two. Presence of the mandatory parameters and
//! the mode value are validated here rather than by clap, so a missing or
//! invalid value is this tool's configuration error (exit code 1) even when
//! the run is driven purely through the environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// Processing mode for a run, selected once at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Validate, write the bulk file, import it.
    Load,
    /// Validate and log only; no purge, no bulk file, no import.
    Preview,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Load => "load",
            RunMode::Preview => "preview",
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, RunMode::Preview)
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "load" => Ok(RunMode::Load),
            "preview" => Ok(RunMode::Preview),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Configuration problems. All fatal, reported before any input I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required parameter: --{flag} (or {env})")]
    Missing {
        flag: &'static str,
        env: &'static str,
    },

    #[error("invalid processing mode: '{0}' (expected 'load' or 'preview')")]
    InvalidMode(String),
}

/// Unvalidated parameters as collected from flags and environment.
#[derive(Debug, Default)]
pub struct RawConfig {
    pub database: Option<PathBuf>,
    pub mode: Option<String>,
    pub object_type: Option<String>,
    pub input: Option<PathBuf>,
    pub created_by: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Path to the target store.
    pub database: PathBuf,
    pub mode: RunMode,
    /// Object-type label the associations attach to.
    pub object_type: String,
    /// Tab-delimited input file.
    pub input: PathBuf,
    /// Per-run creator login; when absent the creator is read per line.
    pub created_by: Option<String>,
    /// Where the report files and the bulk file go.
    pub output_dir: PathBuf,
}

impl RawConfig {
    /// Check mandatory parameters and the mode value.
    pub fn validate(self) -> Result<RunConfig, ConfigError> {
        let database = self.database.ok_or(ConfigError::Missing {
            flag: "database",
            env: "REFLOAD_DATABASE",
        })?;
        let mode = self
            .mode
            .ok_or(ConfigError::Missing {
                flag: "mode",
                env: "REFLOAD_MODE",
            })?
            .parse()?;
        let object_type = self.object_type.ok_or(ConfigError::Missing {
            flag: "object-type",
            env: "REFLOAD_OBJECT_TYPE",
        })?;
        let input = self.input.ok_or(ConfigError::Missing {
            flag: "input",
            env: "REFLOAD_INPUT",
        })?;

        // reports and the bulk file land next to the input unless directed
        let output_dir = self.output_dir.unwrap_or_else(|| {
            input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        });

        Ok(RunConfig {
            database,
            mode,
            object_type,
            input,
            created_by: self.created_by,
            output_dir,
        })
    }
}

impl RunConfig {
    /// True when the creator login comes from field 4 of every line.
    pub fn per_line_creator(&self) -> bool {
        self.created_by.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> RawConfig {
        RawConfig {
            database: Some(PathBuf::from("store.db")),
            mode: Some("load".to_string()),
            object_type: Some("Marker".to_string()),
            input: Some(PathBuf::from("/data/assoc.txt")),
            created_by: Some("curator".to_string()),
            output_dir: None,
        }
    }

    #[test]
    fn test_valid_config() {
        let cfg = full().validate().unwrap();
        assert_eq!(cfg.mode, RunMode::Load);
        assert_eq!(cfg.output_dir, PathBuf::from("/data"));
        assert!(!cfg.per_line_creator());
    }

    #[test]
    fn test_missing_parameter_named_in_error() {
        let raw = RawConfig {
            input: None,
            ..full()
        };
        let err = raw.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { flag: "input", .. }));
    }

    #[test]
    fn test_mode_must_be_exact() {
        for bad in ["Load", "PREVIEW", "check", ""] {
            let raw = RawConfig {
                mode: Some(bad.to_string()),
                ..full()
            };
            assert!(matches!(
                raw.validate(),
                Err(ConfigError::InvalidMode(_))
            ));
        }
    }

    #[test]
    fn test_bare_input_name_defaults_output_to_cwd() {
        let raw = RawConfig {
            input: Some(PathBuf::from("assoc.txt")),
            ..full()
        };
        let cfg = raw.validate().unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_absent_creator_selects_per_line_mode() {
        let raw = RawConfig {
            created_by: None,
            ..full()
        };
        assert!(raw.validate().unwrap().per_line_creator());
    }
}
