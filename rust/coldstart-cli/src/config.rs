//! Configuration file parsing for `coldstart.toml`.
//!
//! Searches the current directory then ancestors, falling back to
//! `~/.config/coldstart/coldstart.toml` if no project-level file is found.

use coldstart_core::{Metric, RankMethod};
use coldstart_provider_xray::XraySettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CliError;
use crate::render::OutputFormat;

pub const CONFIG_FILE: &str = "coldstart.toml";

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct ColdstartConfig {
    #[serde(default)]
    pub xray: XraySettings,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct ReportSection {
    pub format: Option<OutputFormat>,
    pub rank: Option<RankMethod>,
    pub metric: Option<Metric>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct LogSection {
    /// `EnvFilter` directive, e.g. `coldstart=debug`. `RUST_LOG` takes precedence.
    pub filter: Option<String>,
}

impl ColdstartConfig {
    /// Load the nearest config, or `Default` when none exists.
    pub fn load() -> Result<Self, CliError> {
        let start = std::env::current_dir().ok();
        match start.as_deref().and_then(Self::find_from) {
            Some(path) => Self::load_from(&path),
            None => match global_config_path().filter(|path| path.exists()) {
                Some(path) => Self::load_from(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find `coldstart.toml` in `dir` or the closest ancestor containing one.
    pub fn find_from(dir: &Path) -> Option<PathBuf> {
        let mut dir = dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("coldstart").join(CONFIG_FILE))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let cfg: ColdstartConfig = toml::from_str(
            r#"
[xray]
region = "us-east-1"
profile = "analysis"

[report]
format = "text"
rank = "legacy"
metric = "setup"

[log]
filter = "coldstart=debug"
"#,
        )
        .expect("should parse");

        assert_eq!(cfg.xray.region.as_deref(), Some("us-east-1"));
        assert_eq!(cfg.xray.profile.as_deref(), Some("analysis"));
        assert_eq!(cfg.report.format, Some(OutputFormat::Text));
        assert_eq!(cfg.report.rank, Some(RankMethod::Legacy));
        assert_eq!(cfg.report.metric, Some(Metric::Setup));
        assert_eq!(cfg.log.filter.as_deref(), Some("coldstart=debug"));
    }

    #[test]
    fn empty_config_is_default() {
        let cfg: ColdstartConfig = toml::from_str("").expect("should parse");
        assert_eq!(cfg, ColdstartConfig::default());
    }

    #[test]
    fn unknown_rank_is_rejected() {
        let result: Result<ColdstartConfig, _> = toml::from_str("[report]\nrank = \"median\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn finds_config_in_ancestor() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(CONFIG_FILE), "[report]\nformat = \"json\"\n").unwrap();

        let found = ColdstartConfig::find_from(&nested).unwrap();
        assert_eq!(found, root.path().join(CONFIG_FILE));

        let cfg = ColdstartConfig::load_from(&found).unwrap();
        assert_eq!(cfg.report.format, Some(OutputFormat::Json));
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[report\n").unwrap();

        match ColdstartConfig::load_from(&path) {
            Err(CliError::Config { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }
}
