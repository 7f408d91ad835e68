//! CLI error type and cause-chain formatting.

use coldstart_core::AnalyzeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("analysis failed")]
    Analyze(#[from] AnalyzeError),
    #[error("cannot read '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config in '{path}'")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid analysis event")]
    Event(#[source] serde_json::Error),
    #[error("cannot render report")]
    Render(#[source] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

/// Format an error with every `source()` on its own indented line:
///
/// ```text
/// error: analysis failed
///   caused by: tracing backend call failed: ...
/// ```
pub fn format_error_chain(err: &dyn std::error::Error) -> String {
    let mut out = format!("error: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    out
}
