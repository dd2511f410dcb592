//! # Configuration
//!
//! Session defaults (`typecheck`/`prunequery` policy, log level, query
//! timeout) loaded from an optional flat `key = value` file (one setting
//! per line, `#` starts a comment, blank lines ignored), then overridden
//! by `GRAPHVIEW_`-prefixed environment variables. No config-parsing
//! crate is pulled in for this - the format is small enough to hand-roll,
//! the same way the CLI's own profile config is hand-rolled rather than
//! built on a generic layering library.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Session-wide configuration, the `option` surface command's backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Initial backend; only `"reference"` is implemented. Other values
    /// are accepted (forward compatibility with the documented surface
    /// syntax) but rejected with a `BackendError` at startup.
    pub platform: String,
    /// Graph selected immediately after startup, created if absent.
    pub workspace: Option<String>,
    pub typecheck: bool,
    pub prunequery: bool,
    /// Incremental materialized-view maintenance. Parsed and carried but
    /// not yet implemented - `materialize` always does a full recompute.
    pub ivm: bool,
    /// Emit result tuples from a query (vs. a count only).
    pub answer: bool,
    pub log_level: String,
    /// Query/command timeout in milliseconds; `0` means no timeout.
    pub timeout_ms: u64,
    pub data_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            platform: "reference".to_string(),
            workspace: None,
            typecheck: false,
            prunequery: false,
            ivm: false,
            answer: true,
            log_level: "info".to_string(),
            timeout_ms: 0,
            data_dir: None,
        }
    }
}

/// Default config file location, `$XDG_CONFIG_HOME/graphview/config` (or
/// the platform equivalent). Only consulted when `--config` is omitted.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("graphview").join("config"))
}

/// Parse the flat `key = value` format into a raw string map.
///
/// # Errors
/// Returns an error message naming the offending line if it is non-empty,
/// non-comment, and has no `=`.
pub fn parse_flat_kv(contents: &str) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for (lineno, raw_line) in contents.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(format!("line {}: expected 'key = value', got {raw_line:?}", lineno + 1));
        };
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(map)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Apply one `key = value` pair (from either the file or the environment)
/// onto `cfg`, ignoring keys this build doesn't recognize - forward
/// compatible with a config file written against a newer surface syntax.
fn apply(cfg: &mut AppConfig, key: &str, value: &str) {
    match key {
        "platform" => cfg.platform = value.to_string(),
        "workspace" => cfg.workspace = Some(value.to_string()),
        "typecheck" => cfg.typecheck = parse_bool(value, cfg.typecheck),
        "prunequery" => cfg.prunequery = parse_bool(value, cfg.prunequery),
        "ivm" => cfg.ivm = parse_bool(value, cfg.ivm),
        "answer" => cfg.answer = parse_bool(value, cfg.answer),
        "log_level" => cfg.log_level = value.to_string(),
        "timeout_ms" => cfg.timeout_ms = value.parse().unwrap_or(cfg.timeout_ms),
        "data_dir" => cfg.data_dir = Some(value.to_string()),
        _ => {}
    }
}

fn parse_bool(raw: &str, fallback: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => true,
        "off" | "false" | "0" | "no" => false,
        _ => fallback,
    }
}

/// Build the layered config: built-in defaults, then the flat config
/// file at `path` (or the platform default location if `path` is
/// `None`, when present), then `GRAPHVIEW_*` environment variables.
///
/// # Errors
/// Returns an error message naming the offending line if the config file
/// is malformed.
pub fn load(path: Option<&Path>) -> Result<AppConfig, String> {
    let mut cfg = AppConfig::default();

    let file_path = path.map(Path::to_path_buf).or_else(default_config_path);
    if let Some(file_path) = file_path {
        if file_path.exists() {
            let contents = std::fs::read_to_string(&file_path)
                .map_err(|e| format!("reading {}: {e}", file_path.display()))?;
            let kv = parse_flat_kv(&contents).map_err(|e| format!("{}: {e}", file_path.display()))?;
            for (key, value) in kv {
                apply(&mut cfg, &key, &value);
            }
        }
    }

    for (key, value) in std::env::vars() {
        if let Some(suffix) = key.strip_prefix("GRAPHVIEW_") {
            apply(&mut cfg, &suffix.to_ascii_lowercase(), &value);
        }
    }

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_kv_with_comments_and_blank_lines() {
        let kv = parse_flat_kv("# this is a comment\n\ntypecheck = true\nlog_level = debug  # inline note\n")
            .unwrap();
        assert_eq!(kv.get("typecheck").map(String::as_str), Some("true"));
        assert_eq!(kv.get("log_level").map(String::as_str), Some("debug"));
    }

    #[test]
    fn malformed_line_is_rejected() {
        assert!(parse_flat_kv("not a valid line").is_err());
    }

    #[test]
    fn default_config_has_policies_off() {
        let cfg = AppConfig::default();
        assert!(!cfg.typecheck);
        assert!(!cfg.prunequery);
        assert_eq!(cfg.timeout_ms, 0);
    }

    #[test]
    fn apply_recognizes_on_off_spelling() {
        let mut cfg = AppConfig::default();
        apply(&mut cfg, "typecheck", "on");
        apply(&mut cfg, "prunequery", "off");
        assert!(cfg.typecheck);
        assert!(!cfg.prunequery);
    }

    #[test]
    fn apply_ignores_unknown_keys() {
        let mut cfg = AppConfig::default();
        apply(&mut cfg, "nonsense", "whatever");
        assert_eq!(cfg.platform, "reference");
        assert!(!cfg.typecheck);
    }
}
