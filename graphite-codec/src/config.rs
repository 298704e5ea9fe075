//! Codec configuration.
//!
//! The configuration is supplied once, validated, and then treated as
//! immutable for the lifetime of a [`crate::GraphiteCodec`]. It is usually
//! loaded from JSON:
//!
//! ```json
//! {
//!     "metrics": {"%{host}/uptime": "%{uptime_1m}"},
//!     "exclude_metrics": ["%\\{[^}]+\\}", "^debug\\."],
//!     "metrics_format": "prod.*"
//! }
//! ```
//!
//! Options left out of the file take their defaults.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, Result};
use crate::filter::{MetricFilter, PatternSet, SubmetricFilter};
use crate::format::DEFAULT_METRICS_FORMAT;

/// Default `include_metrics` and `include_submetrics`: match everything.
pub const DEFAULT_INCLUDE: &str = ".*";

/// Default `exclude_metrics`: drop names with unresolved `%{field}` references.
pub const DEFAULT_EXCLUDE: &str = r"%\{[^}]+\}";

/// Options controlling how events are turned into Graphite lines.
///
/// Decoding takes no options; every field here affects encoding only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Metric-name template to value template, emitted in this order.
    ///
    /// Both sides may reference event fields, e.g. `"%{host}/uptime"` to
    /// `"%{uptime_1m}"`. Ignored when `fields_are_metrics` is set.
    pub metrics: IndexMap<String, String>,

    /// Treat every event field as a metric instead of using `metrics`.
    pub fields_are_metrics: bool,

    /// Each metric's value is a nested map of sub-metric name to value.
    pub values_are_hash: bool,

    /// Sub-metric names must match at least one of these (empty: all pass).
    pub include_submetrics: Vec<String>,

    /// Metric names must match at least one of these to be emitted.
    pub include_metrics: Vec<String>,

    /// Metric names matching any of these are dropped, even if included.
    pub exclude_metrics: Vec<String>,

    /// Wire-name template; `*` is replaced by the metric name.
    pub metrics_format: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            metrics: IndexMap::new(),
            fields_are_metrics: false,
            values_are_hash: false,
            include_submetrics: vec![DEFAULT_INCLUDE.to_string()],
            include_metrics: vec![DEFAULT_INCLUDE.to_string()],
            exclude_metrics: vec![DEFAULT_EXCLUDE.to_string()],
            metrics_format: DEFAULT_METRICS_FORMAT.to_string(),
        }
    }
}

impl CodecConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// The result is not validated; [`crate::GraphiteCodec::new`] does that.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not a valid configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let data = std::fs::read_to_string(&path).map_err(|e| ConfigError::Load {
            path: path.clone(),
            source: e,
        })?;
        let config =
            serde_json::from_str(&data).map_err(|e| ConfigError::Parse { path, source: e })?;

        Ok(config)
    }

    /// Validates the configuration by compiling every pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if any pattern fails to compile.
    pub fn validate(&self) -> Result<()> {
        self.metric_filter()?;
        self.submetric_filter()?;
        Ok(())
    }

    /// Adds an explicit `metric -> value` template pair.
    #[must_use]
    pub fn with_metric(mut self, metric: impl Into<String>, value: impl Into<String>) -> Self {
        self.metrics.insert(metric.into(), value.into());
        self
    }

    /// Compiles `include_metrics` and `exclude_metrics`.
    pub(crate) fn metric_filter(&self) -> std::result::Result<MetricFilter, ConfigError> {
        let include = PatternSet::compile("include_metrics", self.include_metrics.as_slice())?;
        let exclude = PatternSet::compile("exclude_metrics", self.exclude_metrics.as_slice())?;

        if include.is_empty() {
            warn!("include_metrics is empty; no metric will ever be emitted");
        }

        Ok(MetricFilter::new(include, exclude))
    }

    /// Compiles `include_submetrics`.
    pub(crate) fn submetric_filter(&self) -> std::result::Result<SubmetricFilter, ConfigError> {
        let include =
            PatternSet::compile("include_submetrics", self.include_submetrics.as_slice())?;
        Ok(SubmetricFilter::new(include))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert!(config.metrics.is_empty());
        assert!(!config.fields_are_metrics);
        assert!(!config.values_are_hash);
        assert_eq!(config.include_submetrics, vec![".*"]);
        assert_eq!(config.include_metrics, vec![".*"]);
        assert_eq!(config.exclude_metrics, vec![r"%\{[^}]+\}"]);
        assert_eq!(config.metrics_format, "*");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: CodecConfig =
            serde_json::from_str(r#"{"fields_are_metrics": true, "metrics_format": "a.*"}"#)
                .unwrap();
        assert!(config.fields_are_metrics);
        assert_eq!(config.metrics_format, "a.*");
        assert_eq!(config.include_metrics, vec![".*"]);
    }

    #[test]
    fn test_metrics_keep_file_order() {
        let config: CodecConfig =
            serde_json::from_str(r#"{"metrics": {"z": "1", "a": "2", "m": "3"}}"#).unwrap();
        let names: Vec<&str> = config.metrics.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let result = serde_json::from_str::<CodecConfig>(r#"{"metric_format": "*"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let config = CodecConfig {
            include_submetrics: vec!["[".to_string()],
            ..CodecConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            CodecError::Config(ConfigError::InvalidPattern {
                option: "include_submetrics",
                ..
            })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("graphite.json");
        std::fs::write(&path, r#"{"metrics": {"%{host}/uptime": "%{uptime_1m}"}}"#).unwrap();

        let config = CodecConfig::load(&path).unwrap();
        assert_eq!(config.metrics.get("%{host}/uptime").map(String::as_str), Some("%{uptime_1m}"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = CodecConfig::load(temp_dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CodecError::Config(ConfigError::Load { .. })));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = CodecConfig::load(&path).unwrap_err();
        assert!(matches!(err, CodecError::Config(ConfigError::Parse { .. })));
    }
}
