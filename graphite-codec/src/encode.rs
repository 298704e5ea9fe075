//! Event to Graphite line encoding.
//!
//! # Metric selection
//!
//! An [`Encoder`] picks metrics from an event in one of two modes:
//!
//! - **Explicit mapping** (default): each configured `metric -> value` pair
//!   is rendered against the event. The rendered name goes through the name
//!   filter, then one line is emitted with the rendered value.
//! - **Field-derived** (`fields_are_metrics`): every user field is a metric.
//!   With `values_are_hash`, each field is a nested map and yields one line
//!   per sub-metric that passes `include_submetrics`.
//!
//! In both modes the name filter only looks at top-level metric names, and
//! `metrics_format` only applies to them. Output order follows the event's
//! field order or the configured mapping order.
//!
//! # Wire format
//!
//! ```text
//! name value timestamp\n
//! name sub_name=value timestamp\n     (nested values)
//! ```
//!
//! A name or sub-name that renders empty or contains whitespace would split
//! into extra wire fields or lines, so that metric is skipped with a warning.

use std::fmt;
use std::io;

use tracing::{debug, trace, warn};

use crate::coerce::{coerce_f64, format_value};
use crate::config::CodecConfig;
use crate::error::{ConfigError, EncodeError};
use crate::event::{Event, FieldValue, Scalar, TIMESTAMP_FIELD, VERSION_FIELD};
use crate::filter::{MetricFilter, SubmetricFilter};
use crate::format::MetricNameFormatter;
use crate::template::{Template, sprintf};

/// Fields never emitted as metrics in field-derived mode.
pub const EXCLUDE_ALWAYS: [&str; 2] = [TIMESTAMP_FIELD, VERSION_FIELD];

/// The value part of a metric line.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A plain value.
    Plain(f64),
    /// A sub-metric of a nested value, rendered as `name=value`.
    Named {
        /// The sub-metric name.
        name: String,
        /// The sub-metric value.
        value: f64,
    },
}

impl MetricValue {
    /// The numeric value, regardless of variant.
    pub fn value(&self) -> f64 {
        match self {
            Self::Plain(value) | Self::Named { value, .. } => *value,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(value) => f.write_str(&format_value(*value)),
            Self::Named { name, value } => write!(f, "{name}={}", format_value(*value)),
        }
    }
}

/// A single Graphite metric line, without its terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    /// The wire metric name, after `metrics_format`.
    pub name: String,
    /// The value.
    pub value: MetricValue,
    /// Whole seconds since the Unix epoch.
    pub timestamp: i64,
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.value, self.timestamp)
    }
}

/// The lines produced by one encode call, in emission order.
///
/// An empty batch is the normal "nothing to emit" outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    lines: Vec<MetricLine>,
}

impl Batch {
    /// Returns `true` if nothing should be emitted.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of metric lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// The metric lines in emission order.
    pub fn lines(&self) -> &[MetricLine] {
        &self.lines
    }

    /// Consumes the batch, returning its lines.
    pub fn into_lines(self) -> Vec<MetricLine> {
        self.lines
    }

    /// Renders the batch as wire text, each line terminated by `\n`.
    ///
    /// Returns `None` for an empty batch, never an empty string.
    pub fn into_payload(self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(self.to_string())
    }

    /// Writes the wire text to `writer`. Writes nothing for an empty batch.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_to<W: io::Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        for line in &self.lines {
            writeln!(writer, "{line}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Encodes events into Graphite lines according to a [`CodecConfig`].
///
/// All templates and patterns are compiled up front; `encode` only reads
/// from the encoder, so one instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct Encoder {
    metrics: Vec<(Template, Template)>,
    fields_are_metrics: bool,
    values_are_hash: bool,
    metric_filter: MetricFilter,
    submetric_filter: SubmetricFilter,
    formatter: MetricNameFormatter,
}

impl Encoder {
    /// Builds an encoder, compiling every pattern and template in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if a pattern fails to compile.
    pub fn new(config: &CodecConfig) -> Result<Self, ConfigError> {
        let metrics = config
            .metrics
            .iter()
            .map(|(metric, value)| (Template::parse(metric), Template::parse(value)))
            .collect();

        Ok(Self {
            metrics,
            fields_are_metrics: config.fields_are_metrics,
            values_are_hash: config.values_are_hash,
            metric_filter: config.metric_filter()?,
            submetric_filter: config.submetric_filter()?,
            formatter: MetricNameFormatter::new(config.metrics_format.clone()),
        })
    }

    /// Encodes `event` into zero or more metric lines.
    ///
    /// # Errors
    ///
    /// In field-derived mode, a selected field whose shape does not match
    /// `values_are_hash` fails the call with
    /// [`EncodeError::ExpectedNestedValue`] or
    /// [`EncodeError::UnexpectedNestedValue`]. Fields dropped by the name
    /// filter are never inspected.
    pub fn encode(&self, event: &Event) -> Result<Batch, EncodeError> {
        let timestamp = event.epoch_seconds();
        let mut lines = Vec::new();

        if self.fields_are_metrics {
            debug!(fields = event.len(), "got metrics event");
            self.encode_fields(event, timestamp, &mut lines)?;
        } else {
            self.encode_mapping(event, timestamp, &mut lines);
        }

        let batch = Batch { lines };
        if batch.is_empty() {
            debug!("batch is empty, not emitting anything");
        } else {
            debug!(lines = batch.len(), "emitting carbon messages");
        }

        Ok(batch)
    }

    fn encode_fields(
        &self,
        event: &Event,
        timestamp: i64,
        lines: &mut Vec<MetricLine>,
    ) -> Result<(), EncodeError> {
        for (metric, value) in event.fields() {
            if EXCLUDE_ALWAYS.contains(&metric) {
                continue;
            }
            if !self.metric_filter.allows(metric) {
                trace!(metric, "metric filtered out");
                continue;
            }

            let name = self.formatter.format(metric);
            if !is_wire_token(&name) {
                warn!(metric = ?name, "metric name is not a single wire token, skipping");
                continue;
            }

            match (self.values_are_hash, value) {
                (true, FieldValue::Map(submetrics)) => {
                    for (sub_name, sub_value) in submetrics {
                        if !self.submetric_filter.allows(sub_name) {
                            trace!(metric, sub_name = %sub_name, "sub-metric filtered out");
                            continue;
                        }
                        let sub_name = sprintf(sub_name, event);
                        if !is_wire_token(&sub_name) {
                            warn!(
                                metric,
                                sub_name = ?sub_name,
                                "sub-metric name is not a single wire token, skipping"
                            );
                            continue;
                        }
                        lines.push(MetricLine {
                            name: name.clone(),
                            value: MetricValue::Named {
                                name: sub_name,
                                value: coerce_scalar(sub_value, event),
                            },
                            timestamp,
                        });
                    }
                }
                (false, FieldValue::Scalar(scalar)) => {
                    lines.push(MetricLine {
                        name,
                        value: MetricValue::Plain(coerce_scalar(scalar, event)),
                        timestamp,
                    });
                }
                (true, FieldValue::Scalar(_)) => {
                    return Err(EncodeError::ExpectedNestedValue {
                        field: metric.to_string(),
                    });
                }
                (false, FieldValue::Map(_)) => {
                    return Err(EncodeError::UnexpectedNestedValue {
                        field: metric.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn encode_mapping(&self, event: &Event, timestamp: i64, lines: &mut Vec<MetricLine>) {
        for (metric_template, value_template) in &self.metrics {
            let metric = metric_template.render(event);
            let value = value_template.render(event);
            debug!(metric = %metric, value = %value, "processing");

            if !self.metric_filter.allows(&metric) {
                trace!(metric = %metric, "metric filtered out");
                continue;
            }

            let name = self.formatter.format(&metric);
            if !is_wire_token(&name) {
                warn!(metric = ?name, "metric name is not a single wire token, skipping");
                continue;
            }

            lines.push(MetricLine {
                name,
                value: MetricValue::Plain(coerce_f64(&value)),
                timestamp,
            });
        }
    }
}

/// Returns `true` if `name` can stand as one field of a wire line.
fn is_wire_token(name: &str) -> bool {
    !name.is_empty() && !name.contains(char::is_whitespace)
}

/// Renders a scalar through template substitution, then coerces it.
fn coerce_scalar(scalar: &Scalar, event: &Event) -> f64 {
    match scalar {
        Scalar::Text(text) => coerce_f64(&sprintf(text, event)),
        other => coerce_f64(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder(config: CodecConfig) -> Encoder {
        Encoder::new(&config).unwrap()
    }

    fn fields_config() -> CodecConfig {
        CodecConfig {
            fields_are_metrics: true,
            ..CodecConfig::default()
        }
    }

    #[test]
    fn test_explicit_mapping_scenario() {
        let encoder = encoder(CodecConfig::default().with_metric("%{host}/uptime", "%{uptime_1m}"));
        let event = Event::at_epoch(1000)
            .unwrap()
            .with_field("host", "web1")
            .with_field("uptime_1m", "42.5");

        let batch = encoder.encode(&event).unwrap();
        assert_eq!(batch.into_payload().as_deref(), Some("web1/uptime 42.5 1000\n"));
    }

    #[test]
    fn test_rendered_name_with_whitespace_is_skipped() {
        let encoder = encoder(
            CodecConfig::default()
                .with_metric("servers.%{host}.load", "1")
                .with_metric("servers.ok.load", "2"),
        );
        for host in ["a 999 1\nevil.metric", "a b", "a\nb", "a\tb", "a\r"] {
            let event = Event::at_epoch(1000).unwrap().with_field("host", host);
            let batch = encoder.encode(&event).unwrap();

            assert_eq!(batch.len(), 1, "host {host:?}");
            assert_eq!(batch.to_string(), "servers.ok.load 2.0 1000\n");
        }
    }

    #[test]
    fn test_empty_rendered_name_is_skipped() {
        let encoder = encoder(CodecConfig::default().with_metric("%{name}", "1"));
        let event = Event::at_epoch(1000).unwrap().with_field("name", "");

        assert!(encoder.encode(&event).unwrap().is_empty());
    }

    #[test]
    fn test_field_name_with_whitespace_is_skipped() {
        let event = Event::at_epoch(1000)
            .unwrap()
            .with_field("bad name", 1i64)
            .with_field("good", 2i64);

        let batch = encoder(fields_config()).encode(&event).unwrap();
        assert_eq!(batch.to_string(), "good 2.0 1000\n");
    }

    #[test]
    fn test_sub_name_with_whitespace_is_skipped() {
        let config = CodecConfig {
            values_are_hash: true,
            include_metrics: vec!["^stats$".to_string()],
            include_submetrics: Vec::new(),
            ..fields_config()
        };
        let event = Event::at_epoch(1000)
            .unwrap()
            .with_field("host", "x\ny")
            .with_field(
                "stats",
                FieldValue::map([("p%{host}", "1"), ("p 9", "2"), ("p50", "3")]),
            );

        let batch = encoder(config).encode(&event).unwrap();
        assert_eq!(batch.to_string(), "stats p50=3.0 1000\n");
    }

    #[test]
    fn test_explicit_mapping_keeps_config_order() {
        let encoder = encoder(
            CodecConfig::default()
                .with_metric("z", "1")
                .with_metric("a", "2")
                .with_metric("m", "3"),
        );
        let batch = encoder.encode(&Event::at_epoch(5).unwrap()).unwrap();

        let names: Vec<&str> = batch.lines().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_unresolved_metric_name_excluded_by_default() {
        let encoder = encoder(CodecConfig::default().with_metric("%{missing_field}", "1"));
        let batch = encoder.encode(&Event::at_epoch(1000).unwrap()).unwrap();

        assert!(batch.is_empty());
        assert_eq!(batch.into_payload(), None);
    }

    #[test]
    fn test_unresolved_value_coerces_to_zero() {
        let encoder = encoder(CodecConfig::default().with_metric("cpu", "%{missing}"));
        let batch = encoder.encode(&Event::at_epoch(1000).unwrap()).unwrap();

        assert_eq!(batch.to_string(), "cpu 0.0 1000\n");
    }

    #[test]
    fn test_metrics_format_applied() {
        let config = CodecConfig {
            metrics_format: "prod.*.sum".to_string(),
            ..CodecConfig::default().with_metric("cpu", "1.5")
        };
        let batch = encoder(config).encode(&Event::at_epoch(7).unwrap()).unwrap();

        assert_eq!(batch.to_string(), "prod.cpu.sum 1.5 7\n");
    }

    #[test]
    fn test_filter_sees_name_before_formatting() {
        let config = CodecConfig {
            metrics_format: "prod.*".to_string(),
            include_metrics: vec!["^cpu$".to_string()],
            ..CodecConfig::default().with_metric("cpu", "1").with_metric("mem", "2")
        };
        let batch = encoder(config).encode(&Event::at_epoch(7).unwrap()).unwrap();

        assert_eq!(batch.to_string(), "prod.cpu 1.0 7\n");
    }

    #[test]
    fn test_fields_are_metrics() {
        let encoder = encoder(fields_config());
        let event = Event::at_epoch(1000)
            .unwrap()
            .with_field("cpu", 0.5)
            .with_field("requests", 12i64)
            .with_field("label", "n/a");

        let batch = encoder.encode(&event).unwrap();
        assert_eq!(batch.to_string(), "cpu 0.5 1000\nrequests 12.0 1000\nlabel 0.0 1000\n");
    }

    #[test]
    fn test_fields_skip_reserved_names() {
        let config = CodecConfig {
            include_metrics: vec!["@".to_string()],
            exclude_metrics: Vec::new(),
            ..fields_config()
        };
        let mut event = Event::at_epoch(1000).unwrap();
        event.insert("@timestamp", 1i64);
        event.insert("@version", 1i64);
        event.insert("@custom", 2i64);

        let batch = encoder(config).encode(&event).unwrap();
        assert_eq!(batch.to_string(), "@custom 2.0 1000\n");
    }

    #[test]
    fn test_fields_exclusion_wins() {
        let config = CodecConfig {
            include_metrics: vec!["^cpu".to_string()],
            exclude_metrics: vec!["idle".to_string()],
            ..fields_config()
        };
        let event = Event::at_epoch(1)
            .unwrap()
            .with_field("cpu.user", 1i64)
            .with_field("cpu.idle", 2i64)
            .with_field("mem", 3i64);

        let batch = encoder(config).encode(&event).unwrap();
        assert_eq!(batch.to_string(), "cpu.user 1.0 1\n");
    }

    #[test]
    fn test_nested_values_with_submetric_filter() {
        let config = CodecConfig {
            values_are_hash: true,
            include_submetrics: vec!["p9.*".to_string()],
            ..fields_config()
        };
        let event = Event::at_epoch(1000)
            .unwrap()
            .with_field("stats", FieldValue::map([("p50", "1.1"), ("p99", "9.9")]));

        let batch = encoder(config).encode(&event).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch.lines()[0].value,
            MetricValue::Named {
                name: "p99".to_string(),
                value: 9.9,
            }
        );
        assert_eq!(batch.to_string(), "stats p99=9.9 1000\n");
    }

    #[test]
    fn test_nested_values_empty_submetric_filter_allows_all() {
        let config = CodecConfig {
            values_are_hash: true,
            include_submetrics: Vec::new(),
            metrics_format: "app.*".to_string(),
            ..fields_config()
        };
        let event = Event::at_epoch(10)
            .unwrap()
            .with_field("latency", FieldValue::map([("p50", 1.5), ("p99", 3.0)]));

        let batch = encoder(config).encode(&event).unwrap();
        assert_eq!(batch.to_string(), "app.latency p50=1.5 10\napp.latency p99=3.0 10\n");
    }

    #[test]
    fn test_nested_names_and_values_are_templated() {
        let config = CodecConfig {
            values_are_hash: true,
            include_metrics: vec!["^stats$".to_string()],
            ..fields_config()
        };
        let event = Event::at_epoch(10)
            .unwrap()
            .with_field("host", "web1")
            .with_field("current", "4.5")
            .with_field("stats", FieldValue::map([("%{host}", "%{current}")]));

        let batch = encoder(config).encode(&event).unwrap();
        assert_eq!(batch.to_string(), "stats web1=4.5 10\n");
    }

    #[test]
    fn test_scalar_with_values_are_hash_fails() {
        let config = CodecConfig {
            values_are_hash: true,
            ..fields_config()
        };
        let event = Event::at_epoch(1).unwrap().with_field("cpu", 1i64);

        let err = encoder(config).encode(&event).unwrap_err();
        assert_eq!(
            err,
            EncodeError::ExpectedNestedValue {
                field: "cpu".to_string(),
            }
        );
    }

    #[test]
    fn test_map_without_values_are_hash_fails() {
        let event = Event::at_epoch(1)
            .unwrap()
            .with_field("stats", FieldValue::map([("p50", 1i64)]));

        let err = encoder(fields_config()).encode(&event).unwrap_err();
        assert!(matches!(err, EncodeError::UnexpectedNestedValue { .. }));
    }

    #[test]
    fn test_filtered_field_shape_not_checked() {
        let config = CodecConfig {
            values_are_hash: true,
            exclude_metrics: vec!["^message$".to_string()],
            ..fields_config()
        };
        let event = Event::at_epoch(1)
            .unwrap()
            .with_field("message", "hello")
            .with_field("stats", FieldValue::map([("p50", 1i64)]));

        let batch = encoder(config).encode(&event).unwrap();
        assert_eq!(batch.to_string(), "stats p50=1.0 1\n");
    }

    #[test]
    fn test_empty_batch_is_repeatable() {
        let encoder = encoder(CodecConfig::default().with_metric("%{nope}", "1"));
        let event = Event::at_epoch(1).unwrap();

        let first = encoder.encode(&event).unwrap();
        let second = encoder.encode(&event).unwrap();
        assert!(first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_to() {
        let encoder = encoder(CodecConfig::default().with_metric("a", "1").with_metric("b", "2"));
        let batch = encoder.encode(&Event::at_epoch(3).unwrap()).unwrap();

        let mut out = Vec::new();
        batch.write_to(&mut out).unwrap();
        assert_eq!(out, b"a 1.0 3\nb 2.0 3\n");
    }
}
