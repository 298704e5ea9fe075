//! Metric-name formatting (`metrics_format`).

/// Token in the format template that stands for the metric's own name.
pub const METRIC_PLACEHOLDER: &str = "*";

/// Format template applied when none is configured.
pub const DEFAULT_METRICS_FORMAT: &str = METRIC_PLACEHOLDER;

/// Renders a metric's final wire name from a format template.
///
/// Every `*` in the template is replaced by the metric name. A template
/// without `*` yields the same name for every metric. An empty template
/// leaves names unchanged.
///
/// # Examples
///
/// ```rust
/// use graphite_codec::MetricNameFormatter;
///
/// let formatter = MetricNameFormatter::new("prod.*.sum");
/// assert_eq!(formatter.format("cpu"), "prod.cpu.sum");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricNameFormatter {
    template: String,
}

impl MetricNameFormatter {
    /// Creates a formatter for `template`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Returns the wire name for `metric_name`.
    pub fn format(&self, metric_name: &str) -> String {
        if self.template.is_empty() {
            return metric_name.to_string();
        }
        self.template.replace(METRIC_PLACEHOLDER, metric_name)
    }

    /// The configured template.
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl Default for MetricNameFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_METRICS_FORMAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        assert_eq!(MetricNameFormatter::default().format("cpu.load"), "cpu.load");
    }

    #[test]
    fn test_empty_is_identity() {
        assert_eq!(MetricNameFormatter::new("").format("cpu.load"), "cpu.load");
    }

    #[test]
    fn test_every_placeholder_replaced() {
        let formatter = MetricNameFormatter::new("*.by_host.*");
        assert_eq!(formatter.format("cpu"), "cpu.by_host.cpu");
    }

    #[test]
    fn test_constant_template() {
        let formatter = MetricNameFormatter::new("totals");
        assert_eq!(formatter.format("cpu"), "totals");
        assert_eq!(formatter.format("mem"), "totals");
    }
}
