//! Regex-based metric name filtering.
//!
//! Patterns are compiled once when the codec is built and evaluated per call.
//! Matching is an unanchored search: `cpu` matches `servers.cpu.load`.

use regex::Regex;

use crate::error::ConfigError;

/// An ordered list of compiled patterns with "any match" semantics.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compiles `patterns` in order.
    ///
    /// `option` names the configuration option the patterns came from and is
    /// only used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for the first pattern that
    /// fails to compile.
    pub fn compile<S: AsRef<str>>(
        option: &'static str,
        patterns: &[S],
    ) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    option,
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Returns `true` if at least one pattern matches somewhere in `name`.
    ///
    /// An empty set matches nothing.
    pub fn any_match(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }

    /// Returns `true` if the set holds no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Number of patterns in the set.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

/// Include/exclude filter applied to top-level metric names.
///
/// A name passes if it matches at least one include pattern and no exclude
/// pattern. When both lists match, exclusion wins.
#[derive(Debug, Clone)]
pub struct MetricFilter {
    include: PatternSet,
    exclude: PatternSet,
}

impl MetricFilter {
    /// Creates a filter from compiled include and exclude sets.
    pub fn new(include: PatternSet, exclude: PatternSet) -> Self {
        Self { include, exclude }
    }

    /// Returns `true` if a metric called `name` should be emitted.
    pub fn allows(&self, name: &str) -> bool {
        self.include.any_match(name) && !self.exclude.any_match(name)
    }
}

/// Inclusion filter for sub-metric names of nested values.
///
/// Unlike [`MetricFilter`], an empty list lets every sub-metric through, and
/// there is no exclude list.
#[derive(Debug, Clone)]
pub struct SubmetricFilter {
    include: PatternSet,
}

impl SubmetricFilter {
    /// Creates a filter from a compiled include set.
    pub fn new(include: PatternSet) -> Self {
        Self { include }
    }

    /// Returns `true` if a sub-metric called `name` should be emitted.
    pub fn allows(&self, name: &str) -> bool {
        self.include.is_empty() || self.include.any_match(name)
    }
}
