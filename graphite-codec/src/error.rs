//! Error types for the Graphite codec.

use thiserror::Error;

/// The main error type for all codec operations.
///
/// Every variant is local to a single call: a failed decode or encode leaves
/// no state behind that could affect the next one.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Error loading or validating the codec configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Error decoding a Graphite line into an event.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error encoding an event into Graphite lines.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The batch sink failed to accept an encoded batch.
    #[error("sink error: {0}")]
    Sink(#[from] std::io::Error),
}

/// Errors raised while loading or compiling configuration.
///
/// These are construction-time failures: a codec is never built from a
/// configuration that produces one of them.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configured regular expression failed to compile.
    #[error("invalid pattern '{pattern}' in {option}: {source}")]
    InvalidPattern {
        /// The configuration option holding the pattern.
        option: &'static str,
        /// The pattern text as configured.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// The configuration file could not be read.
    #[error("failed to read config from '{}': {source}", path.display())]
    Load {
        /// The config file path.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`crate::CodecConfig`].
    #[error("failed to parse config from '{}': {source}", path.display())]
    Parse {
        /// The config file path.
        path: std::path::PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur while decoding a single Graphite line.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The line did not split into `name value timestamp`.
    #[error("malformed line {line:?}: expected 3 fields, found {tokens}")]
    MalformedLine {
        /// The offending line.
        line: String,
        /// Number of whitespace-separated tokens found.
        tokens: usize,
    },

    /// The timestamp field is not an integer.
    #[error("invalid timestamp {token:?}: expected integer seconds since the epoch")]
    InvalidTimestamp {
        /// The timestamp token as received.
        token: String,
    },

    /// The timestamp cannot be represented as an instant.
    #[error("timestamp {seconds} is out of range")]
    TimestampOutOfRange {
        /// The parsed seconds value.
        seconds: i64,
    },
}

/// Errors that can occur while encoding an event.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// `values_are_hash` is set but the selected field holds a scalar.
    #[error("field '{field}' holds a scalar but values_are_hash expects a nested map")]
    ExpectedNestedValue {
        /// The field name.
        field: String,
    },

    /// `values_are_hash` is unset but the selected field holds a nested map.
    #[error("field '{field}' holds a nested map; enable values_are_hash to emit sub-metrics")]
    UnexpectedNestedValue {
        /// The field name.
        field: String,
    },
}

/// Type alias for `Result<T, CodecError>`.
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_converts() {
        let err: CodecError = DecodeError::MalformedLine {
            line: "foo 1".to_string(),
            tokens: 2,
        }
        .into();
        assert!(matches!(err, CodecError::Decode(_)));
        assert_eq!(
            err.to_string(),
            "decode error: malformed line \"foo 1\": expected 3 fields, found 2"
        );
    }

    #[test]
    fn test_invalid_pattern_message() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = ConfigError::InvalidPattern {
            option: "include_metrics",
            pattern: "(".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("invalid pattern '(' in include_metrics:"));
    }
}
