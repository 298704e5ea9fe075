//! Graphite line decoding.

use crate::coerce::coerce_f64;
use crate::error::DecodeError;
use crate::event::{Event, Scalar};

/// Parses `name value timestamp` lines into events.
///
/// The decoder applies no filtering or formatting: the resulting event holds
/// exactly one user field, the metric name mapped to its value as a float,
/// with `@timestamp` taken from the line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    /// Creates a decoder.
    pub fn new() -> Self {
        Self
    }

    /// Decodes a single line, without its terminator.
    ///
    /// A value that is not a decimal number decodes as `0.0`.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::MalformedLine`] if the line does not split on
    ///   whitespace into exactly three fields
    /// - [`DecodeError::InvalidTimestamp`] if the timestamp is not an integer
    /// - [`DecodeError::TimestampOutOfRange`] if the timestamp cannot be
    ///   represented
    ///
    /// # Examples
    ///
    /// ```rust
    /// use graphite_codec::{Decoder, FieldValue};
    ///
    /// let event = Decoder::new().decode("servers.web1.load 0.75 1700000000").unwrap();
    /// assert_eq!(event.get("servers.web1.load"), Some(&FieldValue::from(0.75)));
    /// assert_eq!(event.epoch_seconds(), 1_700_000_000);
    /// ```
    pub fn decode(&self, line: &str) -> Result<Event, DecodeError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let &[name, value, timestamp] = tokens.as_slice() else {
            return Err(DecodeError::MalformedLine {
                line: line.to_string(),
                tokens: tokens.len(),
            });
        };

        let seconds: i64 = timestamp.parse().map_err(|_| DecodeError::InvalidTimestamp {
            token: timestamp.to_string(),
        })?;
        let event = Event::at_epoch(seconds)?;

        Ok(event.with_field(name, Scalar::Float(coerce_f64(value))))
    }
}
