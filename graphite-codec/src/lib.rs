//! # graphite-codec
//!
//! Bidirectional codec between the Graphite plaintext protocol and
//! structured events.
//!
//! Graphite (Carbon) accepts one metric sample per line:
//!
//! ```text
//! <metric-path> <value> <timestamp>\n
//! ```
//!
//! This crate turns such lines into [`Event`]s for a processing pipeline, and
//! turns events back into lines for a Graphite-compatible collector. Encoding
//! is configurable: metrics can come from an explicit name/value mapping or
//! from the event's own fields, nested values can be flattened into
//! sub-metrics, names can be filtered with regular expressions, and a format
//! template can prefix or wrap every emitted name.
//!
//! The codec never touches the network; callers own transport, retries and
//! connection handling.
//!
//! ## Quick Start
//!
//! ```rust
//! use graphite_codec::{CodecConfig, Event, FieldValue, GraphiteCodec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CodecConfig {
//!     fields_are_metrics: true,
//!     metrics_format: "prod.*".to_string(),
//!     ..CodecConfig::default()
//! };
//! let codec = GraphiteCodec::new(config)?;
//!
//! let event = Event::at_epoch(1_700_000_000)
//!     .unwrap()
//!     .with_field("cpu", 0.25)
//!     .with_field("mem", 512i64);
//!
//! let batch = codec.encode(&event)?;
//! assert_eq!(
//!     batch.to_string(),
//!     "prod.cpu 0.25 1700000000\nprod.mem 512.0 1700000000\n"
//! );
//!
//! let decoded = codec.decode_line("prod.cpu 0.25 1700000000")?;
//! assert_eq!(decoded.get("prod.cpu"), Some(&FieldValue::from(0.25)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`GraphiteCodec`]: Configured handle exposing decode and encode
//! - [`Decoder`]: One line in, one event out
//! - [`Encoder`]: One event in, a [`Batch`] of zero or more lines out
//! - [`MetricNameFormatter`]: Applies `metrics_format` to metric names
//! - [`LineSplitter`]: Splits a raw byte stream into lines
//!
//! ## Modules
//!
//! - [`codec`]: Codec handle and batch sinks
//! - [`config`]: Configuration options and defaults
//! - [`decode`]: Line decoding
//! - [`encode`]: Event encoding and wire lines
//! - [`event`]: Event and field value types
//! - [`filter`]: Regex include/exclude filters
//! - [`format`]: Metric-name formatting
//! - [`framing`]: Byte stream to line splitting
//! - [`template`]: `%{field}` template substitution
//! - [`coerce`]: Float coercion and value rendering
//! - [`error`]: Error types

pub mod codec;
pub mod coerce;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod event;
pub mod filter;
pub mod format;
pub mod framing;
pub mod template;

// Re-export primary API types at crate root for convenience.
pub use codec::{BatchSink, GraphiteCodec};
pub use config::CodecConfig;
pub use decode::Decoder;
pub use encode::{Batch, Encoder, MetricLine, MetricValue};
pub use error::{CodecError, ConfigError, DecodeError, EncodeError, Result};
pub use event::{Event, FieldValue, Scalar};
pub use format::MetricNameFormatter;
pub use framing::LineSplitter;
pub use template::Template;
