//! The Graphite codec: decode and encode behind one configured handle.
//!
//! # Example
//!
//! ```rust
//! use graphite_codec::{CodecConfig, Event, GraphiteCodec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CodecConfig::default().with_metric("%{host}/uptime", "%{uptime_1m}");
//! let codec = GraphiteCodec::new(config)?;
//!
//! let event = Event::at_epoch(1000)
//!     .unwrap()
//!     .with_field("host", "web1")
//!     .with_field("uptime_1m", "42.5");
//!
//! let mut wire = Vec::new();
//! codec.encode_to(&event, &mut wire)?;
//! assert_eq!(wire, b"web1/uptime 42.5 1000\n");
//!
//! let decoded = codec.decode_line("web1/uptime 42.5 1000")?;
//! assert_eq!(decoded.epoch_seconds(), 1000);
//! # Ok(())
//! # }
//! ```

use std::io;

use tracing::trace;

use crate::config::CodecConfig;
use crate::decode::Decoder;
use crate::encode::{Batch, Encoder};
use crate::error::Result;
use crate::event::Event;
use crate::framing::LineSplitter;

/// Destination for encoded batches.
///
/// [`GraphiteCodec::encode_to`] calls [`BatchSink::send`] exactly once per
/// non-empty batch and never for an empty one. Every [`io::Write`] is a sink
/// that writes the payload verbatim.
pub trait BatchSink {
    /// Accepts the wire payload encoded from `event`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload could not be delivered.
    fn send(&mut self, event: &Event, payload: &str) -> io::Result<()>;
}

impl<W: io::Write> BatchSink for W {
    fn send(&mut self, _event: &Event, payload: &str) -> io::Result<()> {
        self.write_all(payload.as_bytes())
    }
}

/// A configured Graphite codec.
///
/// Construction validates the configuration and compiles every pattern;
/// afterwards the codec is immutable and can be shared across threads.
#[derive(Debug, Clone)]
pub struct GraphiteCodec {
    config: CodecConfig,
    decoder: Decoder,
    encoder: Encoder,
}

impl GraphiteCodec {
    /// Builds a codec from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidPattern`] if any configured
    /// pattern fails to compile.
    pub fn new(config: CodecConfig) -> Result<Self> {
        let encoder = Encoder::new(&config)?;
        Ok(Self {
            config,
            decoder: Decoder::new(),
            encoder,
        })
    }

    /// The configuration this codec was built from.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Decodes one Graphite line into an event.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DecodeError`] if the line is malformed.
    pub fn decode_line(&self, line: &str) -> Result<Event> {
        Ok(self.decoder.decode(line)?)
    }

    /// Feeds raw bytes through `splitter` and decodes every completed line.
    ///
    /// Blank lines are skipped. Each other line yields one result, so a
    /// malformed line does not affect its neighbours.
    pub fn decode_stream(&self, splitter: &mut LineSplitter, data: &[u8]) -> Vec<Result<Event>> {
        splitter
            .push(data)
            .iter()
            .filter_map(|line| self.decode_nonblank(line))
            .collect()
    }

    /// Decodes whatever unterminated line `splitter` still holds.
    ///
    /// Call once at end of stream, after the last [`decode_stream`](Self::decode_stream).
    pub fn finish_stream(&self, splitter: &mut LineSplitter) -> Option<Result<Event>> {
        let line = splitter.flush()?;
        self.decode_nonblank(&line)
    }

    /// Encodes an event into a batch of metric lines.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EncodeError`] if a selected field's shape does not
    /// match `values_are_hash`.
    pub fn encode(&self, event: &Event) -> Result<Batch> {
        Ok(self.encoder.encode(event)?)
    }

    /// Encodes an event and hands the payload to `sink`.
    ///
    /// Returns `true` if a batch was sent, `false` if there was nothing to
    /// emit; in the latter case `sink` is not called.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EncodeError`] if encoding fails, or
    /// [`crate::CodecError::Sink`] if the sink rejects the payload.
    pub fn encode_to<S: BatchSink + ?Sized>(&self, event: &Event, sink: &mut S) -> Result<bool> {
        let Some(payload) = self.encode(event)?.into_payload() else {
            return Ok(false);
        };
        sink.send(event, &payload)?;
        Ok(true)
    }

    fn decode_nonblank(&self, line: &str) -> Option<Result<Event>> {
        if line.trim().is_empty() {
            trace!("skipping blank line");
            return None;
        }
        Some(self.decode_line(line))
    }
}
