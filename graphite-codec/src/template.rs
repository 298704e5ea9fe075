//! Field-reference templates (`%{host}/uptime`, `%{+%s}`).
//!
//! A template is text with embedded placeholders of the form `%{...}`:
//!
//! - `%{name}` or `%{[name]}` is replaced by the field's rendered value
//! - `%{[name][sub]}` is replaced by one entry of a nested field
//! - `%{@timestamp}` and `%{@version}` render the reserved fields
//! - `%{+%s}` renders the timestamp as whole seconds since the epoch
//! - `%{+FMT}` renders the timestamp through `strftime`-style `FMT`, in UTC
//!
//! A placeholder that cannot be resolved is left in the output verbatim, so
//! that a pattern such as `%\{[^}]+\}` can recognize and drop it later.

use std::fmt::Write as _;

use chrono::SecondsFormat;
use chrono::format::{Item, StrftimeItems};

use crate::event::{Event, TIMESTAMP_FIELD, VERSION_FIELD};

/// A parsed template, ready to be rendered against any number of events.
///
/// Parsing never fails: malformed placeholders are simply kept as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field { name: String, raw: String },
    Nested { name: String, sub_name: String, raw: String },
    Timestamp,
    Version,
    EpochSeconds,
    TimeFormat(String),
    /// A placeholder that can never resolve (bad strftime, deep reference).
    Unresolvable(String),
}

impl Template {
    /// Parses `source` into literal text and placeholders.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use graphite_codec::{Event, Template};
    ///
    /// let template = Template::parse("%{host}/uptime");
    /// let event = Event::at_epoch(0).unwrap().with_field("host", "web1");
    /// assert_eq!(template.render(&event), "web1/uptime");
    /// ```
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(start) = rest.find("%{") {
            let after = &rest[start + 2..];
            match after.find('}') {
                // `%{}` is not a placeholder.
                Some(0) => {
                    literal.push_str(&rest[..start + 3]);
                    rest = &after[1..];
                }
                Some(end) => {
                    literal.push_str(&rest[..start]);
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    let raw = &rest[start..start + 2 + end + 1];
                    segments.push(Segment::placeholder(&after[..end], raw));
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Returns `true` if the template contains no placeholders.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    /// Renders the template against `event`.
    pub fn render(&self, event: &Event) -> String {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) | Segment::Unresolvable(text) => out.push_str(text),
                Segment::Field { name, raw } => match event.get(name) {
                    Some(value) => {
                        let _ = write!(out, "{value}");
                    }
                    None => out.push_str(raw),
                },
                Segment::Nested { name, sub_name, raw } => {
                    match event.get_nested(name, sub_name) {
                        Some(value) => {
                            let _ = write!(out, "{value}");
                        }
                        None => out.push_str(raw),
                    }
                }
                Segment::Timestamp => {
                    out.push_str(&event.timestamp().to_rfc3339_opts(SecondsFormat::Secs, true));
                }
                Segment::Version => out.push_str(event.version()),
                Segment::EpochSeconds => {
                    let _ = write!(out, "{}", event.epoch_seconds());
                }
                Segment::TimeFormat(format) => {
                    let _ = write!(out, "{}", event.timestamp().format(format));
                }
            }
        }

        out
    }
}

impl Segment {
    fn placeholder(content: &str, raw: &str) -> Self {
        if let Some(format) = content.strip_prefix('+') {
            if format == "%s" {
                return Self::EpochSeconds;
            }
            let valid = !StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
            return if valid {
                Self::TimeFormat(format.to_string())
            } else {
                Self::Unresolvable(raw.to_string())
            };
        }

        let path: Vec<&str> = match content
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
        {
            Some(inner) => inner.split("][").collect(),
            None => vec![content],
        };

        match path.as_slice() {
            [TIMESTAMP_FIELD] => Self::Timestamp,
            [VERSION_FIELD] => Self::Version,
            [name] => Self::Field {
                name: (*name).to_string(),
                raw: raw.to_string(),
            },
            [name, sub_name] => Self::Nested {
                name: (*name).to_string(),
                sub_name: (*sub_name).to_string(),
                raw: raw.to_string(),
            },
            _ => Self::Unresolvable(raw.to_string()),
        }
    }
}

/// Parses and renders `source` against `event` in one step.
///
/// Prefer [`Template::parse`] once plus [`Template::render`] per event when
/// the same text is rendered repeatedly.
pub fn sprintf(source: &str, event: &Event) -> String {
    if !source.contains("%{") {
        return source.to_string();
    }
    Template::parse(source).render(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FieldValue;

    fn event() -> Event {
        Event::at_epoch(1_700_000_000)
            .unwrap()
            .with_field("host", "web1")
            .with_field("uptime_1m", "42.5")
            .with_field("count", 7i64)
            .with_field("stats", FieldValue::map([("p99", "9.9")]))
    }

    #[test]
    fn test_literal_only() {
        let template = Template::parse("cpu.load");
        assert!(template.is_literal());
        assert_eq!(template.render(&event()), "cpu.load");
    }

    #[test]
    fn test_field_reference() {
        assert_eq!(sprintf("%{host}/uptime", &event()), "web1/uptime");
        assert_eq!(sprintf("%{[host]}.%{count}", &event()), "web1.7");
        assert_eq!(sprintf("%{uptime_1m}", &event()), "42.5");
    }

    #[test]
    fn test_nested_reference() {
        assert_eq!(sprintf("%{[stats][p99]}", &event()), "9.9");
        assert_eq!(sprintf("%{stats}", &event()), r#"{"p99":"9.9"}"#);
    }

    #[test]
    fn test_unresolved_left_verbatim() {
        assert_eq!(sprintf("%{missing_field}", &event()), "%{missing_field}");
        assert_eq!(sprintf("a.%{[stats][p50]}.b", &event()), "a.%{[stats][p50]}.b");
        assert_eq!(sprintf("%{[a][b][c]}", &event()), "%{[a][b][c]}");
    }

    #[test]
    fn test_reserved_fields() {
        assert_eq!(sprintf("%{+%s}", &event()), "1700000000");
        assert_eq!(sprintf("%{@timestamp}", &event()), "2023-11-14T22:13:20Z");
        assert_eq!(sprintf("%{@version}", &event()), "1");
    }

    #[test]
    fn test_strftime_format() {
        assert_eq!(sprintf("%{+%Y.%m.%d}", &event()), "2023.11.14");
    }

    #[test]
    fn test_invalid_strftime_is_unresolvable() {
        assert_eq!(sprintf("x %{+%Q}", &event()), "x %{+%Q}");
    }

    #[test]
    fn test_not_placeholders() {
        assert_eq!(sprintf("100%", &event()), "100%");
        assert_eq!(sprintf("%{}", &event()), "%{}");
        assert_eq!(sprintf("%{host", &event()), "%{host");
        assert_eq!(sprintf("%{}%{host}", &event()), "%{}web1");
    }

    #[test]
    fn test_multiple_placeholders_keep_surrounding_text() {
        assert_eq!(
            sprintf("servers.%{host}.uptime.%{count}s", &event()),
            "servers.web1.uptime.7s"
        );
    }
}
