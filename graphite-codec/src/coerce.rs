//! Float coercion shared by the decoder and the encoder.
//!
//! Graphite values are always doubles. Text that does not read as a decimal
//! number coerces to exactly `0.0` instead of failing, so a single bad value
//! never drops the rest of an event.

/// Coerces a textual value to `f64`.
///
/// Surrounding whitespace is ignored. Only decimal notation is accepted
/// (digits, sign, decimal point, exponent); everything else, including the
/// `inf`/`NaN` spellings and the empty string, yields `0.0`. So does a
/// decimal that overflows `f64`, which keeps the result always finite.
///
/// # Examples
///
/// ```rust
/// use graphite_codec::coerce::coerce_f64;
///
/// assert_eq!(coerce_f64("42.5"), 42.5);
/// assert_eq!(coerce_f64(" -3 "), -3.0);
/// assert_eq!(coerce_f64("abc"), 0.0);
/// assert_eq!(coerce_f64("NaN"), 0.0);
/// assert_eq!(coerce_f64("1e400"), 0.0);
/// ```
pub fn coerce_f64(text: &str) -> f64 {
    let text = text.trim();
    let is_decimal = !text.is_empty()
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));

    if !is_decimal {
        return 0.0;
    }

    text.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Renders a value the way it appears on the wire.
///
/// Uses the shortest representation that round-trips through `f64` parsing,
/// and always carries a fractional part or exponent (`1.0`, not `1`).
///
/// # Examples
///
/// ```rust
/// use graphite_codec::coerce::format_value;
///
/// assert_eq!(format_value(42.5), "42.5");
/// assert_eq!(format_value(1.0), "1.0");
/// ```
pub fn format_value(value: f64) -> String {
    format!("{value:?}")
}
