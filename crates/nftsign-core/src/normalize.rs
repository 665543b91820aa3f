#![forbid(unsafe_code)]

//! Field normalizers: the canonical textual form of every field class.
//!
//! The authority's canonicalization manual fixes one exact rendering per
//! semantic field type. The byte buffer that gets hashed and signed is made
//! of these renderings, so a one-character divergence here produces a
//! signature the authority rejects without explanation.

use crate::error::{Error, Result};
use chrono::NaiveDate;

/// Plain string normalization: non-breaking spaces become regular spaces,
/// then surrounding whitespace is trimmed. Internal whitespace is kept.
pub fn plain(raw: &str) -> String {
    raw.replace('\u{a0}', " ").trim().to_string()
}

/// Numeric identifier normalization (CPF, CNPJ, municipal registrations,
/// city codes). All-digit values lose their leading zeros; anything else
/// passes through plain normalization unchanged.
///
/// Stripping works on the string so identifiers of any length are safe.
pub fn numeric_identifier(raw: &str) -> String {
    let s = plain(raw);
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = s.trim_start_matches('0');
        if stripped.is_empty() {
            "0".to_string()
        } else {
            stripped.to_string()
        }
    } else {
        s
    }
}

/// Series normalization: plain trimming only. The series is NOT padded or
/// truncated to a fixed width; any zero-padding belongs to the submission
/// wrapper and must never reach the signing form.
pub fn series(raw: &str) -> String {
    plain(raw)
}

/// Parse a decimal field, accepting `.` or `,` as the fraction separator.
///
/// Empty (after plain normalization) is `None`: the element is omitted.
/// Non-empty text that does not parse, or parses to a non-finite value,
/// is a malformed-field error.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<Option<f64>> {
    let s = plain(raw);
    if s.is_empty() {
        return Ok(None);
    }
    let v: f64 = s
        .replace(',', ".")
        .parse()
        .map_err(|_| Error::malformed(field, raw))?;
    if !v.is_finite() {
        return Err(Error::malformed(field, raw));
    }
    Ok(Some(v))
}

/// Monetary rendering: exactly two fraction digits, `.` separator, no
/// thousands separator.
pub fn format_monetary(value: f64) -> String {
    format!("{value:.2}")
}

/// Tax-rate rendering: shortest decimal form, with `.0` appended when the
/// value is integral. Matches the upstream producer's float formatting
/// ("5" renders as "5.0", "3.50" as "3.5").
pub fn format_rate(value: f64) -> String {
    let s = format!("{value}");
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

/// Boolean parsing: a small set of affirmative spellings (Portuguese and
/// English) is true; everything else, including empty, is false.
pub fn parse_boolean(raw: &str) -> bool {
    matches!(
        plain(raw).to_ascii_lowercase().as_str(),
        "true" | "1" | "s" | "sim" | "t" | "y" | "yes"
    )
}

/// Boolean rendering: lowercase `true`/`false`.
pub fn format_boolean(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Parse a date field. Accepts `YYYY-MM-DD`, tolerating an appended
/// `Thh:mm:ss...` time part (xsd:dateTime), which is discarded.
pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate> {
    let s = plain(raw);
    let date_part = match s.split_once('T') {
        Some((d, _)) => d,
        None => s.as_str(),
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| Error::malformed(field, raw))
}

/// Date rendering: `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
