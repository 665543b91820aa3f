#![forbid(unsafe_code)]

//! Entity escaping for canonical output.
//!
//! The authority's reference serializer escapes exactly four characters in
//! text content: `&` → `&amp;`, `<` → `&lt;`, `>` → `&gt;`, `\r` → `&#13;`
//! (decimal character reference). Nothing else is escaped; the canonical
//! form carries no attributes.

/// Escape text content for the canonical byte form.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
    out
}
