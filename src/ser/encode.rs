//! Scalar percent-encoding.
//!
//! The unreserved set, the UTF-8 byte expansion and the Latin-1
//! `%uXXXX`-to-entity rewrite all follow the reference qs encoder so
//! output is byte-identical to it.

use std::sync::OnceLock;

use regex::Regex;

use crate::options::{Charset, Format};
use crate::value::{Number, Value};

/// Coerce a scalar to its text rendering: booleans lowercase, numbers
/// through itoa/ryu, timestamps as RFC 3339. Containers and nulls
/// render as the empty string.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_owned(),
        Value::Number(Number::Int(i)) => itoa::Buffer::new().format(*i).to_owned(),
        Value::Number(Number::Float(f)) => ryu::Buffer::new().format(*f).to_owned(),
        Value::DateTime(dt) => dt.to_rfc3339(),
        Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Undefined | Value::Null | Value::Seq(_) | Value::Map(_) => String::new(),
    }
}

/// Percent-encode a scalar under the given charset and format.
///
/// Space handling is the caller's concern: output leaves spaces as
/// `%20` and [`Format::apply`] rewrites them for RFC 1738.
pub(crate) fn encode_scalar(value: &Value, charset: Charset, format: Format) -> String {
    match value {
        Value::Undefined | Value::Null | Value::Seq(_) | Value::Map(_) => return String::new(),
        Value::Bytes(bytes) => return encode_bytes(bytes, format),
        _ => {}
    }

    let text = scalar_text(value);
    if text.is_empty() {
        return text;
    }

    match charset {
        Charset::Utf8 => encode_utf8(&text, format),
        Charset::Latin1 => rewrite_unicode_escapes(&escape(&text, format)),
    }
}

/// The RFC 3986 unreserved set, widened with `(` and `)` for
/// RFC 1738.
fn is_safe_char(c: char, format: Format) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '-' | '.' | '_' | '~')
        || (format == Format::Rfc1738 && matches!(c, '(' | ')'))
}

fn push_hex(out: &mut String, byte: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push('%');
    out.push(HEX[(byte >> 4) as usize] as char);
    out.push(HEX[(byte & 0x0f) as usize] as char);
}

fn encode_utf8(text: &str, format: Format) -> String {
    let mut out = String::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if is_safe_char(c, format) {
            out.push(c);
        } else {
            for byte in c.encode_utf8(&mut buf).bytes() {
                push_hex(&mut out, byte);
            }
        }
    }
    out
}

/// Byte buffers encode as their literal bytes, independent of charset.
fn encode_bytes(bytes: &[u8], format: Format) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        if byte.is_ascii() && is_safe_char(byte as char, format) {
            out.push(byte as char);
        } else {
            push_hex(&mut out, byte);
        }
    }
    out
}

/// Legacy JavaScript `escape` over UTF-16 code units: safe points
/// pass through, code units below 0x100 emit `%XX`, the rest emit
/// `%uXXXX` (non-BMP characters as their surrogate pair).
pub(crate) fn escape(text: &str, format: Format) -> String {
    let mut out = String::with_capacity(text.len());
    for unit in text.encode_utf16() {
        if unit < 0x80 && is_safe_point(unit as u8 as char, format) {
            out.push(unit as u8 as char);
        } else if unit < 0x100 {
            push_hex(&mut out, unit as u8);
        } else {
            out.push_str(&format!("%u{unit:04X}"));
        }
    }
    out
}

/// The `escape` safe set: alphanumerics plus `@ * _ - + . /`, with
/// `(` and `)` added under RFC 1738.
fn is_safe_point(c: char, format: Format) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '@' | '*' | '_' | '-' | '+' | '.' | '/')
        || (format == Format::Rfc1738 && matches!(c, '(' | ')'))
}

/// Rewrite `%uXXXX` escapes into percent-encoded decimal entities
/// (`%26%23NNN%3B`) so the output survives Latin-1 transport.
fn rewrite_unicode_escapes(escaped: &str) -> String {
    static UNICODE_ESCAPE: OnceLock<Regex> = OnceLock::new();
    let pattern = UNICODE_ESCAPE
        .get_or_init(|| Regex::new(r"%u([0-9a-fA-F]{4})").expect("escape pattern compiles"));
    pattern
        .replace_all(escaped, |caps: &regex::Captures<'_>| {
            match u32::from_str_radix(&caps[1], 16) {
                Ok(unit) => format!("%26%23{unit}%3B"),
                Err(_) => caps[0].to_owned(),
            }
        })
        .into_owned()
}
