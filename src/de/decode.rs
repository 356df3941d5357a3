use std::sync::OnceLock;

use regex::Regex;

use crate::options::Charset;

/// Decodes a percent-escaped token into a scalar string.
///
/// `+` always decodes to a space, matching web form behavior. Under
/// UTF-8, escape runs decode as one byte sequence with U+FFFD
/// replacing invalid sequences. Under Latin-1 each `%HH` escape is a
/// single code point; malformed escapes stay literal.
pub(crate) fn decode_scalar(token: &str, charset: Charset) -> String {
    match charset {
        Charset::Utf8 => {
            let plus_replaced: Vec<u8> = token
                .bytes()
                .map(|b| if b == b'+' { b' ' } else { b })
                .collect();
            percent_encoding::percent_decode(&plus_replaced)
                .decode_utf8_lossy()
                .into_owned()
        }
        Charset::Latin1 => {
            let chars: Vec<char> = token.chars().collect();
            let mut out = String::with_capacity(token.len());
            let mut i = 0;
            while i < chars.len() {
                let c = chars[i];
                if c == '+' {
                    out.push(' ');
                    i += 1;
                    continue;
                }
                if c == '%' && i + 2 < chars.len() {
                    if let (Some(high), Some(low)) =
                        (chars[i + 1].to_digit(16), chars[i + 2].to_digit(16))
                    {
                        out.push(char::from_u32(high * 16 + low).unwrap_or('\u{FFFD}'));
                        i += 3;
                        continue;
                    }
                }
                out.push(c);
                i += 1;
            }
            out
        }
    }
}

/// Replaces decimal HTML entities (`&#NNN;`) with their code points.
/// Out-of-range references stay literal.
pub(crate) fn interpret_numeric_entities(value: &str) -> String {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    let entity = ENTITY.get_or_init(|| Regex::new(r"&#(\d+);").expect("entity pattern compiles"));
    entity
        .replace_all(value, |caps: &regex::Captures<'_>| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_becomes_space_in_both_charsets() {
        assert_eq!(decode_scalar("a+b", Charset::Utf8), "a b");
        assert_eq!(decode_scalar("a+b", Charset::Latin1), "a b");
    }

    #[test]
    fn utf8_multibyte_sequences() {
        assert_eq!(decode_scalar("%C3%B8", Charset::Utf8), "\u{f8}");
        assert_eq!(decode_scalar("%E2%9C%93", Charset::Utf8), "\u{2713}");
        assert_eq!(decode_scalar("%F0%9F%98%80", Charset::Utf8), "\u{1f600}");
    }

    #[test]
    fn utf8_invalid_sequences_become_replacement() {
        assert_eq!(decode_scalar("%C3", Charset::Utf8), "\u{fffd}");
        assert_eq!(decode_scalar("%FF%FE", Charset::Utf8), "\u{fffd}\u{fffd}");
    }

    #[test]
    fn malformed_escapes_stay_literal() {
        assert_eq!(decode_scalar("100%", Charset::Utf8), "100%");
        assert_eq!(decode_scalar("%zz", Charset::Latin1), "%zz");
    }

    #[test]
    fn latin1_is_single_byte() {
        assert_eq!(decode_scalar("%E4", Charset::Latin1), "\u{e4}");
        // the UTF-8 bytes of o-slash read as two Latin-1 code points
        assert_eq!(decode_scalar("%C3%B8", Charset::Latin1), "\u{c3}\u{b8}");
    }

    #[test]
    fn numeric_entities() {
        assert_eq!(interpret_numeric_entities("&#10003;"), "\u{2713}");
        assert_eq!(interpret_numeric_entities("a&#228;b"), "a\u{e4}b");
        assert_eq!(interpret_numeric_entities("&#99999999999;"), "&#99999999999;");
        assert_eq!(interpret_numeric_entities("no entities"), "no entities");
    }
}
