//! First decoding stage: splitting the raw input into (key, value)
//! pairs, and splitting raw keys into bracket path segments.

use std::borrow::Cow;
use std::sync::OnceLock;

use indexmap::map::Entry;
use regex::Regex;

use crate::error::{Error, Result};
use crate::options::{Charset, DecodeKind, DecodeOptions, Duplicates, Sentinel};
use crate::utils;
use crate::value::{Map, Value};

/// Tokenizes a querystring into an ordered map of decoded keys to
/// decoded leaf values, applying the duplicate policy as pairs land.
pub(crate) fn parse_query_string_values(input: &str, options: &DecodeOptions) -> Result<Map> {
    let cleaned = if options.ignore_query_prefix {
        input.strip_prefix('?').unwrap_or(input)
    } else {
        input
    };
    // Escaped brackets take part in key splitting like literal ones.
    let cleaned = cleaned
        .replace("%5B", "[")
        .replace("%5b", "[")
        .replace("%5D", "]")
        .replace("%5d", "]");

    if options.parameter_limit == 0 {
        return Err(Error::InvalidParameterLimit);
    }
    let limit = options.parameter_limit;

    let mut parts = options.delimiter.split(&cleaned);
    let keep = if options.raise_on_limit_exceeded {
        limit.saturating_add(1)
    } else {
        limit
    };
    if parts.len() > keep {
        parts.truncate(keep);
    }
    if options.raise_on_limit_exceeded && parts.len() > limit {
        return Err(Error::ParameterLimitExceeded(limit));
    }

    let mut charset = options.charset;
    let mut skip_index = None;
    if options.charset_sentinel {
        for (i, part) in parts.iter().enumerate() {
            if part.starts_with("utf8=") {
                if *part == Sentinel::Charset.encoded() {
                    charset = Charset::Utf8;
                } else if *part == Sentinel::Iso.encoded() {
                    charset = Charset::Latin1;
                }
                skip_index = Some(i);
                break;
            }
        }
    }

    let mut obj = Map::new();
    for (i, part) in parts.iter().enumerate() {
        if Some(i) == skip_index {
            continue;
        }

        // Split on the first '=' after any ']=' so bracketed keys that
        // contain '=' stay whole.
        let pos = match part.find("]=") {
            Some(bracket_equals) => Some(bracket_equals + 1),
            None => part.find('='),
        };

        let (key, mut val) = match pos {
            None => {
                let Some(key) = decode_key(part, charset, options) else {
                    continue;
                };
                let val = if options.strict_null_handling {
                    Value::Null
                } else {
                    Value::String(String::new())
                };
                (key, val)
            }
            Some(pos) => {
                let Some(key) = decode_key(&part[..pos], charset, options) else {
                    continue;
                };
                let current_list_length = obj.get(&key).and_then(Value::as_seq).map_or(0, Vec::len);
                let raw = super::parse_array_value(
                    Value::String(part[pos + 1..].to_owned()),
                    options,
                    current_list_length,
                )?;
                let val = utils::apply(raw, |token| match token {
                    Value::String(s) => options
                        .decode_token(&s, charset, DecodeKind::Value)
                        .unwrap_or(Value::Null),
                    other => other,
                });
                (key, val)
            }
        };

        if options.interpret_numeric_entities && charset == Charset::Latin1 {
            val = match val {
                Value::String(s) if !s.is_empty() => {
                    Value::String(super::decode::interpret_numeric_entities(&s))
                }
                Value::Seq(items) if !items.is_empty() => {
                    let joined = items
                        .iter()
                        .map(crate::ser::encode::scalar_text)
                        .collect::<Vec<_>>()
                        .join(",");
                    Value::String(super::decode::interpret_numeric_entities(&joined))
                }
                other => other,
            };
        }

        if part.contains("[]=") && val.is_seq() {
            val = Value::Seq(vec![val]);
        }

        match obj.entry(key) {
            Entry::Occupied(mut entry) => match options.duplicates {
                Duplicates::Combine => {
                    let existing = std::mem::take(entry.get_mut());
                    *entry.get_mut() = utils::combine(existing, val);
                }
                Duplicates::First => {}
                Duplicates::Last => {
                    *entry.get_mut() = val;
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(val);
            }
        }
    }

    Ok(obj)
}

/// Decode a key token and coerce the result to path text. A decoder
/// returning `None` drops the pair; non-string scalars are coerced
/// through the standard text rendering.
fn decode_key(token: &str, charset: Charset, options: &DecodeOptions) -> Option<String> {
    let decoded = options.decode_token(token, charset, DecodeKind::Key)?;
    Some(match decoded {
        Value::String(s) => s,
        other => crate::ser::encode::scalar_text(&other),
    })
}

static DOT_TO_BRACKET: OnceLock<Regex> = OnceLock::new();

fn dot_to_bracket(key: &str) -> Cow<'_, str> {
    let pattern =
        DOT_TO_BRACKET.get_or_init(|| Regex::new(r"\.([^.\[]+)").expect("dot pattern compiles"));
    pattern.replace_all(key, "[$1]")
}

/// Splits `a.b[c][d]` into `["a", "[b]", "[c]", "[d]"]` with balanced
/// bracket groups.
///
/// With `max_depth == 0` the key is never split and `strict_depth`
/// never fires. Beyond `max_depth`, well-formed remaining groups
/// either fail (`strict_depth`) or collapse into one literal trailing
/// segment; an unterminated group always collapses.
pub(crate) fn split_key_into_segments(
    original_key: &str,
    allow_dots: bool,
    max_depth: usize,
    strict_depth: bool,
) -> Result<Vec<String>> {
    let key: Cow<'_, str> = if allow_dots {
        dot_to_bracket(original_key)
    } else {
        Cow::Borrowed(original_key)
    };

    if max_depth == 0 {
        return Ok(vec![key.into_owned()]);
    }

    let mut segments = Vec::new();

    let first = key.find('[');
    let parent = match first {
        Some(i) => &key[..i],
        None => &key[..],
    };
    if !parent.is_empty() {
        segments.push(parent.to_owned());
    }

    let mut open_idx = first;
    let mut depth = 0;
    let mut unterminated = false;
    while let Some(open) = open_idx {
        if depth >= max_depth {
            break;
        }
        match find_balanced_close(&key, open) {
            Some(close) => {
                segments.push(key[open..=close].to_owned());
                depth += 1;
                open_idx = key[close + 1..].find('[').map(|p| p + close + 1);
            }
            None => {
                unterminated = true;
                break;
            }
        }
    }

    if let Some(open) = open_idx {
        if !unterminated && strict_depth && find_balanced_close(&key, open).is_some() {
            return Err(Error::DepthExceeded(max_depth));
        }
        segments.push(format!("[{}]", &key[open..]));
    }

    Ok(segments)
}

/// Index of the `]` closing the group opened at `open`, balancing
/// nested brackets within the same group.
fn find_balanced_close(key: &str, open: usize) -> Option<usize> {
    let bytes = key.as_bytes();
    let mut level = 1usize;
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => level += 1,
            b']' => {
                level -= 1;
                if level == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(key: &str) -> Vec<String> {
        split_key_into_segments(key, false, 5, false).unwrap()
    }

    #[test]
    fn parent_only() {
        assert_eq!(split("foo"), ["foo"]);
    }

    #[test]
    fn parent_and_children() {
        assert_eq!(split("foo[bar][baz]"), ["foo", "[bar]", "[baz]"]);
        assert_eq!(split("a[0]"), ["a", "[0]"]);
        assert_eq!(split("a[]"), ["a", "[]"]);
    }

    #[test]
    fn nested_brackets_stay_in_one_segment() {
        assert_eq!(split("a[with[inner]]"), ["a", "[with[inner]]"]);
    }

    #[test]
    fn remainder_collapses_into_trailing_segment() {
        let segments = split_key_into_segments("a[b][c][d][e][f][g][h][i]", false, 5, false).unwrap();
        assert_eq!(
            segments,
            ["a", "[b]", "[c]", "[d]", "[e]", "[f]", "[[g][h][i]]"]
        );
    }

    #[test]
    fn strict_depth_rejects_well_formed_overflow() {
        let err = split_key_into_segments("a[b][c]", false, 1, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Input depth exceeded depth option of 1 and strict_depth is true"
        );
    }

    #[test]
    fn strict_depth_ignores_unterminated_tail() {
        let segments = split_key_into_segments("a[b][c", false, 1, true).unwrap();
        assert_eq!(segments, ["a", "[b]", "[[c]"]);

        let segments = split_key_into_segments("a[b", false, 5, true).unwrap();
        assert_eq!(segments, ["a", "[[b]"]);
    }

    #[test]
    fn depth_zero_never_splits() {
        let segments = split_key_into_segments("a[b][c]", false, 0, true).unwrap();
        assert_eq!(segments, ["a[b][c]"]);
    }

    #[test]
    fn dots_become_brackets_when_allowed() {
        let segments = split_key_into_segments("a.b.c", true, 5, false).unwrap();
        assert_eq!(segments, ["a", "[b]", "[c]"]);

        let segments = split_key_into_segments("a.b[c]", true, 5, false).unwrap();
        assert_eq!(segments, ["a", "[b]", "[c]"]);
    }

    #[test]
    fn dots_are_literal_by_default() {
        assert_eq!(split("a.b"), ["a.b"]);
    }
}
