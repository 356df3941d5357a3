//! Decoding support for querystrings.
//!
//! ## Design Overview
//!
//! Decoding runs in two passes to handle arbitrary parameter ordering:
//!
//! 1. **Tokenize**: the raw string is split on the pair delimiter and
//!    each pair is percent-decoded into the ordered `(key, value)`
//!    map, with duplicates reconciled as they land (`parse` module).
//!
//! 2. **Build**: each key is split into bracket path segments, turned
//!    into a one-path partial tree from the leaf value upward, and
//!    merged into the accumulator. A final compaction removes the
//!    `Undefined` holes left by sparse list indices.
//!
//! Given `user[name]=John&user[ids][0]=1&user[ids][1]=2`, the result
//! is:
//!
//! ```text
//! Map {
//!   "user" => Map {
//!     "name" => String("John"),
//!     "ids" => Seq [String("1"), String("2")]
//!   }
//! }
//! ```

pub(crate) mod decode;
pub(crate) mod parse;

use crate::error::{Error, Result};
use crate::options::DecodeOptions;
use crate::utils;
use crate::value::{Map, Value};

/// Decodes a querystring into an ordered [`Map`].
///
/// ```
/// use qs_value::{decode, DecodeOptions, Value};
///
/// let parsed = decode("foo[bar][baz]=foobarbaz", &DecodeOptions::default()).unwrap();
/// assert_eq!(
///     parsed["foo"].get("bar").and_then(|bar| bar.get("baz")).and_then(Value::as_str),
///     Some("foobarbaz"),
/// );
/// ```
pub fn decode(input: &str, options: &DecodeOptions) -> Result<Map> {
    options.validate()?;
    if input.is_empty() {
        return Ok(Map::new());
    }
    let pairs = parse::parse_query_string_values(input, options)?;
    build(pairs, options, true)
}

/// Decodes an already-tokenized map of pairs, interpreting its keys
/// as bracket paths the same way [`decode`] does.
pub fn decode_map(input: Map, options: &DecodeOptions) -> Result<Map> {
    options.validate()?;
    build(input, options, false)
}

fn build(pairs: Map, options: &DecodeOptions, values_parsed: bool) -> Result<Map> {
    // An oversized top level disables list parsing for the whole call,
    // via a call-local copy; the caller's record is never touched.
    let demoted;
    let options = if options.parse_lists
        && options.list_limit > 0
        && pairs.len() > options.list_limit as usize
    {
        demoted = DecodeOptions {
            parse_lists: false,
            ..options.clone()
        };
        &demoted
    } else {
        options
    };

    let mut acc = Value::Map(Map::new());
    for (key, val) in pairs {
        let Some(tree) = parse_keys(&key, val, options, values_parsed)? else {
            continue;
        };
        if acc.as_map().is_some_and(Map::is_empty) && tree.is_map() {
            acc = tree;
            continue;
        }
        acc = utils::merge(acc, tree, options);
    }

    // The accumulator keeps a mapping shape through every merge.
    let mut map = match acc {
        Value::Map(map) => map,
        _ => Map::new(),
    };
    utils::compact(&mut map);
    Ok(map)
}

fn parse_keys(
    given_key: &str,
    val: Value,
    options: &DecodeOptions,
    values_parsed: bool,
) -> Result<Option<Value>> {
    if given_key.is_empty() {
        return Ok(None);
    }
    let segments = parse::split_key_into_segments(
        given_key,
        options.dots_enabled(),
        options.depth,
        options.strict_depth,
    )?;
    parse_object(&segments, val, options, values_parsed).map(Some)
}

/// Builds the one-path partial tree for a segment chain, walking the
/// segments right to left and wrapping the leaf at each step.
fn parse_object(
    chain: &[String],
    val: Value,
    options: &DecodeOptions,
    values_parsed: bool,
) -> Result<Value> {
    let mut current_list_length = 0;
    if chain.last().is_some_and(|segment| segment == "[]") {
        let joined: String = chain[..chain.len() - 1].concat();
        if let (Ok(parent_index), Value::Seq(items)) = (joined.parse::<usize>(), &val) {
            if let Some(element) = items.get(parent_index) {
                current_list_length = match element {
                    Value::Seq(inner) => inner.len(),
                    Value::String(s) => s.chars().count(),
                    _ => 0,
                };
            }
        }
    }

    let mut leaf = if values_parsed {
        val
    } else {
        parse_array_value(val, options, current_list_length)?
    };

    for root in chain.iter().rev() {
        let obj: Value;

        if root == "[]" && options.parse_lists {
            let empty_leaf = matches!(&leaf, Value::String(s) if s.is_empty())
                || (options.strict_null_handling && leaf.is_null());
            if options.allow_empty_lists && empty_leaf {
                obj = Value::Seq(Vec::new());
            } else {
                obj = Value::Seq(match leaf {
                    Value::Seq(items) => items,
                    other => vec![other],
                });
            }
        } else {
            let clean_root = root
                .strip_prefix('[')
                .and_then(|inner| inner.strip_suffix(']'))
                .unwrap_or(root);
            let decoded_root = if options.decode_dot_in_keys {
                clean_root.replace("%2E", ".").replace("%2e", ".")
            } else {
                clean_root.to_owned()
            };

            let index: Option<i64> = decoded_root.parse().ok();

            if !options.parse_lists && decoded_root.is_empty() {
                let mut map = Map::new();
                map.insert("0".to_owned(), leaf);
                obj = Value::Map(map);
            } else if let Some(ix) = index.filter(|&ix| {
                ix >= 0
                    && root.as_str() != decoded_root
                    && ix.to_string() == decoded_root
                    && options.parse_lists
                    && options.list_limit >= 0
                    && ix <= options.list_limit as i64
            }) {
                let mut items = vec![Value::Undefined; ix as usize + 1];
                items[ix as usize] = leaf;
                obj = Value::Seq(items);
            } else {
                let key = match index {
                    Some(ix) => ix.to_string(),
                    None => decoded_root,
                };
                let mut map = Map::new();
                map.insert(key, leaf);
                obj = Value::Map(map);
            }
        }

        leaf = obj;
    }

    Ok(leaf)
}

/// Splits comma values into lists and enforces the list limit when
/// `raise_on_limit_exceeded` is set.
pub(crate) fn parse_array_value(
    value: Value,
    options: &DecodeOptions,
    current_list_length: usize,
) -> Result<Value> {
    if let Value::String(s) = &value {
        if !s.is_empty() && options.comma && s.contains(',') {
            let split: Vec<Value> = s
                .split(',')
                .map(|part| Value::String(part.to_owned()))
                .collect();
            if options.raise_on_limit_exceeded && split.len() as isize > options.list_limit {
                return Err(Error::ListLimitExceeded(options.list_limit));
            }
            return Ok(Value::Seq(split));
        }
    }

    if options.raise_on_limit_exceeded && current_list_length as isize >= options.list_limit {
        return Err(Error::ListLimitExceeded(options.list_limit));
    }

    Ok(value)
}
