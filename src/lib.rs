//! Value-level support for querystring-style strings
//!
//! Querystrings are not formally defined and loosely take the form of
//! _nested_ urlencoded queries. This library aims for compatibility
//! with the syntax and semantics of
//! [qs](https://github.com/ljharb/qs): bracket notation for nesting
//! (`a[b][c]=d`), optional dot notation (`a.b=c`), sparse list
//! indices, duplicate-key policies, and the `utf8=✓` charset
//! sentinel.
//!
//! Unlike serde-based querystring crates, this library works on a
//! dynamic [`Value`] tree — an ordered mapping of strings to scalars,
//! sequences and nested mappings — which makes it a drop-in data
//! model for proxying, rewriting or inspecting query parameters
//! without a fixed schema.
//!
//! ## Usage
//!
//! ```
//! use qs_value::{decode, encode, DecodeOptions, EncodeOptions, Value};
//!
//! let parsed = decode(
//!     "user[name]=Alice&user[ids][0]=1&user[ids][1]=2",
//!     &DecodeOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(
//!     parsed["user"].get("name").and_then(Value::as_str),
//!     Some("Alice"),
//! );
//!
//! let round = encode(&Value::Map(parsed), &EncodeOptions::default()).unwrap();
//! assert_eq!(
//!     round,
//!     "user%5Bname%5D=Alice&user%5Bids%5D%5B0%5D=1&user%5Bids%5D%5B1%5D=2",
//! );
//! ```
//!
//! Behavior is tuned through [`DecodeOptions`] and [`EncodeOptions`],
//! constructed with struct update syntax:
//!
//! ```
//! use qs_value::{decode, DecodeOptions};
//!
//! let options = DecodeOptions {
//!     allow_dots: Some(true),
//!     ..Default::default()
//! };
//! let parsed = decode("a.b=c", &options).unwrap();
//! assert_eq!(parsed["a"].get("b").and_then(qs_value::Value::as_str), Some("c"));
//! ```

mod de;
mod error;
mod options;
mod ser;
mod utils;
mod value;

pub use error::{Error, Result};
pub use options::{
    Charset, DecodeFn, DecodeKind, DecodeOptions, Delimiter, Duplicates, EncodeFn, EncodeOptions,
    Filter, FilterFn, FilterKey, Format, LegacyDecodeFn, ListFormat, Sentinel, SerializeDateFn,
    SortFn,
};
pub use value::{Map, Number, Value};

/// Decodes a querystring into an ordered [`Map`].
///
/// ```
/// use qs_value::{decode, DecodeOptions, Value};
///
/// let parsed = decode("foo[bar][baz]=foobarbaz", &DecodeOptions::default()).unwrap();
/// assert_eq!(
///     parsed["foo"]
///         .get("bar")
///         .and_then(|bar| bar.get("baz"))
///         .and_then(Value::as_str),
///     Some("foobarbaz"),
/// );
/// ```
pub fn decode(input: &str, options: &DecodeOptions) -> Result<Map> {
    de::decode(input, options)
}

/// Decodes an already-tokenized map of pairs, interpreting its keys
/// as bracket paths the same way [`decode`] does.
///
/// ```
/// use qs_value::{decode_map, DecodeOptions, Map, Value};
///
/// let mut pairs = Map::new();
/// pairs.insert("a[b]".to_owned(), Value::from("c"));
/// let parsed = decode_map(pairs, &DecodeOptions::default()).unwrap();
/// assert_eq!(parsed["a"].get("b").and_then(Value::as_str), Some("c"));
/// ```
pub fn decode_map(input: Map, options: &DecodeOptions) -> Result<Map> {
    de::decode_map(input, options)
}

/// Encodes a value into a querystring.
///
/// The root should be a mapping (a sequence is viewed as a mapping
/// keyed by its indices); any other value produces an empty string.
///
/// ```
/// use qs_value::{encode, EncodeOptions, ListFormat, Value};
///
/// let value = Value::from(serde_json::json!({"a": ["b", "c"]}));
/// let options = EncodeOptions {
///     encode: false,
///     list_format: ListFormat::Brackets,
///     ..Default::default()
/// };
/// assert_eq!(encode(&value, &options).unwrap(), "a[]=b&a[]=c");
/// ```
pub fn encode(value: &Value, options: &EncodeOptions) -> Result<String> {
    ser::encode_to_string(value, options)
}
