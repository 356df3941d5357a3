//! Option records for [`decode`](crate::decode) and
//! [`encode`](crate::encode), plus the small enums they are built
//! from.
//!
//! Both records expose public fields and are constructed with struct
//! update syntax:
//!
//! ```
//! use qs_value::DecodeOptions;
//!
//! let options = DecodeOptions {
//!     depth: 10,
//!     ..Default::default()
//! };
//! # let _ = options;
//! ```
//!
//! Records are immutable by convention once built and are cheap to
//! clone; callbacks are reference-counted so a record can be shared
//! across threads.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::error::{Error, Result};
use crate::value::Value;

/// The character encoding applied to tokens on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Latin1,
}

/// Whether a token being decoded is a key (or key segment) or a
/// value. The built-in decoder treats both the same; user-supplied
/// decoders may branch on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeKind {
    Key,
    Value,
}

/// How repeated keys are reconciled during decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Duplicates {
    /// Collect every value for the key into a list, in order.
    #[default]
    Combine,
    /// Keep the first value and discard the rest.
    First,
    /// Keep the last value, overwriting prior ones.
    Last,
}

/// Percent-encoding profile: RFC 3986 leaves spaces as `%20`,
/// RFC 1738 rewrites them to `+` and additionally treats `(` and `)`
/// as safe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Rfc3986,
    Rfc1738,
}

impl Format {
    /// Post-encode space policy.
    pub(crate) fn apply(self, encoded: String) -> String {
        match self {
            Format::Rfc3986 => encoded,
            Format::Rfc1738 => encoded.replace("%20", "+"),
        }
    }
}

/// Encoder strategy for serializing sequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ListFormat {
    /// `foo[0]=123&foo[1]=456`
    #[default]
    Indices,
    /// `foo[]=123&foo[]=456`
    Brackets,
    /// `foo=123&foo=456`
    Repeat,
    /// `foo=123,456`
    Comma,
}

impl ListFormat {
    /// Build the child prefix for one sequence element.
    pub(crate) fn child_prefix(self, prefix: &str, key: Option<&str>) -> String {
        match self {
            ListFormat::Indices => format!("{prefix}[{}]", key.unwrap_or_default()),
            ListFormat::Brackets => format!("{prefix}[]"),
            ListFormat::Repeat | ListFormat::Comma => prefix.to_owned(),
        }
    }
}

/// The `utf8=…` sentinel pair browsers attach to announce the form
/// charset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sentinel {
    /// Percent-encoded UTF-8 check mark: `utf8=%E2%9C%93`.
    Charset,
    /// HTML-entity check mark as sent by non-UTF-8 forms:
    /// `utf8=%26%2310003%3B`.
    Iso,
}

impl Sentinel {
    /// The full `key=value` fragment as it appears on the wire.
    pub const fn encoded(self) -> &'static str {
        match self {
            Sentinel::Charset => "utf8=%E2%9C%93",
            Sentinel::Iso => "utf8=%26%2310003%3B",
        }
    }

    /// The unencoded token the page starts with.
    pub const fn raw(self) -> &'static str {
        match self {
            Sentinel::Charset => "\u{2713}",
            Sentinel::Iso => "&#10003;",
        }
    }
}

/// Pair delimiter: a literal string or a compiled pattern.
#[derive(Clone, Debug)]
pub enum Delimiter {
    Literal(String),
    Pattern(Regex),
}

impl Delimiter {
    pub(crate) fn split<'a>(&self, input: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Literal(sep) => input.split(sep.as_str()).collect(),
            Delimiter::Pattern(re) => re.split(input).collect(),
        }
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Literal("&".to_owned())
    }
}

impl From<&str> for Delimiter {
    fn from(sep: &str) -> Self {
        Delimiter::Literal(sep.to_owned())
    }
}

impl From<char> for Delimiter {
    fn from(sep: char) -> Self {
        Delimiter::Literal(sep.to_string())
    }
}

impl From<Regex> for Delimiter {
    fn from(re: Regex) -> Self {
        Delimiter::Pattern(re)
    }
}

/// Scalar decoder override. Receives the raw token, the effective
/// charset and whether the token is a key or a value. Returning
/// `None` drops the pair (keys) or decodes to null (values).
pub type DecodeFn = Arc<dyn Fn(&str, Charset, DecodeKind) -> Option<Value> + Send + Sync>;

/// Kind-unaware decoder override, consulted only when no [`DecodeFn`]
/// is set.
pub type LegacyDecodeFn = Arc<dyn Fn(&str, Charset) -> Option<Value> + Send + Sync>;

/// Scalar encoder override.
pub type EncodeFn = Arc<dyn Fn(&Value, Charset, Format) -> String + Send + Sync>;

/// Timestamp serializer. Returning `None` is treated as a null value,
/// subject to the null-handling options.
pub type SerializeDateFn = Arc<dyn Fn(&DateTime<FixedOffset>) -> Option<String> + Send + Sync>;

/// Key comparator applied at every level before descending.
pub type SortFn = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

/// Filter callback: receives the key prefix and the value about to be
/// encoded, and returns the value to encode in its place.
pub type FilterFn = Arc<dyn Fn(&str, &Value) -> Value + Send + Sync>;

/// Restricts or rewrites what the encoder emits.
#[derive(Clone)]
pub enum Filter {
    /// Invoked for every node before descent; its return value is
    /// encoded instead.
    Function(FilterFn),
    /// Only the listed keys (for mappings) and indices (for
    /// sequences) are retained.
    Keys(Vec<FilterKey>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterKey {
    Key(String),
    Index(usize),
}

impl From<&str> for FilterKey {
    fn from(key: &str) -> Self {
        FilterKey::Key(key.to_owned())
    }
}

impl From<usize> for FilterKey {
    fn from(index: usize) -> Self {
        FilterKey::Index(index)
    }
}

/// Options that configure the output of [`decode`](crate::decode).
#[derive(Clone)]
pub struct DecodeOptions {
    /// Decode dot notation (`a.b=c`) as nesting. Unset mirrors
    /// `decode_dot_in_keys`.
    pub allow_dots: Option<bool>,

    /// Keep empty lists (`a[]` with an empty value) in the output.
    pub allow_empty_lists: bool,

    /// Default charset; overridden per call when `charset_sentinel`
    /// finds a `utf8=…` pair.
    pub charset: Charset,

    /// Scan for the `utf8=…` sentinel and switch charsets
    /// accordingly. The sentinel pair is removed from the output.
    pub charset_sentinel: bool,

    /// Split comma-separated values into lists.
    pub comma: bool,

    /// Normalize percent-encoded dots (`%2E`) in key segments to
    /// literal dots after path splitting. Implies `allow_dots`.
    pub decode_dot_in_keys: bool,

    /// Scalar decoder override; takes precedence over
    /// `legacy_decoder` and the built-in decoder.
    pub decoder: Option<DecodeFn>,

    /// Pair delimiter, `&` by default.
    pub delimiter: Delimiter,

    /// Maximum number of nested child segments interpreted per key.
    /// Deeper content collapses into one literal trailing segment, or
    /// fails under `strict_depth`.
    pub depth: usize,

    /// Duplicate key policy.
    pub duplicates: Duplicates,

    /// Strip a leading `?` before parsing.
    pub ignore_query_prefix: bool,

    /// Replace decimal HTML entities (`&#NNN;`) in Latin-1 values.
    pub interpret_numeric_entities: bool,

    /// Kind-unaware decoder override.
    pub legacy_decoder: Option<LegacyDecodeFn>,

    /// Highest list index accepted before an indexed segment is
    /// demoted to a string-keyed mapping.
    pub list_limit: isize,

    /// Maximum number of pairs parsed per call. Must be positive.
    pub parameter_limit: usize,

    /// Interpret `[]` and small integer indices as lists at all. When
    /// off, indices stay literal string keys.
    pub parse_lists: bool,

    /// Fail instead of truncating when `parameter_limit` or
    /// `list_limit` is exceeded.
    pub raise_on_limit_exceeded: bool,

    /// Fail when well-formed bracket groups extend beyond `depth`.
    pub strict_depth: bool,

    /// Decode a key with no `=` to null instead of an empty string.
    pub strict_null_handling: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            allow_dots: None,
            allow_empty_lists: false,
            charset: Charset::Utf8,
            charset_sentinel: false,
            comma: false,
            decode_dot_in_keys: false,
            decoder: None,
            delimiter: Delimiter::default(),
            depth: 5,
            duplicates: Duplicates::Combine,
            ignore_query_prefix: false,
            interpret_numeric_entities: false,
            legacy_decoder: None,
            list_limit: 20,
            parameter_limit: 1000,
            parse_lists: true,
            raise_on_limit_exceeded: false,
            strict_depth: false,
            strict_null_handling: false,
        }
    }
}

impl DecodeOptions {
    /// The resolved dot-notation flag: unset mirrors
    /// `decode_dot_in_keys`.
    pub fn dots_enabled(&self) -> bool {
        self.allow_dots.unwrap_or(self.decode_dot_in_keys)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.decode_dot_in_keys && self.allow_dots == Some(false) {
            return Err(Error::DecodeDotWithoutAllowDots);
        }
        Ok(())
    }

    /// Run a token through the configured decoder chain.
    pub(crate) fn decode_token(
        &self,
        token: &str,
        charset: Charset,
        kind: DecodeKind,
    ) -> Option<Value> {
        if let Some(decoder) = &self.decoder {
            return decoder(token, charset, kind);
        }
        if let Some(decoder) = &self.legacy_decoder {
            return decoder(token, charset);
        }
        Some(Value::String(crate::de::decode::decode_scalar(
            token, charset,
        )))
    }
}

impl fmt::Debug for DecodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeOptions")
            .field("allow_dots", &self.allow_dots)
            .field("allow_empty_lists", &self.allow_empty_lists)
            .field("charset", &self.charset)
            .field("charset_sentinel", &self.charset_sentinel)
            .field("comma", &self.comma)
            .field("decode_dot_in_keys", &self.decode_dot_in_keys)
            .field("delimiter", &self.delimiter)
            .field("depth", &self.depth)
            .field("duplicates", &self.duplicates)
            .field("ignore_query_prefix", &self.ignore_query_prefix)
            .field("interpret_numeric_entities", &self.interpret_numeric_entities)
            .field("list_limit", &self.list_limit)
            .field("parameter_limit", &self.parameter_limit)
            .field("parse_lists", &self.parse_lists)
            .field("raise_on_limit_exceeded", &self.raise_on_limit_exceeded)
            .field("strict_depth", &self.strict_depth)
            .field("strict_null_handling", &self.strict_null_handling)
            .finish_non_exhaustive()
    }
}

/// Options that configure the output of [`encode`](crate::encode).
#[derive(Clone)]
pub struct EncodeOptions {
    /// Prefix the output with `?`.
    pub add_query_prefix: bool,

    /// Join nested map keys with `.` instead of brackets. Unset
    /// mirrors `encode_dot_in_keys`.
    pub allow_dots: Option<bool>,

    /// Emit `a[]` for empty lists instead of omitting them.
    pub allow_empty_lists: bool,

    pub charset: Charset,

    /// Prepend the charset-appropriate `utf8=…` sentinel pair.
    pub charset_sentinel: bool,

    /// With [`ListFormat::Comma`], omit null elements from the joined
    /// value instead of rendering them as empty strings.
    pub comma_compact_nulls: bool,

    /// With [`ListFormat::Comma`], emit single-element lists as
    /// `prefix[]=val` so they decode back to a list.
    pub comma_round_trip: bool,

    /// Pair delimiter in the output.
    pub delimiter: String,

    /// Master switch; when off, keys and values are joined without
    /// percent-encoding.
    pub encode: bool,

    /// Percent-encode literal dots within key segments (`%2E`, which
    /// a percent-encoded key renders as `%252E`). Implies
    /// `allow_dots`.
    pub encode_dot_in_keys: bool,

    /// Apply the encoder to values only, leaving keys untouched.
    pub encode_values_only: bool,

    /// Scalar encoder override.
    pub encoder: Option<EncodeFn>,

    /// Restrict or rewrite the encoded output.
    pub filter: Option<Filter>,

    pub format: Format,

    /// Deprecated shorthand: `Some(false)` selects
    /// [`ListFormat::Repeat`], `Some(true)` selects
    /// [`ListFormat::Indices`]. Prefer `list_format`.
    pub indices: Option<bool>,

    pub list_format: ListFormat,

    /// Timestamp serializer; RFC 3339 by default.
    pub serialize_date: Option<SerializeDateFn>,

    /// Omit members whose value is null entirely.
    pub skip_nulls: bool,

    /// Key comparator applied at every level before descent.
    pub sort: Option<SortFn>,

    /// Emit null values as a bare key with no `=`.
    pub strict_null_handling: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            add_query_prefix: false,
            allow_dots: None,
            allow_empty_lists: false,
            charset: Charset::Utf8,
            charset_sentinel: false,
            comma_compact_nulls: false,
            comma_round_trip: false,
            delimiter: "&".to_owned(),
            encode: true,
            encode_dot_in_keys: false,
            encode_values_only: false,
            encoder: None,
            filter: None,
            format: Format::Rfc3986,
            indices: None,
            list_format: ListFormat::Indices,
            serialize_date: None,
            skip_nulls: false,
            sort: None,
            strict_null_handling: false,
        }
    }
}

impl EncodeOptions {
    /// The resolved dot-notation flag: unset mirrors
    /// `encode_dot_in_keys`.
    pub fn dots_enabled(&self) -> bool {
        self.allow_dots.unwrap_or(self.encode_dot_in_keys)
    }

    /// The list format after applying the deprecated `indices`
    /// shorthand.
    pub fn effective_list_format(&self) -> ListFormat {
        match self.indices {
            Some(true) => ListFormat::Indices,
            Some(false) => ListFormat::Repeat,
            None => self.list_format,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.encode_dot_in_keys && self.allow_dots == Some(false) {
            return Err(Error::EncodeDotWithoutAllowDots);
        }
        Ok(())
    }
}

impl fmt::Debug for EncodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeOptions")
            .field("add_query_prefix", &self.add_query_prefix)
            .field("allow_dots", &self.allow_dots)
            .field("allow_empty_lists", &self.allow_empty_lists)
            .field("charset", &self.charset)
            .field("charset_sentinel", &self.charset_sentinel)
            .field("comma_compact_nulls", &self.comma_compact_nulls)
            .field("comma_round_trip", &self.comma_round_trip)
            .field("delimiter", &self.delimiter)
            .field("encode", &self.encode)
            .field("encode_dot_in_keys", &self.encode_dot_in_keys)
            .field("encode_values_only", &self.encode_values_only)
            .field("format", &self.format)
            .field("indices", &self.indices)
            .field("list_format", &self.list_format)
            .field("skip_nulls", &self.skip_nulls)
            .field("strict_null_handling", &self.strict_null_handling)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_defaults() {
        let options = DecodeOptions::default();
        assert_eq!(options.depth, 5);
        assert_eq!(options.list_limit, 20);
        assert_eq!(options.parameter_limit, 1000);
        assert_eq!(options.duplicates, Duplicates::Combine);
        assert_eq!(options.charset, Charset::Utf8);
        assert!(options.parse_lists);
        assert!(!options.dots_enabled());
    }

    #[test]
    fn decode_dot_in_keys_implies_allow_dots() {
        let options = DecodeOptions {
            decode_dot_in_keys: true,
            ..Default::default()
        };
        assert!(options.dots_enabled());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn decode_dot_in_keys_rejects_explicit_allow_dots_false() {
        let options = DecodeOptions {
            allow_dots: Some(false),
            decode_dot_in_keys: true,
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert_eq!(err.to_string(), "decode_dot_in_keys requires allow_dots");
    }

    #[test]
    fn encode_dot_in_keys_rejects_explicit_allow_dots_false() {
        let options = EncodeOptions {
            allow_dots: Some(false),
            encode_dot_in_keys: true,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn indices_shorthand_maps_to_list_format() {
        let options = EncodeOptions {
            indices: Some(false),
            ..Default::default()
        };
        assert_eq!(options.effective_list_format(), ListFormat::Repeat);

        let options = EncodeOptions {
            indices: Some(true),
            list_format: ListFormat::Comma,
            ..Default::default()
        };
        assert_eq!(options.effective_list_format(), ListFormat::Indices);
    }

    #[test]
    fn list_format_child_prefixes() {
        assert_eq!(ListFormat::Indices.child_prefix("a", Some("0")), "a[0]");
        assert_eq!(ListFormat::Brackets.child_prefix("a", Some("0")), "a[]");
        assert_eq!(ListFormat::Repeat.child_prefix("a", Some("0")), "a");
        assert_eq!(ListFormat::Comma.child_prefix("a", None), "a");
    }

    #[test]
    fn sentinel_fragments() {
        assert_eq!(Sentinel::Charset.encoded(), "utf8=%E2%9C%93");
        assert_eq!(Sentinel::Iso.encoded(), "utf8=%26%2310003%3B");
        assert_eq!(Sentinel::Charset.raw(), "\u{2713}");
        assert_eq!(Sentinel::Iso.raw(), "&#10003;");
    }

    #[test]
    fn delimiter_split() {
        let comma = Delimiter::from(',');
        assert_eq!(comma.split("a=1,b=2"), ["a=1", "b=2"]);

        let pattern = Delimiter::from(Regex::new(r"[;,]").unwrap());
        assert_eq!(pattern.split("a=1;b=2,c=3"), ["a=1", "b=2", "c=3"]);
    }

    #[test]
    fn format_space_policy() {
        assert_eq!(Format::Rfc3986.apply("a%20b".to_owned()), "a%20b");
        assert_eq!(Format::Rfc1738.apply("a%20b".to_owned()), "a+b");
    }
}
