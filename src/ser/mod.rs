//! Serialization support for querystrings.
//!
//! ## Design Overview
//!
//! The encoder walks the value tree depth-first, carrying the key
//! prefix built so far (`user`, then `user[name]`, …). Keys are walked
//! in insertion order, reordered by the `sort` comparator at each
//! level before descent. Leaves emit `key=value` fragments which the
//! top-level driver joins with the pair delimiter.
//!
//! Percent-encoding of the full prefix happens once, at leaf
//! emission, so bracket characters in nested prefixes are encoded
//! exactly as the reference qs implementation does. A call-local
//! `SideChannel` tracks the containers on the active path by identity
//! and fails on re-entry.

pub(crate) mod encode;
mod side_channel;

use chrono::{DateTime, FixedOffset};

use crate::error::Result;
use crate::options::{Charset, EncodeOptions, Filter, FilterKey, ListFormat, Sentinel};
use crate::utils;
use crate::value::{Map, Value};

use encode::{encode_scalar, scalar_text};
use side_channel::SideChannel;

static UNDEFINED: Value = Value::Undefined;

/// Serializes a value into a querystring.
pub(crate) fn encode_to_string(value: &Value, options: &EncodeOptions) -> Result<String> {
    options.validate()?;

    let root: Map = match value {
        Value::Map(map) => map.clone(),
        Value::Seq(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        _ => Map::new(),
    };
    if root.is_empty() {
        return Ok(String::new());
    }

    let mut root = Value::Map(root);
    let mut selected: Option<&[FilterKey]> = None;
    match &options.filter {
        Some(Filter::Function(filter)) => {
            root = filter("", &root);
        }
        Some(Filter::Keys(keys)) => selected = Some(keys),
        None => {}
    }

    let list_format = options.effective_list_format();
    let encoder = Encoder {
        options,
        list_format,
        comma_round_trip: list_format == ListFormat::Comma && options.comma_round_trip,
    };

    let mut top_keys: Vec<String> = match selected {
        // non-string filter entries are skipped at the top level
        Some(keys) => keys
            .iter()
            .filter_map(|key| match key {
                FilterKey::Key(name) => Some(name.clone()),
                FilterKey::Index(_) => None,
            })
            .collect(),
        None => match &root {
            Value::Map(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        },
    };
    if let Some(sort) = &options.sort {
        top_keys.sort_by(|a, b| sort(a.as_str(), b.as_str()));
    }

    let mut channel = SideChannel::new();
    let mut pairs: Vec<String> = Vec::new();
    for key in &top_keys {
        let child = root.get(key);
        if options.skip_nulls && child.is_some_and(Value::is_null) {
            continue;
        }
        encoder.encode_value(child.unwrap_or(&UNDEFINED), key, false, &mut channel, &mut pairs)?;
    }

    let joined = pairs.join(&options.delimiter);
    if joined.is_empty() {
        return Ok(String::new());
    }

    let mut output = String::new();
    if options.add_query_prefix {
        output.push('?');
    }
    if options.charset_sentinel {
        let sentinel = match options.charset {
            Charset::Utf8 => Sentinel::Charset,
            Charset::Latin1 => Sentinel::Iso,
        };
        output.push_str(sentinel.encoded());
        output.push('&');
    }
    output.push_str(&joined);
    Ok(output)
}

/// One unit of child traversal under a container.
enum Work {
    Key(String),
    Index(usize),
    /// A comma-joined sequence collapsed to a single leaf.
    Joined(Value),
}

struct Encoder<'a> {
    options: &'a EncodeOptions,
    list_format: ListFormat,
    comma_round_trip: bool,
}

impl Encoder<'_> {
    fn encoder_active(&self, disabled: bool) -> bool {
        self.options.encode && !disabled
    }

    fn apply_encoder(&self, value: &Value) -> String {
        match &self.options.encoder {
            Some(custom) => custom(value, self.options.charset, self.options.format),
            None => encode_scalar(value, self.options.charset, self.options.format),
        }
    }

    fn serialize_date(&self, dt: &DateTime<FixedOffset>) -> Value {
        match &self.options.serialize_date {
            Some(serialize) => serialize(dt).map(Value::String).unwrap_or(Value::Null),
            None => Value::String(dt.to_rfc3339()),
        }
    }

    fn encode_value(
        &self,
        value: &Value,
        prefix: &str,
        encoder_disabled: bool,
        channel: &mut SideChannel,
        out: &mut Vec<String>,
    ) -> Result<()> {
        let options = self.options;
        let is_undefined = value.is_undefined();

        // Per-node rewrites: filter replacement, then timestamp
        // serialization (for comma lists, element-wise).
        let rewritten;
        let mut obj: &Value = value;
        if let Some(Filter::Function(filter)) = &options.filter {
            rewritten = filter(prefix, obj);
            obj = &rewritten;
        } else if let Value::DateTime(dt) = obj {
            rewritten = self.serialize_date(dt);
            obj = &rewritten;
        } else if self.list_format == ListFormat::Comma {
            if let Value::Seq(items) = obj {
                if items.iter().any(|item| matches!(item, Value::DateTime(_))) {
                    rewritten = Value::Seq(
                        items
                            .iter()
                            .map(|item| match item {
                                Value::DateTime(dt) => self.serialize_date(dt),
                                other => other.clone(),
                            })
                            .collect(),
                    );
                    obj = &rewritten;
                }
            }
        }

        let empty;
        if !is_undefined && obj.is_null() {
            if options.strict_null_handling {
                let rendered = if self.encoder_active(encoder_disabled) && !options.encode_values_only
                {
                    options
                        .format
                        .apply(self.apply_encoder(&Value::String(prefix.to_owned())))
                } else {
                    prefix.to_owned()
                };
                out.push(rendered);
                return Ok(());
            }
            empty = Value::String(String::new());
            obj = &empty;
        }

        if utils::is_non_nullish_primitive(obj, options.skip_nulls) {
            let pair = if self.encoder_active(encoder_disabled) {
                let key_text = if options.encode_values_only {
                    prefix.to_owned()
                } else {
                    self.apply_encoder(&Value::String(prefix.to_owned()))
                };
                format!(
                    "{}={}",
                    options.format.apply(key_text),
                    options.format.apply(self.apply_encoder(obj))
                )
            } else {
                format!(
                    "{}={}",
                    options.format.apply(prefix.to_owned()),
                    options.format.apply(scalar_text(obj))
                )
            };
            out.push(pair);
            return Ok(());
        }

        if is_undefined {
            return Ok(());
        }

        let comma_seq = self.list_format == ListFormat::Comma && obj.is_seq();
        let child_encoder_disabled =
            encoder_disabled || (comma_seq && options.encode_values_only);

        let mut work: Vec<Work> = Vec::new();
        match obj {
            Value::Seq(items) if comma_seq => {
                if items.iter().any(|item| item.is_seq() || item.is_map()) {
                    // non-scalar elements cannot be comma-joined;
                    // serialize them one by one under the same prefix
                    work.extend((0..items.len()).map(Work::Index));
                } else if items.is_empty() {
                    work.push(Work::Joined(Value::Undefined));
                } else {
                    let pre_encode =
                        self.encoder_active(encoder_disabled) && options.encode_values_only;
                    let mut parts: Vec<String> = Vec::with_capacity(items.len());
                    for item in items {
                        if item.is_null() {
                            if !options.comma_compact_nulls {
                                parts.push(String::new());
                            }
                            continue;
                        }
                        parts.push(if pre_encode {
                            self.apply_encoder(item)
                        } else {
                            scalar_text(item)
                        });
                    }
                    let joined = parts.join(",");
                    work.push(Work::Joined(if joined.is_empty() {
                        Value::Null
                    } else {
                        Value::String(joined)
                    }));
                }
            }
            _ => {
                if let Some(Filter::Keys(keys)) = &options.filter {
                    work.extend(keys.iter().map(|key| match key {
                        FilterKey::Key(name) => Work::Key(name.clone()),
                        FilterKey::Index(index) => Work::Index(*index),
                    }));
                } else {
                    match obj {
                        Value::Map(map) => {
                            let mut keys: Vec<String> = map.keys().cloned().collect();
                            if let Some(sort) = &options.sort {
                                keys.sort_by(|a, b| sort(a.as_str(), b.as_str()));
                            }
                            work.extend(keys.into_iter().map(Work::Key));
                        }
                        Value::Seq(items) => work.extend((0..items.len()).map(Work::Index)),
                        _ => {}
                    }
                }
            }
        }

        let encoded_prefix = if options.encode_dot_in_keys {
            prefix.replace('.', "%2E")
        } else {
            prefix.to_owned()
        };
        let is_seq = obj.is_seq();
        let seq_len = obj.as_seq().map_or(0, Vec::len);
        let adjusted_prefix = if self.comma_round_trip && is_seq && seq_len == 1 {
            format!("{encoded_prefix}[]")
        } else {
            encoded_prefix
        };

        if options.allow_empty_lists && is_seq && seq_len == 0 {
            out.push(format!("{adjusted_prefix}[]"));
            return Ok(());
        }

        channel.enter(value)?;
        for item in work {
            let stored;
            let (child, key_text): (&Value, Option<String>) = match item {
                Work::Joined(joined) => {
                    stored = joined;
                    (&stored, None)
                }
                Work::Key(name) => {
                    let child = obj.get(&name).unwrap_or(&UNDEFINED);
                    (child, Some(name))
                }
                Work::Index(index) => {
                    let child = obj
                        .as_seq()
                        .and_then(|items| items.get(index))
                        .unwrap_or(&UNDEFINED);
                    (child, Some(index.to_string()))
                }
            };

            if options.skip_nulls && child.is_null() {
                continue;
            }

            let key_prefix = match &key_text {
                // comma children collapse onto the parent prefix
                None => adjusted_prefix.clone(),
                Some(key) => {
                    let encoded_key = if options.dots_enabled() && options.encode_dot_in_keys {
                        key.replace('.', "%2E")
                    } else {
                        key.clone()
                    };
                    if is_seq {
                        self.list_format
                            .child_prefix(&adjusted_prefix, Some(&encoded_key))
                    } else if options.dots_enabled() {
                        format!("{adjusted_prefix}.{encoded_key}")
                    } else {
                        format!("{adjusted_prefix}[{encoded_key}]")
                    }
                }
            };

            self.encode_value(child, &key_prefix, child_encoder_disabled, channel, out)?;
        }
        channel.exit();

        Ok(())
    }
}
