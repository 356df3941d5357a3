//! Shared tree algebra used by both codec halves: merging partial
//! trees built from individual pairs, and compacting away the
//! `Undefined` holes sparse lists leave behind.

use indexmap::map::Entry;

use crate::options::DecodeOptions;
use crate::value::{Map, Value};

/// Merge `source` into `target`.
///
/// This mirrors how qs builds nested structures while parsing: each
/// pair decodes to a one-path partial tree which is folded into the
/// accumulator. Type conflicts coerce deterministically — lists absorb
/// positional writes, a list gaining a non-integer child becomes a
/// mapping, and colliding scalars pair up into a two-element list.
pub(crate) fn merge(target: Value, source: Value, options: &DecodeOptions) -> Value {
    if source.is_null() {
        return target;
    }
    if target.is_undefined() {
        return source;
    }

    match source {
        Value::Map(source) => merge_map_source(target, source, options),
        source => merge_plain_source(target, source, options),
    }
}

fn merge_plain_source(target: Value, source: Value, options: &DecodeOptions) -> Value {
    match target {
        Value::Seq(slots) if slots.iter().any(Value::is_undefined) => {
            // Positional overwrite into a hole-bearing list.
            let mut slots = slots;
            match source {
                Value::Seq(incoming) => {
                    for (i, item) in incoming.into_iter().enumerate() {
                        if item.is_undefined() {
                            continue;
                        }
                        if i >= slots.len() {
                            slots.resize(i + 1, Value::Undefined);
                        }
                        slots[i] = item;
                    }
                }
                other => slots.push(other),
            }
            if !options.parse_lists && slots.iter().any(Value::is_undefined) {
                // List parsing is off: collapse to string indices so
                // positions stay addressable.
                let map: Map = slots
                    .into_iter()
                    .enumerate()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(i, v)| (i.to_string(), v))
                    .collect();
                Value::Map(map)
            } else {
                Value::Seq(slots.into_iter().filter(|v| !v.is_undefined()).collect())
            }
        }
        Value::Seq(mut items) => match source {
            Value::Seq(incoming) => {
                let mergeable =
                    |values: &[Value]| values.iter().all(|v| v.is_map() || v.is_undefined());
                if mergeable(&items) && mergeable(&incoming) {
                    // Element-wise merge by index; the shorter side's
                    // missing slots keep the other side's elements.
                    let mut merged = Vec::with_capacity(items.len().max(incoming.len()));
                    let mut existing = items.into_iter();
                    let mut incoming = incoming.into_iter();
                    loop {
                        match (existing.next(), incoming.next()) {
                            (Some(t), Some(s)) => merged.push(merge(t, s, options)),
                            (Some(t), None) => merged.push(t),
                            (None, Some(s)) => merged.push(s),
                            (None, None) => break,
                        }
                    }
                    Value::Seq(merged)
                } else {
                    items.extend(incoming.into_iter().filter(|v| !v.is_undefined()));
                    Value::Seq(items)
                }
            }
            other => {
                items.push(other);
                Value::Seq(items)
            }
        },
        Value::Map(mut map) => {
            if let Value::Seq(incoming) = source {
                for (i, item) in incoming.into_iter().enumerate() {
                    if !item.is_undefined() {
                        map.insert(i.to_string(), item);
                    }
                }
            }
            // A bare scalar cannot extend a mapping; keep the target.
            Value::Map(map)
        }
        scalar => match source {
            Value::Seq(incoming) => {
                let mut items = vec![scalar];
                items.extend(incoming.into_iter().filter(|v| !v.is_undefined()));
                Value::Seq(items)
            }
            other => Value::Seq(vec![scalar, other]),
        },
    }
}

fn merge_map_source(target: Value, source: Map, options: &DecodeOptions) -> Value {
    match target {
        Value::Map(mut map) => {
            for (key, value) in source {
                match map.entry(key) {
                    Entry::Occupied(mut entry) => {
                        let existing = std::mem::take(entry.get_mut());
                        *entry.get_mut() = merge(existing, value, options);
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(value);
                    }
                }
            }
            Value::Map(map)
        }
        Value::Seq(items) => {
            // Integer keys within the list limit assign into the
            // sequence; anything else demotes it to a mapping keyed by
            // its stringified indices.
            let sparse_assignable = source.keys().all(|k| {
                k.parse::<usize>()
                    .is_ok_and(|i| options.list_limit >= 0 && i <= options.list_limit as usize)
            });
            if sparse_assignable {
                let mut slots = items;
                for (key, value) in source {
                    let Ok(index) = key.parse::<usize>() else {
                        continue;
                    };
                    if index >= slots.len() {
                        slots.resize(index + 1, Value::Undefined);
                    }
                    let existing = std::mem::replace(&mut slots[index], Value::Undefined);
                    slots[index] = if existing.is_undefined() {
                        value
                    } else {
                        merge(existing, value, options)
                    };
                }
                Value::Seq(slots)
            } else {
                let mut map: Map = items
                    .into_iter()
                    .enumerate()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(i, v)| (i.to_string(), v))
                    .collect();
                for (key, value) in source {
                    match map.entry(key) {
                        Entry::Occupied(mut entry) => {
                            let existing = std::mem::take(entry.get_mut());
                            *entry.get_mut() = merge(existing, value, options);
                        }
                        Entry::Vacant(entry) => {
                            entry.insert(value);
                        }
                    }
                }
                Value::Map(map)
            }
        }
        other => Value::Seq(vec![other, Value::Map(source)]),
    }
}

/// Concatenate two values, treating non-sequences as singletons.
pub(crate) fn combine(a: Value, b: Value) -> Value {
    let mut items = match a {
        Value::Seq(items) => items,
        other => vec![other],
    };
    match b {
        Value::Seq(incoming) => items.extend(incoming),
        other => items.push(other),
    }
    Value::Seq(items)
}

/// Map a function over a value or each element of a sequence.
pub(crate) fn apply<F: Fn(Value) -> Value>(value: Value, f: F) -> Value {
    match value {
        Value::Seq(items) => Value::Seq(items.into_iter().map(f).collect()),
        other => f(other),
    }
}

/// Remove every `Undefined` entry from the tree, preserving the order
/// of what remains. Integer-keyed mappings are left as mappings; list
/// promotion happens only during merge.
pub(crate) fn compact(map: &mut Map) {
    map.retain(|_, v| !v.is_undefined());
    for value in map.values_mut() {
        compact_value(value);
    }
}

fn compact_value(value: &mut Value) {
    match value {
        Value::Seq(items) => {
            items.retain(|v| !v.is_undefined());
            for item in items {
                compact_value(item);
            }
        }
        Value::Map(map) => {
            map.retain(|_, v| !v.is_undefined());
            for item in map.values_mut() {
                compact_value(item);
            }
        }
        _ => {}
    }
}

/// Whether `value` is emitted as a `key=value` leaf by the encoder.
pub(crate) fn is_non_nullish_primitive(value: &Value, skip_nulls: bool) -> bool {
    match value {
        Value::Undefined | Value::Null | Value::Seq(_) | Value::Map(_) => false,
        Value::String(s) => !(skip_nulls && s.is_empty()),
        _ => true,
    }
}
