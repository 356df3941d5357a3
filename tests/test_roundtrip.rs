//! Round-trip laws: decoding an encoded tree recovers the original
//! under matched options.

use pretty_assertions::assert_eq;
use qs_value::{
    decode, encode, Charset, DecodeOptions, EncodeOptions, ListFormat, Map, Value,
};
use serde_json::json;

fn to_map(json: serde_json::Value) -> Map {
    match Value::from(json) {
        Value::Map(map) => map,
        other => panic!("expected a mapping, got {}", other.type_name()),
    }
}

fn assert_round_trip(
    tree: serde_json::Value,
    encode_options: &EncodeOptions,
    decode_options: &DecodeOptions,
) {
    let original = to_map(tree);
    let encoded = encode(&Value::Map(original.clone()), encode_options).unwrap();
    let decoded = decode(&encoded, decode_options).unwrap();
    assert_eq!(decoded, original, "through {encoded:?}");
}

#[test]
fn flat_and_nested_mappings_round_trip() {
    assert_round_trip(
        json!({"name": "Alice", "age": "24"}),
        &EncodeOptions::default(),
        &DecodeOptions::default(),
    );
    assert_round_trip(
        json!({"user": {"name": "Alice", "address": {"city": "Carrot City"}}}),
        &EncodeOptions::default(),
        &DecodeOptions::default(),
    );
}

#[test]
fn reserved_characters_round_trip() {
    assert_round_trip(
        json!({"q": "a=b&c[d]", "sp": "one two+three", "uni": "\u{263a}\u{1f600}"}),
        &EncodeOptions::default(),
        &DecodeOptions::default(),
    );
}

#[test]
fn lists_round_trip_under_indices_and_brackets() {
    for list_format in [ListFormat::Indices, ListFormat::Brackets] {
        assert_round_trip(
            json!({"a": ["b", "c"], "nested": {"ids": ["1", "2", "3"]}}),
            &EncodeOptions {
                list_format,
                ..Default::default()
            },
            &DecodeOptions::default(),
        );
    }
}

#[test]
fn lists_round_trip_under_repeat() {
    assert_round_trip(
        json!({"a": ["b", "c"]}),
        &EncodeOptions {
            list_format: ListFormat::Repeat,
            ..Default::default()
        },
        &DecodeOptions::default(),
    );
}

#[test]
fn lists_round_trip_under_comma() {
    // values-only encoding keeps the joining commas literal, which is
    // what lets the decoder split them back apart
    assert_round_trip(
        json!({"a": ["b", "c"]}),
        &EncodeOptions {
            encode_values_only: true,
            list_format: ListFormat::Comma,
            ..Default::default()
        },
        &DecodeOptions {
            comma: true,
            ..Default::default()
        },
    );
}

#[test]
fn encoded_commas_do_not_split() {
    // a fully encoded comma scalar survives as a scalar
    let encoded = encode(
        &Value::Map(to_map(json!({"a": ["b", "c"]}))),
        &EncodeOptions {
            list_format: ListFormat::Comma,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(encoded, "a=b%2Cc");
    let decoded = decode(
        &encoded,
        &DecodeOptions {
            comma: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(decoded, to_map(json!({"a": "b,c"})));
}

#[test]
fn single_element_lists_need_comma_round_trip() {
    let original = to_map(json!({"a": ["b"]}));

    // without the marker the list collapses to a scalar
    let encoded = encode(
        &Value::Map(original.clone()),
        &EncodeOptions {
            list_format: ListFormat::Comma,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(encoded, "a=b");
    let decoded = decode(
        &encoded,
        &DecodeOptions {
            comma: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(decoded, to_map(json!({"a": "b"})));

    // with it, the `[]` suffix preserves the list
    let encoded = encode(
        &Value::Map(original.clone()),
        &EncodeOptions {
            list_format: ListFormat::Comma,
            comma_round_trip: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(encoded, "a%5B%5D=b");
    let decoded = decode(
        &encoded,
        &DecodeOptions {
            comma: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn strict_nulls_round_trip() {
    let original = to_map(json!({"a": null, "b": ""}));
    let encoded = encode(
        &Value::Map(original.clone()),
        &EncodeOptions {
            strict_null_handling: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(encoded, "a&b=");
    let decoded = decode(
        &encoded,
        &DecodeOptions {
            strict_null_handling: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn dot_notation_round_trips() {
    assert_round_trip(
        json!({"a": {"b": {"c": "d"}}}),
        &EncodeOptions {
            allow_dots: Some(true),
            ..Default::default()
        },
        &DecodeOptions {
            allow_dots: Some(true),
            ..Default::default()
        },
    );
}

#[test]
fn dot_in_keys_round_trips() {
    assert_round_trip(
        json!({"name.obj": {"first": "John"}}),
        &EncodeOptions {
            allow_dots: Some(true),
            encode_dot_in_keys: true,
            ..Default::default()
        },
        &DecodeOptions {
            decode_dot_in_keys: true,
            ..Default::default()
        },
    );
}

#[test]
fn latin1_round_trips() {
    assert_round_trip(
        json!({"a": "\u{e4}\u{f6}"}),
        &EncodeOptions {
            charset: Charset::Latin1,
            ..Default::default()
        },
        &DecodeOptions {
            charset: Charset::Latin1,
            ..Default::default()
        },
    );
}

#[test]
fn charset_sentinel_round_trips_without_matched_charsets() {
    // the sentinel tells the decoder what the encoder used, so the
    // decoder's own default does not matter
    let original = to_map(json!({"a": "\u{f8}"}));
    let encoded = encode(
        &Value::Map(original.clone()),
        &EncodeOptions {
            charset_sentinel: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(encoded, "utf8=%E2%9C%93&a=%C3%B8");
    let decoded = decode(
        &encoded,
        &DecodeOptions {
            charset: Charset::Latin1,
            charset_sentinel: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn query_prefix_round_trips() {
    assert_round_trip(
        json!({"a": "b", "c": {"d": "e"}}),
        &EncodeOptions {
            add_query_prefix: true,
            ..Default::default()
        },
        &DecodeOptions {
            ignore_query_prefix: true,
            ..Default::default()
        },
    );
}

#[test]
fn decoded_parameter_count_is_bounded() {
    let input = (0..1200)
        .map(|i| format!("k{i}={i}"))
        .collect::<Vec<_>>()
        .join("&");
    let decoded = decode(&input, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded.len(), 1000);
}

#[test]
fn decoded_depth_is_bounded() {
    let decoded = decode("a[b][c][d][e][f][g][h]=x", &DecodeOptions::default()).unwrap();

    let mut depth = 0;
    let mut node = &decoded["a"];
    while let Value::Map(map) = node {
        depth += 1;
        let (_, next) = map.first().unwrap();
        node = next;
    }
    // five interpreted segments plus the literal remainder key
    assert_eq!(depth, 6);
    assert_eq!(node.as_str(), Some("x"));
}

#[test]
fn compaction_is_idempotent_through_decode() {
    // sparse input decodes with no holes left behind
    let decoded = decode("a[3]=x&a[1]=y", &DecodeOptions::default()).unwrap();
    assert_eq!(decoded, to_map(json!({"a": ["y", "x"]})));
}
