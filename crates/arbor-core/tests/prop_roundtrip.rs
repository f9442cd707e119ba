//! Property-based coverage for the tree core.
//!
//! Random JSON values are generated with `proptest` and pushed through three
//! independent loops that must all reproduce the original structure:
//!
//! - token replay: tree -> TreeReader -> TreeBuilder -> tree
//! - text: tree -> compact JSON -> parse -> tree
//! - value bridge: serde_json::Value -> tree -> serde_json::Value
//!
//! A fourth property drives random mutation sequences against a `Vec` model
//! and checks the ring invariants after every step.
//!
//! Floats are generated as integer mantissas over powers of ten so that the
//! text form roundtrips without last-digit drift; NaN/Infinity are excluded
//! (they have no JSON text form).

use arbor_core::{
    deep_eq_across, from_value, parse, to_json_string, to_value, JsonTree, TreeBuilder, TreeReader,
};
use proptest::prelude::*;
use serde_json::{Map, Number, Value};

// ============================================================================
// Strategies
// ============================================================================

fn arb_key() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,10}").unwrap()
}

fn arb_string() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,20}",
        Just(String::new()),
        Just("true".to_string()),
        Just("null".to_string()),
        Just("42".to_string()),
        Just("line1\nline2".to_string()),
        Just("say \"hi\"".to_string()),
        Just("path\\to\\file".to_string()),
        Just("caf\u{00e9} \u{4f60}\u{597d}".to_string()),
    ]
}

fn arb_integer() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-1_000_000_000i64..1_000_000_000i64).prop_map(|n| Value::Number(Number::from(n))),
        (u64::MAX - 1000..u64::MAX).prop_map(|n| Value::Number(Number::from(n))),
    ]
}

/// Display-safe floats: mantissa / 10^n with 1-4 decimal places.
fn arb_float() -> impl Strategy<Value = Value> {
    (-100_000_000i64..100_000_000i64, 1u32..5u32).prop_filter_map(
        "whole floats are generated as integers",
        |(mantissa, decimals)| {
            let f = mantissa as f64 / 10f64.powi(decimals as i32);
            if !f.is_finite() || f.fract() == 0.0 {
                return None;
            }
            Number::from_f64(f).map(Value::Number)
        },
    )
}

fn arb_primitive() -> impl Strategy<Value = Value> {
    prop_oneof![
        arb_string().prop_map(Value::String),
        arb_integer(),
        arb_float(),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

fn arb_json() -> impl Strategy<Value = Value> {
    arb_primitive().prop_recursive(3, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((arb_key(), inner), 0..6).prop_map(|pairs| {
                let mut map = Map::new();
                for (k, v) in pairs {
                    map.insert(k, v);
                }
                Value::Object(map)
            }),
        ]
    })
}

// ============================================================================
// Roundtrip properties
// ============================================================================

proptest! {
    #[test]
    fn token_replay_reproduces_tree(value in arb_json()) {
        let (tree, root) = from_value(&value).unwrap();
        let mut reader = TreeReader::new(&tree, root);
        let (rebuilt, new_root) = TreeBuilder::build(&mut reader).unwrap();
        prop_assert!(deep_eq_across(&tree, root, &rebuilt, new_root));
    }

    #[test]
    fn text_roundtrip_reproduces_tree(value in arb_json()) {
        let (tree, root) = from_value(&value).unwrap();
        let text = to_json_string(&tree, root).unwrap();
        let (reparsed, new_root) = parse(&text).unwrap();
        prop_assert!(
            deep_eq_across(&tree, root, &reparsed, new_root),
            "text was: {}", text
        );
    }

    #[test]
    fn value_bridge_roundtrips(value in arb_json()) {
        let (tree, root) = from_value(&value).unwrap();
        prop_assert_eq!(to_value(&tree, root).unwrap(), value);
    }
}

// ============================================================================
// Ring invariants under random mutation
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Push(i64),
    RemoveAt(usize),
    InsertAfter(usize, i64),
    Clear,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            4 => any::<i64>().prop_map(Op::Push),
            2 => (0usize..8).prop_map(Op::RemoveAt),
            2 => (0usize..8, any::<i64>()).prop_map(|(i, v)| Op::InsertAfter(i, v)),
            1 => Just(Op::Clear),
        ],
        0..40,
    )
}

proptest! {
    #[test]
    fn ring_matches_vec_model(ops in arb_ops()) {
        let mut tree = JsonTree::new();
        let arr = tree.new_array();
        let mut model: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    let node = tree.new_value(v);
                    tree.add(arr, node).unwrap();
                    model.push(v);
                }
                Op::RemoveAt(i) => {
                    if i < model.len() {
                        tree.remove_at(arr, i).unwrap();
                        model.remove(i);
                    } else {
                        prop_assert!(tree.remove_at(arr, i).is_err());
                    }
                }
                Op::InsertAfter(i, v) => {
                    if i < model.len() {
                        let anchor = tree.get_item(arr, i).unwrap();
                        let node = tree.new_value(v);
                        tree.add_after(arr, node, Some(anchor)).unwrap();
                        model.insert(i + 1, v);
                    }
                }
                Op::Clear => {
                    tree.clear(arr).unwrap();
                    model.clear();
                }
            }

            // the ring mirrors the model after every operation
            let got: Vec<i64> = tree
                .children(arr)
                .map(|id| tree.as_i64(id).unwrap())
                .collect();
            prop_assert_eq!(&got, &model);
            prop_assert_eq!(tree.len(arr), model.len());
            prop_assert_eq!(
                tree.first_child(arr),
                tree.get_item(arr, 0),
                "first child must be item 0"
            );
            if model.is_empty() {
                prop_assert_eq!(tree.last_child(arr), None);
            } else {
                prop_assert_eq!(tree.last_child(arr), tree.get_item(arr, model.len() - 1));
            }
        }
    }
}
