//! Tests for the GBLN bridge

use crate::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn int_type(engine: &MemoryEngine, value: i64) -> ValueType {
    encode(engine, &HostValue::int(value)).unwrap().value_type().unwrap()
}

fn string_width(engine: &MemoryEngine, value: &str) -> usize {
    let node = encode(engine, &HostValue::str(value)).unwrap();
    match node.view().scalar(ValueType::Str).unwrap() {
        ScalarValue::Str { width, .. } => width.get(),
        other => panic!("expected string scalar, got {other:?}"),
    }
}

#[test]
fn test_width_selection_boundaries() {
    init_logging();
    let engine = MemoryEngine::new();
    assert_eq!(int_type(&engine, 127), ValueType::I8);
    assert_eq!(int_type(&engine, 128), ValueType::I16);
    assert_eq!(int_type(&engine, -129), ValueType::I16);
    assert_eq!(int_type(&engine, (1 << 31) - 1), ValueType::I32);
    assert_eq!(int_type(&engine, 1 << 31), ValueType::I64);

    for (len, expected) in [(2, 2), (3, 4), (5, 8), (9, 16), (17, 32), (33, 64), (100, 128), (200, 256), (300, 512), (1000, 1024)] {
        assert_eq!(string_width(&engine, &"a".repeat(len)), expected, "length {len}");
    }
    assert_eq!(engine.live_nodes(), 0);
}

#[test]
fn test_scenario_user_object() {
    init_logging();
    let engine = MemoryEngine::new();
    let user = HostValue::map(vec![
        field("id", HostValue::int(12345)),
        field("name", HostValue::str("Alice")),
    ]);

    let root = encode(&engine, &user).unwrap();
    assert_eq!(root.value_type().unwrap(), ValueType::Object);
    assert_eq!(root.len().unwrap(), 2);

    let id = root.get("id").unwrap();
    assert_eq!(id.value_type().unwrap(), ValueType::I16);
    let name = root.get("name").unwrap().scalar(ValueType::Str).unwrap();
    assert_eq!(
        name,
        ScalarValue::Str {
            value: "Alice".to_string(),
            width: StringWidth::new(8).unwrap(),
        }
    );

    let decoded = decode(root.view()).unwrap();
    assert_eq!(decoded.keys(), vec!["id", "name"]);
    assert_eq!(decoded, user);
}

#[test]
fn test_scenario_string_limit() {
    init_logging();
    let engine = MemoryEngine::new();
    let long: String = "ü".repeat(1025);

    let err = encode(&engine, &HostValue::str(long.clone())).unwrap_err();
    assert!(matches!(err, GblnError::StringTooLong { length: 1025, max: 1024, .. }));

    let truncated: String = long.chars().take(1024).collect();
    assert_eq!(string_width(&engine, &truncated), 1024);
    assert_eq!(engine.live_nodes(), 0);
}

#[test]
fn test_scenario_list_of_maps() {
    init_logging();
    let engine = MemoryEngine::new();
    let rows: Vec<HostValue> = (0..3)
        .map(|i| {
            HostValue::map(vec![
                field("row", HostValue::int(i)),
                field("label", HostValue::str(format!("item-{i}"))),
                field("active", HostValue::bool(i % 2 == 0)),
            ])
        })
        .collect();
    let value = HostValue::list(rows);

    let root = encode(&engine, &value).unwrap();
    let decoded = decode(root.view()).unwrap();
    let items = decoded.as_list().unwrap();
    assert_eq!(items.len(), 3);
    for (i, item) in items.iter().enumerate() {
        assert_eq!(item.keys(), vec!["row", "label", "active"]);
        assert_eq!(item.get("row").and_then(HostValue::as_int), Some(i as i64));
    }
    drop(root);
    assert_eq!(engine.live_nodes(), 0);
}

#[test]
fn test_releasing_root_frees_descendants() {
    init_logging();
    let engine = MemoryEngine::new();
    let value = HostValue::map(vec![
        field("a", HostValue::list(vec![HostValue::int(1), HostValue::list(vec![HostValue::null()])])),
        field("b", HostValue::map(vec![field("c", HostValue::str("deep"))])),
    ]);
    let root = encode(&engine, &value).unwrap();
    assert_eq!(engine.live_nodes(), 7);
    root.release();
    assert_eq!(engine.live_nodes(), 0);
}

#[test]
fn test_duplicate_key_overwrite_policy() {
    init_logging();
    let engine = MemoryEngine::with_key_policy(KeyPolicy::Overwrite);
    let value = HostValue::map(vec![
        field("k", HostValue::list(vec![HostValue::int(1), HostValue::int(2)])),
        field("k", HostValue::str("last")),
    ]);
    let root = encode(&engine, &value).unwrap();
    // object + replacement only; the earlier list was released
    assert_eq!(engine.live_nodes(), 2);
    assert_eq!(
        decode(root.view()).unwrap(),
        HostValue::map(vec![field("k", HostValue::str("last"))])
    );
}

#[test]
fn test_out_of_range_declared_width() {
    init_logging();
    let engine = MemoryEngine::new();
    let err = encode_as(&engine, &HostValue::int(999), ValueType::I8).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Integer out of range: 999 does not fit i8 (-128..=127)"
    );
    assert_eq!(engine.live_nodes(), 0);
}

#[test]
fn test_unsigned_decode_surface() {
    init_logging();
    let engine = MemoryEngine::new();
    for (value, ty) in [(255u64, ValueType::U8), (65535, ValueType::U16), (u32::MAX as u64, ValueType::U32), (u64::MAX, ValueType::U64)] {
        let node = encode(&engine, &HostValue::uint(value)).unwrap();
        assert_eq!(node.value_type().unwrap(), ty);
        assert_eq!(decode(node.view()).unwrap(), HostValue::UInt(value));
    }
}

#[test]
fn test_text_carrier_roundtrip() {
    init_logging();
    let gbln = Gbln::in_memory();
    let value = HostValue::map(vec![
        field("response", HostValue::map(vec![
            field("status", HostValue::int(200)),
            field("data", HostValue::map(vec![field("user", HostValue::map(vec![field("name", HostValue::str("北京"))]))])),
        ])),
    ]);
    let text = gbln.to_string(&value).unwrap();
    let parsed = gbln.from_str(&text).unwrap();
    assert_eq!(parsed, value);
}

#[test]
fn test_parsed_tree_queries_are_borrowed() {
    init_logging();
    let gbln = Gbln::in_memory();
    let name = gbln
        .with_parsed(r#"{"user": {"id": 12345, "name": "Alice"}}"#, |root| {
            let user = root.get("user").ok_or_else(|| GblnError::null_pointer("object_get"))?;
            let name = user.get("name").ok_or_else(|| GblnError::null_pointer("object_get"))?;
            decode(name)
        })
        .unwrap();
    assert_eq!(name, HostValue::str("Alice"));
    assert_eq!(gbln.engine().live_nodes(), 0);
}

#[test]
fn test_independent_trees_in_parallel() {
    init_logging();
    let engine = MemoryEngine::new();
    std::thread::scope(|scope| {
        for t in 0..4i64 {
            let engine = &engine;
            scope.spawn(move || {
                for i in 0..50i64 {
                    let value = HostValue::map(vec![
                        field("thread", HostValue::int(t)),
                        field("values", HostValue::list((0..i).map(HostValue::int).collect())),
                    ]);
                    let root = encode(engine, &value).unwrap();
                    assert_eq!(decode(root.view()).unwrap(), value);
                }
            });
        }
    });
    assert_eq!(engine.live_nodes(), 0);
}

// ============================================================
// Properties
// ============================================================

fn exact_leaf() -> BoxedStrategy<HostValue> {
    prop_oneof![
        Just(HostValue::Null),
        any::<bool>().prop_map(HostValue::Bool),
        any::<i64>().prop_map(HostValue::Int),
        any::<u64>().prop_map(HostValue::UInt),
        "\\PC{0,40}".prop_map(HostValue::Str),
    ]
    .boxed()
}

fn tree(leaf: BoxedStrategy<HostValue>) -> impl Strategy<Value = HostValue> {
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(HostValue::List),
            prop::collection::vec(("[a-z_]{1,8}", inner), 0..6).prop_map(|pairs| {
                let mut entries: Vec<HostEntry> = Vec::new();
                for (key, value) in pairs {
                    if !entries.iter().any(|e| e.key == key) {
                        entries.push(HostEntry::new(key, value));
                    }
                }
                HostValue::Map(entries)
            }),
        ]
    })
}

fn host_value() -> impl Strategy<Value = HostValue> {
    let leaf = prop_oneof![
        exact_leaf(),
        (-1.0e6f64..1.0e6f64).prop_map(HostValue::Float),
        (-1.0e3f32..1.0e3f32).prop_map(HostValue::Float32),
    ];
    tree(leaf.boxed())
}

proptest! {
    #[test]
    fn prop_signed_roundtrip(x in any::<i64>()) {
        let engine = MemoryEngine::new();
        let node = encode(&engine, &HostValue::int(x)).unwrap();
        prop_assert_eq!(node.value_type().unwrap(), select_int_width(x));
        prop_assert_eq!(decode(node.view()).unwrap(), HostValue::int(x));
    }

    #[test]
    fn prop_unsigned_roundtrip(x in any::<u64>()) {
        let engine = MemoryEngine::new();
        let node = encode(&engine, &HostValue::uint(x)).unwrap();
        prop_assert_eq!(decode(node.view()).unwrap(), HostValue::uint(x));
    }

    #[test]
    fn prop_selected_width_is_minimal(x in any::<i64>()) {
        let ty = select_int_width(x);
        let (min, max) = ty.int_range().unwrap();
        prop_assert!((min..=max).contains(&(x as i128)));
        let narrower = match ty {
            ValueType::I16 => Some(ValueType::I8),
            ValueType::I32 => Some(ValueType::I16),
            ValueType::I64 => Some(ValueType::I32),
            _ => None,
        };
        if let Some((nmin, nmax)) = narrower.and_then(ValueType::int_range) {
            prop_assert!(!(nmin..=nmax).contains(&(x as i128)));
        }
    }

    #[test]
    fn prop_structural_roundtrip(value in host_value()) {
        let engine = MemoryEngine::new();
        {
            let root = encode(&engine, &value).unwrap();
            prop_assert_eq!(decode(root.view()).unwrap(), value);
        }
        prop_assert_eq!(engine.live_nodes(), 0);
    }

    #[test]
    fn prop_text_roundtrip_keeps_types(value in tree(exact_leaf())) {
        let gbln = Gbln::in_memory();
        let text = gbln.to_string(&value).unwrap();
        prop_assert_eq!(gbln.from_str(&text).unwrap(), value);
        prop_assert_eq!(gbln.engine().live_nodes(), 0);
    }
}
