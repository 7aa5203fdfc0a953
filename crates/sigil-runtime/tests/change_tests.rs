//! Property tests for change logs: replay, undo and structural diffs

use proptest::prelude::*;
use serde_json::{Map, Value};
use sigil_engine::{AttrMetadata, MetadataType};
use sigil_runtime::attribute::{apply_all, diff};
use sigil_runtime::{Attribute, AttributeSchema, ChangeKind, MetadataStore};
use std::sync::{Arc, Weak};

const LIMIT: usize = 250_000;

fn attribute(store: &Arc<MetadataStore>, limit: usize) -> Attribute {
    let metadata = AttrMetadata {
        name: "items".into(),
        is_required: true,
        is_read_only: false,
        is_internal: false,
        is_lazy: false,
        ty: MetadataType::array(MetadataType::Mixed),
    };
    let schema = AttributeSchema::new(store, "Item", metadata, Value::Object(Map::new()), Value::Object(Map::new()));
    Attribute::new(Arc::new(schema), Weak::new(), limit)
}

fn ints(values: &[i64]) -> Value {
    Value::Array(values.iter().map(|v| Value::from(*v)).collect())
}

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum ArrayOp {
    Push(Vec<i64>),
    Pop,
    Shift,
    Unshift(Vec<i64>),
    Splice(isize, usize, Vec<i64>),
    Fill(i64, isize, Option<isize>),
    CopyWithin(isize, isize, Option<isize>),
    SetIndex(usize, i64),
    Assign(Vec<i64>),
}

fn arb_items() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..5, 0..4)
}

fn arb_op() -> impl Strategy<Value = ArrayOp> {
    prop_oneof![
        arb_items().prop_map(ArrayOp::Push),
        Just(ArrayOp::Pop),
        Just(ArrayOp::Shift),
        arb_items().prop_map(ArrayOp::Unshift),
        (-6isize..6, 0usize..4, arb_items()).prop_map(|(s, d, i)| ArrayOp::Splice(s, d, i)),
        (0i64..5, -6isize..6, prop::option::of(-6isize..6)).prop_map(|(v, s, e)| ArrayOp::Fill(v, s, e)),
        (-6isize..6, -6isize..6, prop::option::of(-6isize..6)).prop_map(|(t, s, e)| ArrayOp::CopyWithin(t, s, e)),
        (0usize..8, 0i64..5).prop_map(|(i, v)| ArrayOp::SetIndex(i, v)),
        prop::collection::vec(0i64..5, 0..8).prop_map(ArrayOp::Assign),
    ]
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-3i64..3).prop_map(Value::from),
        "[a-c]{0,2}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::btree_map("[a-d]", inner, 0..4).prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn run(attribute: &mut Attribute, op: &ArrayOp) {
    let to_values = |items: &[i64]| items.iter().map(|v| Value::from(*v)).collect::<Vec<_>>();
    // Out-of-bounds writes are rejected without touching the value
    let _ = match op {
        ArrayOp::Push(items) => attribute.push(to_values(items)).map(drop),
        ArrayOp::Pop => attribute.pop().map(drop),
        ArrayOp::Shift => attribute.shift().map(drop),
        ArrayOp::Unshift(items) => attribute.unshift(to_values(items)).map(drop),
        ArrayOp::Splice(start, count, items) => attribute.splice(*start, *count, to_values(items)).map(drop),
        ArrayOp::Fill(value, start, end) => attribute.fill(Value::from(*value), *start, *end),
        ArrayOp::CopyWithin(target, start, end) => attribute.copy_within(*target, *start, *end),
        ArrayOp::SetIndex(index, value) => attribute.set_index(*index, Value::from(*value)),
        ArrayOp::Assign(items) => {
            attribute.set(ints(items));
            Ok(())
        }
    };
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_array_log_replays_on_peer(initial in arb_items(), ops in prop::collection::vec(arb_op(), 0..12)) {
        let store = MetadataStore::new();
        let mut local = attribute(&store, LIMIT);
        local.initialize(ints(&initial));
        for op in &ops {
            run(&mut local, op);
        }

        let mut peer = attribute(&store, LIMIT);
        peer.initialize(ints(&initial));
        peer.apply_changes(local.get_changes()).unwrap();
        prop_assert_eq!(peer.get(), local.get());
    }

    #[test]
    fn prop_undo_restores_init(initial in arb_json(), writes in prop::collection::vec(arb_json(), 0..6)) {
        let store = MetadataStore::new();
        let mut attr = attribute(&store, LIMIT);
        attr.initialize(initial.clone());
        for value in writes {
            attr.set(value);
        }

        attr.undo_changes().unwrap();
        prop_assert_eq!(attr.get(), &initial);
        prop_assert!(attr.get_changes().iter().all(|c| c.kind == ChangeKind::Init));
    }

    #[test]
    fn prop_diff_reproduces_next(previous in arb_json(), next in arb_json()) {
        let mut value = previous.clone();
        apply_all(&mut value, &diff(&previous, &next, LIMIT)).unwrap();
        prop_assert_eq!(&value, &next);
    }

    #[test]
    fn prop_fallback_diff_reproduces_next(previous in arb_json(), next in arb_json()) {
        let mut value = previous.clone();
        apply_all(&mut value, &diff(&previous, &next, 0)).unwrap();
        prop_assert_eq!(&value, &next);
    }

    #[test]
    fn prop_identical_values_log_nothing(value in arb_json()) {
        prop_assert!(diff(&value, &value, LIMIT).is_empty());
    }
}

#[test]
fn test_small_limit_still_logs_minimal_tail() {
    let store = MetadataStore::new();
    let mut attr = attribute(&store, 0);
    attr.initialize(ints(&[1, 2, 3]));
    let logged = attr.set(ints(&[1, 2, 3, 4]));
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].kind, ChangeKind::Add);
    assert_eq!(logged[0].path, vec!["3".to_string()]);
}
