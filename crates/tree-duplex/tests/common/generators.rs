use proptest::prelude::*;
use serde_json::{json, Value as Json};

/// Arbitrary JSON without floats, so equality is exact.
pub fn json_strategy() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::from),
        (-50i64..50).prop_map(Json::from),
        "[a-c]{0,3}".prop_map(Json::from),
    ];
    leaf.prop_recursive(4, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Json::Array),
            prop::collection::btree_map("[a-e]", inner, 0..5)
                .prop_map(|m| Json::Object(m.into_iter().collect())),
        ]
    })
}

/// Array of `{"id", "v"}` records with unique ids in random order.
pub fn keyed_list() -> impl Strategy<Value = Json> {
    prop::collection::btree_set(0u32..12, 0..8)
        .prop_flat_map(|ids| {
            let ids: Vec<u32> = ids.into_iter().collect();
            (Just(ids).prop_shuffle(), prop::collection::vec(0i64..3, 8))
        })
        .prop_map(|(ids, vals)| {
            Json::Array(
                ids.iter()
                    .zip(vals)
                    .map(|(id, v)| json!({"id": id, "v": v}))
                    .collect(),
            )
        })
}
