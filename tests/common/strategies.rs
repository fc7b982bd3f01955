use proptest::prelude::*;
use serde_json::{json, Value};

/// Strategy for valid bare function names
pub fn function_name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,31}"
}

/// Strategy for `name` or `object.method` references
pub fn function_ref_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        function_name_strategy(),
        (function_name_strategy(), function_name_strategy())
            .prop_map(|(object, method)| format!("{object}.{method}")),
    ]
}

/// Strategy for references that must not parse: empty segments, bad leading
/// characters or more than one dot
pub fn malformed_ref_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        function_name_strategy().prop_map(|name| format!("{name}.")),
        function_name_strategy().prop_map(|name| format!(".{name}")),
        function_name_strategy().prop_map(|name| format!("9{name}")),
        (
            function_name_strategy(),
            function_name_strategy(),
            function_name_strategy()
        )
            .prop_map(|(a, b, c)| format!("{a}.{b}.{c}")),
    ]
}

/// Strategy for small integer argument lists whose product cannot overflow
pub fn multiply_args_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-1000i64..1000, 0..5)
}

/// Strategy for JSON-safe task arguments
pub fn task_args_strategy() -> impl Strategy<Value = Vec<Value>> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
    ];
    let value = leaf.prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::hash_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|m| json!(m)),
        ]
    });
    prop::collection::vec(value, 0..4)
}

/// Strategy for a job size together with an arbitrary completion order of its subtasks
pub fn completion_order_strategy() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (1usize..24).prop_flat_map(|n| (Just(n), Just((0..n).collect::<Vec<_>>()).prop_shuffle()))
}
