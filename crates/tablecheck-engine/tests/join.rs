//! Join chain behavior over hand-built frames.

use std::collections::BTreeMap;

use polars::prelude::{DataFrame, NamedFrom, Series};
use tablecheck_engine::error::EngineError;
use tablecheck_engine::join::run_join_chain;
use tablecheck_engine::frame_utils::column_strings;
use tablecheck_model::{JoinKey, JoinSpec, JoinType};

fn frame(columns: Vec<Series>) -> DataFrame {
    DataFrame::new(columns.into_iter().map(Into::into).collect()).expect("frame")
}

fn orders() -> DataFrame {
    frame(vec![
        Series::new("order_id".into(), vec![1i64, 2, 3, 4]),
        Series::new("cust_id".into(), vec![Some(10i64), Some(20), Some(99), None]),
    ])
}

fn customers() -> DataFrame {
    frame(vec![
        Series::new("cust_id".into(), vec![10i64, 20, 30]),
        Series::new("name".into(), vec!["Ada", "Bo", "Cy"]),
    ])
}

fn sheets() -> BTreeMap<String, DataFrame> {
    let mut sheets = BTreeMap::new();
    sheets.insert("Orders".to_string(), orders());
    sheets.insert("Customers".to_string(), customers());
    sheets
}

fn spec(join_type: JoinType) -> JoinSpec {
    JoinSpec {
        left_table: "Orders".to_string(),
        right_table: "Customers".to_string(),
        join_type,
        on_cols: vec![JoinKey {
            left_column: "cust_id".to_string(),
            right_column: "cust_id".to_string(),
        }],
    }
}

#[test]
fn left_join_keeps_all_roots_and_fills_nulls() {
    let outcome = run_join_chain(&sheets(), &[spec(JoinType::Left)]).unwrap();
    assert_eq!(outcome.joined.height(), 4);
    assert_eq!(outcome.total_records, 4);
    assert_eq!(outcome.join_steps, 1);
    assert_eq!(
        column_strings(&outcome.joined, "name").unwrap(),
        vec!["Ada", "Bo", "", ""]
    );
    // Unmatched roots stay in the joined frame and still feed the residual.
    assert_eq!(
        column_strings(&outcome.residual, "order_id").unwrap(),
        vec!["3", "4"]
    );
    // The key column collapses instead of duplicating.
    assert!(outcome.joined.column("cust_id_Customers").is_err());
}

#[test]
fn inner_join_moves_unmatched_roots_to_residual() {
    let outcome = run_join_chain(&sheets(), &[spec(JoinType::Inner)]).unwrap();
    assert_eq!(outcome.joined.height(), 2);
    assert_eq!(outcome.total_records, 4);
    assert_eq!(
        column_strings(&outcome.residual, "order_id").unwrap(),
        vec!["3", "4"]
    );
    assert_eq!(
        outcome.joined.height() + outcome.residual.height(),
        outcome.total_records
    );
}

#[test]
fn anti_left_keeps_only_unmatched_roots() {
    let outcome = run_join_chain(&sheets(), &[spec(JoinType::AntiLeft)]).unwrap();
    assert_eq!(
        column_strings(&outcome.joined, "order_id").unwrap(),
        vec!["3", "4"]
    );
    // Matched roots were dropped by the anti filter.
    assert_eq!(
        column_strings(&outcome.residual, "order_id").unwrap(),
        vec!["1", "2"]
    );
}

#[test]
fn anti_inner_always_yields_an_empty_frame() {
    let outcome = run_join_chain(&sheets(), &[spec(JoinType::AntiInner)]).unwrap();
    assert_eq!(outcome.joined.height(), 0);
    // Anti steps invert the polarity: the matched roots are the lost ones.
    assert_eq!(
        column_strings(&outcome.residual, "order_id").unwrap(),
        vec!["1", "2"]
    );
}

#[test]
fn outer_join_appends_unmatched_right_rows() {
    let outcome = run_join_chain(&sheets(), &[spec(JoinType::Outer)]).unwrap();
    assert_eq!(outcome.joined.height(), 5);
    assert_eq!(
        column_strings(&outcome.residual, "order_id").unwrap(),
        vec!["3", "4"]
    );
    // The right-only row keeps its key through the collapsed column.
    assert_eq!(
        column_strings(&outcome.joined, "cust_id").unwrap(),
        vec!["10", "20", "99", "", "30"]
    );
}

#[test]
fn residual_accumulates_once_per_root_across_steps() {
    let mut sheets = sheets();
    sheets.insert(
        "Shipments".to_string(),
        frame(vec![Series::new("order_id".into(), vec![1i64])]),
    );
    let steps = vec![
        spec(JoinType::Inner),
        JoinSpec {
            left_table: "Orders".to_string(),
            right_table: "Shipments".to_string(),
            join_type: JoinType::Inner,
            on_cols: vec![JoinKey {
                left_column: "order_id".to_string(),
                right_column: "order_id".to_string(),
            }],
        },
    ];
    let outcome = run_join_chain(&sheets, &steps).unwrap();
    // Step one drops orders 3 and 4, step two drops order 2.
    assert_eq!(
        column_strings(&outcome.joined, "order_id").unwrap(),
        vec!["1"]
    );
    assert_eq!(
        column_strings(&outcome.residual, "order_id").unwrap(),
        vec!["2", "3", "4"]
    );
    assert_eq!(outcome.total_records, 4);
    assert_eq!(outcome.join_steps, 2);
}

#[test]
fn colliding_right_columns_are_renamed_after_the_right_table() {
    let mut sheets = sheets();
    sheets.insert(
        "Customers".to_string(),
        frame(vec![
            Series::new("cust_id".into(), vec![10i64]),
            Series::new("order_id".into(), vec![77i64]),
        ]),
    );
    let outcome = run_join_chain(&sheets, &[spec(JoinType::Left)]).unwrap();
    assert_eq!(
        column_strings(&outcome.joined, "order_id_Customers").unwrap(),
        vec!["77", "", "", ""]
    );
}

#[test]
fn numeric_keys_match_across_integer_and_string_columns() {
    let mut sheets = BTreeMap::new();
    sheets.insert(
        "Left".to_string(),
        frame(vec![Series::new("k".into(), vec![1i64, 2])]),
    );
    sheets.insert(
        "Right".to_string(),
        frame(vec![
            Series::new("k".into(), vec!["1.0", "3"]),
            Series::new("tag".into(), vec!["one", "three"]),
        ]),
    );
    let steps = vec![JoinSpec {
        left_table: "Left".to_string(),
        right_table: "Right".to_string(),
        join_type: JoinType::Left,
        on_cols: vec![JoinKey {
            left_column: "k".to_string(),
            right_column: "k".to_string(),
        }],
    }];
    let outcome = run_join_chain(&sheets, &steps).unwrap();
    assert_eq!(
        column_strings(&outcome.joined, "tag").unwrap(),
        vec!["one", ""]
    );
}

#[test]
fn null_keys_match_each_other() {
    let mut sheets = BTreeMap::new();
    sheets.insert(
        "Left".to_string(),
        frame(vec![Series::new("k".into(), vec![Some("a"), None])]),
    );
    sheets.insert(
        "Right".to_string(),
        frame(vec![
            Series::new("k".into(), vec![None, Some("a")]),
            Series::new("v".into(), vec!["null-row", "a-row"]),
        ]),
    );
    let steps = vec![JoinSpec {
        left_table: "Left".to_string(),
        right_table: "Right".to_string(),
        join_type: JoinType::Inner,
        on_cols: vec![JoinKey {
            left_column: "k".to_string(),
            right_column: "k".to_string(),
        }],
    }];
    let outcome = run_join_chain(&sheets, &steps).unwrap();
    assert_eq!(
        column_strings(&outcome.joined, "v").unwrap(),
        vec!["a-row", "null-row"]
    );
}

#[test]
fn empty_chain_is_a_configuration_error() {
    let err = run_join_chain(&sheets(), &[]).unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
}

#[test]
fn step_without_keys_is_a_configuration_error() {
    let mut step = spec(JoinType::Left);
    step.on_cols.clear();
    let err = run_join_chain(&sheets(), &[step]).unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
}

#[test]
fn missing_right_table_aborts() {
    let mut step = spec(JoinType::Left);
    step.right_table = "Absent".to_string();
    let err = run_join_chain(&sheets(), &[step]).unwrap_err();
    assert!(matches!(err, EngineError::MissingDataset(name) if name == "Absent"));
}

#[test]
fn missing_key_column_names_table_and_column() {
    let mut step = spec(JoinType::Left);
    step.on_cols[0].right_column = "absent".to_string();
    let err = run_join_chain(&sheets(), &[step]).unwrap_err();
    match err {
        EngineError::ColumnNotFound { table, column } => {
            assert_eq!(table, "Customers");
            assert_eq!(column, "absent");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn nested_key_columns_fail_type_coercion() {
    let nested = Series::new(
        "k".into(),
        vec![Series::new("".into(), vec!["a", "b"])],
    );
    let mut sheets = BTreeMap::new();
    sheets.insert("Left".to_string(), frame(vec![nested]));
    sheets.insert(
        "Right".to_string(),
        frame(vec![Series::new("k".into(), vec!["a"])]),
    );
    let steps = vec![JoinSpec {
        left_table: "Left".to_string(),
        right_table: "Right".to_string(),
        join_type: JoinType::Inner,
        on_cols: vec![JoinKey {
            left_column: "k".to_string(),
            right_column: "k".to_string(),
        }],
    }];
    let err = run_join_chain(&sheets, &steps).unwrap_err();
    assert!(matches!(err, EngineError::TypeCoercion { .. }));
}
