use trellis_core::{DataType, Record, Result, Value};
use trellis_query::ast::{BinaryOp, Expr};
use trellis_query::Query;
use trellis_store::{ColumnSpec, Store, TableSpec};

fn sample_store() -> Store {
    let store = Store::new();
    let items = store
        .create_table(TableSpec::new(
            "items",
            vec![
                ColumnSpec::new("a", DataType::Int64).key(),
                ColumnSpec::new("b", DataType::Float64),
                ColumnSpec::new("c", DataType::String),
            ],
        ))
        .unwrap();
    for (a, b, c) in [
        (1, 1.25, "foo"),
        (2, 5.55, "bar"),
        (3, 5.55, "foo"),
        (4, 0.5, "foo"),
    ] {
        items
            .insert_row(vec![
                Value::Int64(a),
                Value::Float64(b),
                Value::String(c.into()),
            ])
            .unwrap();
    }

    let numbers = store
        .create_table(TableSpec::new(
            "numbers",
            vec![ColumnSpec::new("n", DataType::Int64).key()],
        ))
        .unwrap();
    for n in [5, 6, 7] {
        numbers.insert_row(vec![Value::Int64(n)]).unwrap();
    }
    store
}

fn collect(query: &Query) -> Vec<Value> {
    query
        .rows()
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap()
}

#[test]
fn filter_yields_matching_whole_rows() {
    let store = sample_store();
    let query = Query::scan(&store, "items")
        .unwrap()
        .filter(
            "r",
            Expr::eq(Expr::member(Expr::param("r"), "a"), Expr::lit(3i64)),
        )
        .unwrap();

    let rows = collect(&query);
    assert_eq!(
        rows,
        vec![Value::Record(Record::new(vec![
            ("a".into(), Value::Int64(3)),
            ("b".into(), Value::Float64(5.55)),
            ("c".into(), Value::String("foo".into())),
        ]))]
    );
}

#[test]
fn filter_select_distinct_pipeline() {
    let store = sample_store();
    let query = Query::scan(&store, "items")
        .unwrap()
        .filter(
            "r",
            Expr::eq(
                Expr::member(Expr::param("r"), "c"),
                Expr::lit(Value::String("foo".into())),
            ),
        )
        .unwrap()
        .select("r", Expr::member(Expr::param("r"), "b"))
        .unwrap()
        .distinct()
        .unwrap();

    // rows 1, 3 and 4 match the predicate
    assert_eq!(
        collect(&query),
        vec![
            Value::Float64(1.25),
            Value::Float64(5.55),
            Value::Float64(0.5),
        ]
    );
}

#[test]
fn distinct_collapses_duplicates_in_first_occurrence_order() {
    let store = sample_store();
    let query = Query::scan(&store, "items")
        .unwrap()
        .select("r", Expr::member(Expr::param("r"), "b"))
        .unwrap()
        .distinct()
        .unwrap();

    assert_eq!(
        collect(&query),
        vec![
            Value::Float64(1.25),
            Value::Float64(5.55),
            Value::Float64(0.5),
        ]
    );
}

#[test]
fn select_many_produces_row_major_pairs() {
    let store = sample_store();
    let little = store
        .create_table(TableSpec::new(
            "little",
            vec![ColumnSpec::new("m", DataType::Int64).key()],
        ))
        .unwrap();
    for m in [1, 2, 3] {
        little.insert_row(vec![Value::Int64(m)]).unwrap();
    }

    let inner = Query::scan(&store, "numbers").unwrap();
    let query = Query::scan(&store, "little")
        .unwrap()
        .select_many(
            "o",
            Expr::Query(inner),
            ("o", "i"),
            Expr::binary(
                BinaryOp::Add,
                Expr::member(Expr::param("o"), "m"),
                Expr::member(Expr::param("i"), "n"),
            ),
        )
        .unwrap();

    let sums: Vec<Value> = collect(&query);
    assert_eq!(
        sums,
        [6, 7, 8, 7, 8, 9, 8, 9, 10]
            .into_iter()
            .map(Value::Int64)
            .collect::<Vec<_>>()
    );
}

#[test]
fn join_matches_on_equal_keys_in_outer_order() {
    let store = sample_store();
    let tags = store
        .create_table(TableSpec::new(
            "tags",
            vec![
                ColumnSpec::new("id", DataType::Int64),
                ColumnSpec::new("tag", DataType::String),
            ],
        ))
        .unwrap();
    for (id, tag) in [(3, "new"), (1, "old"), (3, "hot"), (9, "unused")] {
        tags.insert_row(vec![Value::Int64(id), Value::String(tag.into())])
            .unwrap();
    }

    let inner = Query::scan(&store, "tags").unwrap();
    let query = Query::scan(&store, "items")
        .unwrap()
        .join(
            &inner,
            ("o", Expr::member(Expr::param("o"), "a")),
            ("t", Expr::member(Expr::param("t"), "id")),
            (
                ("o", "t"),
                Expr::record(vec![
                    ("a".into(), Expr::member(Expr::param("o"), "a")),
                    ("tag".into(), Expr::member(Expr::param("t"), "tag")),
                ]),
            ),
        )
        .unwrap();

    let rows = collect(&query);
    let expected: Vec<Value> = [(1, "old"), (3, "new"), (3, "hot")]
        .into_iter()
        .map(|(a, tag)| {
            Value::Record(Record::new(vec![
                ("a".into(), Value::Int64(a)),
                ("tag".into(), Value::String(tag.into())),
            ]))
        })
        .collect();
    assert_eq!(rows, expected);
}

#[test]
fn order_by_is_stable_over_equal_keys() {
    let store = Store::new();
    let events = store
        .create_table(TableSpec::new(
            "events",
            vec![
                ColumnSpec::new("priority", DataType::Int64),
                ColumnSpec::new("label", DataType::String),
            ],
        ))
        .unwrap();
    for (priority, label) in [(2, "a"), (1, "b"), (2, "c"), (1, "d"), (2, "e")] {
        events
            .insert_row(vec![Value::Int64(priority), Value::String(label.into())])
            .unwrap();
    }

    let query = Query::scan(&store, "events")
        .unwrap()
        .order_by("r", Expr::member(Expr::param("r"), "priority"))
        .unwrap()
        .select("r", Expr::member(Expr::param("r"), "label"))
        .unwrap();

    let labels = collect(&query);
    assert_eq!(
        labels,
        ["b", "d", "a", "c", "e"]
            .into_iter()
            .map(|s| Value::String(s.into()))
            .collect::<Vec<_>>()
    );
}

#[test]
fn order_by_computed_key() {
    let store = sample_store();
    let query = Query::scan(&store, "items")
        .unwrap()
        .order_by(
            "r",
            Expr::binary(
                BinaryOp::Mul,
                Expr::member(Expr::param("r"), "b"),
                Expr::lit(Value::Float64(-1.0)),
            ),
        )
        .unwrap()
        .select("r", Expr::member(Expr::param("r"), "a"))
        .unwrap();

    // descending by b; equal b values (rows 2 and 3) keep scan order
    assert_eq!(
        collect(&query),
        vec![
            Value::Int64(2),
            Value::Int64(3),
            Value::Int64(1),
            Value::Int64(4),
        ]
    );
}

#[test]
fn query_splices_into_itself_with_fresh_identity() {
    let store = sample_store();
    let evens = Query::scan(&store, "numbers")
        .unwrap()
        .filter(
            "r",
            Expr::eq(
                Expr::binary(
                    BinaryOp::Sub,
                    Expr::member(Expr::param("r"), "n"),
                    Expr::lit(6i64),
                ),
                Expr::lit(0i64),
            ),
        )
        .unwrap();

    // self-join: both sides must scroll independently
    let query = evens
        .join(
            &evens,
            ("o", Expr::member(Expr::param("o"), "n")),
            ("i", Expr::member(Expr::param("i"), "n")),
            (
                ("o", "i"),
                Expr::binary(
                    BinaryOp::Add,
                    Expr::member(Expr::param("o"), "n"),
                    Expr::member(Expr::param("i"), "n"),
                ),
            ),
        )
        .unwrap();

    assert_eq!(collect(&query), vec![Value::Int64(12)]);
}

#[test]
fn rows_is_a_fresh_execution_each_time() {
    let store = sample_store();
    let query = Query::scan(&store, "numbers")
        .unwrap()
        .select("r", Expr::member(Expr::param("r"), "n"))
        .unwrap();

    assert_eq!(collect(&query).len(), 3);
    assert_eq!(collect(&query).len(), 3);
}

#[test]
fn unknown_table_and_column_are_reported_at_build_time() {
    let store = sample_store();
    assert!(matches!(
        Query::scan(&store, "missing"),
        Err(trellis_core::Error::TableNotFound { .. })
    ));

    let err = Query::scan(&store, "items")
        .unwrap()
        .filter(
            "r",
            Expr::eq(Expr::member(Expr::param("r"), "zzz"), Expr::lit(1i64)),
        )
        .err()
        .unwrap();
    assert!(matches!(err, trellis_core::Error::ColumnNotFound { .. }));
}

#[test]
fn mixed_type_comparison_fails_during_evaluation() {
    let store = sample_store();
    let query = Query::scan(&store, "items")
        .unwrap()
        .filter(
            "r",
            Expr::binary(
                BinaryOp::Lt,
                Expr::member(Expr::param("r"), "c"),
                Expr::lit(1i64),
            ),
        )
        .unwrap();

    let result: Result<Vec<Value>> = query.rows().unwrap().collect();
    assert!(matches!(
        result,
        Err(trellis_core::Error::UnsupportedBinaryOp { .. })
    ));
}
