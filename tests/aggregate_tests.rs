// tests/aggregate_tests.rs

use quarry::{Aggregate, AggregateError, Collection, GroupKey, PartialState, Value, parse};

fn documents(text: &str) -> Vec<Value> {
    Collection::new(parse(text).unwrap()).into_documents()
}

// ============================================================================
// Single-bucket semantics
// ============================================================================

#[test]
fn test_count_ignores_fields() {
    let docs = documents(r#"[{"x": 1}, {"y": "no x at all"}, {}]"#);
    assert_eq!(Aggregate::Count.apply(&docs).unwrap(), Value::Integer(3));
}

#[test]
fn test_sum_skips_non_numeric_values() {
    let docs = documents(r#"[{"x": 1}, {"x": "oops"}, {"x": 2.5}, {}, {"x": null}]"#);
    assert_eq!(
        Aggregate::Sum("x".to_string()).apply(&docs).unwrap(),
        Value::Float(3.5)
    );
}

#[test]
fn test_sum_of_integers_stays_integer() {
    let docs = documents(r#"[{"x": 1}, {"x": 2}, {"x": 3}]"#);
    assert_eq!(
        Aggregate::Sum("x".to_string()).apply(&docs).unwrap(),
        Value::Integer(6)
    );
}

#[test]
fn test_sum_of_empty_bucket_is_integer_zero() {
    assert_eq!(
        Aggregate::Sum("x".to_string()).apply(&[]).unwrap(),
        Value::Integer(0)
    );
}

#[test]
fn test_min_max_over_mixed_numbers() {
    let docs = documents(r#"[{"x": 3}, {"x": -1.5}, {"x": 7}, {"x": "skip"}]"#);
    assert_eq!(
        Aggregate::Min("x".to_string()).apply(&docs).unwrap(),
        Value::Float(-1.5)
    );
    assert_eq!(
        Aggregate::Max("x".to_string()).apply(&docs).unwrap(),
        Value::Integer(7)
    );
}

#[test]
fn test_min_max_error_on_bucket_without_numbers() {
    let docs = documents(r#"[{"x": "a"}, {"y": 1}]"#);
    assert!(matches!(
        Aggregate::Min("x".to_string()).apply(&docs),
        Err(AggregateError::EmptyBucket { op: "min", .. })
    ));
    assert!(matches!(
        Aggregate::Max("x".to_string()).apply(&docs),
        Err(AggregateError::EmptyBucket { op: "max", .. })
    ));
}

#[test]
fn test_avg_denominator_counts_non_numeric_documents() {
    // 1 + 2 over THREE documents: documents without a numeric value stay
    // in the denominator, so this is 1.0, not 1.5
    let docs = documents(r#"[{"x": 1}, {"x": 2}, {"x": "n/a"}]"#);
    assert_eq!(
        Aggregate::Avg("x".to_string()).apply(&docs).unwrap(),
        Value::Float(1.0)
    );
}

#[test]
fn test_avg_of_empty_bucket_is_null() {
    assert_eq!(
        Aggregate::Avg("x".to_string()).apply(&[]).unwrap(),
        Value::Null
    );
}

// ============================================================================
// Merge contract
// ============================================================================

fn partition_fixture() -> Vec<Value> {
    documents(
        r#"[{"v": 4}, {"v": -2}, {"v": 7.25}, {"v": 0},
            {"v": 3.5}, {"v": 11}, {"v": -0.25}, {"v": 2}]"#,
    )
}

#[test]
fn test_count_sum_merge_equals_direct_for_every_partition() {
    let docs = partition_fixture();
    let aggregates = [
        Aggregate::Count,
        Aggregate::Sum("v".to_string()),
    ];

    for agg in &aggregates {
        let direct = agg.eval(&docs).unwrap();
        for split in 0..=docs.len() {
            let first = agg.eval(&docs[..split]).unwrap();
            let second = agg.eval(&docs[split..]).unwrap();
            let merged = first.merge(second).unwrap();
            assert_eq!(merged, direct, "{} split at {}", agg.name(), split);
        }
    }
}

#[test]
fn test_min_max_merge_equals_direct_for_every_partition() {
    let docs = partition_fixture();
    let aggregates = [
        Aggregate::Min("v".to_string()),
        Aggregate::Max("v".to_string()),
    ];

    // min/max of an empty bucket is an error, so both sides stay non-empty
    for agg in &aggregates {
        let direct = agg.eval(&docs).unwrap();
        for split in 1..docs.len() {
            let first = agg.eval(&docs[..split]).unwrap();
            let second = agg.eval(&docs[split..]).unwrap();
            let merged = first.merge(second).unwrap();
            assert_eq!(merged, direct, "{} split at {}", agg.name(), split);
        }
    }
}

#[test]
fn test_avg_merge_matches_direct_within_tolerance() {
    // includes documents that only weigh the denominator
    let docs = documents(
        r#"[{"v": 4}, {"v": -2}, {"v": 7.25}, {},
            {"v": 3.5}, {"v": "text"}, {"v": -0.25}, {"v": 2}]"#,
    );
    let agg = Aggregate::Avg("v".to_string());

    let Value::Float(direct) = agg.apply(&docs).unwrap() else {
        panic!("expected a float average");
    };

    for split in 0..=docs.len() {
        let first = agg.eval(&docs[..split]).unwrap();
        let second = agg.eval(&docs[split..]).unwrap();
        let merged = first.merge(second).unwrap();

        let PartialState::Avg { mean, weight } = merged else {
            panic!("expected an avg state");
        };
        assert_eq!(weight, docs.len() as i64);
        let tolerance = 1e-9 * direct.abs().max(1.0);
        assert!(
            (mean - direct).abs() <= tolerance,
            "split at {}: {} vs {}",
            split,
            mean,
            direct
        );
    }
}

#[test]
fn test_sum_merge_keeps_integer_typing() {
    let docs = documents(r#"[{"v": 1}, {"v": 2}, {"v": 3}, {"v": 4}]"#);
    let agg = Aggregate::Sum("v".to_string());

    for split in 0..=docs.len() {
        let merged = agg
            .eval(&docs[..split])
            .unwrap()
            .merge(agg.eval(&docs[split..]).unwrap())
            .unwrap();
        assert_eq!(merged.finish(), Value::Integer(10));
    }
}

#[test]
fn test_merge_is_commutative() {
    let docs = partition_fixture();
    let agg = Aggregate::Sum("v".to_string());

    let a = agg.eval(&docs[..3]).unwrap();
    let b = agg.eval(&docs[3..]).unwrap();
    assert_eq!(
        a.clone().merge(b.clone()).unwrap(),
        b.merge(a).unwrap()
    );
}

#[test]
fn test_merging_mismatched_states_errors() {
    let count = PartialState::Count(1);
    let avg = PartialState::Avg {
        mean: 1.0,
        weight: 1,
    };
    assert!(matches!(
        count.merge(avg),
        Err(AggregateError::StateMismatch { .. })
    ));
}

#[test]
fn test_avg_merge_weight_is_bucket_size_not_numeric_count() {
    // one numeric value in a three-document bucket: the merge weight must
    // follow the bucket size so merged and direct averages agree
    let docs = documents(r#"[{"v": 6}, {}, {}]"#);
    let agg = Aggregate::Avg("v".to_string());

    let PartialState::Avg { mean, weight } = agg.eval(&docs).unwrap() else {
        panic!("expected an avg state");
    };
    assert_eq!(weight, 3);
    assert_eq!(mean, 2.0);
}

// ============================================================================
// Grouped aggregation
// ============================================================================

#[test]
fn test_grouped_sum_and_per_group_merge() {
    let all = Collection::new(
        parse(
            r#"[{"city": "NYC", "n": 1}, {"city": "LA", "n": 10},
                {"city": "NYC", "n": 2}, {"city": "LA", "n": 20}]"#,
        )
        .unwrap(),
    );
    let agg = Aggregate::Sum("n".to_string());

    let direct = all.aggregate("city", &agg).unwrap();
    assert_eq!(direct[&GroupKey::String("NYC".to_string())], Value::Integer(3));
    assert_eq!(direct[&GroupKey::String("LA".to_string())], Value::Integer(30));

    // the same result obtained from two chunked partial maps
    let docs = all.documents();
    let first = Collection::from_documents(docs[..2].to_vec())
        .aggregate_partial("city", &agg)
        .unwrap();
    let second = Collection::from_documents(docs[2..].to_vec())
        .aggregate_partial("city", &agg)
        .unwrap();

    for (key, expected) in direct {
        let merged = match (first.get(&key).cloned(), second.get(&key).cloned()) {
            (Some(a), Some(b)) => a.merge(b).unwrap(),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => panic!("group missing from both chunks"),
        };
        assert_eq!(merged.finish(), expected);
    }
}
