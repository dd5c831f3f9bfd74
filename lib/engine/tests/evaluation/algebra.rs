use crate::{bgp, evaluate, ex, int, knows_store, solution, store, try_evaluate, var};
use rdf_algebra_engine::{QueryEvaluationError, SimpleEvaluator};
use rdf_algebra_logical::{
    AggregateExpression, Algebra, AlgebraError, Expression, OrderCondition,
};
use rdf_algebra_common::TripleStore;
use rdf_algebra_model::{Literal, Solution, Term};
use std::sync::Arc;

fn people_store() -> Arc<dyn TripleStore> {
    store(&[
        ("alice", "type", ex("Person").into()),
        ("bob", "type", ex("Person").into()),
        ("alice", "age", int(30)),
    ])
}

fn values_store() -> Arc<dyn TripleStore> {
    store(&[
        ("s1", "val", int(5)),
        ("s2", "val", int(3)),
        ("s3", "val", int(1)),
        ("s4", "val", int(4)),
        ("s5", "val", int(2)),
    ])
}

fn values_of(solutions: &[Solution], name: &str) -> Vec<Term> {
    solutions
        .iter()
        .map(|solution| solution.get(&var(name)).unwrap().clone())
        .collect()
}

#[test]
fn join_follows_shared_variable() {
    let algebra = Algebra::Join {
        left: Box::new(bgp(&[("?x", "knows", "?y")])),
        right: Box::new(bgp(&[("?y", "knows", "?z")])),
    };

    let solutions = evaluate(knows_store(), &algebra);
    assert_eq!(
        solutions,
        vec![solution(&[
            ("x", ex("a").into()),
            ("y", ex("b").into()),
            ("z", ex("c").into()),
        ])]
    );
}

#[test]
fn join_with_materialized_right_side() {
    let right = Algebra::filter(
        bgp(&[("?y", "knows", "?z")]),
        vec![Expression::Bound(var("z"))],
    )
    .unwrap();
    let algebra = Algebra::join(bgp(&[("?x", "knows", "?y")]), right);

    let solutions = evaluate(knows_store(), &algebra);
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get(&var("z")), Some(&ex("c").into()));
}

#[test]
fn join_with_unit_is_identity() {
    let inner = bgp(&[("?x", "knows", "?y")]);
    assert_eq!(Algebra::join(inner.clone(), Algebra::unit()), inner);
    assert_eq!(Algebra::join(Algebra::unit(), inner.clone()), inner);
}

#[test]
fn left_join_keeps_unmatched_solutions() {
    let algebra = Algebra::left_join(
        bgp(&[("?s", "type", "Person")]),
        bgp(&[("?s", "age", "?age")]),
        None,
    );

    let mut solutions = evaluate(people_store(), &algebra);
    solutions.sort_by_key(|solution| solution.get(&var("s")).map(ToString::to_string));
    assert_eq!(
        solutions,
        vec![
            solution(&[("s", ex("alice").into()), ("age", int(30))]),
            solution(&[("s", ex("bob").into())]),
        ]
    );
}

#[test]
fn left_join_with_failing_condition_keeps_left_solution() {
    let algebra = Algebra::left_join(
        bgp(&[("?s", "type", "Person")]),
        bgp(&[("?s", "age", "?age")]),
        Some(Expression::greater(var("age").into(), int_expression(40))),
    );

    let solutions = evaluate(people_store(), &algebra);
    assert_eq!(solutions.len(), 2);
    assert!(solutions
        .iter()
        .all(|solution| solution.get(&var("age")).is_none()));
}

#[test]
fn left_join_with_materialized_right_side() {
    let right = Algebra::project(bgp(&[("?s", "age", "?age")]), vec![var("s"), var("age")]);
    let algebra = Algebra::left_join(bgp(&[("?s", "type", "Person")]), right, None);

    let solutions = evaluate(people_store(), &algebra);
    assert_eq!(solutions.len(), 2);
    assert_eq!(
        solutions
            .iter()
            .filter(|solution| solution.get(&var("age")).is_some())
            .count(),
        1
    );
}

#[test]
fn union_preserves_duplicates() {
    let inner = bgp(&[("?x", "knows", "?y")]);
    let algebra = Algebra::union(inner.clone(), inner);
    assert_eq!(evaluate(knows_store(), &algebra).len(), 4);
}

#[test]
fn minus_with_disjoint_variables_is_no_op() {
    let store = store(&[
        ("a", "knows", ex("b").into()),
        ("b", "knows", ex("c").into()),
        ("c", "val", int(1)),
    ]);
    let left = bgp(&[("?x", "knows", "?y")]);
    let algebra = Algebra::minus(left.clone(), bgp(&[("?a", "val", "?b")]));

    assert_eq!(
        evaluate(store.clone(), &algebra),
        evaluate(store, &left)
    );
}

#[test]
fn minus_removes_compatible_solutions() {
    let algebra = Algebra::minus(
        bgp(&[("?x", "knows", "?y")]),
        bgp(&[("?x", "knows", "c")]),
    );

    let solutions = evaluate(knows_store(), &algebra);
    assert_eq!(values_of(&solutions, "x"), vec![ex("a").into()]);
}

#[test]
fn minus_with_seed_keeps_the_seed_on_left_solutions() {
    let algebra = Algebra::minus(
        bgp(&[("?s", "knows", "?o")]),
        bgp(&[("?s", "knows", "?z")]),
    );
    let seed = solution(&[("z", ex("c").into())]);

    let solutions = SimpleEvaluator::new(knows_store())
        .evaluate_from(&algebra, seed)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        solutions,
        vec![solution(&[
            ("s", ex("a").into()),
            ("o", ex("b").into()),
            ("z", ex("c").into()),
        ])]
    );
}

#[test]
fn slice_of_ordered_values() {
    let algebra = Algebra::slice(
        Algebra::order_by(
            bgp(&[("?s", "val", "?v")]),
            vec![OrderCondition::Asc(var("v").into())],
        )
        .unwrap(),
        1,
        Some(2),
    );

    let solutions = evaluate(values_store(), &algebra);
    assert_eq!(values_of(&solutions, "v"), vec![int(2), int(3)]);
}

#[test]
fn nested_slices_are_idempotent() {
    let ordered = Algebra::order_by(
        bgp(&[("?s", "val", "?v")]),
        vec![OrderCondition::Asc(var("v").into())],
    )
    .unwrap();
    let once = Algebra::slice(ordered.clone(), 0, Some(2));
    let twice = Algebra::slice(Algebra::slice(ordered, 0, Some(2)), 0, Some(3));

    assert_eq!(
        evaluate(values_store(), &once),
        evaluate(values_store(), &twice)
    );
}

#[test]
fn top_n_keeps_best_solutions() {
    let algebra = Algebra::top_n(
        bgp(&[("?s", "val", "?v")]),
        vec![OrderCondition::Desc(var("v").into())],
        2,
    )
    .unwrap();

    let solutions = evaluate(values_store(), &algebra);
    assert_eq!(values_of(&solutions, "v"), vec![int(5), int(4)]);
}

#[test]
fn distinct_is_idempotent() {
    let projected = Algebra::project(
        Algebra::union(bgp(&[("?x", "knows", "?y")]), bgp(&[("?x", "knows", "?y")])),
        vec![var("x")],
    );
    let once = Algebra::distinct(projected.clone());
    let twice = Algebra::distinct(Algebra::distinct(projected));

    let once = evaluate(knows_store(), &once);
    assert_eq!(once.len(), 2);
    assert_eq!(once, evaluate(knows_store(), &twice));
}

#[test]
fn filter_errors_remove_solutions() {
    let algebra = Algebra::filter(
        bgp(&[("?s", "val", "?v")]),
        vec![Expression::greater(var("v").into(), ex("a").into())],
    )
    .unwrap();
    assert!(evaluate(values_store(), &algebra).is_empty());
}

#[test]
fn extend_does_not_overwrite_bindings() {
    let algebra = Algebra::extend(
        bgp(&[("?x", "knows", "?y")]),
        vec![
            (var("y"), ex("other").into()),
            (var("z"), var("x").into()),
        ],
    )
    .unwrap();

    for solution in evaluate(knows_store(), &algebra) {
        assert_ne!(solution.get(&var("y")), Some(&ex("other").into()));
        assert_eq!(solution.get(&var("z")), solution.get(&var("x")));
    }
}

#[test]
fn table_seeds_join() {
    let table = Algebra::table(
        vec![var("x")],
        vec![
            solution(&[("x", ex("a").into())]),
            solution(&[("x", ex("c").into())]),
        ],
    )
    .unwrap();
    let algebra = Algebra::join(table, bgp(&[("?x", "knows", "?y")]));

    let solutions = evaluate(knows_store(), &algebra);
    assert_eq!(
        solutions,
        vec![solution(&[("x", ex("a").into()), ("y", ex("b").into())])]
    );
}

#[test]
fn group_without_keys_on_empty_input() {
    let algebra = Algebra::group(
        bgp(&[("?x", "unknown", "?y")]),
        Vec::new(),
        vec![(
            var("count"),
            AggregateExpression::CountSolutions { distinct: false },
        )],
    )
    .unwrap();

    assert_eq!(
        evaluate(knows_store(), &algebra),
        vec![solution(&[("count", int(0))])]
    );
}

#[test]
fn group_by_key() {
    let algebra = Algebra::group(
        Algebra::union(bgp(&[("?x", "knows", "?y")]), bgp(&[("?x", "knows", "?y")])),
        vec![var("x")],
        vec![(
            var("count"),
            AggregateExpression::CountSolutions { distinct: true },
        )],
    )
    .unwrap();

    let solutions = evaluate(knows_store(), &algebra);
    assert_eq!(solutions.len(), 2);
    assert!(solutions
        .iter()
        .all(|solution| solution.get(&var("count")) == Some(&int(1))));
}

#[test]
fn invalid_nodes_are_fatal() {
    let algebra = Algebra::TopN {
        inner: Box::new(bgp(&[("?s", "val", "?v")])),
        conditions: vec![OrderCondition::Asc(var("v").into())],
        n: 0,
    };

    let result = try_evaluate(values_store(), &algebra);
    assert!(matches!(
        result,
        Err(QueryEvaluationError::InvalidAlgebra(AlgebraError::InvalidTopN))
    ));
}

fn int_expression(value: i64) -> Expression {
    Literal::from(value).into()
}
