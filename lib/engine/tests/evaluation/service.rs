use crate::{bgp, ex, int, knows_store, solution, store, try_evaluate, var};
use rdf_algebra_engine::{LocalServiceHandler, QueryEvaluationError, SimpleEvaluator};
use rdf_algebra_logical::Algebra;
use rdf_algebra_model::{NamedNodePattern, Solution};
use std::sync::Arc;

fn evaluator() -> SimpleEvaluator {
    let remote = store(&[("x", "val", int(1))]);
    let handler = LocalServiceHandler::new().with_service(ex("remote"), remote);
    SimpleEvaluator::new(knows_store()).with_service_handler(Arc::new(handler))
}

fn service(name: NamedNodePattern, silent: bool) -> Algebra {
    Algebra::service(name, bgp(&[("?s", "val", "?v")]), silent)
}

#[test]
fn service_is_delegated_to_handler() {
    let algebra = service(ex("remote").into(), false);
    let solutions = evaluator()
        .evaluate(&algebra)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        solutions,
        vec![solution(&[("s", ex("x").into()), ("v", int(1))])]
    );
}

#[test]
fn service_without_handler_fails() {
    let algebra = service(ex("remote").into(), false);
    assert!(matches!(
        try_evaluate(knows_store(), &algebra),
        Err(QueryEvaluationError::UnsupportedService(_))
    ));
}

#[test]
fn silent_service_without_handler_keeps_input() {
    let algebra = service(ex("remote").into(), true);
    let solutions = try_evaluate(knows_store(), &algebra).unwrap();
    assert_eq!(solutions, vec![Solution::new()]);
}

#[test]
fn silent_service_failure_keeps_input() {
    let algebra = service(ex("missing").into(), true);
    let solutions = evaluator()
        .evaluate(&algebra)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(solutions, vec![Solution::new()]);
}

#[test]
fn failing_service_is_fatal() {
    let algebra = service(ex("missing").into(), false);
    let result = evaluator().evaluate(&algebra).collect::<Result<Vec<_>, _>>();
    assert!(matches!(result, Err(QueryEvaluationError::Service(_))));
}

#[test]
fn service_name_from_variable() {
    let algebra = service(var("endpoint").into(), false);
    assert!(matches!(
        try_evaluate(knows_store(), &algebra),
        Err(QueryEvaluationError::UnboundService)
    ));

    let seed = solution(&[("endpoint", ex("remote").into())]);
    let solutions = evaluator()
        .evaluate_from(&algebra, seed)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get(&var("endpoint")), Some(&ex("remote").into()));
}
