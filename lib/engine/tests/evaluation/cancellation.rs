use crate::{bgp, knows_store};
use rdf_algebra_engine::{
    CancellationToken, ExecutionContext, QueryEvaluationError, SimpleEvaluator,
};
use rdf_algebra_logical::{Algebra, PropertyPath};
use std::time::Duration;

#[test]
fn cancelled_evaluation_reports_cancellation() {
    let token = CancellationToken::new();
    let evaluator = SimpleEvaluator::new(knows_store())
        .with_context(ExecutionContext::new(token.clone(), None));
    let algebra = bgp(&[("?x", "knows", "?y")]);

    let mut solutions = evaluator.evaluate(&algebra);
    assert!(solutions.next().unwrap().is_ok());

    token.cancel();
    let error = solutions.next().unwrap().unwrap_err();
    assert!(matches!(error, QueryEvaluationError::Cancelled));
    assert!(error.is_cancellation());
    assert!(solutions.next().is_none());
}

#[test]
fn expired_timeout_stops_path_evaluation() {
    let evaluator = SimpleEvaluator::new(knows_store()).with_context(ExecutionContext::new(
        CancellationToken::new(),
        Some(Duration::ZERO),
    ));
    let algebra = Algebra::path(
        crate::var("x").into(),
        PropertyPath::zero_or_more(crate::ex("knows").into()),
        crate::var("y").into(),
    );

    let results = evaluator.evaluate(&algebra).collect::<Vec<_>>();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(QueryEvaluationError::Timeout(_))));
}
