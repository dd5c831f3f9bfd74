use crate::{bgp, evaluate, ex, solution, store_with_quads, var};
use rdf_algebra_common::TripleStore;
use rdf_algebra_engine::SimpleEvaluator;
use rdf_algebra_logical::{Algebra, Expression};
use rdf_algebra_model::{GraphName, NamedNodePattern, Quad, Solution};
use std::sync::Arc;

fn graph_store() -> Arc<dyn TripleStore> {
    store_with_quads([
        Quad::new(ex("a"), ex("knows"), ex("b"), ex("g1")),
        Quad::new(ex("b"), ex("knows"), ex("c"), ex("g2")),
        Quad::new(ex("c"), ex("knows"), ex("d"), GraphName::DefaultGraph),
    ])
}

fn graph_variable(inner: Algebra) -> Algebra {
    Algebra::named_graph(NamedNodePattern::Variable(var("g")), inner)
}

fn sorted_by_graph(mut solutions: Vec<Solution>) -> Vec<Solution> {
    solutions.sort_by_key(|solution| solution.get(&var("g")).map(ToString::to_string));
    solutions
}

#[test]
fn constant_graph_restricts_patterns() {
    let algebra = Algebra::named_graph(ex("g1").into(), bgp(&[("?s", "knows", "?o")]));
    assert_eq!(
        evaluate(graph_store(), &algebra),
        vec![solution(&[("s", ex("a").into()), ("o", ex("b").into())])]
    );
}

#[test]
fn graph_variable_iterates_named_graphs() {
    let algebra = graph_variable(bgp(&[("?s", "knows", "?o")]));
    assert_eq!(
        sorted_by_graph(evaluate(graph_store(), &algebra)),
        vec![
            solution(&[
                ("s", ex("a").into()),
                ("o", ex("b").into()),
                ("g", ex("g1").into()),
            ]),
            solution(&[
                ("s", ex("b").into()),
                ("o", ex("c").into()),
                ("g", ex("g2").into()),
            ]),
        ]
    );
}

#[test]
fn bound_graph_variable_selects_one_graph() {
    let algebra = graph_variable(bgp(&[("?s", "knows", "?o")]));
    let seed = solution(&[("g", ex("g2").into())]);
    let solutions = SimpleEvaluator::new(graph_store())
        .evaluate_from(&algebra, seed)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        solutions,
        vec![solution(&[
            ("s", ex("b").into()),
            ("o", ex("c").into()),
            ("g", ex("g2").into()),
        ])]
    );
}

#[test]
fn graph_variable_is_not_visible_inside_the_pattern() {
    let filtered = Algebra::filter(
        bgp(&[("?s", "knows", "?o")]),
        vec![Expression::Not(Box::new(Expression::Bound(var("g"))))],
    )
    .unwrap();
    assert_eq!(evaluate(graph_store(), &graph_variable(filtered)).len(), 2);

    let extended = Algebra::extend(
        bgp(&[("?s", "knows", "?o")]),
        vec![(var("x"), Expression::Variable(var("g")))],
    )
    .unwrap();
    let solutions = evaluate(graph_store(), &graph_variable(extended));
    assert_eq!(solutions.len(), 2);
    assert!(solutions
        .iter()
        .all(|solution| !solution.contains(&var("x")) && solution.contains(&var("g"))));
}

#[test]
fn graph_bound_by_the_pattern_must_match() {
    let algebra = graph_variable(bgp(&[("?g", "knows", "?o")]));
    assert!(evaluate(graph_store(), &algebra).is_empty());
}
