use rdf_algebra_common::TripleStore;
use rdf_algebra_engine::{QueryEvaluationError, SimpleEvaluator};
use rdf_algebra_logical::Algebra;
use rdf_algebra_model::{
    GraphName, Literal, NamedNode, Quad, Solution, Term, TermPattern, TriplePattern, Variable,
};
use rdf_algebra_storage::memory::MemoryTripleStore;
use std::sync::Arc;

mod algebra;
mod cancellation;
mod failures;
mod graphs;
mod paths;
mod service;
mod sparql;

pub fn ex(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{name}"))
}

pub fn var(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

pub fn int(value: i64) -> Term {
    Literal::from(value).into()
}

/// Creates a store with the given triples in the default graph.
pub fn store(triples: &[(&str, &str, Term)]) -> Arc<dyn TripleStore> {
    store_with_quads(triples.iter().map(|(s, p, o)| {
        Quad::new(ex(s), ex(p), o.clone(), GraphName::DefaultGraph)
    }))
}

pub fn store_with_quads(quads: impl IntoIterator<Item = Quad>) -> Arc<dyn TripleStore> {
    let store = MemoryTripleStore::new();
    store.extend(quads).unwrap();
    Arc::new(store.snapshot().unwrap())
}

/// Parses a pattern like `?s knows ?o` or `a knows ?o`. Names without `?` are IRIs in the
/// example namespace.
pub fn pattern(subject: &str, predicate: &str, object: &str) -> TriplePattern {
    TriplePattern {
        subject: term_pattern(subject),
        predicate: ex(predicate).into(),
        object: term_pattern(object),
    }
}

pub fn term_pattern(value: &str) -> TermPattern {
    match value.strip_prefix('?') {
        Some(name) => var(name).into(),
        None => ex(value).into(),
    }
}

pub fn bgp(patterns: &[(&str, &str, &str)]) -> Algebra {
    Algebra::bgp(
        patterns
            .iter()
            .map(|(s, p, o)| pattern(s, p, o))
            .collect(),
    )
}

pub fn evaluate(store: Arc<dyn TripleStore>, algebra: &Algebra) -> Vec<Solution> {
    try_evaluate(store, algebra).unwrap()
}

pub fn try_evaluate(
    store: Arc<dyn TripleStore>,
    algebra: &Algebra,
) -> Result<Vec<Solution>, QueryEvaluationError> {
    SimpleEvaluator::new(store).evaluate(algebra).collect()
}

pub fn solution(bindings: &[(&str, Term)]) -> Solution {
    bindings
        .iter()
        .map(|(name, term)| (var(name), term.clone()))
        .collect()
}

/// The store used by most tests: a small social graph.
pub fn knows_store() -> Arc<dyn TripleStore> {
    store(&[
        ("a", "knows", ex("b").into()),
        ("b", "knows", ex("c").into()),
    ])
}
