use crate::{evaluate, ex, knows_store, store, term_pattern, var};
use rdf_algebra_common::TripleStore;
use rdf_algebra_logical::{Algebra, PropertyPath};
use rdf_algebra_model::{Literal, Term};
use std::sync::Arc;

fn knows() -> PropertyPath {
    ex("knows").into()
}

fn targets(store: Arc<dyn TripleStore>, subject: &str, path: PropertyPath) -> Vec<Term> {
    let algebra = Algebra::path(term_pattern(subject), path, var("y").into());
    let mut targets = evaluate(store, &algebra)
        .into_iter()
        .map(|solution| solution.get(&var("y")).unwrap().clone())
        .collect::<Vec<_>>();
    targets.sort_by_key(ToString::to_string);
    targets
}

#[test]
fn zero_or_more_is_reflexive() {
    assert_eq!(
        targets(knows_store(), "a", PropertyPath::zero_or_more(knows())),
        vec![ex("a").into(), ex("b").into(), ex("c").into()]
    );
}

#[test]
fn zero_or_more_includes_unknown_start_node() {
    assert_eq!(
        targets(knows_store(), "d", PropertyPath::zero_or_more(knows())),
        vec![Term::from(ex("d"))]
    );
}

#[test]
fn one_or_more_is_transitive() {
    assert_eq!(
        targets(knows_store(), "a", PropertyPath::one_or_more(knows())),
        vec![ex("b").into(), ex("c").into()]
    );
}

#[test]
fn closure_terminates_on_cycles() {
    let store = store(&[
        ("a", "knows", ex("b").into()),
        ("b", "knows", ex("a").into()),
    ]);
    assert_eq!(
        targets(store, "a", PropertyPath::one_or_more(knows())),
        vec![ex("a").into(), ex("b").into()]
    );
}

#[test]
fn inverse_and_sequence() {
    assert_eq!(
        targets(knows_store(), "c", PropertyPath::inverse(knows())),
        vec![Term::from(ex("b"))]
    );
    assert_eq!(
        targets(knows_store(), "a", PropertyPath::sequence(knows(), knows())),
        vec![Term::from(ex("c"))]
    );
}

#[test]
fn alternative_keeps_duplicates() {
    let path = PropertyPath::alternative(knows(), knows());
    assert_eq!(targets(knows_store(), "a", path).len(), 2);
}

#[test]
fn negated_property_set() {
    let store = store(&[
        ("a", "knows", ex("b").into()),
        ("a", "name", Literal::from("A").into()),
    ]);
    assert_eq!(
        targets(store, "a", PropertyPath::NegatedPropertySet(vec![ex("knows")])),
        vec![Term::from(Literal::from("A"))]
    );
}

#[test]
fn unbound_zero_or_more_pairs() {
    let algebra = Algebra::path(
        var("x").into(),
        PropertyPath::zero_or_more(knows()),
        var("y").into(),
    );
    // (a,a) (b,b) (c,c) (a,b) (a,c) (b,c)
    assert_eq!(evaluate(knows_store(), &algebra).len(), 6);
}

#[test]
fn bound_endpoints_check_reachability() {
    let reachable = Algebra::path(
        term_pattern("a"),
        PropertyPath::one_or_more(knows()),
        term_pattern("c"),
    );
    let unreachable = Algebra::path(
        term_pattern("c"),
        PropertyPath::one_or_more(knows()),
        term_pattern("a"),
    );
    assert_eq!(evaluate(knows_store(), &reachable).len(), 1);
    assert!(evaluate(knows_store(), &unreachable).is_empty());
}
