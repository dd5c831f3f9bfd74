use crate::{ex, example_quad, example_quad_in_graph};
use insta::assert_snapshot;
use rdf_algebra_common::TripleStore;
use rdf_algebra_model::{GraphName, GraphNameRef, Literal, NamedNode, Quad, TermRef};
use rdf_algebra_storage::memory::MemoryTripleStore;
use std::thread;

#[test]
fn insert_quad() {
    let store = MemoryTripleStore::new();

    let inserted = store.extend(vec![example_quad()]).unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn insert_duplicate_quad() {
    let store = MemoryTripleStore::new();

    let inserted = store.extend(vec![example_quad(), example_quad()]).unwrap();
    assert_eq!(inserted, 1);
    assert!(!store.insert(&example_quad()).unwrap());
}

#[test]
fn insert_quad_then_read() {
    let store = MemoryTripleStore::new();
    store.extend(vec![example_quad()]).unwrap();

    let triples = store
        .snapshot()
        .unwrap()
        .match_triples(GraphNameRef::DefaultGraph, None, None, None)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let triples = triples
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    assert_snapshot!(triples, @r#"<http://example.com/subject> <http://example.com/predicate> "value""#);
}

#[test]
fn match_with_bound_positions() {
    let store = MemoryTripleStore::new();
    store
        .extend([
            Quad::new(ex("a"), ex("knows"), ex("b"), GraphName::DefaultGraph),
            Quad::new(ex("b"), ex("knows"), ex("c"), GraphName::DefaultGraph),
            Quad::new(ex("a"), ex("name"), Literal::from("A"), GraphName::DefaultGraph),
        ])
        .unwrap();
    let snapshot = store.snapshot().unwrap();
    let a = ex("a");
    let knows = ex("knows");
    let c = ex("c");

    let count = |s: Option<TermRef<'_>>, p: Option<TermRef<'_>>, o: Option<TermRef<'_>>| {
        snapshot
            .match_triples(GraphNameRef::DefaultGraph, s, p, o)
            .count()
    };

    assert_eq!(count(None, None, None), 3);
    assert_eq!(count(Some(a.as_ref().into()), None, None), 2);
    assert_eq!(count(None, Some(knows.as_ref().into()), None), 2);
    assert_eq!(count(None, None, Some(c.as_ref().into())), 1);
    assert_eq!(
        count(Some(a.as_ref().into()), Some(knows.as_ref().into()), None),
        1
    );
    assert_eq!(
        count(Some(a.as_ref().into()), None, Some(c.as_ref().into())),
        0
    );
}

#[test]
fn match_unknown_term_yields_nothing() {
    let store = MemoryTripleStore::new();
    store.extend(vec![example_quad()]).unwrap();
    let unknown = NamedNode::new_unchecked("http://example.com/unknown");

    let count = store
        .snapshot()
        .unwrap()
        .match_triples(
            GraphNameRef::DefaultGraph,
            Some(unknown.as_ref().into()),
            None,
            None,
        )
        .count();
    assert_eq!(count, 0);
}

#[test]
fn match_literal_subject_yields_nothing() {
    let store = MemoryTripleStore::new();
    store.extend(vec![example_quad()]).unwrap();
    let literal = Literal::new_simple_literal("value");

    let count = store
        .snapshot()
        .unwrap()
        .match_triples(
            GraphNameRef::DefaultGraph,
            Some(literal.as_ref().into()),
            None,
            None,
        )
        .count();
    assert_eq!(count, 0);
}

#[test]
fn named_graphs_are_separate() {
    let store = MemoryTripleStore::new();
    store
        .extend(vec![
            example_quad(),
            example_quad_in_graph("http://example.com/g1"),
            example_quad_in_graph("http://example.com/g2"),
        ])
        .unwrap();
    let snapshot = store.snapshot().unwrap();

    let graphs = snapshot.named_graphs().unwrap();
    assert_eq!(graphs.len(), 2);
    assert!(snapshot
        .contains_named_graph(NamedNode::new_unchecked("http://example.com/g1").as_ref().into())
        .unwrap());

    let g1 = NamedNode::new_unchecked("http://example.com/g1");
    let in_g1 = snapshot
        .match_triples(GraphNameRef::NamedNode(g1.as_ref()), None, None, None)
        .count();
    assert_eq!(in_g1, 1);
}

#[test]
fn empty_named_graph() {
    let store = MemoryTripleStore::new();
    let graph = NamedNode::new_unchecked("http://example.com/empty");
    assert!(store.insert_named_graph(graph.as_ref()).unwrap());

    let snapshot = store.snapshot().unwrap();
    assert!(snapshot.contains_named_graph(graph.as_ref().into()).unwrap());
    assert!(snapshot.is_empty());
}

#[test]
fn snapshot_is_isolated_from_writes() {
    let store = MemoryTripleStore::new();
    store.extend(vec![example_quad()]).unwrap();

    let snapshot = store.snapshot().unwrap();
    store
        .extend(vec![example_quad_in_graph("http://example.com/g")])
        .unwrap();
    assert!(store.remove(&example_quad()).unwrap());

    assert_eq!(snapshot.len(), 1);
    assert_eq!(store.len().unwrap(), 1);
    assert!(snapshot.named_graphs().unwrap().is_empty());
}

#[test]
fn concurrent_readers() {
    let store = MemoryTripleStore::new();
    store
        .extend((0..100).map(|i| {
            Quad::new(
                ex("s"),
                ex("value"),
                Literal::from(i),
                GraphName::DefaultGraph,
            )
        }))
        .unwrap();
    let snapshot = store.snapshot().unwrap();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let count = snapshot
                    .match_triples(GraphNameRef::DefaultGraph, None, None, None)
                    .count();
                assert_eq!(count, 100);
            });
        }
    });
}

#[test]
fn scan_outlives_snapshot_and_ignores_later_writes() {
    let store = MemoryTripleStore::new();
    store
        .extend([
            Quad::new(ex("a"), ex("p"), ex("b"), GraphName::DefaultGraph),
            Quad::new(ex("b"), ex("p"), ex("c"), GraphName::DefaultGraph),
        ])
        .unwrap();

    let mut scan = store
        .snapshot()
        .unwrap()
        .match_triples(GraphNameRef::DefaultGraph, None, None, None);
    let first = scan.next().unwrap().unwrap();
    store
        .insert(&Quad::new(ex("c"), ex("p"), ex("d"), GraphName::DefaultGraph))
        .unwrap();
    let rest = scan.collect::<Result<Vec<_>, _>>().unwrap();

    assert_eq!(first.subject.to_string(), "<http://example.com/a>");
    assert_eq!(rest.len(), 1);
}

#[test]
fn clear_removes_quads_and_named_graphs() {
    let store = MemoryTripleStore::new();
    store
        .extend(vec![example_quad(), example_quad_in_graph("http://example.com/g")])
        .unwrap();
    let before_clear = store.snapshot().unwrap();

    store.clear().unwrap();
    assert!(store.is_empty().unwrap());
    assert!(store.snapshot().unwrap().named_graphs().unwrap().is_empty());
    assert_eq!(before_clear.named_graphs().unwrap().len(), 1);

    assert!(store.insert(&example_quad()).unwrap());
    assert_eq!(store.len().unwrap(), 1);
}
