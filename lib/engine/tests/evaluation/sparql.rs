use crate::{ex, int, knows_store, store};
use rdf_algebra_common::TripleStore;
use rdf_algebra_engine::results::{QueryResultsFormat, QuerySolution};
use rdf_algebra_engine::{evaluate_query, Query, QueryEvaluationError, QueryOptions, QueryResults};
use rdf_algebra_logical::Algebra;
use rdf_algebra_model::{Literal, Term};
use std::sync::Arc;

const PREFIX: &str = "PREFIX ex: <http://example.com/>\n";

fn select(store: Arc<dyn TripleStore>, query: &str) -> Vec<QuerySolution> {
    let query = Query::parse(&format!("{PREFIX}{query}"), None).unwrap();
    let QueryResults::Solutions(solutions) =
        evaluate_query(store, &query, QueryOptions::default()).unwrap()
    else {
        panic!("Expected solutions");
    };
    solutions.collect::<Result<Vec<_>, _>>().unwrap()
}

fn ask(store: Arc<dyn TripleStore>, query: &str) -> bool {
    let query = Query::parse(&format!("{PREFIX}{query}"), None).unwrap();
    let QueryResults::Boolean(result) =
        evaluate_query(store, &query, QueryOptions::default()).unwrap()
    else {
        panic!("Expected a boolean");
    };
    result
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

#[test]
fn select_projects_variables_in_order() {
    let solutions = select(
        knows_store(),
        "SELECT ?z ?x WHERE { ?x ex:knows ?y . ?y ex:knows ?z }",
    );
    assert_eq!(solutions.len(), 1);
    let variables = solutions[0]
        .variables()
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>();
    assert_eq!(variables, ["z", "x"]);
    assert_eq!(solutions[0].get("x"), Some(&Term::from(ex("a"))));
    assert_eq!(solutions[0].get("z"), Some(&Term::from(ex("c"))));
}

#[test]
fn order_by_with_limit_and_offset() {
    let solutions = select(
        values_store(),
        "SELECT ?v WHERE { ?s ex:val ?v } ORDER BY ?v LIMIT 2 OFFSET 1",
    );
    let values = solutions
        .iter()
        .map(|solution| solution.get("v").cloned())
        .collect::<Vec<_>>();
    assert_eq!(values, vec![Some(int(2)), Some(int(3))]);
}

#[test]
fn order_by_with_limit_is_rewritten_to_top_n() {
    let query = format!("{PREFIX}SELECT ?v WHERE {{ ?s ex:val ?v }} ORDER BY DESC(?v) LIMIT 1");
    let query = Query::parse(&query, None).unwrap();
    let Algebra::Project { inner, .. } = query.algebra() else {
        panic!("Expected a projection");
    };
    assert_eq!(inner.name(), "TopN");
}

#[test]
fn optional_and_bound() {
    let store = store(&[
        ("alice", "type", ex("Person").into()),
        ("bob", "type", ex("Person").into()),
        ("alice", "age", int(30)),
    ]);
    let solutions = select(
        store,
        "SELECT ?s WHERE { ?s ex:type ex:Person OPTIONAL { ?s ex:age ?age } FILTER(!BOUND(?age)) }",
    );
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get("s"), Some(&Term::from(ex("bob"))));
}

#[test]
fn filter_not_exists() {
    let solutions = select(
        knows_store(),
        "SELECT ?x WHERE { ?x ex:knows ?y FILTER NOT EXISTS { ?y ex:knows ?z } }",
    );
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get("x"), Some(&Term::from(ex("b"))));
}

#[test]
fn aggregates_over_groups() {
    let solutions = select(
        values_store(),
        "SELECT (COUNT(*) AS ?count) (SUM(?v) AS ?sum) (MAX(?v) AS ?max) WHERE { ?s ex:val ?v }",
    );
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get("count"), Some(&int(5)));
    assert_eq!(solutions[0].get("sum"), Some(&int(15)));
    assert_eq!(solutions[0].get("max"), Some(&int(5)));
}

#[test]
fn count_on_empty_input_is_zero() {
    let solutions = select(
        knows_store(),
        "SELECT (COUNT(*) AS ?count) WHERE { ?s ex:unknown ?o }",
    );
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get("count"), Some(&int(0)));
}

#[test]
fn values_with_unbound_cells() {
    let solutions = select(
        knows_store(),
        "SELECT ?x ?y WHERE { VALUES (?x ?y) { (ex:a UNDEF) (ex:b ex:a) } ?x ex:knows ?y }",
    );
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get("y"), Some(&Term::from(ex("b"))));
}

#[test]
fn bind_and_string_functions() {
    let store = store(&[("a", "name", Literal::from("alice").into())]);
    let solutions = select(
        store,
        "SELECT ?upper WHERE { ?s ex:name ?n BIND(UCASE(?n) AS ?upper) }",
    );
    assert_eq!(
        solutions[0].get("upper"),
        Some(&Term::from(Literal::from("ALICE")))
    );
}

#[test]
fn property_path_query() {
    let solutions = select(knows_store(), "SELECT ?y WHERE { ex:a ex:knows+ ?y }");
    assert_eq!(solutions.len(), 2);
}

#[test]
fn blank_nodes_are_not_projected() {
    let solutions = select(knows_store(), "SELECT * WHERE { _:b ex:knows ?y }");
    assert_eq!(solutions.len(), 2);
    assert_eq!(solutions[0].variables().len(), 1);
}

#[test]
fn ask_query() {
    assert!(ask(knows_store(), "ASK { ex:a ex:knows ex:b }"));
    assert!(!ask(knows_store(), "ASK { ex:a ex:knows ex:c }"));
}

#[test]
fn distinct_flag_is_reported() {
    let query = Query::parse("SELECT DISTINCT ?x WHERE { ?x ?p ?o }", None).unwrap();
    let QueryResults::Solutions(solutions) =
        evaluate_query(knows_store(), &query, QueryOptions::default()).unwrap()
    else {
        panic!("Expected solutions");
    };
    assert!(solutions.is_distinct());
    assert_eq!(solutions.count(), 2);
}

#[test]
fn custom_function_is_called() {
    let options = QueryOptions::default().with_custom_function(
        ex("double"),
        Arc::new(|args: &[Term]| match args {
            [Term::Literal(literal)] => {
                let value = literal.value().parse::<i64>().ok()?;
                Some(Literal::from(value * 2).into())
            }
            _ => None,
        }),
    );
    let query = format!(
        "{PREFIX}SELECT ?d WHERE {{ ?s ex:val ?v BIND(ex:double(?v) AS ?d) }} ORDER BY ?d LIMIT 1"
    );
    let query = Query::parse(&query, None).unwrap();
    let QueryResults::Solutions(mut solutions) =
        evaluate_query(values_store(), &query, options).unwrap()
    else {
        panic!("Expected solutions");
    };
    assert_eq!(solutions.next().unwrap().unwrap().get("d"), Some(&int(2)));
}

#[test]
fn unsupported_queries_are_rejected() {
    assert!(matches!(
        Query::parse("CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }", None),
        Err(QueryEvaluationError::NotImplemented(_))
    ));
    assert!(matches!(
        Query::parse("SELECT * FROM <http://example.com/g> WHERE { ?s ?p ?o }", None),
        Err(QueryEvaluationError::NotImplemented(_))
    ));
    assert!(matches!(
        Query::parse("SELECT * WHERE { ?s ?p }", None),
        Err(QueryEvaluationError::Parsing(_))
    ));
}

#[test]
fn results_are_serialized() {
    let query = Query::parse("ASK { ?s ?p ?o }", None).unwrap();
    let results = evaluate_query(knows_store(), &query, QueryOptions::default()).unwrap();
    let json = results
        .write(Vec::new(), QueryResultsFormat::Json)
        .unwrap();
    assert!(String::from_utf8(json).unwrap().contains("true"));

    let query = format!("{PREFIX}SELECT ?x WHERE {{ ?x ex:knows ex:c }}");
    let query = Query::parse(&query, None).unwrap();
    let results = evaluate_query(knows_store(), &query, QueryOptions::default()).unwrap();
    let tsv = results.write(Vec::new(), QueryResultsFormat::Tsv).unwrap();
    assert!(String::from_utf8(tsv)
        .unwrap()
        .contains("<http://example.com/b>"));
}

#[test]
fn ordered_values_as_tsv() {
    let query = format!("{PREFIX}SELECT ?s ?v WHERE {{ ?s ex:val ?v }} ORDER BY DESC(?v) LIMIT 3");
    let query = Query::parse(&query, None).unwrap();
    let results = evaluate_query(values_store(), &query, QueryOptions::default()).unwrap();
    let tsv = results.write(Vec::new(), QueryResultsFormat::Tsv).unwrap();
    insta::assert_snapshot!(String::from_utf8(tsv).unwrap(), @r"
    ?s	?v
    <http://example.com/s1>	5
    <http://example.com/s4>	4
    <http://example.com/s2>	3
    ");
}
