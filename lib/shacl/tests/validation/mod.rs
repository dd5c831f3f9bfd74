use oxrdfio::{RdfFormat, RdfParser};
use rdf_algebra_logical::PropertyPath;
use rdf_algebra_model::vocab::{sh, xsd};
use rdf_algebra_model::{Literal, NamedNode, Term};
use rdf_algebra_shacl::{
    Severity, ShaclError, ShaclValidator, Shapes, ValidationReport, ValidatorOptions,
};
use rdf_algebra_storage::memory::{MemoryStoreSnapshot, MemoryTripleStore};
use std::sync::Arc;

const PREFIXES: &str = "
    @prefix ex: <http://example.com/> .
    @prefix sh: <http://www.w3.org/ns/shacl#> .
    @prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
    @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
    @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
";

fn load(turtle: &str) -> MemoryStoreSnapshot {
    let store = MemoryTripleStore::new();
    let quads = RdfParser::from_format(RdfFormat::Turtle)
        .for_reader(format!("{PREFIXES}{turtle}").as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    store.extend(quads).unwrap();
    store.snapshot().unwrap()
}

fn validator(shapes: &str) -> ShaclValidator {
    ShaclValidator::new(Shapes::parse(&load(shapes)).unwrap())
}

fn validate(shapes: &str, data: &str) -> ValidationReport {
    validator(shapes).validate(Arc::new(load(data))).unwrap()
}

fn ex(name: &str) -> Term {
    NamedNode::new_unchecked(format!("http://example.com/{name}")).into()
}

fn ex_node(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{name}"))
}

const PERSON_SHAPE: &str = "
    ex:PersonShape a sh:NodeShape ;
        sh:targetClass ex:Person ;
        sh:property [ sh:path ex:name ; sh:minCount 1 ] .
";

#[test]
fn missing_values_violate_min_count() {
    let report = validate(
        PERSON_SHAPE,
        "ex:alice a ex:Person ; ex:name \"Alice\" .
        ex:bob a ex:Person .",
    );

    assert!(!report.conforms());
    let [result] = report.results() else {
        unreachable!("expected exactly one result");
    };
    assert_eq!(result.focus_node, ex("bob"));
    assert_eq!(result.result_path, Some(ex_node("name").into()));
    assert_eq!(result.value, None);
    assert_eq!(result.source_constraint_component, sh::MIN_COUNT_CONSTRAINT_COMPONENT);
    assert_eq!(result.severity, Severity::Violation);
}

#[test]
fn conforming_data_produces_an_empty_report() {
    let report = validate(PERSON_SHAPE, "ex:alice a ex:Person ; ex:name \"Alice\" .");
    assert!(report.conforms());
    assert!(report.results().is_empty());
}

#[test]
fn conforms_stops_at_the_first_violation() {
    let data = load("ex:alice a ex:Person . ex:bob a ex:Person .");
    assert!(!validator(PERSON_SHAPE).conforms(Arc::new(data)).unwrap());
}

#[test]
fn single_nodes_can_be_validated_against_a_shape() {
    let validator = validator(PERSON_SHAPE);
    let shape = validator.shapes().find(&ex("PersonShape")).unwrap();
    let data = Arc::new(load("ex:carol ex:age 3 ."));

    let report = validator.validate_node(data, &ex("carol"), shape).unwrap();
    assert_eq!(report.results().len(), 1);
}

#[test]
fn class_constraints_include_subclasses() {
    let report = validate(
        "ex:S sh:targetNode ex:alice ;
            sh:property [ sh:path ex:friend ; sh:class ex:Person ] .",
        "ex:Student rdfs:subClassOf ex:Person .
        ex:alice ex:friend ex:bob, ex:carol .
        ex:bob a ex:Student .",
    );

    let [result] = report.results() else {
        unreachable!("expected exactly one result");
    };
    assert_eq!(result.value, Some(ex("carol")));
    assert_eq!(result.source_constraint_component, sh::CLASS_CONSTRAINT_COMPONENT);
}

#[test]
fn datatypes_require_well_formed_literals() {
    let report = validate(
        "ex:S sh:targetNode ex:alice ;
            sh:property [ sh:path ex:age ; sh:datatype xsd:integer ] .",
        "ex:alice ex:age 42, \"abc\"^^xsd:integer, \"42\" .",
    );

    let mut values = report
        .results()
        .iter()
        .filter_map(|result| result.value.as_ref().map(ToString::to_string))
        .collect::<Vec<_>>();
    values.sort();
    insta::assert_debug_snapshot!(values, @r#"
    [
        "\"42\"",
        "\"abc\"^^<http://www.w3.org/2001/XMLSchema#integer>",
    ]
    "#);
}

#[test]
fn patterns_are_matched_against_values() {
    let report = validate(
        "ex:S sh:targetNode ex:alice ;
            sh:property [ sh:path ex:email ; sh:pattern \"^[^@]+@[^@]+$\" ] .",
        "ex:alice ex:email \"alice@example.com\", \"nope\" .",
    );

    let [result] = report.results() else {
        unreachable!("expected exactly one result");
    };
    assert_eq!(result.value, Some(Literal::from("nope").into()));
}

#[test]
fn languages_are_restricted_and_unique() {
    let report = validate(
        "ex:S sh:targetNode ex:alice ;
            sh:property [ sh:path ex:label ; sh:languageIn ( \"en\" ) ; sh:uniqueLang true ] .",
        "ex:alice ex:label \"a\"@en, \"b\"@en, \"c\"@fr .",
    );

    let mut components = report
        .results()
        .iter()
        .map(|result| result.source_constraint_component.as_str().to_owned())
        .collect::<Vec<_>>();
    components.sort();
    assert_eq!(
        components,
        [
            sh::LANGUAGE_IN_CONSTRAINT_COMPONENT.as_str(),
            sh::UNIQUE_LANG_CONSTRAINT_COMPONENT.as_str(),
        ]
    );
}

#[test]
fn property_pairs_are_compared() {
    let report = validate(
        "ex:S sh:targetNode ex:event ;
            sh:property [ sh:path ex:start ; sh:lessThan ex:end ] .",
        "ex:event ex:start 5 ; ex:end 3 .",
    );

    let [result] = report.results() else {
        unreachable!("expected exactly one result");
    };
    assert_eq!(result.source_constraint_component, sh::LESS_THAN_CONSTRAINT_COMPONENT);
}

#[test]
fn closed_shapes_report_unexpected_predicates() {
    let report = validate(
        "ex:S sh:targetNode ex:alice ;
            sh:closed true ;
            sh:ignoredProperties ( rdf:type ) ;
            sh:property [ sh:path ex:name ] .",
        "ex:alice a ex:Person ; ex:name \"Alice\" ; ex:secret \"x\" .",
    );

    let [result] = report.results() else {
        unreachable!("expected exactly one result");
    };
    assert_eq!(result.focus_node, ex("alice"));
    assert_eq!(
        result.result_path,
        Some(PropertyPath::Predicate(ex_node("secret")))
    );
    assert_eq!(result.value, Some(Literal::from("x").into()));
}

#[test]
fn qualified_value_shapes_count_conforming_values() {
    let report = validate(
        "ex:HandShape sh:targetNode ex:hand ;
            sh:property [
                sh:path ex:digit ;
                sh:qualifiedValueShape [ sh:class ex:Thumb ] ;
                sh:qualifiedMinCount 1 ;
                sh:qualifiedMaxCount 1
            ] .",
        "ex:hand ex:digit ex:d1, ex:d2 .
        ex:d1 a ex:Thumb .
        ex:d2 a ex:Thumb .",
    );

    let [result] = report.results() else {
        unreachable!("expected exactly one result");
    };
    assert_eq!(
        result.source_constraint_component,
        sh::QUALIFIED_MAX_COUNT_CONSTRAINT_COMPONENT
    );
}

#[test]
fn logical_constraints_combine_shapes() {
    let report = validate(
        "ex:NotB sh:targetNode ex:a, ex:b ; sh:not [ sh:hasValue ex:b ] .
        ex:Typed sh:targetNode ex:x, 42 ;
            sh:or ( [ sh:datatype xsd:integer ] [ sh:datatype xsd:string ] ) .",
        "ex:a ex:p ex:b .",
    );

    let mut results = report
        .results()
        .iter()
        .map(|result| {
            (
                result.focus_node.to_string(),
                result.source_constraint_component.to_string(),
            )
        })
        .collect::<Vec<_>>();
    results.sort();
    insta::assert_debug_snapshot!(results, @r#"
    [
        (
            "<http://example.com/b>",
            "<http://www.w3.org/ns/shacl#NotConstraintComponent>",
        ),
        (
            "<http://example.com/x>",
            "<http://www.w3.org/ns/shacl#OrConstraintComponent>",
        ),
    ]
    "#);
}

#[test]
fn deactivated_shapes_are_ignored() {
    let report = validate(
        "ex:S sh:targetNode ex:a ; sh:deactivated true ; sh:hasValue ex:b .",
        "ex:a ex:p ex:b .",
    );
    assert!(report.conforms());
}

#[test]
fn severities_and_messages_are_reported() {
    let report = validate(
        "ex:S sh:targetNode ex:a ;
            sh:severity sh:Warning ;
            sh:message \"Must be b\"@en ;
            sh:hasValue ex:b .",
        "ex:a ex:p ex:b .",
    );

    let [result] = report.results() else {
        unreachable!("expected exactly one result");
    };
    assert_eq!(result.severity, Severity::Warning);
    assert_eq!(
        result.messages,
        [Literal::new_language_tagged_literal_unchecked("Must be b", "en")]
    );
}

#[test]
fn sparql_constraints_bind_this() {
    let report = validate(
        "ex:ns sh:declare [ sh:prefix \"ex\" ; sh:namespace \"http://example.com/\"^^xsd:anyURI ] .
        ex:AdultShape sh:targetClass ex:Person ;
            sh:sparql ex:adult .
        ex:adult sh:prefixes ex:ns ;
            sh:message \"{$this} is {?value} years old\" ;
            sh:select \"SELECT $this ?value WHERE { $this ex:age ?value . FILTER (?value < 18) }\" .",
        "ex:alice a ex:Person ; ex:age 30 .
        ex:bob a ex:Person ; ex:age 12 .",
    );

    let [result] = report.results() else {
        unreachable!("expected exactly one result");
    };
    assert_eq!(result.focus_node, ex("bob"));
    assert_eq!(result.source_constraint_component, sh::SPARQL_CONSTRAINT_COMPONENT);
    assert_eq!(result.source_constraint, Some(ex("adult")));
    insta::assert_snapshot!(result.messages[0].value(), @"<http://example.com/bob> is 12 years old");
}

#[test]
fn sparql_constraints_must_project_this() {
    let result = Shapes::parse(&load(
        "ex:S sh:targetNode ex:a ;
            sh:sparql [ sh:select \"SELECT ?x WHERE { ?x ?p ?o }\" ] .",
    ));
    assert!(matches!(result, Err(ShaclError::MissingThisProjection(_))));
}

#[test]
fn constraint_components_use_ask_validators() {
    let report = validate(
        "ex:MaxAgeComponent a sh:ConstraintComponent ;
            sh:parameter [ sh:path ex:maxAge ] ;
            sh:validator [
                a sh:SPARQLAskValidator ;
                sh:message \"{$value} is older than {$maxAge}\" ;
                sh:ask \"ASK { FILTER ($value <= $maxAge) }\"
            ] .
        ex:S sh:targetNode ex:alice ;
            sh:property [ sh:path ex:age ; ex:maxAge 65 ] .",
        "ex:alice ex:age 70, 40 .",
    );

    let [result] = report.results() else {
        unreachable!("expected exactly one result");
    };
    assert_eq!(result.source_constraint_component, ex_node("MaxAgeComponent"));
    assert_eq!(
        result.value,
        Some(Literal::new_typed_literal("70", xsd::INTEGER).into())
    );
    insta::assert_snapshot!(result.messages[0].value(), @"70 is older than 65");
}

const RECURSIVE_SHAPE: &str = "
    ex:PersonShape sh:targetNode ex:alice ;
        sh:property [ sh:path ex:knows ; sh:node ex:PersonShape ] .
";

#[test]
fn recursive_shapes_terminate() {
    let report = validate(
        RECURSIVE_SHAPE,
        "ex:alice ex:knows ex:bob . ex:bob ex:knows ex:alice .",
    );
    assert!(report.conforms());
}

#[test]
fn nesting_beyond_the_limit_fails() {
    let validator = validator(RECURSIVE_SHAPE)
        .with_options(ValidatorOptions::default().with_max_recursion_depth(1));
    let result = validator.validate(Arc::new(load("ex:alice ex:knows ex:bob .")));
    assert!(matches!(result, Err(ShaclError::RecursionLimit(1))));
}

#[test]
fn reports_are_written_as_triples() {
    let report = validate(PERSON_SHAPE, "ex:bob a ex:Person .");

    let triples = report.to_triples();
    let results = triples
        .iter()
        .filter(|triple| triple.predicate == sh::RESULT)
        .count();
    assert_eq!(results, 1);
    assert!(triples
        .iter()
        .any(|triple| triple.predicate == sh::CONFORMS
            && triple.object == Term::from(Literal::from(false))));
}
