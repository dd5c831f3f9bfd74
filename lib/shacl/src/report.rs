use crate::shape::Severity;
use rdf_algebra_logical::PropertyPath;
use rdf_algebra_model::vocab::{rdf, sh};
use rdf_algebra_model::{BlankNode, Literal, NamedNode, NamedNodeRef, Term, Triple};

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// The focus node that was validated.
    pub focus_node: Term,
    /// The path of the property shape, or the predicate that violates a closed shape.
    pub result_path: Option<PropertyPath>,
    /// The value node that violates the constraint. Cardinality constraints have none.
    pub value: Option<Term>,
    pub source_shape: Term,
    pub source_constraint_component: NamedNode,
    /// The node that defines a `sh:sparql` constraint.
    pub source_constraint: Option<Term>,
    pub severity: Severity,
    pub messages: Vec<Literal>,
}

/// The outcome of a validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new(results: Vec<ValidationResult>) -> Self {
        Self { results }
    }

    /// The data conforms if no constraint is violated, regardless of the severities.
    pub fn conforms(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// Returns the report as an RDF graph using the SHACL vocabulary.
    ///
    /// The report and its results are blank nodes.
    pub fn to_triples(&self) -> Vec<Triple> {
        let mut triples = Vec::new();
        let report = BlankNode::default();
        triples.push(Triple::new(
            report.clone(),
            rdf::TYPE,
            sh::VALIDATION_REPORT.into_owned(),
        ));
        triples.push(Triple::new(
            report.clone(),
            sh::CONFORMS,
            Literal::from(self.conforms()),
        ));
        for result in &self.results {
            let node = BlankNode::default();
            triples.push(Triple::new(report.clone(), sh::RESULT, node.clone()));
            result.write_triples(&node, &mut triples);
        }
        triples
    }
}

impl ValidationResult {
    fn write_triples(&self, node: &BlankNode, triples: &mut Vec<Triple>) {
        let mut add = |predicate: NamedNodeRef<'_>, object: Term| {
            triples.push(Triple::new(node.clone(), predicate, object));
        };
        add(rdf::TYPE, sh::VALIDATION_RESULT.into_owned().into());
        add(sh::FOCUS_NODE, self.focus_node.clone());
        if let Some(value) = &self.value {
            add(sh::VALUE, value.clone());
        }
        add(sh::SOURCE_SHAPE, self.source_shape.clone());
        add(
            sh::SOURCE_CONSTRAINT_COMPONENT,
            self.source_constraint_component.clone().into(),
        );
        if let Some(constraint) = &self.source_constraint {
            add(sh::SOURCE_CONSTRAINT, constraint.clone());
        }
        add(sh::RESULT_SEVERITY, self.severity.as_node().into_owned().into());
        for message in &self.messages {
            add(sh::RESULT_MESSAGE, message.clone().into());
        }
        if let Some(path) = &self.result_path {
            let path = path_node(path, triples);
            triples.push(Triple::new(node.clone(), sh::RESULT_PATH, path));
        }
    }
}

/// Writes the SHACL representation of `path` and returns its root node.
fn path_node(path: &PropertyPath, triples: &mut Vec<Triple>) -> Term {
    match path {
        PropertyPath::Predicate(predicate) => predicate.clone().into(),
        PropertyPath::Inverse(inner) => nested(sh::INVERSE_PATH, inner, triples),
        PropertyPath::ZeroOrMore(inner) => nested(sh::ZERO_OR_MORE_PATH, inner, triples),
        PropertyPath::OneOrMore(inner) => nested(sh::ONE_OR_MORE_PATH, inner, triples),
        PropertyPath::ZeroOrOne(inner) => nested(sh::ZERO_OR_ONE_PATH, inner, triples),
        PropertyPath::Sequence(..) => {
            let mut members = Vec::new();
            sequence_members(path, &mut members);
            let members = members
                .into_iter()
                .map(|member| path_node(member, triples))
                .collect();
            list(members, triples)
        }
        PropertyPath::Alternative(..) => {
            let mut members = Vec::new();
            alternative_members(path, &mut members);
            let members = members
                .into_iter()
                .map(|member| path_node(member, triples))
                .collect();
            let list = list(members, triples);
            let node = BlankNode::default();
            triples.push(Triple::new(node.clone(), sh::ALTERNATIVE_PATH, list));
            node.into()
        }
        // SHACL paths cannot express negated property sets.
        PropertyPath::NegatedPropertySet(_) => Literal::new_simple_literal(path.to_string()).into(),
    }
}

fn nested(predicate: NamedNodeRef<'_>, inner: &PropertyPath, triples: &mut Vec<Triple>) -> Term {
    let object = path_node(inner, triples);
    let node = BlankNode::default();
    triples.push(Triple::new(node.clone(), predicate, object));
    node.into()
}

fn sequence_members<'p>(path: &'p PropertyPath, members: &mut Vec<&'p PropertyPath>) {
    if let PropertyPath::Sequence(lhs, rhs) = path {
        sequence_members(lhs, members);
        sequence_members(rhs, members);
    } else {
        members.push(path);
    }
}

fn alternative_members<'p>(path: &'p PropertyPath, members: &mut Vec<&'p PropertyPath>) {
    if let PropertyPath::Alternative(lhs, rhs) = path {
        alternative_members(lhs, members);
        alternative_members(rhs, members);
    } else {
        members.push(path);
    }
}

/// Writes an RDF list and returns its head.
fn list(members: Vec<Term>, triples: &mut Vec<Triple>) -> Term {
    let mut head = Term::from(rdf::NIL.into_owned());
    for member in members.into_iter().rev() {
        let node = BlankNode::default();
        triples.push(Triple::new(node.clone(), rdf::FIRST, member));
        triples.push(Triple::new(node.clone(), rdf::REST, head));
        head = node.into();
    }
    head
}
