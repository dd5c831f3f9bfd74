mod parser;

use crate::sparql::{ComponentConstraint, SparqlConstraint};
use rdf_algebra_logical::PropertyPath;
use rdf_algebra_model::vocab::sh;
use rdf_algebra_model::{Literal, NamedNode, NamedNodeRef, Term};
use regex::Regex;
use std::fmt;

/// Identifies a shape within its [Shapes](crate::Shapes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(usize);

impl ShapeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node shape or a property shape.
///
/// Property shapes have a [path](Self::path). Their value nodes are the nodes reachable from the
/// focus node via that path. The single value node of a node shape is the focus node itself.
#[derive(Debug, Clone)]
pub struct Shape {
    node: Term,
    path: Option<PropertyPath>,
    targets: Vec<Target>,
    constraints: Vec<Constraint>,
    severity: Severity,
    messages: Vec<Literal>,
    deactivated: bool,
}

impl Shape {
    pub(crate) fn new(node: Term) -> Self {
        Self {
            node,
            path: None,
            targets: Vec::new(),
            constraints: Vec::new(),
            severity: Severity::Violation,
            messages: Vec::new(),
            deactivated: false,
        }
    }

    /// The node of the shapes graph that defines this shape.
    pub fn node(&self) -> &Term {
        &self.node
    }

    /// The path of a property shape.
    pub fn path(&self) -> Option<&PropertyPath> {
        self.path.as_ref()
    }

    pub fn is_property_shape(&self) -> bool {
        self.path.is_some()
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn severity(&self) -> &Severity {
        &self.severity
    }

    /// The `sh:message` values of the shape. They replace the messages of all results that the
    /// shape produces.
    pub fn messages(&self) -> &[Literal] {
        &self.messages
    }

    /// Deactivated shapes are conformed to by every node.
    pub fn is_deactivated(&self) -> bool {
        self.deactivated
    }
}

/// Selects the focus nodes of a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `sh:targetNode`
    Node(Term),
    /// `sh:targetClass`, including instances of subclasses. Shapes that are also classes target
    /// their instances implicitly.
    Class(Term),
    /// `sh:targetSubjectsOf`
    SubjectsOf(NamedNode),
    /// `sh:targetObjectsOf`
    ObjectsOf(NamedNode),
}

/// The severity of the results that a shape produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Violation,
    /// A severity that is not defined by SHACL.
    Other(NamedNode),
}

impl Severity {
    pub(crate) fn from_node(node: NamedNode) -> Self {
        if node == sh::INFO {
            Self::Info
        } else if node == sh::WARNING {
            Self::Warning
        } else if node == sh::VIOLATION {
            Self::Violation
        } else {
            Self::Other(node)
        }
    }

    pub fn as_node(&self) -> NamedNodeRef<'_> {
        match self {
            Self::Info => sh::INFO,
            Self::Warning => sh::WARNING,
            Self::Violation => sh::VIOLATION,
            Self::Other(node) => node.as_ref(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("Info"),
            Self::Warning => f.write_str("Warning"),
            Self::Violation => f.write_str("Violation"),
            Self::Other(node) => write!(f, "{node}"),
        }
    }
}

/// The values of `sh:nodeKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    BlankNode,
    Iri,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    pub(crate) fn from_node(node: &Term) -> Option<Self> {
        let Term::NamedNode(node) = node else {
            return None;
        };
        [
            (sh::BLANK_NODE, Self::BlankNode),
            (sh::IRI, Self::Iri),
            (sh::LITERAL, Self::Literal),
            (sh::BLANK_NODE_OR_IRI, Self::BlankNodeOrIri),
            (sh::BLANK_NODE_OR_LITERAL, Self::BlankNodeOrLiteral),
            (sh::IRI_OR_LITERAL, Self::IriOrLiteral),
        ]
        .into_iter()
        .find_map(|(candidate, kind)| (*node == candidate).then_some(kind))
    }

    pub fn matches(self, term: &Term) -> bool {
        match term {
            Term::NamedNode(_) => matches!(
                self,
                Self::Iri | Self::BlankNodeOrIri | Self::IriOrLiteral
            ),
            Term::BlankNode(_) => matches!(
                self,
                Self::BlankNode | Self::BlankNodeOrIri | Self::BlankNodeOrLiteral
            ),
            Term::Literal(_) => matches!(
                self,
                Self::Literal | Self::BlankNodeOrLiteral | Self::IriOrLiteral
            ),
        }
    }

    pub fn as_node(self) -> NamedNodeRef<'static> {
        match self {
            Self::BlankNode => sh::BLANK_NODE,
            Self::Iri => sh::IRI,
            Self::Literal => sh::LITERAL,
            Self::BlankNodeOrIri => sh::BLANK_NODE_OR_IRI,
            Self::BlankNodeOrLiteral => sh::BLANK_NODE_OR_LITERAL,
            Self::IriOrLiteral => sh::IRI_OR_LITERAL,
        }
    }
}

/// A constraint that is attached to a shape.
///
/// Each variant corresponds to one constraint component of SHACL Core or SHACL-SPARQL.
#[derive(Debug, Clone)]
pub enum Constraint {
    Class(Term),
    Datatype(NamedNode),
    NodeKind(NodeKind),
    MinCount(u64),
    MaxCount(u64),
    MinExclusive(Term),
    MinInclusive(Term),
    MaxExclusive(Term),
    MaxInclusive(Term),
    MinLength(u64),
    MaxLength(u64),
    Pattern {
        regex: Regex,
        pattern: String,
        flags: Option<String>,
    },
    LanguageIn(Vec<String>),
    UniqueLang,
    Equals(NamedNode),
    Disjoint(NamedNode),
    LessThan(NamedNode),
    LessThanOrEquals(NamedNode),
    Not(ShapeId),
    And(Vec<ShapeId>),
    Or(Vec<ShapeId>),
    Xone(Vec<ShapeId>),
    Node(ShapeId),
    Property(ShapeId),
    QualifiedValueShape {
        shape: ShapeId,
        min_count: Option<u64>,
        max_count: Option<u64>,
        /// The qualified value shapes of the sibling property shapes if
        /// `sh:qualifiedValueShapesDisjoint` is set.
        siblings: Option<Vec<ShapeId>>,
    },
    Closed {
        ignored_properties: Vec<NamedNode>,
    },
    HasValue(Term),
    In(Vec<Term>),
    Sparql(SparqlConstraint),
    Component(ComponentConstraint),
}

impl Constraint {
    /// The constraint component that is reported as `sh:sourceConstraintComponent`.
    pub fn component(&self) -> NamedNodeRef<'_> {
        match self {
            Self::Class(_) => sh::CLASS_CONSTRAINT_COMPONENT,
            Self::Datatype(_) => sh::DATATYPE_CONSTRAINT_COMPONENT,
            Self::NodeKind(_) => sh::NODE_KIND_CONSTRAINT_COMPONENT,
            Self::MinCount(_) => sh::MIN_COUNT_CONSTRAINT_COMPONENT,
            Self::MaxCount(_) => sh::MAX_COUNT_CONSTRAINT_COMPONENT,
            Self::MinExclusive(_) => sh::MIN_EXCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MinInclusive(_) => sh::MIN_INCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MaxExclusive(_) => sh::MAX_EXCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MaxInclusive(_) => sh::MAX_INCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MinLength(_) => sh::MIN_LENGTH_CONSTRAINT_COMPONENT,
            Self::MaxLength(_) => sh::MAX_LENGTH_CONSTRAINT_COMPONENT,
            Self::Pattern { .. } => sh::PATTERN_CONSTRAINT_COMPONENT,
            Self::LanguageIn(_) => sh::LANGUAGE_IN_CONSTRAINT_COMPONENT,
            Self::UniqueLang => sh::UNIQUE_LANG_CONSTRAINT_COMPONENT,
            Self::Equals(_) => sh::EQUALS_CONSTRAINT_COMPONENT,
            Self::Disjoint(_) => sh::DISJOINT_CONSTRAINT_COMPONENT,
            Self::LessThan(_) => sh::LESS_THAN_CONSTRAINT_COMPONENT,
            Self::LessThanOrEquals(_) => sh::LESS_THAN_OR_EQUALS_CONSTRAINT_COMPONENT,
            Self::Not(_) => sh::NOT_CONSTRAINT_COMPONENT,
            Self::And(_) => sh::AND_CONSTRAINT_COMPONENT,
            Self::Or(_) => sh::OR_CONSTRAINT_COMPONENT,
            Self::Xone(_) => sh::XONE_CONSTRAINT_COMPONENT,
            Self::Node(_) => sh::NODE_CONSTRAINT_COMPONENT,
            Self::Property(_) => sh::PROPERTY_CONSTRAINT_COMPONENT,
            Self::QualifiedValueShape { min_count, .. } => {
                if min_count.is_some() {
                    sh::QUALIFIED_MIN_COUNT_CONSTRAINT_COMPONENT
                } else {
                    sh::QUALIFIED_MAX_COUNT_CONSTRAINT_COMPONENT
                }
            }
            Self::Closed { .. } => sh::CLOSED_CONSTRAINT_COMPONENT,
            Self::HasValue(_) => sh::HAS_VALUE_CONSTRAINT_COMPONENT,
            Self::In(_) => sh::IN_CONSTRAINT_COMPONENT,
            Self::Sparql(_) => sh::SPARQL_CONSTRAINT_COMPONENT,
            Self::Component(component) => component.component().as_ref(),
        }
    }
}

/// The shapes of a shapes graph.
///
/// Shapes refer to each other by [ShapeId]. References may be cyclic.
#[derive(Debug, Clone, Default)]
pub struct Shapes {
    entries: Vec<Shape>,
}

impl Shapes {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.entries.get(id.index())
    }

    /// Returns the shape that is defined by `node`.
    pub fn find(&self, node: &Term) -> Option<ShapeId> {
        self.entries
            .iter()
            .position(|shape| shape.node == *node)
            .map(ShapeId::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, shape)| (ShapeId::new(index), shape))
    }

    pub(crate) fn shape(&self, id: ShapeId) -> &Shape {
        &self.entries[id.index()]
    }
}
