mod error;
mod solution;
pub mod vocab;

pub use error::*;
pub use solution::Solution;

// Re-export some oxrdf types.
pub use oxiri::Iri;
pub use oxrdf::{
    BlankNode, BlankNodeRef, Graph, GraphName, GraphNameRef, IriParseError, Literal, LiteralRef,
    NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, QuadRef, Subject,
    SubjectRef, Term, TermRef, Triple, TripleRef, Variable, VariableNameParseError, VariableRef,
};
// Re-export the XSD value types used by the expression evaluator.
pub use oxsdatatypes::{Boolean, Decimal, Double, Integer};
// Pattern terms may contain variables. These are shared with the SPARQL parser.
pub use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};

/// Converts a [Subject] into a [Term].
pub fn subject_to_term(subject: Subject) -> Term {
    match subject {
        Subject::NamedNode(node) => node.into(),
        Subject::BlankNode(node) => node.into(),
    }
}

/// Tries to convert a [Term] into a [NamedOrBlankNode]. Literals cannot be converted.
pub fn term_to_named_or_blank(term: &Term) -> Option<NamedOrBlankNode> {
    match term {
        Term::NamedNode(node) => Some(node.clone().into()),
        Term::BlankNode(node) => Some(node.clone().into()),
        Term::Literal(_) => None,
    }
}

/// Converts a [NamedOrBlankNode] into a [Term].
pub fn named_or_blank_to_term(node: NamedOrBlankNode) -> Term {
    match node {
        NamedOrBlankNode::NamedNode(node) => node.into(),
        NamedOrBlankNode::BlankNode(node) => node.into(),
    }
}
