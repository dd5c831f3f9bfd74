use crate::shape::ShapeId;
use rdf_algebra_common::error::StorageError;
use rdf_algebra_engine::QueryEvaluationError;
use rdf_algebra_model::Term;

/// A fatal error of the shape validation.
///
/// A focus node that violates a constraint is not an error. It is recorded in the
/// [ValidationReport](crate::ValidationReport). This type reports problems with the shapes graph
/// itself or failures of the underlying store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShaclError {
    #[error("The shape {shape} is invalid: {message}")]
    InvalidShape { shape: Term, message: String },
    #[error("The SHACL path {0} is malformed")]
    InvalidPath(Term),
    #[error("The list starting at {0} is malformed")]
    InvalidList(Term),
    #[error("The SPARQL query of {node} is invalid: {source}")]
    InvalidSparql {
        node: Term,
        #[source]
        source: QueryEvaluationError,
    },
    #[error("The SELECT query of {0} does not project the variable $this")]
    MissingThisProjection(Term),
    #[error("The prefix declaration {0} is malformed")]
    InvalidPrefixDeclaration(Term),
    #[error("The SPARQL constraint {0} reported a failure")]
    SparqlFailure(Term),
    #[error("The shape {0} does not exist")]
    UnknownShape(ShapeId),
    #[error("The validation exceeded the maximum shape nesting depth of {0}")]
    RecursionLimit(usize),
    #[error(transparent)]
    Evaluation(#[from] QueryEvaluationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ShaclError {
    pub(crate) fn invalid_shape(shape: &Term, message: impl Into<String>) -> Self {
        Self::InvalidShape {
            shape: shape.clone(),
            message: message.into(),
        }
    }
}
