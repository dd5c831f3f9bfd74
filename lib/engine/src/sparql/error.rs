use rdf_algebra_common::error::StorageError;
use rdf_algebra_logical::AlgebraError;
use rdf_algebra_model::{NamedNode, Term};
use spargebra::SparqlSyntaxError;
use std::convert::Infallible;
use std::error::Error;
use std::io;
use std::time::Duration;

/// A fatal error that aborts the evaluation of a query.
///
/// Expected errors during expression evaluation (e.g., comparing an IRI with a number) are not
/// reported through this type. They only affect the solution in which they occur.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error in SPARQL parsing.
    #[error(transparent)]
    Parsing(#[from] SparqlSyntaxError),
    /// An error from the storage while evaluating the given operation.
    #[error("store access failed during {operation} evaluation: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: StorageError,
    },
    /// The evaluation was cancelled by the caller.
    #[error("The query evaluation has been cancelled")]
    Cancelled,
    /// The evaluation exceeded its time budget.
    #[error("The query evaluation exceeded its timeout of {0:?}")]
    Timeout(Duration),
    /// The algebra tree contains a malformed node.
    #[error("Invalid algebra node: {0}")]
    InvalidAlgebra(#[from] AlgebraError),
    /// Error during `SERVICE` evaluation
    #[error("{0}")]
    Service(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// The variable storing the `SERVICE` name is unbound
    #[error("The variable encoding the service name is unbound")]
    UnboundService,
    /// Invalid service name
    #[error("{0} is not a valid service name")]
    InvalidServiceName(Term),
    /// The given `SERVICE` is not supported
    #[error("The service {0} is not supported")]
    UnsupportedService(NamedNode),
    /// An error returned during results serialization.
    #[error(transparent)]
    ResultsSerialization(io::Error),
    #[error("A feature has not yet been implemented: {0}")]
    NotImplemented(String),
}

impl QueryEvaluationError {
    /// Wraps a storage error that occurred while evaluating `operation`.
    pub fn storage(operation: &'static str, source: impl Into<StorageError>) -> Self {
        Self::Storage {
            operation,
            source: source.into(),
        }
    }

    /// Returns whether the error was caused by a cancellation or a timeout.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout(_))
    }
}

impl From<Infallible> for QueryEvaluationError {
    #[inline]
    fn from(error: Infallible) -> Self {
        match error {}
    }
}
