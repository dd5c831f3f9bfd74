use rdf_algebra_model::Variable;
use thiserror::Error;

/// An error that indicates a malformed algebra tree.
///
/// These errors are raised when constructing a node and again when the evaluator encounters an
/// invalid node that has been assembled by hand.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AlgebraError {
    #[error("{0} requires at least one expression.")]
    EmptyExpressionList(&'static str),
    #[error("TopN requires n >= 1.")]
    InvalidTopN,
    #[error("Variable {0} is bound more than once in a single Extend.")]
    DuplicateAssignment(Variable),
    #[error("Table row binds variable {0} that is not declared by the table.")]
    UndeclaredTableVariable(Variable),
    #[error("Variable {0} is used both as a group key and as an aggregate target.")]
    GroupVariableConflict(Variable),
}
