//! The results of evaluating a [Query](crate::Query).

use crate::eval::SolutionIter;
use crate::sparql::error::QueryEvaluationError;
use rdf_algebra_model::{Term, Variable};
use sparesults::QueryResultsSerializer;
use std::io::Write;
use std::sync::Arc;

pub use sparesults::{QueryResultsFormat, QuerySolution};

/// Results of a [SPARQL query](https://www.w3.org/TR/sparql11-query/).
pub enum QueryResults<'a> {
    /// Results of a [SELECT](https://www.w3.org/TR/sparql11-query/#select) query.
    Solutions(QuerySolutionIter<'a>),
    /// Result of a [ASK](https://www.w3.org/TR/sparql11-query/#ask) query.
    Boolean(bool),
}

impl QueryResults<'_> {
    /// Writes the query results (solutions or boolean).
    pub fn write<W: Write>(
        self,
        writer: W,
        format: QueryResultsFormat,
    ) -> Result<W, QueryEvaluationError> {
        let serializer = QueryResultsSerializer::from_format(format);
        match self {
            Self::Boolean(value) => serializer.serialize_boolean_to_writer(writer, value),
            Self::Solutions(solutions) => {
                let mut serializer = serializer
                    .serialize_solutions_to_writer(writer, solutions.variables().to_vec())
                    .map_err(QueryEvaluationError::ResultsSerialization)?;
                for solution in solutions {
                    serializer
                        .serialize(&solution?)
                        .map_err(QueryEvaluationError::ResultsSerialization)?;
                }
                serializer.finish()
            }
        }
        .map_err(QueryEvaluationError::ResultsSerialization)
    }
}

impl<'a> From<QuerySolutionIter<'a>> for QueryResults<'a> {
    #[inline]
    fn from(value: QuerySolutionIter<'a>) -> Self {
        Self::Solutions(value)
    }
}

/// An iterator over [QuerySolution]s.
///
/// The solutions are already projected to [QuerySolutionIter::variables], in that order.
pub struct QuerySolutionIter<'a> {
    variables: Arc<[Variable]>,
    distinct: bool,
    inner: SolutionIter<'a>,
}

impl<'a> QuerySolutionIter<'a> {
    pub fn new(variables: Arc<[Variable]>, distinct: bool, inner: SolutionIter<'a>) -> Self {
        Self {
            variables,
            distinct,
            inner,
        }
    }

    /// The variables used in the solutions.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Whether the query asked for distinct solutions.
    #[inline]
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }
}

impl Iterator for QuerySolutionIter<'_> {
    type Item = Result<QuerySolution, QueryEvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        let solution = match self.inner.next()? {
            Ok(solution) => solution,
            Err(error) => return Some(Err(error)),
        };
        let values = self
            .variables
            .iter()
            .map(|variable| solution.get(variable).cloned())
            .collect::<Vec<Option<Term>>>();
        Some(Ok(QuerySolution::from((Arc::clone(&self.variables), values))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
