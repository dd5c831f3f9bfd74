//! [SPARQL](https://www.w3.org/TR/sparql11-overview/) front end of the evaluator.
//!
//! Queries are parsed with [spargebra] and rewritten into an [Algebra] tree once. The rewritten
//! tree is then evaluated by the [SimpleEvaluator](crate::SimpleEvaluator).

pub mod error;
mod eval;
mod rewriting;

use crate::context::CancellationToken;
use crate::eval::CustomFunction;
use crate::service::ServiceHandler;
use crate::sparql::error::QueryEvaluationError;
use crate::sparql::rewriting::GraphPatternRewriter;
use rdf_algebra_logical::Algebra;
use rdf_algebra_model::{Iri, NamedNode, Variable};
use rustc_hash::FxHashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub use eval::evaluate_query;
pub use spargebra::SparqlSyntaxError;

/// A parsed [SPARQL query](https://www.w3.org/TR/sparql11-query/) together with its algebra.
///
/// ```
/// use rdf_algebra_engine::Query;
///
/// let query = Query::parse("SELECT ?s WHERE { ?s ?p ?o } LIMIT 1", None)?;
/// assert_eq!(query.variables().map(|v| v.len()), Some(1));
/// # Ok::<_, rdf_algebra_engine::QueryEvaluationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    inner: spargebra::Query,
    algebra: Algebra,
    form: QueryForm,
}

/// The kind of result a [Query] produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryForm {
    /// A `SELECT` query projecting `variables`.
    Select {
        variables: Arc<[Variable]>,
        distinct: bool,
    },
    /// An `ASK` query.
    Ask,
}

impl Query {
    /// Parses a SPARQL query with an optional base IRI to resolve relative IRIs in the query.
    ///
    /// Only `SELECT` and `ASK` queries without a `FROM` dataset are supported.
    pub fn parse(query: &str, base_iri: Option<&str>) -> Result<Self, QueryEvaluationError> {
        let inner = spargebra::Query::parse(query, base_iri)?;
        Self::try_from(inner)
    }

    /// The algebra tree that is evaluated for this query.
    pub fn algebra(&self) -> &Algebra {
        &self.algebra
    }

    pub fn form(&self) -> &QueryForm {
        &self.form
    }

    /// The projected variables of a `SELECT` query.
    pub fn variables(&self) -> Option<&[Variable]> {
        match &self.form {
            QueryForm::Select { variables, .. } => Some(variables),
            QueryForm::Ask => None,
        }
    }

    /// The base IRI of the query, used to resolve relative IRIs passed to `IRI()`.
    pub fn base_iri(&self) -> Option<&Iri<String>> {
        match &self.inner {
            spargebra::Query::Select { base_iri, .. }
            | spargebra::Query::Ask { base_iri, .. }
            | spargebra::Query::Construct { base_iri, .. }
            | spargebra::Query::Describe { base_iri, .. } => base_iri.as_ref(),
        }
    }
}

impl TryFrom<spargebra::Query> for Query {
    type Error = QueryEvaluationError;

    fn try_from(inner: spargebra::Query) -> Result<Self, Self::Error> {
        let (pattern, dataset) = match &inner {
            spargebra::Query::Select {
                pattern, dataset, ..
            }
            | spargebra::Query::Ask {
                pattern, dataset, ..
            } => (pattern, dataset),
            spargebra::Query::Construct { .. } => {
                return Err(QueryEvaluationError::NotImplemented(
                    "CONSTRUCT queries".to_owned(),
                ))
            }
            spargebra::Query::Describe { .. } => {
                return Err(QueryEvaluationError::NotImplemented(
                    "DESCRIBE queries".to_owned(),
                ))
            }
        };
        if dataset.is_some() {
            return Err(QueryEvaluationError::NotImplemented(
                "FROM and FROM NAMED clauses".to_owned(),
            ));
        }

        let algebra = GraphPatternRewriter::default().rewrite(pattern)?;
        let form = match &inner {
            spargebra::Query::Ask { .. } => QueryForm::Ask,
            _ => {
                let (variables, distinct) = projection(&algebra);
                QueryForm::Select {
                    variables: variables.into(),
                    distinct,
                }
            }
        };
        Ok(Self {
            inner,
            algebra,
            form,
        })
    }
}

/// Finds the variables of the outermost projection and whether its solutions are distinct.
fn projection(algebra: &Algebra) -> (Vec<Variable>, bool) {
    match algebra {
        Algebra::Project { variables, .. } => (variables.clone(), false),
        Algebra::Distinct { inner } => (projection(inner).0, true),
        Algebra::Slice { inner, .. } | Algebra::Reduced { inner } => projection(inner),
        other => (other.projected_variables().into_iter().collect(), false),
    }
}

impl FromStr for Query {
    type Err = QueryEvaluationError;

    fn from_str(query: &str) -> Result<Self, Self::Err> {
        Self::parse(query, None)
    }
}

impl TryFrom<&str> for Query {
    type Error = QueryEvaluationError;

    fn try_from(query: &str) -> Result<Self, Self::Error> {
        Self::from_str(query)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// Options for SPARQL query evaluation.
#[derive(Clone, Default)]
pub struct QueryOptions {
    /// Aborts the evaluation after this duration.
    pub timeout: Option<Duration>,
    /// Allows aborting the evaluation from another thread.
    pub cancellation: CancellationToken,
    /// Evaluates `SERVICE` patterns. Without a handler, `SERVICE` fails unless it is `SILENT`.
    pub service_handler: Option<Arc<dyn ServiceHandler>>,
    /// Functions that can be called by their IRI.
    pub custom_functions: FxHashMap<NamedNode, CustomFunction>,
}

impl QueryOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancellation_token(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub fn with_service_handler(mut self, handler: Arc<dyn ServiceHandler>) -> Self {
        self.service_handler = Some(handler);
        self
    }

    /// Registers a custom function.
    ///
    /// ```
    /// use rdf_algebra_engine::QueryOptions;
    /// use rdf_algebra_model::{Literal, NamedNode, Term};
    /// use std::sync::Arc;
    ///
    /// let options = QueryOptions::default().with_custom_function(
    ///     NamedNode::new_unchecked("http://example.com/answer"),
    ///     Arc::new(|_: &[Term]| Some(Literal::from(42).into())),
    /// );
    /// assert_eq!(options.custom_functions.len(), 1);
    /// ```
    #[must_use]
    pub fn with_custom_function(mut self, name: NamedNode, function: CustomFunction) -> Self {
        self.custom_functions.insert(name, function);
        self
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("timeout", &self.timeout)
            .field("cancellation", &self.cancellation)
            .field("service_handler", &self.service_handler.is_some())
            .field("custom_functions", &self.custom_functions.keys())
            .finish()
    }
}
