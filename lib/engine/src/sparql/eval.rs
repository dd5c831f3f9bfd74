use crate::context::ExecutionContext;
use crate::eval::SimpleEvaluator;
use crate::results::{QueryResults, QuerySolutionIter};
use crate::sparql::error::QueryEvaluationError;
use crate::sparql::{Query, QueryForm, QueryOptions};
use rdf_algebra_common::TripleStore;
use std::sync::Arc;
use tracing::debug;

/// Evaluates `query` against `store`.
///
/// `SELECT` solutions are produced lazily while the returned iterator is consumed. The timeout of
/// `options` starts counting when this function is called. `ASK` queries stop after the first
/// solution.
pub fn evaluate_query<'a>(
    store: Arc<dyn TripleStore>,
    query: &'a Query,
    options: QueryOptions,
) -> Result<QueryResults<'a>, QueryEvaluationError> {
    let timeout = options.timeout;
    let mut evaluator = SimpleEvaluator::from_options(store, options);
    if let Some(base_iri) = query.base_iri() {
        evaluator = evaluator.with_base_iri(base_iri.clone());
    }

    debug!(?timeout, "Evaluating query");
    match query.form() {
        QueryForm::Select {
            variables,
            distinct,
        } => Ok(QueryResults::Solutions(QuerySolutionIter::new(
            Arc::clone(variables),
            *distinct,
            evaluator.evaluate(query.algebra()),
        ))),
        QueryForm::Ask => {
            let result = evaluator.evaluate(query.algebra()).next().transpose()?;
            debug!(result = result.is_some(), "Evaluated ASK query");
            Ok(QueryResults::Boolean(result.is_some()))
        }
    }
}

impl SimpleEvaluator {
    /// Creates an evaluator that honors the timeout, cancellation token, service handler, and
    /// custom functions of `options`.
    pub fn from_options(store: Arc<dyn TripleStore>, options: QueryOptions) -> Self {
        let QueryOptions {
            timeout,
            cancellation,
            service_handler,
            custom_functions,
        } = options;

        let mut evaluator = Self::new(store)
            .with_context(ExecutionContext::new(cancellation, timeout));
        if let Some(handler) = service_handler {
            evaluator = evaluator.with_service_handler(handler);
        }
        for (name, function) in custom_functions {
            evaluator = evaluator.with_custom_function(name, function);
        }
        evaluator
    }
}
