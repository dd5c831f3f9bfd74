use crate::eval::SimpleEvaluator;
use rdf_algebra_common::TripleStore;
use rdf_algebra_logical::Algebra;
use rdf_algebra_model::{NamedNode, Solution};
use rustc_hash::FxHashMap;
use std::error::Error;
use std::sync::Arc;

/// The error type of a [ServiceHandler].
pub type ServiceError = Box<dyn Error + Send + Sync + 'static>;

/// The solutions returned by a [ServiceHandler].
pub type ServiceSolutions = Box<dyn Iterator<Item = Result<Solution, ServiceError>>>;

/// Evaluates the patterns of `SERVICE` clauses.
///
/// The evaluator never contacts remote endpoints on its own. Users that want federation must
/// register a handler, e.g., one that sends the pattern to a SPARQL endpoint over HTTP.
pub trait ServiceHandler: Send + Sync {
    /// Evaluates `pattern` at the service `service_name`.
    ///
    /// `from` contains the variables that are already bound when the service is called. Returned
    /// solutions that are incompatible with `from` are dropped by the evaluator.
    fn handle(
        &self,
        service_name: &NamedNode,
        pattern: &Algebra,
        from: &Solution,
    ) -> Result<ServiceSolutions, ServiceError>;
}

/// A [ServiceHandler] that evaluates `SERVICE` patterns against other in-process stores.
#[derive(Debug, Default, Clone)]
pub struct LocalServiceHandler {
    services: FxHashMap<NamedNode, Arc<dyn TripleStore>>,
}

impl LocalServiceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `store` available as the service `name`.
    #[must_use]
    pub fn with_service(mut self, name: NamedNode, store: Arc<dyn TripleStore>) -> Self {
        self.services.insert(name, store);
        self
    }
}

impl ServiceHandler for LocalServiceHandler {
    fn handle(
        &self,
        service_name: &NamedNode,
        pattern: &Algebra,
        from: &Solution,
    ) -> Result<ServiceSolutions, ServiceError> {
        let store = self
            .services
            .get(service_name)
            .ok_or_else(|| format!("Unknown local service {service_name}"))?;
        let solutions = SimpleEvaluator::new(Arc::clone(store))
            .evaluate_from(pattern, from.clone())
            .map(|solution| solution.map_err(ServiceError::from))
            .collect::<Vec<_>>();
        Ok(Box::new(solutions.into_iter()))
    }
}
