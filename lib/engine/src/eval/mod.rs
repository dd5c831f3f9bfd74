//! A pull-based evaluator for the SPARQL algebra.
//!
//! Every node is evaluated against an input solution (`from`). All solutions that a node produces
//! extend `from`. This allows seeding the right-hand side of a join with the solutions of the
//! left-hand side and implementing `EXISTS` by substitution.

mod aggregate;
mod join;
mod order;
mod path;

use crate::context::ExecutionContext;
use crate::expression::{recover, ExpressionError};
use crate::service::ServiceHandler;
use crate::sparql::error::QueryEvaluationError;
use rdf_algebra_common::TripleStore;
use rdf_algebra_logical::{ActiveGraph, Algebra, Expression};
use rdf_algebra_model::{
    named_or_blank_to_term, subject_to_term, term_to_named_or_blank, BlankNode, Iri, NamedNode,
    NamedNodePattern, Solution, Term, TermPattern, TriplePattern, Variable,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::iter::{empty, once};
use std::sync::Arc;
use tracing::{debug, trace};

/// A lazily produced sequence of solutions.
///
/// After the first error, the sequence ends.
pub type SolutionIter<'a> = Box<dyn Iterator<Item = Result<Solution, QueryEvaluationError>> + 'a>;

/// A custom function that can be called from expressions by its IRI.
///
/// Returning [None] signals an evaluation error.
pub type CustomFunction = Arc<dyn Fn(&[Term]) -> Option<Term> + Send + Sync>;

/// Evaluates algebra trees against a [TripleStore].
///
/// The evaluator is cheap to clone. Operators capture a clone of it to evaluate their children
/// lazily.
///
/// # Example
///
/// ```
/// use rdf_algebra_engine::SimpleEvaluator;
/// use rdf_algebra_logical::Algebra;
/// use rdf_algebra_storage::memory::MemoryTripleStore;
/// use std::sync::Arc;
///
/// let store = MemoryTripleStore::new();
/// let evaluator = SimpleEvaluator::new(Arc::new(store.snapshot().unwrap()));
///
/// let algebra = Algebra::unit();
/// assert_eq!(evaluator.evaluate(&algebra).count(), 1);
/// ```
#[derive(Clone)]
pub struct SimpleEvaluator {
    store: Arc<dyn TripleStore>,
    context: ExecutionContext,
    service_handler: Option<Arc<dyn ServiceHandler>>,
    custom_functions: Arc<FxHashMap<NamedNode, CustomFunction>>,
    active_graph: ActiveGraph,
    blank_node_seed: u128,
    base_iri: Option<Arc<Iri<String>>>,
}

impl SimpleEvaluator {
    /// Creates a new evaluator that evaluates against the default graph of `store`.
    pub fn new(store: Arc<dyn TripleStore>) -> Self {
        Self {
            store,
            context: ExecutionContext::default(),
            service_handler: None,
            custom_functions: Arc::new(FxHashMap::default()),
            active_graph: ActiveGraph::DefaultGraph,
            blank_node_seed: rand::random(),
            base_iri: None,
        }
    }

    /// Uses the given context for cancellation and timeouts.
    #[must_use]
    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Uses `handler` to evaluate `SERVICE` patterns.
    #[must_use]
    pub fn with_service_handler(mut self, handler: Arc<dyn ServiceHandler>) -> Self {
        self.service_handler = Some(handler);
        self
    }

    /// Registers a custom function. Custom functions take precedence over the built-in casts.
    #[must_use]
    pub fn with_custom_function(mut self, name: NamedNode, function: CustomFunction) -> Self {
        Arc::make_mut(&mut self.custom_functions).insert(name, function);
        self
    }

    /// Resolves relative IRIs passed to `IRI()` against `base_iri`.
    #[must_use]
    pub fn with_base_iri(mut self, base_iri: Iri<String>) -> Self {
        self.base_iri = Some(Arc::new(base_iri));
        self
    }

    /// Returns an evaluator that matches patterns against `graph`.
    #[must_use]
    pub fn with_active_graph(&self, graph: ActiveGraph) -> Self {
        let mut result = self.clone();
        result.active_graph = graph;
        result
    }

    /// The store that is queried by this evaluator.
    pub fn store(&self) -> &dyn TripleStore {
        self.store.as_ref()
    }

    /// The graph that patterns are matched against.
    pub fn active_graph(&self) -> &ActiveGraph {
        &self.active_graph
    }

    pub(crate) fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub(crate) fn custom_function(&self, name: &NamedNode) -> Option<&CustomFunction> {
        self.custom_functions.get(name)
    }

    pub(crate) fn blank_node_seed(&self) -> u128 {
        self.blank_node_seed
    }

    pub(crate) fn base_iri(&self) -> Option<&Iri<String>> {
        self.base_iri.as_deref()
    }

    /// Evaluates `algebra` starting with the empty solution.
    pub fn evaluate<'a>(&self, algebra: &'a Algebra) -> SolutionIter<'a> {
        self.evaluate_from(algebra, Solution::new())
    }

    /// Evaluates `algebra` with the variables of `from` already bound.
    ///
    /// All produced solutions extend `from`.
    pub fn evaluate_from<'a>(&self, algebra: &'a Algebra, from: Solution) -> SolutionIter<'a> {
        debug!(root = algebra.name(), bound = from.len(), "Evaluating algebra");
        self.eval(algebra, from)
    }

    /// Evaluates a single node.
    pub(crate) fn eval<'a>(&self, node: &'a Algebra, from: Solution) -> SolutionIter<'a> {
        if let Err(error) = node.validate_node() {
            return Box::new(once(Err(error.into())));
        }
        if let Err(error) = self.context.check() {
            return Box::new(once(Err(error)));
        }
        trace!(node = node.name(), "Evaluating node");

        let inner: SolutionIter<'a> = match node {
            Algebra::Bgp { patterns } => self.eval_bgp(patterns, from),
            Algebra::Path {
                subject,
                path,
                object,
            } => self.eval_path(subject, path, object, from),
            Algebra::Join { left, right } => self.eval_join(left, right, from),
            Algebra::LeftJoin {
                left,
                right,
                expression,
            } => self.eval_left_join(left, right, expression.as_ref(), from),
            Algebra::Union { left, right } => Box::new(
                self.eval(left, from.clone())
                    .chain(self.eval(right, from)),
            ),
            Algebra::Minus { left, right } => self.eval_minus(left, right, from),
            Algebra::Filter { inner, expressions } => self.eval_filter(inner, expressions, from),
            Algebra::Extend { inner, assignments } => self.eval_extend(inner, assignments, from),
            Algebra::Project { inner, variables } => self.eval_project(inner, variables, from),
            Algebra::Distinct { inner } => {
                let mut seen = FxHashSet::default();
                Box::new(self.eval(inner, from).filter(move |solution| {
                    solution
                        .as_ref()
                        .map_or(true, |solution| seen.insert(solution.clone()))
                }))
            }
            Algebra::Reduced { inner } => {
                let mut previous: Option<Solution> = None;
                Box::new(self.eval(inner, from).filter(move |solution| {
                    let Ok(solution) = solution else {
                        return true;
                    };
                    if previous.as_ref() == Some(solution) {
                        return false;
                    }
                    previous = Some(solution.clone());
                    true
                }))
            }
            Algebra::OrderBy { inner, conditions } => self.eval_order_by(inner, conditions, from),
            Algebra::Slice {
                inner,
                offset,
                limit,
            } => Box::new(SliceIter {
                inner: self.eval(inner, from),
                offset: *offset,
                limit: *limit,
            }),
            Algebra::TopN {
                inner,
                conditions,
                n,
            } => self.eval_top_n(inner, conditions, *n, from),
            Algebra::Group {
                inner,
                variables,
                aggregates,
            } => self.eval_group(inner, variables, aggregates, from),
            Algebra::NamedGraph { graph, inner } => self.eval_named_graph(graph, inner, from),
            Algebra::Table { rows, .. } => Box::new(
                rows.iter()
                    .filter_map(move |row| row.merge(&from).map(Ok)),
            ),
            Algebra::Service {
                name,
                inner,
                silent,
            } => self.eval_service(name, inner, *silent, from),
        };

        Box::new(CheckedIter {
            inner,
            context: self.context.clone(),
            done: false,
        })
    }

    fn eval_bgp<'a>(&self, patterns: &'a [TriplePattern], from: Solution) -> SolutionIter<'a> {
        let mut solutions: SolutionIter<'a> = Box::new(once(Ok(from)));
        for pattern in patterns {
            let evaluator = self.clone();
            solutions = Box::new(solutions.flat_map(move |solution| -> SolutionIter<'a> {
                match solution {
                    Ok(solution) => evaluator.match_pattern(pattern, solution),
                    Err(error) => Box::new(once(Err(error))),
                }
            }));
        }

        let hidden = patterns
            .iter()
            .flat_map(|pattern| [&pattern.subject, &pattern.object])
            .filter_map(|term| match term {
                TermPattern::BlankNode(node) => Some(hidden_variable(node)),
                _ => None,
            })
            .collect::<Vec<_>>();
        if hidden.is_empty() {
            return solutions;
        }
        Box::new(solutions.map(move |solution| {
            solution.map(|mut solution| {
                for variable in &hidden {
                    solution.remove(variable);
                }
                solution
            })
        }))
    }

    fn match_pattern<'a>(&self, pattern: &'a TriplePattern, solution: Solution) -> SolutionIter<'a> {
        let subject = bound_term(&pattern.subject, &solution);
        let predicate = match &pattern.predicate {
            NamedNodePattern::NamedNode(node) => Some(Term::from(node.clone())),
            NamedNodePattern::Variable(variable) => solution.get(variable).cloned(),
        };
        let object = bound_term(&pattern.object, &solution);

        let triples = self.store.match_triples(
            self.active_graph.as_graph_name(),
            subject.as_ref().map(Term::as_ref),
            predicate.as_ref().map(Term::as_ref),
            object.as_ref().map(Term::as_ref),
        );
        Box::new(triples.filter_map(move |triple| {
            let triple = match triple {
                Ok(triple) => triple,
                Err(error) => return Some(Err(QueryEvaluationError::storage("Bgp", error))),
            };
            let mut solution = solution.clone();
            bind_term(&pattern.subject, subject_to_term(triple.subject), &mut solution)?;
            if let NamedNodePattern::Variable(variable) = &pattern.predicate {
                solution
                    .try_bind(variable.clone(), triple.predicate.into())
                    .ok()?;
            }
            bind_term(&pattern.object, triple.object, &mut solution)?;
            Some(Ok(solution))
        }))
    }

    fn eval_filter<'a>(
        &self,
        inner: &'a Algebra,
        expressions: &'a [Expression],
        from: Solution,
    ) -> SolutionIter<'a> {
        let evaluator = self.clone();
        Box::new(self.eval(inner, from).filter_map(move |solution| {
            let solution = match solution {
                Ok(solution) => solution,
                Err(error) => return Some(Err(error)),
            };
            match evaluator.accepts(expressions, &solution) {
                Ok(true) => Some(Ok(solution)),
                Ok(false) => None,
                Err(error) => Some(Err(error)),
            }
        }))
    }

    /// Checks whether all `expressions` are true for `solution`. Expected errors count as false.
    pub(crate) fn accepts(
        &self,
        expressions: &[Expression],
        solution: &Solution,
    ) -> Result<bool, QueryEvaluationError> {
        for expression in expressions {
            match self.eval_expression_ebv(expression, solution) {
                Ok(true) => {}
                Ok(false) | Err(ExpressionError::Expected) => return Ok(false),
                Err(ExpressionError::Fatal(error)) => return Err(error),
            }
        }
        Ok(true)
    }

    fn eval_extend<'a>(
        &self,
        inner: &'a Algebra,
        assignments: &'a [(Variable, Expression)],
        from: Solution,
    ) -> SolutionIter<'a> {
        let evaluator = self.clone();
        Box::new(self.eval(inner, from).map(move |solution| {
            let mut solution = solution?;
            for (variable, expression) in assignments {
                let Some(term) = recover(evaluator.eval_expression(expression, &solution))? else {
                    continue;
                };
                if solution.try_bind(variable.clone(), term).is_err() {
                    trace!(%variable, "Extend did not overwrite an existing binding");
                }
            }
            Ok(solution)
        }))
    }

    fn eval_project<'a>(
        &self,
        inner: &'a Algebra,
        variables: &'a [Variable],
        from: Solution,
    ) -> SolutionIter<'a> {
        let seed = from.project(variables);
        Box::new(self.eval(inner, seed).filter_map(move |solution| match solution {
            Ok(solution) => solution.project(variables).merge(&from).map(Ok),
            Err(error) => Some(Err(error)),
        }))
    }

    fn eval_named_graph<'a>(
        &self,
        graph: &'a NamedNodePattern,
        inner: &'a Algebra,
        from: Solution,
    ) -> SolutionIter<'a> {
        let variable = match graph {
            NamedNodePattern::NamedNode(node) => {
                return self
                    .with_active_graph(ActiveGraph::NamedGraph(node.clone().into()))
                    .eval(inner, from);
            }
            NamedNodePattern::Variable(variable) => variable,
        };

        if let Some(bound) = from.get(variable) {
            return match term_to_named_or_blank(bound) {
                Some(name) => self
                    .with_active_graph(ActiveGraph::NamedGraph(name))
                    .eval(inner, from),
                None => Box::new(empty()),
            };
        }

        let graphs = match self.store.named_graphs() {
            Ok(graphs) => graphs,
            Err(error) => {
                return Box::new(once(Err(QueryEvaluationError::storage(
                    "NamedGraph",
                    error,
                ))))
            }
        };
        let evaluator = self.clone();
        // The graph variable is joined after the inner pattern, so the pattern never sees it.
        Box::new(graphs.into_iter().flat_map(move |name| -> SolutionIter<'a> {
            let graph = named_or_blank_to_term(name.clone());
            let solutions = evaluator
                .with_active_graph(ActiveGraph::NamedGraph(name))
                .eval(inner, from.clone());
            Box::new(solutions.filter_map(move |solution| match solution {
                Ok(mut solution) => solution
                    .try_bind(variable.clone(), graph.clone())
                    .ok()
                    .map(|()| Ok(solution)),
                Err(error) => Some(Err(error)),
            }))
        }))
    }

    fn eval_service<'a>(
        &self,
        name: &'a NamedNodePattern,
        inner: &'a Algebra,
        silent: bool,
        from: Solution,
    ) -> SolutionIter<'a> {
        let name = match name {
            NamedNodePattern::NamedNode(name) => name.clone(),
            NamedNodePattern::Variable(variable) => match from.get(variable) {
                Some(Term::NamedNode(name)) => name.clone(),
                Some(term) => {
                    return Box::new(once(Err(QueryEvaluationError::InvalidServiceName(
                        term.clone(),
                    ))))
                }
                None => return Box::new(once(Err(QueryEvaluationError::UnboundService))),
            },
        };
        let Some(handler) = &self.service_handler else {
            if silent {
                debug!(service = %name, "Skipping silent service without handler");
                return Box::new(once(Ok(from)));
            }
            return Box::new(once(Err(QueryEvaluationError::UnsupportedService(name))));
        };

        debug!(service = %name, silent, "Delegating pattern to service");
        let solutions = match handler.handle(&name, inner, &from) {
            Ok(solutions) if silent => solutions.collect::<Result<Vec<_>, _>>(),
            Ok(solutions) => {
                return Box::new(solutions.filter_map(move |solution| match solution {
                    Ok(solution) => solution.merge(&from).map(Ok),
                    Err(error) => Some(Err(QueryEvaluationError::Service(error))),
                }))
            }
            Err(error) => Err(error),
        };
        match solutions {
            Ok(solutions) => Box::new(
                solutions
                    .into_iter()
                    .filter_map(move |solution| solution.merge(&from).map(Ok)),
            ),
            Err(error) if silent => {
                debug!(service = %name, %error, "Ignoring failure of silent service");
                Box::new(once(Ok(from)))
            }
            Err(error) => Box::new(once(Err(QueryEvaluationError::Service(error)))),
        }
    }
}

/// The variable that stands in for a blank node of a pattern.
pub(crate) fn hidden_variable(node: &BlankNode) -> Variable {
    Variable::new_unchecked(format!("_:{}", node.as_str()))
}

/// Returns the term at a pattern position if it is constant or already bound.
pub(crate) fn bound_term(pattern: &TermPattern, solution: &Solution) -> Option<Term> {
    match pattern {
        TermPattern::NamedNode(node) => Some(node.clone().into()),
        TermPattern::Literal(literal) => Some(literal.clone().into()),
        TermPattern::BlankNode(node) => solution.get(&hidden_variable(node)).cloned(),
        TermPattern::Variable(variable) => solution.get(variable).cloned(),
    }
}

/// Binds the variable at a pattern position. Fails if the variable is bound to another term.
pub(crate) fn bind_term(pattern: &TermPattern, term: Term, solution: &mut Solution) -> Option<()> {
    match pattern {
        TermPattern::NamedNode(_) | TermPattern::Literal(_) => Some(()),
        TermPattern::BlankNode(node) => solution.try_bind(hidden_variable(node), term).ok(),
        TermPattern::Variable(variable) => solution.try_bind(variable.clone(), term).ok(),
    }
}

/// Checks the execution context before producing each solution and ends the sequence after the
/// first error.
struct CheckedIter<'a> {
    inner: SolutionIter<'a>,
    context: ExecutionContext,
    done: bool,
}

impl Iterator for CheckedIter<'_> {
    type Item = Result<Solution, QueryEvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Err(error) = self.context.check() {
            self.done = true;
            return Some(Err(error));
        }
        let next = self.inner.next();
        if matches!(next, Some(Err(_)) | None) {
            self.done = true;
        }
        next
    }
}

/// Skips `offset` solutions and stops after `limit` solutions. Errors are never skipped.
struct SliceIter<'a> {
    inner: SolutionIter<'a>,
    offset: usize,
    limit: Option<usize>,
}

impl Iterator for SliceIter<'_> {
    type Item = Result<Solution, QueryEvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.limit == Some(0) {
            return None;
        }
        loop {
            let next = self.inner.next()?;
            if next.is_ok() && self.offset > 0 {
                self.offset -= 1;
                continue;
            }
            if let Some(limit) = &mut self.limit {
                *limit -= 1;
            }
            return Some(next);
        }
    }
}
