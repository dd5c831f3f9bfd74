#![doc(test(attr(deny(warnings))))]

//! Evaluation of SPARQL algebra trees against a [TripleStore](rdf_algebra_common::TripleStore).
//!
//! The [SimpleEvaluator] turns an [Algebra](rdf_algebra_logical::Algebra) tree into a lazy
//! sequence of solutions. [Query] and [evaluate_query] provide the SPARQL front end on top of it.

mod context;
mod eval;
pub mod expression;
pub mod results;
pub mod service;
pub mod sparql;

pub use context::{CancellationToken, ExecutionContext};
pub use eval::{CustomFunction, SimpleEvaluator, SolutionIter};
pub use results::{QueryResults, QuerySolutionIter};
pub use service::{LocalServiceHandler, ServiceHandler};
pub use sparql::error::QueryEvaluationError;
pub use sparql::{evaluate_query, Query, QueryForm, QueryOptions};
