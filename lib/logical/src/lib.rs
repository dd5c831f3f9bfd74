#![doc(test(attr(deny(warnings))))]

//! The logical model of the SPARQL algebra: algebra trees, expressions, property paths, and the
//! structural derivation of variable sets.

mod active_graph;
mod algebra;
mod builder;
mod error;
mod expression;
mod path;
mod variables;

pub use active_graph::ActiveGraph;
pub use algebra::Algebra;
pub use builder::AlgebraBuilder;
pub use error::AlgebraError;
pub use expression::{
    AggregateExpression, AggregateFunction, Expression, Function, OrderCondition,
};
pub use path::PropertyPath;
pub use variables::VariableSets;
