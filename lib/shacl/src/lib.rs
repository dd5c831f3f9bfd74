#![doc(test(attr(deny(warnings))))]

//! Validation of RDF graphs against [SHACL](https://www.w3.org/TR/shacl/) shapes.
//!
//! [Shapes::parse] reads the shapes of a shapes graph. A [ShaclValidator] then checks data graphs
//! against them and produces a [ValidationReport]. SHACL-SPARQL constraints and constraint
//! components are evaluated with the [SimpleEvaluator](rdf_algebra_engine::SimpleEvaluator).

mod error;
mod graph;
mod report;
mod shape;
mod sparql;
mod validator;

pub use error::ShaclError;
pub use report::{ValidationReport, ValidationResult};
pub use shape::{Constraint, NodeKind, Severity, Shape, ShapeId, Shapes, Target};
pub use sparql::{ComponentConstraint, SparqlConstraint};
pub use validator::{ShaclValidator, ValidatorOptions};
