//! [SHACL-SPARQL](https://www.w3.org/TR/shacl/#sparql-constraints): constraints and constraint
//! components that are defined by SPARQL queries.
//!
//! The queries are parsed once, when the shapes graph is read. At validation time, `$this`,
//! `$currentShape`, `$value`, and the parameters of a constraint component are pre-bound by
//! seeding the evaluation with a solution.

use crate::error::ShaclError;
use crate::graph::GraphReader;
use crate::validator::Failure;
use rdf_algebra_engine::{Query, SimpleEvaluator};
use rdf_algebra_logical::{Algebra, PropertyPath};
use rdf_algebra_model::vocab::{rdf, sh, xsd};
use rdf_algebra_model::{Literal, NamedNode, NamedNodeRef, Solution, Term, Variable};
use std::fmt::Write;
use tracing::{debug, warn};

const THIS: &str = "this";
const VALUE: &str = "value";
const PATH: &str = "path";
const CURRENT_SHAPE: &str = "currentShape";
const FAILURE: &str = "failure";

/// A `sh:sparql` constraint with a `SELECT` query.
///
/// Every solution of the query is a validation result.
#[derive(Debug, Clone)]
pub struct SparqlConstraint {
    node: Term,
    algebra: Algebra,
    messages: Vec<Literal>,
}

impl SparqlConstraint {
    /// Reads the constraint defined by `node`. Returns [None] for deactivated constraints.
    pub(crate) fn parse(
        reader: GraphReader<'_>,
        node: &Term,
        path: Option<&PropertyPath>,
    ) -> Result<Option<Self>, ShaclError> {
        if is_deactivated(reader, node)? {
            debug!(%node, "Skipping deactivated SPARQL constraint");
            return Ok(None);
        }
        let Some(select) = string_value(reader, node, sh::SELECT)? else {
            return Err(ShaclError::invalid_shape(node, "sh:sparql requires sh:select"));
        };
        let query = parse_query(reader, node, &select, path)?;
        ensure_this_projection(node, &query)?;
        Ok(Some(Self {
            node: node.clone(),
            algebra: expose(query.algebra().clone(), &prebound_variables(&[])),
            messages: literals(reader, node, sh::MESSAGE)?,
        }))
    }

    /// The node that defines the constraint, reported as `sh:sourceConstraint`.
    pub fn node(&self) -> &Term {
        &self.node
    }

    pub(crate) fn evaluate(
        &self,
        evaluator: &SimpleEvaluator,
        shape: &Term,
        focus: &Term,
        is_property_shape: bool,
    ) -> Result<Vec<Failure>, ShaclError> {
        let seed = seed(&Solution::new(), shape, focus, None);
        select_failures(
            evaluator,
            &self.algebra,
            seed,
            &SelectContext {
                node: &self.node,
                focus,
                is_property_shape,
                messages: &self.messages,
            },
        )
        .map(|failures| {
            failures
                .into_iter()
                .map(|failure| failure.with_source_constraint(self.node.clone()))
                .collect()
        })
    }
}

/// A constraint component (`sh:ConstraintComponent`) declared in the shapes graph.
#[derive(Debug, Clone)]
pub(crate) struct ComponentDefinition {
    node: NamedNode,
    parameters: Vec<Parameter>,
    validator: Option<Term>,
    node_validator: Option<Term>,
    property_validator: Option<Term>,
}

#[derive(Debug, Clone)]
struct Parameter {
    path: NamedNode,
    optional: bool,
}

impl Parameter {
    /// Parameters are pre-bound to the variable named after the local name of their path.
    fn variable(&self) -> Variable {
        let iri = self.path.as_str();
        let local_name = iri
            .rfind(['#', '/', ':'])
            .map_or(iri, |position| &iri[position + 1..]);
        Variable::new_unchecked(local_name)
    }
}

impl ComponentDefinition {
    /// Reads all constraint components of the shapes graph.
    pub(crate) fn parse_all(reader: GraphReader<'_>) -> Result<Vec<Self>, ShaclError> {
        let class = Term::from(sh::CONSTRAINT_COMPONENT.into_owned());
        let mut definitions = Vec::new();
        for node in reader.subjects(rdf::TYPE, &class)? {
            let Term::NamedNode(iri) = &node else {
                warn!(%node, "Ignoring constraint component that is not identified by an IRI");
                continue;
            };
            let mut parameters = Vec::new();
            for parameter in reader.objects(&node, sh::PARAMETER)? {
                let Some(Term::NamedNode(path)) = reader.object(&parameter, sh::PATH)? else {
                    return Err(ShaclError::invalid_shape(
                        &node,
                        "parameters require an IRI as sh:path",
                    ));
                };
                let optional = boolean_value(reader, &parameter, sh::OPTIONAL)?.unwrap_or(false);
                parameters.push(Parameter { path, optional });
            }
            debug!(component = %iri, parameters = parameters.len(), "Read constraint component");
            definitions.push(Self {
                node: iri.clone(),
                parameters,
                validator: reader.object(&node, sh::VALIDATOR)?,
                node_validator: reader.object(&node, sh::NODE_VALIDATOR)?,
                property_validator: reader.object(&node, sh::PROPERTY_VALIDATOR)?,
            });
        }
        Ok(definitions)
    }

    /// Instantiates the component for `shape` if the shape has a value for every mandatory
    /// parameter.
    ///
    /// Only the first value of each parameter is used.
    pub(crate) fn instantiate(
        &self,
        reader: GraphReader<'_>,
        shape: &Term,
        path: Option<&PropertyPath>,
    ) -> Result<Option<ComponentConstraint>, ShaclError> {
        let mut bindings = Vec::new();
        for parameter in &self.parameters {
            match reader.object(shape, parameter.path.as_ref())? {
                Some(value) => bindings.push((parameter.variable(), value)),
                None if parameter.optional => {}
                None => return Ok(None),
            }
        }
        let validator = if path.is_some() {
            self.property_validator.as_ref().or(self.validator.as_ref())
        } else {
            self.node_validator.as_ref().or(self.validator.as_ref())
        };
        let Some(validator) = validator else {
            warn!(component = %self.node, %shape, "Constraint component has no suitable validator");
            return Ok(None);
        };

        let is_ask = reader.contains(
            validator,
            rdf::TYPE,
            &sh::SPARQL_ASK_VALIDATOR.into_owned().into(),
        )? || string_value(reader, validator, sh::ASK)?.is_some();
        let parameter_variables = self
            .parameters
            .iter()
            .map(Parameter::variable)
            .collect::<Vec<_>>();
        let kind = if is_ask {
            let Some(ask) = string_value(reader, validator, sh::ASK)? else {
                return Err(ShaclError::invalid_shape(validator, "ASK validators require sh:ask"));
            };
            let query = parse_query(reader, validator, &ask, path)?;
            ValidatorKind::Ask(expose(
                query.algebra().clone(),
                &prebound_variables(&parameter_variables),
            ))
        } else {
            let Some(select) = string_value(reader, validator, sh::SELECT)? else {
                return Err(ShaclError::invalid_shape(
                    validator,
                    "SELECT validators require sh:select",
                ));
            };
            let query = parse_query(reader, validator, &select, path)?;
            ensure_this_projection(validator, &query)?;
            ValidatorKind::Select(expose(
                query.algebra().clone(),
                &prebound_variables(&parameter_variables),
            ))
        };

        Ok(Some(ComponentConstraint {
            component: self.node.clone(),
            validator: validator.clone(),
            bindings: bindings.into_iter().collect(),
            kind,
            messages: literals(reader, validator, sh::MESSAGE)?,
        }))
    }
}

/// An instance of a [constraint component](ComponentDefinition) for a specific shape.
#[derive(Debug, Clone)]
pub struct ComponentConstraint {
    component: NamedNode,
    validator: Term,
    bindings: Solution,
    kind: ValidatorKind,
    messages: Vec<Literal>,
}

#[derive(Debug, Clone)]
enum ValidatorKind {
    /// Evaluated once per value node. The value node conforms if the query returns true.
    Ask(Algebra),
    /// Evaluated once per focus node. Every solution is a validation result.
    Select(Algebra),
}

impl ComponentConstraint {
    pub fn component(&self) -> &NamedNode {
        &self.component
    }

    /// The parameter values of this instance, bound to the variables named after the
    /// parameters.
    pub fn parameters(&self) -> &Solution {
        &self.bindings
    }

    pub(crate) fn evaluate(
        &self,
        evaluator: &SimpleEvaluator,
        shape: &Term,
        focus: &Term,
        values: &[Term],
        is_property_shape: bool,
    ) -> Result<Vec<Failure>, ShaclError> {
        match &self.kind {
            ValidatorKind::Ask(algebra) => {
                let mut failures = Vec::new();
                for value in values {
                    let seed = seed(&self.bindings, shape, focus, Some(value));
                    let conforms = evaluator
                        .evaluate_from(algebra, seed.clone())
                        .next()
                        .transpose()?
                        .is_some();
                    if !conforms {
                        failures.push(
                            Failure::new(Some(value.clone()))
                                .with_messages(substitute(&self.messages, &seed)),
                        );
                    }
                }
                Ok(failures)
            }
            ValidatorKind::Select(algebra) => select_failures(
                evaluator,
                algebra,
                seed(&self.bindings, shape, focus, None),
                &SelectContext {
                    node: &self.validator,
                    focus,
                    is_property_shape,
                    messages: &self.messages,
                },
            ),
        }
    }
}

struct SelectContext<'a> {
    node: &'a Term,
    focus: &'a Term,
    is_property_shape: bool,
    messages: &'a [Literal],
}

/// Turns each solution of a `SELECT` validator into a failure.
fn select_failures(
    evaluator: &SimpleEvaluator,
    algebra: &Algebra,
    seed: Solution,
    context: &SelectContext<'_>,
) -> Result<Vec<Failure>, ShaclError> {
    let failure = Variable::new_unchecked(FAILURE);
    let value = Variable::new_unchecked(VALUE);
    let path = Variable::new_unchecked(PATH);

    let mut failures = Vec::new();
    for solution in evaluator.evaluate_from(algebra, seed) {
        let solution = solution?;
        if solution.get(&failure) == Some(&Term::from(Literal::from(true))) {
            return Err(ShaclError::SparqlFailure(context.node.clone()));
        }
        let value = match solution.get(&value) {
            Some(value) => Some(value.clone()),
            None if context.is_property_shape => None,
            None => Some(context.focus.clone()),
        };
        let mut result = Failure::new(value).with_messages(substitute(context.messages, &solution));
        if let Some(Term::NamedNode(predicate)) = solution.get(&path) {
            result = result.with_path(PropertyPath::Predicate(predicate.clone()));
        }
        failures.push(result);
    }
    Ok(failures)
}

fn seed(bindings: &Solution, shape: &Term, focus: &Term, value: Option<&Term>) -> Solution {
    let prebound = [
        (THIS, Some(focus)),
        (CURRENT_SHAPE, Some(shape)),
        (VALUE, value),
    ]
    .into_iter()
    .filter_map(|(name, term)| Some((Variable::new_unchecked(name), term?.clone())))
    // A parameter named like a pre-bound variable keeps its value.
    .filter(|(variable, _)| !bindings.contains(variable))
    .collect::<Vec<_>>();
    bindings
        .iter()
        .map(|(variable, term)| (variable.clone(), term.clone()))
        .chain(prebound)
        .collect()
}

fn prebound_variables(parameters: &[Variable]) -> Vec<Variable> {
    [THIS, CURRENT_SHAPE, VALUE]
        .into_iter()
        .map(Variable::new_unchecked)
        .chain(parameters.iter().cloned())
        .collect()
}

/// Lets the pre-bound `variables` pass the outermost projection of a query.
///
/// A projection only forwards the projected variables of its input to the inner pattern. Pre-bound
/// variables must be visible in the whole query, even if they are not projected.
fn expose(algebra: Algebra, variables: &[Variable]) -> Algebra {
    match algebra {
        Algebra::Project {
            inner,
            variables: mut projected,
        } => {
            for variable in variables {
                if !projected.contains(variable) {
                    projected.push(variable.clone());
                }
            }
            Algebra::Project {
                inner,
                variables: projected,
            }
        }
        Algebra::Distinct { inner } => Algebra::Distinct {
            inner: Box::new(expose(*inner, variables)),
        },
        Algebra::Reduced { inner } => Algebra::Reduced {
            inner: Box::new(expose(*inner, variables)),
        },
        Algebra::Slice {
            inner,
            offset,
            limit,
        } => Algebra::Slice {
            inner: Box::new(expose(*inner, variables)),
            offset,
            limit,
        },
        Algebra::TopN {
            inner,
            conditions,
            n,
        } => Algebra::TopN {
            inner: Box::new(expose(*inner, variables)),
            conditions,
            n,
        },
        other => other,
    }
}

/// Parses a query of the shapes graph, after adding its prefix declarations and replacing
/// `$PATH` with the path of the shape.
fn parse_query(
    reader: GraphReader<'_>,
    node: &Term,
    query: &str,
    path: Option<&PropertyPath>,
) -> Result<Query, ShaclError> {
    let mut text = prefix_declarations(reader, node)?;
    match path {
        Some(path) => text.push_str(&query.replace("$PATH", &path.to_string())),
        None => text.push_str(query),
    }
    Query::parse(&text, None).map_err(|source| ShaclError::InvalidSparql {
        node: node.clone(),
        source,
    })
}

fn ensure_this_projection(node: &Term, query: &Query) -> Result<(), ShaclError> {
    let this = Variable::new_unchecked(THIS);
    match query.variables() {
        Some(variables) if variables.contains(&this) => Ok(()),
        _ => Err(ShaclError::MissingThisProjection(node.clone())),
    }
}

/// Builds the `PREFIX` clauses for the `sh:prefixes` of `node`.
fn prefix_declarations(reader: GraphReader<'_>, node: &Term) -> Result<String, ShaclError> {
    let mut prefixes = String::new();
    for ontology in reader.objects(node, sh::PREFIXES)? {
        for declaration in reader.objects(&ontology, sh::DECLARE)? {
            let prefix = string_value(reader, &declaration, sh::PREFIX)?;
            let namespace = string_value(reader, &declaration, sh::NAMESPACE)?;
            let (Some(prefix), Some(namespace)) = (prefix, namespace) else {
                return Err(ShaclError::InvalidPrefixDeclaration(declaration));
            };
            writeln!(prefixes, "PREFIX {prefix}: <{namespace}>")
                .map_err(|_| ShaclError::InvalidPrefixDeclaration(declaration.clone()))?;
        }
    }
    Ok(prefixes)
}

/// Replaces `{$name}` and `{?name}` in messages with the terms bound in `solution`.
fn substitute(messages: &[Literal], solution: &Solution) -> Vec<Literal> {
    messages
        .iter()
        .map(|message| {
            let mut text = message.value().to_owned();
            for (variable, term) in solution.iter() {
                let rendered = match term {
                    Term::Literal(literal) => literal.value().to_owned(),
                    other => other.to_string(),
                };
                for marker in ['$', '?'] {
                    text = text.replace(&format!("{{{marker}{}}}", variable.as_str()), &rendered);
                }
            }
            match message.language() {
                Some(language) => Literal::new_language_tagged_literal_unchecked(text, language),
                None => Literal::new_simple_literal(text),
            }
        })
        .collect()
}

pub(crate) fn string_value(
    reader: GraphReader<'_>,
    node: &Term,
    predicate: NamedNodeRef<'_>,
) -> Result<Option<String>, ShaclError> {
    Ok(reader
        .object(node, predicate)?
        .and_then(|term| match term {
            Term::Literal(literal) => Some(literal.value().to_owned()),
            Term::NamedNode(node) => Some(node.into_string()),
            Term::BlankNode(_) => None,
        }))
}

pub(crate) fn boolean_value(
    reader: GraphReader<'_>,
    node: &Term,
    predicate: NamedNodeRef<'_>,
) -> Result<Option<bool>, ShaclError> {
    Ok(reader
        .object(node, predicate)?
        .and_then(|term| match term {
            Term::Literal(literal) if literal.datatype() == xsd::BOOLEAN => {
                match literal.value() {
                    "true" | "1" => Some(true),
                    "false" | "0" => Some(false),
                    _ => None,
                }
            }
            _ => None,
        }))
}

pub(crate) fn literals(
    reader: GraphReader<'_>,
    node: &Term,
    predicate: NamedNodeRef<'_>,
) -> Result<Vec<Literal>, ShaclError> {
    Ok(reader
        .objects(node, predicate)?
        .into_iter()
        .filter_map(|term| match term {
            Term::Literal(literal) => Some(literal),
            _ => None,
        })
        .collect())
}

fn is_deactivated(reader: GraphReader<'_>, node: &Term) -> Result<bool, ShaclError> {
    Ok(boolean_value(reader, node, sh::DEACTIVATED)?.unwrap_or(false))
}
