mod constraints;

use crate::error::ShaclError;
use crate::graph::GraphReader;
use crate::report::{ValidationReport, ValidationResult};
use crate::shape::{Constraint, Shape, ShapeId, Shapes, Target};
use rdf_algebra_common::TripleStore;
use rdf_algebra_engine::{QueryOptions, SimpleEvaluator};
use rdf_algebra_logical::PropertyPath;
use rdf_algebra_model::vocab::{rdf, rdfs};
use rdf_algebra_model::{subject_to_term, Literal, Term};
use rustc_hash::FxHashSet;
use std::slice;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Options of a [ShaclValidator].
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// How deeply shapes may be nested through `sh:node`, `sh:property`, and the logical
    /// constraint components before the validation fails.
    pub max_recursion_depth: usize,
    /// Used to evaluate the queries of SPARQL-based constraints. The timeout applies to the
    /// whole validation.
    pub query_options: QueryOptions,
}

impl ValidatorOptions {
    #[must_use]
    pub fn with_max_recursion_depth(mut self, max_recursion_depth: usize) -> Self {
        self.max_recursion_depth = max_recursion_depth;
        self
    }

    #[must_use]
    pub fn with_query_options(mut self, query_options: QueryOptions) -> Self {
        self.query_options = query_options;
        self
    }
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: 64,
            query_options: QueryOptions::default(),
        }
    }
}

/// Validates data graphs against a fixed set of [Shapes].
///
/// # Example
///
/// ```
/// use rdf_algebra_model::vocab::sh;
/// use rdf_algebra_model::{GraphName, NamedNode, Quad};
/// use rdf_algebra_shacl::{ShaclValidator, Shapes};
/// use rdf_algebra_storage::memory::MemoryTripleStore;
/// use std::sync::Arc;
///
/// let ex = |name: &str| NamedNode::new_unchecked(format!("http://example.com/{name}"));
///
/// let shapes = MemoryTripleStore::new();
/// shapes.insert(&Quad::new(ex("Shape"), sh::TARGET_NODE, ex("alice"), GraphName::DefaultGraph))?;
/// shapes.insert(&Quad::new(ex("Shape"), sh::HAS_VALUE, ex("bob"), GraphName::DefaultGraph))?;
/// let validator = ShaclValidator::new(Shapes::parse(&shapes.snapshot()?)?);
///
/// let data = MemoryTripleStore::new();
/// let report = validator.validate(Arc::new(data.snapshot()?))?;
/// assert!(!report.conforms());
/// assert_eq!(report.results().len(), 1);
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct ShaclValidator {
    shapes: Arc<Shapes>,
    options: ValidatorOptions,
}

impl ShaclValidator {
    pub fn new(shapes: Shapes) -> Self {
        Self {
            shapes: Arc::new(shapes),
            options: ValidatorOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ValidatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn shapes(&self) -> &Shapes {
        &self.shapes
    }

    /// Validates all focus nodes of all shapes and reports every violated constraint.
    pub fn validate(&self, data: Arc<dyn TripleStore>) -> Result<ValidationReport, ShaclError> {
        let mut results = Vec::new();
        let conforms = self.run(data).validate_all(Some(&mut results))?;
        debug!(conforms, results = results.len(), "Validated data graph");
        Ok(ValidationReport::new(results))
    }

    /// Checks whether the data conforms to all shapes. Stops at the first violation.
    pub fn conforms(&self, data: Arc<dyn TripleStore>) -> Result<bool, ShaclError> {
        self.run(data).validate_all(None)
    }

    /// Validates `focus` against `shape`, ignoring the targets of the shape.
    pub fn validate_node(
        &self,
        data: Arc<dyn TripleStore>,
        focus: &Term,
        shape: ShapeId,
    ) -> Result<ValidationReport, ShaclError> {
        if self.shapes.get(shape).is_none() {
            return Err(ShaclError::UnknownShape(shape));
        }
        let mut results = Vec::new();
        self.run(data)
            .validate_shape(shape, slice::from_ref(focus), Some(&mut results))?;
        Ok(ValidationReport::new(results))
    }

    fn run(&self, data: Arc<dyn TripleStore>) -> ValidationRun<'_> {
        ValidationRun {
            shapes: &self.shapes,
            evaluator: SimpleEvaluator::from_options(data, self.options.query_options.clone()),
            max_recursion_depth: self.options.max_recursion_depth,
            active: FxHashSet::default(),
        }
    }
}

/// A constraint violation before it is turned into a [ValidationResult].
#[derive(Debug, Clone)]
pub(crate) struct Failure {
    value: Option<Term>,
    path: Option<PropertyPath>,
    messages: Vec<Literal>,
    source_constraint: Option<Term>,
}

impl Failure {
    pub fn new(value: Option<Term>) -> Self {
        Self {
            value,
            path: None,
            messages: Vec::new(),
            source_constraint: None,
        }
    }

    /// Reports `path` instead of the path of the shape.
    #[must_use]
    pub fn with_path(mut self, path: PropertyPath) -> Self {
        self.path = Some(path);
        self
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Literal>) -> Self {
        self.messages = messages;
        self
    }

    #[must_use]
    pub fn with_source_constraint(mut self, node: Term) -> Self {
        self.source_constraint = Some(node);
        self
    }
}

/// The state of a single validation.
///
/// Passing no result list to the validation functions only checks for conformance and stops at
/// the first violation.
struct ValidationRun<'v> {
    shapes: &'v Shapes,
    evaluator: SimpleEvaluator,
    max_recursion_depth: usize,
    /// The pairs of shape and focus node that are currently being validated.
    active: FxHashSet<(ShapeId, Term)>,
}

impl<'v> ValidationRun<'v> {
    fn validate_all(
        &mut self,
        mut results: Option<&mut Vec<ValidationResult>>,
    ) -> Result<bool, ShaclError> {
        let shapes = self.shapes;
        let mut conforms = true;
        for (id, shape) in shapes.iter() {
            if shape.targets().is_empty() {
                continue;
            }
            if shape.is_deactivated() {
                debug!(shape = %shape.node(), "Skipping deactivated shape");
                continue;
            }
            let focus_nodes = self.focus_nodes(shape)?;
            let shape_conforms = self.validate_shape(id, &focus_nodes, results.as_deref_mut())?;
            debug!(
                shape = %shape.node(),
                focus_nodes = focus_nodes.len(),
                conforms = shape_conforms,
                "Validated shape"
            );
            if !shape_conforms {
                conforms = false;
                if results.is_none() {
                    break;
                }
            }
        }
        Ok(conforms)
    }

    /// Validates each of `focus_nodes` against the shape `id`.
    fn validate_shape(
        &mut self,
        id: ShapeId,
        focus_nodes: &[Term],
        mut results: Option<&mut Vec<ValidationResult>>,
    ) -> Result<bool, ShaclError> {
        let shapes = self.shapes;
        let shape = shapes.shape(id);
        if shape.is_deactivated() {
            return Ok(true);
        }

        let mut conforms = true;
        for focus in focus_nodes {
            let key = (id, focus.clone());
            if self.active.contains(&key) {
                trace!(shape = %shape.node(), %focus, "Shape is already being validated for the node");
                continue;
            }
            if self.active.len() >= self.max_recursion_depth {
                warn!(shape = %shape.node(), %focus, "Reached the maximum shape nesting depth");
                return Err(ShaclError::RecursionLimit(self.max_recursion_depth));
            }
            self.active.insert(key.clone());
            let focus_conforms = self.validate_focus(id, shape, focus, results.as_deref_mut());
            self.active.remove(&key);
            if !focus_conforms? {
                conforms = false;
                if results.is_none() {
                    break;
                }
            }
        }
        Ok(conforms)
    }

    fn validate_focus(
        &mut self,
        id: ShapeId,
        shape: &'v Shape,
        focus: &Term,
        mut results: Option<&mut Vec<ValidationResult>>,
    ) -> Result<bool, ShaclError> {
        let values = self.value_nodes(shape, focus)?;
        trace!(shape = %id, %focus, values = values.len(), "Validating focus node");

        let mut conforms = true;
        for constraint in shape.constraints() {
            if let Constraint::Property(property) = constraint {
                // The property shape reports its own results.
                for value in &values {
                    if !self.validate_shape(
                        *property,
                        slice::from_ref(value),
                        results.as_deref_mut(),
                    )? {
                        conforms = false;
                        if results.is_none() {
                            return Ok(false);
                        }
                    }
                }
                continue;
            }

            let failures = self.check(shape, constraint, focus, &values)?;
            if failures.is_empty() {
                continue;
            }
            conforms = false;
            let Some(results) = results.as_deref_mut() else {
                return Ok(false);
            };
            results.extend(
                failures
                    .into_iter()
                    .map(|failure| to_result(shape, constraint, focus, failure)),
            );
        }
        Ok(conforms)
    }

    /// Checks whether `node` conforms to the shape `id`.
    fn conforms_to(&mut self, node: &Term, id: ShapeId) -> Result<bool, ShaclError> {
        self.validate_shape(id, slice::from_ref(node), None)
    }

    fn focus_nodes(&self, shape: &Shape) -> Result<Vec<Term>, ShaclError> {
        let reader = self.reader();
        let mut nodes = Vec::new();
        for target in shape.targets() {
            match target {
                Target::Node(node) => nodes.push(node.clone()),
                Target::Class(class) => nodes.extend(self.evaluator.path_to(&instance_of(), class)?),
                Target::SubjectsOf(predicate) => nodes.extend(
                    reader
                        .triples(None, Some(predicate.as_ref()), None)?
                        .into_iter()
                        .map(|triple| subject_to_term(triple.subject)),
                ),
                Target::ObjectsOf(predicate) => nodes.extend(
                    reader
                        .triples(None, Some(predicate.as_ref()), None)?
                        .into_iter()
                        .map(|triple| triple.object),
                ),
            }
        }
        Ok(deduplicate(nodes))
    }

    fn value_nodes(&self, shape: &Shape, focus: &Term) -> Result<Vec<Term>, ShaclError> {
        match shape.path() {
            Some(path) => Ok(deduplicate(self.evaluator.path_from(path, focus)?)),
            None => Ok(vec![focus.clone()]),
        }
    }

    fn reader(&self) -> GraphReader<'_> {
        GraphReader::new(self.evaluator.store())
    }
}

fn to_result(
    shape: &Shape,
    constraint: &Constraint,
    focus: &Term,
    failure: Failure,
) -> ValidationResult {
    let messages = match (shape.messages(), failure.messages) {
        ([], messages) if messages.is_empty() => vec![constraints::default_message(constraint)],
        ([], messages) => messages,
        (messages, _) => messages.to_vec(),
    };
    ValidationResult {
        focus_node: focus.clone(),
        result_path: failure.path.or_else(|| shape.path().cloned()),
        value: failure.value,
        source_shape: shape.node().clone(),
        source_constraint_component: constraint.component().into_owned(),
        source_constraint: failure.source_constraint,
        severity: shape.severity().clone(),
        messages,
    }
}

/// The path `rdf:type/rdfs:subClassOf*`.
fn instance_of() -> PropertyPath {
    PropertyPath::sequence(
        rdf::TYPE.into_owned().into(),
        PropertyPath::zero_or_more(rdfs::SUB_CLASS_OF.into_owned().into()),
    )
}

fn deduplicate(nodes: Vec<Term>) -> Vec<Term> {
    let mut seen = FxHashSet::default();
    nodes
        .into_iter()
        .filter(|node| seen.insert(node.clone()))
        .collect()
}
