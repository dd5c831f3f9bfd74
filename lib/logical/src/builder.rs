use crate::error::AlgebraError;
use crate::expression::{AggregateExpression, Expression, OrderCondition};
use crate::path::PropertyPath;
use crate::Algebra;
use rdf_algebra_model::{NamedNodePattern, Solution, TermPattern, TriplePattern, Variable};

/// A convenient builder for programmatically creating algebra trees.
///
/// Every method consumes the builder and wraps the current tree into a new node, applying the same
/// simplifications and validations as the constructors on [Algebra].
///
/// # Example
///
/// ```
/// use rdf_algebra_logical::{AlgebraBuilder, OrderCondition};
/// use rdf_algebra_model::{NamedNode, TriplePattern, Variable};
///
/// let s = Variable::new_unchecked("s");
/// let v = Variable::new_unchecked("v");
/// let pattern = TriplePattern {
///     subject: s.clone().into(),
///     predicate: NamedNode::new_unchecked("http://example.com/val").into(),
///     object: v.clone().into(),
/// };
///
/// let algebra = AlgebraBuilder::new_from_patterns(vec![pattern])
///     .order_by(vec![OrderCondition::Asc(v.into())])
///     .unwrap()
///     .slice(1, Some(2))
///     .project(&[s])
///     .build();
/// assert_eq!(algebra.name(), "Project");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgebraBuilder {
    algebra: Algebra,
}

impl AlgebraBuilder {
    /// Creates a new [AlgebraBuilder] with an existing `algebra`.
    pub fn new(algebra: Algebra) -> Self {
        Self { algebra }
    }

    /// Creates a builder that starts with the unit table.
    pub fn new_unit() -> Self {
        Self::new(Algebra::unit())
    }

    /// Creates a builder that starts with a basic graph pattern.
    pub fn new_from_patterns(patterns: Vec<TriplePattern>) -> Self {
        Self::new(Algebra::bgp(patterns))
    }

    /// Creates a builder that starts with a property path pattern.
    pub fn new_from_path(subject: TermPattern, path: PropertyPath, object: TermPattern) -> Self {
        Self::new(Algebra::path(subject, path, object))
    }

    /// Creates a builder that starts with a constant table.
    pub fn new_from_table(
        variables: Vec<Variable>,
        rows: Vec<Solution>,
    ) -> Result<Self, AlgebraError> {
        Ok(Self::new(Algebra::table(variables, rows)?))
    }

    /// Joins the current tree with `rhs`.
    ///
    /// # Relevant Resources
    /// - [SPARQL 1.1 - Compatible Mappings](https://www.w3.org/TR/sparql11-query/#defn_algCompatibleMapping)
    #[must_use]
    pub fn join(self, rhs: Algebra) -> Self {
        Self::new(Algebra::join(self.algebra, rhs))
    }

    /// Creates a left join (`OPTIONAL`) of the current tree with `rhs`.
    #[must_use]
    pub fn left_join(self, rhs: Algebra, filter: Option<Expression>) -> Self {
        Self::new(Algebra::left_join(self.algebra, rhs, filter))
    }

    #[must_use]
    pub fn union(self, rhs: Algebra) -> Self {
        Self::new(Algebra::union(self.algebra, rhs))
    }

    #[must_use]
    pub fn minus(self, rhs: Algebra) -> Self {
        Self::new(Algebra::minus(self.algebra, rhs))
    }

    /// Applies a filter using `expression`.
    ///
    /// The filter expression is evaluated for each solution. If the effective boolean value of the
    /// expression is `true`, the solution is kept; otherwise, it is discarded.
    ///
    /// # Relevant Resources
    /// - [SPARQL 1.1 - Effective Boolean Value (EBV)](https://www.w3.org/TR/sparql11-query/#ebv)
    pub fn filter(self, expression: Expression) -> Result<Self, AlgebraError> {
        Ok(Self::new(Algebra::filter(self.algebra, vec![expression])?))
    }

    /// Extends the current tree with a new variable binding.
    pub fn extend(self, variable: Variable, expression: Expression) -> Result<Self, AlgebraError> {
        let algebra = match self.algebra {
            Algebra::Extend {
                inner,
                mut assignments,
            } => {
                assignments.push((variable, expression));
                Algebra::extend(*inner, assignments)?
            }
            algebra => Algebra::extend(algebra, vec![(variable, expression)])?,
        };
        Ok(Self::new(algebra))
    }

    /// Projects the current tree to a new set of variables.
    #[must_use]
    pub fn project(self, variables: &[Variable]) -> Self {
        Self::new(Algebra::project(self.algebra, variables.to_vec()))
    }

    #[must_use]
    pub fn distinct(self) -> Self {
        Self::new(Algebra::distinct(self.algebra))
    }

    #[must_use]
    pub fn reduced(self) -> Self {
        Self::new(Algebra::reduced(self.algebra))
    }

    /// Sorts the current tree by the given conditions.
    pub fn order_by(self, conditions: Vec<OrderCondition>) -> Result<Self, AlgebraError> {
        Ok(Self::new(Algebra::order_by(self.algebra, conditions)?))
    }

    /// Applies skip (`offset`) and fetch (`limit`) to the current tree.
    #[must_use]
    pub fn slice(self, offset: usize, limit: Option<usize>) -> Self {
        Self::new(Algebra::slice(self.algebra, offset, limit))
    }

    /// Keeps the first `n` solutions according to the given conditions.
    pub fn top_n(self, conditions: Vec<OrderCondition>, n: usize) -> Result<Self, AlgebraError> {
        Ok(Self::new(Algebra::top_n(self.algebra, conditions, n)?))
    }

    /// Groups the current tree by `variables` and computes the `aggregates` for each group.
    pub fn group(
        self,
        variables: Vec<Variable>,
        aggregates: Vec<(Variable, AggregateExpression)>,
    ) -> Result<Self, AlgebraError> {
        Ok(Self::new(Algebra::group(
            self.algebra,
            variables,
            aggregates,
        )?))
    }

    /// Evaluates the current tree against the given named graph(s).
    #[must_use]
    pub fn named_graph(self, graph: NamedNodePattern) -> Self {
        Self::new(Algebra::named_graph(graph, self.algebra))
    }

    /// Delegates the current tree to a remote endpoint.
    #[must_use]
    pub fn service(self, name: NamedNodePattern, silent: bool) -> Self {
        Self::new(Algebra::service(name, self.algebra, silent))
    }

    /// Returns the algebra tree.
    pub fn build(self) -> Algebra {
        self.algebra
    }
}

impl From<Algebra> for AlgebraBuilder {
    fn from(value: Algebra) -> Self {
        Self::new(value)
    }
}
