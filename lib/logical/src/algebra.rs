use crate::error::AlgebraError;
use crate::expression::{AggregateExpression, Expression, OrderCondition};
use crate::path::PropertyPath;
use itertools::Itertools;
use rdf_algebra_model::{NamedNodePattern, Solution, TermPattern, TriplePattern, Variable};
use std::collections::HashSet;
use std::fmt;

/// A node of the SPARQL algebra.
///
/// The tree is immutable once constructed. Equality is structural. The constructors (e.g.,
/// [Algebra::join] or [Algebra::filter]) apply simplifications and validate their arguments. The
/// evaluator validates each node again, as the variants can also be assembled directly.
///
/// # Relevant Resources
/// - [SPARQL 1.1 - SPARQL Algebra](https://www.w3.org/TR/sparql11-query/#sparqlAlgebra)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Algebra {
    /// A basic graph pattern. A BGP over zero patterns is the unit table.
    Bgp { patterns: Vec<TriplePattern> },
    /// A property path between a subject and an object.
    Path {
        subject: TermPattern,
        path: PropertyPath,
        object: TermPattern,
    },
    /// Inner join.
    Join { left: Box<Self>, right: Box<Self> },
    /// Left outer join (`OPTIONAL`) with an optional filter.
    LeftJoin {
        left: Box<Self>,
        right: Box<Self>,
        expression: Option<Expression>,
    },
    /// Bag union.
    Union { left: Box<Self>, right: Box<Self> },
    /// `MINUS`.
    Minus { left: Box<Self>, right: Box<Self> },
    /// Keeps the solutions for which all expressions are true.
    Filter {
        inner: Box<Self>,
        expressions: Vec<Expression>,
    },
    /// Binds new variables to the results of expressions.
    Extend {
        inner: Box<Self>,
        assignments: Vec<(Variable, Expression)>,
    },
    Project {
        inner: Box<Self>,
        variables: Vec<Variable>,
    },
    Distinct { inner: Box<Self> },
    /// Permits, but does not require, the removal of duplicates.
    Reduced { inner: Box<Self> },
    OrderBy {
        inner: Box<Self>,
        conditions: Vec<OrderCondition>,
    },
    Slice {
        inner: Box<Self>,
        offset: usize,
        limit: Option<usize>,
    },
    /// Equivalent to an `OrderBy` followed by a `Slice` with limit `n` and no offset.
    TopN {
        inner: Box<Self>,
        conditions: Vec<OrderCondition>,
        n: usize,
    },
    Group {
        inner: Box<Self>,
        variables: Vec<Variable>,
        aggregates: Vec<(Variable, AggregateExpression)>,
    },
    /// Evaluates `inner` against a named graph. If `graph` is a variable, `inner` is evaluated
    /// against every named graph and the variable is bound to the graph name.
    NamedGraph {
        graph: NamedNodePattern,
        inner: Box<Self>,
    },
    /// A constant sequence of solutions (`VALUES`).
    Table {
        variables: Vec<Variable>,
        rows: Vec<Solution>,
    },
    /// Delegates the evaluation of `inner` to a remote endpoint.
    Service {
        name: NamedNodePattern,
        inner: Box<Self>,
        silent: bool,
    },
}

impl Algebra {
    /// Creates the unit table, a table with exactly one empty solution.
    pub fn unit() -> Self {
        Self::Table {
            variables: Vec::new(),
            rows: vec![Solution::new()],
        }
    }

    /// Creates the empty table that contains no solutions.
    pub fn empty() -> Self {
        Self::Table {
            variables: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn bgp(patterns: Vec<TriplePattern>) -> Self {
        Self::Bgp { patterns }
    }

    pub fn path(subject: TermPattern, path: PropertyPath, object: TermPattern) -> Self {
        Self::Path {
            subject,
            path,
            object,
        }
    }

    /// Creates a join.
    ///
    /// If either operand is the unit table, the other operand is returned unchanged. Two BGPs are
    /// merged into a single BGP.
    pub fn join(left: Algebra, right: Algebra) -> Self {
        if left.is_unit() {
            return right;
        }
        if right.is_unit() {
            return left;
        }
        match (left, right) {
            (Self::Bgp { patterns: mut left }, Self::Bgp { patterns: right }) => {
                left.extend(right);
                Self::Bgp { patterns: left }
            }
            (left, right) => Self::Join {
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    pub fn left_join(left: Algebra, right: Algebra, expression: Option<Expression>) -> Self {
        Self::LeftJoin {
            left: Box::new(left),
            right: Box::new(right),
            expression,
        }
    }

    pub fn union(left: Algebra, right: Algebra) -> Self {
        Self::Union {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn minus(left: Algebra, right: Algebra) -> Self {
        Self::Minus {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a filter. Filters that directly wrap another filter are merged.
    pub fn filter(inner: Algebra, expressions: Vec<Expression>) -> Result<Self, AlgebraError> {
        if expressions.is_empty() {
            return Err(AlgebraError::EmptyExpressionList("Filter"));
        }
        Ok(match inner {
            Self::Filter {
                inner,
                expressions: mut existing,
            } => {
                existing.extend(expressions);
                Self::Filter {
                    inner,
                    expressions: existing,
                }
            }
            inner => Self::Filter {
                inner: Box::new(inner),
                expressions,
            },
        })
    }

    pub fn extend(
        inner: Algebra,
        assignments: Vec<(Variable, Expression)>,
    ) -> Result<Self, AlgebraError> {
        let node = Self::Extend {
            inner: Box::new(inner),
            assignments,
        };
        node.validate_node()?;
        Ok(node)
    }

    pub fn project(inner: Algebra, variables: Vec<Variable>) -> Self {
        Self::Project {
            inner: Box::new(inner),
            variables,
        }
    }

    pub fn distinct(inner: Algebra) -> Self {
        Self::Distinct {
            inner: Box::new(inner),
        }
    }

    pub fn reduced(inner: Algebra) -> Self {
        Self::Reduced {
            inner: Box::new(inner),
        }
    }

    pub fn order_by(inner: Algebra, conditions: Vec<OrderCondition>) -> Result<Self, AlgebraError> {
        let node = Self::OrderBy {
            inner: Box::new(inner),
            conditions,
        };
        node.validate_node()?;
        Ok(node)
    }

    /// Creates a slice that skips `offset` solutions and then takes at most `limit` solutions.
    pub fn slice(inner: Algebra, offset: usize, limit: Option<usize>) -> Self {
        Self::Slice {
            inner: Box::new(inner),
            offset,
            limit,
        }
    }

    /// Creates a slice from signed arguments. A negative `offset` is clamped to zero and a
    /// negative `limit` means that the slice is unbounded.
    pub fn slice_signed(inner: Algebra, offset: i64, limit: i64) -> Self {
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).ok();
        Self::slice(inner, offset, limit)
    }

    pub fn top_n(
        inner: Algebra,
        conditions: Vec<OrderCondition>,
        n: usize,
    ) -> Result<Self, AlgebraError> {
        let node = Self::TopN {
            inner: Box::new(inner),
            conditions,
            n,
        };
        node.validate_node()?;
        Ok(node)
    }

    pub fn group(
        inner: Algebra,
        variables: Vec<Variable>,
        aggregates: Vec<(Variable, AggregateExpression)>,
    ) -> Result<Self, AlgebraError> {
        let node = Self::Group {
            inner: Box::new(inner),
            variables,
            aggregates,
        };
        node.validate_node()?;
        Ok(node)
    }

    pub fn named_graph(graph: NamedNodePattern, inner: Algebra) -> Self {
        Self::NamedGraph {
            graph,
            inner: Box::new(inner),
        }
    }

    pub fn table(variables: Vec<Variable>, rows: Vec<Solution>) -> Result<Self, AlgebraError> {
        let node = Self::Table { variables, rows };
        node.validate_node()?;
        Ok(node)
    }

    pub fn service(name: NamedNodePattern, inner: Algebra, silent: bool) -> Self {
        Self::Service {
            name,
            inner: Box::new(inner),
            silent,
        }
    }

    /// Returns whether the node is the unit table: a BGP with no patterns or a table with exactly
    /// one empty solution.
    pub fn is_unit(&self) -> bool {
        match self {
            Self::Bgp { patterns } => patterns.is_empty(),
            Self::Table { rows, .. } => rows.len() == 1 && rows[0].is_empty(),
            _ => false,
        }
    }

    /// Returns whether the node is a table without any solutions.
    pub fn is_empty_table(&self) -> bool {
        matches!(self, Self::Table { rows, .. } if rows.is_empty())
    }

    /// Returns the name of the operator.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bgp { .. } => "Bgp",
            Self::Path { .. } => "Path",
            Self::Join { .. } => "Join",
            Self::LeftJoin { .. } => "LeftJoin",
            Self::Union { .. } => "Union",
            Self::Minus { .. } => "Minus",
            Self::Filter { .. } => "Filter",
            Self::Extend { .. } => "Extend",
            Self::Project { .. } => "Project",
            Self::Distinct { .. } => "Distinct",
            Self::Reduced { .. } => "Reduced",
            Self::OrderBy { .. } => "OrderBy",
            Self::Slice { .. } => "Slice",
            Self::TopN { .. } => "TopN",
            Self::Group { .. } => "Group",
            Self::NamedGraph { .. } => "NamedGraph",
            Self::Table { .. } => "Table",
            Self::Service { .. } => "Service",
        }
    }

    /// Returns the direct algebra children of the node.
    pub fn children(&self) -> Vec<&Algebra> {
        match self {
            Self::Bgp { .. } | Self::Path { .. } | Self::Table { .. } => Vec::new(),
            Self::Join { left, right }
            | Self::LeftJoin { left, right, .. }
            | Self::Union { left, right }
            | Self::Minus { left, right } => vec![&**left, &**right],
            Self::Filter { inner, .. }
            | Self::Extend { inner, .. }
            | Self::Project { inner, .. }
            | Self::Distinct { inner }
            | Self::Reduced { inner }
            | Self::OrderBy { inner, .. }
            | Self::Slice { inner, .. }
            | Self::TopN { inner, .. }
            | Self::Group { inner, .. }
            | Self::NamedGraph { inner, .. }
            | Self::Service { inner, .. } => vec![&**inner],
        }
    }

    /// Checks the invariants of this node (not of its children).
    pub fn validate_node(&self) -> Result<(), AlgebraError> {
        match self {
            Self::Filter { expressions, .. } if expressions.is_empty() => {
                Err(AlgebraError::EmptyExpressionList("Filter"))
            }
            Self::Extend { assignments, .. } => {
                if assignments.is_empty() {
                    return Err(AlgebraError::EmptyExpressionList("Extend"));
                }
                let mut seen = HashSet::new();
                for (variable, _) in assignments {
                    if !seen.insert(variable) {
                        return Err(AlgebraError::DuplicateAssignment(variable.clone()));
                    }
                }
                Ok(())
            }
            Self::OrderBy { conditions, .. } if conditions.is_empty() => {
                Err(AlgebraError::EmptyExpressionList("OrderBy"))
            }
            Self::TopN { conditions, n, .. } => {
                if conditions.is_empty() {
                    return Err(AlgebraError::EmptyExpressionList("TopN"));
                }
                if *n < 1 {
                    return Err(AlgebraError::InvalidTopN);
                }
                Ok(())
            }
            Self::Group {
                variables,
                aggregates,
                ..
            } => {
                match aggregates.iter().find(|(v, _)| variables.contains(v)) {
                    Some((v, _)) => Err(AlgebraError::GroupVariableConflict(v.clone())),
                    None => Ok(()),
                }
            }
            Self::Table { variables, rows } => {
                for row in rows {
                    if let Some(v) = row.variables().find(|v| !variables.contains(v)) {
                        return Err(AlgebraError::UndeclaredTableVariable(v.clone()));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Writes the description of this node (without children) on a single line.
    fn fmt_node(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bgp { patterns } => {
                f.write_str("Bgp:")?;
                for pattern in patterns {
                    write!(
                        f,
                        " ({} {} {})",
                        pattern.subject, pattern.predicate, pattern.object
                    )?;
                }
                Ok(())
            }
            Self::Path {
                subject,
                path,
                object,
            } => write!(f, "Path: ({subject} {path} {object})"),
            Self::LeftJoin {
                expression: Some(expression),
                ..
            } => write!(f, "LeftJoin: {expression}"),
            Self::Join { .. }
            | Self::LeftJoin { .. }
            | Self::Union { .. }
            | Self::Minus { .. }
            | Self::Distinct { .. }
            | Self::Reduced { .. } => f.write_str(self.name()),
            Self::Filter { expressions, .. } => {
                write!(f, "Filter: {}", expressions.iter().join(", "))
            }
            Self::Extend { assignments, .. } => write!(
                f,
                "Extend: {}",
                assignments
                    .iter()
                    .map(|(v, e)| format!("{v} := {e}"))
                    .join(", ")
            ),
            Self::Project { variables, .. } => {
                write!(f, "Project: {}", variables.iter().join(", "))
            }
            Self::OrderBy { conditions, .. } => {
                write!(f, "OrderBy: {}", conditions.iter().join(", "))
            }
            Self::Slice { offset, limit, .. } => match limit {
                Some(limit) => write!(f, "Slice: offset={offset}, limit={limit}"),
                None => write!(f, "Slice: offset={offset}"),
            },
            Self::TopN { conditions, n, .. } => {
                write!(f, "TopN: n={n}, {}", conditions.iter().join(", "))
            }
            Self::Group {
                variables,
                aggregates,
                ..
            } => write!(
                f,
                "Group: [{}] [{}]",
                variables.iter().join(", "),
                aggregates
                    .iter()
                    .map(|(v, a)| format!("{v} := {a}"))
                    .join(", ")
            ),
            Self::NamedGraph { graph, .. } => write!(f, "NamedGraph: {graph}"),
            Self::Table { variables, rows } => write!(
                f,
                "Table: ({}) {}",
                variables.iter().join(" "),
                rows.iter().join(" ")
            ),
            Self::Service { name, silent, .. } => {
                if *silent {
                    write!(f, "Service: {name} SILENT")
                } else {
                    write!(f, "Service: {name}")
                }
            }
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}", "", indent = depth * 2)?;
        self.fmt_node(f)?;
        for child in self.children() {
            writeln!(f)?;
            child.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }

    fn fmt_compact(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        self.fmt_node(f)?;
        for child in self.children() {
            f.write_str(" ")?;
            child.fmt_compact(f)?;
        }
        f.write_str(")")
    }
}

/// Formats the algebra as an indented tree, one node per line. The alternate flag (`{:#}`) writes
/// the tree on a single line.
impl fmt::Display for Algebra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            self.fmt_compact(f)
        } else {
            self.fmt_tree(f, 0)
        }
    }
}
