use crate::eval::hidden_variable;
use crate::sparql::error::QueryEvaluationError;
use crate::sparql::rewriting::expression_rewriter::ExpressionRewriter;
use rdf_algebra_logical::{
    AggregateExpression, AggregateFunction, Algebra, AlgebraBuilder, Expression, OrderCondition,
    PropertyPath,
};
use rdf_algebra_model::{GroundTerm, Solution, Term, TermPattern, TriplePattern};
use spargebra::algebra::{
    AggregateExpression as SparqlAggregateExpression,
    AggregateFunction as SparqlAggregateFunction, GraphPattern, OrderExpression,
    PropertyPathExpression,
};
use tracing::trace;

type RewriteResult<T> = Result<T, QueryEvaluationError>;

/// Rewrites a [GraphPattern] into an [Algebra] tree.
///
/// Blank nodes in patterns become hidden variables that are never projected. An `ORDER BY`
/// directly followed by a `LIMIT` becomes a [Algebra::TopN].
#[derive(Debug, Default)]
pub struct GraphPatternRewriter;

impl GraphPatternRewriter {
    pub fn rewrite(&self, pattern: &GraphPattern) -> RewriteResult<Algebra> {
        let algebra = self.rewrite_graph_pattern(pattern)?.build();
        trace!(%algebra, "Rewrote graph pattern");
        Ok(algebra)
    }

    fn rewrite_graph_pattern(&self, pattern: &GraphPattern) -> RewriteResult<AlgebraBuilder> {
        match pattern {
            GraphPattern::Bgp { patterns } => Ok(AlgebraBuilder::new_from_patterns(
                patterns.iter().map(rewrite_triple_pattern).collect(),
            )),
            GraphPattern::Path {
                subject,
                path,
                object,
            } => Ok(AlgebraBuilder::new_from_path(
                rewrite_term_pattern(subject),
                rewrite_path(path),
                rewrite_term_pattern(object),
            )),
            GraphPattern::Join { left, right } => {
                let left = self.rewrite_graph_pattern(left)?;
                let right = self.rewrite_graph_pattern(right)?;
                Ok(left.join(right.build()))
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                let lhs = self.rewrite_graph_pattern(left)?;
                let rhs = self.rewrite_graph_pattern(right)?;
                let filter = expression
                    .as_ref()
                    .map(|expression| self.rewrite_expression(expression))
                    .transpose()?;
                Ok(lhs.left_join(rhs.build(), filter))
            }
            GraphPattern::Filter { expr, inner } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                Ok(inner.filter(self.rewrite_expression(expr)?)?)
            }
            GraphPattern::Union { left, right } => {
                let lhs = self.rewrite_graph_pattern(left)?;
                let rhs = self.rewrite_graph_pattern(right)?;
                Ok(lhs.union(rhs.build()))
            }
            GraphPattern::Graph { name, inner } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                Ok(inner.named_graph(name.clone()))
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                Ok(inner.extend(variable.clone(), self.rewrite_expression(expression)?)?)
            }
            GraphPattern::Minus { left, right } => {
                let left = self.rewrite_graph_pattern(left)?;
                let right = self.rewrite_graph_pattern(right)?;
                Ok(left.minus(right.build()))
            }
            GraphPattern::Values {
                variables,
                bindings,
            } => {
                let rows = bindings
                    .iter()
                    .map(|row| {
                        variables
                            .iter()
                            .zip(row)
                            .filter_map(|(variable, value)| {
                                Some((variable.clone(), rewrite_ground_term(value.as_ref()?)))
                            })
                            .collect::<Solution>()
                    })
                    .collect();
                Ok(AlgebraBuilder::new_from_table(variables.clone(), rows)?)
            }
            GraphPattern::OrderBy { inner, expression } => {
                let conditions = self.rewrite_order_expressions(expression)?;
                Ok(self.rewrite_graph_pattern(inner)?.order_by(conditions)?)
            }
            GraphPattern::Project { inner, variables } => {
                Ok(self.rewrite_graph_pattern(inner)?.project(variables))
            }
            GraphPattern::Distinct { inner } => Ok(self.rewrite_graph_pattern(inner)?.distinct()),
            GraphPattern::Reduced { inner } => Ok(self.rewrite_graph_pattern(inner)?.reduced()),
            GraphPattern::Slice {
                inner,
                start,
                length,
            } => {
                if let Some(length) = length.filter(|length| *length > 0) {
                    if let Some(top_n) = self.rewrite_top_n(inner, start.saturating_add(length))? {
                        return Ok(if *start > 0 {
                            top_n.slice(*start, Some(length))
                        } else {
                            top_n
                        });
                    }
                }
                Ok(self.rewrite_graph_pattern(inner)?.slice(*start, *length))
            }
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => {
                let aggregates = aggregates
                    .iter()
                    .map(|(variable, aggregate)| {
                        Ok((variable.clone(), self.rewrite_aggregate(aggregate)?))
                    })
                    .collect::<RewriteResult<Vec<_>>>()?;
                Ok(self
                    .rewrite_graph_pattern(inner)?
                    .group(variables.clone(), aggregates)?)
            }
            GraphPattern::Service {
                name,
                inner,
                silent,
            } => Ok(self
                .rewrite_graph_pattern(inner)?
                .service(name.clone(), *silent)),
        }
    }

    /// Rewrites `ORDER BY` (optionally below a projection) into a [Algebra::TopN] that keeps `n`
    /// solutions. Returns [None] if `pattern` has another shape.
    fn rewrite_top_n(
        &self,
        pattern: &GraphPattern,
        n: usize,
    ) -> RewriteResult<Option<AlgebraBuilder>> {
        match pattern {
            GraphPattern::OrderBy { inner, expression } => {
                let conditions = self.rewrite_order_expressions(expression)?;
                let inner = self.rewrite_graph_pattern(inner)?;
                Ok(Some(inner.top_n(conditions, n)?))
            }
            GraphPattern::Project { inner, variables } => Ok(self
                .rewrite_top_n(inner, n)?
                .map(|top_n| top_n.project(variables))),
            _ => Ok(None),
        }
    }

    /// Rewrites an [spargebra::algebra::Expression].
    pub(super) fn rewrite_expression(
        &self,
        expression: &spargebra::algebra::Expression,
    ) -> RewriteResult<Expression> {
        ExpressionRewriter::new(self).rewrite(expression)
    }

    fn rewrite_order_expressions(
        &self,
        expressions: &[OrderExpression],
    ) -> RewriteResult<Vec<OrderCondition>> {
        expressions
            .iter()
            .map(|expression| {
                Ok(match expression {
                    OrderExpression::Asc(inner) => {
                        OrderCondition::Asc(self.rewrite_expression(inner)?)
                    }
                    OrderExpression::Desc(inner) => {
                        OrderCondition::Desc(self.rewrite_expression(inner)?)
                    }
                })
            })
            .collect()
    }

    /// Rewrites an [SparqlAggregateExpression].
    fn rewrite_aggregate(
        &self,
        expression: &SparqlAggregateExpression,
    ) -> RewriteResult<AggregateExpression> {
        Ok(match expression {
            SparqlAggregateExpression::CountSolutions { distinct } => {
                AggregateExpression::CountSolutions {
                    distinct: *distinct,
                }
            }
            SparqlAggregateExpression::FunctionCall {
                name,
                expr,
                distinct,
            } => {
                let function = match name {
                    SparqlAggregateFunction::Count => AggregateFunction::Count,
                    SparqlAggregateFunction::Sum => AggregateFunction::Sum,
                    SparqlAggregateFunction::Avg => AggregateFunction::Avg,
                    SparqlAggregateFunction::Min => AggregateFunction::Min,
                    SparqlAggregateFunction::Max => AggregateFunction::Max,
                    SparqlAggregateFunction::Sample => AggregateFunction::Sample,
                    SparqlAggregateFunction::GroupConcat { separator } => {
                        AggregateFunction::GroupConcat {
                            separator: separator.clone(),
                        }
                    }
                    SparqlAggregateFunction::Custom(name) => {
                        return Err(QueryEvaluationError::NotImplemented(format!(
                            "Custom aggregate function {name}"
                        )))
                    }
                };
                AggregateExpression::FunctionCall {
                    function,
                    expression: self.rewrite_expression(expr)?,
                    distinct: *distinct,
                }
            }
        })
    }
}

fn rewrite_triple_pattern(pattern: &TriplePattern) -> TriplePattern {
    TriplePattern {
        subject: rewrite_term_pattern(&pattern.subject),
        predicate: pattern.predicate.clone(),
        object: rewrite_term_pattern(&pattern.object),
    }
}

fn rewrite_term_pattern(pattern: &TermPattern) -> TermPattern {
    match pattern {
        TermPattern::BlankNode(node) => hidden_variable(node).into(),
        other => other.clone(),
    }
}

fn rewrite_ground_term(term: &GroundTerm) -> Term {
    match term {
        GroundTerm::NamedNode(node) => node.clone().into(),
        GroundTerm::Literal(literal) => literal.clone().into(),
    }
}

fn rewrite_path(path: &PropertyPathExpression) -> PropertyPath {
    match path {
        PropertyPathExpression::NamedNode(node) => PropertyPath::Predicate(node.clone()),
        PropertyPathExpression::Reverse(inner) => PropertyPath::inverse(rewrite_path(inner)),
        PropertyPathExpression::Sequence(lhs, rhs) => {
            PropertyPath::sequence(rewrite_path(lhs), rewrite_path(rhs))
        }
        PropertyPathExpression::Alternative(lhs, rhs) => {
            PropertyPath::alternative(rewrite_path(lhs), rewrite_path(rhs))
        }
        PropertyPathExpression::ZeroOrMore(inner) => {
            PropertyPath::zero_or_more(rewrite_path(inner))
        }
        PropertyPathExpression::OneOrMore(inner) => PropertyPath::one_or_more(rewrite_path(inner)),
        PropertyPathExpression::ZeroOrOne(inner) => {
            PropertyPath::zero_or_one(rewrite_path(inner))
        }
        PropertyPathExpression::NegatedPropertySet(nodes) => {
            PropertyPath::NegatedPropertySet(nodes.clone())
        }
    }
}
