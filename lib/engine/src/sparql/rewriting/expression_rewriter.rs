use crate::sparql::error::QueryEvaluationError;
use crate::sparql::rewriting::GraphPatternRewriter;
use rdf_algebra_logical::{Expression, Function};
use spargebra::algebra::{Expression as SparqlExpression, Function as SparqlFunction};

pub(super) struct ExpressionRewriter<'rewriter> {
    graph_rewriter: &'rewriter GraphPatternRewriter,
}

impl<'rewriter> ExpressionRewriter<'rewriter> {
    pub fn new(graph_rewriter: &'rewriter GraphPatternRewriter) -> Self {
        Self { graph_rewriter }
    }

    /// Rewrites a [SparqlExpression].
    pub fn rewrite(&self, expression: &SparqlExpression) -> Result<Expression, QueryEvaluationError> {
        Ok(match expression {
            SparqlExpression::NamedNode(node) => Expression::NamedNode(node.clone()),
            SparqlExpression::Literal(literal) => Expression::Literal(literal.clone()),
            SparqlExpression::Variable(variable) => Expression::Variable(variable.clone()),
            SparqlExpression::Or(lhs, rhs) => Expression::or(self.rewrite(lhs)?, self.rewrite(rhs)?),
            SparqlExpression::And(lhs, rhs) => {
                Expression::and(self.rewrite(lhs)?, self.rewrite(rhs)?)
            }
            SparqlExpression::Equal(lhs, rhs) => {
                Expression::equal(self.rewrite(lhs)?, self.rewrite(rhs)?)
            }
            SparqlExpression::SameTerm(lhs, rhs) => {
                Expression::SameTerm(self.rewrite_boxed(lhs)?, self.rewrite_boxed(rhs)?)
            }
            SparqlExpression::Greater(lhs, rhs) => {
                Expression::greater(self.rewrite(lhs)?, self.rewrite(rhs)?)
            }
            SparqlExpression::GreaterOrEqual(lhs, rhs) => {
                Expression::GreaterOrEqual(self.rewrite_boxed(lhs)?, self.rewrite_boxed(rhs)?)
            }
            SparqlExpression::Less(lhs, rhs) => {
                Expression::less(self.rewrite(lhs)?, self.rewrite(rhs)?)
            }
            SparqlExpression::LessOrEqual(lhs, rhs) => {
                Expression::LessOrEqual(self.rewrite_boxed(lhs)?, self.rewrite_boxed(rhs)?)
            }
            SparqlExpression::In(lhs, rhs) => {
                Expression::In(self.rewrite_boxed(lhs)?, self.rewrite_all(rhs)?)
            }
            SparqlExpression::Add(lhs, rhs) => {
                Expression::Add(self.rewrite_boxed(lhs)?, self.rewrite_boxed(rhs)?)
            }
            SparqlExpression::Subtract(lhs, rhs) => {
                Expression::Subtract(self.rewrite_boxed(lhs)?, self.rewrite_boxed(rhs)?)
            }
            SparqlExpression::Multiply(lhs, rhs) => {
                Expression::Multiply(self.rewrite_boxed(lhs)?, self.rewrite_boxed(rhs)?)
            }
            SparqlExpression::Divide(lhs, rhs) => {
                Expression::Divide(self.rewrite_boxed(lhs)?, self.rewrite_boxed(rhs)?)
            }
            SparqlExpression::UnaryPlus(inner) => Expression::UnaryPlus(self.rewrite_boxed(inner)?),
            SparqlExpression::UnaryMinus(inner) => {
                Expression::UnaryMinus(self.rewrite_boxed(inner)?)
            }
            SparqlExpression::Not(inner) => Expression::not(self.rewrite(inner)?),
            SparqlExpression::Exists(pattern) => {
                Expression::exists(self.graph_rewriter.rewrite(pattern)?)
            }
            SparqlExpression::Bound(variable) => Expression::Bound(variable.clone()),
            SparqlExpression::If(test, if_true, if_false) => Expression::If(
                self.rewrite_boxed(test)?,
                self.rewrite_boxed(if_true)?,
                self.rewrite_boxed(if_false)?,
            ),
            SparqlExpression::Coalesce(args) => Expression::Coalesce(self.rewrite_all(args)?),
            SparqlExpression::FunctionCall(function, args) => {
                Expression::call(rewrite_function(function)?, self.rewrite_all(args)?)
            }
        })
    }

    fn rewrite_boxed(
        &self,
        expression: &SparqlExpression,
    ) -> Result<Box<Expression>, QueryEvaluationError> {
        self.rewrite(expression).map(Box::new)
    }

    fn rewrite_all(
        &self,
        expressions: &[SparqlExpression],
    ) -> Result<Vec<Expression>, QueryEvaluationError> {
        expressions.iter().map(|e| self.rewrite(e)).collect()
    }
}

/// Maps a SPARQL function onto a function that the evaluator implements.
fn rewrite_function(function: &SparqlFunction) -> Result<Function, QueryEvaluationError> {
    Ok(match function {
        SparqlFunction::Str => Function::Str,
        SparqlFunction::Lang => Function::Lang,
        SparqlFunction::LangMatches => Function::LangMatches,
        SparqlFunction::Datatype => Function::Datatype,
        SparqlFunction::Iri => Function::Iri,
        SparqlFunction::BNode => Function::BNode,
        SparqlFunction::Abs => Function::Abs,
        SparqlFunction::Ceil => Function::Ceil,
        SparqlFunction::Floor => Function::Floor,
        SparqlFunction::Round => Function::Round,
        SparqlFunction::Concat => Function::Concat,
        SparqlFunction::SubStr => Function::SubStr,
        SparqlFunction::StrLen => Function::StrLen,
        SparqlFunction::Replace => Function::Replace,
        SparqlFunction::UCase => Function::UCase,
        SparqlFunction::LCase => Function::LCase,
        SparqlFunction::Contains => Function::Contains,
        SparqlFunction::StrStarts => Function::StrStarts,
        SparqlFunction::StrEnds => Function::StrEnds,
        SparqlFunction::StrBefore => Function::StrBefore,
        SparqlFunction::StrAfter => Function::StrAfter,
        SparqlFunction::StrLang => Function::StrLang,
        SparqlFunction::StrDt => Function::StrDt,
        SparqlFunction::IsIri => Function::IsIri,
        SparqlFunction::IsBlank => Function::IsBlank,
        SparqlFunction::IsLiteral => Function::IsLiteral,
        SparqlFunction::IsNumeric => Function::IsNumeric,
        SparqlFunction::Regex => Function::Regex,
        SparqlFunction::Custom(name) => Function::Custom(name.clone()),
        other => {
            return Err(QueryEvaluationError::NotImplemented(format!(
                "SPARQL function {other}"
            )))
        }
    })
}
