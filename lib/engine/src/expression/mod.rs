//! Evaluation of expressions against a single solution.

mod functions;
pub(crate) mod value;

use crate::eval::SimpleEvaluator;
use crate::sparql::error::QueryEvaluationError;
use rdf_algebra_logical::Expression;
use rdf_algebra_model::{Literal, Solution, Term, ThinError};
use std::cmp::Ordering;
use value::Numeric;

pub use value::{compare_terms, order_terms, terms_equal};

/// The failure of an expression evaluation.
///
/// [ExpressionError::Expected] is the SPARQL notion of an evaluation error. It only affects the
/// current solution. [ExpressionError::Fatal] aborts the whole evaluation, e.g., if the store fails
/// while evaluating an `EXISTS` pattern.
#[derive(Debug)]
pub(crate) enum ExpressionError {
    Expected,
    Fatal(QueryEvaluationError),
}

pub(crate) type ExpressionResult<T> = Result<T, ExpressionError>;

impl From<ThinError> for ExpressionError {
    fn from(_: ThinError) -> Self {
        Self::Expected
    }
}

impl From<QueryEvaluationError> for ExpressionError {
    fn from(error: QueryEvaluationError) -> Self {
        Self::Fatal(error)
    }
}

/// Turns an expected error into [None] and keeps fatal errors.
pub(crate) fn recover<T>(result: ExpressionResult<T>) -> Result<Option<T>, QueryEvaluationError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ExpressionError::Expected) => Ok(None),
        Err(ExpressionError::Fatal(error)) => Err(error),
    }
}

impl SimpleEvaluator {
    /// Evaluates `expression` against `solution`.
    pub(crate) fn eval_expression(
        &self,
        expression: &Expression,
        solution: &Solution,
    ) -> ExpressionResult<Term> {
        match expression {
            Expression::NamedNode(node) => Ok(node.clone().into()),
            Expression::Literal(literal) => Ok(literal.clone().into()),
            Expression::Variable(variable) => solution
                .get(variable)
                .cloned()
                .ok_or(ExpressionError::Expected),
            Expression::Or(lhs, rhs) => {
                let lhs = self.eval_expression_ebv(lhs, solution);
                if matches!(lhs, Ok(true)) {
                    return Ok(true.into_term());
                }
                let rhs = self.eval_expression_ebv(rhs, solution);
                match (lhs, rhs) {
                    (Err(ExpressionError::Fatal(error)), _)
                    | (_, Err(ExpressionError::Fatal(error))) => Err(error.into()),
                    (_, Ok(true)) => Ok(true.into_term()),
                    (Ok(false), Ok(false)) => Ok(false.into_term()),
                    _ => Err(ExpressionError::Expected),
                }
            }
            Expression::And(lhs, rhs) => {
                let lhs = self.eval_expression_ebv(lhs, solution);
                if matches!(lhs, Ok(false)) {
                    return Ok(false.into_term());
                }
                let rhs = self.eval_expression_ebv(rhs, solution);
                match (lhs, rhs) {
                    (Err(ExpressionError::Fatal(error)), _)
                    | (_, Err(ExpressionError::Fatal(error))) => Err(error.into()),
                    (_, Ok(false)) => Ok(false.into_term()),
                    (Ok(true), Ok(true)) => Ok(true.into_term()),
                    _ => Err(ExpressionError::Expected),
                }
            }
            Expression::Equal(lhs, rhs) => {
                let lhs = self.eval_expression(lhs, solution)?;
                let rhs = self.eval_expression(rhs, solution)?;
                Ok(terms_equal(&lhs, &rhs)?.into_term())
            }
            Expression::SameTerm(lhs, rhs) => {
                let lhs = self.eval_expression(lhs, solution)?;
                let rhs = self.eval_expression(rhs, solution)?;
                Ok((lhs == rhs).into_term())
            }
            Expression::Greater(lhs, rhs) => self.eval_comparison(lhs, rhs, solution, |o| {
                o == Ordering::Greater
            }),
            Expression::GreaterOrEqual(lhs, rhs) => {
                self.eval_comparison(lhs, rhs, solution, |o| o != Ordering::Less)
            }
            Expression::Less(lhs, rhs) => {
                self.eval_comparison(lhs, rhs, solution, |o| o == Ordering::Less)
            }
            Expression::LessOrEqual(lhs, rhs) => {
                self.eval_comparison(lhs, rhs, solution, |o| o != Ordering::Greater)
            }
            Expression::In(needle, haystack) => {
                let needle = self.eval_expression(needle, solution)?;
                let mut error = None;
                for candidate in haystack {
                    match self.eval_expression(candidate, solution) {
                        Ok(candidate) => match terms_equal(&needle, &candidate) {
                            Ok(true) => return Ok(true.into_term()),
                            Ok(false) => {}
                            Err(_) => error = Some(ExpressionError::Expected),
                        },
                        Err(ExpressionError::Expected) => error = Some(ExpressionError::Expected),
                        Err(fatal) => return Err(fatal),
                    }
                }
                match error {
                    Some(error) => Err(error),
                    None => Ok(false.into_term()),
                }
            }
            Expression::Add(lhs, rhs) => self.eval_arithmetic(lhs, rhs, solution, Numeric::add),
            Expression::Subtract(lhs, rhs) => {
                self.eval_arithmetic(lhs, rhs, solution, Numeric::subtract)
            }
            Expression::Multiply(lhs, rhs) => {
                self.eval_arithmetic(lhs, rhs, solution, Numeric::multiply)
            }
            Expression::Divide(lhs, rhs) => {
                self.eval_arithmetic(lhs, rhs, solution, Numeric::divide)
            }
            Expression::UnaryPlus(inner) => {
                let term = self.eval_expression(inner, solution)?;
                Numeric::from_term(&term)?;
                Ok(term)
            }
            Expression::UnaryMinus(inner) => {
                let term = self.eval_expression(inner, solution)?;
                Ok(Numeric::from_term(&term)?.negate()?.into_term())
            }
            Expression::Not(inner) => Ok((!self.eval_expression_ebv(inner, solution)?).into_term()),
            Expression::Exists(pattern) => {
                let exists = match self.eval(pattern, solution.clone()).next() {
                    None => false,
                    Some(Ok(_)) => true,
                    Some(Err(error)) => return Err(error.into()),
                };
                Ok(exists.into_term())
            }
            Expression::Bound(variable) => Ok(solution.contains(variable).into_term()),
            Expression::If(condition, then, otherwise) => {
                if self.eval_expression_ebv(condition, solution)? {
                    self.eval_expression(then, solution)
                } else {
                    self.eval_expression(otherwise, solution)
                }
            }
            Expression::Coalesce(alternatives) => {
                for alternative in alternatives {
                    match self.eval_expression(alternative, solution) {
                        Ok(term) => return Ok(term),
                        Err(ExpressionError::Expected) => {}
                        Err(fatal) => return Err(fatal),
                    }
                }
                Err(ExpressionError::Expected)
            }
            Expression::FunctionCall(function, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval_expression(arg, solution))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                Ok(self.call_function(function, &args, solution)?)
            }
        }
    }

    /// Evaluates `expression` and computes the effective boolean value of the result.
    pub(crate) fn eval_expression_ebv(
        &self,
        expression: &Expression,
        solution: &Solution,
    ) -> ExpressionResult<bool> {
        let term = self.eval_expression(expression, solution)?;
        Ok(value::effective_boolean_value(&term)?)
    }

    fn eval_comparison(
        &self,
        lhs: &Expression,
        rhs: &Expression,
        solution: &Solution,
        accept: impl Fn(Ordering) -> bool,
    ) -> ExpressionResult<Term> {
        let lhs = self.eval_expression(lhs, solution)?;
        let rhs = self.eval_expression(rhs, solution)?;
        Ok(accept(compare_terms(&lhs, &rhs)?).into_term())
    }

    fn eval_arithmetic(
        &self,
        lhs: &Expression,
        rhs: &Expression,
        solution: &Solution,
        operation: impl Fn(Numeric, Numeric) -> Result<Numeric, ThinError>,
    ) -> ExpressionResult<Term> {
        let lhs = Numeric::from_term(&self.eval_expression(lhs, solution)?)?;
        let rhs = Numeric::from_term(&self.eval_expression(rhs, solution)?)?;
        Ok(operation(lhs, rhs)?.into_term())
    }
}

trait IntoTerm {
    fn into_term(self) -> Term;
}

impl IntoTerm for bool {
    fn into_term(self) -> Term {
        Literal::from(self).into()
    }
}
