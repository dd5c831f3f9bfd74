use crate::eval::{SimpleEvaluator, SolutionIter};
use crate::expression::value::{Numeric, StringArg};
use crate::expression::{order_terms, recover};
use crate::sparql::error::QueryEvaluationError;
use rdf_algebra_logical::{AggregateExpression, AggregateFunction, Algebra, Expression};
use rdf_algebra_model::{Integer, Literal, Solution, Term, ThinError, ThinResult, Variable};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::iter::once;

impl SimpleEvaluator {
    /// Groups the solutions of `inner` by `variables` and computes the aggregates of each group.
    ///
    /// Without group variables, there is exactly one group, even if `inner` has no solutions.
    pub(super) fn eval_group<'a>(
        &self,
        inner: &'a Algebra,
        variables: &'a [Variable],
        aggregates: &'a [(Variable, AggregateExpression)],
        from: Solution,
    ) -> SolutionIter<'a> {
        let mut positions: FxHashMap<Vec<Option<Term>>, usize> = FxHashMap::default();
        let mut groups: Vec<(Vec<Option<Term>>, Vec<AggregateState<'a>>)> = Vec::new();
        if variables.is_empty() {
            positions.insert(Vec::new(), 0);
            groups.push((Vec::new(), new_states(aggregates)));
        }

        for solution in self.eval(inner, Solution::new()) {
            let solution = match solution {
                Ok(solution) => solution,
                Err(error) => return Box::new(once(Err(error))),
            };
            let key = variables
                .iter()
                .map(|variable| solution.get(variable).cloned())
                .collect::<Vec<_>>();
            let position = *positions.entry(key.clone()).or_insert_with(|| {
                groups.push((key, new_states(aggregates)));
                groups.len() - 1
            });
            for state in &mut groups[position].1 {
                if let Err(error) = state.add(self, &solution) {
                    return Box::new(once(Err(error)));
                }
            }
        }

        Box::new(groups.into_iter().filter_map(move |(key, states)| {
            let mut result = Solution::new();
            for (variable, value) in variables.iter().zip(key) {
                if let Some(value) = value {
                    result.try_bind(variable.clone(), value).ok()?;
                }
            }
            for ((variable, _), state) in aggregates.iter().zip(states) {
                if let Some(value) = state.finish() {
                    result.try_bind(variable.clone(), value).ok()?;
                }
            }
            result.merge(&from).map(Ok)
        }))
    }
}

fn new_states(aggregates: &[(Variable, AggregateExpression)]) -> Vec<AggregateState<'_>> {
    aggregates
        .iter()
        .map(|(_, aggregate)| AggregateState::new(aggregate))
        .collect()
}

/// The running state of one aggregate within one group.
enum AggregateState<'a> {
    CountSolutions {
        count: i64,
        seen: Option<FxHashSet<Solution>>,
    },
    FunctionCall {
        expression: &'a Expression,
        seen: Option<FxHashSet<Term>>,
        accumulator: Accumulator,
    },
}

impl<'a> AggregateState<'a> {
    fn new(aggregate: &'a AggregateExpression) -> Self {
        match aggregate {
            AggregateExpression::CountSolutions { distinct } => Self::CountSolutions {
                count: 0,
                seen: distinct.then(FxHashSet::default),
            },
            AggregateExpression::FunctionCall {
                function,
                expression,
                distinct,
            } => Self::FunctionCall {
                expression,
                seen: distinct.then(FxHashSet::default),
                accumulator: Accumulator::new(function),
            },
        }
    }

    fn add(
        &mut self,
        evaluator: &SimpleEvaluator,
        solution: &Solution,
    ) -> Result<(), QueryEvaluationError> {
        match self {
            Self::CountSolutions { count, seen } => {
                if seen
                    .as_mut()
                    .map_or(true, |seen| seen.insert(solution.clone()))
                {
                    *count += 1;
                }
            }
            Self::FunctionCall {
                expression,
                seen,
                accumulator,
            } => {
                let value = recover(evaluator.eval_expression(*expression, solution))?;
                if let (Some(seen), Some(value)) = (seen.as_mut(), &value) {
                    if !seen.insert(value.clone()) {
                        return Ok(());
                    }
                }
                accumulator.add(value);
            }
        }
        Ok(())
    }

    fn finish(self) -> Option<Term> {
        match self {
            Self::CountSolutions { count, .. } => Some(Literal::from(count).into()),
            Self::FunctionCall { accumulator, .. } => accumulator.finish(),
        }
    }
}

/// Accumulates the values of an aggregate function. Adding [None] records an evaluation error.
enum Accumulator {
    Count(i64),
    Sum(ThinResult<Numeric>),
    Avg {
        sum: ThinResult<Numeric>,
        count: i64,
    },
    Min(Option<Term>),
    Max(Option<Term>),
    Sample(Option<Term>),
    GroupConcat {
        separator: String,
        value: ThinResult<String>,
        language: Option<Option<String>>,
    },
}

impl Accumulator {
    fn new(function: &AggregateFunction) -> Self {
        let zero = Ok(Numeric::Integer(Integer::from(0)));
        match function {
            AggregateFunction::Count => Self::Count(0),
            AggregateFunction::Sum => Self::Sum(zero),
            AggregateFunction::Avg => Self::Avg {
                sum: zero,
                count: 0,
            },
            AggregateFunction::Min => Self::Min(None),
            AggregateFunction::Max => Self::Max(None),
            AggregateFunction::Sample => Self::Sample(None),
            AggregateFunction::GroupConcat { separator } => Self::GroupConcat {
                separator: separator.clone().unwrap_or_else(|| " ".to_owned()),
                value: Ok(String::new()),
                language: None,
            },
        }
    }

    fn add(&mut self, value: Option<Term>) {
        match self {
            Self::Count(count) => {
                if value.is_some() {
                    *count += 1;
                }
            }
            Self::Sum(sum) => *sum = add_numeric(sum, value.as_ref()),
            Self::Avg { sum, count } => {
                *sum = add_numeric(sum, value.as_ref());
                *count += 1;
            }
            Self::Min(current) => {
                if let Some(value) = value {
                    if current
                        .as_ref()
                        .map_or(true, |c| order_terms(Some(&value), Some(c)) == Ordering::Less)
                    {
                        *current = Some(value);
                    }
                }
            }
            Self::Max(current) => {
                if let Some(value) = value {
                    if current.as_ref().map_or(true, |c| {
                        order_terms(Some(&value), Some(c)) == Ordering::Greater
                    }) {
                        *current = Some(value);
                    }
                }
            }
            Self::Sample(current) => {
                if current.is_none() {
                    *current = value;
                }
            }
            Self::GroupConcat {
                separator,
                value: concatenated,
                language,
            } => {
                let Ok(result) = concatenated else {
                    return;
                };
                let arg = match value.as_ref().map(StringArg::from_term) {
                    Some(Ok(arg)) => arg,
                    _ => {
                        *concatenated = ThinError::expected();
                        return;
                    }
                };
                if language.is_some() {
                    result.push_str(separator);
                }
                result.push_str(arg.value);
                let arg_language = arg.language.map(str::to_owned);
                *language = match language.take() {
                    None => Some(arg_language),
                    Some(previous) if previous == arg_language => Some(previous),
                    Some(_) => Some(None),
                };
            }
        }
    }

    fn finish(self) -> Option<Term> {
        match self {
            Self::Count(count) => Some(Literal::from(count).into()),
            Self::Sum(sum) => sum.ok().map(Numeric::into_term),
            Self::Avg { sum, count } => {
                if count == 0 {
                    return Some(Numeric::Integer(Integer::from(0)).into_term());
                }
                sum.ok()?
                    .divide(Numeric::Integer(Integer::from(count)))
                    .ok()
                    .map(Numeric::into_term)
            }
            Self::Min(value) | Self::Max(value) | Self::Sample(value) => value,
            Self::GroupConcat {
                value, language, ..
            } => {
                let value = value.ok()?;
                Some(match language.flatten() {
                    Some(language) => {
                        Literal::new_language_tagged_literal_unchecked(value, language).into()
                    }
                    None => Literal::new_simple_literal(value).into(),
                })
            }
        }
    }
}

fn add_numeric(sum: &ThinResult<Numeric>, value: Option<&Term>) -> ThinResult<Numeric> {
    let value = Numeric::from_term(value.ok_or(ThinError {})?)?;
    (*sum)?.add(value)
}
