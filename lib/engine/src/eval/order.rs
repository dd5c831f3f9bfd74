use crate::eval::{SimpleEvaluator, SolutionIter};
use crate::expression::{order_terms, recover};
use crate::sparql::error::QueryEvaluationError;
use rdf_algebra_logical::{Algebra, OrderCondition};
use rdf_algebra_model::{Solution, Term};
use std::cmp::Ordering;
use std::iter::once;

/// A solution together with the values of its sort keys. Keys that fail to evaluate are [None].
type Keyed = (Vec<Option<Term>>, Solution);

impl SimpleEvaluator {
    /// Sorts the solutions of `inner`. The sort is stable.
    pub(super) fn eval_order_by<'a>(
        &self,
        inner: &'a Algebra,
        conditions: &'a [OrderCondition],
        from: Solution,
    ) -> SolutionIter<'a> {
        let mut keyed = Vec::new();
        for solution in self.eval(inner, from) {
            match solution.and_then(|solution| self.sort_keys(conditions, solution)) {
                Ok(entry) => keyed.push(entry),
                Err(error) => return Box::new(once(Err(error))),
            }
        }
        keyed.sort_by(|(a, _), (b, _)| compare_keys(conditions, a, b));
        Box::new(keyed.into_iter().map(|(_, solution)| Ok(solution)))
    }

    /// Keeps the first `n` solutions of `inner` according to `conditions` without sorting all of
    /// them.
    pub(super) fn eval_top_n<'a>(
        &self,
        inner: &'a Algebra,
        conditions: &'a [OrderCondition],
        n: usize,
        from: Solution,
    ) -> SolutionIter<'a> {
        let mut best: Vec<Keyed> = Vec::with_capacity(n.saturating_add(1).min(1024));
        for solution in self.eval(inner, from) {
            let (keys, solution) =
                match solution.and_then(|solution| self.sort_keys(conditions, solution)) {
                    Ok(entry) => entry,
                    Err(error) => return Box::new(once(Err(error))),
                };
            let position = best.partition_point(|(existing, _)| {
                compare_keys(conditions, existing, &keys) != Ordering::Greater
            });
            if position < n {
                best.insert(position, (keys, solution));
                best.truncate(n);
            }
        }
        Box::new(best.into_iter().map(|(_, solution)| Ok(solution)))
    }

    fn sort_keys(
        &self,
        conditions: &[OrderCondition],
        solution: Solution,
    ) -> Result<Keyed, QueryEvaluationError> {
        let keys = conditions
            .iter()
            .map(|condition| recover(self.eval_expression(condition.expression(), &solution)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((keys, solution))
    }
}

fn compare_keys(conditions: &[OrderCondition], a: &[Option<Term>], b: &[Option<Term>]) -> Ordering {
    for ((condition, a), b) in conditions.iter().zip(a).zip(b) {
        let ordering = order_terms(a.as_ref(), b.as_ref());
        let ordering = if condition.is_descending() {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
