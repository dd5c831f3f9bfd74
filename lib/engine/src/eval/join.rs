use crate::eval::{SimpleEvaluator, SolutionIter};
use crate::sparql::error::QueryEvaluationError;
use rdf_algebra_logical::{Algebra, Expression};
use rdf_algebra_model::{Solution, Term, Variable};
use rustc_hash::FxHashMap;
use std::iter::once;

impl SimpleEvaluator {
    /// Evaluates an inner join.
    ///
    /// If the right-hand side can be seeded, it is evaluated once for every left solution with
    /// that solution as input. Otherwise, it is evaluated once and joined by compatibility.
    pub(super) fn eval_join<'a>(
        &self,
        left: &'a Algebra,
        right: &'a Algebra,
        from: Solution,
    ) -> SolutionIter<'a> {
        if is_seed_safe(right) {
            let evaluator = self.clone();
            return Box::new(self.eval(left, from).flat_map(
                move |solution| -> SolutionIter<'a> {
                    match solution {
                        Ok(solution) => evaluator.eval(right, solution),
                        Err(error) => Box::new(once(Err(error))),
                    }
                },
            ));
        }

        let index = match SolutionIndex::build(left, right, self.eval(right, from.clone())) {
            Ok(index) => index,
            Err(error) => return Box::new(once(Err(error))),
        };
        Box::new(self.eval(left, from).flat_map(move |solution| -> SolutionIter<'a> {
            match solution {
                Ok(solution) => Box::new(
                    index
                        .candidates(&solution)
                        .filter_map(|candidate| solution.merge(candidate))
                        .map(Ok)
                        .collect::<Vec<_>>()
                        .into_iter(),
                ),
                Err(error) => Box::new(once(Err(error))),
            }
        }))
    }

    /// Evaluates a left outer join. A left solution without any matching right solution is kept
    /// as is.
    pub(super) fn eval_left_join<'a>(
        &self,
        left: &'a Algebra,
        right: &'a Algebra,
        expression: Option<&'a Expression>,
        from: Solution,
    ) -> SolutionIter<'a> {
        let expressions = expression.map(std::slice::from_ref).unwrap_or_default();

        if is_seed_safe(right) {
            return Box::new(LeftJoinIter {
                evaluator: self.clone(),
                left: self.eval(left, from),
                right,
                expressions,
                current: None,
            });
        }

        let index = match SolutionIndex::build(left, right, self.eval(right, from.clone())) {
            Ok(index) => index,
            Err(error) => return Box::new(once(Err(error))),
        };
        let evaluator = self.clone();
        Box::new(self.eval(left, from).flat_map(move |solution| -> SolutionIter<'a> {
            let solution = match solution {
                Ok(solution) => solution,
                Err(error) => return Box::new(once(Err(error))),
            };
            let mut output = Vec::new();
            for candidate in index.candidates(&solution) {
                let Some(merged) = solution.merge(candidate) else {
                    continue;
                };
                match evaluator.accepts(expressions, &merged) {
                    Ok(true) => output.push(Ok(merged)),
                    Ok(false) => {}
                    Err(error) => return Box::new(once(Err(error))),
                }
            }
            if output.is_empty() {
                output.push(Ok(solution));
            }
            Box::new(output.into_iter())
        }))
    }

    /// Evaluates `MINUS`. The right-hand side is evaluated independently of the left solutions.
    ///
    /// The right-hand side does not receive `from`, so its solutions do not extend it. Only the
    /// left solutions are returned and those extend `from`.
    pub(super) fn eval_minus<'a>(
        &self,
        left: &'a Algebra,
        right: &'a Algebra,
        from: Solution,
    ) -> SolutionIter<'a> {
        let index = match SolutionIndex::build(left, right, self.eval(right, Solution::new())) {
            Ok(index) => index,
            Err(error) => return Box::new(once(Err(error))),
        };
        Box::new(self.eval(left, from).filter(move |solution| {
            let Ok(solution) = solution else {
                return true;
            };
            !index.candidates(solution).any(|candidate| {
                solution.is_compatible(candidate) && solution.shares_variable_with(candidate)
            })
        }))
    }
}

/// Returns whether evaluating `node` with a seed is equivalent to evaluating it without a seed and
/// joining the results with the seed afterward.
///
/// Nodes that evaluate expressions, remove solutions, or hide variables may observe the seed
/// differently and are evaluated independently.
///
/// `Minus` is the one node whose child is never seeded: its right-hand side only filters the left
/// solutions, and those still extend the seed.
pub(crate) fn is_seed_safe(node: &Algebra) -> bool {
    match node {
        Algebra::Bgp { .. } | Algebra::Path { .. } | Algebra::Table { .. } => true,
        Algebra::Join { left, right } | Algebra::Union { left, right } => {
            is_seed_safe(left) && is_seed_safe(right)
        }
        Algebra::NamedGraph { inner, .. } => is_seed_safe(inner),
        _ => false,
    }
}

/// The materialized solutions of one side of a join, indexed by the values of the variables that
/// are guaranteed to be bound on both sides.
struct SolutionIndex {
    key: Vec<Variable>,
    buckets: FxHashMap<Vec<Term>, Vec<Solution>>,
    unkeyed: Vec<Solution>,
}

impl SolutionIndex {
    fn build(
        left: &Algebra,
        right: &Algebra,
        solutions: SolutionIter<'_>,
    ) -> Result<Self, QueryEvaluationError> {
        let right_fixed = right.fixed_variables();
        let key = left
            .fixed_variables()
            .into_iter()
            .filter(|variable| right_fixed.contains(variable))
            .collect::<Vec<_>>();

        let mut index = Self {
            key,
            buckets: FxHashMap::default(),
            unkeyed: Vec::new(),
        };
        for solution in solutions {
            let solution = solution?;
            match index.key_of(&solution) {
                Some(key) => index.buckets.entry(key).or_default().push(solution),
                None => index.unkeyed.push(solution),
            }
        }
        Ok(index)
    }

    fn key_of(&self, solution: &Solution) -> Option<Vec<Term>> {
        if self.key.is_empty() {
            return None;
        }
        self.key
            .iter()
            .map(|variable| solution.get(variable).cloned())
            .collect()
    }

    /// Returns a superset of the indexed solutions that are compatible with `solution`.
    fn candidates<'s>(&'s self, solution: &Solution) -> Box<dyn Iterator<Item = &'s Solution> + 's> {
        match self.key_of(solution) {
            Some(key) => Box::new(
                self.buckets
                    .get(&key)
                    .into_iter()
                    .flatten()
                    .chain(&self.unkeyed),
            ),
            None => Box::new(self.buckets.values().flatten().chain(&self.unkeyed)),
        }
    }
}

/// A left join that seeds the right-hand side with each left solution.
struct LeftJoinIter<'a> {
    evaluator: SimpleEvaluator,
    left: SolutionIter<'a>,
    right: &'a Algebra,
    expressions: &'a [Expression],
    current: Option<(Solution, SolutionIter<'a>, bool)>,
}

impl Iterator for LeftJoinIter<'_> {
    type Item = Result<Solution, QueryEvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((left, right, matched)) = &mut self.current {
                for candidate in right.by_ref() {
                    let candidate = match candidate {
                        Ok(candidate) => candidate,
                        Err(error) => return Some(Err(error)),
                    };
                    match self.evaluator.accepts(self.expressions, &candidate) {
                        Ok(true) => {
                            *matched = true;
                            return Some(Ok(candidate));
                        }
                        Ok(false) => {}
                        Err(error) => return Some(Err(error)),
                    }
                }
                let unmatched = (!*matched).then(|| left.clone());
                self.current = None;
                if let Some(left) = unmatched {
                    return Some(Ok(left));
                }
            }

            let left = match self.left.next()? {
                Ok(left) => left,
                Err(error) => return Some(Err(error)),
            };
            let right = self.evaluator.eval(self.right, left.clone());
            self.current = Some((left, right, false));
        }
    }
}
