//! Evaluation of property paths.
//!
//! Sequences and alternatives keep duplicates (bag semantics). The closure operators (`*`, `+`,
//! `?`) produce every reachable node once.

use crate::eval::{bind_term, bound_term, SimpleEvaluator, SolutionIter};
use crate::sparql::error::QueryEvaluationError;
use rdf_algebra_common::error::StorageError;
use rdf_algebra_common::TripleIter;
use rdf_algebra_logical::PropertyPath;
use rdf_algebra_model::{subject_to_term, NamedNode, Solution, Term, TermPattern, Triple};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::hash::Hash;
use std::iter::once;

type PathResult<T> = Result<T, QueryEvaluationError>;

impl SimpleEvaluator {
    pub(super) fn eval_path<'a>(
        &self,
        subject: &'a TermPattern,
        path: &'a PropertyPath,
        object: &'a TermPattern,
        from: Solution,
    ) -> SolutionIter<'a> {
        let start = bound_term(subject, &from);
        let end = bound_term(object, &from);
        let result = match (start, end) {
            (Some(start), Some(end)) => self.path_from(path, &start).map(|targets| {
                let count = targets.iter().filter(|target| **target == end).count();
                vec![from.clone(); count]
            }),
            (Some(start), None) => self.path_from(path, &start).map(|targets| {
                targets
                    .into_iter()
                    .filter_map(|target| bind(&from, None, Some((object, target))))
                    .collect()
            }),
            (None, Some(end)) => self.path_to(path, &end).map(|sources| {
                sources
                    .into_iter()
                    .filter_map(|source| bind(&from, Some((subject, source)), None))
                    .collect()
            }),
            (None, None) => self.path_pairs(path).map(|pairs| {
                pairs
                    .into_iter()
                    .filter_map(|(source, target)| {
                        bind(&from, Some((subject, source)), Some((object, target)))
                    })
                    .collect()
            }),
        };
        match result {
            Ok(solutions) => Box::new(solutions.into_iter().map(Ok)),
            Err(error) => Box::new(once(Err(error))),
        }
    }

    /// Returns all nodes that are reachable from `start` via `path`.
    pub fn path_from(&self, path: &PropertyPath, start: &Term) -> PathResult<Vec<Term>> {
        match path {
            PropertyPath::Predicate(predicate) => {
                collect_objects(self.scan(Some(start), Some(predicate), None))
            }
            PropertyPath::Inverse(inner) => self.path_to(inner, start),
            PropertyPath::Sequence(first, second) => {
                let mut result = Vec::new();
                for middle in self.path_from(first, start)? {
                    result.extend(self.path_from(second, &middle)?);
                }
                Ok(result)
            }
            PropertyPath::Alternative(first, second) => {
                let mut result = self.path_from(first, start)?;
                result.extend(self.path_from(second, start)?);
                Ok(result)
            }
            PropertyPath::ZeroOrMore(inner) => {
                self.closure(start, true, |node| self.path_from(inner, node))
            }
            PropertyPath::OneOrMore(inner) => {
                self.closure(start, false, |node| self.path_from(inner, node))
            }
            PropertyPath::ZeroOrOne(inner) => {
                let mut result = vec![start.clone()];
                result.extend(self.path_from(inner, start)?);
                Ok(deduplicate(result))
            }
            PropertyPath::NegatedPropertySet(excluded) => {
                let triples = self.scan(Some(start), None, None);
                collect_objects(triples.filter(|triple| {
                    triple
                        .as_ref()
                        .map_or(true, |triple| !excluded.contains(&triple.predicate))
                }))
            }
        }
    }

    /// Returns all nodes from which `end` is reachable via `path`.
    pub fn path_to(&self, path: &PropertyPath, end: &Term) -> PathResult<Vec<Term>> {
        match path {
            PropertyPath::Predicate(predicate) => {
                collect_subjects(self.scan(None, Some(predicate), Some(end)))
            }
            PropertyPath::Inverse(inner) => self.path_from(inner, end),
            PropertyPath::Sequence(first, second) => {
                let mut result = Vec::new();
                for middle in self.path_to(second, end)? {
                    result.extend(self.path_to(first, &middle)?);
                }
                Ok(result)
            }
            PropertyPath::Alternative(first, second) => {
                let mut result = self.path_to(first, end)?;
                result.extend(self.path_to(second, end)?);
                Ok(result)
            }
            PropertyPath::ZeroOrMore(inner) => {
                self.closure(end, true, |node| self.path_to(inner, node))
            }
            PropertyPath::OneOrMore(inner) => {
                self.closure(end, false, |node| self.path_to(inner, node))
            }
            PropertyPath::ZeroOrOne(inner) => {
                let mut result = vec![end.clone()];
                result.extend(self.path_to(inner, end)?);
                Ok(deduplicate(result))
            }
            PropertyPath::NegatedPropertySet(excluded) => {
                let triples = self.scan(None, None, Some(end));
                collect_subjects(triples.filter(|triple| {
                    triple
                        .as_ref()
                        .map_or(true, |triple| !excluded.contains(&triple.predicate))
                }))
            }
        }
    }

    /// Returns all pairs of nodes that are connected via `path`.
    ///
    /// For `*` and `?`, every node of the active graph is connected to itself.
    pub fn path_pairs(&self, path: &PropertyPath) -> PathResult<Vec<(Term, Term)>> {
        match path {
            PropertyPath::Predicate(predicate) => {
                collect_pairs(self.scan(None, Some(predicate), None))
            }
            PropertyPath::Inverse(inner) => Ok(self
                .path_pairs(inner)?
                .into_iter()
                .map(|(subject, object)| (object, subject))
                .collect()),
            PropertyPath::Sequence(first, second) => {
                let mut result = Vec::new();
                for (start, middle) in self.path_pairs(first)? {
                    for end in self.path_from(second, &middle)? {
                        result.push((start.clone(), end));
                    }
                }
                Ok(result)
            }
            PropertyPath::Alternative(first, second) => {
                let mut result = self.path_pairs(first)?;
                result.extend(self.path_pairs(second)?);
                Ok(result)
            }
            PropertyPath::ZeroOrMore(_) => {
                let mut result = Vec::new();
                for start in self.graph_nodes()? {
                    for end in self.path_from(path, &start)? {
                        result.push((start.clone(), end));
                    }
                }
                Ok(result)
            }
            PropertyPath::OneOrMore(inner) => {
                let starts = deduplicate(
                    self.path_pairs(inner)?
                        .into_iter()
                        .map(|(start, _)| start)
                        .collect(),
                );
                let mut result = Vec::new();
                for start in starts {
                    for end in self.path_from(path, &start)? {
                        result.push((start.clone(), end));
                    }
                }
                Ok(result)
            }
            PropertyPath::ZeroOrOne(inner) => {
                let mut result = self
                    .graph_nodes()?
                    .into_iter()
                    .map(|node| (node.clone(), node))
                    .collect::<Vec<_>>();
                result.extend(self.path_pairs(inner)?);
                Ok(deduplicate(result))
            }
            PropertyPath::NegatedPropertySet(excluded) => {
                let triples = self.scan(None, None, None);
                collect_pairs(triples.filter(|triple| {
                    triple
                        .as_ref()
                        .map_or(true, |triple| !excluded.contains(&triple.predicate))
                }))
            }
        }
    }

    /// Computes all nodes reachable from `start` by repeatedly applying `step`.
    fn closure(
        &self,
        start: &Term,
        reflexive: bool,
        step: impl Fn(&Term) -> PathResult<Vec<Term>>,
    ) -> PathResult<Vec<Term>> {
        let mut visited = FxHashSet::default();
        let mut result = Vec::new();
        if reflexive {
            visited.insert(start.clone());
            result.push(start.clone());
        }

        let mut queue = VecDeque::from([start.clone()]);
        while let Some(node) = queue.pop_front() {
            self.context().check()?;
            for next in step(&node)? {
                if visited.insert(next.clone()) {
                    result.push(next.clone());
                    queue.push_back(next);
                }
            }
        }
        Ok(result)
    }

    /// All subjects and objects of the active graph.
    fn graph_nodes(&self) -> PathResult<Vec<Term>> {
        let mut nodes = Vec::new();
        for triple in self.scan(None, None, None) {
            let triple = triple.map_err(|error| QueryEvaluationError::storage("Path", error))?;
            nodes.push(subject_to_term(triple.subject));
            nodes.push(triple.object);
        }
        Ok(deduplicate(nodes))
    }

    fn scan(
        &self,
        subject: Option<&Term>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
    ) -> TripleIter {
        self.store().match_triples(
            self.active_graph().as_graph_name(),
            subject.map(Term::as_ref),
            predicate.map(|predicate| predicate.as_ref().into()),
            object.map(Term::as_ref),
        )
    }
}

fn bind(
    from: &Solution,
    subject: Option<(&TermPattern, Term)>,
    object: Option<(&TermPattern, Term)>,
) -> Option<Solution> {
    let mut solution = from.clone();
    for (pattern, term) in subject.into_iter().chain(object) {
        bind_term(pattern, term, &mut solution)?;
    }
    Some(solution)
}

fn collect_objects(
    triples: impl Iterator<Item = Result<Triple, StorageError>>,
) -> PathResult<Vec<Term>> {
    triples
        .map(|triple| {
            triple
                .map(|triple| triple.object)
                .map_err(|error| QueryEvaluationError::storage("Path", error))
        })
        .collect()
}

fn collect_subjects(
    triples: impl Iterator<Item = Result<Triple, StorageError>>,
) -> PathResult<Vec<Term>> {
    triples
        .map(|triple| {
            triple
                .map(|triple| subject_to_term(triple.subject))
                .map_err(|error| QueryEvaluationError::storage("Path", error))
        })
        .collect()
}

fn collect_pairs(
    triples: impl Iterator<Item = Result<Triple, StorageError>>,
) -> PathResult<Vec<(Term, Term)>> {
    triples
        .map(|triple| {
            triple
                .map(|triple| (subject_to_term(triple.subject), triple.object))
                .map_err(|error| QueryEvaluationError::storage("Path", error))
        })
        .collect()
}

fn deduplicate<T: Clone + Eq + Hash>(values: Vec<T>) -> Vec<T> {
    let mut seen = FxHashSet::default();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
