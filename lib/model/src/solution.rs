use crate::{ThinError, ThinResult};
use oxrdf::{Term, Variable};
use std::fmt::{Display, Formatter};

/// A partial mapping from variables to RDF terms.
///
/// A variable is either absent (unbound) or bound to exactly one term. The bindings are kept
/// sorted by variable so that equality and hashing are independent of the insertion order and
/// compatibility checks can be done with a single merge-walk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Solution {
    bindings: Vec<(Variable, Term)>,
}

impl Solution {
    /// Creates an empty solution. This is the single solution of the unit table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of bound variables.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns whether no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn position(&self, variable: &Variable) -> Result<usize, usize> {
        self.bindings
            .binary_search_by(|(candidate, _)| candidate.as_str().cmp(variable.as_str()))
    }

    /// Returns the term bound to `variable`, if any.
    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.position(variable)
            .ok()
            .map(|index| &self.bindings[index].1)
    }

    /// Returns whether `variable` is bound.
    pub fn contains(&self, variable: &Variable) -> bool {
        self.position(variable).is_ok()
    }

    /// Iterates over the bindings, ordered by variable name.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.bindings.iter().map(|(variable, term)| (variable, term))
    }

    /// Iterates over the bound variables.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.bindings.iter().map(|(variable, _)| variable)
    }

    /// Binds `variable` to `term`.
    ///
    /// Binding a variable to the value it already has is a no-op. Binding it to a different value
    /// fails and leaves the solution untouched.
    pub fn try_bind(&mut self, variable: Variable, term: Term) -> ThinResult<()> {
        match self.position(&variable) {
            Ok(index) if self.bindings[index].1 == term => Ok(()),
            Ok(_) => ThinError::expected(),
            Err(index) => {
                self.bindings.insert(index, (variable, term));
                Ok(())
            }
        }
    }

    /// Removes the binding of `variable` and returns its previous value.
    pub fn remove(&mut self, variable: &Variable) -> Option<Term> {
        let index = self.position(variable).ok()?;
        Some(self.bindings.remove(index).1)
    }

    /// Two solutions are compatible iff every variable bound in both is bound to the same term.
    pub fn is_compatible(&self, other: &Solution) -> bool {
        self.walk_shared(other, |left, right| left == right)
    }

    /// Returns whether at least one variable is bound in both solutions.
    pub fn shares_variable_with(&self, other: &Solution) -> bool {
        !self.walk_shared(other, |_, _| false)
    }

    /// Calls `predicate` for every variable bound in both solutions and returns `false` as soon as
    /// it does.
    fn walk_shared(&self, other: &Solution, mut predicate: impl FnMut(&Term, &Term) -> bool) -> bool {
        let mut left = self.bindings.iter().peekable();
        let mut right = other.bindings.iter().peekable();
        while let (Some((lv, lt)), Some((rv, rt))) = (left.peek(), right.peek()) {
            match lv.as_str().cmp(rv.as_str()) {
                std::cmp::Ordering::Less => {
                    left.next();
                }
                std::cmp::Ordering::Greater => {
                    right.next();
                }
                std::cmp::Ordering::Equal => {
                    if !predicate(lt, rt) {
                        return false;
                    }
                    left.next();
                    right.next();
                }
            }
        }
        true
    }

    /// Merges two solutions. Returns [None] if they are not compatible.
    pub fn merge(&self, other: &Solution) -> Option<Solution> {
        let mut bindings = Vec::with_capacity(self.len() + other.len());
        let mut left = self.bindings.iter().peekable();
        let mut right = other.bindings.iter().peekable();
        loop {
            match (left.peek(), right.peek()) {
                (Some((lv, lt)), Some((rv, rt))) => match lv.as_str().cmp(rv.as_str()) {
                    std::cmp::Ordering::Less => {
                        bindings.push((lv.clone(), lt.clone()));
                        left.next();
                    }
                    std::cmp::Ordering::Greater => {
                        bindings.push((rv.clone(), rt.clone()));
                        right.next();
                    }
                    std::cmp::Ordering::Equal => {
                        if lt != rt {
                            return None;
                        }
                        bindings.push((lv.clone(), lt.clone()));
                        left.next();
                        right.next();
                    }
                },
                (Some(_), None) => {
                    bindings.extend(left.cloned());
                    break;
                }
                (None, Some(_)) => {
                    bindings.extend(right.cloned());
                    break;
                }
                (None, None) => break,
            }
        }
        Some(Solution { bindings })
    }

    /// Restricts the solution to the given variables.
    #[must_use]
    pub fn project<'a>(&self, variables: impl IntoIterator<Item = &'a Variable>) -> Solution {
        variables
            .into_iter()
            .filter_map(|variable| Some((variable.clone(), self.get(variable)?.clone())))
            .collect()
    }
}

impl FromIterator<(Variable, Term)> for Solution {
    fn from_iter<T: IntoIterator<Item = (Variable, Term)>>(iter: T) -> Self {
        let mut bindings: Vec<(Variable, Term)> = iter.into_iter().collect();
        bindings.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));
        bindings.dedup_by(|(a, _), (b, _)| a == b);
        Self { bindings }
    }
}

impl IntoIterator for Solution {
    type Item = (Variable, Term);
    type IntoIter = std::vec::IntoIter<(Variable, Term)>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.into_iter()
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (variable, term)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{variable} -> {term}")?;
        }
        f.write_str("}")
    }
}
