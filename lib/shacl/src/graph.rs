use crate::error::ShaclError;
use rdf_algebra_common::TripleStore;
use rdf_algebra_model::vocab::rdf;
use rdf_algebra_model::{subject_to_term, GraphNameRef, NamedNodeRef, Term, Triple};
use rustc_hash::FxHashSet;

/// Reads the default graph of a [TripleStore] node by node.
#[derive(Clone, Copy)]
pub(crate) struct GraphReader<'g> {
    store: &'g dyn TripleStore,
}

impl<'g> GraphReader<'g> {
    pub fn new(store: &'g dyn TripleStore) -> Self {
        Self { store }
    }

    pub fn triples(
        &self,
        subject: Option<&Term>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<&Term>,
    ) -> Result<Vec<Triple>, ShaclError> {
        self.store
            .match_triples(
                GraphNameRef::DefaultGraph,
                subject.map(Term::as_ref),
                predicate.map(Into::into),
                object.map(Term::as_ref),
            )
            .map(|triple| triple.map_err(ShaclError::from))
            .collect()
    }

    pub fn objects(
        &self,
        subject: &Term,
        predicate: NamedNodeRef<'_>,
    ) -> Result<Vec<Term>, ShaclError> {
        Ok(self
            .triples(Some(subject), Some(predicate), None)?
            .into_iter()
            .map(|triple| triple.object)
            .collect())
    }

    /// Returns one object of `subject` and `predicate`, if any.
    pub fn object(
        &self,
        subject: &Term,
        predicate: NamedNodeRef<'_>,
    ) -> Result<Option<Term>, ShaclError> {
        Ok(self.objects(subject, predicate)?.into_iter().next())
    }

    pub fn subjects(
        &self,
        predicate: NamedNodeRef<'_>,
        object: &Term,
    ) -> Result<Vec<Term>, ShaclError> {
        Ok(self
            .triples(None, Some(predicate), Some(object))?
            .into_iter()
            .map(|triple| subject_to_term(triple.subject))
            .collect())
    }

    pub fn contains(
        &self,
        subject: &Term,
        predicate: NamedNodeRef<'_>,
        object: &Term,
    ) -> Result<bool, ShaclError> {
        Ok(!self
            .triples(Some(subject), Some(predicate), Some(object))?
            .is_empty())
    }

    /// Reads the members of the RDF list starting at `head`.
    pub fn list(&self, head: &Term) -> Result<Vec<Term>, ShaclError> {
        let mut members = Vec::new();
        let mut visited = FxHashSet::default();
        let mut current = head.clone();
        let nil = Term::from(rdf::NIL.into_owned());
        while current != nil {
            if !visited.insert(current.clone()) {
                return Err(ShaclError::InvalidList(head.clone()));
            }
            let first = self.object(&current, rdf::FIRST)?;
            let rest = self.object(&current, rdf::REST)?;
            let (Some(first), Some(rest)) = (first, rest) else {
                return Err(ShaclError::InvalidList(head.clone()));
            };
            members.push(first);
            current = rest;
        }
        Ok(members)
    }
}
