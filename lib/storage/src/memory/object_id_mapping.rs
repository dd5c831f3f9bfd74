use crate::index::EncodedQuad;
use crate::memory::object_id::{EncodedObjectId, DEFAULT_GRAPH_ID};
use rdf_algebra_common::error::CorruptionError;
use rdf_algebra_model::{
    GraphNameRef, NamedNode, NamedOrBlankNode, QuadRef, Subject, Term, TermRef, Triple,
};
use rustc_hash::FxHashMap;

/// Maintains a mapping between RDF terms and object IDs in memory.
///
/// # Object IDs
///
/// The encoded Object ID is a 32-bit unsigned integer used to uniquely identify RDF terms.
/// Currently, we simply use a counter to allocate new object IDs. The id `0` is reserved for the
/// default graph.
#[derive(Clone, Debug, Default)]
pub struct MemObjectIdMapping {
    /// Maps object ids to terms. The term with id `n` is stored at position `n - 1`.
    id2term: Vec<Term>,
    /// Maps terms to their object id.
    term2id: FxHashMap<Term, EncodedObjectId>,
}

impl MemObjectIdMapping {
    /// Creates a new empty [MemObjectIdMapping].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of interned terms.
    pub fn len(&self) -> usize {
        self.id2term.len()
    }

    /// Returns whether no term has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.id2term.is_empty()
    }

    /// Returns the object id of `term`, allocating a new one if the term is not yet known.
    ///
    /// # Error
    ///
    /// Returns an error if the id space is exhausted.
    pub fn encode_term_intern(
        &mut self,
        term: TermRef<'_>,
    ) -> Result<EncodedObjectId, CorruptionError> {
        let term = term.into_owned();
        if let Some(id) = self.term2id.get(&term) {
            return Ok(*id);
        }

        let id = u32::try_from(self.id2term.len())
            .ok()
            .and_then(|len| EncodedObjectId::from(len).next())
            .ok_or_else(|| CorruptionError::msg("Object id space exhausted."))?;
        self.id2term.push(term.clone());
        self.term2id.insert(term, id);
        Ok(id)
    }

    /// Returns the object id of `graph_name` without allocating a new one.
    pub fn try_encode_graph_name(&self, graph_name: GraphNameRef<'_>) -> Option<EncodedObjectId> {
        match graph_name {
            GraphNameRef::NamedNode(nn) => self.try_encode_term(nn.into()),
            GraphNameRef::BlankNode(bnode) => self.try_encode_term(bnode.into()),
            GraphNameRef::DefaultGraph => Some(DEFAULT_GRAPH_ID),
        }
    }

    /// Returns the object id of `term` without allocating a new one.
    pub fn try_encode_term(&self, term: TermRef<'_>) -> Option<EncodedObjectId> {
        self.term2id.get(&term.into_owned()).copied()
    }

    /// Encodes the entire `quad`, interning unknown terms.
    pub fn encode_quad(&mut self, quad: QuadRef<'_>) -> Result<EncodedQuad, CorruptionError> {
        let graph_name = match quad.graph_name {
            GraphNameRef::NamedNode(nn) => self.encode_term_intern(nn.into())?,
            GraphNameRef::BlankNode(bnode) => self.encode_term_intern(bnode.into())?,
            GraphNameRef::DefaultGraph => DEFAULT_GRAPH_ID,
        };
        Ok(EncodedQuad {
            graph_name,
            subject: self.encode_term_intern(quad.subject.into())?,
            predicate: self.encode_term_intern(quad.predicate.into())?,
            object: self.encode_term_intern(quad.object)?,
        })
    }

    /// Decodes the given `object_id`.
    ///
    /// # Error
    ///
    /// Returns an error if the object id is unknown.
    pub fn decode_term(&self, object_id: EncodedObjectId) -> Result<&Term, CorruptionError> {
        usize::try_from(object_id.as_u32())
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|index| self.id2term.get(index))
            .ok_or_else(|| CorruptionError::msg(format!("Unknown object id {object_id}.")))
    }

    /// Decodes a named graph.
    ///
    /// # Error
    ///
    /// Returns an error if the object id is unknown or refers to a literal.
    pub fn decode_named_graph(
        &self,
        object_id: EncodedObjectId,
    ) -> Result<NamedOrBlankNode, CorruptionError> {
        match self.decode_term(object_id)? {
            Term::NamedNode(nn) => Ok(nn.clone().into()),
            Term::BlankNode(bnode) => Ok(bnode.clone().into()),
            Term::Literal(_) => Err(CorruptionError::msg(format!(
                "Object id {object_id} is used as a graph name but refers to a literal."
            ))),
        }
    }

    /// Decodes the triple part of `quad`.
    pub fn decode_triple(&self, quad: &EncodedQuad) -> Result<Triple, CorruptionError> {
        let subject = match self.decode_term(quad.subject)? {
            Term::NamedNode(nn) => Subject::from(nn.clone()),
            Term::BlankNode(bnode) => Subject::from(bnode.clone()),
            Term::Literal(_) => {
                return Err(CorruptionError::msg(format!(
                    "Object id {} is used as a subject but refers to a literal.",
                    quad.subject
                )))
            }
        };
        let predicate = match self.decode_term(quad.predicate)? {
            Term::NamedNode(nn) => NamedNode::clone(nn),
            _ => {
                return Err(CorruptionError::msg(format!(
                    "Object id {} is used as a predicate but does not refer to an IRI.",
                    quad.predicate
                )))
            }
        };
        let object = self.decode_term(quad.object)?.clone();
        Ok(Triple::new(subject, predicate, object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_algebra_model::{Literal, NamedNodeRef};

    #[test]
    fn encode_is_stable() {
        let mut mapping = MemObjectIdMapping::new();
        let a = mapping
            .encode_term_intern(NamedNodeRef::new_unchecked("http://example.com/a").into())
            .unwrap();
        let b = mapping
            .encode_term_intern(Literal::from(1).as_ref().into())
            .unwrap();
        let a_again = mapping
            .encode_term_intern(NamedNodeRef::new_unchecked("http://example.com/a").into())
            .unwrap();

        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_ne!(a, DEFAULT_GRAPH_ID);
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn decode_unknown_id_fails() {
        let mapping = MemObjectIdMapping::new();
        assert!(mapping.decode_term(EncodedObjectId::from(7)).is_err());
        assert!(mapping.decode_term(DEFAULT_GRAPH_ID).is_err());
    }

    #[test]
    fn try_encode_does_not_allocate() {
        let mapping = MemObjectIdMapping::new();
        let term = NamedNodeRef::new_unchecked("http://example.com/a");
        assert_eq!(mapping.try_encode_term(term.into()), None);
        assert_eq!(
            mapping.try_encode_graph_name(GraphNameRef::DefaultGraph),
            Some(DEFAULT_GRAPH_ID)
        );
        assert!(mapping.is_empty());
    }
}
