use crate::error::StorageError;
use rdf_algebra_model::{GraphNameRef, NamedOrBlankNode, NamedOrBlankNodeRef, TermRef, Triple};
use std::fmt::Debug;

/// A lazily produced sequence of triples. Every item may fail independently, e.g., if the store
/// detects corrupted data while scanning an index.
///
/// The iterator owns whatever it needs to continue the scan. Evaluation operators hold many scans
/// at once and must not borrow the store for it.
pub type TripleIter = Box<dyn Iterator<Item = Result<Triple, StorageError>> + Send>;

/// The read interface of a triple store, as consumed by the algebra evaluator and the shape
/// validator.
///
/// # Consistency
///
/// A single query evaluation issues many pattern lookups against the same store. Implementations
/// must guarantee that all lookups of one evaluation observe the same state, e.g., by evaluating
/// against an immutable snapshot. Lookups never mutate the store and must be safe to issue from
/// multiple threads at the same time.
pub trait TripleStore: Debug + Send + Sync {
    /// Returns all triples of `graph` that match the given pattern. [None] is a wildcard.
    ///
    /// All eight combinations of bound and unbound positions must be supported. Passing a term that
    /// cannot occur at a position (e.g., a literal as a subject) yields no triples.
    fn match_triples(
        &self,
        graph: GraphNameRef<'_>,
        subject: Option<TermRef<'_>>,
        predicate: Option<TermRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> TripleIter;

    /// Returns the list of named graphs in the store.
    fn named_graphs(&self) -> Result<Vec<NamedOrBlankNode>, StorageError>;

    /// Returns whether `graph_name` is a named graph in the store.
    fn contains_named_graph(&self, graph_name: NamedOrBlankNodeRef<'_>)
        -> Result<bool, StorageError>;
}
