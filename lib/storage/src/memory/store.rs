use crate::index::{EncodedQuad, EncodedTriplePattern, IndexPermutations, ScanCursor};
use crate::memory::object_id_mapping::MemObjectIdMapping;
use rdf_algebra_common::error::{CorruptionError, StorageError};
use rdf_algebra_common::{TripleIter, TripleStore};
use rdf_algebra_model::{
    GraphNameRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, QuadRef, TermRef, Triple,
};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// The content of the store at some point in time.
#[derive(Clone, Debug, Default)]
struct StoreContent {
    mapping: MemObjectIdMapping,
    indexes: IndexPermutations,
}

impl StoreContent {
    fn encode_pattern(
        &self,
        graph: GraphNameRef<'_>,
        subject: Option<TermRef<'_>>,
        predicate: Option<TermRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Option<EncodedTriplePattern> {
        let encode = |term: Option<TermRef<'_>>| match term {
            None => Some(None),
            Some(term) => self.mapping.try_encode_term(term).map(Some),
        };
        if matches!(subject, Some(TermRef::Literal(_)))
            || matches!(predicate, Some(TermRef::Literal(_) | TermRef::BlankNode(_)))
        {
            return None;
        }

        Some(EncodedTriplePattern {
            graph_name: self.mapping.try_encode_graph_name(graph)?,
            subject: encode(subject)?,
            predicate: encode(predicate)?,
            object: encode(object)?,
        })
    }

    fn insert(&mut self, quad: QuadRef<'_>) -> Result<bool, StorageError> {
        let encoded = self.mapping.encode_quad(quad)?;
        Ok(self.indexes.insert(encoded))
    }

    fn remove(&mut self, quad: QuadRef<'_>) -> bool {
        let graph_name = self.mapping.try_encode_graph_name(quad.graph_name);
        let subject = self.mapping.try_encode_term(quad.subject.into());
        let predicate = self.mapping.try_encode_term(quad.predicate.into());
        let object = self.mapping.try_encode_term(quad.object);
        match (graph_name, subject, predicate, object) {
            (Some(graph_name), Some(subject), Some(predicate), Some(object)) => {
                self.indexes.remove(EncodedQuad {
                    graph_name,
                    subject,
                    predicate,
                    object,
                })
            }
            _ => false,
        }
    }
}

/// An in-memory triple store.
///
/// # Consistency
///
/// Readers never observe a partially applied write. Every read goes through a
/// [MemoryStoreSnapshot] that shares the content of the store at the time the snapshot was taken.
/// Writers copy the content if a snapshot is still alive.
#[derive(Debug, Default)]
pub struct MemoryTripleStore {
    content: RwLock<Arc<StoreContent>>,
}

impl MemoryTripleStore {
    /// Creates a new empty [MemoryTripleStore].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a consistent, read-only view of the current content.
    pub fn snapshot(&self) -> Result<MemoryStoreSnapshot, StorageError> {
        let content = self.content.read().map_err(|_| poisoned())?;
        Ok(MemoryStoreSnapshot {
            content: Arc::clone(&content),
        })
    }

    /// Loads the given quads into the store. Returns the number of newly inserted quads.
    pub fn extend(&self, quads: impl IntoIterator<Item = Quad>) -> Result<usize, StorageError> {
        let mut guard = self.content.write().map_err(|_| poisoned())?;
        let content = Arc::make_mut(&mut guard);

        let mut count = 0;
        for quad in quads {
            if content.insert(quad.as_ref())? {
                count += 1;
            }
        }
        debug!(count, total = content.indexes.len(), "Inserted quads");
        Ok(count)
    }

    /// Inserts a single quad. Returns whether the quad was not yet contained.
    pub fn insert<'a>(&self, quad: impl Into<QuadRef<'a>>) -> Result<bool, StorageError> {
        let mut guard = self.content.write().map_err(|_| poisoned())?;
        Arc::make_mut(&mut guard).insert(quad.into())
    }

    /// Removes a single quad. Returns whether the quad was contained.
    pub fn remove<'a>(&self, quad: impl Into<QuadRef<'a>>) -> Result<bool, StorageError> {
        let mut guard = self.content.write().map_err(|_| poisoned())?;
        Ok(Arc::make_mut(&mut guard).remove(quad.into()))
    }

    /// Creates an empty named graph.
    pub fn insert_named_graph<'a>(
        &self,
        graph_name: impl Into<NamedOrBlankNodeRef<'a>>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.content.write().map_err(|_| poisoned())?;
        let content = Arc::make_mut(&mut guard);
        let id = match graph_name.into() {
            NamedOrBlankNodeRef::NamedNode(nn) => content.mapping.encode_term_intern(nn.into())?,
            NamedOrBlankNodeRef::BlankNode(bnode) => {
                content.mapping.encode_term_intern(bnode.into())?
            }
        };
        Ok(content.indexes.insert_named_graph(id))
    }

    /// Removes all quads and named graphs.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self.content.write().map_err(|_| poisoned())?;
        *guard = Arc::new(StoreContent::default());
        Ok(())
    }

    /// Returns the number of quads in the store.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.snapshot()?.len())
    }

    /// Returns whether the store contains no quads.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// A read-only view of a [MemoryTripleStore].
///
/// Snapshots are cheap to clone and can be shared between threads.
#[derive(Clone, Debug)]
pub struct MemoryStoreSnapshot {
    content: Arc<StoreContent>,
}

impl MemoryStoreSnapshot {
    /// Returns the number of quads in the snapshot.
    pub fn len(&self) -> usize {
        self.content.indexes.len()
    }

    /// Returns whether the snapshot contains no quads.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TripleStore for MemoryStoreSnapshot {
    fn match_triples(
        &self,
        graph: GraphNameRef<'_>,
        subject: Option<TermRef<'_>>,
        predicate: Option<TermRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> TripleIter {
        let Some(pattern) = self
            .content
            .encode_pattern(graph, subject, predicate, object)
        else {
            return Box::new(std::iter::empty());
        };

        Box::new(TripleScan {
            cursor: self.content.indexes.scan_cursor(pattern),
            content: Arc::clone(&self.content),
        })
    }

    fn named_graphs(&self) -> Result<Vec<NamedOrBlankNode>, StorageError> {
        Ok(self
            .content
            .indexes
            .named_graphs()
            .map(|id| self.content.mapping.decode_named_graph(id))
            .collect::<Result<Vec<_>, _>>()?)
    }

    fn contains_named_graph(
        &self,
        graph_name: NamedOrBlankNodeRef<'_>,
    ) -> Result<bool, StorageError> {
        let id = match graph_name {
            NamedOrBlankNodeRef::NamedNode(nn) => self.content.mapping.try_encode_term(nn.into()),
            NamedOrBlankNodeRef::BlankNode(bnode) => {
                self.content.mapping.try_encode_term(bnode.into())
            }
        };
        Ok(id.is_some_and(|id| self.content.indexes.contains_named_graph(id)))
    }
}

/// A scan over a snapshot that keeps the snapshot alive on its own.
struct TripleScan {
    content: Arc<StoreContent>,
    cursor: ScanCursor,
}

impl Iterator for TripleScan {
    type Item = Result<Triple, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        let quad = self.content.indexes.advance(&mut self.cursor)?;
        Some(
            self.content
                .mapping
                .decode_triple(&quad)
                .map_err(StorageError::from),
        )
    }
}

fn poisoned() -> StorageError {
    CorruptionError::msg("The store lock is poisoned.").into()
}
