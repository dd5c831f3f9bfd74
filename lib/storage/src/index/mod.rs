//! Contains the index data structures of the in-memory store.
//!
//! A quad index represents a particular sorting of the quad components graph name, subject,
//! predicate, and object. For example, the [IndexComponents::GSPO] index represents that exact
//! ordering while the [IndexComponents::GPOS] has the predicate as the second component. Different
//! types of triple patterns are better suited for different indexes. [IndexPermutations] manages
//! all indexes and picks the best one for a given pattern.

use crate::memory::EncodedObjectId;
use std::collections::BTreeSet;
use std::ops::Bound;

/// A single component of a quad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexComponent {
    GraphName,
    Subject,
    Predicate,
    Object,
}

/// The ordering of the quad components within an index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexComponents([IndexComponent; 4]);

impl IndexComponents {
    pub const GSPO: IndexComponents = IndexComponents([
        IndexComponent::GraphName,
        IndexComponent::Subject,
        IndexComponent::Predicate,
        IndexComponent::Object,
    ]);
    pub const GPOS: IndexComponents = IndexComponents([
        IndexComponent::GraphName,
        IndexComponent::Predicate,
        IndexComponent::Object,
        IndexComponent::Subject,
    ]);
    pub const GOSP: IndexComponents = IndexComponents([
        IndexComponent::GraphName,
        IndexComponent::Object,
        IndexComponent::Subject,
        IndexComponent::Predicate,
    ]);

    /// Returns the components in index order.
    pub fn inner(self) -> [IndexComponent; 4] {
        self.0
    }
}

/// Represents a quad with encoded terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EncodedQuad {
    /// The graph name.
    pub graph_name: EncodedObjectId,
    /// The subject.
    pub subject: EncodedObjectId,
    /// The predicate.
    pub predicate: EncodedObjectId,
    /// The object.
    pub object: EncodedObjectId,
}

impl EncodedQuad {
    fn get(&self, component: IndexComponent) -> EncodedObjectId {
        match component {
            IndexComponent::GraphName => self.graph_name,
            IndexComponent::Subject => self.subject,
            IndexComponent::Predicate => self.predicate,
            IndexComponent::Object => self.object,
        }
    }

    /// Creates a new [IndexQuad] for an index with the given `components`.
    pub fn for_index(&self, components: IndexComponents) -> IndexQuad {
        IndexQuad(components.inner().map(|component| self.get(component)))
    }

    /// Restores the quad from an [IndexQuad] that is sorted for `components`.
    pub fn from_index(components: IndexComponents, quad: &IndexQuad) -> Self {
        let mut result = EncodedQuad {
            graph_name: EncodedObjectId::MIN,
            subject: EncodedObjectId::MIN,
            predicate: EncodedObjectId::MIN,
            object: EncodedObjectId::MIN,
        };
        for (component, id) in components.inner().into_iter().zip(quad.0) {
            match component {
                IndexComponent::GraphName => result.graph_name = id,
                IndexComponent::Subject => result.subject = id,
                IndexComponent::Predicate => result.predicate = id,
                IndexComponent::Object => result.object = id,
            }
        }
        result
    }
}

/// A quad that is sorted for some index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexQuad(pub [EncodedObjectId; 4]);

/// A triple pattern within a single graph. [None] is a wildcard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodedTriplePattern {
    pub graph_name: EncodedObjectId,
    pub subject: Option<EncodedObjectId>,
    pub predicate: Option<EncodedObjectId>,
    pub object: Option<EncodedObjectId>,
}

impl EncodedTriplePattern {
    fn get(&self, component: IndexComponent) -> Option<EncodedObjectId> {
        match component {
            IndexComponent::GraphName => Some(self.graph_name),
            IndexComponent::Subject => self.subject,
            IndexComponent::Predicate => self.predicate,
            IndexComponent::Object => self.object,
        }
    }

    /// Reorders the pattern to the given `components`.
    fn reorder(&self, components: IndexComponents) -> [Option<EncodedObjectId>; 4] {
        components.inner().map(|component| self.get(component))
    }
}

/// A single index with a fixed ordering.
#[derive(Clone, Debug)]
struct QuadIndex {
    components: IndexComponents,
    quads: BTreeSet<IndexQuad>,
}

impl QuadIndex {
    fn new(components: IndexComponents) -> Self {
        Self {
            components,
            quads: BTreeSet::new(),
        }
    }

    /// The number of leading components that are bound in `pattern`. A higher score means that the
    /// scan can skip more irrelevant quads.
    fn compute_scan_score(&self, pattern: &EncodedTriplePattern) -> usize {
        pattern
            .reorder(self.components)
            .iter()
            .take_while(|id| id.is_some())
            .count()
    }

    /// Returns the first quad that matches `pattern` and is sorted after `after`.
    fn next_match(
        &self,
        pattern: &EncodedTriplePattern,
        after: Option<&IndexQuad>,
    ) -> Option<IndexQuad> {
        let reordered = pattern.reorder(self.components);
        let prefix_len = reordered.iter().take_while(|id| id.is_some()).count();

        let mut lower = [EncodedObjectId::MIN; 4];
        let mut upper = [EncodedObjectId::MAX; 4];
        for (i, id) in reordered.iter().take(prefix_len).enumerate() {
            if let Some(id) = id {
                lower[i] = *id;
                upper[i] = *id;
            }
        }

        let start = match after {
            Some(after) => Bound::Excluded(*after),
            None => Bound::Included(IndexQuad(lower)),
        };
        self.quads
            .range((start, Bound::Included(IndexQuad(upper))))
            .find(|quad| {
                reordered
                    .iter()
                    .zip(quad.0)
                    .skip(prefix_len)
                    .all(|(expected, actual)| expected.map_or(true, |expected| expected == actual))
            })
            .copied()
    }
}

/// The position of a running scan.
///
/// A cursor does not borrow the index. Each call to [IndexPermutations::advance] seeks to the next
/// match after the last returned quad, so the scan can be continued on any clone of the indexes.
#[derive(Clone, Copy, Debug)]
pub struct ScanCursor {
    components: IndexComponents,
    pattern: EncodedTriplePattern,
    last: Option<IndexQuad>,
    exhausted: bool,
}

/// Represents a set of multiple indexes, each of which indexes a different ordering of the quad
/// components. This is necessary as different triple patterns require different index
/// structures.
///
/// For example, the pattern `<S> <P> ?o` can be best served by having an SPO index. The scan would
/// then look up `<S>`, look up `<P>` within the matching range, and lastly scan the entries and
/// bind them to `?o`. However, the triple pattern `?s <P> <O>` cannot be efficiently evaluated with
/// an SPO index. For this pattern, the store uses the POS index.
#[derive(Clone, Debug)]
pub struct IndexPermutations {
    /// Named graphs are stored separately as they may exist without any associated quads.
    named_graphs: BTreeSet<EncodedObjectId>,
    /// The index variations.
    indexes: [QuadIndex; 3],
}

impl Default for IndexPermutations {
    fn default() -> Self {
        Self {
            named_graphs: BTreeSet::new(),
            indexes: [
                QuadIndex::new(IndexComponents::GSPO),
                QuadIndex::new(IndexComponents::GPOS),
                QuadIndex::new(IndexComponents::GOSP),
            ],
        }
    }
}

impl IndexPermutations {
    /// Chooses the index for scanning the given `pattern`. On equal scores, GSPO is preferred.
    pub fn choose_index(&self, pattern: &EncodedTriplePattern) -> IndexComponents {
        let mut best = &self.indexes[0];
        for index in &self.indexes[1..] {
            if index.compute_scan_score(pattern) > best.compute_scan_score(pattern) {
                best = index;
            }
        }
        best.components
    }

    /// Starts a scan over all quads that match `pattern`.
    pub fn scan_cursor(&self, pattern: EncodedTriplePattern) -> ScanCursor {
        ScanCursor {
            components: self.choose_index(&pattern),
            pattern,
            last: None,
            exhausted: false,
        }
    }

    /// Returns the next quad of the scan described by `cursor`.
    pub fn advance(&self, cursor: &mut ScanCursor) -> Option<EncodedQuad> {
        if cursor.exhausted {
            return None;
        }
        let index = self
            .indexes
            .iter()
            .find(|index| index.components == cursor.components)?;
        match index.next_match(&cursor.pattern, cursor.last.as_ref()) {
            Some(quad) => {
                cursor.last = Some(quad);
                Some(EncodedQuad::from_index(cursor.components, &quad))
            }
            None => {
                cursor.exhausted = true;
                None
            }
        }
    }

    /// Returns all quads that match `pattern`.
    #[cfg(test)]
    fn scan(&self, pattern: EncodedTriplePattern) -> impl Iterator<Item = EncodedQuad> + '_ {
        let mut cursor = self.scan_cursor(pattern);
        std::iter::from_fn(move || self.advance(&mut cursor))
    }

    /// Returns the total number of quads.
    pub fn len(&self) -> usize {
        self.indexes[0].quads.len()
    }

    /// Inserts the `quad`. Returns whether it was not yet contained.
    pub fn insert(&mut self, quad: EncodedQuad) -> bool {
        let mut inserted = false;
        for index in &mut self.indexes {
            inserted = index.quads.insert(quad.for_index(index.components));
        }
        if !quad.graph_name.is_default_graph() {
            self.named_graphs.insert(quad.graph_name);
        }
        inserted
    }

    /// Removes the `quad`. Returns whether it was contained.
    pub fn remove(&mut self, quad: EncodedQuad) -> bool {
        let mut removed = false;
        for index in &mut self.indexes {
            removed = index.quads.remove(&quad.for_index(index.components));
        }
        removed
    }

    pub fn insert_named_graph(&mut self, graph_name: EncodedObjectId) -> bool {
        self.named_graphs.insert(graph_name)
    }

    pub fn named_graphs(&self) -> impl Iterator<Item = EncodedObjectId> + '_ {
        self.named_graphs.iter().copied()
    }

    pub fn contains_named_graph(&self, graph_name: EncodedObjectId) -> bool {
        self.named_graphs.contains(&graph_name)
    }
}
