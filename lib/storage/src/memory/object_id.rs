use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;

/// The encoded object id represents an interned RDF term in the storage layer.
///
/// # Default Graph
///
/// The default graph is represented by the [DEFAULT_GRAPH_ID]. No RDF term is ever assigned this
/// id.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub struct EncodedObjectId(u32);

impl EncodedObjectId {
    pub const MIN: EncodedObjectId = EncodedObjectId(0);
    pub const MAX: EncodedObjectId = EncodedObjectId(u32::MAX);

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Option<EncodedObjectId> {
        self.0.checked_add(1).map(EncodedObjectId)
    }

    /// Returns true if the id represents the default graph.
    pub fn is_default_graph(self) -> bool {
        self == DEFAULT_GRAPH_ID
    }
}

impl From<u32> for EncodedObjectId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Display for EncodedObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The id of the default graph.
pub const DEFAULT_GRAPH_ID: EncodedObjectId = EncodedObjectId(0);
