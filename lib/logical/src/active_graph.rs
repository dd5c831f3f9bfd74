use rdf_algebra_model::{GraphNameRef, NamedOrBlankNode};
use std::fmt::Display;

/// The active graph defines which graph partakes in the pattern matching process.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActiveGraph {
    /// Only the default graph forms the active graph.
    #[default]
    DefaultGraph,
    /// A single named graph forms the active graph. This corresponds to the inner pattern of a
    /// `GRAPH` clause.
    NamedGraph(NamedOrBlankNode),
}

impl ActiveGraph {
    /// Returns the graph name that is passed to the store.
    pub fn as_graph_name(&self) -> GraphNameRef<'_> {
        match self {
            ActiveGraph::DefaultGraph => GraphNameRef::DefaultGraph,
            ActiveGraph::NamedGraph(name) => name.as_ref().into(),
        }
    }
}

impl Display for ActiveGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActiveGraph::DefaultGraph => write!(f, "Default Graph"),
            ActiveGraph::NamedGraph(name) => write!(f, "Named Graph {name}"),
        }
    }
}
