//! An in-memory [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset) that can be
//! queried with SPARQL and validated with SHACL.
//!
//! The entry point of the module is the [`Store`] struct.
//!
//! Usage example:
//! ```
//! use rdf_algebra::model::*;
//! use rdf_algebra::sparql::{Query, QueryResults};
//! use rdf_algebra::store::Store;
//!
//! let store = Store::new();
//!
//! // insertion
//! let ex = NamedNode::new("http://example.com")?;
//! let quad = Quad::new(ex.clone(), ex.clone(), ex.clone(), GraphName::DefaultGraph);
//! store.insert(&quad)?;
//!
//! // SPARQL query
//! let query = Query::parse("SELECT ?s WHERE { ?s ?p ?o }", None)?;
//! if let QueryResults::Solutions(mut solutions) = store.query(&query)? {
//!     assert_eq!(solutions.next().unwrap()?.get("s"), Some(&ex.into()));
//! };
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```

use crate::error::{LoaderError, SerializerError};
use oxrdfio::{RdfParser, RdfSerializer};
use rdf_algebra_common::error::StorageError;
use rdf_algebra_common::TripleStore;
use rdf_algebra_engine::{
    evaluate_query, Query, QueryEvaluationError, QueryOptions, QueryResults, SimpleEvaluator,
    SolutionIter,
};
use rdf_algebra_logical::Algebra;
use rdf_algebra_model::{GraphNameRef, Quad, QuadRef, TermRef, Triple};
use rdf_algebra_shacl::{ShaclError, ShaclValidator, Shapes, ValidationReport};
use rdf_algebra_storage::memory::MemoryTripleStore;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::debug;

/// An in-memory [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset) store.
///
/// Every query and validation runs against a snapshot of the store. Writes that happen while a
/// query is running are not visible to it.
///
/// Cloning a store is cheap. The clones share their content.
#[derive(Debug, Clone, Default)]
pub struct Store {
    storage: Arc<MemoryTripleStore>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a consistent, read-only view of the current content.
    pub fn snapshot(&self) -> Result<Arc<dyn TripleStore>, StorageError> {
        Ok(Arc::new(self.storage.snapshot()?))
    }

    /// Executes a [SPARQL 1.1 query](https://www.w3.org/TR/sparql11-query/).
    ///
    /// Usage example:
    /// ```
    /// use rdf_algebra::model::*;
    /// use rdf_algebra::sparql::{Query, QueryResults};
    /// use rdf_algebra::store::Store;
    ///
    /// let store = Store::new();
    /// let ex = NamedNodeRef::new("http://example.com")?;
    /// store.insert(QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph))?;
    ///
    /// let query = Query::parse("ASK { ?s ?p ?o }", None)?;
    /// assert!(matches!(store.query(&query)?, QueryResults::Boolean(true)));
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn query<'q>(&self, query: &'q Query) -> Result<QueryResults<'q>, QueryEvaluationError> {
        self.query_opt(query, QueryOptions::default())
    }

    /// Executes a [SPARQL 1.1 query](https://www.w3.org/TR/sparql11-query/) with some options.
    pub fn query_opt<'q>(
        &self,
        query: &'q Query,
        options: QueryOptions,
    ) -> Result<QueryResults<'q>, QueryEvaluationError> {
        let snapshot = self
            .snapshot()
            .map_err(|error| QueryEvaluationError::storage("Query", error))?;
        evaluate_query(snapshot, query, options)
    }

    /// Evaluates an algebra tree directly, without the SPARQL front end.
    pub fn evaluate<'a>(
        &self,
        algebra: &'a Algebra,
        options: QueryOptions,
    ) -> Result<SolutionIter<'a>, QueryEvaluationError> {
        let snapshot = self
            .snapshot()
            .map_err(|error| QueryEvaluationError::storage("Query", error))?;
        Ok(SimpleEvaluator::from_options(snapshot, options).evaluate(algebra))
    }

    /// Validates the content of the default graph against the shapes in the default graph of
    /// `shapes`.
    pub fn validate(&self, shapes: &Self) -> Result<ValidationReport, ShaclError> {
        let shapes = Shapes::parse(shapes.snapshot()?.as_ref())?;
        debug!(shapes = shapes.len(), "Validating store");
        self.validate_with(&ShaclValidator::new(shapes))
    }

    /// Validates the content of the default graph with an already configured validator.
    pub fn validate_with(
        &self,
        validator: &ShaclValidator,
    ) -> Result<ValidationReport, ShaclError> {
        validator.validate(self.snapshot()?)
    }

    /// Returns the triples of `graph` that match the given pattern. [None] is a wildcard.
    pub fn triples_for_pattern(
        &self,
        graph: GraphNameRef<'_>,
        subject: Option<TermRef<'_>>,
        predicate: Option<TermRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Result<Vec<Triple>, StorageError> {
        self.snapshot()?
            .match_triples(graph, subject, predicate, object)
            .collect()
    }

    /// Loads an RDF file into the store.
    ///
    /// Blank nodes of the file are renamed so that they never clash with the blank nodes of
    /// previously loaded files. Returns the number of newly inserted quads.
    ///
    /// Usage example:
    /// ```
    /// use rdf_algebra::io::RdfFormat;
    /// use rdf_algebra::store::Store;
    ///
    /// let store = Store::new();
    /// let file = b"<http://example.com> <http://example.com> <http://example.com> <http://example.com/g> .";
    /// assert_eq!(store.load_from_reader(RdfFormat::NQuads, file.as_ref())?, 1);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn load_from_reader(
        &self,
        parser: impl Into<RdfParser>,
        reader: impl Read,
    ) -> Result<usize, LoaderError> {
        let quads = parser
            .into()
            .rename_blank_nodes()
            .for_reader(reader)
            .collect::<Result<Vec<_>, _>>()?;
        let count = self.storage.extend(quads)?;
        debug!(count, "Loaded quads");
        Ok(count)
    }

    /// Adds a quad to this store.
    ///
    /// Returns `true` if the quad was not already in the store.
    pub fn insert<'a>(&self, quad: impl Into<QuadRef<'a>>) -> Result<bool, StorageError> {
        self.storage.insert(quad)
    }

    /// Adds quads to this store. Returns the number of newly inserted quads.
    pub fn extend(&self, quads: impl IntoIterator<Item = Quad>) -> Result<usize, StorageError> {
        self.storage.extend(quads)
    }

    /// Removes a quad from this store.
    ///
    /// Returns `true` if the quad was in the store and has been removed.
    pub fn remove<'a>(&self, quad: impl Into<QuadRef<'a>>) -> Result<bool, StorageError> {
        self.storage.remove(quad)
    }

    /// Returns the number of quads in the store.
    pub fn len(&self) -> Result<usize, StorageError> {
        self.storage.len()
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        self.storage.is_empty()
    }

    /// Removes all quads.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.clear()
    }

    /// Writes a graph of the store using a given RDF format.
    ///
    /// Usage example:
    /// ```
    /// use rdf_algebra::io::RdfFormat;
    /// use rdf_algebra::model::GraphNameRef;
    /// use rdf_algebra::store::Store;
    ///
    /// let file = "<http://example.com> <http://example.com> <http://example.com> .\n";
    ///
    /// let store = Store::new();
    /// store.load_from_reader(RdfFormat::NTriples, file.as_bytes())?;
    ///
    /// let buffer =
    ///     store.dump_graph_to_writer(GraphNameRef::DefaultGraph, RdfFormat::NTriples, Vec::new())?;
    /// assert_eq!(file.as_bytes(), buffer.as_slice());
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn dump_graph_to_writer<W: Write>(
        &self,
        graph: GraphNameRef<'_>,
        serializer: impl Into<RdfSerializer>,
        writer: W,
    ) -> Result<W, SerializerError> {
        let mut serializer = serializer.into().for_writer(writer);
        for triple in self.snapshot()?.match_triples(graph, None, None, None) {
            serializer.serialize_triple(&triple?)?;
        }
        Ok(serializer.finish()?)
    }
}
