use crate::{bgp, ex, var};
use rdf_algebra_common::error::StorageError;
use rdf_algebra_common::{TripleIter, TripleStore};
use rdf_algebra_engine::{QueryEvaluationError, SimpleEvaluator};
use rdf_algebra_logical::Algebra;
use rdf_algebra_model::{
    GraphNameRef, NamedNodePattern, NamedOrBlankNode, NamedOrBlankNodeRef, Solution, TermRef,
    Triple,
};
use std::io;
use std::sync::Arc;

/// A store whose scans fail after the first triple.
#[derive(Debug)]
struct FailingStore;

fn disk_error() -> StorageError {
    io::Error::other("disk is gone").into()
}

impl TripleStore for FailingStore {
    fn match_triples(
        &self,
        _graph: GraphNameRef<'_>,
        _subject: Option<TermRef<'_>>,
        _predicate: Option<TermRef<'_>>,
        _object: Option<TermRef<'_>>,
    ) -> TripleIter {
        let triple = Triple::new(ex("a"), ex("knows"), ex("b"));
        Box::new(vec![Ok(triple.clone()), Err(disk_error()), Ok(triple)].into_iter())
    }

    fn named_graphs(&self) -> Result<Vec<NamedOrBlankNode>, StorageError> {
        Err(disk_error())
    }

    fn contains_named_graph(
        &self,
        _graph_name: NamedOrBlankNodeRef<'_>,
    ) -> Result<bool, StorageError> {
        Err(disk_error())
    }
}

fn results(algebra: &Algebra) -> Vec<Result<Solution, QueryEvaluationError>> {
    SimpleEvaluator::new(Arc::new(FailingStore))
        .evaluate(algebra)
        .collect()
}

#[test]
fn storage_failure_in_bgp_ends_the_evaluation() {
    let results = results(&bgp(&[("?s", "knows", "?o")]));
    let [Ok(_), Err(error)] = results.as_slice() else {
        unreachable!("expected one solution followed by an error, got {results:?}");
    };
    assert!(matches!(
        error,
        QueryEvaluationError::Storage {
            operation: "Bgp",
            ..
        }
    ));
    assert_eq!(
        error.to_string(),
        "store access failed during Bgp evaluation: disk is gone"
    );
}

#[test]
fn storage_failure_while_listing_graphs() {
    let algebra = Algebra::named_graph(
        NamedNodePattern::Variable(var("g")),
        bgp(&[("?s", "knows", "?o")]),
    );
    let results = results(&algebra);
    let [Err(error)] = results.as_slice() else {
        unreachable!("expected a single error, got {results:?}");
    };
    assert!(matches!(
        error,
        QueryEvaluationError::Storage {
            operation: "NamedGraph",
            ..
        }
    ));
}
