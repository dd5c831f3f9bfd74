#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]

pub mod error;
pub mod store;

pub mod model {
    pub use rdf_algebra_model::*;
}

pub mod logical {
    pub use rdf_algebra_logical::*;
}

pub mod sparql {
    pub use rdf_algebra_engine::results::{QueryResultsFormat, QuerySolution};
    pub use rdf_algebra_engine::*;
}

pub mod shacl {
    pub use rdf_algebra_shacl::*;
}

pub mod storage {
    pub use rdf_algebra_common::error::{CorruptionError, StorageError};
    pub use rdf_algebra_common::{TripleIter, TripleStore};
    pub use rdf_algebra_storage::*;
}

pub mod io {
    pub use oxrdfio::{RdfFormat, RdfParseError, RdfParser, RdfSerializer};
}
