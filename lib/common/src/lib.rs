pub mod error;
mod triple_store;

pub use triple_store::{TripleIter, TripleStore};
