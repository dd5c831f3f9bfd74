//! Contains storage layer implementations for the RDF algebra evaluator.
//!
//! The evaluator only depends on the [TripleStore](rdf_algebra_common::TripleStore) interface.
//! This crate provides an in-memory implementation that serves consistent snapshots to
//! concurrent readers.

pub(crate) mod index;
pub mod memory;
