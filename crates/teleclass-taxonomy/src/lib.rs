//! # teleclass-taxonomy
//!
//! The class hierarchy documents are assigned into.
//!
//! A [`Taxonomy`] is a directed acyclic graph of named classes. It is built
//! once, either from a nested definition ([`Taxonomy::from_definition`]) or
//! from an explicit edge list ([`Taxonomy::from_edges`]), validated, and
//! never mutated afterward.

pub mod definition;
pub mod error;
pub mod graph;

pub use error::TaxonomyError;
pub use graph::Taxonomy;
