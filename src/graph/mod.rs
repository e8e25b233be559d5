//! Metadata graph data structures

mod term;
mod triple;
pub mod vocab;

pub use term::{Iri, Literal, Term};
pub use triple::{MetadataGraph, Triple};
