//! Vocabulary shared by enrichments and the metadata store

use super::term::Iri;

/// Links an enhancement to the content item it was extracted from.
///
/// Every subject of this relation whose object is a content URI belongs
/// to that content item's metadata subgraph.
pub const EXTRACTED_FROM: &str = "http://fise.iks-project.eu/ontology/extracted-from";

/// Type of every enhancement subject
pub const ENHANCEMENT: &str = "http://fise.iks-project.eu/ontology/Enhancement";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub fn extracted_from() -> Iri {
    Iri::new(EXTRACTED_FROM)
}
