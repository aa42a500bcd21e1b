//! Source ingestion: the generic table reader, the reference corpus builder
//! and the algorithm summary reader.

pub mod algorithm;
pub mod corpus;
pub mod reader;

pub use algorithm::{AlgorithmOptions, read_algorithm_table};
pub use corpus::{CorpusOptions, ReferenceCorpus, build_reference_corpus, deduplicate_best};
pub use reader::read_table;
