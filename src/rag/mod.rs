//! Retrieval-augmented answering.
//!
//! - `chunker` / `ingest`: turn documents into a persisted `Corpus`
//! - `index` / `store` / `corpus`: exact vector index and its chunk metadata
//! - `resources`: load-once cache for the embedder and corpus
//! - `retriever` / `router`: answer a question from the corpus or fall back

pub mod chunker;
pub mod corpus;
pub mod index;
pub mod ingest;
pub mod resources;
pub mod retriever;
pub mod router;
pub mod store;

pub use chunker::{Chunk, Chunker};
pub use corpus::{Corpus, IndexManifest};
pub use index::{FlatIndex, Neighbor};
pub use ingest::{IngestReport, Ingestor};
pub use resources::ResourceCache;
pub use retriever::{CorpusAnswer, RetrievalResult, RetrievedChunk, Retriever};
pub use router::{AnswerRouter, AnswerSource, QuestionRequest};
pub use store::CorpusStore;
