pub mod core;
pub mod document;
pub mod embedding;
pub mod history;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
