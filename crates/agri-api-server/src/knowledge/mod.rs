//! Static disease reference data and keyword-based context retrieval

mod store;

pub use store::KnowledgeBase;
