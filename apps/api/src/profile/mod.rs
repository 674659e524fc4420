pub mod handlers;
pub mod ingest;
pub mod merge;
pub mod models;
pub mod prompts;
pub mod quiz;
pub mod store;

pub use ingest::ResumeIngestor;
pub use quiz::QuizMaker;
pub use store::ProfileStore;
