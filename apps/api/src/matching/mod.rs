pub mod embedder;
pub mod engine;
pub mod resolver;
pub mod vector_index;

pub use engine::{MatchEngine, Namespace, ScoredCandidate};
