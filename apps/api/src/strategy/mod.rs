pub mod application;
pub mod handlers;
pub mod prompts;
pub mod roadmap;
pub mod tiering;

pub use application::{ApplicationText, ApplicationWriter, LlmApplicationWriter};
pub use roadmap::{LlmRoadmapGenerator, RoadmapGenerator};
pub use tiering::{classify, Tier, TieredCandidate};
