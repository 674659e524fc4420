pub mod detector;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod source;
pub mod store;

pub use detector::ActivityDetector;
