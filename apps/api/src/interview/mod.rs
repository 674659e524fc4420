pub mod evaluation;
pub mod handlers;
pub mod machine;
pub mod prompts;
pub mod service;
pub mod session;
pub mod session_store;
pub mod speech;
pub mod stages;
pub mod voice;

pub use machine::InterviewMachine;
pub use service::InterviewService;
pub use stages::TransitionTable;
