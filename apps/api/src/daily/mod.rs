pub mod curator;
pub mod handlers;
pub mod hot_skills;
pub mod job;
pub mod mailer;
pub mod notify;
pub mod prompts;
pub mod snapshot;

pub use job::DailyJob;
pub use notify::Notifier;
