pub mod events;
pub mod github;
pub mod orchestrator;
pub mod registration;
pub mod signature;

pub use events::{Commit, FixReference, IssueEvent, PullRequestEvent, PushEvent, WebhookEvent};
pub use orchestrator::EventService;
pub use registration::register_hook;
