pub mod client;
pub mod pagination;
pub mod types;

pub use client::{GitHubApi, GitHubClient};
pub use types::{
    BranchRef, CreateIssue, HookConfig, Issue, IssueRef, Label, Milestone, Permission,
    RepositoryRef, SaveHook, TimelineEvent, TimelineIssue, TimelineSource,
};
