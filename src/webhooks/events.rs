//! Webhook payload models for the `push`, `issues` and `pull_request` events.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::{BackportError, Result};
use crate::github::{BranchRef, IssueRef, RepositoryRef};

/// A fix reference on its own line: `Fixes`/`Closes`, optional colon, then
/// `gh-<n>`, `#<n>` or a GitHub issue/pull URL. Case-insensitive; any line.
/// The URL form names its repository in the `repository` group.
pub const FIX_REFERENCE_PATTERN: &str = r"(?im)^\s*(?:fixes|closes):?\s+(?:gh-|#|https://github\.com/(?P<repository>[^/\s]+/[^/\s]+)/(?:issues|pull)/)(?P<id>\d+)";

static FIX_REFERENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FIX_REFERENCE_PATTERN).expect("Invalid fix reference regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pusher {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLabel {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Numbered {
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub message: String,
}

impl Commit {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Every fix reference in the message, in order.
    pub fn fix_references(&self) -> Vec<FixReference> {
        FIX_REFERENCE_REGEX
            .captures_iter(&self.message)
            .filter_map(|c| {
                let issue = c.name("id")?.as_str().parse().ok()?;
                Some(FixReference {
                    repository: c.name("repository").map(|m| m.as_str().to_string()),
                    issue,
                })
            })
            .collect()
    }

    /// The issue number of the first fix reference to `repository`.
    pub fn fix_issue_id_in(&self, repository: &str) -> Option<u64> {
        self.fix_references()
            .into_iter()
            .find(|r| r.refers_to(repository))
            .map(|r| r.issue)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixReference {
    /// `owner/repo` of a URL reference; `None` for `gh-<n>` and `#<n>`.
    pub repository: Option<String>,
    pub issue: u64,
}

impl FixReference {
    /// Short references always point at the repository the commit was pushed to.
    pub fn refers_to(&self, repository: &str) -> bool {
        self.repository
            .as_deref()
            .map_or(true, |r| r.eq_ignore_ascii_case(repository))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub repository: Repository,
    pub pusher: Pusher,
    #[serde(default)]
    pub commits: Vec<Commit>,
}

impl PushEvent {
    /// Commits fixing an issue of the pushed repository, paired with that issue.
    pub fn fixed_issues(&self) -> Vec<(u64, &Commit)> {
        self.commits
            .iter()
            .filter_map(|c| {
                c.fix_issue_id_in(&self.repository.full_name)
                    .map(|issue| (issue, c))
            })
            .collect()
    }

    pub fn fix_commits(&self) -> Vec<&Commit> {
        self.fixed_issues().into_iter().map(|(_, c)| c).collect()
    }

    pub fn repository_ref(&self) -> RepositoryRef {
        RepositoryRef::new(self.repository.full_name.clone())
    }

    pub fn branch_ref(&self) -> BranchRef {
        BranchRef::new(self.repository_ref(), self.ref_name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEvent {
    pub action: String,
    pub repository: Repository,
    pub sender: Option<Sender>,
    pub label: Option<EventLabel>,
    pub issue: Numbered,
}

impl IssueEvent {
    pub fn repository_ref(&self) -> RepositoryRef {
        RepositoryRef::new(self.repository.full_name.clone())
    }

    pub fn issue_ref(&self) -> IssueRef {
        IssueRef::new(self.repository_ref(), self.issue.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub repository: Repository,
    pub sender: Option<Sender>,
    pub label: Option<EventLabel>,
    pub pull_request: Numbered,
}

impl PullRequestEvent {
    pub fn repository_ref(&self) -> RepositoryRef {
        RepositoryRef::new(self.repository.full_name.clone())
    }

    pub fn issue_ref(&self) -> IssueRef {
        IssueRef::new(self.repository_ref(), self.pull_request.number)
    }
}

/// A delivery classified by its `X-GitHub-Event` name.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Ping,
    Push(PushEvent),
    Issues(IssueEvent),
    PullRequest(PullRequestEvent),
    Unsupported(String),
}

impl WebhookEvent {
    pub fn parse(event_name: &str, body: &[u8]) -> Result<Self> {
        let event = match event_name {
            "ping" => WebhookEvent::Ping,
            "push" => WebhookEvent::Push(parse_payload(event_name, body)?),
            "issues" => WebhookEvent::Issues(parse_payload(event_name, body)?),
            "pull_request" => WebhookEvent::PullRequest(parse_payload(event_name, body)?),
            other => WebhookEvent::Unsupported(other.to_string()),
        };
        Ok(event)
    }

    pub fn name(&self) -> &str {
        match self {
            WebhookEvent::Ping => "ping",
            WebhookEvent::Push(_) => "push",
            WebhookEvent::Issues(_) => "issues",
            WebhookEvent::PullRequest(_) => "pull_request",
            WebhookEvent::Unsupported(name) => name.as_str(),
        }
    }
}

fn parse_payload<T: for<'de> Deserialize<'de>>(event_name: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        BackportError::ParseError(format!("Invalid '{}' payload: {}", event_name, e))
    })
}
