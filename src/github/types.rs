use serde::{Deserialize, Serialize};
use std::fmt;

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
}

impl RepositoryRef {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// A branch within a repository.
///
/// `ref_name` is always held in its fully qualified `refs/heads/<name>` form so
/// that refs derived from labels compare equal to refs sent in push payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchRef {
    pub repository: RepositoryRef,
    pub ref_name: String,
}

impl BranchRef {
    pub fn new(repository: RepositoryRef, ref_name: impl Into<String>) -> Self {
        let ref_name = ref_name.into();
        let ref_name = if ref_name.starts_with("refs/") {
            ref_name
        } else {
            format!("{}{}", BRANCH_REF_PREFIX, ref_name)
        };
        Self {
            repository,
            ref_name,
        }
    }

    /// The branch name without the `refs/heads/` prefix.
    pub fn short_name(&self) -> &str {
        self.ref_name
            .strip_prefix(BRANCH_REF_PREFIX)
            .unwrap_or(&self.ref_name)
    }
}

impl fmt::Display for BranchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repository, self.ref_name)
    }
}

/// An issue or pull request; GitHub numbers both from the same sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueRef {
    pub repository: RepositoryRef,
    pub number: u64,
}

impl IssueRef {
    pub fn new(repository: RepositoryRef, number: u64) -> Self {
        Self { repository, number }
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub number: u64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub milestone: Option<Milestone>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Issue {
    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }

    pub fn milestone_number(&self) -> Option<u64> {
        self.milestone.as_ref().map(|m| m.number)
    }
}

/// An entry of an issue timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub event: String,
    pub source: Option<TimelineSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSource {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub issue: Option<TimelineIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineIssue {
    pub number: u64,
    pub body: Option<String>,
    pub milestone: Option<Milestone>,
}

impl TimelineEvent {
    /// The issue on the other end of a `cross-referenced` event.
    pub fn cross_referenced_issue(&self) -> Option<&TimelineIssue> {
        if self.event != "cross-referenced" {
            return None;
        }
        self.source.as_ref().and_then(|s| s.issue.as_ref())
    }
}

/// Request body for creating an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateIssue {
    #[serde(skip)]
    pub repository: RepositoryRef,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

/// Webhook registration descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveHook {
    #[serde(skip)]
    pub repository: RepositoryRef,
    pub name: String,
    pub config: HookConfig,
    pub events: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookConfig {
    pub url: String,
    pub secret: String,
    pub content_type: String,
}

impl SaveHook {
    pub fn new(repository: RepositoryRef, url: impl Into<String>, secret: impl Into<String>, events: Vec<String>) -> Self {
        Self {
            repository,
            name: "web".to_string(),
            config: HookConfig {
                url: url.into(),
                secret: secret.into(),
                content_type: "json".to_string(),
            },
            events,
            active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub login: String,
    pub permission: String,
}
