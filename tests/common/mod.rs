//! Shared fixtures: an in-memory GitHub that records every mutation.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use backport_bot::backport::BackportService;
use backport_bot::error::{BackportError, Result};
use backport_bot::github::{
    BranchRef, CreateIssue, GitHubApi, Issue, IssueRef, Label, Milestone, Permission,
    RepositoryRef, SaveHook, TimelineEvent, TimelineIssue, TimelineSource,
};
use backport_bot::webhooks::EventService;

pub const REPOSITORY: &str = "rwinch/test";
pub const FIRST_CREATED_NUMBER: u64 = 1000;

#[derive(Default)]
struct State {
    issues: HashMap<u64, Issue>,
    files: HashMap<(String, String), Vec<u8>>,
    milestones: Vec<Milestone>,
    timelines: HashMap<u64, Vec<TimelineEvent>>,
    labels: Vec<Label>,
    hooks: Vec<SaveHook>,
    next_number: u64,
    failing: HashSet<&'static str>,
    label_delay: Option<Duration>,
    permission: Option<Permission>,
    created: Vec<CreateIssue>,
    comments: Vec<(u64, String)>,
    closed: Vec<u64>,
    label_updates: Vec<(u64, Vec<String>)>,
    calls: Vec<String>,
}

/// A single-repository GitHub double.
///
/// Creating an issue whose body is `Backport of gh-<n>` adds the matching
/// `cross-referenced` entry to issue `n`'s timeline, as GitHub does.
pub struct InMemoryGitHub {
    repository: RepositoryRef,
    state: Mutex<State>,
}

impl InMemoryGitHub {
    pub fn new() -> Self {
        Self {
            repository: repository(),
            state: Mutex::new(State {
                next_number: FIRST_CREATED_NUMBER,
                ..State::default()
            }),
        }
    }

    pub fn with_issue(self, number: u64, title: &str, milestone: Option<u64>, labels: &[&str]) -> Self {
        self.state.lock().unwrap().issues.insert(
            number,
            Issue {
                number,
                title: title.to_string(),
                milestone: milestone.map(|n| Milestone {
                    number: n,
                    title: format!("milestone-{}", n),
                }),
                labels: labels.iter().map(|l| Label::new(*l)).collect(),
            },
        );
        self
    }

    pub fn with_file(self, branch: &str, path: &str, content: &str) -> Self {
        let branch = BranchRef::new(self.repository.clone(), branch);
        self.state
            .lock()
            .unwrap()
            .files
            .insert((branch.ref_name, path.to_string()), content.as_bytes().to_vec());
        self
    }

    pub fn with_milestone(self, number: u64, title: &str) -> Self {
        self.state.lock().unwrap().milestones.push(Milestone {
            number,
            title: title.to_string(),
        });
        self
    }

    pub fn with_label(self, name: &str) -> Self {
        self.state.lock().unwrap().labels.push(Label::new(name));
        self
    }

    pub fn with_timeline_event(self, issue: u64, event: TimelineEvent) -> Self {
        self.state
            .lock()
            .unwrap()
            .timelines
            .entry(issue)
            .or_default()
            .push(event);
        self
    }

    /// Makes every call to `operation` fail with a 500 upstream error.
    pub fn failing(self, operation: &'static str) -> Self {
        self.state.lock().unwrap().failing.insert(operation);
        self
    }

    /// Delays every label listing, which is the first call a push makes.
    pub fn with_label_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().label_delay = Some(delay);
        self
    }

    /// The login and permission reported for the configured token; `rwinch`
    /// with `admin` when unset.
    pub fn with_permission(self, login: &str, permission: &str) -> Self {
        self.state.lock().unwrap().permission = Some(Permission {
            login: login.to_string(),
            permission: permission.to_string(),
        });
        self
    }

    pub fn created(&self) -> Vec<CreateIssue> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().comments.clone()
    }

    pub fn closed(&self) -> Vec<u64> {
        self.state.lock().unwrap().closed.clone()
    }

    pub fn label_updates(&self) -> Vec<(u64, Vec<String>)> {
        self.state.lock().unwrap().label_updates.clone()
    }

    pub fn labels_of(&self, issue: u64) -> Vec<String> {
        self.state.lock().unwrap().issues[&issue].label_names()
    }

    pub fn hooks(&self) -> Vec<SaveHook> {
        self.state.lock().unwrap().hooks.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String, operation: &'static str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(operation) {
            return Err(BackportError::upstream(
                format!("Simulated failure of {}", operation),
                500,
                "",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl GitHubApi for InMemoryGitHub {
    async fn get_permission_for_default_login(
        &self,
        _repository: &RepositoryRef,
        _access_token: &str,
    ) -> Result<Permission> {
        self.record("get_permission_for_default_login".to_string(), "get_permission_for_default_login")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .permission
            .clone()
            .unwrap_or_else(|| Permission {
                login: "rwinch".to_string(),
                permission: "admin".to_string(),
            }))
    }

    async fn is_member_of_team(&self, username: &str, team_id: u64, _access_token: &str) -> Result<bool> {
        self.record(format!("is_member_of_team {} {}", username, team_id), "is_member_of_team")?;
        Ok(true)
    }

    async fn find_milestone_number_by_title(
        &self,
        _repository: &RepositoryRef,
        title: &str,
    ) -> Result<Option<u64>> {
        self.record(format!("find_milestone_number_by_title {}", title), "find_milestone_number_by_title")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .milestones
            .iter()
            .find(|m| m.title == title)
            .map(|m| m.number))
    }

    async fn create_issue(&self, issue: &CreateIssue) -> Result<IssueRef> {
        self.record(format!("create_issue {}", issue.body), "create_issue")?;
        let mut state = self.state.lock().unwrap();
        let number = state.next_number;
        state.next_number += 1;

        let milestone = issue.milestone.map(|n| Milestone {
            number: n,
            title: format!("milestone-{}", n),
        });
        state.issues.insert(
            number,
            Issue {
                number,
                title: issue.title.clone(),
                milestone: milestone.clone(),
                labels: issue.labels.iter().map(Label::new).collect(),
            },
        );
        if let Some(original) = issue
            .body
            .strip_prefix("Backport of gh-")
            .and_then(|n| n.parse::<u64>().ok())
        {
            state
                .timelines
                .entry(original)
                .or_default()
                .push(cross_reference(number, &issue.body, milestone.map(|m| m.number)));
        }
        state.created.push(issue.clone());
        Ok(IssueRef::new(issue.repository.clone(), number))
    }

    async fn close_issue(&self, issue: &IssueRef) -> Result<()> {
        self.record(format!("close_issue #{}", issue.number), "close_issue")?;
        self.state.lock().unwrap().closed.push(issue.number);
        Ok(())
    }

    async fn comment(&self, issue: &IssueRef, body: &str) -> Result<()> {
        self.record(format!("comment #{}", issue.number), "comment")?;
        self.state
            .lock()
            .unwrap()
            .comments
            .push((issue.number, body.to_string()));
        Ok(())
    }

    async fn find_issue(&self, issue: &IssueRef) -> Result<Issue> {
        self.record(format!("find_issue #{}", issue.number), "find_issue")?;
        self.state
            .lock()
            .unwrap()
            .issues
            .get(&issue.number)
            .cloned()
            .ok_or_else(|| BackportError::not_found(format!("Could not find issue {}", issue)))
    }

    async fn find_file(&self, branch: &BranchRef, path: &str) -> Result<Vec<u8>> {
        self.record(format!("find_file {} {}", branch.ref_name, path), "find_file")?;
        self.state
            .lock()
            .unwrap()
            .files
            .get(&(branch.ref_name.clone(), path.to_string()))
            .cloned()
            .ok_or_else(|| {
                BackportError::not_found(format!("Could not get file {} for {}", path, branch))
            })
    }

    async fn find_issue_timeline(&self, issue: &IssueRef) -> Result<Vec<TimelineEvent>> {
        self.record(format!("find_issue_timeline #{}", issue.number), "find_issue_timeline")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .timelines
            .get(&issue.number)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_labels(&self, issue: &IssueRef, labels: &[String]) -> Result<()> {
        self.record(format!("update_labels #{}", issue.number), "update_labels")?;
        let mut state = self.state.lock().unwrap();
        if let Some(found) = state.issues.get_mut(&issue.number) {
            found.labels = labels.iter().map(Label::new).collect();
        }
        state.label_updates.push((issue.number, labels.to_vec()));
        Ok(())
    }

    async fn save_hook(&self, hook: &SaveHook) -> Result<()> {
        self.record(format!("save_hook {}", hook.config.url), "save_hook")?;
        let mut state = self.state.lock().unwrap();
        state.hooks.retain(|h| h.config.url != hook.config.url);
        state.hooks.push(hook.clone());
        Ok(())
    }

    async fn find_labels(&self, _repository: &RepositoryRef) -> Result<Vec<Label>> {
        self.record("find_labels".to_string(), "find_labels")?;
        let delay = self.state.lock().unwrap().label_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.state.lock().unwrap().labels.clone())
    }
}

pub fn repository() -> RepositoryRef {
    RepositoryRef::new(REPOSITORY)
}

pub fn issue_ref(number: u64) -> IssueRef {
    IssueRef::new(repository(), number)
}

pub fn branch_ref(name: &str) -> BranchRef {
    BranchRef::new(repository(), name)
}

pub fn cross_reference(number: u64, body: &str, milestone: Option<u64>) -> TimelineEvent {
    TimelineEvent {
        event: "cross-referenced".to_string(),
        source: Some(TimelineSource {
            kind: "issue".to_string(),
            issue: Some(TimelineIssue {
                number,
                body: Some(body.to_string()),
                milestone: milestone.map(|n| Milestone {
                    number: n,
                    title: format!("milestone-{}", n),
                }),
            }),
        }),
    }
}

pub fn backport_service(github: &Arc<InMemoryGitHub>) -> BackportService {
    BackportService::new(github.clone())
}

pub fn event_service(github: &Arc<InMemoryGitHub>) -> EventService {
    EventService::new(backport_service(github))
}
