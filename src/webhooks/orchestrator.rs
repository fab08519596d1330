//! Decides which webhook deliveries trigger a backport and drives the
//! backport operations for them.

use futures::future::try_join_all;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::backport::labels::backport_label_for;
use crate::backport::BackportService;
use crate::error::Result;
use crate::github::{BranchRef, IssueRef};
use crate::webhooks::events::{Commit, IssueEvent, PullRequestEvent, PushEvent, WebhookEvent};

const LABELED: &str = "labeled";

#[derive(Clone)]
pub struct EventService {
    backport: BackportService,
}

impl EventService {
    pub fn new(backport: BackportService) -> Self {
        Self { backport }
    }

    /// Returns `true` when a backport issue was created or closed.
    pub async fn handle(&self, event: &WebhookEvent) -> Result<bool> {
        match event {
            WebhookEvent::Push(push) => self.backport_push(push).await,
            WebhookEvent::Issues(issue) => self.backport_issue(issue).await,
            WebhookEvent::PullRequest(pull_request) => self.backport_pull_request(pull_request).await,
            WebhookEvent::Ping | WebhookEvent::Unsupported(_) => {
                debug!("Ignoring '{}' event", event.name());
                Ok(false)
            }
        }
    }

    /// Opens a backport when an issue receives a `for: backport-to-<branch>` label.
    pub async fn backport_issue(&self, event: &IssueEvent) -> Result<bool> {
        self.backport_labeled(
            &event.action,
            event.label.as_ref().map(|l| l.name.as_str()),
            event.issue_ref(),
            event.sender.as_ref().map(|s| s.login.clone()),
        )
        .await
    }

    /// Opens a backport when a pull request receives a `for: backport-to-<branch>` label.
    pub async fn backport_pull_request(&self, event: &PullRequestEvent) -> Result<bool> {
        self.backport_labeled(
            &event.action,
            event.label.as_ref().map(|l| l.name.as_str()),
            event.issue_ref(),
            event.sender.as_ref().map(|s| s.login.clone()),
        )
        .await
    }

    async fn backport_labeled(
        &self,
        action: &str,
        label: Option<&str>,
        issue: IssueRef,
        sender: Option<String>,
    ) -> Result<bool> {
        if action != LABELED {
            debug!("Ignoring '{}' action on {}", action, issue);
            return Ok(false);
        }
        let Some(label) = label else {
            return Ok(false);
        };
        let Some(branch_name) = self.backport.find_branch_name_by_label_name(label) else {
            debug!("Label '{}' on {} does not request a backport", label, issue);
            return Ok(false);
        };

        self.backport.remove_label(&issue, label).await?;

        let branch = BranchRef::new(issue.repository.clone(), branch_name);
        let milestone = self.backport.find_milestone_number(&branch).await?;
        if self.backport.is_issue_for_milestone(&issue, milestone).await? {
            info!("{} is already tracked for milestone {} of {}", issue, milestone, branch);
            return Ok(false);
        }

        let assignees = sender.into_iter().collect();
        self.backport.create_backport(&issue, milestone, assignees).await?;
        Ok(true)
    }

    /// Closes (creating first when needed) the backport of every issue fixed by
    /// a push to a backport branch.
    pub async fn backport_push(&self, event: &PushEvent) -> Result<bool> {
        if !self.is_backport_push(event).await? {
            return Ok(false);
        }

        let branch = event.branch_ref();
        let milestone = self.backport.find_milestone_number(&branch).await?;

        // Commits fixing the same issue share one backport and close it in push order.
        let mut by_issue: BTreeMap<u64, Vec<&Commit>> = BTreeMap::new();
        for (issue_number, commit) in event.fixed_issues() {
            by_issue.entry(issue_number).or_default().push(commit);
        }

        let assignee = event.pusher.name.clone();
        try_join_all(by_issue.into_iter().map(|(issue_number, commits)| {
            let issue = IssueRef::new(branch.repository.clone(), issue_number);
            self.backport_fixed_issue(issue, milestone, commits, assignee.clone())
        }))
        .await?;

        Ok(true)
    }

    async fn backport_fixed_issue(
        &self,
        issue: IssueRef,
        milestone: u64,
        commits: Vec<&Commit>,
        assignee: String,
    ) -> Result<()> {
        let backport = match self
            .backport
            .find_backported_issue_for_milestone_number(&issue, milestone)
            .await?
        {
            Some(existing) => existing,
            None => {
                self.backport
                    .create_backport(&issue, milestone, vec![assignee])
                    .await?
            }
        };

        for commit in commits {
            self.backport.close_backport(&backport, &commit.id).await?;
        }
        Ok(())
    }

    /// A push is a backport push when it carries a fix commit and targets a
    /// branch some backport label names.
    async fn is_backport_push(&self, event: &PushEvent) -> Result<bool> {
        if event.fix_commits().is_empty() {
            debug!("Push to {} has no fix commits", event.ref_name);
            return Ok(false);
        }

        let branch = event.branch_ref();
        let is_backport = self
            .backport
            .find_backport_branches(&branch.repository)
            .await?
            .contains(&branch);
        if !is_backport {
            debug!(
                "{} is not a backport branch: no '{}' label",
                branch,
                backport_label_for(branch.short_name())
            );
        }
        Ok(is_backport)
    }
}
