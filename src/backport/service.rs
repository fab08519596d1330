//! Backport operations against GitHub.
//!
//! GitHub is the only state store: every decision re-reads issues, timelines
//! and labels so that a redelivered webhook converges on the same outcome.

use std::sync::Arc;
use tracing::{debug, info};

use crate::backport::descriptor::{self, GRADLE_PROPERTIES, POM_XML};
use crate::backport::labels::{
    self, is_backport_request_label, LABEL_STATUS_BACKPORTED, LABEL_TYPE_BACKPORT,
};
use crate::error::{BackportError, Result};
use crate::github::{BranchRef, CreateIssue, GitHubApi, IssueRef, RepositoryRef};

/// Body written to every backport issue; also the predicate used to find it again.
pub fn backport_body(original: u64) -> String {
    format!("Backport of gh-{}", original)
}

#[derive(Clone)]
pub struct BackportService {
    github: Arc<dyn GitHubApi>,
}

impl BackportService {
    pub fn new(github: Arc<dyn GitHubApi>) -> Self {
        Self { github }
    }

    /// Resolves the milestone a branch releases into: version from the build
    /// descriptor, snapshot suffix stripped, then matched against milestone titles.
    pub async fn find_milestone_number(&self, branch: &BranchRef) -> Result<u64> {
        let title = self.find_milestone_title(branch).await?;
        debug!("Branch {} releases as '{}'", branch, title);

        self.github
            .find_milestone_number_by_title(&branch.repository, &title)
            .await?
            .ok_or_else(|| {
                BackportError::not_found(format!(
                    "Cannot find a milestone number for {} (no milestone titled '{}')",
                    branch, title
                ))
            })
    }

    async fn find_milestone_title(&self, branch: &BranchRef) -> Result<String> {
        if let Some(content) = self.find_optional_file(branch, GRADLE_PROPERTIES).await? {
            if let Some(version) = descriptor::version_from_gradle_properties(&content) {
                return Ok(descriptor::milestone_title(&version));
            }
            debug!("{} on {} has no version property", GRADLE_PROPERTIES, branch);
        }

        if let Some(content) = self.find_optional_file(branch, POM_XML).await? {
            if let Some(version) = descriptor::version_from_pom(&content)? {
                return Ok(descriptor::milestone_title(&version));
            }
            debug!("{} on {} has no version", POM_XML, branch);
        }

        Err(BackportError::not_found(format!(
            "Cannot find '{}' or '{}' for {}",
            GRADLE_PROPERTIES, POM_XML, branch
        )))
    }

    async fn find_optional_file(&self, branch: &BranchRef, path: &str) -> Result<Option<String>> {
        match self.github.find_file(branch, path).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// True when the issue itself carries the milestone or a backport of it does.
    pub async fn is_issue_for_milestone(&self, issue: &IssueRef, milestone: u64) -> Result<bool> {
        Ok(self
            .find_backported_issue_for_milestone_number(issue, milestone)
            .await?
            .is_some())
    }

    /// Finds the issue tracking `issue` in `milestone`: the issue itself when it
    /// already carries the milestone, otherwise a cross-referenced backport whose
    /// milestone matches and whose body is exactly the backport body.
    pub async fn find_backported_issue_for_milestone_number(
        &self,
        issue: &IssueRef,
        milestone: u64,
    ) -> Result<Option<IssueRef>> {
        let found = self.github.find_issue(issue).await?;
        if found.milestone_number() == Some(milestone) {
            return Ok(Some(issue.clone()));
        }

        let expected_body = backport_body(issue.number);
        let backport = self
            .github
            .find_issue_timeline(issue)
            .await?
            .iter()
            .filter_map(|event| event.cross_referenced_issue())
            .find(|source| {
                source.milestone.as_ref().map(|m| m.number) == Some(milestone)
                    && source.body.as_deref() == Some(expected_body.as_str())
            })
            .map(|source| IssueRef::new(issue.repository.clone(), source.number));

        if let Some(backport) = &backport {
            debug!("{} is backported to milestone {} by {}", issue, milestone, backport);
        }
        Ok(backport)
    }

    /// Marks `fixed` as backported and opens its backport issue in `milestone`.
    pub async fn create_backport(
        &self,
        fixed: &IssueRef,
        milestone: u64,
        assignees: Vec<String>,
    ) -> Result<IssueRef> {
        let issue = self.github.find_issue(fixed).await.map_err(|e| {
            if e.is_not_found() {
                BackportError::not_found(format!("Cannot find issue {}", fixed))
            } else {
                e
            }
        })?;

        let mut original_labels = issue.label_names();
        if !original_labels.iter().any(|l| l == LABEL_STATUS_BACKPORTED) {
            original_labels.push(LABEL_STATUS_BACKPORTED.to_string());
            self.github.update_labels(fixed, &original_labels).await?;
        }

        let mut labels: Vec<String> = issue
            .label_names()
            .into_iter()
            .filter(|l| l != LABEL_STATUS_BACKPORTED && l != LABEL_TYPE_BACKPORT)
            .filter(|l| !is_backport_request_label(l))
            .collect();
        labels.push(LABEL_TYPE_BACKPORT.to_string());

        let create = CreateIssue {
            repository: fixed.repository.clone(),
            title: issue.title,
            body: backport_body(fixed.number),
            milestone: Some(milestone),
            labels,
            assignees,
        };
        let backport = self.github.create_issue(&create).await?;
        info!("Opened backport {} of {} for milestone {}", backport, fixed, milestone);
        Ok(backport)
    }

    /// Comments with the fixing commit, then closes the backport.
    pub async fn close_backport(&self, issue: &IssueRef, fixed_commit_id: &str) -> Result<()> {
        self.github
            .comment(issue, &format!("Fixed via {}", fixed_commit_id))
            .await?;
        self.github.close_issue(issue).await?;
        info!("Closed backport {} via {}", issue, fixed_commit_id);
        Ok(())
    }

    /// Drops `label_name` from the issue; a missing issue is not an error.
    pub async fn remove_label(&self, issue: &IssueRef, label_name: &str) -> Result<()> {
        let found = match self.github.find_issue(issue).await {
            Ok(found) => found,
            Err(e) if e.is_not_found() => {
                debug!("Not removing '{}': {} does not exist", label_name, issue);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let remaining: Vec<String> = found
            .label_names()
            .into_iter()
            .filter(|l| l != label_name)
            .collect();
        self.github.update_labels(issue, &remaining).await
    }

    pub fn find_branch_name_by_label_name(&self, label_name: &str) -> Option<String> {
        labels::find_branch_name_by_label_name(label_name)
    }

    /// Every branch some `for: backport-to-<branch>` label in the repository names.
    pub async fn find_backport_branches(&self, repository: &RepositoryRef) -> Result<Vec<BranchRef>> {
        Ok(self
            .github
            .find_labels(repository)
            .await?
            .iter()
            .filter_map(|label| labels::find_branch_name_by_label_name(&label.name))
            .map(|branch| BranchRef::new(repository.clone(), format!("refs/heads/{}", branch)))
            .collect())
    }
}
