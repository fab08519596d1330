use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use http::header::{HeaderMap, HeaderValue, ACCEPT, LINK};
use http::StatusCode;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{BackportError, Result};
use crate::github::pagination::next_link;
use crate::github::types::{
    BranchRef, CreateIssue, Issue, IssueRef, Label, Permission, RepositoryRef, SaveHook,
    TimelineEvent,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT_TIMELINE_PREVIEW: &str = "application/vnd.github.mockingbird-preview+json";

/// The GitHub capabilities the backport engine consumes.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Resolves the login owning `access_token` and its permission on `repository`.
    async fn get_permission_for_default_login(
        &self,
        repository: &RepositoryRef,
        access_token: &str,
    ) -> Result<Permission>;

    async fn is_member_of_team(&self, username: &str, team_id: u64, access_token: &str) -> Result<bool>;

    /// Looks up a milestone number by its exact title.
    async fn find_milestone_number_by_title(
        &self,
        repository: &RepositoryRef,
        title: &str,
    ) -> Result<Option<u64>>;

    async fn create_issue(&self, issue: &CreateIssue) -> Result<IssueRef>;

    async fn close_issue(&self, issue: &IssueRef) -> Result<()>;

    async fn comment(&self, issue: &IssueRef, body: &str) -> Result<()>;

    /// Fails with [`BackportError::NotFound`] when the issue does not exist.
    async fn find_issue(&self, issue: &IssueRef) -> Result<Issue>;

    /// Returns the decoded content of `path` on `branch`, failing with
    /// [`BackportError::NotFound`] when the file does not exist.
    async fn find_file(&self, branch: &BranchRef, path: &str) -> Result<Vec<u8>>;

    async fn find_issue_timeline(&self, issue: &IssueRef) -> Result<Vec<TimelineEvent>>;

    /// Replaces the full label set of an issue.
    async fn update_labels(&self, issue: &IssueRef, labels: &[String]) -> Result<()>;

    /// Edits the hook with the same URL if one exists, otherwise creates it.
    async fn save_hook(&self, hook: &SaveHook) -> Result<()>;

    async fn find_labels(&self, repository: &RepositoryRef) -> Result<Vec<Label>>;
}

/// [`GitHubApi`] over the GitHub REST v3 API, sent through octocrab's raw
/// request methods so pagination `Link` headers and preview media types stay
/// visible.
#[derive(Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    base_url: String,
    timeout: Duration,
}

/// A finished exchange: status, headers and the body read to text.
struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Reply {
    /// Turns any non-2xx status into an upstream error.
    fn success(self, context: impl FnOnce() -> String) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(self.into_error(context()))
        }
    }

    fn into_error(self, message: String) -> BackportError {
        BackportError::upstream(message, self.status.as_u16(), self.body)
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    fn next_page(&self) -> Option<String> {
        self.headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_link)
    }
}

/// Awaits a raw octocrab call and reads its body.
macro_rules! exchange {
    ($octocrab:expr, $call:expr) => {{
        let response = $call.await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = $octocrab.body_to_string(response).await?;
        Reply {
            status,
            headers,
            body,
        }
    }};
}

#[derive(Debug, Deserialize)]
struct Numbered {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct GitHubMilestone {
    number: u64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct GitHubContents {
    content: String,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct CollaboratorPermission {
    permission: String,
}

#[derive(Debug, Deserialize)]
struct Hook {
    id: u64,
    config: HookUrl,
}

#[derive(Debug, Deserialize)]
struct HookUrl {
    url: Option<String>,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let octocrab = Self::build(&base_url, token, timeout)?;
        Ok(Self {
            octocrab,
            base_url,
            timeout,
        })
    }

    fn build(base_url: &str, token: &str, timeout: Duration) -> Result<Octocrab> {
        let mut builder = Octocrab::builder()
            .base_uri(base_url)
            .map_err(|e| BackportError::ConfigError(format!("Invalid GitHub API url {}: {}", base_url, e)))?
            .set_connect_timeout(Some(timeout))
            .set_read_timeout(Some(timeout));
        if !token.is_empty() {
            builder = builder.personal_token(token.to_string());
        }
        builder
            .build()
            .map_err(|e| BackportError::GitHubError(format!("Failed to create GitHub client: {}", e)))
    }

    /// A client acting as the owner of `access_token` instead of the bot.
    fn acting_as(&self, access_token: &str) -> Result<Octocrab> {
        Self::build(&self.base_url, access_token, self.timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, url: String) -> Result<Reply> {
        Ok(exchange!(self.octocrab, self.octocrab._get(url)))
    }

    /// Fetches one page, returning its items and the next page URL.
    async fn get_page<T: DeserializeOwned>(
        &self,
        url: String,
        accept: Option<&'static str>,
        context: &str,
    ) -> Result<(Vec<T>, Option<String>)> {
        let headers = accept.map(|accept| {
            let mut headers = HeaderMap::new();
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
            headers
        });
        let reply = exchange!(self.octocrab, self.octocrab._get_with_headers(url, headers))
            .success(|| context.to_string())?;
        Ok((reply.json()?, reply.next_page()))
    }

    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: String,
        accept: Option<&'static str>,
        context: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next {
            let (page, following) = self.get_page(url, accept, context).await?;
            items.extend(page);
            next = following;
        }
        Ok(items)
    }

    async fn update_issue(&self, issue: &IssueRef, body: serde_json::Value) -> Result<()> {
        let url = self.url(&format!(
            "/repos/{}/issues/{}",
            issue.repository.full_name, issue.number
        ));
        exchange!(self.octocrab, self.octocrab._patch(url, Some(&body)))
            .success(|| format!("Failed to update issue {}", issue))?;
        Ok(())
    }

    async fn find_hooks(&self, repository: &RepositoryRef) -> Result<Vec<Hook>> {
        let url = self.url(&format!("/repos/{}/hooks", repository.full_name));
        self.get_all_pages(url, None, &format!("Cannot get the hooks for {}", repository))
            .await
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn get_permission_for_default_login(
        &self,
        repository: &RepositoryRef,
        access_token: &str,
    ) -> Result<Permission> {
        let user: GitHubUser = self
            .get(self.url("/user"))
            .await?
            .success(|| "Failed to determine the default login".to_string())?
            .json()?;

        let url = self.url(&format!(
            "/repos/{}/collaborators/{}/permission",
            repository.full_name, user.login
        ));
        let octocrab = self.acting_as(access_token)?;
        let permission: CollaboratorPermission = exchange!(octocrab, octocrab._get(url))
            .success(|| format!("Failed to get permission of {} for {}", user.login, repository))?
            .json()?;

        Ok(Permission {
            login: user.login,
            permission: permission.permission,
        })
    }

    async fn is_member_of_team(&self, username: &str, team_id: u64, access_token: &str) -> Result<bool> {
        let url = self.url(&format!("/teams/{}/memberships/{}", team_id, username));
        let octocrab = self.acting_as(access_token)?;
        let reply = exchange!(octocrab, octocrab._get(url));
        match reply.status {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(reply.into_error(format!(
                "Failed to determine if {} is a part of {}",
                username, team_id
            ))),
        }
    }

    async fn find_milestone_number_by_title(
        &self,
        repository: &RepositoryRef,
        title: &str,
    ) -> Result<Option<u64>> {
        let mut next = Some(self.url(&format!("/repos/{}/milestones", repository.full_name)));
        while let Some(url) = next {
            let (page, following): (Vec<GitHubMilestone>, _) = self
                .get_page(url, None, &format!("Cannot get milestones for {}", repository))
                .await?;
            if let Some(milestone) = page.into_iter().find(|m| m.title == title) {
                debug!("Milestone '{}' of {} is #{}", title, repository, milestone.number);
                return Ok(Some(milestone.number));
            }
            next = following;
        }
        Ok(None)
    }

    async fn create_issue(&self, issue: &CreateIssue) -> Result<IssueRef> {
        let url = self.url(&format!("/repos/{}/issues", issue.repository.full_name));
        let created: Numbered = exchange!(self.octocrab, self.octocrab._post(url, Some(issue)))
            .success(|| format!("Cannot create issue '{}' for {}", issue.title, issue.repository))?
            .json()?;

        info!("Created issue {}#{}", issue.repository, created.number);
        Ok(IssueRef::new(issue.repository.clone(), created.number))
    }

    async fn close_issue(&self, issue: &IssueRef) -> Result<()> {
        self.update_issue(issue, serde_json::json!({ "state": "closed" }))
            .await
    }

    async fn comment(&self, issue: &IssueRef, body: &str) -> Result<()> {
        let url = self.url(&format!(
            "/repos/{}/issues/{}/comments",
            issue.repository.full_name, issue.number
        ));
        let body = serde_json::json!({ "body": body });
        exchange!(self.octocrab, self.octocrab._post(url, Some(&body)))
            .success(|| format!("Failed to create comment for {}", issue))?;
        Ok(())
    }

    async fn find_issue(&self, issue: &IssueRef) -> Result<Issue> {
        let url = self.url(&format!(
            "/repos/{}/issues/{}",
            issue.repository.full_name, issue.number
        ));
        let reply = self.get(url).await?;
        if reply.status == StatusCode::NOT_FOUND {
            return Err(BackportError::not_found(format!("Could not find issue {}", issue)));
        }
        reply
            .success(|| format!("Could not find issue {}", issue))?
            .json()
    }

    async fn find_file(&self, branch: &BranchRef, path: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!(
            "/repos/{}/contents/{}?ref={}",
            branch.repository.full_name, path, branch.ref_name
        ));
        let reply = self.get(url).await?;
        if reply.status == StatusCode::NOT_FOUND {
            return Err(BackportError::not_found(format!(
                "Could not get file {} for {}",
                path, branch
            )));
        }

        let contents: GitHubContents = reply
            .success(|| format!("Could not get file {} for {}", path, branch))?
            .json()?;
        let encoded: String = contents
            .content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        STANDARD.decode(encoded).map_err(|e| {
            BackportError::GitHubError(format!("Invalid base64 content for {} on {}: {}", path, branch, e))
        })
    }

    async fn find_issue_timeline(&self, issue: &IssueRef) -> Result<Vec<TimelineEvent>> {
        let url = self.url(&format!(
            "/repos/{}/issues/{}/timeline",
            issue.repository.full_name, issue.number
        ));
        self.get_all_pages(
            url,
            Some(ACCEPT_TIMELINE_PREVIEW),
            &format!("Cannot get the timeline for {}", issue),
        )
        .await
    }

    async fn update_labels(&self, issue: &IssueRef, labels: &[String]) -> Result<()> {
        self.update_issue(issue, serde_json::json!({ "labels": labels }))
            .await
    }

    async fn save_hook(&self, hook: &SaveHook) -> Result<()> {
        let existing = self
            .find_hooks(&hook.repository)
            .await?
            .into_iter()
            .find(|h| h.config.url.as_deref() == Some(hook.config.url.as_str()));

        match existing {
            Some(existing) => {
                let url = self.url(&format!(
                    "/repos/{}/hooks/{}",
                    hook.repository.full_name, existing.id
                ));
                exchange!(self.octocrab, self.octocrab._patch(url, Some(hook)))
                    .success(|| format!("Failed to edit hook {} for {}", existing.id, hook.repository))?;
                info!("Updated hook {} on {}", existing.id, hook.repository);
            }
            None => {
                let url = self.url(&format!("/repos/{}/hooks", hook.repository.full_name));
                exchange!(self.octocrab, self.octocrab._post(url, Some(hook)))
                    .success(|| format!("Failed to create hook for {}", hook.repository))?;
                info!("Created hook for {} on {}", hook.config.url, hook.repository);
            }
        }
        Ok(())
    }

    async fn find_labels(&self, repository: &RepositoryRef) -> Result<Vec<Label>> {
        let url = self.url(&format!("/repos/{}/labels", repository.full_name));
        self.get_all_pages(url, None, &format!("Cannot get the labels for {}", repository))
            .await
    }
}
