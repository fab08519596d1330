//! Webhook registration for a repository the bot manages.

use tracing::{info, warn};

use crate::error::{BackportError, Result};
use crate::github::{GitHubApi, SaveHook};

/// Permissions that let the configured login label, comment on and close issues.
const MANAGING_PERMISSIONS: [&str; 2] = ["admin", "write"];

/// Saves `hook` once the login owning the configured token is known to be
/// able to manage issues of the hook's repository.
pub async fn register_hook(github: &dyn GitHubApi, hook: &SaveHook, access_token: &str) -> Result<()> {
    let permission = github
        .get_permission_for_default_login(&hook.repository, access_token)
        .await?;

    if !MANAGING_PERMISSIONS.contains(&permission.permission.as_str()) {
        warn!(
            "Refusing to register hook on {}: {} has '{}' permission",
            hook.repository, permission.login, permission.permission
        );
        return Err(BackportError::PermissionDenied(format!(
            "The configured user to manage issues, {}, requires admin or write permission to the {} repository but has {}",
            permission.login, hook.repository, permission.permission
        )));
    }

    github.save_hook(hook).await?;
    info!("Webhook for {} registered on {}", hook.config.url, hook.repository);
    Ok(())
}
