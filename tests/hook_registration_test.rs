mod common;

use std::sync::Arc;

use backport_bot::error::BackportError;
use backport_bot::github::SaveHook;
use backport_bot::webhooks::register_hook;
use common::{repository, InMemoryGitHub};

const HOOK_URL: &str = "https://bot.example.com/webhooks/github";

fn hook() -> SaveHook {
    SaveHook::new(
        repository(),
        HOOK_URL,
        "s3cr3t",
        vec!["push".to_string(), "issues".to_string(), "pull_request".to_string()],
    )
}

#[tokio::test]
async fn test_register_hook_with_admin_permission() {
    let github = Arc::new(InMemoryGitHub::new().with_permission("spring-builds", "admin"));

    register_hook(github.as_ref(), &hook(), "token").await.unwrap();

    let hooks = github.hooks();
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].config.url, HOOK_URL);
    assert_eq!(
        github.calls(),
        vec![
            "get_permission_for_default_login".to_string(),
            format!("save_hook {}", HOOK_URL)
        ]
    );
}

#[tokio::test]
async fn test_register_hook_with_write_permission() {
    let github = Arc::new(InMemoryGitHub::new().with_permission("spring-builds", "write"));

    register_hook(github.as_ref(), &hook(), "token").await.unwrap();

    assert_eq!(github.hooks().len(), 1);
}

#[tokio::test]
async fn test_register_hook_twice_keeps_one_hook() {
    let github = Arc::new(InMemoryGitHub::new());

    register_hook(github.as_ref(), &hook(), "token").await.unwrap();
    register_hook(github.as_ref(), &hook(), "token").await.unwrap();

    assert_eq!(github.hooks().len(), 1);
}

#[tokio::test]
async fn test_register_hook_refused_for_read_permission() {
    let github = Arc::new(InMemoryGitHub::new().with_permission("spring-builds", "read"));

    let err = register_hook(github.as_ref(), &hook(), "token")
        .await
        .unwrap_err();

    assert!(matches!(err, BackportError::PermissionDenied(_)));
    assert_eq!(
        err.to_string(),
        "The configured user to manage issues, spring-builds, requires admin or write permission to the rwinch/test repository but has read"
    );
    assert!(github.hooks().is_empty());
}

#[tokio::test]
async fn test_register_hook_permission_lookup_failure() {
    let github = Arc::new(InMemoryGitHub::new().failing("get_permission_for_default_login"));

    let result = register_hook(github.as_ref(), &hook(), "token").await;

    assert!(result.is_err());
    assert!(github.hooks().is_empty());
}
