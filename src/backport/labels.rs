//! Label names the bot reads and writes.
//!
//! A backport request label is `for: backport-to-<branch>` with a non-empty
//! branch; a bare `for: backport-to-` names no branch and requests nothing.

use regex::Regex;
use std::sync::LazyLock;

/// Applied to an original issue once a backport has been opened for it.
pub const LABEL_STATUS_BACKPORTED: &str = "status: backported";

/// Applied to every backport issue the bot opens.
pub const LABEL_TYPE_BACKPORT: &str = "type: backport";

/// Prefix of the labels that request a backport to a branch.
pub const BACKPORT_LABEL_PREFIX: &str = "for: backport-to-";

static BACKPORT_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^for: backport-to-(?P<branch>.+)$").expect("Invalid backport label regex")
});

/// Extracts `<branch>` from a `for: backport-to-<branch>` label.
pub fn find_branch_name_by_label_name(label_name: &str) -> Option<String> {
    BACKPORT_LABEL_REGEX
        .captures(label_name)
        .and_then(|c| c.name("branch"))
        .map(|m| m.as_str().to_string())
}

pub fn is_backport_request_label(label_name: &str) -> bool {
    BACKPORT_LABEL_REGEX.is_match(label_name)
}

/// The label that requests a backport to `branch`.
pub fn backport_label_for(branch: &str) -> String {
    format!("{}{}", BACKPORT_LABEL_PREFIX, branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_extracted_from_backport_label() {
        assert_eq!(
            find_branch_name_by_label_name("for: backport-to-1.0.x").as_deref(),
            Some("1.0.x")
        );
        assert_eq!(
            find_branch_name_by_label_name("for: backport-to-release/2.1").as_deref(),
            Some("release/2.1")
        );
    }

    #[test]
    fn test_round_trip_with_label_builder() {
        for branch in ["1.0.x", "2.1.x", "main", "5.8.x-hotfix"] {
            let label = backport_label_for(branch);
            assert_eq!(find_branch_name_by_label_name(&label).as_deref(), Some(branch));
            assert!(is_backport_request_label(&label));
        }
    }

    #[test]
    fn test_non_matching_labels() {
        for label in [
            "label",
            "status: backported",
            "type: backport",
            "for: backport-to-",
            "For: backport-to-1.0.x",
            "please for: backport-to-1.0.x",
        ] {
            assert_eq!(find_branch_name_by_label_name(label), None, "{}", label);
            assert!(!is_backport_request_label(label));
        }
    }
}
