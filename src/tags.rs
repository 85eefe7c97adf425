// ABOUTME: Tag keys written to every resource strata manages.
// ABOUTME: Ownership tags identify our stacks; the index tag is the watermark.

use std::collections::HashMap;

use crate::types::ProjectEnv;

/// Project the stack belongs to.
pub const PROJECT_TAG: &str = "strata.project";
/// Environment the stack was deployed into.
pub const ENV_TAG: &str = "strata.env";
/// Optional build qualifier.
pub const BUILD_TAG: &str = "strata.build";
/// Optional free-text comment supplied at deploy time.
pub const COMMENT_TAG: &str = "strata.comment";
/// Watermark tag on the environment anchor resource: the highest template
/// index successfully applied, as a base-10 string.
pub const INDEX_TAG: &str = "strata.index";

/// Tags stamped on every stack created for this scope. These are how later
/// runs discover which stacks are ours.
pub fn ownership_tags(
    scope: &ProjectEnv,
    build: Option<u32>,
    comment: Option<&str>,
) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    tags.insert(PROJECT_TAG.to_string(), scope.project().to_string());
    tags.insert(ENV_TAG.to_string(), scope.environment().to_string());
    if let Some(build) = build {
        tags.insert(BUILD_TAG.to_string(), build.to_string());
    }
    if let Some(comment) = comment {
        tags.insert(COMMENT_TAG.to_string(), comment.to_string());
    }
    tags
}

/// True when a stack's tags mark it as owned by this scope.
pub fn owned_by(tags: &HashMap<String, String>, scope: &ProjectEnv) -> bool {
    tags.get(PROJECT_TAG).map(String::as_str) == Some(scope.project())
        && tags.get(ENV_TAG).map(String::as_str) == Some(scope.environment())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_tags_include_optional_qualifiers() {
        let scope = ProjectEnv::new("acme", "qa");
        let tags = ownership_tags(&scope, Some(7), Some("nightly"));
        assert_eq!(tags.get(PROJECT_TAG).unwrap(), "acme");
        assert_eq!(tags.get(ENV_TAG).unwrap(), "qa");
        assert_eq!(tags.get(BUILD_TAG).unwrap(), "7");
        assert_eq!(tags.get(COMMENT_TAG).unwrap(), "nightly");
    }

    #[test]
    fn owned_by_requires_both_tags() {
        let scope = ProjectEnv::new("acme", "qa");
        let mut tags = ownership_tags(&scope, None, None);
        assert!(owned_by(&tags, &scope));

        tags.insert(ENV_TAG.to_string(), "prod".to_string());
        assert!(!owned_by(&tags, &scope));
    }
}
