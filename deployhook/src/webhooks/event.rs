//! Push event inspection

use serde_json::Value;

/// Header name for GitHub event type.
pub const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
pub const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
pub const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Event kind that can trigger a deployment
pub const PUSH_EVENT: &str = "push";

/// Read-only view over the fields of a push payload the hook cares about.
///
/// Any valid JSON is accepted; missing fields read as `None`.
#[derive(Debug, Clone, Copy)]
pub struct PushEvent<'a> {
    payload: &'a Value,
}

impl<'a> PushEvent<'a> {
    pub fn new(payload: &'a Value) -> Self {
        Self { payload }
    }

    /// Pushed reference, e.g. `refs/heads/master`
    pub fn git_ref(&self) -> Option<&'a str> {
        self.payload.get("ref").and_then(Value::as_str)
    }

    /// Full id of the head commit
    pub fn head_commit_id(&self) -> Option<&'a str> {
        self.payload
            .get("head_commit")
            .and_then(|commit| commit.get("id"))
            .and_then(Value::as_str)
    }

    /// First 8 characters of the head commit id, or `unknown`
    pub fn short_commit(&self) -> String {
        match self.head_commit_id() {
            Some(id) if !id.is_empty() => id.chars().take(8).collect(),
            _ => "unknown".to_string(),
        }
    }
}

/// Deploy iff the event is a push and the pushed ref is exactly `deploy_ref`.
pub fn should_deploy(event: Option<&str>, git_ref: Option<&str>, deploy_ref: &str) -> bool {
    event == Some(PUSH_EVENT) && git_ref == Some(deploy_ref)
}
