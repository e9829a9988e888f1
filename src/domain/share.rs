use serde::{Deserialize, Serialize};

/// Minimal share fact: a content id plus who shared it.
///
/// Used both as the decoded payload of a push notification and as one row
/// of the authoritative pull response. Push events are treated purely as
/// signals; only pull rows establish feed membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareEvent {
    pub content_id: String,
    pub sharer_identity: String,
}

/// A share accepted into the feed by an authoritative pull.
///
/// Immutable once created; a fresher pull supersedes it wholesale rather
/// than mutating it. `sequence` is the position in the pull response and
/// defines display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareRecord {
    pub content_id: String,
    pub sharer_identity: String,
    pub sequence: usize,
}

/// A share record plus whatever display metadata has been resolved for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedEntry {
    pub record: ShareRecord,
    pub title: Option<String>,
    pub description: Option<String>,
    pub resolved: bool,
}

impl EnrichedEntry {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(pending metadata)")
    }

    pub fn display_description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Extract a content id from a user-supplied URL.
///
/// Fixed contract: if the URL contains `?v=`, the id is everything after
/// the first `?v=`; otherwise it is the last `/`-delimited path segment.
/// Returns `None` when the rule yields an empty id.
pub fn extract_content_id(url: &str) -> Option<String> {
    let id = match url.split_once("?v=") {
        Some((_, rest)) => rest,
        None => url.rsplit('/').next().unwrap_or(""),
    };
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
