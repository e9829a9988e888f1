use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::share::{EnrichedEntry, ShareEvent, ShareRecord};
use crate::enricher::VideoMetadata;

/// Canonical in-memory feed owned by the Reconciler.
///
/// Membership and order are replaced wholesale by each authoritative pull;
/// resolved metadata is carried forward across pulls so unchanged entries
/// are never re-enriched. The refresh epoch increments on every accepted
/// pull and guards against merging stale enrichment responses.
#[derive(Debug, Default)]
pub struct FeedState {
    epoch: u64,
    entries: Vec<EnrichedEntry>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Read-only view of the feed handed to the Presenter.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub epoch: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub entries: Arc<Vec<EnrichedEntry>>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace membership and order with an authoritative pull result.
    ///
    /// Sequence numbers are assigned by response position. Duplicate
    /// content ids within one pull keep their first occurrence. Entries
    /// that were already resolved keep their title/description; genuinely
    /// new ids start unresolved. Returns the new epoch.
    pub fn apply_pull(&mut self, pulled: Vec<ShareEvent>) -> u64 {
        self.epoch += 1;

        let prior: HashMap<String, EnrichedEntry> = self
            .entries
            .drain(..)
            .map(|e| (e.record.content_id.clone(), e))
            .collect();

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(pulled.len());

        for event in pulled {
            if !seen.insert(event.content_id.clone()) {
                tracing::debug!("duplicate content id in pull: {}", event.content_id);
                continue;
            }

            let (title, description, resolved) = match prior.get(&event.content_id) {
                Some(old) if old.resolved => (old.title.clone(), old.description.clone(), true),
                _ => (None, None, false),
            };

            entries.push(EnrichedEntry {
                record: ShareRecord {
                    sequence: entries.len(),
                    content_id: event.content_id,
                    sharer_identity: event.sharer_identity,
                },
                title,
                description,
                resolved,
            });
        }

        self.entries = entries;
        self.refreshed_at = Some(Utc::now());
        self.epoch
    }

    /// Content ids still awaiting metadata, in display order.
    pub fn unresolved_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.resolved)
            .map(|e| e.record.content_id.clone())
            .collect()
    }

    /// Apply an enrichment response captured at `epoch`.
    ///
    /// A response from a superseded epoch is discarded outright, as is
    /// metadata for ids no longer in the feed. Ids the provider omitted
    /// simply stay unresolved. Returns whether any entry changed.
    pub fn apply_metadata(&mut self, epoch: u64, metadata: HashMap<String, VideoMetadata>) -> bool {
        if epoch != self.epoch {
            tracing::debug!(
                "discarding stale enrichment response (epoch {} != {})",
                epoch,
                self.epoch
            );
            return false;
        }

        let mut changed = false;
        for entry in &mut self.entries {
            if entry.resolved {
                continue;
            }
            if let Some(meta) = metadata.get(&entry.record.content_id) {
                entry.title = Some(meta.title.clone());
                entry.description = Some(meta.description.clone());
                entry.resolved = true;
                changed = true;
            }
        }
        changed
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            epoch: self.epoch,
            refreshed_at: self.refreshed_at,
            entries: Arc::new(self.entries.clone()),
        }
    }
}
