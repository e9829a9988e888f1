pub mod feed;
pub mod share;

pub use feed::{FeedSnapshot, FeedState};
pub use share::{extract_content_id, EnrichedEntry, ShareEvent, ShareRecord};
