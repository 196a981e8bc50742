//! Cache key shaping.
//!
//! The key layout is shared with every component that reads this cache and
//! must not drift: `"{id}_{field}"` for entity-scoped fields,
//! `"{id}_{viewerId}_{field}"` for viewer-scoped self-flags, and
//! `"{userId}_FeedIndex"` for the per-user ordered post-id list.

use uuid::Uuid;

use crate::domain::fields::{FeedField, ProfileField};

pub const FEED_INDEX_SUFFIX: &str = "FeedIndex";

/// Key for one feed field of one post. `viewer` participates only in
/// viewer-scoped fields (the self-flags).
pub fn post_field_key(post_id: Uuid, viewer: Uuid, field: FeedField) -> String {
    if field.viewer_scoped() {
        format!("{post_id}_{viewer}_{}", field.wire_name())
    } else {
        format!("{post_id}_{}", field.wire_name())
    }
}

pub fn profile_field_key(user_id: Uuid, field: ProfileField) -> String {
    format!("{user_id}_{}", field.wire_name())
}

pub fn feed_index_key(user_id: Uuid) -> String {
    format!("{user_id}_{FEED_INDEX_SUFFIX}")
}
