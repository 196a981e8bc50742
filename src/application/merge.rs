//! Index-aligned field columns and the merge that reconciles cache hits with
//! store-fetched fallbacks.
//!
//! One merge routine serves all ten feed fields. Fallback values are keyed by
//! post id, so the merge is insensitive to store result ordering; positions
//! absent from both sources stay `None` and resolve to defensive defaults
//! when the entry is assembled.

use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use crate::domain::entities::{FeedEntry, FeedEntryDraft};
use crate::domain::fields::{FeedField, FieldValue};

/// Column-major view of field values for one feed read.
///
/// Rows follow the feed index order; each column holds one field across all
/// posts, with `None` marking absence (distinct from an empty string).
#[derive(Debug, Clone)]
pub struct FieldMatrix {
    rows: usize,
    columns: [Vec<Option<String>>; FeedField::COUNT],
}

impl FieldMatrix {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            columns: std::array::from_fn(|_| vec![None; rows]),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn set(&mut self, field: FeedField, row: usize, value: Option<String>) {
        self.columns[field.position()][row] = value;
    }

    pub fn column(&self, field: FeedField) -> &[Option<String>] {
        &self.columns[field.position()]
    }

    pub fn replace_column(&mut self, field: FeedField, column: Vec<Option<String>>) {
        debug_assert_eq!(column.len(), self.rows);
        self.columns[field.position()] = column;
    }

    /// Ids whose value for `field` is absent, in index order.
    pub fn gap_ids(&self, field: FeedField, ids: &[Uuid]) -> Vec<Uuid> {
        self.column(field)
            .iter()
            .zip(ids)
            .filter(|(value, _)| value.is_none())
            .map(|(_, id)| *id)
            .collect()
    }
}

/// Merge one cached column with fallback values keyed by id. The cached value
/// wins; the fallback fills gaps.
pub fn merge_column(
    ids: &[Uuid],
    cached: &[Option<String>],
    fetched: &[(Uuid, String)],
) -> Vec<Option<String>> {
    let by_id: HashMap<Uuid, &String> = fetched.iter().map(|(id, value)| (*id, value)).collect();
    ids.iter()
        .zip(cached)
        .map(|(id, value)| match value {
            Some(hit) => Some(hit.clone()),
            None => by_id.get(id).map(|value| (*value).clone()),
        })
        .collect()
}

/// Rebuild ordered feed entries from fully-merged columns.
///
/// A value that fails to decode for its field is treated as absent, so the
/// defensive default applies instead of failing the read.
pub fn assemble_entries(ids: &[Uuid], merged: &FieldMatrix) -> Vec<FeedEntry> {
    debug_assert_eq!(ids.len(), merged.rows());
    ids.iter()
        .enumerate()
        .map(|(row, id)| {
            let mut draft = FeedEntryDraft::new(*id);
            for field in FeedField::ALL {
                if let Some(raw) = &merged.column(field)[row] {
                    match FieldValue::decode(field, raw) {
                        Some(value) => draft.set(field, value),
                        None => {
                            warn!(
                                post_id = %id,
                                field = field.wire_name(),
                                "cached value failed to decode; using default"
                            );
                            draft.set(field, FieldValue::default_for(field));
                        }
                    }
                }
            }
            draft.finish()
        })
        .collect()
}
