use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::{DriveItem, Node};

/// A leaf together with its enrichment facets.
///
/// Always constructed from the listing first, then optionally upgraded with
/// the result of a detail or batch call. A `None` hash or label means the
/// provider did not report one; it is not an error state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDetail {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub content_hash: Option<String>,
    pub label_id: Option<String>,
    pub label_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileDetail {
    /// Seed a detail from what the listing page already knew.
    pub fn from_listing(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            path: node.path.clone(),
            size: node.size,
            content_hash: node.hash_hint.clone(),
            label_id: None,
            label_name: None,
            created_at: node.created_at,
            modified_at: node.modified_at,
        }
    }

    /// Merge the facets of a per-item (or batch sub-) response.
    ///
    /// Fields already known from the listing are only overwritten when the
    /// detail response actually carries a value.
    pub fn apply_item(&mut self, item: &DriveItem) {
        if let Some(hash) = item.listed_hash() {
            self.content_hash = Some(hash.to_owned());
        }
        if let Some(label) = &item.sensitivity_label {
            if label.id.is_some() {
                self.label_id = label.id.clone();
            }
            if label.display_name.is_some() {
                self.label_name = label.display_name.clone();
            }
        }
    }
}
