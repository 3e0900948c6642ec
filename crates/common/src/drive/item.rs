use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::path::item_path;

/// One entry as returned by the provider's listing and detail endpoints.
///
/// Only the facets the scanner selects are modelled; everything else in the
/// wire payload is ignored on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub created_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_reference: Option<ParentReference>,
    /// Present iff the item is a container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<FolderFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity_label: Option<LabelFacet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    #[serde(default)]
    pub id: Option<String>,
    /// Provider path of the parent, e.g. `/drive/root:/reports/2024`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default)]
    pub child_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub hashes: Option<HashesFacet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashesFacet {
    #[serde(default)]
    pub quick_xor_hash: Option<String>,
}

/// Classification label facet. The scanner relies on this fixed schema
/// rather than sniffing list-column names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelFacet {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl DriveItem {
    pub fn is_container(&self) -> bool {
        self.folder.is_some()
    }

    /// Hash carried by the listing's file facet, if the provider included it.
    pub fn listed_hash(&self) -> Option<&str> {
        self.file
            .as_ref()
            .and_then(|f| f.hashes.as_ref())
            .and_then(|h| h.quick_xor_hash.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Container,
    Leaf,
}

/// A classified hierarchy entry. Built once from a listing page and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    /// Id of the listed parent, if the provider reported one.
    pub parent_id: Option<String>,
    /// Absolute path within the drive, derived from the parent reference.
    pub path: String,
    pub kind: NodeKind,
    pub size: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    /// Content hash if the listing already carried it; saves a detail call
    /// from having to discover it again.
    pub hash_hint: Option<String>,
}

impl Node {
    pub fn from_item(item: &DriveItem) -> Self {
        let kind = if item.is_container() {
            NodeKind::Container
        } else {
            NodeKind::Leaf
        };
        let parent = item.parent_reference.as_ref();

        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            parent_id: parent.and_then(|p| p.id.clone()),
            path: item_path(parent.and_then(|p| p.path.as_deref()), &item.name),
            kind,
            size: item.size.unwrap_or(0),
            created_at: item.created_date_time,
            modified_at: item.last_modified_date_time,
            hash_hint: item.listed_hash().map(str::to_owned),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }
}
