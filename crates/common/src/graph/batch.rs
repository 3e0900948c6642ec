//! Wire types for the grouped `$batch` endpoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::drive::Node;

use super::endpoints::Endpoints;

/// Provider-imposed ceiling on sub-requests per grouped call.
pub const BATCH_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest {
    pub requests: Vec<BatchSubRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSubRequest {
    pub id: String,
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub responses: Vec<BatchSubResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchSubResponse {
    #[serde(default)]
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl BatchRequest {
    /// One detail sub-request per leaf, ids assigned by position within the
    /// group so the response can be demultiplexed without a lookup table.
    pub fn for_details(drive_id: &str, group: &[Node]) -> Self {
        let requests = group
            .iter()
            .enumerate()
            .map(|(index, leaf)| BatchSubRequest {
                id: index.to_string(),
                method: "GET".to_owned(),
                url: Endpoints::item_detail_relative(drive_id, &leaf.id),
            })
            .collect();
        Self { requests }
    }
}

impl BatchResponse {
    pub fn into_map(self) -> HashMap<String, BatchSubResponse> {
        self.responses
            .into_iter()
            .map(|sub| (sub.id.clone(), sub))
            .collect()
    }
}

impl BatchSubResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
