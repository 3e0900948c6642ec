//! URL construction for the provider's listing, detail and batch endpoints.

pub const DEFAULT_LOGIN_BASE: &str = "https://login.microsoftonline.com";
pub const API_BASE_V1: &str = "https://graph.microsoft.com/v1.0";
pub const API_BASE_BETA: &str = "https://graph.microsoft.com/beta";

/// Facets requested on every listing page. Asking for `file` up front lets
/// the detail phase skip hash discovery when the listing already carried it.
const LISTING_SELECT: &str =
    "id,name,size,createdDateTime,lastModifiedDateTime,parentReference,folder,file";

/// Facets requested by the per-item enrichment call.
const DETAIL_SELECT: &str = "file,sensitivityLabel";

/// Token endpoint for a tenant's client-credential grant.
pub fn token_url(tenant_id: &str) -> String {
    format!("{DEFAULT_LOGIN_BASE}/{tenant_id}/oauth2/v2.0/token")
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    api_base: String,
}

impl Endpoints {
    pub fn new(use_beta: bool) -> Self {
        Self {
            api_base: if use_beta { API_BASE_BETA } else { API_BASE_V1 }.to_owned(),
        }
    }

    /// Point at a non-default API base (sovereign clouds, test servers).
    pub fn with_base(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into();
        Self {
            api_base: api_base.trim_end_matches('/').to_owned(),
        }
    }

    pub fn root_children(&self, drive_id: &str, page_size: u32) -> String {
        format!(
            "{}/drives/{drive_id}/root/children?$select={LISTING_SELECT}&$top={page_size}",
            self.api_base
        )
    }

    pub fn item_children(&self, drive_id: &str, item_id: &str, page_size: u32) -> String {
        format!(
            "{}/drives/{drive_id}/items/{item_id}/children?$select={LISTING_SELECT}&$top={page_size}",
            self.api_base
        )
    }

    pub fn item_detail(&self, drive_id: &str, item_id: &str) -> String {
        format!(
            "{}/drives/{drive_id}/items/{item_id}?$select={DETAIL_SELECT}",
            self.api_base
        )
    }

    /// Relative form used inside `$batch` sub-requests.
    pub fn item_detail_relative(drive_id: &str, item_id: &str) -> String {
        format!("/drives/{drive_id}/items/{item_id}?$select={DETAIL_SELECT}")
    }

    pub fn batch(&self) -> String {
        format!("{}/$batch", self.api_base)
    }
}
