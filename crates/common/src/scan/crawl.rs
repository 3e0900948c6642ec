use std::collections::{HashSet, VecDeque};

use serde::Deserialize;
use tokio::sync::watch;

use crate::drive::{DriveItem, Node};
use crate::graph::client::{ApiClient, ApiError};
use crate::graph::endpoints::Endpoints;
use crate::progress::{ProgressEvent, ProgressSender};

/// Synthetic parent key for edges hanging off the drive root, which has no
/// item id of its own in the listing.
const ROOT_PARENT: &str = "root";

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The provider listed the same child under the same parent twice. The
    /// hierarchy is supposed to be a tree; rather than looping forever on a
    /// cyclic or repeating feed, the whole traversal is abandoned.
    #[error("hierarchy is not a tree: item {child_id} listed under {parent_id} more than once")]
    Structural { parent_id: String, child_id: String },
    #[error("traversal cancelled")]
    Cancelled,
}

/// Flat results of a full traversal. Order within each collection is
/// discovery order (breadth-first).
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub containers: Vec<Node>,
    pub leaves: Vec<Node>,
}

/// One page of a children listing.
#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Breadth-first enumeration of the container hierarchy.
///
/// Traversal is deliberately sequential: the work queue is built from prior
/// pages, and any API failure here is fatal for the run - a partially
/// enumerated tree is never returned.
pub(crate) struct Crawler<'a> {
    client: &'a ApiClient,
    endpoints: &'a Endpoints,
    drive_id: &'a str,
    page_size: u32,
    progress: &'a ProgressSender,
    shutdown: Option<&'a watch::Receiver<bool>>,
}

impl<'a> Crawler<'a> {
    pub fn new(
        client: &'a ApiClient,
        endpoints: &'a Endpoints,
        drive_id: &'a str,
        page_size: u32,
        progress: &'a ProgressSender,
        shutdown: Option<&'a watch::Receiver<bool>>,
    ) -> Self {
        Self {
            client,
            endpoints,
            drive_id,
            page_size,
            progress,
            shutdown,
        }
    }

    pub async fn run(&self) -> Result<CrawlOutcome, CrawlError> {
        if self.stopped() {
            return Err(CrawlError::Cancelled);
        }

        let mut outcome = CrawlOutcome::default();
        let mut queue: VecDeque<Node> = VecDeque::new();
        let mut seen_edges: HashSet<(String, String)> = HashSet::new();

        let root_items = self
            .list_all_pages(self.endpoints.root_children(self.drive_id, self.page_size))
            .await?;
        self.ingest(ROOT_PARENT, root_items, &mut outcome, &mut queue, &mut seen_edges)?;

        while let Some(container) = queue.pop_front() {
            if self.stopped() {
                return Err(CrawlError::Cancelled);
            }
            tracing::debug!(container = %container.id, path = %container.path, "listing children");
            let items = self
                .list_all_pages(self.endpoints.item_children(
                    self.drive_id,
                    &container.id,
                    self.page_size,
                ))
                .await?;
            self.ingest(&container.id, items, &mut outcome, &mut queue, &mut seen_edges)?;
        }

        tracing::info!(
            containers = outcome.containers.len(),
            leaves = outcome.leaves.len(),
            "hierarchy enumerated"
        );
        Ok(outcome)
    }

    /// Follow every continuation cursor; a listing is only consumed once the
    /// last page came back.
    async fn list_all_pages(&self, first_url: String) -> Result<Vec<DriveItem>, CrawlError> {
        let mut items = Vec::new();
        let mut next = Some(first_url);
        while let Some(url) = next {
            let page: ListingPage = self.client.get(&url).await?.decode()?;
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }

    /// Classify one listing's items, extending the queue with containers and
    /// the result set with leaves.
    fn ingest(
        &self,
        parent_key: &str,
        items: Vec<DriveItem>,
        outcome: &mut CrawlOutcome,
        queue: &mut VecDeque<Node>,
        seen_edges: &mut HashSet<(String, String)>,
    ) -> Result<(), CrawlError> {
        let mut containers = 0u64;
        let mut leaves = 0u64;

        for item in &items {
            if !seen_edges.insert((parent_key.to_owned(), item.id.clone())) {
                return Err(CrawlError::Structural {
                    parent_id: parent_key.to_owned(),
                    child_id: item.id.clone(),
                });
            }
            let node = Node::from_item(item);
            if node.is_leaf() {
                leaves += 1;
                outcome.leaves.push(node);
            } else {
                containers += 1;
                outcome.containers.push(node.clone());
                queue.push_back(node);
            }
        }

        if containers > 0 {
            self.progress.emit(ProgressEvent::AddContainers(containers));
        }
        if leaves > 0 {
            self.progress.emit(ProgressEvent::AddLeaves(leaves));
        }
        Ok(())
    }

    fn stopped(&self) -> bool {
        self.shutdown.map(|rx| *rx.borrow()).unwrap_or(false)
    }
}
