/**
 * Drive data model
 * ================
 * Typed views over the provider's drive hierarchy:
 *  - `DriveItem`: one raw entry of a children listing or a per-item
 *    detail response, field names matching the OData wire format
 *  - `Node`: an immutable, classified entry (container or leaf) as
 *    discovered by the crawler
 *  - `FileDetail`: a leaf plus whatever enrichment the detail phase
 *    managed to collect; missing hash/label is a valid terminal state
 */
mod detail;
mod item;
mod path;

pub use detail::FileDetail;
pub use item::{
    DriveItem, FileFacet, FolderFacet, HashesFacet, LabelFacet, Node, NodeKind, ParentReference,
};
pub use path::item_path;
