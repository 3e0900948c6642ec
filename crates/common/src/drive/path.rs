//! Path derivation from provider parent references.

/// Root prefix the provider puts in front of every parent path.
const ROOT_PREFIX: &str = "/drive/root:";

/// Build the absolute drive path of an item from its parent reference path.
///
/// Children of the drive root come back with a parent path of exactly
/// `/drive/root:`, which maps to `/{name}`. Deeper items carry
/// `/drive/root:/sub/dir`. An absent parent reference degrades to the bare
/// name, matching what the provider reports for synthetic entries.
pub fn item_path(parent_path: Option<&str>, name: &str) -> String {
    match parent_path {
        Some(parent) => {
            let trimmed = parent.replacen(ROOT_PREFIX, "", 1);
            if trimmed.is_empty() {
                format!("/{name}")
            } else {
                format!("{}/{name}", trimmed.trim_end_matches('/'))
            }
        }
        None => name.to_owned(),
    }
}
