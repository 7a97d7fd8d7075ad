//! Mount resolution: projecting a path through possibly-nested trie
//! mounts to the trie that actually owns it (§4.5 step 2, §4.12).
//!
//! Only trie-to-trie mounts are resolved here. A `hypercore` mount (§3
//! "Mount" variant, `hypercore: true`) roots a raw content feed rather
//! than another trie, so it is a leaf as far as this resolver is
//! concerned; [`crate::drive::Drive`] checks the final stat's
//! [`crate::stat::Mount::hypercore`] flag itself before deciding whether
//! to keep resolving or to treat the path as feed-backed.

use std::sync::Arc;

use crate::path;
use crate::trie::Trie;

/// The trie that actually owns a path, and that path projected relative
/// to that trie's own root.
pub struct Resolved {
    pub trie: Arc<dyn Trie>,
    pub path: String,
}

/// Walk `path` through `root`'s mount table, descending into foreign
/// tries as deep as the mount graph goes (§4.12: "resolution recurses
/// across multiple trie mounts").
///
/// A path that crosses no mount boundary resolves to `root` itself
/// unchanged. [`Trie::mounts`] is required to return entries most
/// specific (longest path) first, which is what makes a single linear
/// scan per hop correct.
pub fn resolve(root: Arc<dyn Trie>, target: &str) -> Resolved {
    let mut trie = root;
    let mut current = path::normalize(target);

    loop {
        let mounts = trie.mounts();
        let hop = mounts.iter().find(|(mount_path, _)| {
            current == *mount_path || current.starts_with(&path::child_prefix(mount_path))
        });

        match hop {
            Some((mount_path, foreign)) => {
                let rest = current.strip_prefix(mount_path.as_str()).unwrap_or("");
                trie = foreign.clone();
                current = if rest.is_empty() { "/".to_string() } else { path::normalize(rest) };
            }
            None => break,
        }
    }

    Resolved { trie, path: current }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::memory::MemoryTrie;

    #[tokio::test]
    async fn resolves_through_a_single_mount() {
        let root: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        let foreign: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        root.attach_mount("/mnt".to_string(), foreign.clone()).await;

        let resolved = resolve(root.clone(), "/mnt/a/b");
        assert!(Arc::ptr_eq(&resolved.trie, &foreign));
        assert_eq!(resolved.path, "/a/b");
    }

    #[tokio::test]
    async fn unrelated_path_resolves_to_root() {
        let root: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        let foreign: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        root.attach_mount("/mnt".to_string(), foreign).await;

        let resolved = resolve(root.clone(), "/other/path");
        assert!(Arc::ptr_eq(&resolved.trie, &root));
        assert_eq!(resolved.path, "/other/path");
    }

    #[tokio::test]
    async fn resolves_through_nested_mounts() {
        let root: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        let middle: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        let inner: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        middle.attach_mount("/b".to_string(), inner.clone()).await;
        root.attach_mount("/a".to_string(), middle.clone()).await;

        let resolved = resolve(root, "/a/b/c.txt");
        assert!(Arc::ptr_eq(&resolved.trie, &inner));
        assert_eq!(resolved.path, "/c.txt");
    }

    #[tokio::test]
    async fn mount_root_itself_resolves_to_foreign_root() {
        let root: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        let foreign: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        root.attach_mount("/mnt".to_string(), foreign.clone()).await;

        let resolved = resolve(root, "/mnt");
        assert!(Arc::ptr_eq(&resolved.trie, &foreign));
        assert_eq!(resolved.path, "/");
    }
}
