//! Two-feed bring-up and lazy content-state acquisition (§4.1, §4.2,
//! §6 "Content-key derivation").

use std::sync::Arc;

use crate::content::ContentState;
use crate::error::{Error, Result};
use crate::feed::{Feed, FeedFactory};
use crate::keys::{derive_content_keypair, KeyPair, PublicKey, SecretKey};
use crate::trie::{Trie, TrieHeaderExt};

/// Outcome of drive bring-up (§4.1 steps 3-5): either the root
/// `ContentState` was built right away, or its acquisition is deferred
/// to the first stat that actually references it.
pub enum ContentPlan {
    Eager(Arc<ContentState>),
    Deferred,
}

/// Run §4.1 steps 1-5 against an already-open metadata feed and trie.
///
/// Step 2 (installing a caller-supplied checkout + content state) is
/// handled by [`crate::drive::Drive::checkout`] directly rather than
/// here, since it never touches the feed/trie at all.
pub async fn bring_up(
    metadata_keypair: &KeyPair,
    metadata_feed: &Arc<dyn Feed>,
    trie: &Arc<dyn Trie>,
    feeds: &Arc<dyn FeedFactory>,
) -> Result<ContentPlan> {
    metadata_feed.wait_for_length(0).await?;

    if metadata_feed.is_writable() && metadata_feed.length() == 0 {
        tracing::info!(public_key = ?metadata_keypair.public, "initializing fresh drive");
        let secret = metadata_keypair
            .secret
            .as_ref()
            .ok_or_else(|| Error::BackendError("writable metadata feed has no secret key".into()))?;
        let content_keypair = derive_content_keypair(secret);
        trie.set_header_metadata(content_keypair.public.0.to_vec()).await?;
        let feed = feeds.open(&content_keypair).await?;
        return Ok(ContentPlan::Eager(Arc::new(ContentState::new(feed))));
    }

    if metadata_feed.is_writable() {
        tracing::info!(public_key = ?metadata_keypair.public, "restoring writable drive");
        let content = acquire_content_state(trie, metadata_keypair.secret.as_ref(), feeds).await?;
        return Ok(ContentPlan::Eager(content));
    }

    tracing::info!(public_key = ?metadata_keypair.public, "opening read-only drive, content acquisition deferred");
    Ok(ContentPlan::Deferred)
}

/// §4.2 `_getContent`: read `trie`'s header for the content feed's public
/// key and acquire a handle to it, writable iff `metadata_secret` is
/// supplied (the content keypair always re-derives deterministically
/// from it, §6).
///
/// The real collaborator's "await one update if read-only" step exists
/// to cover a freshly connected replica that has not yet pulled block 0
/// over the wire; [`crate::feed::memory::MemoryFeedFactory`] hands out
/// handles that already share live state in-process, so there is nothing
/// to wait for here and doing so would hang on a legitimately empty
/// content feed.
pub async fn acquire_content_state(
    trie: &Arc<dyn Trie>,
    metadata_secret: Option<&SecretKey>,
    feeds: &Arc<dyn FeedFactory>,
) -> Result<Arc<ContentState>> {
    let header = trie
        .header_metadata()
        .await?
        .ok_or_else(|| Error::BackendError("trie has no header metadata".into()))?;
    let public = public_key_from_bytes(&header)?;

    let content_keypair = match metadata_secret {
        Some(secret) => derive_content_keypair(secret),
        None => KeyPair { public, secret: None },
    };

    let feed = feeds.open(&content_keypair).await?;
    Ok(Arc::new(ContentState::new(feed)))
}

fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::DecodeError(format!("trie header is {} bytes, expected 32", bytes.len())))?;
    Ok(PublicKey(array))
}
