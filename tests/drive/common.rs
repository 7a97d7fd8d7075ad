use std::sync::Arc;

use hyperdrive::feed::memory::MemoryFeedFactory;
use hyperdrive::feed::FeedFactory;
use hyperdrive::trie::memory::MemoryTrie;
use hyperdrive::trie::Trie;
use hyperdrive::{Drive, KeyPair};

pub struct Fixture {
    pub feeds: Arc<dyn FeedFactory>,
    pub drive: Arc<Drive>,
}

impl Fixture {
    pub async fn new() -> Self {
        let feeds: Arc<dyn FeedFactory> = Arc::new(MemoryFeedFactory::new());
        let trie: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        let drive = Drive::open(KeyPair::generate(), trie, feeds.clone()).await.expect("drive opens");
        Self { feeds, drive }
    }
}
