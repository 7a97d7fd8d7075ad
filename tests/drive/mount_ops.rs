use std::sync::Arc;

use crate::common::Fixture;
use hyperdrive::drive::MountOptions;
use hyperdrive::feed::{Feed, FeedFactory};
use hyperdrive::stat::{FileStat, Owner, Stat, Time};
use hyperdrive::trie::memory::MemoryTrie;
use hyperdrive::trie::Trie;
use hyperdrive::KeyPair;

#[tokio::test]
async fn trie_mount_resolves_stat_and_readdir_through_the_foreign_trie() {
    let fixture = Fixture::new().await;
    let foreign: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
    foreign
        .put(
            "/x.txt",
            hyperdrive::stat::encode(&Stat::File(FileStat {
                owner: Owner::default(),
                size: 0,
                blocks: 0,
                offset: 0,
                byte_offset: 0,
                mtime: Time::default(),
                ctime: Time::default(),
                mount: None,
            })),
        )
        .await
        .unwrap();

    fixture
        .drive
        .mount("/mnt", hyperdrive::PublicKey([1; 32]), MountOptions { trie: Some(foreign), ..Default::default() })
        .await
        .unwrap();

    assert!(matches!(fixture.drive.lstat("/mnt/x.txt").await.unwrap(), Stat::File(_)));
    assert_eq!(fixture.drive.read_dir("/mnt").await.unwrap(), vec!["x.txt".to_string()]);
}

#[tokio::test]
async fn hypercore_mount_streams_bytes_from_the_foreign_content_feed() {
    let fixture = Fixture::new().await;

    let foreign_keypair = KeyPair::generate();
    let foreign_feed = fixture.feeds.open(&foreign_keypair).await.unwrap();
    foreign_feed.append(b"raw content feed bytes".to_vec()).await.unwrap();

    fixture
        .drive
        .mount("/blob", foreign_keypair.public, MountOptions { hypercore: true, ..Default::default() })
        .await
        .unwrap();

    let stat = match fixture.drive.stat("/blob").await.unwrap() {
        Stat::File(f) => f,
        other => panic!("expected a file stat, got {other:?}"),
    };
    assert_eq!(stat.size, foreign_feed.byte_length());
    assert_eq!(stat.blocks, foreign_feed.length());
    assert!(stat.mount.as_ref().unwrap().hypercore);

    assert_eq!(fixture.drive.read_file("/blob").await.unwrap(), b"raw content feed bytes");
}
