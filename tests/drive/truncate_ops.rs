use crate::common::Fixture;
use hyperdrive::stat::Stat;
use hyperdrive::trie::Trie;

#[tokio::test]
async fn truncate_shrinks_then_grows_with_zero_fill() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a", b"0123456789").await.unwrap();

    fixture.drive.truncate("/a", 4).await.unwrap();
    assert_eq!(fixture.drive.read_file("/a").await.unwrap(), b"0123");

    fixture.drive.truncate("/a", 6).await.unwrap();
    assert_eq!(fixture.drive.read_file("/a").await.unwrap(), b"0123\0\0");
}

#[tokio::test]
async fn truncate_to_the_current_size_is_a_noop() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a", b"same").await.unwrap();
    let before = fixture.drive.owning_trie("/a").version();

    fixture.drive.truncate("/a", 4).await.unwrap();

    assert_eq!(fixture.drive.read_file("/a").await.unwrap(), b"same");
    assert_eq!(fixture.drive.owning_trie("/a").version(), before);
}

#[tokio::test]
async fn truncate_on_a_missing_path_creates_an_empty_file_first() {
    let fixture = Fixture::new().await;
    fixture.drive.truncate("/fresh", 3).await.unwrap();

    match fixture.drive.stat("/fresh").await.unwrap() {
        Stat::File(f) => assert_eq!(f.size, 3),
        other => panic!("expected a file stat, got {other:?}"),
    }
    assert_eq!(fixture.drive.read_file("/fresh").await.unwrap(), b"\0\0\0");
}

#[tokio::test]
async fn post_commit_size_matches_written_byte_and_block_deltas() {
    let fixture = Fixture::new().await;

    fixture.drive.write_file("/x", b"abcdefgh").await.unwrap();
    match fixture.drive.stat("/x").await.unwrap() {
        Stat::File(f) => {
            assert_eq!(f.size, 8);
            assert_eq!(f.blocks, 1);
        }
        other => panic!("expected a file stat, got {other:?}"),
    }
}
