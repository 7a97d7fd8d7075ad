use crate::common::Fixture;
use hyperdrive::stat::Stat;
use hyperdrive::Error;

#[tokio::test]
async fn stat_follows_exactly_one_level_of_symlink_lstat_follows_none() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a.txt", b"hello").await.unwrap();
    fixture.drive.symlink("/a.txt", "/l").await.unwrap();

    match fixture.drive.lstat("/l").await.unwrap() {
        Stat::Symlink(s) => assert_eq!(s.linkname, "/a.txt"),
        other => panic!("expected a symlink stat, got {other:?}"),
    }

    let target_size = match fixture.drive.stat("/a.txt").await.unwrap() {
        Stat::File(f) => f.size,
        other => panic!("expected a file stat, got {other:?}"),
    };
    match fixture.drive.stat("/l").await.unwrap() {
        Stat::File(f) => assert_eq!(f.size, target_size),
        other => panic!("expected stat(\"/l\") to follow through to a file stat, got {other:?}"),
    }
}

#[tokio::test]
async fn symlink_fails_path_already_exists_if_link_name_already_resolves() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a.txt", b"hello").await.unwrap();
    fixture.drive.symlink("/a.txt", "/l").await.unwrap();

    assert_eq!(fixture.drive.symlink("/a.txt", "/l").await.unwrap_err(), Error::PathAlreadyExists);
}

#[tokio::test]
async fn a_chain_is_not_followed_past_one_level_by_stat() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a.txt", b"hello").await.unwrap();
    fixture.drive.symlink("/a.txt", "/l1").await.unwrap();
    fixture.drive.symlink("/l1", "/l2").await.unwrap();

    // stat("/l2") follows exactly one level: it resolves to the symlink
    // stat at "/l1", not through to the file at "/a.txt".
    match fixture.drive.stat("/l2").await.unwrap() {
        Stat::Symlink(s) => assert_eq!(s.linkname, "/l1"),
        other => panic!("expected stat(\"/l2\") to stop after one hop, got {other:?}"),
    }
}
