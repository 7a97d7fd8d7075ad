use crate::common::Fixture;
use hyperdrive::descriptor::OpenFlags;
use hyperdrive::stat::{Owner, Stat};

#[tokio::test]
async fn write_file_then_read_file_returns_the_same_bytes() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a.txt", b"hello").await.unwrap();

    assert_eq!(fixture.drive.read_file("/a.txt").await.unwrap(), b"hello");
    match fixture.drive.stat("/a.txt").await.unwrap() {
        Stat::File(f) => assert_eq!(f.size, 5),
        other => panic!("expected a file stat, got {other:?}"),
    }
}

#[tokio::test]
async fn overwriting_a_file_replaces_its_contents_with_a_fresh_append() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a.txt", b"ABCDE").await.unwrap();
    fixture.drive.write_file("/a.txt", b"XY").await.unwrap();

    assert_eq!(fixture.drive.read_file("/a.txt").await.unwrap(), b"XY");
}

#[tokio::test]
async fn stat_byte_range_matches_read_file_exactly() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a.txt", b"quantified invariant").await.unwrap();

    let stat = match fixture.drive.stat("/a.txt").await.unwrap() {
        Stat::File(f) => f,
        other => panic!("expected a file stat, got {other:?}"),
    };

    let range = fixture
        .drive
        .create_read_stream("/a.txt", Default::default())
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(range.len() as u64, stat.size);
    assert_eq!(range, b"quantified invariant");
}

#[tokio::test]
async fn descriptor_write_then_read_roundtrips_through_open_close() {
    let fixture = Fixture::new().await;
    let fd = fixture.drive.open("/b.txt", OpenFlags::write_only(true, false)).await.unwrap();
    fixture.drive.write(fd, b"descriptor").await.unwrap();
    fixture.drive.close(fd).await.unwrap();

    let read_fd = fixture.drive.open("/b.txt", OpenFlags::read_only()).await.unwrap();
    let data = fixture.drive.read(read_fd, 64, Some(0)).await.unwrap();
    fixture.drive.close(read_fd).await.unwrap();

    assert_eq!(data, b"descriptor");
}

#[tokio::test]
async fn write_file_preserves_owner_across_an_overwrite() {
    let fixture = Fixture::new().await;
    fixture.drive.create("/owned.txt").await.unwrap();
    fixture
        .drive
        .create_write_stream("/owned.txt", Owner { mode: 0o644, uid: 42, gid: 7 })
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();

    fixture.drive.write_file("/owned.txt", b"second pass").await.unwrap();

    match fixture.drive.stat("/owned.txt").await.unwrap() {
        Stat::File(f) => assert_eq!(f.owner, Owner { mode: 0o644, uid: 42, gid: 7 }),
        other => panic!("expected a file stat, got {other:?}"),
    }
}
