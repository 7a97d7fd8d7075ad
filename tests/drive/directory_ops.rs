use crate::common::Fixture;
use hyperdrive::Error;

#[tokio::test]
async fn mkdir_the_same_path_twice_fails_on_the_second_call() {
    let fixture = Fixture::new().await;
    fixture.drive.mkdir("/d").await.unwrap();
    assert_eq!(fixture.drive.mkdir("/d").await.unwrap_err(), Error::PathAlreadyExists);
}

#[tokio::test]
async fn rmdir_fails_with_directory_not_empty_iff_readdir_is_non_empty() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/d/f", b"x").await.unwrap();

    assert!(!fixture.drive.read_dir("/d").await.unwrap().is_empty());
    assert_eq!(fixture.drive.rmdir("/d").await.unwrap_err(), Error::DirectoryNotEmpty);

    fixture.drive.unlink("/d/f").await.unwrap();
    assert!(fixture.drive.read_dir("/d").await.unwrap().is_empty());
    fixture.drive.rmdir("/d").await.unwrap();
}

#[tokio::test]
async fn readdir_projects_nested_entries_to_their_first_segment() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a/one.txt", b"1").await.unwrap();
    fixture.drive.write_file("/a/b/two.txt", b"2").await.unwrap();
    fixture.drive.write_file("/c.txt", b"3").await.unwrap();

    // No dedup (§9): "/a" is the first segment of both "/a/one.txt" and
    // "/a/b/two.txt", so it is projected twice.
    let mut root = fixture.drive.read_dir("/").await.unwrap();
    root.sort();
    assert_eq!(root, vec!["a".to_string(), "a".to_string(), "c.txt".to_string()]);

    let mut under_a = fixture.drive.read_dir("/a").await.unwrap();
    under_a.sort();
    assert_eq!(under_a, vec!["b".to_string(), "one.txt".to_string()]);
}

#[tokio::test]
async fn unlink_a_missing_path_fails_file_not_found() {
    let fixture = Fixture::new().await;
    assert_eq!(fixture.drive.unlink("/nope").await.unwrap_err(), Error::FileNotFound);
}

#[tokio::test]
async fn stat_on_a_directory_with_children_synthesizes_a_directory_stat() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/dir/file.txt", b"x").await.unwrap();
    assert!(matches!(fixture.drive.stat("/dir").await.unwrap(), hyperdrive::stat::Stat::Directory(_)));
}

#[tokio::test]
async fn stat_on_a_path_with_no_children_and_no_entry_fails_file_not_found() {
    let fixture = Fixture::new().await;
    assert_eq!(fixture.drive.stat("/ghost").await.unwrap_err(), Error::FileNotFound);
}
