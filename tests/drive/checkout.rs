use crate::common::Fixture;
use hyperdrive::trie::Trie;

#[tokio::test]
async fn checkout_is_frozen_at_its_version_while_the_live_drive_advances() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a.txt", b"v1").await.unwrap();
    let v1 = fixture.drive.owning_trie("/").version();

    fixture.drive.write_file("/a.txt", b"v2").await.unwrap();
    fixture.drive.write_file("/b.txt", b"only in v2+").await.unwrap();

    let checkout = fixture.drive.checkout(v1).await.unwrap();
    assert_eq!(checkout.read_file("/a.txt").await.unwrap(), b"v1");
    assert!(checkout.read_file("/b.txt").await.is_err());

    assert_eq!(fixture.drive.read_file("/a.txt").await.unwrap(), b"v2");
    assert_eq!(fixture.drive.read_file("/b.txt").await.unwrap(), b"only in v2+");
}

#[tokio::test]
async fn writes_on_the_live_drive_after_checkout_do_not_affect_it() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a.txt", b"frozen").await.unwrap();
    let version = fixture.drive.owning_trie("/").version();
    let checkout = fixture.drive.checkout(version).await.unwrap();

    fixture.drive.write_file("/a.txt", b"mutated after checkout").await.unwrap();

    assert_eq!(checkout.read_file("/a.txt").await.unwrap(), b"frozen");
}

#[tokio::test]
async fn a_checkout_rejects_mutating_operations() {
    let fixture = Fixture::new().await;
    fixture.drive.write_file("/a.txt", b"v1").await.unwrap();
    let version = fixture.drive.owning_trie("/").version();
    let checkout = fixture.drive.checkout(version).await.unwrap();

    assert!(checkout.write_file("/a.txt", b"nope").await.is_err());
    assert!(checkout.mkdir("/d").await.is_err());
}
