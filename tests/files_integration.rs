//! Integration tests for file operations.

mod common;

use common::TestPortal;
use docportal::{CreateFolder, ErrorClass, Role, SortKey, SortOrder, TreeFilter};

/// Uploads record size, hash and MIME type and can be read back.
#[tokio::test]
async fn test_upload_records_metadata() {
    let portal = TestPortal::new().await;
    let basic = portal.create_user("basic1", Role::Basic).await;
    let docs = portal
        .admin_folder(CreateFolder::new("Docs").with_members([basic.id]))
        .await;

    let entry = portal
        .engine()
        .upload_file(docs.id, "minutes.html", b"<p>ok</p>", &basic)
        .await
        .unwrap();
    assert_eq!(entry.size, 9);
    assert_eq!(entry.mime.as_deref(), Some("text/html"));
    assert_eq!(entry.hash.as_ref().map(|h| h.len()), Some(64));
    assert_eq!(entry.created_by, basic.id);

    let read = portal.engine().read_file(entry.id, &basic).await.unwrap();
    assert_eq!(read.content, b"<p>ok</p>");
}

/// File names are sanitized into the stored path but kept for display.
#[tokio::test]
async fn test_upload_sanitizes_path() {
    let portal = TestPortal::new().await;
    let docs = portal.admin_folder(CreateFolder::new("Docs")).await;

    let entry = portal
        .engine()
        .upload_file(docs.id, "Q1: plan?.txt", b"x", portal.admin())
        .await
        .unwrap();
    assert_eq!(entry.name, "Q1: plan?.txt");
    assert_eq!(entry.storage_path, docs.full_path.join("Q1_ plan_.txt"));
    assert!(entry.storage_path.is_file());
}

/// Files move and copy between folders the user belongs to.
#[tokio::test]
async fn test_move_and_copy_between_folders() {
    let portal = TestPortal::new().await;
    let inbox = portal.admin_folder(CreateFolder::new("Inbox")).await;
    let archive = portal.admin_folder(CreateFolder::new("Archive")).await;

    let entry = portal
        .engine()
        .upload_file(inbox.id, "invoice.pdf", b"%PDF", portal.admin())
        .await
        .unwrap();
    portal
        .engine()
        .upload_file(archive.id, "invoice.pdf", b"%PDF-old", portal.admin())
        .await
        .unwrap();

    let err = portal
        .engine()
        .move_file(entry.id, archive.id, portal.admin())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert!(entry.storage_path.is_file());

    let copy = portal
        .engine()
        .copy_file(entry.id, archive.id, portal.admin())
        .await
        .unwrap();
    assert_eq!(copy.name, "invoice (2).pdf");
    assert_eq!(std::fs::read(&copy.storage_path).unwrap(), b"%PDF");

    let files = portal.engine().list_files(archive.id, portal.admin()).await.unwrap();
    assert_eq!(files.len(), 2);
}

/// The tree view filters by extension and sorts by size.
#[tokio::test]
async fn test_folder_tree_filters() {
    let portal = TestPortal::new().await;
    let root = portal.admin_folder(CreateFolder::new("Media")).await;
    let photos = portal
        .admin_folder(CreateFolder::new("Photos").with_parent(root.id))
        .await;
    for (name, size) in [("a.jpg", 30usize), ("b.jpg", 10), ("c.png", 20)] {
        portal
            .engine()
            .upload_file(photos.id, name, &vec![0u8; size], portal.admin())
            .await
            .unwrap();
    }

    let filter = TreeFilter::new()
        .with_extension("jpg")
        .sorted_by(SortKey::Size, SortOrder::Asc);
    let tree = portal
        .engine()
        .folder_tree(root.id, portal.admin(), &filter)
        .await
        .unwrap();

    let photos = &tree.children[0];
    let names: Vec<&str> = photos.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["b.jpg", "a.jpg"]);
    assert_eq!(tree.total_size, 40);
}
