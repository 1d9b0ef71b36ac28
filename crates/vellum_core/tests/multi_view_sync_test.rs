//! End-to-end sync scenario across several editor views.
//!
//! Exercises the whole authority surface the way the app uses it: one
//! shared document, one view long-polling, one view pushing, and one view
//! pushing from a stale base and recovering by re-fetch + rebase.

use std::path::Path;
use std::sync::Arc;

use vellum_core::fs::{InMemoryFileSystem, SyncToAsyncFs};
use vellum_core::{Authority, AuthorityConfig, TextEdit};

fn shared_authority(files: &[(&str, &str)]) -> Arc<Authority<SyncToAsyncFs<InMemoryFileSystem>>> {
    let mut fs = InMemoryFileSystem::new();
    for (path, content) in files {
        fs = fs.with_file(path, content);
    }
    Arc::new(Authority::new(
        SyncToAsyncFs::new(fs),
        AuthorityConfig::default(),
    ))
}

#[tokio::test]
async fn test_pull_push_conflict_rebase_cycle() {
    let authority = shared_authority(&[("/draft.md", "A")]);
    let doc = Path::new("/draft.md");

    let view_x = authority.connect();
    let view_y = authority.connect();
    let view_z = authority.connect();

    // Bring the document to version 3 so the scenario starts mid-session.
    let snap = view_y.get_document(doc).await.unwrap();
    assert_eq!(snap.version, 1);
    view_y
        .push_updates(doc, 2, vec![TextEdit::insert(1, "1")])
        .unwrap()
        .expect("accepted");
    view_y
        .push_updates(doc, 3, vec![TextEdit::delete(1, 2)])
        .unwrap()
        .expect("accepted");
    let snap = view_x.get_document(doc).await.unwrap();
    assert_eq!((snap.version, snap.content.as_str()), (3, "A"));
    let z_snap = view_z.get_document(doc).await.unwrap();
    assert_eq!(z_snap.version, 3);

    // X long-polls at the current version; nothing is newer, so it parks.
    let x_authority = Arc::clone(&authority);
    let x_view = view_x.view();
    let x_pull = tokio::spawn(async move {
        x_authority.pull_updates(x_view, Path::new("/draft.md"), 3).await
    });
    tokio::task::yield_now().await;

    // Y pushes version 4; X's parked pull resolves with exactly that update.
    let accepted = view_y
        .push_updates(doc, 4, vec![TextEdit::insert(1, "B")])
        .unwrap();
    assert_eq!(accepted, Some(4));

    let updates = x_pull.await.unwrap().unwrap().expect("woken with updates");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].version, 4);
    let x_content = updates[0].apply_to(&snap.content).unwrap();
    assert_eq!(x_content, "AB");

    // Z, still on version 3, pushes its own version 4: rejected, nothing
    // about the document changes.
    let rejected = view_z
        .push_updates(doc, 4, vec![TextEdit::insert(0, "Z")])
        .unwrap();
    assert_eq!(rejected, None);
    assert_eq!(authority.get_document(doc).await.unwrap().version, 4);

    // Z recovers: pull what it missed, rebase, push as version 5.
    let missed = view_z
        .pull_updates(doc, z_snap.version)
        .await
        .unwrap()
        .expect("updates since 3");
    let mut z_content = z_snap.content.clone();
    for update in &missed {
        z_content = update.apply_to(&z_content).unwrap();
    }
    assert_eq!(z_content, "AB");

    let accepted = view_z
        .push_updates(doc, 5, vec![TextEdit::insert(0, "Z")])
        .unwrap();
    assert_eq!(accepted, Some(5));

    let final_snap = authority.get_document(doc).await.unwrap();
    assert_eq!((final_snap.version, final_snap.content.as_str()), (5, "ZAB"));
}

#[tokio::test]
async fn test_save_remote_change_and_status_flow() {
    let fs = InMemoryFileSystem::new().with_file("/draft.md", "draft");
    let authority = Arc::new(Authority::new(
        SyncToAsyncFs::new(fs.clone()),
        AuthorityConfig::default(),
    ));
    let doc = Path::new("/draft.md");
    let view = authority.connect();

    view.get_document(doc).await.unwrap();
    assert!(view.modification_status().is_empty());

    view.push_updates(doc, 2, vec![TextEdit::insert(5, "!")])
        .unwrap()
        .expect("accepted");
    assert_eq!(view.modification_status().len(), 1);

    // The save pipeline persists; the modification set clears.
    authority.mark_saved(doc).unwrap();
    assert!(view.modification_status().is_empty());

    // The watcher reports an external rewrite; a parked pull converges on
    // the new content without re-fetching.
    let pull_authority = Arc::clone(&authority);
    let pull_view = view.view();
    let pull = tokio::spawn(async move {
        pull_authority.pull_updates(pull_view, Path::new("/draft.md"), 2).await
    });
    tokio::task::yield_now().await;

    assert!(authority.notify_remote_change(doc, "rewritten outside").unwrap());

    let updates = pull.await.unwrap().unwrap().expect("replacement update");
    let converged = updates
        .iter()
        .try_fold("draft!".to_string(), |acc, u| u.apply_to(&acc))
        .unwrap();
    assert_eq!(converged, "rewritten outside");
    // An external change is on disk already, so nothing is dirty.
    assert!(view.modification_status().is_empty());
}

#[tokio::test]
async fn test_layout_follows_document_lifecycle() {
    let authority = shared_authority(&[("/a.md", "A"), ("/b.md", "B")]);
    let window = authority.create_window();
    let leaf = authority.tab_config(window).unwrap().id();

    authority.open_in_leaf(window, leaf, Path::new("/a.md")).await.unwrap();
    authority.open_in_leaf(window, leaf, Path::new("/b.md")).await.unwrap();

    let (_, [left, right]) = authority
        .split_leaf(window, leaf, vellum_core::SplitDirection::Horizontal)
        .unwrap();
    assert_eq!(left, leaf);

    // The split's sibling inherited the active tab (/b.md). Closing the
    // document everywhere removes both tabs and collapses the sibling,
    // which is left empty.
    authority.close_document(Path::new("/b.md")).unwrap();
    let root = authority.tab_config(window).unwrap();
    assert!(root.is_leaf());
    assert_eq!(root.id(), left);
    let _ = right;

    // /a.md is still resident and still shown.
    assert!(authority.get_document(Path::new("/a.md")).await.unwrap().version >= 1);
}
