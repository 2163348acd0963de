//! Integration tests for the reconciliation pipeline.
//!
//! Each test builds a real catalog and a real directory tree, mutates
//! the tree the way users do (renames, moves, duplicates, deletions),
//! and verifies the pass reconnects records without ever touching files.

use photo_relink::core::catalog::{CatalogStore, OperationKind, SqliteCatalog};
use photo_relink::core::matcher::Confidence;
use photo_relink::core::pipeline::Reconciler;
use photo_relink::events::null_sender;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    photos: PathBuf,
    catalog: SqliteCatalog,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let photos = temp.path().join("photos");
        fs::create_dir(&photos).unwrap();
        let catalog = SqliteCatalog::open(&temp.path().join("catalog.db")).unwrap();
        Self {
            _temp: temp,
            photos,
            catalog,
        }
    }

    fn write(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.photos.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::builder().root(&self.photos).build()
    }

    fn import(&self) {
        self.reconciler()
            .import_new(&self.catalog, &null_sender())
            .unwrap();
    }

    fn record_path(&self, content: &[u8]) -> PathBuf {
        let hasher = photo_relink::core::hasher::Sha256Hasher;
        use photo_relink::core::hasher::ContentHasher;
        let hash = hasher.digest_bytes(content);
        self.catalog
            .load_records()
            .unwrap()
            .into_iter()
            .find(|r| r.content_hash == hash)
            .expect("record for content")
            .path
    }
}

#[test]
fn moved_file_is_reconnected_with_exact_confidence() {
    let fx = Fixture::new();
    fx.write("old/a.jpg", b"alpine lake");
    fx.import();

    // The user reorganizes by hand
    fs::create_dir_all(fx.photos.join("new")).unwrap();
    fs::rename(fx.photos.join("old/a.jpg"), fx.photos.join("new/a.jpg")).unwrap();

    let outcome = fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();

    assert_eq!(outcome.updated, 1);
    let relocations: Vec<_> = outcome.report.relocations().collect();
    assert!(matches!(relocations[0].confidence, Confidence::Exact));
    assert_eq!(fx.record_path(b"alpine lake"), fx.photos.join("new/a.jpg"));
}

#[test]
fn renamed_file_is_reconnected_despite_new_name() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"alpine lake");
    fx.import();

    fs::rename(
        fx.photos.join("a.jpg"),
        fx.photos.join("completely-new-name.jpg"),
    )
    .unwrap();

    let outcome = fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();

    assert_eq!(outcome.updated, 1);
    assert_eq!(
        fx.record_path(b"alpine lake"),
        fx.photos.join("completely-new-name.jpg")
    );
}

#[test]
fn duplicate_content_pairs_by_filename_similarity() {
    let fx = Fixture::new();
    // Two byte-identical photos cataloged under /x
    fx.write("x/IMG001.jpg", b"same beach");
    fx.write("x/IMG002.jpg", b"same beach");
    fx.import();

    // Both move to /y with shortened names
    fs::create_dir_all(fx.photos.join("y")).unwrap();
    fs::rename(fx.photos.join("x/IMG001.jpg"), fx.photos.join("y/IMG1.jpg")).unwrap();
    fs::rename(fx.photos.join("x/IMG002.jpg"), fx.photos.join("y/IMG2.jpg")).unwrap();

    let outcome = fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();

    assert_eq!(outcome.updated, 2);
    let records = fx.catalog.load_records().unwrap();
    let by_old_stem = |stem: &str| {
        records
            .iter()
            .find(|r| {
                fx.catalog
                    .audit_log(None)
                    .unwrap()
                    .iter()
                    .any(|a| a.record_id == r.id && a.old_path.ends_with(format!("x/{stem}.jpg")))
            })
            .unwrap()
            .path
            .clone()
    };

    assert_eq!(by_old_stem("IMG001"), fx.photos.join("y/IMG1.jpg"));
    assert_eq!(by_old_stem("IMG002"), fx.photos.join("y/IMG2.jpg"));
}

#[test]
fn extra_duplicate_on_disk_is_reported_not_forced() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"one of a kind");
    fx.import();

    // A copy appears next to the original
    fx.write("a copy.jpg", b"one of a kind");

    let outcome = fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();

    // The record keeps its exact-path match; the copy is unclaimed
    assert_eq!(outcome.report.unresolved_records.len(), 0);
    assert_eq!(outcome.report.unclaimed_files().count(), 1);
    assert_eq!(fx.record_path(b"one of a kind"), fx.photos.join("a.jpg"));
}

#[test]
fn deleted_file_is_reported_missing() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"soon gone");
    fx.import();
    fs::remove_file(fx.photos.join("a.jpg")).unwrap();

    let outcome = fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();

    assert_eq!(outcome.report.missing.len(), 1);
    assert_eq!(outcome.updated, 0);
    // The orphaned record persists for a later pass
    assert_eq!(fx.catalog.load_records().unwrap().len(), 1);
}

#[test]
fn uncataloged_file_is_reported_unknown_until_imported() {
    let fx = Fixture::new();
    fx.write("known.jpg", b"known");
    fx.import();
    fx.write("stranger.jpg", b"never seen");

    let outcome = fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();
    assert_eq!(outcome.report.unknown.len(), 1);

    let added = fx
        .reconciler()
        .import_new(&fx.catalog, &null_sender())
        .unwrap();
    assert_eq!(added, 1);

    let outcome = fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();
    assert!(outcome.report.unknown.is_empty());
}

#[test]
fn second_pass_after_reconnect_is_quiet() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"restless");
    fx.import();
    fs::rename(fx.photos.join("a.jpg"), fx.photos.join("b.jpg")).unwrap();

    let first = fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();
    assert_eq!(first.updated, 1);

    let second = fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.relocations_found(), 0);
    assert!(!second.needs_attention());
}

#[test]
fn repeated_passes_produce_identical_reports() {
    let fx = Fixture::new();
    fx.write("x/IMG001.jpg", b"dup");
    fx.write("x/IMG002.jpg", b"dup");
    fx.write("x/solo.jpg", b"solo");
    fx.import();

    fs::create_dir_all(fx.photos.join("y")).unwrap();
    for name in ["IMG001.jpg", "IMG002.jpg", "solo.jpg"] {
        fs::rename(fx.photos.join("x").join(name), fx.photos.join("y").join(name)).unwrap();
    }

    let preview = || {
        let outcome = Reconciler::builder()
            .root(&fx.photos)
            .dry_run(true)
            .build()
            .run(&fx.catalog, &null_sender())
            .unwrap();
        outcome
            .report
            .decisions
            .iter()
            .map(|d| (d.record_id, d.resolved_path.clone()))
            .collect::<Vec<_>>()
    };

    assert_eq!(preview(), preview());
}

#[test]
fn dry_run_leaves_catalog_and_disk_untouched() {
    let fx = Fixture::new();
    let original = fx.write("a.jpg", b"cautious");
    fx.import();
    fs::rename(&original, fx.photos.join("moved.jpg")).unwrap();

    let outcome = Reconciler::builder()
        .root(&fx.photos)
        .dry_run(true)
        .build()
        .run(&fx.catalog, &null_sender())
        .unwrap();

    assert_eq!(outcome.relocations_found(), 1);
    assert_eq!(outcome.updated, 0);
    assert_eq!(fx.record_path(b"cautious"), fx.photos.join("a.jpg"));
    assert!(fx.catalog.audit_log(None).unwrap().is_empty());
}

#[test]
fn reconnect_audit_records_old_and_new_paths() {
    let fx = Fixture::new();
    fx.write("before.jpg", b"tracked");
    fx.import();
    fs::rename(fx.photos.join("before.jpg"), fx.photos.join("after.jpg")).unwrap();

    fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();

    let audit = fx.catalog.audit_log(None).unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].operation, OperationKind::Reconnect);
    assert!(audit[0].old_path.ends_with("before.jpg"));
    assert!(audit[0].new_path.ends_with("after.jpg"));
}

#[test]
fn files_are_never_deleted_or_modified_by_a_pass() {
    let fx = Fixture::new();
    fx.write("keep/a.jpg", b"precious");
    fx.write("keep/duplicate of a.jpg", b"precious");
    fx.write("keep/other.jpg", b"other");
    fx.import();

    fx.reconciler().run(&fx.catalog, &null_sender()).unwrap();

    assert_eq!(
        fs::read(fx.photos.join("keep/a.jpg")).unwrap(),
        b"precious"
    );
    assert!(fx.photos.join("keep/duplicate of a.jpg").exists());
    assert!(fx.photos.join("keep/other.jpg").exists());
}

#[test]
fn scan_root_outside_catalog_paths_reports_everything_missing() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"here");
    fx.import();

    let elsewhere = fx._temp.path().join("elsewhere");
    fs::create_dir(&elsewhere).unwrap();

    let outcome = Reconciler::builder()
        .root(Path::new(&elsewhere))
        .build()
        .run(&fx.catalog, &null_sender())
        .unwrap();

    assert_eq!(outcome.report.missing.len(), 1);
    assert_eq!(outcome.updated, 0);
}
