//! Bundle sync through the filesystem mirror transport and directory row store

mod common;

use common::TestWorkspace;
use mlbox::error::MlboxError;
use mlbox::sync::{BundleSyncEngine, FsTransport, SyncRequest};
use mlbox::tabular::{
    BundleId, DirRowStore, RowChannelProvider, StoreLocation, TabularRow, TabularRowChannel,
};

const VERSION: &str = "gq4wmmrrgezdgnbvgy3tqojqgfsw";

fn request(local_project: &str) -> SyncRequest {
    request_for(VERSION, local_project)
}

fn request_for(version: &str, local_project: &str) -> SyncRequest {
    SyncRequest {
        name: "mnist".to_string(),
        version: version.to_string(),
        local_project: local_project.to_string(),
        remote_project: "self".to_string(),
        remote_instance: "shared".to_string(),
    }
}

fn engine(ws: &TestWorkspace) -> BundleSyncEngine<DirRowStore, FsTransport> {
    let cfg = ws.config();
    let rows = DirRowStore::new(&cfg.datastore_dir).with_remote(ws.remote.join(".datastore"));
    BundleSyncEngine::new(cfg.store_layout(), rows, FsTransport::new(&ws.remote))
}

fn seed_rows(ws: &TestWorkspace, count: usize) {
    let store = DirRowStore::new(&ws.config().datastore_dir);
    let mut channel = store
        .open(&BundleId::new("self", "mnist", VERSION), &StoreLocation::Local)
        .unwrap();
    for i in 0..count {
        channel
            .put(TabularRow::new(format!("{:04}", i)).with("label", i % 10))
            .unwrap();
    }
    channel.close().unwrap();
}

#[test]
fn test_upload_then_download_round_trip() {
    let ws = TestWorkspace::new();
    let source = ws.create_dataset("self", "mnist", VERSION, &[b"0000", b"1111", b"22"]);
    seed_rows(&ws, 12);

    let mut engine = engine(&ws);
    let uploaded = engine.upload(&request("self"), &source).unwrap();
    assert_eq!(uploaded.rows, 12);
    assert_eq!(uploaded.transfer.files, 4);
    assert!(
        ws.remote
            .join("bundles/self/mnist")
            .join(VERSION)
            .join("_manifest.yaml")
            .is_file()
    );

    let target = ws.config().dataset_workdir("team", "mnist", VERSION);
    let downloaded = engine.download(&request("team"), &target).unwrap();
    assert_eq!(downloaded.rows, 12);
    assert_eq!(downloaded.planned, 4);

    assert_eq!(
        TestWorkspace::data_names(&source),
        TestWorkspace::data_names(&target)
    );
    for name in TestWorkspace::data_names(&target) {
        let original = std::fs::read(source.join("data").join(&name)).unwrap();
        let fetched = std::fs::read(target.join("data").join(&name)).unwrap();
        assert_eq!(original, fetched);
    }
    assert_eq!(
        ws.read_file(&target.join("archive.meta_tar")),
        "meta of mnist"
    );

    let mut local = DirRowStore::new(&ws.config().datastore_dir)
        .open(&BundleId::new("team", "mnist", VERSION), &StoreLocation::Local)
        .unwrap();
    let ids: Vec<String> = local.scan().unwrap().map(|r| r.unwrap().id).collect();
    assert_eq!(ids.len(), 12);
    assert_eq!(ids[0], "0000");
}

#[test]
fn test_second_upload_skips_existing_blobs() {
    let ws = TestWorkspace::new();
    let source = ws.create_dataset("self", "mnist", VERSION, &[b"abc", b"defg"]);

    let mut engine = engine(&ws);
    engine.upload(&request("self"), &source).unwrap();
    let again = engine.upload(&request("self"), &source).unwrap();

    assert_eq!(again.transfer.skipped, 2);
    assert_eq!(again.transfer.files, 1);
}

#[test]
fn test_download_rejects_tampered_blob() {
    let ws = TestWorkspace::new();
    let source = ws.create_dataset("self", "mnist", VERSION, &[b"trusted bytes"]);

    let mut engine = engine(&ws);
    engine.upload(&request("self"), &source).unwrap();

    let hash = mlbox::content::hash_bytes(b"trusted bytes");
    let blob = engine.transport().object_path(&hash);
    std::fs::write(&blob, b"tampered!!!!!").unwrap();

    let target = ws.config().dataset_workdir("team", "mnist", VERSION);
    let err = engine.download(&request("team"), &target).unwrap_err();
    assert!(matches!(err, MlboxError::HashMismatch { .. }));
    assert!(!ws.config().store_layout().object_path(&hash).exists());
}

#[test]
fn test_download_of_unknown_bundle_fails_cleanly() {
    let ws = TestWorkspace::new();
    let target = ws.config().dataset_workdir("team", "mnist", VERSION);

    let err = engine(&ws).download(&request("team"), &target).unwrap_err();
    assert!(matches!(err, MlboxError::ManifestMissing { .. }));
    assert!(!target.join("data").exists());
}

#[test]
fn test_redownload_into_source_project_keeps_local_blobs() {
    let ws = TestWorkspace::new();
    let source = ws.create_dataset("self", "mnist", VERSION, &[b"trusted bytes"]);
    let hash = mlbox::content::hash_bytes(b"trusted bytes");
    let short = &hash[..16];

    let mut engine = engine(&ws);
    engine.upload(&request("self"), &source).unwrap();
    std::fs::write(engine.transport().object_path(&hash), b"tampered!!!!!").unwrap();

    let report = engine.download(&request("self"), &source).unwrap();
    assert_eq!(report.transfer.skipped, 1);

    let local = source.join("data").join(short);
    assert_eq!(std::fs::read(&local).unwrap(), b"trusted bytes");
    assert!(std::fs::symlink_metadata(&local).unwrap().file_type().is_symlink());
    assert_eq!(
        std::fs::read_link(&local).unwrap(),
        ws.config().store_layout().object_path(&hash)
    );
}

#[test]
fn test_bundles_sharing_a_blob_share_one_object() {
    let ws = TestWorkspace::new();
    let other = "gq4wmmrrgezdgnbvgy3tqojqgfsx";
    let v1 = ws.create_dataset("self", "mnist", VERSION, &[b"shared", b"one"]);
    let v2 = ws.create_dataset("self", "mnist", other, &[b"shared", b"two"]);

    let mut engine = engine(&ws);
    engine.upload(&request_for(VERSION, "self"), &v1).unwrap();
    engine.upload(&request_for(other, "self"), &v2).unwrap();

    let t1 = ws.config().dataset_workdir("team", "mnist", VERSION);
    let t2 = ws.config().dataset_workdir("team", "mnist", other);
    let first = engine.download(&request_for(VERSION, "team"), &t1).unwrap();
    let second = engine.download(&request_for(other, "team"), &t2).unwrap();

    assert_eq!(first.transfer.skipped, 0);
    assert_eq!(second.transfer.skipped, 1);

    let hash = mlbox::content::hash_bytes(b"shared");
    let object = ws.config().store_layout().object_path(&hash);
    for workdir in [&t1, &t2] {
        let link = workdir.join("data").join(&hash[..16]);
        assert_eq!(std::fs::read_link(&link).unwrap(), object);
    }
    assert_eq!(std::fs::read(&object).unwrap(), b"shared");
}
