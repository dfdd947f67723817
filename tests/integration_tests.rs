//! Integration tests for dir-verifier
//!
//! These run full build/seal/open/verify cycles against temporary
//! directories. Keys are generated in memory; nothing touches `$HOME`.

use dir_verifier::content::sha256_hex;
use dir_verifier::error::SignatureError;
use dir_verifier::manifest::{
    build_manifest, verify_manifest, BuildConfig, FileCheck, Manifest, VerifyConfig,
};
use dir_verifier::signing::{open, seal, Ed25519KeyStore};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn build(dir: &Path, workers: usize) -> Manifest {
    let config = BuildConfig::new(dir, workers).with_base(dir);
    build_manifest(&config, |_, _| {}).unwrap().manifest
}

fn verify(dir: &Path, manifest: &Manifest, workers: usize) -> dir_verifier::MismatchReport {
    let config = VerifyConfig::new(workers).with_base(dir);
    verify_manifest(manifest, &config, |_, _| {}).unwrap().report
}

/// Manifest key for a path given as components
fn key(parts: &[&str]) -> String {
    parts
        .iter()
        .collect::<PathBuf>()
        .to_str()
        .unwrap()
        .to_string()
}

fn populate(dir: &Path) {
    let nested = dir.join("nested");
    fs::create_dir_all(nested.join("deeper")).unwrap();
    fs::write(dir.join("a.txt"), "hello").unwrap();
    fs::write(dir.join("b.txt"), "world").unwrap();
    fs::write(nested.join("c.bin"), [0u8, 1, 2, 3]).unwrap();
    fs::write(nested.join("deeper").join("d.txt"), "").unwrap();
}

#[test]
fn test_unchanged_tree_verifies_clean() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let manifest = build(dir.path(), 4);
    assert_eq!(manifest.len(), 4);
    assert_eq!(
        manifest.get("a.txt"),
        Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
    );
    assert_eq!(
        manifest.get(&key(&["nested", "deeper", "d.txt"])),
        Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
    );

    let report = verify(dir.path(), &manifest, 4);
    assert!(report.is_clean());
}

#[test]
fn test_modified_file_reports_recorded_digest() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    fs::write(dir.path().join("b.txt"), "world").unwrap();

    let manifest = build(dir.path(), 2);
    fs::write(dir.path().join("b.txt"), "worldx").unwrap();

    let report = verify(dir.path(), &manifest, 2);
    assert_eq!(report.len(), 1);
    assert_eq!(
        report.get("b.txt"),
        Some(&FileCheck::Mismatch {
            expected: sha256_hex(b"world")
        })
    );
    assert_eq!(
        report.to_strings().get("b.txt").map(String::as_str),
        Some("486ea46224d1bb4fb680f34f7c9ad96a8f24ec88be73ea8e5a6c65260e9cb8a7")
    );
}

#[test]
fn test_deleted_file_is_reported_unreadable() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let manifest = build(dir.path(), 3);
    fs::remove_file(dir.path().join("nested").join("c.bin")).unwrap();

    let report = verify(dir.path(), &manifest, 3);
    assert_eq!(report.len(), 1);
    assert!(matches!(
        report.get(&key(&["nested", "c.bin"])),
        Some(FileCheck::Unreadable { .. })
    ));
}

#[test]
fn test_new_files_are_not_reported() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let manifest = build(dir.path(), 2);
    fs::write(dir.path().join("added.txt"), "late").unwrap();

    assert!(verify(dir.path(), &manifest, 2).is_clean());
}

#[test]
fn test_results_independent_of_worker_count() {
    let dir = tempdir().unwrap();
    for i in 0..40 {
        let sub = dir.path().join(format!("d{}", i % 5));
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join(format!("f{i}.txt")), format!("content {i}")).unwrap();
    }

    let single = build(dir.path(), 1);
    let many = build(dir.path(), 8);
    assert_eq!(single, many);
    assert_eq!(single.to_json().unwrap(), many.to_json().unwrap());

    for i in (0..40).step_by(7) {
        let path = dir.path().join(format!("d{}", i % 5)).join(format!("f{i}.txt"));
        fs::write(path, "tampered").unwrap();
    }

    let report_single = verify(dir.path(), &single, 1);
    let report_many = verify(dir.path(), &single, 8);
    assert_eq!(report_single.len(), 6);
    assert_eq!(report_single, report_many);
}

#[test]
fn test_tree_outside_base_round_trips() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let work = dir.path().join("work");
    fs::create_dir_all(&work).unwrap();
    populate(&data);

    let config = BuildConfig::new(&data, 3).with_base(&work);
    let manifest = build_manifest(&config, |_, _| {}).unwrap().manifest;
    assert!(manifest.get(&key(&["..", "data", "a.txt"])).is_some());

    fs::write(data.join("b.txt"), "worldx").unwrap();
    let report = verify(&work, &manifest, 3);
    assert_eq!(report.len(), 1);
    assert_eq!(
        report.get(&key(&["..", "data", "b.txt"])),
        Some(&FileCheck::Mismatch {
            expected: sha256_hex(b"world")
        })
    );
}

#[test]
fn test_default_base_round_trips() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let manifest = build_manifest(&BuildConfig::new(dir.path(), 2), |_, _| {})
        .unwrap()
        .manifest;
    assert_eq!(manifest.len(), 4);

    let output = verify_manifest(&manifest, &VerifyConfig::new(2), |_, _| {}).unwrap();
    assert!(output.report.is_clean());
    assert_eq!(output.verified(), 4);
}

#[test]
fn test_verification_file_excluded_from_manifest() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let container_path = dir.path().join("verify.vf");
    fs::write(&container_path, "stale").unwrap();

    let config = BuildConfig::new(dir.path(), 2)
        .with_base(dir.path())
        .with_exclude(&container_path);
    let manifest = build_manifest(&config, |_, _| {}).unwrap().manifest;

    assert_eq!(manifest.len(), 4);
    assert!(manifest.get("verify.vf").is_none());
}

#[test]
fn test_signed_round_trip() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let keys = Ed25519KeyStore::generate();

    let manifest = build(dir.path(), 4);
    let container = seal(&keys, &manifest.to_json().unwrap());
    let container_path = dir.path().join("verify.vf");
    fs::write(&container_path, &container).unwrap();

    let bytes = fs::read(&container_path).unwrap();
    let payload = open(&keys, &bytes).unwrap();
    let reopened = Manifest::from_json(payload).unwrap();
    assert_eq!(reopened, manifest);
    assert!(verify(dir.path(), &reopened, 4).is_clean());
}

#[test]
fn test_tampered_manifest_fails_signature() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let keys = Ed25519KeyStore::generate();

    let manifest = build(dir.path(), 2);
    let container = seal(&keys, &manifest.to_json().unwrap());

    // Swap the recorded digest for a.txt with the one for b.txt
    let text = String::from_utf8(container).unwrap();
    let forged = text.replace(&sha256_hex(b"hello"), &sha256_hex(b"world"));
    assert_ne!(forged, text);

    assert!(matches!(
        open(&keys, forged.as_bytes()),
        Err(SignatureError::Mismatch)
    ));
}

#[test]
fn test_key_persists_between_runs() {
    let dir = tempdir().unwrap();
    let key_path = dir.path().join("keys").join("default");

    let first = Ed25519KeyStore::load_or_generate(&key_path).unwrap();
    let container = seal(&first, b"{}");

    let second = Ed25519KeyStore::load_or_generate(&key_path).unwrap();
    assert_eq!(open(&second, &container).unwrap(), b"{}");

    let stranger = Ed25519KeyStore::generate();
    assert!(open(&stranger, &container).is_err());
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_recorded_in_manifest() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    populate(dir.path());
    let locked = dir.path().join("locked.txt");
    fs::write(&locked, "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read it anyway
    if fs::read(&locked).is_ok() {
        return;
    }

    let manifest = build(dir.path(), 2);
    let value = manifest.get("locked.txt").unwrap();
    assert!(!dir_verifier::content::is_digest(value));
    assert_eq!(manifest.unreadable().count(), 1);

    let report = verify(dir.path(), &manifest, 2);
    assert!(matches!(
        report.get("locked.txt"),
        Some(FileCheck::Unreadable { .. })
    ));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}
