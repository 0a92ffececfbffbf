mod common;

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use std::fs::File;
use std::io::Read;
use zip::ZipArchive;

fn archive_names(path: &std::path::Path) -> Vec<String> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn test_bundle_help() {
    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["bundle", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--quality"));
}

#[test]
fn test_preview_help() {
    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["preview", "--help"]);
    cmd.assert().success();
}

#[test]
fn test_bundle_missing_args() {
    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["bundle"]);
    cmd.assert().failure();
}

#[test]
fn test_preview_lists_images_in_order() {
    let temp = TempDir::new().unwrap();
    common::create_test_image_files(temp.path());

    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["preview", &temp.path().to_string_lossy()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a.png (").and(predicate::str::contains("[image/png, PNG]")))
        .stdout(
            predicate::str::contains("b.jpg (")
                .and(predicate::str::contains("[image/jpeg, JPEG]")),
        )
        .stdout(predicate::str::contains("notes.txt").not());
}

#[test]
fn test_bundle_writes_archive() {
    let temp = TempDir::new().unwrap();
    common::create_test_image_files(temp.path());
    let output = temp.child("out");

    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["bundle", &temp.path().to_string_lossy(), "-q", "50", "-o"])
        .arg(output.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Archive written to"));

    let archive = output.child("compressed_images.zip");
    archive.assert(predicate::path::is_file());
    assert_eq!(archive_names(archive.path()), vec!["a.png", "b.jpg"]);
}

#[test]
fn test_bundle_exclude_and_custom_name() {
    let temp = TempDir::new().unwrap();
    common::create_test_image_files(temp.path());

    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["bundle", &temp.path().to_string_lossy(), "-x", "a.png", "-n", "photos", "-o"])
        .arg(temp.path())
        .arg("--quiet");
    cmd.assert().success();

    let archive = temp.child("photos.zip");
    archive.assert(predicate::path::is_file());
    assert_eq!(archive_names(archive.path()), vec!["b.jpg"]);
}

#[test]
fn test_bundle_archive_holds_compressed_bytes() {
    let temp = TempDir::new().unwrap();
    let source = temp.child("photo.jpg");
    source.write_binary(&common::jpeg_bytes(128, 96)).unwrap();

    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["bundle", "-q", "20", "--quiet", "-o"])
        .arg(temp.path())
        .arg(source.path());
    cmd.assert().success();

    let mut archive =
        ZipArchive::new(File::open(temp.child("compressed_images.zip").path()).unwrap()).unwrap();
    let mut content = Vec::new();
    archive
        .by_name("photo.jpg")
        .unwrap()
        .read_to_end(&mut content)
        .unwrap();
    let decoded = image::load_from_memory(&content).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (128, 96));
}

#[test]
fn test_bundle_invalid_quality() {
    let temp = TempDir::new().unwrap();
    common::create_test_image_files(temp.path());

    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["bundle", &temp.path().to_string_lossy(), "--quality", "0"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid quality value"));
}

#[test]
fn test_bundle_empty_directory_fails() {
    let temp = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["bundle", &temp.path().to_string_lossy(), "-o"])
        .arg(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No image files found"));
}

#[test]
fn test_bundle_only_broken_images_fails_without_archive() {
    let temp = TempDir::new().unwrap();
    temp.child("fake.png").write_binary(b"fake image data").unwrap();

    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["bundle", &temp.path().to_string_lossy(), "-o"])
        .arg(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("compress images before downloading"));

    temp.child("compressed_images.zip")
        .assert(predicate::path::missing());
}

#[test]
fn test_bundle_excluding_everything_fails() {
    let temp = TempDir::new().unwrap();
    temp.child("only.png")
        .write_binary(&common::png_bytes(8, 8))
        .unwrap();

    let mut cmd = Command::cargo_bin("squeeze-zip").unwrap();
    cmd.args(["bundle", &temp.path().to_string_lossy(), "-x", "only.png"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No images left to compress"));
}
