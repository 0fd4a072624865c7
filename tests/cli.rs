extern crate assert_cmd;
extern crate image;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use image::GenericImageView;
use predicates::prelude::*;
use std::process::Command;

fn mandel() -> Command {
    Command::cargo_bin("mandel").unwrap()
}

#[test]
fn renders_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("view.png");
    mandel()
        .args(&["-o", out.to_str().unwrap(), "--size", "120x80", "--iterations", "50"])
        .args(&["--threads", "1"])
        .assert()
        .success();
    let decoded = image::open(&out).unwrap();
    assert_eq!(decoded.dimensions(), (120, 80));
}

#[test]
fn clicks_zoom_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let plain = dir.path().join("plain.png");
    let zoomed = dir.path().join("zoomed.png");
    let common = ["--size", "64x48", "--iterations", "40", "--center", "-0.75,0.1"];
    mandel()
        .args(&["-o", plain.to_str().unwrap()])
        .args(&common)
        .assert()
        .success();
    mandel()
        .args(&["-o", zoomed.to_str().unwrap()])
        .args(&common)
        .args(&["--click", "10,10", "--click", "32,24"])
        .assert()
        .success();
    let plain = std::fs::read(&plain).unwrap();
    let zoomed = std::fs::read(&zoomed).unwrap();
    assert_ne!(plain, zoomed);
}

#[test]
fn query_mode_uses_server_defaults_and_clamps() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("served.png");
    mandel()
        .args(&["-o", out.to_str().unwrap(), "--query", "width=10&height=60&max_iter=20"])
        .assert()
        .success();
    let decoded = image::open(&out).unwrap();
    assert_eq!(decoded.dimensions(), (50, 60));
}

#[test]
fn query_mode_reports_bad_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never.png");
    mandel()
        .args(&["-o", out.to_str().unwrap(), "--query", "scale=-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("400"));
    assert!(!out.exists());
}

#[test]
fn rejects_zero_width() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never.png");
    mandel()
        .args(&["-o", out.to_str().unwrap(), "--size", "0x10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("width must be positive"));
}

#[test]
fn rejects_non_positive_scale() {
    mandel()
        .args(&["-o", "unused.png", "--scale", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Scale must be a positive number"));
}

#[test]
fn reports_unwritable_output() {
    mandel()
        .args(&["-o", "/nonexistent/dir/view.png", "--size", "60x40", "--bracket"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not write /nonexistent/dir/view.png"));
}
