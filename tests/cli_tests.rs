//! Binary surface tests

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_commands() {
    Command::cargo_bin("clipforge")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("clip"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn clip_requires_a_time_range() {
    Command::cargo_bin("clipforge")
        .unwrap()
        .args(["clip", "--in", "video.mp4"])
        .assert()
        .failure();
}

#[test]
fn clip_rejects_unknown_modes() {
    Command::cargo_bin("clipforge")
        .unwrap()
        .args([
            "clip", "--in", "video.mp4", "--start", "0", "--end", "10", "--mode", "hybrid",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown mode"));
}

#[test]
fn clip_rejects_bad_timecodes() {
    Command::cargo_bin("clipforge")
        .unwrap()
        .args([
            "clip", "--in", "video.mp4", "--start", "abc", "--end", "10",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid timecode"));
}
