use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn lmweb_version_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("lmweb");
    let out = std::process::Command::new(bin)
        .args(["version"])
        .output()
        .expect("run lmweb version");

    assert!(out.status.success(), "lmweb version failed");
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse version json");

    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["kind"].as_str(), Some("version"));
    assert_eq!(v["name"].as_str(), Some("lmweb"));
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[test]
fn lmweb_version_text_output_contract() {
    Command::new(assert_cmd::cargo::cargo_bin!("lmweb"))
        .args(["version", "--output", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("lmweb "));
}

#[test]
fn lmweb_ask_requires_a_question() {
    Command::new(assert_cmd::cargo::cargo_bin!("lmweb"))
        .args(["ask"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("QUESTION"));
}

#[test]
fn lmweb_rejects_unknown_search_mode() {
    Command::new(assert_cmd::cargo::cargo_bin!("lmweb"))
        .args(["ask", "--search-mode", "sometimes", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown search mode"));
}
