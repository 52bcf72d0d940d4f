//! Runs the `cater` binary end to end against a temporary snapshot file.

use std::path::Path;
use std::process::{Command, Output};

fn cater(snapshot: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cater"))
        .arg("--snapshot")
        .arg(snapshot)
        .args(args)
        .env_remove("CATER_NOTIFY_URL")
        .env_remove("CATER_NOTIFY_TOKEN")
        .env_remove("CATER_NOTIFY_TIMEOUT_SECS")
        .env_remove("CATER_TAX_RATE_BPS")
        .env_remove("CATER_PAYMENT_TERMS_DAYS")
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn cater")
}

fn json_field(output: &Output, field: &str) -> String {
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON on stdout");
    value[field].as_str().expect("string field").to_string()
}

#[test]
fn quote_to_paid_through_the_binary() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");

    let out = cater(&state, &["--json", "quote", "new", "--customer", "Riverside Brunch"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let quote = json_field(&out, "id");

    let out = cater(
        &state,
        &["--json", "promote", "--quote", &quote, "--item", "Brunch buffet:25:4000"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let invoice = json_field(&out, "id");

    for (to, actor) in [("sent", "admin"), ("approved", "customer")] {
        let out = cater(
            &state,
            &["transition", "--invoice", &invoice, "--to", to, "--actor", actor],
        );
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    }

    let out = cater(
        &state,
        &["--json", "milestone", "add", "--invoice", &invoice, "--label", "full payment", "--amount", "100000"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let milestone = json_field(&out, "id");

    let out = cater(&state, &["milestone", "complete", "--id", &milestone]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("approved -> paid"), "{stdout}");
    assert!(stdout.contains("quote: paid"), "{stdout}");

    let out = cater(&state, &["progress", "--invoice", &invoice]);
    assert!(String::from_utf8_lossy(&out.stdout).contains("(100%)"));

    let out = cater(&state, &["audit", "--invoice", &invoice, "--verify"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("chain intact (4 records)"));
}

#[test]
fn illegal_transition_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let out = cater(&state, &["--json", "quote", "new", "--customer", "Rooftop Mixer"]);
    let quote = json_field(&out, "id");
    let out = cater(&state, &["--json", "promote", "--quote", &quote, "--item", "Canapés:200:350"]);
    let invoice = json_field(&out, "id");

    let out = cater(&state, &["transition", "--invoice", &invoice, "--to", "paid"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid invoice transition"));
}

#[test]
fn corrupt_snapshot_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    std::fs::write(&state, "not json").unwrap();

    let out = cater(&state, &["summary"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn summary_of_missing_snapshot_is_all_zero() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");

    let out = cater(&state, &["summary"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("draft"));
    assert!(!state.exists(), "read-only commands never create the snapshot");
}
