//! # cater-cli — Command-Line Front End
//!
//! The `cater` binary drives the billing workflow over a JSON snapshot
//! file. Every invocation loads the snapshot, runs one command through the
//! [`Workflow`] engine, and writes the snapshot back if the command can
//! change state.
//!
//! ## Exit codes
//!
//! - `0`: success.
//! - `1`: hard failure (rejected transition, unknown id, version conflict),
//!   a broken audit chain under `audit --verify`, or a sweep with failed
//!   checks.
//! - `2`: the snapshot file is unreadable, malformed, or inconsistent, or
//!   the `CATER_*` environment configuration is invalid.

pub mod commands;
pub mod notifier;
pub mod snapshot;

use std::io::Write;
use std::path::Path;

use cater_notify::Notifier;
use cater_workflow::{Workflow, WorkflowConfig};

use crate::commands::Command;
use crate::snapshot::SnapshotError;

/// Load `snapshot_path`, run `command`, and persist the result.
///
/// The snapshot is written back after a mutating command even when the
/// command fails, so partial progress (a saved milestone whose invoice
/// update failed) is not lost.
pub async fn run<N: Notifier>(
    snapshot_path: &Path,
    command: &Command,
    notifier: N,
    config: WorkflowConfig,
    json: bool,
    out: &mut dyn Write,
) -> anyhow::Result<u8> {
    let store = snapshot::load(snapshot_path)?;
    let workflow = Workflow::new(store, notifier, config);
    let result = commands::execute(&workflow, command, json, out).await;
    if command.is_mutating() {
        snapshot::save(snapshot_path, workflow.store())?;
    }
    result
}

/// Exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<SnapshotError>().is_some() {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use cater_core::{Actor, InvoiceId, Timestamp};
    use cater_notify::RecordingNotifier;
    use cater_state::{InvoiceStatus, QuoteStatus};
    use cater_workflow::{InMemoryStore, Quote, WorkflowStore};

    use crate::commands::parse_line_item;

    struct Fixture {
        _dir: tempfile::TempDir,
        path: PathBuf,
        notifier: RecordingNotifier,
    }

    impl Fixture {
        async fn with_quote() -> (Self, Quote) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("state.json");
            let store = InMemoryStore::new();
            let quote = Quote::new("Orchard Wedding", Some("planner@orchard.test".into()));
            store.save_quote(&quote).await.unwrap();
            snapshot::save(&path, &store).unwrap();
            let fixture = Self {
                _dir: dir,
                path,
                notifier: RecordingNotifier::new(),
            };
            (fixture, quote)
        }

        async fn run(&self, command: Command, json: bool) -> (anyhow::Result<u8>, String) {
            let mut out = Vec::new();
            let result = run(
                &self.path,
                &command,
                self.notifier.clone(),
                WorkflowConfig::default(),
                json,
                &mut out,
            )
            .await;
            (result, String::from_utf8(out).unwrap())
        }

        async fn promote(&self, quote: &Quote) -> InvoiceId {
            let (result, out) = self
                .run(
                    Command::Promote {
                        quote: quote.id,
                        items: vec![parse_line_item("Family-style dinner:50:2000").unwrap()],
                        due: Some(Timestamp::parse("2026-06-01T00:00:00Z").unwrap()),
                    },
                    true,
                )
                .await;
            assert_eq!(result.unwrap(), 0);
            let invoice: serde_json::Value = serde_json::from_str(&out).unwrap();
            invoice["id"].as_str().unwrap().parse().unwrap()
        }

        fn reload(&self) -> InMemoryStore {
            snapshot::load(&self.path).unwrap()
        }
    }

    fn transition(invoice: InvoiceId, to: InvoiceStatus) -> Command {
        Command::Transition {
            invoice,
            to,
            actor: Actor::Admin,
            reason: None,
        }
    }

    #[tokio::test]
    async fn transition_is_persisted_and_reported() {
        let (fx, quote) = Fixture::with_quote().await;
        let invoice = fx.promote(&quote).await;

        let (result, out) = fx.run(transition(invoice, InvoiceStatus::Sent), false).await;
        assert_eq!(result.unwrap(), 0);
        assert!(out.contains("draft -> sent"), "{out}");
        assert!(out.contains("notified customer: estimate_ready"), "{out}");

        let store = fx.reload();
        let stored = store.fetch_invoice(invoice).await.unwrap().unwrap();
        assert_eq!(stored.workflow_status, InvoiceStatus::Sent);
        let stored_quote = store.fetch_quote(quote.id).await.unwrap().unwrap();
        assert_eq!(stored_quote.status, QuoteStatus::Estimated);
        assert_eq!(fx.notifier.len(), 1);
    }

    #[tokio::test]
    async fn rejected_transition_is_a_hard_failure() {
        let (fx, quote) = Fixture::with_quote().await;
        let invoice = fx.promote(&quote).await;

        let (result, _) = fx.run(transition(invoice, InvoiceStatus::Paid), false).await;
        let err = result.unwrap_err();
        assert_eq!(exit_code(&err), 1);
        assert!(format!("{err:#}").contains("invalid invoice transition: draft -> paid"));

        let stored = fx.reload().fetch_invoice(invoice).await.unwrap().unwrap();
        assert_eq!(stored.workflow_status, InvoiceStatus::Draft);
    }

    #[tokio::test]
    async fn malformed_snapshot_exits_with_usage_code() {
        let (fx, _) = Fixture::with_quote().await;
        std::fs::write(&fx.path, "[1, 2").unwrap();

        let (result, _) = fx.run(Command::Summary, false).await;
        assert_eq!(exit_code(&result.unwrap_err()), 2);
    }

    #[tokio::test]
    async fn sweep_uses_given_instant() {
        let (fx, quote) = Fixture::with_quote().await;
        let invoice = fx.promote(&quote).await;
        fx.run(transition(invoice, InvoiceStatus::Sent), false).await.0.unwrap();

        let before_due = Command::CheckOverdue {
            invoice: None,
            now: Some(Timestamp::parse("2026-05-01T00:00:00Z").unwrap()),
        };
        let (result, out) = fx.run(before_due, false).await;
        assert_eq!(result.unwrap(), 0);
        assert!(out.contains("marked 0 overdue"), "{out}");

        let after_due = Command::CheckOverdue {
            invoice: None,
            now: Some(Timestamp::parse("2026-06-10T00:00:00Z").unwrap()),
        };
        let (result, out) = fx.run(after_due, false).await;
        assert_eq!(result.unwrap(), 0);
        assert!(out.contains(&format!("overdue: {invoice}")), "{out}");

        let stored = fx.reload().fetch_invoice(invoice).await.unwrap().unwrap();
        assert_eq!(stored.workflow_status, InvoiceStatus::Overdue);
    }

    #[tokio::test]
    async fn tampered_audit_fails_verification() {
        let (fx, quote) = Fixture::with_quote().await;
        let invoice = fx.promote(&quote).await;
        fx.run(transition(invoice, InvoiceStatus::Sent), false).await.0.unwrap();

        let verify = Command::Audit { invoice, verify: true };
        let (result, out) = fx.run(verify.clone(), false).await;
        assert_eq!(result.unwrap(), 0);
        assert!(out.contains("chain intact (2 records)"), "{out}");

        let mut snapshot = fx.reload().snapshot();
        snapshot.audit[1].reason = Some("edited after the fact".into());
        std::fs::write(&fx.path, serde_json::to_string(&snapshot).unwrap()).unwrap();

        let (result, out) = fx.run(verify, false).await;
        assert_eq!(result.unwrap(), 1);
        assert!(out.contains("BROKEN"), "{out}");
    }
}
