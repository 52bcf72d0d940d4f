//! # Subcommands
//!
//! Each handler runs one workflow operation against the loaded store and
//! writes a human-readable summary, or the full report as JSON with
//! `--json`. Handlers return the process exit code; `Err` is a hard failure.
//!
//! ```bash
//! cater --snapshot state.json quote new --customer "Harbor Gala"
//! cater --snapshot state.json promote --quote <ID> --item "Plated dinner:40:2250"
//! cater --snapshot state.json transition --invoice <ID> --to sent
//! cater --snapshot state.json milestone complete --id <ID>
//! cater --snapshot state.json check-overdue
//! ```

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use cater_core::{Actor, InvoiceId, MilestoneId, Money, QuoteId, Timestamp};
use cater_notify::Notifier;
use cater_state::{InvoiceStatus, MilestoneStatus};
use cater_workflow::{
    ChainStatus, InMemoryStore, InvoicePayment, LineItem, Milestone, OverdueOutcome, Quote,
    SideEffect, TransitionReport, Workflow, WorkflowStore,
};

/// Workflow engine as driven by the CLI.
pub type CliWorkflow<N> = Workflow<InMemoryStore, N>;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Quote records.
    Quote(QuoteArgs),

    /// Create a draft invoice from a quote.
    Promote {
        #[arg(long)]
        quote: QuoteId,
        /// Line item as `DESCRIPTION:QUANTITY:UNIT_PRICE_CENTS`. Repeatable.
        #[arg(long = "item", required = true, value_parser = parse_line_item)]
        items: Vec<LineItem>,
        /// Due date (`YYYY-MM-DD` or RFC 3339). Defaults to the payment terms.
        #[arg(long, value_parser = parse_due_date)]
        due: Option<Timestamp>,
    },

    /// Replace the line items of a draft or pending-review invoice.
    EditItems {
        #[arg(long)]
        invoice: InvoiceId,
        /// Version the edit was prepared against.
        #[arg(long)]
        expected_version: u64,
        #[arg(long = "item", required = true, value_parser = parse_line_item)]
        items: Vec<LineItem>,
    },

    /// Move an invoice to a new workflow status.
    Transition {
        #[arg(long)]
        invoice: InvoiceId,
        #[arg(long)]
        to: InvoiceStatus,
        #[arg(long, default_value = "admin")]
        actor: Actor,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Payment milestones.
    Milestone(MilestoneArgs),

    /// Mark past-due invoices overdue. Checks every open invoice unless
    /// `--invoice` is given.
    CheckOverdue {
        #[arg(long)]
        invoice: Option<InvoiceId>,
        /// Evaluate as of this instant instead of now.
        #[arg(long, value_parser = parse_instant)]
        now: Option<Timestamp>,
    },

    /// Payment progress of one invoice.
    Progress {
        #[arg(long)]
        invoice: InvoiceId,
    },

    /// Invoice counts per status.
    Summary,

    /// Show an invoice's audit trail.
    Audit {
        #[arg(long)]
        invoice: InvoiceId,
        /// Re-verify the hash chain; exits 1 if it is broken.
        #[arg(long)]
        verify: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct QuoteArgs {
    #[command(subcommand)]
    pub command: QuoteCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum QuoteCommand {
    /// Record a new quote in `pending`.
    New {
        #[arg(long)]
        customer: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct MilestoneArgs {
    #[command(subcommand)]
    pub command: MilestoneCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MilestoneCommand {
    /// Attach a payment milestone to an invoice.
    Add {
        #[arg(long)]
        invoice: InvoiceId,
        #[arg(long)]
        label: String,
        /// Amount in cents.
        #[arg(long)]
        amount: i64,
        #[arg(long, value_parser = parse_due_date)]
        due: Option<Timestamp>,
    },

    /// Mark a milestone completed; the last one pays the invoice.
    Complete {
        #[arg(long)]
        id: MilestoneId,
        #[arg(long, default_value = "customer")]
        actor: Actor,
    },

    /// Move a milestone to another status.
    Set {
        #[arg(long)]
        id: MilestoneId,
        #[arg(long)]
        status: MilestoneStatus,
        #[arg(long, default_value = "admin")]
        actor: Actor,
    },
}

impl Command {
    /// Whether the snapshot must be written back afterwards.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Command::Progress { .. } | Command::Summary | Command::Audit { .. }
        )
    }
}

/// Parse `DESCRIPTION:QUANTITY:UNIT_PRICE_CENTS`. The description may itself
/// contain colons.
pub fn parse_line_item(s: &str) -> Result<LineItem, String> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(price), Some(quantity), Some(description)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected DESCRIPTION:QUANTITY:UNIT_PRICE_CENTS, got {s:?}"));
    };
    let quantity: u32 = quantity
        .trim()
        .parse()
        .map_err(|e| format!("quantity {quantity:?}: {e}"))?;
    let cents: i64 = price
        .trim()
        .parse()
        .map_err(|e| format!("unit price {price:?}: {e}"))?;
    let unit_price = Money::from_cents(cents).map_err(|e| e.to_string())?;
    Ok(LineItem::new(description.trim(), quantity, unit_price))
}

fn parse_due_date(s: &str) -> Result<Timestamp, String> {
    Timestamp::parse_due_date(s).map_err(|e| e.to_string())
}

fn parse_instant(s: &str) -> Result<Timestamp, String> {
    Timestamp::parse_lenient(s).map_err(|e| e.to_string())
}

/// Run one command.
pub async fn execute<N: Notifier>(
    workflow: &CliWorkflow<N>,
    command: &Command,
    json: bool,
    out: &mut dyn Write,
) -> Result<u8> {
    match command {
        Command::Quote(QuoteArgs {
            command: QuoteCommand::New { customer, email },
        }) => cmd_quote_new(workflow, customer, email.clone(), json, out).await,
        Command::Promote { quote, items, due } => {
            let invoice = workflow
                .promote_quote(*quote, items.clone(), *due)
                .await
                .with_context(|| format!("promoting quote {quote}"))?;
            emit(out, json, &invoice, |out| {
                writeln!(
                    out,
                    "OK: invoice {} ({}) created in draft, total {}",
                    invoice.id, invoice.invoice_number, invoice.total_amount
                )
            })
        }
        Command::EditItems {
            invoice,
            expected_version,
            items,
        } => {
            let updated = workflow
                .update_line_items(*invoice, *expected_version, items.clone())
                .await
                .with_context(|| format!("editing line items of invoice {invoice}"))?;
            emit(out, json, &updated, |out| {
                writeln!(
                    out,
                    "OK: invoice {} now version {}, total {}",
                    updated.id, updated.version, updated.total_amount
                )
            })
        }
        Command::Transition {
            invoice,
            to,
            actor,
            reason,
        } => {
            let report = workflow
                .transition(*invoice, *to, *actor, reason.clone())
                .await
                .with_context(|| format!("moving invoice {invoice} to {to}"))?;
            emit(out, json, &report, |out| write_transition(out, &report))
        }
        Command::Milestone(MilestoneArgs { command }) => {
            cmd_milestone(workflow, command, json, out).await
        }
        Command::CheckOverdue { invoice, now } => {
            let now = now.unwrap_or_else(Timestamp::now);
            match invoice {
                Some(id) => {
                    let outcome = workflow.check_overdue(*id, now).await?;
                    emit(out, json, &outcome, |out| match &outcome {
                        OverdueOutcome::MarkedOverdue { transition } => {
                            write_transition(out, transition)
                        }
                        OverdueOutcome::NotDue => writeln!(out, "invoice {id} is not past due"),
                        OverdueOutcome::NotEligible { status } => {
                            writeln!(out, "invoice {id} is {status}; not checked")
                        }
                    })
                }
                None => {
                    let report = workflow.sweep_overdue(now).await?;
                    let code = u8::from(!report.errors.is_empty());
                    emit(out, json, &report, |out| {
                        writeln!(
                            out,
                            "checked {} invoice(s), marked {} overdue",
                            report.checked,
                            report.marked.len()
                        )?;
                        for id in &report.marked {
                            writeln!(out, "  overdue: {id}")?;
                        }
                        for (id, err) in &report.errors {
                            writeln!(out, "  FAILED: {id}: {err}")?;
                        }
                        Ok(())
                    })?;
                    Ok(code)
                }
            }
        }
        Command::Progress { invoice } => {
            let progress = workflow.payment_progress(*invoice).await?;
            emit(out, json, &progress, |out| {
                writeln!(
                    out,
                    "paid {} of {} ({}%), {} remaining; {}/{} milestones completed",
                    progress.paid,
                    progress.total,
                    progress.percent,
                    progress.remaining,
                    progress.milestones_completed,
                    progress.milestones_total
                )
            })
        }
        Command::Summary => {
            let summary = workflow.status_summary().await?;
            emit(out, json, &summary, |out| {
                for status in InvoiceStatus::ALL {
                    writeln!(out, "{:<15} {}", status.as_str(), summary.get(&status).unwrap_or(&0))?;
                }
                Ok(())
            })
        }
        Command::Audit { invoice, verify } => cmd_audit(workflow, *invoice, *verify, json, out).await,
    }
}

async fn cmd_quote_new<N: Notifier>(
    workflow: &CliWorkflow<N>,
    customer: &str,
    email: Option<String>,
    json: bool,
    out: &mut dyn Write,
) -> Result<u8> {
    if customer.trim().is_empty() {
        bail!("customer name must not be empty");
    }
    let quote = Quote::new(customer.trim(), email);
    workflow.store().save_quote(&quote).await?;
    tracing::info!(quote_id = %quote.id, customer = %quote.customer_name, "quote recorded");
    emit(out, json, &quote, |out| writeln!(out, "OK: quote {} recorded", quote.id))
}

async fn cmd_milestone<N: Notifier>(
    workflow: &CliWorkflow<N>,
    command: &MilestoneCommand,
    json: bool,
    out: &mut dyn Write,
) -> Result<u8> {
    match command {
        MilestoneCommand::Add {
            invoice,
            label,
            amount,
            due,
        } => {
            let target = workflow.invoice(*invoice).await?;
            if target.workflow_status.is_terminal() {
                bail!("invoice {invoice} is {}; no new milestones", target.workflow_status);
            }
            let amount = Money::from_cents(*amount)?;
            let mut milestone = Milestone::new(*invoice, label.as_str(), amount);
            if let Some(due) = due {
                milestone = milestone.with_due_date(*due);
            }
            workflow.store().save_milestone(&milestone).await?;
            tracing::info!(milestone_id = %milestone.id, invoice_id = %invoice, amount = %amount, "milestone added");
            emit(out, json, &milestone, |out| {
                writeln!(out, "OK: milestone {} ({}) added to invoice {invoice}", milestone.id, milestone.label)
            })
        }
        MilestoneCommand::Complete { id, actor } => {
            let report = workflow
                .complete_milestone(*id, *actor)
                .await
                .with_context(|| format!("completing milestone {id}"))?;
            emit(out, json, &report, |out| {
                if report.newly_completed {
                    writeln!(out, "OK: milestone {id} completed")?;
                } else {
                    writeln!(out, "milestone {id} was already completed")?;
                }
                match &report.payment {
                    InvoicePayment::Outstanding { completed, total } => {
                        writeln!(out, "  {completed}/{total} milestones completed")
                    }
                    InvoicePayment::AlreadyPaid => writeln!(out, "  invoice already paid"),
                    InvoicePayment::MarkedPaid { transition } => write_transition(out, transition),
                    InvoicePayment::Blocked { reason } => {
                        writeln!(out, "  all milestones completed but invoice not paid: {reason}")
                    }
                }
            })
        }
        MilestoneCommand::Set { id, status, actor } => {
            let milestone = workflow
                .set_milestone_status(*id, *status, *actor)
                .await
                .with_context(|| format!("moving milestone {id} to {status}"))?;
            emit(out, json, &milestone, |out| {
                writeln!(out, "OK: milestone {id} is {}", milestone.status)
            })
        }
    }
}

async fn cmd_audit<N: Notifier>(
    workflow: &CliWorkflow<N>,
    invoice: InvoiceId,
    verify: bool,
    json: bool,
    out: &mut dyn Write,
) -> Result<u8> {
    // Fail on an unknown invoice rather than printing an empty trail.
    workflow.invoice(invoice).await?;
    let trail = workflow.audit_trail(invoice).await?;
    let chain = if verify {
        Some(workflow.verify_audit(invoice).await?)
    } else {
        None
    };
    let code = u8::from(matches!(chain, Some(ChainStatus::Broken(_))));

    if json {
        let verdict = chain.as_ref().map(|c| match c {
            ChainStatus::Intact { records } => serde_json::json!({ "intact": true, "records": records }),
            ChainStatus::Broken(err) => serde_json::json!({ "intact": false, "error": err.to_string() }),
        });
        let body = serde_json::json!({ "records": trail, "verification": verdict });
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
        return Ok(code);
    }

    for record in &trail {
        let from = record.previous_status.map_or("-", |s| s.as_str());
        writeln!(
            out,
            "{}  {:>14} -> {:<14} by {:<8} {}",
            record.created_at,
            from,
            record.new_status.as_str(),
            record.actor.as_str(),
            record.reason.as_deref().unwrap_or("")
        )?;
    }
    match chain {
        Some(ChainStatus::Intact { records }) => writeln!(out, "OK: chain intact ({records} records)")?,
        Some(ChainStatus::Broken(err)) => writeln!(out, "BROKEN: {err}")?,
        None => {}
    }
    Ok(code)
}

fn write_transition(out: &mut dyn Write, report: &TransitionReport) -> std::io::Result<()> {
    writeln!(
        out,
        "OK: invoice {} {} -> {}",
        report.invoice.id,
        report.previous_status,
        report.new_status()
    )?;
    match &report.quote_sync {
        SideEffect::Applied(status) => writeln!(out, "  quote: {status}")?,
        SideEffect::Skipped => {}
        SideEffect::Failed(err) => writeln!(out, "  WARNING: quote sync failed: {err}")?,
    }
    match &report.notification {
        SideEffect::Applied(n) => writeln!(out, "  notified {}: {}", n.recipient, n.kind)?,
        SideEffect::Skipped => {}
        SideEffect::Failed(err) => writeln!(out, "  WARNING: notification failed: {err}")?,
    }
    if let SideEffect::Failed(err) = &report.audit {
        writeln!(out, "  WARNING: audit append failed: {err}")?;
    }
    match &report.settlement {
        SideEffect::Applied(paid) => {
            writeln!(out, "  all milestones completed; settling")?;
            write_transition(out, paid)?;
        }
        SideEffect::Skipped => {}
        SideEffect::Failed(err) => writeln!(out, "  WARNING: settlement failed: {err}")?,
    }
    Ok(())
}

fn emit<T, F>(out: &mut dyn Write, json: bool, value: &T, text: F) -> Result<u8>
where
    T: Serialize,
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    } else {
        text(out)?;
    }
    Ok(0)
}
