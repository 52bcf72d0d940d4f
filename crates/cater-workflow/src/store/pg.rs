//! Postgres [`WorkflowStore`] over sqlx.
//!
//! Statuses are stored as their snake_case names and parsed on the way
//! out; a row that does not parse is reported as [`StoreError::Corrupt`]
//! rather than defaulted. Schema lives in `migrations/`.

use std::str::FromStr;

use cater_core::{Actor, AuditRecordId, InvoiceId, MilestoneId, Money, QuoteId, Timestamp};
use cater_state::{InvoiceStatus, MilestoneStatus, QuoteStatus};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::WorkflowStore;
use crate::audit::AuditRecord;
use crate::error::StoreError;
use crate::model::{Invoice, LineItem, Milestone, Quote};

const INVOICE_COLUMNS: &str = "id, quote_id, invoice_number, workflow_status, line_items, \
     subtotal, tax_amount, total_amount, tax_rate_bps, due_date, last_status, \
     status_changed_by, status_changed_at, version, created_at, updated_at";

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply the embedded migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;
        tracing::info!("workflow database ready");
        Ok(Self { pool })
    }
}

fn corrupt(kind: &'static str, reason: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        kind,
        reason: reason.to_string(),
    }
}

fn parse<T: FromStr>(kind: &'static str, raw: &str) -> Result<T, StoreError>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| corrupt(kind, e))
}

fn money(kind: &'static str, cents: i64) -> Result<Money, StoreError> {
    Money::from_cents(cents).map_err(|e| corrupt(kind, e))
}

fn version_to_db(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| corrupt("invoice", format!("version {version} out of range")))
}

fn bps_to_db(bps: u32) -> Result<i32, StoreError> {
    i32::try_from(bps).map_err(|_| corrupt("invoice", format!("tax rate {bps} out of range")))
}

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    quote_id: Option<Uuid>,
    invoice_number: String,
    workflow_status: String,
    line_items: serde_json::Value,
    subtotal: i64,
    tax_amount: i64,
    total_amount: i64,
    tax_rate_bps: i32,
    due_date: Option<DateTime<Utc>>,
    last_status: Option<String>,
    status_changed_by: Option<String>,
    status_changed_at: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = StoreError;

    fn try_from(row: InvoiceRow) -> Result<Self, StoreError> {
        let line_items: Vec<LineItem> =
            serde_json::from_value(row.line_items).map_err(|e| corrupt("invoice", e))?;
        Ok(Invoice {
            id: InvoiceId::from_uuid(row.id),
            quote_id: row.quote_id.map(QuoteId::from_uuid),
            invoice_number: row.invoice_number,
            workflow_status: parse("invoice", &row.workflow_status)?,
            line_items,
            subtotal: money("invoice", row.subtotal)?,
            tax_amount: money("invoice", row.tax_amount)?,
            total_amount: money("invoice", row.total_amount)?,
            tax_rate_bps: u32::try_from(row.tax_rate_bps).map_err(|e| corrupt("invoice", e))?,
            due_date: row.due_date.map(Timestamp::from_utc),
            last_status: row
                .last_status
                .as_deref()
                .map(|s| parse::<InvoiceStatus>("invoice", s))
                .transpose()?,
            status_changed_by: row
                .status_changed_by
                .as_deref()
                .map(|s| parse::<Actor>("invoice", s))
                .transpose()?,
            status_changed_at: row.status_changed_at.map(Timestamp::from_utc),
            version: u64::try_from(row.version).map_err(|e| corrupt("invoice", e))?,
            created_at: Timestamp::from_utc(row.created_at),
            updated_at: Timestamp::from_utc(row.updated_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct QuoteRow {
    id: Uuid,
    customer_name: String,
    contact_email: Option<String>,
    status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = StoreError;

    fn try_from(row: QuoteRow) -> Result<Self, StoreError> {
        Ok(Quote {
            id: QuoteId::from_uuid(row.id),
            customer_name: row.customer_name,
            contact_email: row.contact_email,
            status: parse::<QuoteStatus>("quote", &row.status)?,
            updated_at: Timestamp::from_utc(row.updated_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct MilestoneRow {
    id: Uuid,
    invoice_id: Uuid,
    label: String,
    amount: i64,
    due_date: Option<DateTime<Utc>>,
    status: String,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<MilestoneRow> for Milestone {
    type Error = StoreError;

    fn try_from(row: MilestoneRow) -> Result<Self, StoreError> {
        Ok(Milestone {
            id: MilestoneId::from_uuid(row.id),
            invoice_id: InvoiceId::from_uuid(row.invoice_id),
            label: row.label,
            amount: money("milestone", row.amount)?,
            due_date: row.due_date.map(Timestamp::from_utc),
            status: parse::<MilestoneStatus>("milestone", &row.status)?,
            completed_at: row.completed_at.map(Timestamp::from_utc),
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    invoice_id: Uuid,
    previous_status: Option<String>,
    new_status: String,
    actor: String,
    reason: Option<String>,
    created_at: DateTime<Utc>,
    previous_hash: String,
    record_hash: String,
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, StoreError> {
        Ok(AuditRecord {
            id: AuditRecordId::from_uuid(row.id),
            invoice_id: InvoiceId::from_uuid(row.invoice_id),
            previous_status: row
                .previous_status
                .as_deref()
                .map(|s| parse::<InvoiceStatus>("audit", s))
                .transpose()?,
            new_status: parse("audit", &row.new_status)?,
            actor: parse("audit", &row.actor)?,
            reason: row.reason,
            created_at: Timestamp::from_utc(row.created_at),
            previous_hash: row.previous_hash,
            record_hash: row.record_hash,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

impl PgStore {
    async fn write_invoice(
        &self,
        invoice: &Invoice,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let line_items =
            serde_json::to_value(&invoice.line_items).map_err(|e| corrupt("invoice", e))?;
        let mut sql = String::from(
            "UPDATE invoices SET quote_id = $2, invoice_number = $3, workflow_status = $4,
             line_items = $5, subtotal = $6, tax_amount = $7, total_amount = $8,
             tax_rate_bps = $9, due_date = $10, last_status = $11, status_changed_by = $12,
             status_changed_at = $13, version = $14, updated_at = $15
             WHERE id = $1",
        );
        if expected_version.is_some() {
            sql.push_str(" AND version = $16");
        }
        let mut query = sqlx::query(&sql)
            .bind(*invoice.id.as_uuid())
            .bind(invoice.quote_id.map(|q| *q.as_uuid()))
            .bind(&invoice.invoice_number)
            .bind(invoice.workflow_status.as_str())
            .bind(&line_items)
            .bind(invoice.subtotal.cents())
            .bind(invoice.tax_amount.cents())
            .bind(invoice.total_amount.cents())
            .bind(bps_to_db(invoice.tax_rate_bps)?)
            .bind(invoice.due_date.map(|d| *d.as_datetime()))
            .bind(invoice.last_status.map(|s| s.as_str()))
            .bind(invoice.status_changed_by.map(|a| a.as_str()))
            .bind(invoice.status_changed_at.map(|t| *t.as_datetime()))
            .bind(version_to_db(invoice.version)?)
            .bind(*invoice.updated_at.as_datetime());
        if let Some(expected) = expected_version {
            query = query.bind(version_to_db(expected)?);
        }
        Ok(query.execute(&self.pool).await?.rows_affected())
    }

    async fn stored_version(&self, id: InvoiceId) -> Result<Option<u64>, StoreError> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM invoices WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        version
            .map(|v| u64::try_from(v).map_err(|e| corrupt("invoice", e)))
            .transpose()
    }
}

impl WorkflowStore for PgStore {
    async fn fetch_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1");
        sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Invoice::try_from)
            .transpose()
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), StoreError> {
        let line_items =
            serde_json::to_value(&invoice.line_items).map_err(|e| corrupt("invoice", e))?;
        let sql = format!(
            "INSERT INTO invoices ({INVOICE_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (id) DO NOTHING"
        );
        let inserted = sqlx::query(&sql)
            .bind(*invoice.id.as_uuid())
            .bind(invoice.quote_id.map(|q| *q.as_uuid()))
            .bind(&invoice.invoice_number)
            .bind(invoice.workflow_status.as_str())
            .bind(&line_items)
            .bind(invoice.subtotal.cents())
            .bind(invoice.tax_amount.cents())
            .bind(invoice.total_amount.cents())
            .bind(bps_to_db(invoice.tax_rate_bps)?)
            .bind(invoice.due_date.map(|d| *d.as_datetime()))
            .bind(invoice.last_status.map(|s| s.as_str()))
            .bind(invoice.status_changed_by.map(|a| a.as_str()))
            .bind(invoice.status_changed_at.map(|t| *t.as_datetime()))
            .bind(version_to_db(invoice.version)?)
            .bind(*invoice.created_at.as_datetime())
            .bind(*invoice.updated_at.as_datetime())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if inserted == 0 {
            return Err(StoreError::Duplicate {
                kind: "invoice",
                id: invoice.id.to_string(),
            });
        }
        Ok(())
    }

    async fn save_invoice(&self, invoice: &Invoice) -> Result<(), StoreError> {
        if self.write_invoice(invoice, None).await? == 0 {
            return Err(StoreError::Missing {
                kind: "invoice",
                id: invoice.id.to_string(),
            });
        }
        Ok(())
    }

    async fn compare_and_save_invoice(
        &self,
        invoice: &Invoice,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        if self.write_invoice(invoice, Some(expected_version)).await? > 0 {
            return Ok(());
        }
        match self.stored_version(invoice.id).await? {
            Some(found) => Err(StoreError::VersionMismatch {
                id: invoice.id,
                expected: expected_version,
                found,
            }),
            None => Err(StoreError::Missing {
                kind: "invoice",
                id: invoice.id.to_string(),
            }),
        }
    }

    async fn invoices_with_status(
        &self,
        statuses: &[InvoiceStatus],
    ) -> Result<Vec<Invoice>, StoreError> {
        let names: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices
             WHERE workflow_status = ANY($1) ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(&names)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn invoice_for_quote(&self, quote_id: QuoteId) -> Result<Option<Invoice>, StoreError> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE quote_id = $1");
        sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(*quote_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Invoice::try_from)
            .transpose()
    }

    async fn fetch_quote(&self, id: QuoteId) -> Result<Option<Quote>, StoreError> {
        sqlx::query_as::<_, QuoteRow>(
            "SELECT id, customer_name, contact_email, status, updated_at
             FROM quotes WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(Quote::try_from)
        .transpose()
    }

    async fn save_quote(&self, quote: &Quote) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO quotes (id, customer_name, contact_email, status, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET customer_name = EXCLUDED.customer_name,
               contact_email = EXCLUDED.contact_email, status = EXCLUDED.status,
               updated_at = EXCLUDED.updated_at",
        )
        .bind(*quote.id.as_uuid())
        .bind(&quote.customer_name)
        .bind(&quote.contact_email)
        .bind(quote.status.as_str())
        .bind(*quote.updated_at.as_datetime())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_milestone(&self, id: MilestoneId) -> Result<Option<Milestone>, StoreError> {
        sqlx::query_as::<_, MilestoneRow>(
            "SELECT id, invoice_id, label, amount, due_date, status, completed_at
             FROM payment_milestones WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(Milestone::try_from)
        .transpose()
    }

    async fn save_milestone(&self, milestone: &Milestone) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO payment_milestones (id, invoice_id, label, amount, due_date, status, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET label = EXCLUDED.label, amount = EXCLUDED.amount,
               due_date = EXCLUDED.due_date, status = EXCLUDED.status,
               completed_at = EXCLUDED.completed_at",
        )
        .bind(*milestone.id.as_uuid())
        .bind(*milestone.invoice_id.as_uuid())
        .bind(&milestone.label)
        .bind(milestone.amount.cents())
        .bind(milestone.due_date.map(|d| *d.as_datetime()))
        .bind(milestone.status.as_str())
        .bind(milestone.completed_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn milestones_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Milestone>, StoreError> {
        let rows = sqlx::query_as::<_, MilestoneRow>(
            "SELECT id, invoice_id, label, amount, due_date, status, completed_at
             FROM payment_milestones WHERE invoice_id = $1
             ORDER BY due_date NULLS FIRST, id",
        )
        .bind(*invoice_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO invoice_audit (id, invoice_id, previous_status, new_status, actor,
             reason, created_at, previous_hash, record_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(*record.id.as_uuid())
        .bind(*record.invoice_id.as_uuid())
        .bind(record.previous_status.map(|s| s.as_str()))
        .bind(record.new_status.as_str())
        .bind(record.actor.as_str())
        .bind(&record.reason)
        .bind(*record.created_at.as_datetime())
        .bind(&record.previous_hash)
        .bind(&record.record_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn audit_trail(&self, invoice_id: InvoiceId) -> Result<Vec<AuditRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, invoice_id, previous_status, new_status, actor, reason, created_at,
             previous_hash, record_hash
             FROM invoice_audit WHERE invoice_id = $1 ORDER BY seq",
        )
        .bind(*invoice_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn latest_audit(&self, invoice_id: InvoiceId) -> Result<Option<AuditRecord>, StoreError> {
        sqlx::query_as::<_, AuditRow>(
            "SELECT id, invoice_id, previous_status, new_status, actor, reason, created_at,
             previous_hash, record_hash
             FROM invoice_audit WHERE invoice_id = $1 ORDER BY seq DESC LIMIT 1",
        )
        .bind(*invoice_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(AuditRecord::try_from)
        .transpose()
    }
}
