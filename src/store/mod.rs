mod file;

pub use file::{Counters, DataFile, FileStore};

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::billing::{PeriodKind, PeriodRange};
use crate::error::Result;

/// A block of tracked work. Running sessions have no `end_time` and are not
/// billable until stopped. `hourly_rate` and `rate_includes_gst` are
/// snapshots of the client config at the moment the session started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: u64,
    pub client: String,
    pub start_time: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<Decimal>,
    #[serde(default)]
    pub rate_includes_gst: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<u64>,
}

impl WorkSession {
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }
}

/// A billable out-of-pocket cost passed through to a client at face value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: u64,
    pub client: String,
    pub description: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<u64>,
}

/// A settled invoice row. The (client, period_type, period_start,
/// period_end) tuple is the idempotency key: at most one invoice exists
/// per client per period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: u64,
    pub client: String,
    pub number: String,
    pub period_type: PeriodKind,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub subtotal: Decimal,
    pub gst: Decimal,
    pub total: Decimal,
    pub generated_date: NaiveDate,
}

impl Invoice {
    pub fn period_range(&self) -> PeriodRange {
        PeriodRange {
            start: self.period_start,
            end: self.period_end,
        }
    }
}

/// Fields for an invoice about to be created; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub client: String,
    pub number: String,
    pub period_type: PeriodKind,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub subtotal: Decimal,
    pub gst: Decimal,
    pub total: Decimal,
    pub generated_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: u64,
    pub invoice_id: u64,
    pub amount: Decimal,
    pub paid_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn from_amounts(paid: Decimal, total: Decimal) -> PaymentStatus {
        if paid >= total {
            PaymentStatus::Paid
        } else if paid > Decimal::ZERO {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Partial => "PARTIAL",
            PaymentStatus::Paid => "PAID",
        };
        f.write_str(s)
    }
}

/// Storage boundary used by the billing engine. The production backend is
/// [`FileStore`]; tests substitute their own implementations.
///
/// Sessions are eligible for an invoice when they are stopped, unlinked,
/// belong to the client and started inside the period. Expenses are
/// eligible when unlinked and dated inside the period.
pub trait BillingStore: Send + Sync {
    fn unbilled_sessions(&self, client: &str, range: &PeriodRange) -> Result<Vec<WorkSession>>;

    fn unbilled_expenses(&self, client: &str, range: &PeriodRange) -> Result<Vec<Expense>>;

    /// Looks up the invoice for an exact (client, kind, range) tuple.
    fn find_invoice(
        &self,
        client: &str,
        kind: PeriodKind,
        range: &PeriodRange,
    ) -> Result<Option<Invoice>>;

    /// All invoices for a (kind, range) pair, optionally narrowed to one
    /// client. This is the scope of a regenerate run.
    fn invoices_matching(
        &self,
        kind: PeriodKind,
        range: &PeriodRange,
        client: Option<&str>,
    ) -> Result<Vec<Invoice>>;

    fn create_invoice(&mut self, invoice: NewInvoice) -> Result<Invoice>;

    fn delete_invoice(&mut self, invoice_id: u64) -> Result<()>;

    fn link_session(&mut self, session_id: u64, invoice_id: u64) -> Result<()>;

    fn link_expense(&mut self, expense_id: u64, invoice_id: u64) -> Result<()>;

    fn clear_session_links(&mut self, invoice_id: u64) -> Result<()>;

    fn clear_expense_links(&mut self, invoice_id: u64) -> Result<()>;

    fn sessions_for_invoice(&self, invoice_id: u64) -> Result<Vec<WorkSession>>;

    fn expenses_for_invoice(&self, invoice_id: u64) -> Result<Vec<Expense>>;

    fn invoice_by_id(&self, invoice_id: u64) -> Result<Invoice>;

    fn append_payment(
        &mut self,
        invoice_id: u64,
        amount: Decimal,
        paid_at: NaiveDateTime,
    ) -> Result<Payment>;

    fn payments_total(&self, invoice_id: u64) -> Result<Decimal>;
}
