use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    BillingStore, Expense, Invoice, NewInvoice, Payment, PeriodKind, PeriodRange, WorkSession,
};
use crate::error::{BillingError, Result};

/// On-disk shape of billing.toml.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DataFile {
    #[serde(default)]
    pub counters: Counters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sessions: Vec<WorkSession>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expenses: Vec<Expense>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invoices: Vec<Invoice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counters {
    pub next_session: u64,
    pub next_expense: u64,
    pub next_invoice: u64,
    pub next_payment: u64,
}

impl Default for Counters {
    fn default() -> Self {
        Counters {
            next_session: 1,
            next_expense: 1,
            next_invoice: 1,
            next_payment: 1,
        }
    }
}

/// TOML-backed store. Every mutation rewrites the whole file; writes go to
/// a sibling temp file first so a failed write never truncates the data.
pub struct FileStore {
    path: PathBuf,
    data: DataFile,
}

impl FileStore {
    /// Load billing.toml, or start empty if it does not exist yet.
    pub fn load(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content).map_err(|e| BillingError::DataParse {
                path: path.clone(),
                source: e,
            })?
        } else {
            DataFile::default()
        };
        Ok(FileStore { path, data })
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.data)?;
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn sessions(&self) -> &[WorkSession] {
        &self.data.sessions
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.data.expenses
    }

    pub fn invoices(&self) -> &[Invoice] {
        &self.data.invoices
    }

    pub fn running_session(&self) -> Option<&WorkSession> {
        self.data.sessions.iter().find(|s| s.is_running())
    }

    pub fn invoice_by_number(&self, number: &str) -> Option<&Invoice> {
        self.data.invoices.iter().find(|i| i.number == number)
    }

    pub fn payments_for(&self, invoice_id: u64) -> Vec<Payment> {
        self.data
            .payments
            .iter()
            .filter(|p| p.invoice_id == invoice_id)
            .cloned()
            .collect()
    }

    /// Start the timer. Only one session may run at a time, regardless of
    /// client.
    pub fn start_session(
        &mut self,
        client: &str,
        rate: Option<Decimal>,
        rate_includes_gst: bool,
        description: Option<String>,
        at: NaiveDateTime,
    ) -> Result<WorkSession> {
        if let Some(running) = self.running_session() {
            return Err(BillingError::SessionAlreadyRunning {
                client: running.client.clone(),
                started: running.start_time.to_string(),
            });
        }
        let id = self.data.counters.next_session;
        self.data.counters.next_session += 1;
        let session = WorkSession {
            id,
            client: client.to_string(),
            start_time: at,
            end_time: None,
            hourly_rate: rate,
            rate_includes_gst,
            description,
            invoice_id: None,
        };
        self.data.sessions.push(session.clone());
        self.save()?;
        Ok(session)
    }

    pub fn stop_session(&mut self, at: NaiveDateTime) -> Result<WorkSession> {
        let session = match self.data.sessions.iter_mut().find(|s| s.is_running()) {
            Some(s) => s,
            None => return Err(BillingError::NoRunningSession),
        };
        if at < session.start_time {
            return Err(BillingError::StopBeforeStart {
                start: session.start_time.to_string(),
                stop: at.to_string(),
            });
        }
        session.end_time = Some(at);
        let stopped = session.clone();
        self.save()?;
        Ok(stopped)
    }

    pub fn add_expense(
        &mut self,
        client: &str,
        amount: Decimal,
        description: &str,
        date: NaiveDate,
    ) -> Result<Expense> {
        if amount <= Decimal::ZERO {
            return Err(BillingError::NonPositiveAmount);
        }
        let id = self.data.counters.next_expense;
        self.data.counters.next_expense += 1;
        let expense = Expense {
            id,
            client: client.to_string(),
            description: description.to_string(),
            amount,
            expense_date: date,
            invoice_id: None,
        };
        self.data.expenses.push(expense.clone());
        self.save()?;
        Ok(expense)
    }

    /// Remove the `index`-th payment (1-based) recorded against an invoice.
    pub fn remove_payment(
        &mut self,
        invoice_number: &str,
        invoice_id: u64,
        index: usize,
    ) -> Result<Payment> {
        let indices: Vec<usize> = self
            .data
            .payments
            .iter()
            .enumerate()
            .filter(|(_, p)| p.invoice_id == invoice_id)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            return Err(BillingError::NoPayments(invoice_number.to_string()));
        }
        if index == 0 || index > indices.len() {
            return Err(BillingError::InvalidPaymentIndex {
                invoice: invoice_number.to_string(),
                index,
                count: indices.len(),
            });
        }
        let removed = self.data.payments.remove(indices[index - 1]);
        self.save()?;
        Ok(removed)
    }
}

impl BillingStore for FileStore {
    fn unbilled_sessions(&self, client: &str, range: &PeriodRange) -> Result<Vec<WorkSession>> {
        Ok(self
            .data
            .sessions
            .iter()
            .filter(|s| {
                s.client == client
                    && !s.is_running()
                    && s.invoice_id.is_none()
                    && range.contains(s.start_time)
            })
            .cloned()
            .collect())
    }

    fn unbilled_expenses(&self, client: &str, range: &PeriodRange) -> Result<Vec<Expense>> {
        Ok(self
            .data
            .expenses
            .iter()
            .filter(|e| {
                e.client == client
                    && e.invoice_id.is_none()
                    && e.expense_date >= range.start_date()
                    && e.expense_date <= range.end_date()
            })
            .cloned()
            .collect())
    }

    fn find_invoice(
        &self,
        client: &str,
        kind: PeriodKind,
        range: &PeriodRange,
    ) -> Result<Option<Invoice>> {
        Ok(self
            .data
            .invoices
            .iter()
            .find(|i| {
                i.client == client
                    && i.period_type == kind
                    && i.period_start == range.start
                    && i.period_end == range.end
            })
            .cloned())
    }

    fn invoices_matching(
        &self,
        kind: PeriodKind,
        range: &PeriodRange,
        client: Option<&str>,
    ) -> Result<Vec<Invoice>> {
        Ok(self
            .data
            .invoices
            .iter()
            .filter(|i| {
                i.period_type == kind
                    && i.period_start == range.start
                    && i.period_end == range.end
                    && client.map_or(true, |c| i.client == c)
            })
            .cloned()
            .collect())
    }

    fn create_invoice(&mut self, invoice: NewInvoice) -> Result<Invoice> {
        let id = self.data.counters.next_invoice;
        self.data.counters.next_invoice += 1;
        let row = Invoice {
            id,
            client: invoice.client,
            number: invoice.number,
            period_type: invoice.period_type,
            period_start: invoice.period_start,
            period_end: invoice.period_end,
            subtotal: invoice.subtotal,
            gst: invoice.gst,
            total: invoice.total,
            generated_date: invoice.generated_date,
        };
        self.data.invoices.push(row.clone());
        self.save()?;
        Ok(row)
    }

    fn delete_invoice(&mut self, invoice_id: u64) -> Result<()> {
        let before = self.data.invoices.len();
        self.data.invoices.retain(|i| i.id != invoice_id);
        if self.data.invoices.len() == before {
            return Err(BillingError::InvoiceRecordNotFound(invoice_id));
        }
        self.save()
    }

    fn link_session(&mut self, session_id: u64, invoice_id: u64) -> Result<()> {
        match self.data.sessions.iter_mut().find(|s| s.id == session_id) {
            Some(s) => {
                s.invoice_id = Some(invoice_id);
                self.save()
            }
            None => Err(BillingError::SessionNotFound(session_id)),
        }
    }

    fn link_expense(&mut self, expense_id: u64, invoice_id: u64) -> Result<()> {
        match self.data.expenses.iter_mut().find(|e| e.id == expense_id) {
            Some(e) => {
                e.invoice_id = Some(invoice_id);
                self.save()
            }
            None => Err(BillingError::ExpenseNotFound(expense_id)),
        }
    }

    fn clear_session_links(&mut self, invoice_id: u64) -> Result<()> {
        for s in self.data.sessions.iter_mut() {
            if s.invoice_id == Some(invoice_id) {
                s.invoice_id = None;
            }
        }
        self.save()
    }

    fn clear_expense_links(&mut self, invoice_id: u64) -> Result<()> {
        for e in self.data.expenses.iter_mut() {
            if e.invoice_id == Some(invoice_id) {
                e.invoice_id = None;
            }
        }
        self.save()
    }

    fn sessions_for_invoice(&self, invoice_id: u64) -> Result<Vec<WorkSession>> {
        Ok(self
            .data
            .sessions
            .iter()
            .filter(|s| s.invoice_id == Some(invoice_id))
            .cloned()
            .collect())
    }

    fn expenses_for_invoice(&self, invoice_id: u64) -> Result<Vec<Expense>> {
        Ok(self
            .data
            .expenses
            .iter()
            .filter(|e| e.invoice_id == Some(invoice_id))
            .cloned()
            .collect())
    }

    fn invoice_by_id(&self, invoice_id: u64) -> Result<Invoice> {
        self.data
            .invoices
            .iter()
            .find(|i| i.id == invoice_id)
            .cloned()
            .ok_or(BillingError::InvoiceRecordNotFound(invoice_id))
    }

    fn append_payment(
        &mut self,
        invoice_id: u64,
        amount: Decimal,
        paid_at: NaiveDateTime,
    ) -> Result<Payment> {
        if !self.data.invoices.iter().any(|i| i.id == invoice_id) {
            return Err(BillingError::InvoiceRecordNotFound(invoice_id));
        }
        let id = self.data.counters.next_payment;
        self.data.counters.next_payment += 1;
        let payment = Payment {
            id,
            invoice_id,
            amount,
            paid_at,
        };
        self.data.payments.push(payment.clone());
        self.save()?;
        Ok(payment)
    }

    fn payments_total(&self, invoice_id: u64) -> Result<Decimal> {
        Ok(self
            .data
            .payments
            .iter()
            .filter(|p| p.invoice_id == invoice_id)
            .map(|p| p.amount)
            .sum())
    }
}
