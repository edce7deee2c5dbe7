use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Duration, Local, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;

use super::calc::{self, PeriodTotals};
use super::period::{range_for, PeriodKind, PeriodRange};
use crate::config::{expand_path, Business, Client, Config, Retainer};
use crate::error::{BillingError, Result};
use crate::pdf::InvoiceRenderer;
use crate::store::{BillingStore, Expense, Invoice, NewInvoice, Payment, PaymentStatus};

/// Render-ready invoice content. All amounts are pre-formatted strings so
/// the renderer never does arithmetic of its own.
#[derive(Debug, Serialize)]
pub struct InvoiceDocument {
    pub number: String,
    pub business: Business,
    pub client: Client,
    pub period_kind: String,
    pub period_label: String,
    pub generated_date: String,
    pub currency: String,
    pub currency_symbol: String,
    pub sessions: Vec<DocSession>,
    pub expenses: Vec<DocExpense>,
    pub retainer: Option<DocRetainer>,
    pub subtotal: String,
    pub gst: Option<String>,
    pub total: String,
}

#[derive(Debug, Serialize)]
pub struct DocSession {
    pub date: String,
    pub description: String,
    pub hours: String,
    pub rate: String,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct DocExpense {
    pub date: String,
    pub description: String,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct DocRetainer {
    pub description: String,
    pub amount: String,
}

/// What happened to one client during a generate or regenerate run.
#[derive(Debug)]
pub enum ClientOutcome {
    Generated {
        client: String,
        invoice: Invoice,
        artifact: PathBuf,
    },
    /// An invoice for this exact period already existed; it was re-rendered
    /// from its linked items and nothing else changed.
    Reused {
        client: String,
        invoice: Invoice,
        artifact: PathBuf,
    },
    Skipped {
        client: String,
    },
    Failed {
        client: String,
        error: BillingError,
    },
}

#[derive(Debug)]
pub struct GenerateSummary {
    pub range: PeriodRange,
    pub outcomes: Vec<ClientOutcome>,
}

impl GenerateSummary {
    pub fn generated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ClientOutcome::Generated { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ClientOutcome::Failed { .. }))
            .count()
    }
}

#[derive(Debug)]
pub struct PaymentReceipt {
    pub invoice: Invoice,
    pub payment: Payment,
    pub total_paid: Decimal,
    pub status: PaymentStatus,
}

/// Invoice numbers name the client, cadence and period start so files sort
/// and read well in a directory listing: acme-week-2026-08-24.
pub fn invoice_number(client: &str, kind: PeriodKind, period_start: NaiveDate) -> String {
    format!(
        "{}-{}-{}",
        sanitize_token(client),
        kind,
        period_start.format("%Y-%m-%d")
    )
}

fn sanitize_token(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.trim_matches('-').is_empty() {
        "client".to_string()
    } else {
        cleaned
    }
}

/// Drives invoice generation, regeneration and payments against a storage
/// backend and a renderer. One client failing never aborts the others.
pub struct BillingEngine<'a> {
    config: &'a Config,
    clients: &'a BTreeMap<String, Client>,
    store: &'a mut dyn BillingStore,
    renderer: &'a dyn InvoiceRenderer,
}

impl<'a> BillingEngine<'a> {
    pub fn new(
        config: &'a Config,
        clients: &'a BTreeMap<String, Client>,
        store: &'a mut dyn BillingStore,
        renderer: &'a dyn InvoiceRenderer,
    ) -> Self {
        BillingEngine {
            config,
            clients,
            store,
            renderer,
        }
    }

    /// Generate invoices for the period containing `anchor`. Without a
    /// client filter every configured client is considered; with one, only
    /// that client. Running twice over the same period reuses the existing
    /// invoices instead of creating duplicates.
    pub fn generate(
        &mut self,
        kind: PeriodKind,
        anchor: NaiveDate,
        only: Option<&str>,
    ) -> Result<GenerateSummary> {
        let range = range_for(kind, anchor);
        let targets = self.targets(only)?;
        let explicit = only.is_some();

        let mut outcomes = Vec::with_capacity(targets.len());
        for (key, client) in targets {
            let outcome = self
                .generate_for_client(&key, &client, kind, &range, explicit)
                .unwrap_or_else(|error| ClientOutcome::Failed {
                    client: key.clone(),
                    error,
                });
            outcomes.push(outcome);
        }
        Ok(GenerateSummary { range, outcomes })
    }

    /// Throw away and rebuild the invoices for a period, picking up
    /// sessions and expenses recorded after the originals were cut.
    /// Invoices with payments are refused before anything is touched.
    pub fn regenerate(
        &mut self,
        kind: PeriodKind,
        anchor: NaiveDate,
        only: Option<&str>,
    ) -> Result<GenerateSummary> {
        let range = range_for(kind, anchor);
        if let Some(key) = only {
            if !self.clients.contains_key(key) {
                return Err(BillingError::ClientNotFound(key.to_string()));
            }
        }

        let existing = self.store.invoices_matching(kind, &range, only)?;
        for invoice in &existing {
            if self.store.payments_total(invoice.id)? > Decimal::ZERO {
                return Err(BillingError::RegenerateWithPayments(invoice.number.clone()));
            }
        }
        for invoice in &existing {
            self.void_invoice(invoice)?;
        }

        self.generate(kind, anchor, only)
    }

    /// Record a payment. `amount` of zero (or none) settles the remaining
    /// balance; anything above the balance is rejected without writing.
    pub fn pay(
        &mut self,
        invoice_id: u64,
        amount: Option<Decimal>,
        date: Option<NaiveDate>,
    ) -> Result<PaymentReceipt> {
        let invoice = self.store.invoice_by_id(invoice_id)?;
        let paid = self.store.payments_total(invoice_id)?;
        let remaining = invoice.total - paid;
        if remaining <= Decimal::ZERO {
            return Err(BillingError::AlreadyPaid(invoice.number));
        }

        let amount = match amount {
            Some(a) if a < Decimal::ZERO => return Err(BillingError::NegativePaymentAmount),
            Some(a) if a > remaining => {
                return Err(BillingError::OverPayment {
                    invoice: invoice.number,
                    max: calc::round_money(remaining),
                })
            }
            Some(a) if a > Decimal::ZERO => a,
            _ => remaining,
        };

        let paid_at = date
            .unwrap_or_else(|| Local::now().date_naive())
            .and_time(NaiveTime::MIN + Duration::hours(12));
        let payment = self.store.append_payment(invoice_id, amount, paid_at)?;
        let total_paid = paid + amount;
        let status = PaymentStatus::from_amounts(total_paid, invoice.total);
        Ok(PaymentReceipt {
            invoice,
            payment,
            total_paid,
            status,
        })
    }

    fn targets(&self, only: Option<&str>) -> Result<Vec<(String, Client)>> {
        match only {
            Some(key) => {
                let client = self
                    .clients
                    .get(key)
                    .ok_or_else(|| BillingError::ClientNotFound(key.to_string()))?;
                Ok(vec![(key.to_string(), client.clone())])
            }
            None => Ok(self
                .clients
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
        }
    }

    fn generate_for_client(
        &mut self,
        key: &str,
        client: &Client,
        kind: PeriodKind,
        range: &PeriodRange,
        explicit: bool,
    ) -> Result<ClientOutcome> {
        // The (client, kind, range) tuple has at most one invoice. Hitting
        // it again re-renders from the linked items; new work stays
        // unbilled until a regenerate.
        if let Some(existing) = self.store.find_invoice(key, kind, range)? {
            let artifact = self.render_existing(&existing, client)?;
            return Ok(ClientOutcome::Reused {
                client: key.to_string(),
                invoice: existing,
                artifact,
            });
        }

        let sessions = self.store.unbilled_sessions(key, range)?;
        let expenses = self.store.unbilled_expenses(key, range)?;
        let retainer = client.retainer.as_ref().filter(|r| r.applies_to(kind));

        // A batch run skips clients with nothing to bill. Naming a client
        // explicitly still cuts a retainer-only invoice.
        if sessions.is_empty() && expenses.is_empty() && !(explicit && retainer.is_some()) {
            return Ok(ClientOutcome::Skipped {
                client: key.to_string(),
            });
        }

        let totals = calc::settle_period(
            &sessions,
            &expenses,
            retainer,
            self.config.billing.gst_registered,
        );
        // Zero-value periods (all rates unset, zero-length sessions) leave
        // their items unbilled rather than producing a $0.00 invoice.
        if totals.subtotal <= Decimal::ZERO && totals.retainer_fee <= Decimal::ZERO {
            return Ok(ClientOutcome::Skipped {
                client: key.to_string(),
            });
        }
        let subtotal = calc::round_money(totals.subtotal);
        let gst = calc::round_money(totals.gst);

        let invoice = self.store.create_invoice(NewInvoice {
            client: key.to_string(),
            number: invoice_number(key, kind, range.start_date()),
            period_type: kind,
            period_start: range.start,
            period_end: range.end,
            subtotal,
            gst,
            total: subtotal + gst,
            generated_date: Local::now().date_naive(),
        })?;
        for session in &sessions {
            self.store.link_session(session.id, invoice.id)?;
        }
        for expense in &expenses {
            self.store.link_expense(expense.id, invoice.id)?;
        }

        let document = self.build_document(&invoice, client, retainer, &totals, &expenses);
        let artifact = self.renderer.render(&document, &self.output_dir())?;
        Ok(ClientOutcome::Generated {
            client: key.to_string(),
            invoice,
            artifact,
        })
    }

    fn render_existing(&mut self, invoice: &Invoice, client: &Client) -> Result<PathBuf> {
        let sessions = self.store.sessions_for_invoice(invoice.id)?;
        let expenses = self.store.expenses_for_invoice(invoice.id)?;
        let retainer = client
            .retainer
            .as_ref()
            .filter(|r| r.applies_to(invoice.period_type));
        let totals = calc::settle_period(
            &sessions,
            &expenses,
            retainer,
            self.config.billing.gst_registered,
        );
        let document = self.build_document(invoice, client, retainer, &totals, &expenses);
        self.renderer.render(&document, &self.output_dir())
    }

    fn void_invoice(&mut self, invoice: &Invoice) -> Result<()> {
        self.store.clear_session_links(invoice.id)?;
        self.store.clear_expense_links(invoice.id).map_err(|e| {
            BillingError::Inconsistent {
                invoice: invoice.number.clone(),
                detail: format!("session links cleared but expense links were not: {e}"),
            }
        })?;
        self.store.delete_invoice(invoice.id).map_err(|e| {
            BillingError::Inconsistent {
                invoice: invoice.number.clone(),
                detail: format!("links cleared but the invoice row remains: {e}"),
            }
        })?;
        Ok(())
    }

    fn output_dir(&self) -> PathBuf {
        expand_path(&self.config.pdf.output_dir)
    }

    fn build_document(
        &self,
        invoice: &Invoice,
        client: &Client,
        retainer: Option<&Retainer>,
        totals: &PeriodTotals,
        expenses: &[Expense],
    ) -> InvoiceDocument {
        let symbol = &self.config.billing.currency_symbol;
        let money = |amount: Decimal| format!("{symbol}{}", calc::format_amount(amount));

        let sessions = totals
            .lines
            .iter()
            .map(|line| {
                let mut description = line
                    .session
                    .description
                    .clone()
                    .unwrap_or_else(|| "Work session".to_string());
                if line.covered_hours > Decimal::ZERO {
                    description.push_str(&format!(
                        " ({:.2} h covered by retainer)",
                        line.covered_hours.round_dp(2)
                    ));
                }
                DocSession {
                    date: line.session.start_time.format("%Y-%m-%d").to_string(),
                    description,
                    hours: format!("{:.2}", line.hours.round_dp(2)),
                    rate: money(line.rate),
                    amount: money(line.amount),
                }
            })
            .collect();

        let expenses = expenses
            .iter()
            .map(|e| DocExpense {
                date: e.expense_date.format("%Y-%m-%d").to_string(),
                description: e.description.clone(),
                amount: money(e.amount),
            })
            .collect();

        let retainer = retainer.map(|r| DocRetainer {
            description: format!(
                "{} retainer (first {:.2} h included)",
                capitalize(&invoice.period_type.to_string()),
                r.hours.round_dp(2)
            ),
            amount: money(r.amount),
        });

        let gst = if self.config.billing.gst_registered {
            Some(money(invoice.gst))
        } else {
            None
        };

        InvoiceDocument {
            number: invoice.number.clone(),
            business: self.config.business.clone(),
            client: client.clone(),
            period_kind: invoice.period_type.to_string(),
            period_label: format!(
                "{} to {}",
                invoice.period_start.format("%-d %B %Y"),
                invoice.period_end.format("%-d %B %Y")
            ),
            generated_date: invoice.generated_date.format("%-d %B %Y").to_string(),
            currency: self.config.billing.currency.clone(),
            currency_symbol: symbol.clone(),
            sessions,
            expenses,
            retainer,
            subtotal: money(invoice.subtotal),
            gst,
            total: money(invoice.total),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
