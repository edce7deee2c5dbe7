use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tempfile::TempDir;

use timebill::billing::InvoiceDocument;
use timebill::config::{BillingSettings, Business, PdfSettings};
use timebill::{
    BillingEngine, BillingError, Client, ClientOutcome, Config, FileStore, GenerateSummary,
    Invoice, InvoiceRenderer, PaymentStatus, PeriodKind, Retainer,
};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dt(d: NaiveDate, hour: u32) -> NaiveDateTime {
    d.and_hms_opt(hour, 0, 0).unwrap()
}

fn test_config(dir: &TempDir, gst_registered: bool) -> Config {
    Config {
        business: Business {
            name: "Jo Bloggs Consulting".to_string(),
            address: "1 Example Street".to_string(),
            city: "Melbourne".to_string(),
            state: "VIC".to_string(),
            postcode: "3000".to_string(),
            country: "Australia".to_string(),
            email: "jo@example.com".to_string(),
            abn: Some("12 345 678 901".to_string()),
            phone: None,
        },
        billing: BillingSettings {
            gst_registered,
            currency: "AUD".to_string(),
            currency_symbol: "$".to_string(),
        },
        pdf: PdfSettings {
            output_dir: dir.path().join("output").to_string_lossy().into_owned(),
        },
    }
}

fn client(rate: &str) -> Client {
    Client {
        name: "Acme Pty Ltd".to_string(),
        rate: dec(rate),
        rate_includes_gst: false,
        retainer: None,
        email: None,
        address: None,
        city: None,
        state: None,
        postcode: None,
    }
}

fn client_with_retainer(rate: &str, fee: &str, hours: &str) -> Client {
    Client {
        retainer: Some(Retainer {
            amount: dec(fee),
            hours: dec(hours),
            basis: PeriodKind::Week,
        }),
        ..client(rate)
    }
}

fn open_store(dir: &TempDir) -> FileStore {
    FileStore::load(dir.path().join("billing.toml")).unwrap()
}

fn record_session(
    store: &mut FileStore,
    client: &str,
    rate: &str,
    start: NaiveDateTime,
    hours: i64,
) -> u64 {
    let session = store
        .start_session(client, Some(dec(rate)), false, None, start)
        .unwrap();
    store.stop_session(start + Duration::hours(hours)).unwrap();
    session.id
}

fn generated_invoice(summary: &GenerateSummary) -> &Invoice {
    match &summary.outcomes[0] {
        ClientOutcome::Generated { invoice, .. } => invoice,
        other => panic!("expected a generated invoice, got {other:?}"),
    }
}

/// Captures every document handed to it so tests can assert on the final
/// rendered content without a Typst binary.
#[derive(Default)]
struct RecordingRenderer {
    documents: RefCell<Vec<RenderedDoc>>,
}

struct RenderedDoc {
    number: String,
    subtotal: String,
    gst: Option<String>,
    total: String,
    session_count: usize,
    retainer: Option<String>,
}

impl RecordingRenderer {
    fn rendered_numbers(&self) -> Vec<String> {
        self.documents
            .borrow()
            .iter()
            .map(|d| d.number.clone())
            .collect()
    }
}

impl InvoiceRenderer for RecordingRenderer {
    fn render(&self, document: &InvoiceDocument, output_dir: &Path) -> timebill::Result<PathBuf> {
        self.documents.borrow_mut().push(RenderedDoc {
            number: document.number.clone(),
            subtotal: document.subtotal.clone(),
            gst: document.gst.clone(),
            total: document.total.clone(),
            session_count: document.sessions.len(),
            retainer: document.retainer.as_ref().map(|r| r.description.clone()),
        });
        Ok(output_dir.join(format!("{}.pdf", document.number)))
    }
}

/// Fails for one client's invoices, succeeds for everyone else.
struct FlakyRenderer;

impl InvoiceRenderer for FlakyRenderer {
    fn render(&self, document: &InvoiceDocument, output_dir: &Path) -> timebill::Result<PathBuf> {
        if document.number.starts_with("acme") {
            return Err(BillingError::PdfGeneration("missing font".to_string()));
        }
        Ok(output_dir.join(format!("{}.pdf", document.number)))
    }
}

// The week of Monday 2026-08-24; the 26th is a Wednesday inside it.
const ANCHOR: (i32, u32, u32) = (2026, 8, 26);

fn anchor() -> NaiveDate {
    date(ANCHOR.0, ANCHOR.1, ANCHOR.2)
}

#[test]
fn generate_creates_an_invoice_with_linked_items() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);
    store
        .add_expense("acme", dec("50.00"), "Domain renewal", date(2026, 8, 25))
        .unwrap();

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();

    assert_eq!(summary.range.start_date(), date(2026, 8, 24));
    assert_eq!(summary.range.end_date(), date(2026, 8, 30));
    assert_eq!(summary.generated_count(), 1);

    let invoice = generated_invoice(&summary);
    assert_eq!(invoice.number, "acme-week-2026-08-24");
    assert_eq!(invoice.subtotal, dec("250.00"));
    assert_eq!(invoice.gst, dec("25.00"));
    assert_eq!(invoice.total, dec("275.00"));

    // Session and expense are now attached to the invoice
    assert_eq!(store.sessions()[0].invoice_id, Some(invoice.id));
    assert_eq!(store.expenses()[0].invoice_id, Some(invoice.id));

    let docs = renderer.documents.borrow();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].subtotal, "$250.00");
    assert_eq!(docs[0].gst.as_deref(), Some("$25.00"));
    assert_eq!(docs[0].total, "$275.00");
    assert_eq!(docs[0].session_count, 1);
}

#[test]
fn totals_round_where_the_invoice_is_cut() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("99.99"))]);
    let mut store = open_store(&dir);

    // 1.5 h at 99.99 = 149.985: subtotal and GST round separately, so the
    // total is 149.99 + 15.00 rather than a rounding of the raw 164.9835.
    let start = dt(date(2026, 8, 24), 9);
    store
        .start_session("acme", Some(dec("99.99")), false, None, start)
        .unwrap();
    store
        .stop_session(start + Duration::minutes(90))
        .unwrap();

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();

    let invoice = generated_invoice(&summary);
    assert_eq!(invoice.subtotal, dec("149.99"));
    assert_eq!(invoice.gst, dec("15.00"));
    assert_eq!(invoice.total, dec("164.99"));
}

#[test]
fn generate_twice_reuses_the_existing_invoice() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);

    let renderer = RecordingRenderer::default();
    let first = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    let first_id = generated_invoice(&first).id;

    let second = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();

    match &second.outcomes[0] {
        ClientOutcome::Reused { invoice, .. } => assert_eq!(invoice.id, first_id),
        other => panic!("expected the invoice to be reused, got {other:?}"),
    }
    assert_eq!(second.generated_count(), 0);
    assert_eq!(store.invoices().len(), 1);

    // Both runs rendered the same document
    assert_eq!(
        renderer.rendered_numbers(),
        vec!["acme-week-2026-08-24", "acme-week-2026-08-24"]
    );
}

#[test]
fn late_work_stays_unbilled_until_regenerate() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);

    let renderer = RecordingRenderer::default();
    let first = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    let first_id = generated_invoice(&first).id;

    // Forgot a session; it lands in the already-billed period
    let late = record_session(&mut store, "acme", "100", dt(date(2026, 8, 25), 14), 3);

    let reused = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    assert!(matches!(
        reused.outcomes[0],
        ClientOutcome::Reused { .. }
    ));
    let late_session = store.sessions().iter().find(|s| s.id == late).unwrap();
    assert_eq!(late_session.invoice_id, None);

    // Regenerate rebuilds the invoice and sweeps the late session in
    let rebuilt = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .regenerate(PeriodKind::Week, anchor(), None)
        .unwrap();
    let invoice = generated_invoice(&rebuilt);
    assert_ne!(invoice.id, first_id);
    assert_eq!(invoice.subtotal, dec("500.00"));
    assert_eq!(invoice.total, dec("550.00"));
    assert_eq!(store.invoices().len(), 1);
    assert!(store
        .sessions()
        .iter()
        .all(|s| s.invoice_id == Some(invoice.id)));
}

#[test]
fn regenerate_refuses_an_invoice_with_payments() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    let invoice_id = generated_invoice(&summary).id;

    BillingEngine::new(&config, &clients, &mut store, &renderer)
        .pay(invoice_id, Some(dec("100")), None)
        .unwrap();

    let result = BillingEngine::new(&config, &clients, &mut store, &renderer).regenerate(
        PeriodKind::Week,
        anchor(),
        None,
    );
    match result {
        Err(BillingError::RegenerateWithPayments(number)) => {
            assert_eq!(number, "acme-week-2026-08-24")
        }
        other => panic!("expected a refusal, got {other:?}"),
    }

    // Nothing was voided
    assert_eq!(store.invoices().len(), 1);
    assert_eq!(store.sessions()[0].invoice_id, Some(invoice_id));
    assert_eq!(store.payments_for(invoice_id).len(), 1);
}

#[test]
fn work_outside_the_period_is_not_swept() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);
    // Next Monday, and an expense dated past the period end
    let outside = record_session(&mut store, "acme", "100", dt(date(2026, 8, 31), 9), 4);
    store
        .add_expense("acme", dec("80.00"), "Train ticket", date(2026, 8, 31))
        .unwrap();

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();

    let invoice = generated_invoice(&summary);
    assert_eq!(invoice.total, dec("220.00"));
    let outside_session = store.sessions().iter().find(|s| s.id == outside).unwrap();
    assert_eq!(outside_session.invoice_id, None);
    assert_eq!(store.expenses()[0].invoice_id, None);
}

#[test]
fn zero_value_period_is_skipped() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    // Tracked without a rate snapshot, so there is nothing worth invoicing
    let start = dt(date(2026, 8, 24), 9);
    store
        .start_session("acme", None, false, None, start)
        .unwrap();
    store.stop_session(start + Duration::hours(2)).unwrap();

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), Some("acme"))
        .unwrap();

    assert!(matches!(summary.outcomes[0], ClientOutcome::Skipped { .. }));
    assert!(store.invoices().is_empty());
    assert_eq!(store.sessions()[0].invoice_id, None);
    assert!(renderer.rendered_numbers().is_empty());
}

#[test]
fn retainer_only_invoice_needs_an_explicit_client() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([(
        "acme".to_string(),
        client_with_retainer("100", "500", "10"),
    )]);
    let mut store = open_store(&dir);

    // No work at all this week. A batch run skips the client.
    let renderer = RecordingRenderer::default();
    let batch = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    assert!(matches!(batch.outcomes[0], ClientOutcome::Skipped { .. }));
    assert!(store.invoices().is_empty());

    // Naming the client still bills the retainer fee
    let explicit = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), Some("acme"))
        .unwrap();
    let invoice = generated_invoice(&explicit);
    assert_eq!(invoice.subtotal, dec("500.00"));
    assert_eq!(invoice.gst, dec("50.00"));
    assert_eq!(invoice.total, dec("550.00"));

    let docs = renderer.documents.borrow();
    assert_eq!(docs.len(), 1);
    assert_eq!(
        docs[0].retainer.as_deref(),
        Some("Week retainer (first 10.00 h included)")
    );
    assert_eq!(docs[0].session_count, 0);
}

#[test]
fn retainer_covers_hours_before_any_billing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([(
        "acme".to_string(),
        client_with_retainer("100", "500", "10"),
    )]);
    let mut store = open_store(&dir);

    // 12 h against a 10 h allowance: fee 500 plus 2 h at 100
    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 6), 12);

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();

    let invoice = generated_invoice(&summary);
    assert_eq!(invoice.subtotal, dec("700.00"));
    assert_eq!(invoice.gst, dec("70.00"));
    assert_eq!(invoice.total, dec("770.00"));
}

#[test]
fn unregistered_business_invoices_without_gst() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, false);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();

    let invoice = generated_invoice(&summary);
    assert_eq!(invoice.subtotal, dec("200.00"));
    assert_eq!(invoice.gst, Decimal::ZERO);
    assert_eq!(invoice.total, dec("200.00"));

    let docs = renderer.documents.borrow();
    assert_eq!(docs[0].gst, None);
    assert_eq!(docs[0].total, "$200.00");
}

#[test]
fn partial_payment_then_the_balance() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    let invoice_id = generated_invoice(&summary).id;

    let receipt = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .pay(invoice_id, Some(dec("100")), None)
        .unwrap();
    assert_eq!(receipt.status, PaymentStatus::Partial);
    assert_eq!(receipt.total_paid, dec("100"));

    // No amount means "whatever is left"
    let receipt = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .pay(invoice_id, None, None)
        .unwrap();
    assert_eq!(receipt.payment.amount, dec("120.00"));
    assert_eq!(receipt.status, PaymentStatus::Paid);
    assert_eq!(receipt.total_paid, dec("220.00"));
    assert_eq!(store.payments_for(invoice_id).len(), 2);
}

#[test]
fn zero_amount_settles_the_remaining_balance() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    let invoice_id = generated_invoice(&summary).id;

    let receipt = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .pay(invoice_id, Some(Decimal::ZERO), None)
        .unwrap();
    assert_eq!(receipt.payment.amount, dec("220.00"));
    assert_eq!(receipt.status, PaymentStatus::Paid);
}

#[test]
fn overpayment_is_rejected_without_recording() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    let invoice_id = generated_invoice(&summary).id;

    let result =
        BillingEngine::new(&config, &clients, &mut store, &renderer).pay(invoice_id, Some(dec("300")), None);
    match result {
        Err(BillingError::OverPayment { max, .. }) => assert_eq!(max, dec("220.00")),
        other => panic!("expected an overpayment error, got {other:?}"),
    }
    assert!(store.payments_for(invoice_id).is_empty());

    let result = BillingEngine::new(&config, &clients, &mut store, &renderer).pay(
        invoice_id,
        Some(dec("-10")),
        None,
    );
    assert!(matches!(
        result,
        Err(BillingError::NegativePaymentAmount)
    ));
    assert!(store.payments_for(invoice_id).is_empty());
}

#[test]
fn paying_a_settled_invoice_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    let invoice_id = generated_invoice(&summary).id;

    BillingEngine::new(&config, &clients, &mut store, &renderer)
        .pay(invoice_id, None, None)
        .unwrap();

    let result =
        BillingEngine::new(&config, &clients, &mut store, &renderer).pay(invoice_id, Some(dec("1")), None);
    match result {
        Err(BillingError::AlreadyPaid(number)) => assert_eq!(number, "acme-week-2026-08-24"),
        other => panic!("expected an already-paid error, got {other:?}"),
    }
}

#[test]
fn payment_date_lands_at_noon() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    let invoice_id = generated_invoice(&summary).id;

    let receipt = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .pay(invoice_id, Some(dec("50")), Some(date(2026, 9, 1)))
        .unwrap();
    assert_eq!(receipt.payment.paid_at, dt(date(2026, 9, 1), 12));
}

#[test]
fn one_failing_client_does_not_abort_the_batch() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([
        ("acme".to_string(), client("100")),
        ("globex".to_string(), client("120")),
    ]);
    let mut store = open_store(&dir);

    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);
    record_session(&mut store, "globex", "120", dt(date(2026, 8, 25), 9), 3);

    let summary = BillingEngine::new(&config, &clients, &mut store, &FlakyRenderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    assert_eq!(summary.generated_count(), 1);
    assert_eq!(summary.failed_count(), 1);
    assert!(matches!(
        summary.outcomes[0],
        ClientOutcome::Failed { ref client, .. } if client == "acme"
    ));
    assert!(matches!(
        summary.outcomes[1],
        ClientOutcome::Generated { ref client, .. } if client == "globex"
    ));

    // The failed render left the invoice row behind, so the next run just
    // re-renders it instead of duplicating anything.
    assert_eq!(store.invoices().len(), 2);
    let renderer = RecordingRenderer::default();
    let retry = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    assert!(retry
        .outcomes
        .iter()
        .all(|o| matches!(o, ClientOutcome::Reused { .. })));
    assert_eq!(store.invoices().len(), 2);
}

#[test]
fn unknown_client_filter_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let mut store = open_store(&dir);

    let renderer = RecordingRenderer::default();
    let result = BillingEngine::new(&config, &clients, &mut store, &renderer).generate(
        PeriodKind::Week,
        anchor(),
        Some("nobody"),
    );
    assert!(matches!(result, Err(BillingError::ClientNotFound(_))));

    let result = BillingEngine::new(&config, &clients, &mut store, &renderer).regenerate(
        PeriodKind::Week,
        anchor(),
        Some("nobody"),
    );
    assert!(matches!(result, Err(BillingError::ClientNotFound(_))));
}

#[test]
fn store_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, true);
    let clients = BTreeMap::from([("acme".to_string(), client("100"))]);
    let path = dir.path().join("billing.toml");

    let mut store = FileStore::load(path.clone()).unwrap();
    record_session(&mut store, "acme", "100", dt(date(2026, 8, 24), 9), 2);
    store
        .add_expense("acme", dec("50.00"), "Domain renewal", date(2026, 8, 25))
        .unwrap();

    let renderer = RecordingRenderer::default();
    let summary = BillingEngine::new(&config, &clients, &mut store, &renderer)
        .generate(PeriodKind::Week, anchor(), None)
        .unwrap();
    let invoice_id = generated_invoice(&summary).id;
    BillingEngine::new(&config, &clients, &mut store, &renderer)
        .pay(invoice_id, Some(dec("100")), Some(date(2026, 9, 1)))
        .unwrap();
    drop(store);

    let store = FileStore::load(path).unwrap();
    assert_eq!(store.sessions().len(), 1);
    assert_eq!(store.expenses().len(), 1);
    assert_eq!(store.invoices().len(), 1);

    let invoice = &store.invoices()[0];
    assert_eq!(invoice.id, invoice_id);
    assert_eq!(invoice.number, "acme-week-2026-08-24");
    assert_eq!(invoice.period_type, PeriodKind::Week);
    assert_eq!(invoice.total, dec("275.00"));

    let payments = store.payments_for(invoice_id);
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount, dec("100"));
    assert_eq!(payments[0].paid_at, dt(date(2026, 9, 1), 12));
    assert_eq!(store.sessions()[0].invoice_id, Some(invoice_id));
}
