use std::path::PathBuf;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Config directory not found at {0}. Run 'timebill init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Failed to parse data file {path}: {source}")]
    DataParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to encode data file: {0}")]
    DataEncode(#[from] toml::ser::Error),

    #[error("Client '{0}' not found in clients.toml")]
    ClientNotFound(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Invalid time '{0}'. Expected 'YYYY-MM-DD HH:MM' or 'HH:MM'.")]
    InvalidTime(String),

    #[error("A session for '{client}' is already running (started {started})")]
    SessionAlreadyRunning { client: String, started: String },

    #[error("No session is currently running")]
    NoRunningSession,

    #[error("Stop time {stop} is before the session start {start}")]
    StopBeforeStart { start: String, stop: String },

    #[error("Session {0} not found")]
    SessionNotFound(u64),

    #[error("Expense {0} not found")]
    ExpenseNotFound(u64),

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Invoice '{0}' not found")]
    InvoiceNotFound(String),

    #[error("Invoice record {0} is missing from the data file")]
    InvoiceRecordNotFound(u64),

    #[error("Invalid invoice index '{0}'. Use 'timebill invoices' to see available invoices.")]
    InvalidInvoiceIndex(String),

    #[error("Invoice {0} is already fully paid")]
    AlreadyPaid(String),

    #[error("Payment would exceed the remaining balance on {invoice} (max ${max:.2} remaining)")]
    OverPayment { invoice: String, max: Decimal },

    #[error("Payment amount must not be negative")]
    NegativePaymentAmount,

    #[error("Invoice {0} has recorded payments. Remove them with 'timebill remove-payment' before regenerating.")]
    RegenerateWithPayments(String),

    #[error("No payments recorded for {0}")]
    NoPayments(String),

    #[error("Invalid payment index {index} for {invoice} (only {count} payment(s) recorded)")]
    InvalidPaymentIndex {
        invoice: String,
        index: usize,
        count: usize,
    },

    #[error("Invoice {invoice} is in an inconsistent state ({detail}). Manual reconciliation required.")]
    Inconsistent { invoice: String, detail: String },

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BillingError>;
