pub mod billing;
pub mod config;
pub mod error;
pub mod pdf;
pub mod store;

pub use billing::{BillingEngine, ClientOutcome, GenerateSummary, PeriodKind, PeriodRange};
pub use config::{Client, Config, Retainer};
pub use error::{BillingError, Result};
pub use pdf::{InvoiceRenderer, TypstRenderer};
pub use store::{BillingStore, Expense, FileStore, Invoice, Payment, PaymentStatus, WorkSession};
