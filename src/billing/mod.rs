pub mod calc;
pub mod engine;
pub mod period;

pub use calc::{
    format_amount, round_money, session_hours, settle_period, split_inclusive, PeriodTotals,
    SessionLine,
};
pub use engine::{
    invoice_number, BillingEngine, ClientOutcome, DocExpense, DocRetainer, DocSession,
    GenerateSummary, InvoiceDocument, PaymentReceipt,
};
pub use period::{range_for, PeriodKind, PeriodRange};
