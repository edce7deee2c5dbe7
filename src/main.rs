mod billing;
mod config;
mod error;
mod pdf;
mod store;

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use clap::{Parser, Subcommand};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tabled::{settings::Style, Table, Tabled};

use crate::billing::{format_amount, session_hours, BillingEngine, ClientOutcome, PeriodKind};
use crate::config::{
    config_dir, data_file, load_clients, load_config, CLIENTS_TEMPLATE, CONFIG_TEMPLATE,
};
use crate::error::{BillingError, Result};
use crate::pdf::TypstRenderer;
use crate::store::{FileStore, Invoice, PaymentStatus};

#[derive(Parser)]
#[command(name = "timebill")]
#[command(version, about = "Freelance time tracking and invoicing", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.timebill or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// Start the timer for a client
    Start {
        /// Client identifier from clients.toml
        client: String,

        /// What this session is about
        #[arg(short, long)]
        description: Option<String>,

        /// Start time ('YYYY-MM-DD HH:MM' or 'HH:MM', default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Stop the running timer
    Stop {
        /// Stop time ('YYYY-MM-DD HH:MM' or 'HH:MM', default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// List tracked sessions
    Sessions {
        /// Only show sessions for this client
        #[arg(short, long)]
        client: Option<String>,
    },

    /// Record a billable expense
    Expense {
        /// Client identifier from clients.toml
        client: String,

        /// Amount in dollars
        amount: Decimal,

        /// What was bought
        description: String,

        /// Expense date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List recorded expenses
    Expenses {
        /// Only show expenses for this client
        #[arg(short, long)]
        client: Option<String>,
    },

    /// Generate invoices for a billing period
    Generate {
        /// Billing period kind
        #[arg(short, long, value_enum, default_value_t = PeriodKind::Week)]
        period: PeriodKind,

        /// Any date inside the period (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<String>,

        /// Only this client (also allows a retainer-only invoice)
        #[arg(short, long)]
        client: Option<String>,
    },

    /// Rebuild a period's invoices, picking up late-recorded work
    Regenerate {
        /// Billing period kind
        #[arg(short, long, value_enum, default_value_t = PeriodKind::Week)]
        period: PeriodKind,

        /// Any date inside the period (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<String>,

        /// Only this client
        #[arg(short, long)]
        client: Option<String>,
    },

    /// Record a payment against an invoice
    Pay {
        /// Invoice number or index from 'invoices' (e.g., 1 or acme-week-2026-08-24)
        invoice: String,

        /// Amount to pay (omitted or 0 settles the remaining balance)
        amount: Option<Decimal>,

        /// Payment date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Remove a payment from an invoice
    RemovePayment {
        /// Invoice number or index from 'invoices' (e.g., 1 or acme-week-2026-08-24)
        invoice: String,

        /// 1-based index of payment to remove (default: last)
        #[arg(long)]
        index: Option<usize>,
    },

    /// Show payment history for an invoice
    Payments {
        /// Invoice number or index from 'invoices' (e.g., 1 or acme-week-2026-08-24)
        invoice: String,
    },

    /// List generated invoices
    Invoices {
        /// Number of invoices to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List configured clients
    Clients,

    /// Show tracking and billing status
    Status,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Start {
            client,
            description,
            at,
        } => cmd_start(&cfg_dir, &client, description, at),
        Commands::Stop { at } => cmd_stop(&cfg_dir, at),
        Commands::Sessions { client } => cmd_sessions(&cfg_dir, client),
        Commands::Expense {
            client,
            amount,
            description,
            date,
        } => cmd_expense(&cfg_dir, &client, amount, &description, date),
        Commands::Expenses { client } => cmd_expenses(&cfg_dir, client),
        Commands::Generate {
            period,
            date,
            client,
        } => cmd_generate(&cfg_dir, period, date, client, false),
        Commands::Regenerate {
            period,
            date,
            client,
        } => cmd_generate(&cfg_dir, period, date, client, true),
        Commands::Pay {
            invoice,
            amount,
            date,
        } => cmd_pay(&cfg_dir, &invoice, amount, date),
        Commands::RemovePayment { invoice, index } => {
            cmd_remove_payment(&cfg_dir, &invoice, index)
        }
        Commands::Payments { invoice } => cmd_payments(&cfg_dir, &invoice),
        Commands::Invoices { limit } => cmd_invoices(&cfg_dir, limit),
        Commands::Clients => cmd_clients(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &PathBuf) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(BillingError::AlreadyInitialized(cfg_dir.clone()));
    }

    // Create directories
    fs::create_dir_all(cfg_dir)?;
    fs::create_dir_all(cfg_dir.join("output"))?;

    // Write template files
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(cfg_dir.join("clients.toml"), CLIENTS_TEMPLATE)?;

    println!("Initialized timebill config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your business details:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Add your clients:            $EDITOR {}/clients.toml",
        cfg_dir.display()
    );
    println!();
    println!("Then start tracking:");
    println!("  timebill start <client-id>");
    println!("  timebill stop");
    println!("  timebill generate --period week");

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "#")]
    id: u64,
    #[tabled(rename = "CLIENT")]
    client: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "START")]
    start: String,
    #[tabled(rename = "END")]
    end: String,
    #[tabled(rename = "HOURS")]
    hours: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct ExpenseRow {
    #[tabled(rename = "#")]
    id: u64,
    #[tabled(rename = "CLIENT")]
    client: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "PERIOD")]
    period: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "CLIENT")]
    client: String,
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "RATE")]
    rate: String,
    #[tabled(rename = "RETAINER")]
    retainer: String,
}

#[derive(Tabled)]
struct PaymentRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
}

fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| BillingError::InvalidDate(s.to_string()))
}

/// Parse a --at argument: a full timestamp, or a bare time taken as today.
fn parse_at(s: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        return Ok(dt);
    }
    if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M") {
        return Ok(Local::now().date_naive().and_time(t));
    }
    Err(BillingError::InvalidTime(s.to_string()))
}

fn format_whole_money(value: Decimal, currency_symbol: &str) -> String {
    let rounded = value
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0);
    format!("{}{:>6}", currency_symbol, format_grouped_int(rounded))
}

fn format_grouped_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

fn add_financial_footer(table: &str, total: &str, paid: &str, outstanding: &str) -> String {
    let lines: Vec<&str> = table.lines().collect();
    if lines.len() < 4 {
        return table.to_string();
    }

    // Parse the top border to discover column widths
    let top = lines[0];
    let Some(inner) = top.strip_prefix('╭').and_then(|s| s.strip_suffix('╮')) else {
        return table.to_string();
    };

    let widths: Vec<usize> = inner.split('┬').map(|p| p.chars().count()).collect();
    if widths.len() < 6 {
        return table.to_string();
    }

    // Merge columns #, NUMBER, PERIOD into one label cell; keep TOTAL; drop STATUS and CLIENT
    let left_width = widths[0] + widths[1] + widths[2] + 2; // +2 for the two ┴ replaced by spaces
    let total_width = widths[3];
    let status_width = widths[4];
    let client_width = widths[5];

    let rows = [
        ("TOTAL", total),
        ("(-) PAID", paid),
        ("(=) OUTSTANDING", outstanding),
    ];

    // Strip the original bottom border and start building
    let mut out = lines[..lines.len() - 1].join("\n");
    out.push('\n');

    // First separator: merge left 3 columns, keep TOTAL, close off STATUS+CLIENT
    out.push_str(&format!(
        "├{}┴{}┴{}┼{}┼{}┴{}╯\n",
        "─".repeat(widths[0]),
        "─".repeat(widths[1]),
        "─".repeat(widths[2]),
        "─".repeat(total_width),
        "─".repeat(status_width),
        "─".repeat(client_width),
    ));

    // Summary rows with separators between them
    for (idx, (label, value)) in rows.iter().enumerate() {
        out.push_str(&format!(
            "│ {:>left$} │ {:>total$} │\n",
            label,
            value,
            left = left_width - 2,
            total = total_width - 2
        ));
        if idx < rows.len() - 1 {
            out.push_str(&format!(
                "├{}┼{}┤\n",
                "─".repeat(left_width),
                "─".repeat(total_width)
            ));
        }
    }

    // Bottom border
    out.push_str(&format!(
        "╰{}┴{}╯",
        "─".repeat(left_width),
        "─".repeat(total_width)
    ));

    out
}

/// Start the timer for a client
fn cmd_start(
    cfg_dir: &PathBuf,
    client_id: &str,
    description: Option<String>,
    at: Option<String>,
) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let clients = load_clients(cfg_dir)?;
    let client = clients
        .get(client_id)
        .ok_or_else(|| BillingError::ClientNotFound(client_id.to_string()))?;

    let start = match at {
        Some(s) => parse_at(&s)?,
        None => now_local(),
    };

    let mut store = FileStore::load(data_file(cfg_dir))?;
    let session = store.start_session(
        client_id,
        Some(client.rate),
        client.rate_includes_gst,
        description,
        start,
    )?;

    println!(
        "Started session #{} for {} ({}) at {}",
        session.id,
        client_id,
        client.name,
        session.start_time.format("%Y-%m-%d %H:%M")
    );
    println!(
        "  Rate: {}{}/h",
        config.billing.currency_symbol,
        format_amount(client.rate)
    );

    Ok(())
}

/// Stop the running timer
fn cmd_stop(cfg_dir: &PathBuf, at: Option<String>) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let stop = match at {
        Some(s) => parse_at(&s)?,
        None => now_local(),
    };

    let mut store = FileStore::load(data_file(cfg_dir))?;
    let session = store.stop_session(stop)?;
    let hours = session_hours(&session);

    println!(
        "Stopped session #{} for {}: {:.2} h ({} to {})",
        session.id,
        session.client,
        hours.round_dp(2),
        session.start_time.format("%H:%M"),
        stop.format("%H:%M")
    );

    Ok(())
}

/// List tracked sessions
fn cmd_sessions(cfg_dir: &PathBuf, client: Option<String>) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let store = FileStore::load(data_file(cfg_dir))?;
    let numbers: HashMap<u64, String> = store
        .invoices()
        .iter()
        .map(|i| (i.id, i.number.clone()))
        .collect();

    let sessions: Vec<_> = store
        .sessions()
        .iter()
        .filter(|s| client.as_deref().map_or(true, |c| s.client == c))
        .collect();

    if sessions.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }

    let rows: Vec<SessionRow> = sessions
        .iter()
        .map(|s| SessionRow {
            id: s.id,
            client: s.client.clone(),
            date: s.start_time.format("%Y-%m-%d").to_string(),
            start: s.start_time.format("%H:%M").to_string(),
            end: match s.end_time {
                Some(t) => t.format("%H:%M").to_string(),
                None => "-".to_string(),
            },
            hours: format!("{:.2}", session_hours(s).round_dp(2)),
            status: match (s.is_running(), s.invoice_id) {
                (true, _) => "running".to_string(),
                (false, None) => "unbilled".to_string(),
                (false, Some(id)) => numbers.get(&id).cloned().unwrap_or_else(|| "billed".to_string()),
            },
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    let unbilled: Decimal = sessions
        .iter()
        .filter(|s| !s.is_running() && s.invoice_id.is_none())
        .map(|s| session_hours(s))
        .sum();
    println!();
    println!(
        "Total: {} session(s), {:.2} h unbilled",
        sessions.len(),
        unbilled.round_dp(2)
    );

    Ok(())
}

/// Record a billable expense
fn cmd_expense(
    cfg_dir: &PathBuf,
    client_id: &str,
    amount: Decimal,
    description: &str,
    date: Option<String>,
) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let clients = load_clients(cfg_dir)?;
    if !clients.contains_key(client_id) {
        return Err(BillingError::ClientNotFound(client_id.to_string()));
    }

    let date = match date {
        Some(s) => parse_date(&s)?,
        None => Local::now().date_naive(),
    };

    let mut store = FileStore::load(data_file(cfg_dir))?;
    let expense = store.add_expense(client_id, amount, description, date)?;

    println!(
        "Recorded {}{} expense for {} on {} ({})",
        config.billing.currency_symbol,
        format_amount(expense.amount),
        client_id,
        expense.expense_date,
        description
    );

    Ok(())
}

/// List recorded expenses
fn cmd_expenses(cfg_dir: &PathBuf, client: Option<String>) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let store = FileStore::load(data_file(cfg_dir))?;
    let numbers: HashMap<u64, String> = store
        .invoices()
        .iter()
        .map(|i| (i.id, i.number.clone()))
        .collect();

    let expenses: Vec<_> = store
        .expenses()
        .iter()
        .filter(|e| client.as_deref().map_or(true, |c| e.client == c))
        .collect();

    if expenses.is_empty() {
        println!("No expenses recorded yet.");
        return Ok(());
    }

    let rows: Vec<ExpenseRow> = expenses
        .iter()
        .map(|e| ExpenseRow {
            id: e.id,
            client: e.client.clone(),
            date: e.expense_date.to_string(),
            amount: format!("{}{}", config.billing.currency_symbol, format_amount(e.amount)),
            description: e.description.clone(),
            status: match e.invoice_id {
                None => "unbilled".to_string(),
                Some(id) => numbers.get(&id).cloned().unwrap_or_else(|| "billed".to_string()),
            },
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// Generate (or regenerate) invoices for a billing period
fn cmd_generate(
    cfg_dir: &PathBuf,
    period: PeriodKind,
    date: Option<String>,
    client: Option<String>,
    rebuild: bool,
) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let clients = load_clients(cfg_dir)?;
    let anchor = match date {
        Some(s) => parse_date(&s)?,
        None => Local::now().date_naive(),
    };

    let mut store = FileStore::load(data_file(cfg_dir))?;
    let renderer = TypstRenderer;
    let mut engine = BillingEngine::new(&config, &clients, &mut store, &renderer);

    let summary = if rebuild {
        engine.regenerate(period, anchor, client.as_deref())?
    } else {
        engine.generate(period, anchor, client.as_deref())?
    };

    println!(
        "Billing period: {} to {} ({})",
        summary.range.start_date(),
        summary.range.end_date(),
        period
    );
    println!();

    let symbol = &config.billing.currency_symbol;
    let generated = summary.generated_count();
    let mut first_error: Option<BillingError> = None;
    for outcome in summary.outcomes {
        match outcome {
            ClientOutcome::Generated {
                client,
                invoice,
                artifact,
            } => {
                println!(
                    "Generated {} for {}: {}{}",
                    invoice.number,
                    client,
                    symbol,
                    format_amount(invoice.total)
                );
                println!("  Saved: {}", artifact.display());
            }
            ClientOutcome::Reused {
                client, invoice, ..
            } => {
                println!(
                    "Invoice {} already covers this period for {} (re-rendered)",
                    invoice.number, client
                );
            }
            ClientOutcome::Skipped { client } => {
                println!("Nothing to bill for {client}");
            }
            ClientOutcome::Failed { client, error } => {
                eprintln!("Failed for {client}: {error}");
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    println!();
    println!("Generated {generated} invoice(s)");

    // A run for one named client should fail loudly, not just log
    if client.is_some() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    Ok(())
}

/// Resolve an invoice reference to the stored invoice.
/// Accepts either an index (1-based) from 'invoices' or the full number.
fn resolve_invoice(store: &FileStore, reference: &str) -> Result<Invoice> {
    // Try to parse as an index first
    if let Ok(idx) = reference.parse::<usize>() {
        if idx == 0 {
            return Err(BillingError::InvalidInvoiceIndex(reference.to_string()));
        }
        // Invoices are displayed in reverse order (newest first), 1-indexed
        let invoices: Vec<&Invoice> = store.invoices().iter().rev().collect();
        if idx > invoices.len() {
            return Err(BillingError::InvalidInvoiceIndex(reference.to_string()));
        }
        return Ok(invoices[idx - 1].clone());
    }

    // Otherwise, treat as an invoice number
    store
        .invoice_by_number(reference)
        .cloned()
        .ok_or_else(|| BillingError::InvoiceNotFound(reference.to_string()))
}

/// Record a payment against an invoice
fn cmd_pay(
    cfg_dir: &PathBuf,
    invoice_ref: &str,
    amount: Option<Decimal>,
    date: Option<String>,
) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let clients = load_clients(cfg_dir)?;
    let date = date.map(|s| parse_date(&s)).transpose()?;

    let mut store = FileStore::load(data_file(cfg_dir))?;
    let invoice = resolve_invoice(&store, invoice_ref)?;

    let renderer = TypstRenderer;
    let mut engine = BillingEngine::new(&config, &clients, &mut store, &renderer);
    let receipt = engine.pay(invoice.id, amount, date)?;

    let symbol = &config.billing.currency_symbol;
    match receipt.status {
        PaymentStatus::Paid => println!(
            "Recorded {}{} payment for {} (fully paid)",
            symbol,
            format_amount(receipt.payment.amount),
            receipt.invoice.number
        ),
        _ => println!(
            "Recorded {}{} payment for {} ({}{} remaining)",
            symbol,
            format_amount(receipt.payment.amount),
            receipt.invoice.number,
            symbol,
            format_amount(receipt.invoice.total - receipt.total_paid)
        ),
    }

    Ok(())
}

/// Remove a payment from an invoice
fn cmd_remove_payment(cfg_dir: &PathBuf, invoice_ref: &str, index: Option<usize>) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let mut store = FileStore::load(data_file(cfg_dir))?;
    let invoice = resolve_invoice(&store, invoice_ref)?;

    // Default to the most recent payment
    let index = match index {
        Some(i) => i,
        None => store.payments_for(invoice.id).len(),
    };
    let removed = store.remove_payment(&invoice.number, invoice.id, index)?;

    println!(
        "Removed {}{} payment from {}",
        config.billing.currency_symbol,
        format_amount(removed.amount),
        invoice.number
    );

    Ok(())
}

/// Show payment history for an invoice
fn cmd_payments(cfg_dir: &PathBuf, invoice_ref: &str) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let store = FileStore::load(data_file(cfg_dir))?;
    let invoice = resolve_invoice(&store, invoice_ref)?;
    let payments = store.payments_for(invoice.id);

    println!("Payments for {}", invoice.number);

    if payments.is_empty() {
        println!("  No payments recorded.");
    } else {
        let rows: Vec<PaymentRow> = payments
            .iter()
            .enumerate()
            .map(|(idx, p)| PaymentRow {
                index: idx + 1,
                date: p.paid_at.format("%Y-%m-%d").to_string(),
                amount: format!(
                    "{}{}",
                    config.billing.currency_symbol,
                    format_amount(p.amount)
                ),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    let paid: Decimal = payments.iter().map(|p| p.amount).sum();
    println!(
        "Total paid: {}{} / {}{} (Status: {})",
        config.billing.currency_symbol,
        format_amount(paid),
        config.billing.currency_symbol,
        format_amount(invoice.total),
        PaymentStatus::from_amounts(paid, invoice.total)
    );

    Ok(())
}

/// List generated invoices with three-way status (UNPAID / PARTIAL / PAID)
fn cmd_invoices(cfg_dir: &PathBuf, limit: Option<usize>) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let store = FileStore::load(data_file(cfg_dir))?;

    if store.invoices().is_empty() {
        println!("No invoices generated yet.");
        return Ok(());
    }

    let invoices: Vec<_> = store.invoices().iter().rev().enumerate().collect();
    let invoices = match limit {
        Some(n) => &invoices[..n.min(invoices.len())],
        None => &invoices[..],
    };

    // Derive status from payment records
    let rows: Vec<InvoiceRow> = invoices
        .iter()
        .map(|(idx, inv)| {
            let paid: Decimal = store.payments_for(inv.id).iter().map(|p| p.amount).sum();
            InvoiceRow {
                index: idx + 1,
                number: inv.number.clone(),
                period: format!("{} {}", inv.period_type, inv.period_start.format("%Y-%m-%d")),
                total: format_whole_money(inv.total, &config.billing.currency_symbol),
                status: PaymentStatus::from_amounts(paid, inv.total).to_string(),
                client: inv.client.clone(),
            }
        })
        .collect();

    // Financial summary uses actual payment amounts
    let shown_total: Decimal = invoices.iter().map(|(_, inv)| inv.total).sum();
    let shown_paid: Decimal = invoices
        .iter()
        .map(|(_, inv)| {
            store
                .payments_for(inv.id)
                .iter()
                .map(|p| p.amount)
                .sum::<Decimal>()
        })
        .sum();
    let shown_outstanding = shown_total - shown_paid;

    let table = Table::new(rows).with(Style::rounded()).to_string();
    let total_amount = format_whole_money(shown_total, &config.billing.currency_symbol);
    let paid_amount = format_whole_money(shown_paid, &config.billing.currency_symbol);
    let outstanding_amount =
        format_whole_money(shown_outstanding, &config.billing.currency_symbol);
    let table = add_financial_footer(&table, &total_amount, &paid_amount, &outstanding_amount);

    println!("{table}");

    println!();
    println!("Total: {} invoices", store.invoices().len());
    println!("Use index number with pay/payments/remove-payment (e.g., 'timebill pay 1')");

    Ok(())
}

/// List configured clients
fn cmd_clients(cfg_dir: &PathBuf) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let clients = load_clients(cfg_dir)?;

    if clients.is_empty() {
        println!("No clients configured.");
        println!("Add clients to: {}/clients.toml", cfg_dir.display());
        return Ok(());
    }

    let symbol = &config.billing.currency_symbol;
    let rows: Vec<ClientRow> = clients
        .iter()
        .map(|(id, client)| ClientRow {
            id: id.to_string(),
            name: client.name.clone(),
            rate: format!(
                "{}{}/h{}",
                symbol,
                format_amount(client.rate),
                if client.rate_includes_gst {
                    " incl. GST"
                } else {
                    ""
                }
            ),
            retainer: match &client.retainer {
                Some(r) => format!(
                    "{}{} / {:.2} h per {}",
                    symbol,
                    format_amount(r.amount),
                    r.hours.round_dp(2),
                    r.basis
                ),
                None => "-".to_string(),
            },
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// Show tracking and billing status
fn cmd_status(cfg_dir: &PathBuf) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let clients = load_clients(cfg_dir)?;
    let store = FileStore::load(data_file(cfg_dir))?;

    let unbilled_sessions = store
        .sessions()
        .iter()
        .filter(|s| !s.is_running() && s.invoice_id.is_none())
        .count();
    let unbilled_expenses = store
        .expenses()
        .iter()
        .filter(|e| e.invoice_id.is_none())
        .count();
    let outstanding: Decimal = store
        .invoices()
        .iter()
        .map(|inv| {
            let paid: Decimal = store.payments_for(inv.id).iter().map(|p| p.amount).sum();
            inv.total - paid
        })
        .sum();

    println!("Time & Billing Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Business:         {}", config.business.name);
    println!(
        "GST registered:   {}",
        if config.billing.gst_registered {
            "yes"
        } else {
            "no"
        }
    );
    println!("Clients:          {}", clients.len());
    println!(
        "Sessions:         {} ({} unbilled)",
        store.sessions().len(),
        unbilled_sessions
    );
    println!(
        "Expenses:         {} ({} unbilled)",
        store.expenses().len(),
        unbilled_expenses
    );
    println!(
        "Invoices:         {} ({}{} outstanding)",
        store.invoices().len(),
        config.billing.currency_symbol,
        format_amount(outstanding)
    );

    if let Some(running) = store.running_session() {
        let elapsed = now_local() - running.start_time;
        let hours = Decimal::from(elapsed.num_seconds().max(0)) / Decimal::from(3600);
        println!();
        println!(
            "Timer running: {} since {} ({:.2} h so far)",
            running.client,
            running.start_time.format("%Y-%m-%d %H:%M"),
            hours.round_dp(2)
        );
    }

    Ok(())
}
