use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::Retainer;
use crate::store::{Expense, WorkSession};

/// 10% GST as a decimal fraction.
fn gst_rate() -> Decimal {
    Decimal::new(10, 2)
}

/// Divisor that peels GST out of an inclusive amount.
fn gst_divisor() -> Decimal {
    Decimal::new(110, 2)
}

/// Hours worked in a session, at full decimal precision. Running sessions
/// count as zero.
pub fn session_hours(session: &WorkSession) -> Decimal {
    match session.end_time {
        Some(end) => {
            let secs = (end - session.start_time).num_seconds().max(0);
            Decimal::from(secs) / Decimal::from(3600)
        }
        None => Decimal::ZERO,
    }
}

/// Split a GST-inclusive amount into (exclusive, gst). The two parts add
/// back to the input exactly, whatever the division produced.
pub fn split_inclusive(amount: Decimal) -> (Decimal, Decimal) {
    let exclusive = amount / gst_divisor();
    (exclusive, amount - exclusive)
}

/// Round money to cents, midpoints away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount as a money string: cents and thousands separators.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let s = format!("{:.2}", rounded.abs());
    match s.split_once('.') {
        Some((int_part, frac_part)) => {
            format!("{sign}{}.{frac_part}", group_thousands(int_part))
        }
        None => format!("{sign}{}.00", group_thousands(&s)),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// One session's contribution to an invoice, after retainer coverage and
/// GST extraction.
#[derive(Debug, Clone)]
pub struct SessionLine {
    pub session: WorkSession,
    pub hours: Decimal,
    pub covered_hours: Decimal,
    pub billable_hours: Decimal,
    pub rate: Decimal,
    /// Tax-exclusive amount this session adds to the subtotal.
    pub amount: Decimal,
    /// GST peeled out of a GST-inclusive rate, zero otherwise.
    pub extracted_gst: Decimal,
}

/// Settled totals for one client's period, at full precision. Rounding
/// happens where amounts are persisted or displayed, not here.
#[derive(Debug, Clone)]
pub struct PeriodTotals {
    pub lines: Vec<SessionLine>,
    pub retainer_fee: Decimal,
    pub covered_hours: Decimal,
    pub expense_total: Decimal,
    pub subtotal: Decimal,
    pub gst: Decimal,
    pub total: Decimal,
}

/// Settle a period's sessions and expenses into invoice totals.
///
/// Sessions are processed in chronological order so retainer hours cover
/// the earliest work first; a session that exhausts the allowance bills
/// only its uncovered remainder. `gst_registered` controls both the 10%
/// on the subtotal and the splitting of GST-inclusive rates; unregistered
/// businesses keep inclusive amounts whole and charge no GST. Amounts
/// whose GST was already split out are excluded from the 10% base so they
/// are never taxed twice.
pub fn settle_period(
    sessions: &[WorkSession],
    expenses: &[Expense],
    retainer: Option<&Retainer>,
    gst_registered: bool,
) -> PeriodTotals {
    let mut ordered: Vec<&WorkSession> = sessions.iter().collect();
    ordered.sort_by_key(|s| s.start_time);

    let retainer_fee = retainer.map_or(Decimal::ZERO, |r| r.amount);
    let mut remaining_cover = retainer.map_or(Decimal::ZERO, |r| r.hours);

    let mut lines = Vec::with_capacity(ordered.len());
    let mut taxable_subtotal = retainer_fee;
    let mut inclusive_subtotal = Decimal::ZERO;
    let mut extracted_gst = Decimal::ZERO;
    let mut covered_total = Decimal::ZERO;

    for session in ordered {
        let hours = session_hours(session);
        let covered = hours.min(remaining_cover);
        remaining_cover -= covered;
        covered_total += covered;
        let billable_hours = hours - covered;
        // A missing or negative rate snapshot bills nothing
        let rate = session
            .hourly_rate
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);
        let contribution = billable_hours * rate;

        let (amount, gst_part) = if session.rate_includes_gst && gst_registered {
            split_inclusive(contribution)
        } else {
            (contribution, Decimal::ZERO)
        };
        if gst_part.is_zero() {
            taxable_subtotal += amount;
        } else {
            inclusive_subtotal += amount;
        }
        extracted_gst += gst_part;

        lines.push(SessionLine {
            session: session.clone(),
            hours,
            covered_hours: covered,
            billable_hours,
            rate,
            amount,
            extracted_gst: gst_part,
        });
    }

    let expense_total: Decimal = expenses.iter().map(|e| e.amount).sum();
    taxable_subtotal += expense_total;

    let subtotal = taxable_subtotal + inclusive_subtotal;
    let gst = if gst_registered {
        taxable_subtotal * gst_rate() + extracted_gst
    } else {
        Decimal::ZERO
    };

    PeriodTotals {
        lines,
        retainer_fee,
        covered_hours: covered_total,
        expense_total,
        subtotal,
        gst,
        total: subtotal + gst,
    }
}
