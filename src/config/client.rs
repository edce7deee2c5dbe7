use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::billing::PeriodKind;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Client {
    pub name: String,
    /// Hourly rate in dollars. Sessions snapshot this when they start; a
    /// client without a rate bills zero until one is set.
    #[serde(default)]
    pub rate: Decimal,
    /// True when the rate is quoted with GST already baked in.
    #[serde(default)]
    pub rate_includes_gst: bool,
    #[serde(default)]
    pub retainer: Option<Retainer>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
}

/// A flat periodic fee that covers the first `hours` of work in each period
/// of `basis`. Hours past the covered allowance bill at the normal rate.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Retainer {
    pub amount: Decimal,
    pub hours: Decimal,
    pub basis: PeriodKind,
}

impl Retainer {
    /// A retainer only bills for the period kind it is defined on, and only
    /// when its terms are meaningful.
    pub fn applies_to(&self, kind: PeriodKind) -> bool {
        self.basis == kind && self.amount > Decimal::ZERO && self.hours > Decimal::ZERO
    }
}
