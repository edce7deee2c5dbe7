use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub business: Business,
    pub billing: BillingSettings,
    pub pdf: PdfSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Business {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub email: String,
    #[serde(default)]
    pub abn: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BillingSettings {
    /// Whether invoices carry 10% GST. Unregistered businesses invoice
    /// the subtotal as-is.
    #[serde(default)]
    pub gst_registered: bool,
    pub currency: String,
    pub currency_symbol: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PdfSettings {
    pub output_dir: String,
}
