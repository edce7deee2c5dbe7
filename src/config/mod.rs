mod business;
mod client;

pub use business::{BillingSettings, Business, Config, PdfSettings};
pub use client::{Client, Retainer};

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::{BillingError, Result};

/// Get the config directory path (~/.timebill/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "timebill") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.timebill/
    let home = dirs_home().ok_or_else(|| {
        BillingError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".timebill"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs_home() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

/// Path of the mutable data file (sessions, expenses, invoices, payments).
pub fn data_file(config_dir: &PathBuf) -> PathBuf {
    config_dir.join("billing.toml")
}

/// Load the main config.toml
pub fn load_config(config_dir: &PathBuf) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(BillingError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| BillingError::ConfigParse { path, source: e })
}

/// Load clients.toml keyed by client identifier, sorted for stable iteration
pub fn load_clients(config_dir: &PathBuf) -> Result<BTreeMap<String, Client>> {
    let path = config_dir.join("clients.toml");
    if !path.exists() {
        return Err(BillingError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| BillingError::ConfigParse { path, source: e })
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[business]
name = "Your Name"
address = "123 Example Street"
city = "Melbourne"
state = "VIC"
postcode = "3000"
country = "Australia"
email = "billing@example.com"
# abn = "12 345 678 901"       # optional
# phone = "+61 400 000 000"    # optional

[billing]
gst_registered = true   # adds 10% GST on top of invoice subtotals
currency = "AUD"
currency_symbol = "$"

[pdf]
output_dir = "~/.timebill/output"
"#;

/// Template content for clients.toml
pub const CLIENTS_TEMPLATE: &str = r#"# Define your clients here. The table name (e.g., [acme]) is the client
# identifier used by the start, expense and generate commands.
#
# Example:
#   timebill start acme --description "Sprint work"
#   timebill generate --period week --client acme

[example-client]
name = "Example Client Pty Ltd"
email = "accounts@example.com"
rate = 150.00                # hourly rate in dollars
rate_includes_gst = false    # true if the rate is quoted with GST included
# address = "456 Client Avenue"
# city = "Sydney"
# state = "NSW"
# postcode = "2000"

# A retainer bills a flat amount that covers the first N hours per period:
# [example-client.retainer]
# amount = 500.00
# hours = 10
# basis = "week"    # day, week, fortnight or month
"#;
