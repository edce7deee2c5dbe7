use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::InvoiceRenderer;
use crate::billing::InvoiceDocument;
use crate::error::{BillingError, Result};

/// Embedded Typst template for invoice rendering
/// Uses a placeholder that gets replaced with the actual JSON file path
const INVOICE_TEMPLATE: &str = r##"// Invoice Template
// Data is loaded from JSON file; all amounts arrive pre-formatted

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "a4",
  margin: (top: 1in, bottom: 1in, left: 1in, right: 1in),
)

#set text(font: "Helvetica", size: 10pt)

// Header with business info and invoice details
#grid(
  columns: (1fr, 1fr),
  align: (left, right),
  [
    #text(size: 18pt, weight: "bold")[#data.business.name]
    #v(0.3em)
    #data.business.address \
    #data.business.city, #data.business.state #data.business.postcode \
    #data.business.email
    #if data.business.phone != none [
      \ #data.business.phone
    ]
  ],
  [
    #text(size: 24pt, weight: "bold")[#if data.gst != none [TAX INVOICE] else [INVOICE]]
    #v(0.5em)
    #table(
      columns: (auto, auto),
      stroke: none,
      align: (right, left),
      inset: 2pt,
      [*Invoice \#:*], [#data.number],
      [*Date:*], [#data.generated_date],
      [*Period:*], [#data.period_label],
    )
  ]
)

#v(1em)
#line(length: 100%, stroke: 0.5pt + gray)
#v(1em)

// Bill To section
#grid(
  columns: (1fr, 1fr),
  [
    #text(weight: "bold", size: 11pt)[Bill To:]
    #v(0.3em)
    #text(weight: "bold")[#data.client.name]
    #if data.client.address != none [
      \ #data.client.address
    ]
    #if data.client.city != none [
      \ #data.client.city #data.client.state #data.client.postcode
    ]
    #if data.client.email != none [
      \ #data.client.email
    ]
  ],
  []
)

#v(1.5em)

// Line items: retainer first, then sessions, then expenses
#table(
  columns: (auto, 1fr, auto, auto, auto),
  align: (left, left, right, right, right),
  stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else if y > 0 { (bottom: 0.5pt + gray) },
  inset: 8pt,
  fill: (x, y) => if y == 0 { luma(240) } else { none },

  // Header
  [*Date*], [*Description*], [*Hours*], [*Rate*], [*Amount*],

  ..if data.retainer != none {
    ([], [#data.retainer.description], [], [], [#data.retainer.amount])
  } else {
    ()
  },

  ..data.sessions.map(s => (
    [#s.date],
    [#s.description],
    [#s.hours],
    [#s.rate],
    [#s.amount],
  )).flatten(),

  ..data.expenses.map(e => (
    [#e.date],
    [#e.description],
    [],
    [],
    [#e.amount],
  )).flatten()
)

#v(1em)

// Totals
#align(right)[
  #table(
    columns: (auto, auto),
    stroke: none,
    align: (right, right),
    inset: 6pt,

    [Subtotal:], [#data.subtotal],

    ..if data.gst != none {
      ([GST (10%):], [#data.gst])
    } else {
      ()
    },

    table.hline(stroke: 1pt),
    [*Total:*], [*#data.total*],
  )
]

#v(2em)

#if data.business.abn != none [
  #text(size: 9pt, fill: gray)[ABN: #data.business.abn]
  #v(0.3em)
]
#text(size: 9pt, fill: gray)[All amounts in #data.currency.]
"##;

/// Renders invoices to PDF by shelling out to the Typst CLI.
pub struct TypstRenderer;

impl InvoiceRenderer for TypstRenderer {
    fn render(&self, document: &InvoiceDocument, output_dir: &Path) -> Result<PathBuf> {
        // Check if typst is available
        if Command::new("typst").arg("--version").output().is_err() {
            return Err(BillingError::TypstNotFound);
        }

        fs::create_dir_all(output_dir)?;
        let output_path = output_dir.join(format!("{}.pdf", document.number));

        // Stage the template and its data together; typst resolves the
        // JSON path relative to --root.
        let temp_dir = std::env::temp_dir().join("timebill");
        fs::create_dir_all(&temp_dir)?;

        let json_data = serde_json::to_string(document)
            .map_err(|e| BillingError::PdfGeneration(e.to_string()))?;
        let json_path = temp_dir.join("data.json");
        fs::write(&json_path, &json_data)?;

        let template_content = INVOICE_TEMPLATE.replace("DATA_JSON_PATH", "data.json");
        let template_path = temp_dir.join("invoice.typ");
        fs::write(&template_path, &template_content)?;

        let output = Command::new("typst")
            .arg("compile")
            .arg("--root")
            .arg(&temp_dir)
            .arg(&template_path)
            .arg(&output_path)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BillingError::PdfGeneration(stderr.to_string()));
        }

        // Clean up temp files
        let _ = fs::remove_file(&template_path);
        let _ = fs::remove_file(&json_path);

        Ok(output_path)
    }
}
