mod typst;

pub use typst::TypstRenderer;

use std::path::{Path, PathBuf};

use crate::billing::InvoiceDocument;
use crate::error::Result;

/// Turns a settled invoice into an artifact on disk, returning its path.
/// The production implementation shells out to Typst; tests substitute
/// their own.
pub trait InvoiceRenderer {
    fn render(&self, document: &InvoiceDocument, output_dir: &Path) -> Result<PathBuf>;
}
