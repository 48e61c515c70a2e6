//! PDF → text conversion driven by an external document-parsing service.
//!
//! [`extract`] runs one service pass and translates its TEI output,
//! [`convert_file`] runs both passes for one PDF and writes the text file,
//! and [`run_batch`] does that for every PDF in a directory.

use std::path::PathBuf;

use thiserror::Error;

pub mod batch;
pub mod convert;
pub mod extract;
mod intermediate;

pub use batch::{
    BatchConfig, BatchProgress, BatchReport, FailedFile, FailurePolicy, list_pdfs, run_batch,
};
pub use convert::{
    ConvertConfig, DEFAULT_OUTPUT_DIR, DEFAULT_TEMP_DIR, GrobidPasses, PassServices, convert_file,
};
pub use extract::extract;

// Re-export domain types for convenience
pub use doc2text_core::{DocumentService, Paper, ServiceError, VersionTag};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("{service} finished without producing {}", .tei_path.display())]
    Integrity { service: String, tei_path: PathBuf },
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
    #[error("TEI error: {0}")]
    Tei(#[from] doc2text_tei::TeiError),
    #[error("flatten error: {0}")]
    Flatten(#[from] doc2text_core::FlattenError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
