use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use thiserror::Error;

/// Suffix of the intermediate markup file written by the parsing service.
pub const TEI_SUFFIX: &str = "tei.xml";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP request error: {0}")]
    Http(String),
    #[error("service still busy after {attempts} retries")]
    Busy { attempts: u32 },
    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A document-parsing service that turns a PDF into an intermediate TEI file.
///
/// Implementors write `output_dir/<paper_id>.tei.xml` on success. A call
/// that returns `Ok(())` without producing the file is treated as a silent
/// service failure by the caller.
pub trait DocumentService: Send + Sync {
    /// Human-readable name for logs (e.g. `"GROBID localhost:8070"`).
    fn name(&self) -> &str;

    /// Submit `pdf_path` and write the resulting TEI file into `output_dir`.
    fn process_pdf<'a>(
        &'a self,
        pdf_path: &'a Path,
        output_dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), ServiceError>> + Send + 'a>>;
}

/// Paper identifier derived from a file name: the base name with its final
/// extension removed (`a/b/paper.v2.pdf` → `paper.v2`).
pub fn paper_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Name of the TEI file the service writes for `pdf_path`.
pub fn tei_file_name(pdf_path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.{}", paper_id(pdf_path), TEI_SUFFIX))
}
