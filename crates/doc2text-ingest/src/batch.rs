use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::ConvertError;
use crate::convert::{ConvertConfig, PassServices, convert_file};

/// What to do when one file fails to convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the batch and return the error.
    #[default]
    Abort,
    /// Record the failure and go on with the next file.
    Continue,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub convert: ConvertConfig,
    pub failure_policy: FailurePolicy,
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchProgress {
    Started {
        total: usize,
    },
    FileStarted {
        index: usize,
        path: PathBuf,
    },
    FileConverted {
        index: usize,
        output: PathBuf,
    },
    FileFailed {
        index: usize,
        path: PathBuf,
        error: String,
    },
    Finished {
        converted: usize,
        failed: usize,
        elapsed: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<FailedFile>,
    pub elapsed: Duration,
}

/// PDF files directly inside `dir` (no recursion), sorted by path.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    if !dir.is_dir() {
        return Err(ConvertError::NotFound(dir.to_path_buf()));
    }
    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf && path.is_file() {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

/// Convert every PDF in `config.input_dir`, one at a time.
pub async fn run_batch(
    config: &BatchConfig,
    services: &PassServices<'_>,
    mut progress: impl FnMut(BatchProgress),
) -> Result<BatchReport, ConvertError> {
    let start = Instant::now();
    let pdfs = list_pdfs(&config.input_dir)?;
    std::fs::create_dir_all(&config.convert.temp_dir)?;
    std::fs::create_dir_all(&config.convert.output_dir)?;

    tracing::info!(
        input_dir = %config.input_dir.display(),
        files = pdfs.len(),
        "starting batch"
    );
    progress(BatchProgress::Started { total: pdfs.len() });

    let mut report = BatchReport::default();
    for (index, pdf) in pdfs.into_iter().enumerate() {
        progress(BatchProgress::FileStarted {
            index,
            path: pdf.clone(),
        });
        match convert_file(&pdf, &config.convert, services).await {
            Ok(output) => {
                progress(BatchProgress::FileConverted {
                    index,
                    output: output.clone(),
                });
                report.converted.push(output);
            }
            Err(e) => {
                tracing::error!(path = %pdf.display(), error = %e, "conversion failed");
                progress(BatchProgress::FileFailed {
                    index,
                    path: pdf.clone(),
                    error: e.to_string(),
                });
                match config.failure_policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Continue => report.failed.push(FailedFile {
                        path: pdf,
                        error: e.to_string(),
                    }),
                }
            }
        }
    }

    report.elapsed = start.elapsed();
    progress(BatchProgress::Finished {
        converted: report.converted.len(),
        failed: report.failed.len(),
        elapsed: report.elapsed,
    });
    Ok(report)
}
