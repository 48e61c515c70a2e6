use std::io::Write;
use std::path::Path;
use std::time::Duration;

use doc2text_ingest::{BatchReport, FailedFile};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Print one failed conversion as it happens.
pub fn print_file_failure(
    w: &mut dyn Write,
    path: &Path,
    error: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    let name = file_name(path);
    if color.enabled() {
        writeln!(w, "{} {}: {}", "[FAILED]".red().bold(), name, error)
    } else {
        writeln!(w, "[FAILED] {}: {}", name, error)
    }
}

/// Print the list of files that could not be converted.
pub fn print_failures(
    w: &mut dyn Write,
    failed: &[FailedFile],
    color: ColorMode,
) -> std::io::Result<()> {
    if failed.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    let header = format!("{} file(s) failed to convert:", failed.len());
    if color.enabled() {
        writeln!(w, "{}", header.red().bold())?;
    } else {
        writeln!(w, "{}", header)?;
    }
    for f in failed {
        if color.enabled() {
            writeln!(w, "  {} {}", file_name(&f.path).bold(), f.error.dimmed())?;
        } else {
            writeln!(w, "  {} {}", file_name(&f.path), f.error)?;
        }
    }
    Ok(())
}

/// Print the converted/failed counts after a batch.
pub fn print_summary(w: &mut dyn Write, report: &BatchReport, color: ColorMode) -> std::io::Result<()> {
    let converted = report.converted.len();
    let failed = report.failed.len();
    if color.enabled() {
        let failed_text = format!("{} failed", failed);
        let failed_text = if failed > 0 {
            failed_text.red().to_string()
        } else {
            failed_text.dimmed().to_string()
        };
        writeln!(w, "{} converted, {}", format!("{}", converted).green(), failed_text)
    } else {
        writeln!(w, "{} converted, {} failed", converted, failed)
    }
}

/// The closing lines of a successful run.
pub fn print_runtime(w: &mut dyn Write, elapsed: Duration) -> std::io::Result<()> {
    writeln!(w, "runtime: {:.3} seconds", elapsed.as_secs_f64())?;
    writeln!(w, "done.")
}
