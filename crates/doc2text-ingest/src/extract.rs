use std::path::Path;

use doc2text_core::{DocumentService, Paper, tei_file_name};

use crate::ConvertError;

/// Run one service pass over `input` and translate the resulting TEI file.
///
/// The TEI file is left in `work_dir`; removing it is the caller's job.
pub async fn extract(
    input: &Path,
    service: &dyn DocumentService,
    work_dir: &Path,
) -> Result<Paper, ConvertError> {
    if !input.is_file() {
        return Err(ConvertError::NotFound(input.to_path_buf()));
    }
    std::fs::create_dir_all(work_dir)?;

    service.process_pdf(input, work_dir).await?;

    let tei_path = work_dir.join(tei_file_name(input));
    if !tei_path.is_file() {
        return Err(ConvertError::Integrity {
            service: service.name().to_string(),
            tei_path,
        });
    }

    Ok(doc2text_tei::parse_tei_file(&tei_path)?)
}
