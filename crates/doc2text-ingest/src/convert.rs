use std::path::{Path, PathBuf};

use doc2text_core::{
    DocumentService, ServiceError, ServiceProfile, TEI_SUFFIX, VersionTag, flatten, paper_id,
    tei_file_name,
};
use doc2text_grobid::GrobidClient;

use crate::ConvertError;
use crate::extract::extract;
use crate::intermediate::IntermediateFile;

/// Default directory for intermediate TEI files.
pub const DEFAULT_TEMP_DIR: &str = "temp";
/// Default directory for the produced text files.
pub const DEFAULT_OUTPUT_DIR: &str = "text_repo";

/// Directories and cleanup behavior for converting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    pub temp_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Keep each pass's TEI file as `<paper_id>.<tag>.tei.xml` instead of deleting it.
    pub keep_intermediate: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            keep_intermediate: false,
        }
    }
}

impl ConvertConfig {
    /// Where the text for `input` is written.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        self.output_dir.join(format!("{}.txt", paper_id(input)))
    }

    fn kept_tei_path(&self, input: &Path, tag: VersionTag) -> PathBuf {
        self.temp_dir
            .join(format!("{}.{}.{}", paper_id(input), tag.slug(), TEI_SUFFIX))
    }
}

/// The service used for each pass.
#[derive(Clone, Copy)]
pub struct PassServices<'a> {
    pub legacy: &'a dyn DocumentService,
    pub reference: &'a dyn DocumentService,
}

impl<'a> PassServices<'a> {
    pub fn for_tag(&self, tag: VersionTag) -> &'a dyn DocumentService {
        match tag {
            VersionTag::Legacy => self.legacy,
            VersionTag::Reference => self.reference,
        }
    }
}

/// GROBID clients for both passes, built from their profiles.
pub struct GrobidPasses {
    legacy: GrobidClient,
    reference: GrobidClient,
}

impl GrobidPasses {
    pub fn new(legacy: ServiceProfile, reference: ServiceProfile) -> Result<Self, ServiceError> {
        Ok(Self {
            legacy: GrobidClient::new(legacy)?,
            reference: GrobidClient::new(reference)?,
        })
    }

    pub fn services(&self) -> PassServices<'_> {
        PassServices {
            legacy: &self.legacy,
            reference: &self.reference,
        }
    }
}

/// Convert one PDF into `<output_dir>/<paper_id>.txt`.
///
/// Runs the legacy pass (metadata and full text) and then the reference
/// pass (reference entries), each against its own service, and writes the
/// two texts joined by a newline. An existing output file is overwritten.
pub async fn convert_file(
    input: &Path,
    config: &ConvertConfig,
    services: &PassServices<'_>,
) -> Result<PathBuf, ConvertError> {
    if !input.is_file() {
        return Err(ConvertError::NotFound(input.to_path_buf()));
    }
    std::fs::create_dir_all(&config.temp_dir)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let output_path = config.output_path(input);
    if output_path.exists() {
        tracing::warn!(path = %output_path.display(), "output file already exists, overwriting");
    }

    let mut texts = Vec::with_capacity(VersionTag::ALL.len());
    for tag in VersionTag::ALL {
        texts.push(run_pass(input, config, services.for_tag(tag), tag).await?);
    }

    std::fs::write(&output_path, texts.join("\n"))?;
    tracing::info!(
        input = %input.display(),
        output = %output_path.display(),
        "converted"
    );
    Ok(output_path)
}

async fn run_pass(
    input: &Path,
    config: &ConvertConfig,
    service: &dyn DocumentService,
    tag: VersionTag,
) -> Result<String, ConvertError> {
    let keep_as = config
        .keep_intermediate
        .then(|| config.kept_tei_path(input, tag));
    let intermediate = IntermediateFile::acquire(config.temp_dir.join(tei_file_name(input)), keep_as);
    tracing::debug!(
        tag = %tag,
        service = service.name(),
        tei = %intermediate.path().display(),
        "starting pass"
    );

    let paper = extract(input, service, &config.temp_dir).await?;
    Ok(flatten(&paper, tag)?)
}
