//! Client for the GROBID `processFulltextDocument` endpoint.
//!
//! Posts a PDF as multipart form data and writes the returned TEI document
//! to `<output_dir>/<paper_id>.tei.xml`. A 503 answer means the server's
//! worker pool is saturated; the request is resubmitted after the profile's
//! `sleep_time` up to `max_busy_retries` times.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use doc2text_core::{DocumentService, ServiceError, ServiceProfile, tei_file_name};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};

/// GROBID service name for full-text extraction.
pub const PROCESS_FULLTEXT: &str = "processFulltextDocument";

/// Multipart text fields sent alongside the PDF for `profile`.
///
/// Boolean options are only sent when enabled, as GROBID treats any
/// present value as "on".
pub fn form_fields(profile: &ServiceProfile) -> Vec<(&'static str, String)> {
    let flags = [
        ("generateIDs", profile.generate_ids),
        ("consolidateHeader", profile.consolidate_header),
        ("consolidateCitations", profile.consolidate_citations),
        ("includeRawCitations", profile.include_raw_citations),
        ("includeRawAffiliations", profile.include_raw_affiliations),
    ];
    let mut fields: Vec<(&'static str, String)> = flags
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| (name, "1".to_string()))
        .collect();
    fields.extend(
        profile
            .tei_coordinates
            .iter()
            .map(|element| ("teiCoordinates", element.clone())),
    );
    fields
}

pub struct GrobidClient {
    profile: ServiceProfile,
    client: reqwest::Client,
    name: String,
}

impl GrobidClient {
    pub fn new(profile: ServiceProfile) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("doc2text/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(profile.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Http(e.to_string()))?;
        let name = format!("GROBID {}", profile.base_url());
        Ok(Self {
            profile,
            client,
            name,
        })
    }

    pub fn profile(&self) -> &ServiceProfile {
        &self.profile
    }

    /// Full URL of a GROBID service endpoint.
    pub fn endpoint(&self, service: &str) -> String {
        format!("{}/api/{}", self.profile.base_url(), service)
    }

    fn build_form(&self, pdf_bytes: Vec<u8>, file_name: String) -> Result<Form, ServiceError> {
        let part = Part::bytes(pdf_bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| ServiceError::Http(e.to_string()))?;
        let mut form = Form::new().part("input", part);
        for (key, value) in form_fields(&self.profile) {
            form = form.text(key, value);
        }
        Ok(form)
    }

    /// Process one PDF and write its TEI file into `output_dir`.
    ///
    /// Returns the TEI path when the service answered 200. Any other final
    /// status is logged and `Ok(None)` is returned without writing a file.
    pub async fn process_fulltext(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>, ServiceError> {
        let pdf_bytes = tokio::fs::read(pdf_path).await?;
        let file_name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let tei_path = output_dir.join(tei_file_name(pdf_path));
        let url = self.endpoint(PROCESS_FULLTEXT);
        reqwest::Url::parse(&url).map_err(|e| ServiceError::InvalidUrl(format!("{url}: {e}")))?;

        let mut busy_retries = 0;
        loop {
            let form = self.build_form(pdf_bytes.clone(), file_name.clone())?;
            let response = self
                .client
                .post(&url)
                .header(reqwest::header::ACCEPT, "application/xml")
                .multipart(form)
                .send()
                .await
                .map_err(|e| ServiceError::Http(e.to_string()))?;

            let status = response.status();
            if status == StatusCode::SERVICE_UNAVAILABLE {
                if busy_retries >= self.profile.max_busy_retries {
                    return Err(ServiceError::Busy {
                        attempts: busy_retries,
                    });
                }
                busy_retries += 1;
                tracing::debug!(
                    service = %self.name,
                    attempt = busy_retries,
                    sleep_secs = self.profile.sleep_time,
                    "service busy, retrying"
                );
                tokio::time::sleep(Duration::from_secs(self.profile.sleep_time)).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(200).collect();
                tracing::error!(
                    service = %self.name,
                    pdf = %pdf_path.display(),
                    status = %status,
                    body = %snippet,
                    "processing failed"
                );
                return Ok(None);
            }

            let tei = response
                .text()
                .await
                .map_err(|e| ServiceError::Http(e.to_string()))?;
            tokio::fs::write(&tei_path, tei).await?;
            tracing::debug!(
                service = %self.name,
                tei = %tei_path.display(),
                "wrote TEI file"
            );
            return Ok(Some(tei_path));
        }
    }
}

impl DocumentService for GrobidClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_pdf<'a>(
        &'a self,
        pdf_path: &'a Path,
        output_dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), ServiceError>> + Send + 'a>> {
        Box::pin(async move {
            self.process_fulltext(pdf_path, output_dir).await?;
            Ok(())
        })
    }
}
