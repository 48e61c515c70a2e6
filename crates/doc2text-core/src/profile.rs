use serde::{Deserialize, Serialize};

use crate::flatten::VersionTag;

/// Elements for which GROBID reports PDF coordinates.
pub const DEFAULT_TEI_COORDINATES: &[&str] = &["persName", "figure", "ref", "biblStruct", "formula"];

/// How one pass invokes the GROBID service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProfile {
    pub protocol: String,
    pub grobid_server: String,
    pub grobid_port: Option<u16>,
    pub batch_size: usize,
    /// Seconds to wait before resubmitting when the service answers 503.
    pub sleep_time: u64,
    pub generate_ids: bool,
    pub consolidate_header: bool,
    pub consolidate_citations: bool,
    pub include_raw_citations: bool,
    pub include_raw_affiliations: bool,
    /// Worker count of the service side. Passed through, not used locally.
    pub max_workers: usize,
    pub timeout_secs: u64,
    pub max_busy_retries: u32,
    pub tei_coordinates: Vec<String>,
}

impl ServiceProfile {
    /// Profile for the full-text pass: a local GROBID instance.
    pub fn legacy() -> Self {
        Self {
            protocol: "http".into(),
            grobid_server: "localhost".into(),
            grobid_port: Some(8070),
            batch_size: 1000,
            sleep_time: 5,
            generate_ids: false,
            consolidate_header: false,
            consolidate_citations: false,
            include_raw_citations: true,
            include_raw_affiliations: false,
            max_workers: 2,
            timeout_secs: 180,
            max_busy_retries: 24,
            tei_coordinates: DEFAULT_TEI_COORDINATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Profile for the reference pass: the public science-miner deployment.
    pub fn reference() -> Self {
        Self {
            protocol: "https".into(),
            grobid_server: "cloud.science-miner.com/grobid".into(),
            grobid_port: None,
            ..Self::legacy()
        }
    }

    /// Built-in profile for a pass.
    pub fn for_tag(tag: VersionTag) -> Self {
        match tag {
            VersionTag::Legacy => Self::legacy(),
            VersionTag::Reference => Self::reference(),
        }
    }

    /// `protocol://server[:port]`, without the `/api` suffix.
    pub fn base_url(&self) -> String {
        let server = self.grobid_server.trim_end_matches('/');
        match self.grobid_port {
            Some(port) => format!("{}://{}:{}", self.protocol, server, port),
            None => format!("{}://{}", self.protocol, server),
        }
    }
}
