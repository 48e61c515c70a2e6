use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flatten::VersionTag;
use crate::profile::ServiceProfile;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub paths: Option<PathsConfig>,
    pub profiles: Option<ProfilesConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub temp_dir: Option<String>,
    pub output_dir: Option<String>,
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesConfig {
    pub legacy: Option<ProfileConfig>,
    pub reference: Option<ProfileConfig>,
}

/// Partial [`ServiceProfile`]; unset keys keep the built-in value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub protocol: Option<String>,
    pub grobid_server: Option<String>,
    pub grobid_port: Option<u16>,
    pub batch_size: Option<usize>,
    pub sleep_time: Option<u64>,
    pub generate_ids: Option<bool>,
    pub consolidate_header: Option<bool>,
    pub consolidate_citations: Option<bool>,
    pub include_raw_citations: Option<bool>,
    pub include_raw_affiliations: Option<bool>,
    pub max_workers: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub max_busy_retries: Option<u32>,
    pub tei_coordinates: Option<Vec<String>>,
}

impl ProfileConfig {
    /// Apply the set keys on top of `base`.
    pub fn apply(&self, base: ServiceProfile) -> ServiceProfile {
        ServiceProfile {
            protocol: self.protocol.clone().unwrap_or(base.protocol),
            grobid_server: self.grobid_server.clone().unwrap_or(base.grobid_server),
            grobid_port: self.grobid_port.or(base.grobid_port),
            batch_size: self.batch_size.unwrap_or(base.batch_size),
            sleep_time: self.sleep_time.unwrap_or(base.sleep_time),
            generate_ids: self.generate_ids.unwrap_or(base.generate_ids),
            consolidate_header: self.consolidate_header.unwrap_or(base.consolidate_header),
            consolidate_citations: self
                .consolidate_citations
                .unwrap_or(base.consolidate_citations),
            include_raw_citations: self
                .include_raw_citations
                .unwrap_or(base.include_raw_citations),
            include_raw_affiliations: self
                .include_raw_affiliations
                .unwrap_or(base.include_raw_affiliations),
            max_workers: self.max_workers.unwrap_or(base.max_workers),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
            max_busy_retries: self.max_busy_retries.unwrap_or(base.max_busy_retries),
            tei_coordinates: self
                .tei_coordinates
                .clone()
                .unwrap_or(base.tei_coordinates),
        }
    }
}

impl ConfigFile {
    /// Resolve the service profile for a pass: built-in defaults overlaid
    /// with the matching `[profiles.*]` table.
    pub fn profile(&self, tag: VersionTag) -> ServiceProfile {
        let base = ServiceProfile::for_tag(tag);
        let overlay = self.profiles.as_ref().and_then(|p| match tag {
            VersionTag::Legacy => p.legacy.as_ref(),
            VersionTag::Reference => p.reference.as_ref(),
        });
        match overlay {
            Some(o) => o.apply(base),
            None => base,
        }
    }
}

/// Platform config directory path: `<config_dir>/doc2text/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("doc2text").join("config.toml"))
}

/// Load config by cascading CWD `.doc2text.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".doc2text.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    if !path.exists() {
        return None;
    }
    match load_required(path) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable config file");
            None
        }
    }
}

/// Load a config that the user asked for explicitly; failures are errors.
pub fn load_required(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_paths = base.paths.unwrap_or_default();
    let overlay_paths = overlay.paths.unwrap_or_default();
    let base_profiles = base.profiles.unwrap_or_default();
    let overlay_profiles = overlay.profiles.unwrap_or_default();

    ConfigFile {
        paths: Some(PathsConfig {
            temp_dir: overlay_paths.temp_dir.or(base_paths.temp_dir),
            output_dir: overlay_paths.output_dir.or(base_paths.output_dir),
            log_dir: overlay_paths.log_dir.or(base_paths.log_dir),
        }),
        profiles: Some(ProfilesConfig {
            legacy: merge_profile(base_profiles.legacy, overlay_profiles.legacy),
            reference: merge_profile(base_profiles.reference, overlay_profiles.reference),
        }),
    }
}

fn merge_profile(
    base: Option<ProfileConfig>,
    overlay: Option<ProfileConfig>,
) -> Option<ProfileConfig> {
    let (base, overlay) = match (base, overlay) {
        (None, None) => return None,
        (Some(b), None) => return Some(b),
        (None, Some(o)) => return Some(o),
        (Some(b), Some(o)) => (b, o),
    };
    Some(ProfileConfig {
        protocol: overlay.protocol.or(base.protocol),
        grobid_server: overlay.grobid_server.or(base.grobid_server),
        grobid_port: overlay.grobid_port.or(base.grobid_port),
        batch_size: overlay.batch_size.or(base.batch_size),
        sleep_time: overlay.sleep_time.or(base.sleep_time),
        generate_ids: overlay.generate_ids.or(base.generate_ids),
        consolidate_header: overlay.consolidate_header.or(base.consolidate_header),
        consolidate_citations: overlay.consolidate_citations.or(base.consolidate_citations),
        include_raw_citations: overlay.include_raw_citations.or(base.include_raw_citations),
        include_raw_affiliations: overlay
            .include_raw_affiliations
            .or(base.include_raw_affiliations),
        max_workers: overlay.max_workers.or(base.max_workers),
        timeout_secs: overlay.timeout_secs.or(base.timeout_secs),
        max_busy_retries: overlay.max_busy_retries.or(base.max_busy_retries),
        tei_coordinates: overlay.tei_coordinates.or(base.tei_coordinates),
    })
}
