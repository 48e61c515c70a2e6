//! Core types for converting GROBID output into plain text.
//!
//! A [`Paper`] is the structured form of one PDF as produced by the TEI
//! translator. [`flatten`] serializes it into text according to a
//! [`VersionTag`], and [`DocumentService`] is the seam through which the
//! external parsing service is invoked.

pub mod backend;
pub mod config_file;
pub mod flatten;
pub mod paper;
pub mod profile;

// Re-export for convenience
pub use backend::{DocumentService, ServiceError, TEI_SUFFIX, paper_id, tei_file_name};
pub use flatten::{Block, FlattenError, SECTION_SEPARATOR, VersionTag, flatten};
pub use paper::{Metadata, Paper, Paragraph, RefEntry, SectionHeading};
pub use profile::ServiceProfile;
