//! Code-section lookup for module artifacts.
//!
//! Firmware modules ship as a debug ELF (`<name>.debug`) and a loadable PE/EFI
//! image. Either one is enough to learn where the code section sits relative
//! to the image base: ELF through its section table, PE through the optional
//! header's `BaseOfCode`/`SizeOfCode`.

pub mod elf;
pub mod pe;
#[cfg(test)]
pub(crate) mod testdata;

use crate::config::{ModuleConfig, ReaderConfig};
use crate::core::address::Address;
use crate::error::{ModuleError, Result};
use crate::io::{IoLimits, MappedArtifact};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, trace};

/// Container format of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactFormat {
    /// Executable and Linkable Format (debug symbol files)
    Elf,
    /// Portable Executable (EFI images)
    Pe,
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFormat::Elf => write!(f, "ELF"),
            ArtifactFormat::Pe => write!(f, "PE"),
        }
    }
}

/// Location of the code section relative to the image base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeSection {
    /// Load offset of the code section
    pub offset: Address,
    /// Size of the code section in bytes
    pub size: u64,
    /// Format the values were read from
    pub format: ArtifactFormat,
}

/// Errors raised while decoding artifact headers.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unrecognized artifact format")]
    UnknownFormat,
    #[error("truncated header: need {needed} bytes at offset {offset:#x}")]
    Truncated { offset: usize, needed: usize },
    #[error("invalid PE signature")]
    InvalidPeSignature,
    #[error("invalid optional header magic: {0:#06x}")]
    InvalidMagic(u16),
    #[error("no code section matching '{0}'")]
    NoCodeSection(String),
    #[error("ELF parse error: {0}")]
    Elf(String),
}

/// Source of code-section metadata for artifact files.
pub trait ArtifactReader {
    /// Read the code-section offset and size from the artifact at `path`.
    ///
    /// # Errors
    /// Returns `ArtifactRead` if the file cannot be opened, is not a
    /// recognized format, or has no code section.
    fn read_code_section(&self, path: &Path) -> Result<CodeSection>;
}

impl<F> ArtifactReader for F
where
    F: Fn(&Path) -> Result<CodeSection>,
{
    fn read_code_section(&self, path: &Path) -> Result<CodeSection> {
        self(path)
    }
}

/// Identify the artifact format from its leading magic bytes.
pub fn detect_format(data: &[u8]) -> Option<ArtifactFormat> {
    if data.starts_with(b"\x7fELF") {
        Some(ArtifactFormat::Elf)
    } else if data.starts_with(b"MZ") {
        Some(ArtifactFormat::Pe)
    } else {
        None
    }
}

/// Locate the code section in an in-memory artifact.
pub fn code_section(data: &[u8], config: &ReaderConfig) -> std::result::Result<CodeSection, FormatError> {
    match detect_format(data) {
        Some(ArtifactFormat::Elf) => elf::code_section(data, &config.code_section_prefix),
        Some(ArtifactFormat::Pe) => pe::code_section(data),
        None => Err(FormatError::UnknownFormat),
    }
}

/// Default reader: maps the file and decodes ELF or PE headers.
#[derive(Debug, Clone, Default)]
pub struct ObjectArtifactReader {
    limits: IoLimits,
    config: ReaderConfig,
}

impl ObjectArtifactReader {
    pub fn new(limits: IoLimits, config: ReaderConfig) -> Self {
        Self { limits, config }
    }

    /// Build a reader from the relevant parts of a [`ModuleConfig`].
    pub fn from_config(config: &ModuleConfig) -> Self {
        Self::new(config.io.clone(), config.reader.clone())
    }
}

impl ArtifactReader for ObjectArtifactReader {
    fn read_code_section(&self, path: &Path) -> Result<CodeSection> {
        let read_error = |reason: String| ModuleError::ArtifactRead {
            path: path.to_path_buf(),
            reason,
        };

        let artifact =
            MappedArtifact::open(path, &self.limits).map_err(|e| read_error(e.to_string()))?;
        trace!(path = %path.display(), len = artifact.len(), "Decoding artifact headers");

        let section =
            code_section(artifact.data(), &self.config).map_err(|e| read_error(e.to_string()))?;
        debug!(
            path = %path.display(),
            format = %section.format,
            offset = %section.offset,
            size = section.size,
            "Found code section"
        );
        Ok(section)
    }
}
