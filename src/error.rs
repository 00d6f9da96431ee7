//! Error types for firmware module tracking.
//!
//! Every fallible operation in the crate returns [`ModuleError`]. Variants
//! carry the offending value (module name, path, raw input) so that callers
//! can report exactly which field of which module was rejected.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for module model operations.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Address text or integer could not be interpreted as a 64-bit address
    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// Address arithmetic would exceed 64 bits
    #[error("Address overflow: {base:#x} + {offset:#x} exceeds 64 bits")]
    AddressOverflow { base: u64, offset: u64 },

    /// Module name is empty
    #[error("Invalid module name: name must not be empty")]
    InvalidName,

    /// A supplied path is empty or does not exist
    #[error("Invalid path '{}': {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Code section size is inconsistent with its bounds
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    /// Address completion attempted before the image base was known
    #[error("Module '{0}' has no image base")]
    MissingImageBase(String),

    /// Address completion attempted without any artifact path
    #[error("Module '{0}' has no artifact to read")]
    MissingArtifact(String),

    /// Artifact could not be opened or has no code section
    #[error("Failed to read artifact '{}': {reason}", path.display())]
    ArtifactRead { path: PathBuf, reason: String },

    /// Two modules share a name
    #[error("Duplicate module name: {0}")]
    DuplicateModuleName(String),

    /// Lookup by name failed
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// Persisted record is missing keys or holds invalid values
    #[error("Malformed record {context}: {reason}")]
    MalformedRecord { context: String, reason: String },

    /// In-memory descriptor could not be turned into a module
    #[error("Invalid module '{name}': {reason}")]
    InvalidModule { name: String, reason: String },

    /// Two code sections overlap while the table is in strict mode
    #[error("Code section of '{first}' overlaps '{second}'")]
    Overlap { first: String, second: String },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless discriminant of [`ModuleError`], for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAddress,
    AddressOverflow,
    InvalidName,
    InvalidPath,
    InvalidSize,
    MissingImageBase,
    MissingArtifact,
    ArtifactRead,
    DuplicateModuleName,
    ModuleNotFound,
    MalformedRecord,
    InvalidModule,
    Overlap,
    Io,
}

impl ModuleError {
    /// The kind of this error without its payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModuleError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            ModuleError::AddressOverflow { .. } => ErrorKind::AddressOverflow,
            ModuleError::InvalidName => ErrorKind::InvalidName,
            ModuleError::InvalidPath { .. } => ErrorKind::InvalidPath,
            ModuleError::InvalidSize(_) => ErrorKind::InvalidSize,
            ModuleError::MissingImageBase(_) => ErrorKind::MissingImageBase,
            ModuleError::MissingArtifact(_) => ErrorKind::MissingArtifact,
            ModuleError::ArtifactRead { .. } => ErrorKind::ArtifactRead,
            ModuleError::DuplicateModuleName(_) => ErrorKind::DuplicateModuleName,
            ModuleError::ModuleNotFound(_) => ErrorKind::ModuleNotFound,
            ModuleError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            ModuleError::InvalidModule { .. } => ErrorKind::InvalidModule,
            ModuleError::Overlap { .. } => ErrorKind::Overlap,
            ModuleError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_address(input: impl fmt::Display, reason: impl Into<String>) -> Self {
        ModuleError::InvalidAddress {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(context: impl Into<String>, reason: impl fmt::Display) -> Self {
        ModuleError::MalformedRecord {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result type alias for module operations
pub type Result<T> = std::result::Result<T, ModuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModuleError::AddressOverflow {
            base: u64::MAX,
            offset: 0x10,
        };
        assert_eq!(
            err.to_string(),
            "Address overflow: 0xffffffffffffffff + 0x10 exceeds 64 bits"
        );

        let err = ModuleError::ModuleNotFound("DxeCore".to_string());
        assert_eq!(err.to_string(), "Module not found: DxeCore");

        let err = ModuleError::InvalidPath {
            path: PathBuf::from("/nonexistent"),
            reason: "does not exist".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid path '/nonexistent': does not exist");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(ModuleError::InvalidName.kind(), ErrorKind::InvalidName);
        assert_eq!(
            ModuleError::malformed("#0", "missing field `name`").kind(),
            ErrorKind::MalformedRecord
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(ModuleError::from(io).kind(), ErrorKind::Io);
        assert_eq!(ErrorKind::ModuleNotFound.to_string(), "ModuleNotFound");
    }
}
