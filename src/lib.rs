//! Firmware module data model.
//!
//! Tracks the binary modules of a firmware image: where each one is loaded,
//! where its code section lands once rebased, and which artifact files back
//! it. Tables persist as JSON and can be turned into import targets for a
//! disassembler.

pub mod config;
pub mod core;
pub mod error;
pub mod formats;
pub mod io;
pub mod logging;
pub mod targets;

pub use crate::config::{ModuleConfig, ReaderConfig, TableConfig};
pub use crate::core::{
    Address, AddressRange, BatchReport, Module, ModuleRecord, ModuleTable, RenderOptions,
};
pub use crate::error::{ErrorKind, ModuleError, Result};
pub use crate::formats::{ArtifactFormat, ArtifactReader, CodeSection, ObjectArtifactReader};
pub use crate::targets::{ImportTargets, Importer};
