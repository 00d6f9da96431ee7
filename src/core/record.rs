//! Persisted form of a module.
//!
//! A [`ModuleRecord`] is the single canonical input shape for modules loaded
//! from JSON or handed over by an importer. Keys follow the on-disk table
//! format: `binary_path` is the loadable artifact, `efi_path` the auxiliary
//! image.

use crate::core::address::Address;
use crate::core::module::Module;
use crate::error::{ModuleError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One entry of a persisted module table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub name: String,
    #[serde(default)]
    pub img_base: Option<Address>,
    #[serde(default)]
    pub text_start: Option<Address>,
    #[serde(default)]
    pub text_end: Option<Address>,
    #[serde(default)]
    pub text_size: Option<u64>,
    #[serde(default)]
    pub binary_path: Option<PathBuf>,
    #[serde(default)]
    pub debug_path: Option<PathBuf>,
    #[serde(default)]
    pub efi_path: Option<PathBuf>,
}

impl ModuleRecord {
    /// A record carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            img_base: None,
            text_start: None,
            text_end: None,
            text_size: None,
            binary_path: None,
            debug_path: None,
            efi_path: None,
        }
    }
}

impl From<&Module> for ModuleRecord {
    fn from(module: &Module) -> Self {
        Self {
            name: module.name().to_string(),
            img_base: module.img_base(),
            text_start: module.text_start(),
            text_end: module.text_end(),
            text_size: module.text_size(),
            binary_path: module.artifact_path().map(PathBuf::from),
            debug_path: module.debug_path().map(PathBuf::from),
            efi_path: module.aux_path().map(PathBuf::from),
        }
    }
}

impl Module {
    pub fn to_record(&self) -> ModuleRecord {
        ModuleRecord::from(self)
    }

    /// Validate a record and build the module it describes.
    ///
    /// Text fields are all-or-nothing: either none of `text_start`,
    /// `text_end`, `text_size` is present, or all three are, together with
    /// `img_base`. Paths are taken as stored; a null `debug_path` stays
    /// unset even when a `<name>.debug` file sits next to the artifact.
    ///
    /// # Errors
    /// `MalformedRecord` naming the module and the failed validation.
    pub fn from_record(record: ModuleRecord) -> Result<Self> {
        let context = format!("'{}'", record.name);
        let wrap = |e: ModuleError| ModuleError::malformed(context.clone(), e);

        let mut module = Module::new(record.name.clone()).map_err(wrap)?;
        if let Some(base) = record.img_base {
            module.set_image_base(base);
        }
        if let Some(path) = record.binary_path {
            module.set_artifact_path(path).map_err(wrap)?;
        }
        if let Some(path) = record.debug_path {
            module.set_debug_path(path).map_err(wrap)?;
        }
        if let Some(path) = record.efi_path {
            module.set_aux_path(path).map_err(wrap)?;
        }

        match (record.text_start, record.text_end, record.text_size) {
            (None, None, None) => {}
            (Some(start), Some(end), Some(size)) => {
                let base = record.img_base.ok_or_else(|| {
                    ModuleError::malformed(context.clone(), "text bounds without img_base")
                })?;
                module
                    .set_address_info(base, start, end, size)
                    .map_err(wrap)?;
            }
            _ => {
                return Err(ModuleError::malformed(
                    context,
                    "text_start, text_end and text_size must be set together",
                ))
            }
        }

        Ok(module)
    }
}

impl TryFrom<ModuleRecord> for Module {
    type Error = ModuleError;

    fn try_from(record: ModuleRecord) -> Result<Self> {
        Module::from_record(record)
    }
}
