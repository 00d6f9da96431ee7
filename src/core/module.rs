//! Module type for firmware binaries.
//!
//! A [`Module`] names one firmware binary (`PeiCore`, `DxeCore`, ...), records
//! where it is loaded, and where its code section lands once the image base is
//! applied. Code-section bounds are derived from an artifact on demand through
//! an [`ArtifactReader`]; they are never computed implicitly.

use crate::core::address::Address;
use crate::core::address_range::AddressRange;
use crate::error::{ModuleError, Result};
use crate::formats::{ArtifactReader, CodeSection};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One firmware binary module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    name: String,
    img_base: Option<Address>,
    text_start: Option<Address>,
    text_end: Option<Address>,
    text_size: Option<u64>,
    artifact_path: Option<PathBuf>,
    debug_path: Option<PathBuf>,
    aux_path: Option<PathBuf>,
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ModuleError::InvalidName);
    }
    Ok(())
}

fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(ModuleError::InvalidPath {
            path: path.to_path_buf(),
            reason: "path must not be empty".to_string(),
        });
    }
    if !path.exists() {
        return Err(ModuleError::InvalidPath {
            path: path.to_path_buf(),
            reason: "does not exist".to_string(),
        });
    }
    Ok(())
}

impl Module {
    /// Create an address-incomplete module with only a name.
    ///
    /// # Errors
    /// Returns `InvalidName` if the name is empty or whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            img_base: None,
            text_start: None,
            text_end: None,
            text_size: None,
            artifact_path: None,
            debug_path: None,
            aux_path: None,
        })
    }

    /// Create a module with its image base and artifact paths.
    ///
    /// When no debug path is given and `<artifact dir>/<name>.debug` exists,
    /// that file becomes the debug path.
    ///
    /// # Errors
    /// `InvalidName` for an empty name, `InvalidPath` for any supplied path
    /// that is empty or missing.
    pub fn create(
        name: impl Into<String>,
        img_base: Option<Address>,
        artifact_path: Option<PathBuf>,
        debug_path: Option<PathBuf>,
        aux_path: Option<PathBuf>,
    ) -> Result<Self> {
        let mut module = Self::new(name)?;
        module.img_base = img_base;
        if let Some(path) = artifact_path {
            module.set_artifact_path(path)?;
        }
        match debug_path {
            Some(path) => module.set_debug_path(path)?,
            None => module.debug_path = module.default_debug_path(),
        }
        if let Some(path) = aux_path {
            module.set_aux_path(path)?;
        }
        Ok(module)
    }

    /// Builder-style image base.
    pub fn with_image_base(mut self, base: Address) -> Self {
        self.img_base = Some(base);
        self
    }

    /// Builder-style artifact path.
    pub fn with_artifact_path(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        self.set_artifact_path(path)?;
        Ok(self)
    }

    /// Builder-style debug path.
    pub fn with_debug_path(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        self.set_debug_path(path)?;
        Ok(self)
    }

    /// Builder-style auxiliary path.
    pub fn with_aux_path(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        self.set_aux_path(path)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn img_base(&self) -> Option<Address> {
        self.img_base
    }

    pub fn text_start(&self) -> Option<Address> {
        self.text_start
    }

    pub fn text_end(&self) -> Option<Address> {
        self.text_end
    }

    pub fn text_size(&self) -> Option<u64> {
        self.text_size
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    pub fn debug_path(&self) -> Option<&Path> {
        self.debug_path.as_deref()
    }

    pub fn aux_path(&self) -> Option<&Path> {
        self.aux_path.as_deref()
    }

    pub fn set_image_base(&mut self, base: Address) {
        self.img_base = Some(base);
    }

    pub fn set_artifact_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        validate_path(&path)?;
        self.artifact_path = Some(path);
        Ok(())
    }

    pub fn set_debug_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        validate_path(&path)?;
        self.debug_path = Some(path);
        Ok(())
    }

    pub fn set_aux_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        validate_path(&path)?;
        self.aux_path = Some(path);
        Ok(())
    }

    /// `<artifact dir>/<name>.debug`, if such a file exists.
    fn default_debug_path(&self) -> Option<PathBuf> {
        let artifact = self.artifact_path.as_ref()?;
        let candidate = artifact.with_file_name(format!("{}.debug", self.name));
        (candidate != *artifact && candidate.is_file()).then_some(candidate)
    }

    /// The artifact code-section metadata is read from: the artifact path,
    /// else the debug path, else the auxiliary path.
    pub fn resolved_artifact(&self) -> Option<&Path> {
        self.artifact_path
            .as_deref()
            .or(self.debug_path.as_deref())
            .or(self.aux_path.as_deref())
    }

    /// Set all address fields directly.
    ///
    /// # Errors
    /// `InvalidAddress` if `end` lies below `start`, `InvalidSize` if
    /// `size != end - start`. The module is unchanged on error.
    pub fn set_address_info(
        &mut self,
        base: Address,
        start: Address,
        end: Address,
        size: u64,
    ) -> Result<()> {
        let range = AddressRange::from_bounds(start, end)?;
        if range.size != size {
            return Err(ModuleError::InvalidSize(format!(
                "size {size:#x} does not match {start}..{end} ({:#x})",
                range.size
            )));
        }
        self.img_base = Some(base);
        self.text_start = Some(start);
        self.text_end = Some(end);
        self.text_size = Some(size);
        Ok(())
    }

    /// Ask `reader` for the code-section offset and size of this module's artifact.
    ///
    /// # Errors
    /// `MissingArtifact` if no path is set, `ArtifactRead` from the reader.
    pub fn compute_text_bounds<R>(&self, reader: &R) -> Result<CodeSection>
    where
        R: ArtifactReader + ?Sized,
    {
        let path = self
            .resolved_artifact()
            .ok_or_else(|| ModuleError::MissingArtifact(self.name.clone()))?;
        reader.read_code_section(path)
    }

    /// Derive `text_start`, `text_end` and `text_size` from the artifact and
    /// the image base. Re-running with unchanged inputs yields the same values.
    ///
    /// # Errors
    /// `MissingImageBase`, `MissingArtifact`, `ArtifactRead`, or
    /// `AddressOverflow` if the code section would end past 64 bits. The
    /// module is unchanged on error.
    pub fn fill_text_info<R>(&mut self, reader: &R) -> Result<()>
    where
        R: ArtifactReader + ?Sized,
    {
        let base = self
            .img_base
            .ok_or_else(|| ModuleError::MissingImageBase(self.name.clone()))?;
        let section = self.compute_text_bounds(reader)?;

        let start = base.checked_add(section.offset.value())?;
        let end = start.checked_add(section.size)?;

        self.text_start = Some(start);
        self.text_end = Some(end);
        self.text_size = Some(section.size);

        debug!(
            module = %self.name,
            base = %base,
            start = %start,
            end = %end,
            format = %section.format,
            "Filled code section bounds"
        );
        Ok(())
    }

    /// True once start, end and size are all known.
    pub fn is_address_complete(&self) -> bool {
        self.text_start.is_some() && self.text_end.is_some() && self.text_size.is_some()
    }

    /// The code section as a range, for complete modules.
    pub fn text_range(&self) -> Option<AddressRange> {
        AddressRange::from_bounds(self.text_start?, self.text_end?).ok()
    }

    /// Table ordering: `(text_start, text_end)` with unset fields as zero,
    /// then name so that ties are deterministic.
    pub fn cmp_by_address(&self, other: &Module) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }

    fn sort_key(&self) -> (Address, Address, &str) {
        (
            self.text_start.unwrap_or(Address::ZERO),
            self.text_end.unwrap_or(Address::ZERO),
            &self.name,
        )
    }
}

pub(crate) fn hex_or_dash(addr: Option<Address>) -> String {
    addr.map(Address::to_hex).unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}-{}",
            self.name,
            hex_or_dash(self.img_base),
            hex_or_dash(self.text_start),
            hex_or_dash(self.text_end)
        )
    }
}
