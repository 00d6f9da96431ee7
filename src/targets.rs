//! Artifact-to-base mappings handed to a disassembler importer.
//!
//! An importer loads each artifact at its image base. Targets come either from
//! an address-complete [`ModuleTable`] or from a target file: a JSON module
//! table (`.json`), or plain text with one `<artifact-path> <base-address>`
//! pair per line.

use crate::core::address::Address;
use crate::core::report::BatchReport;
use crate::core::table::ModuleTable;
use crate::error::{ModuleError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Something that can load an artifact at a given base address.
pub trait Importer {
    /// Import `artifact` rebased to `base`. The error text is reported as-is.
    fn import(&mut self, artifact: &Path, base: Address) -> std::result::Result<(), String>;
}

impl<F> Importer for F
where
    F: FnMut(&Path, Address) -> std::result::Result<(), String>,
{
    fn import(&mut self, artifact: &Path, base: Address) -> std::result::Result<(), String> {
        self(artifact, base)
    }
}

/// Ordered mapping from artifact path to image base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTargets {
    entries: BTreeMap<PathBuf, Address>,
}

impl ImportTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a target, returning the previous base for that path.
    pub fn insert(&mut self, artifact: impl Into<PathBuf>, base: Address) -> Option<Address> {
        self.entries.insert(artifact.into(), base)
    }

    pub fn get(&self, artifact: impl AsRef<Path>) -> Option<Address> {
        self.entries.get(artifact.as_ref()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, Address)> {
        self.entries.iter().map(|(p, b)| (p.as_path(), *b))
    }

    /// Path display string to canonical hex base.
    pub fn to_mapping(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(path, base)| (path.display().to_string(), base.to_hex()))
            .collect()
    }

    /// Parse `<artifact-path> <base-address>` lines.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    ///
    /// # Errors
    /// `MalformedRecord` naming the 1-based line number for a line without
    /// exactly two fields, a bad address, or a repeated path.
    pub fn parse_lines(text: &str) -> Result<Self> {
        let mut targets = Self::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let context = format!("line {}", index + 1);

            let fields: Vec<&str> = line.split_whitespace().collect();
            let &[path, base] = fields.as_slice() else {
                return Err(ModuleError::malformed(
                    context,
                    format!("expected '<artifact-path> <base-address>', got '{line}'"),
                ));
            };
            let base = Address::parse(base).map_err(|e| ModuleError::malformed(context.clone(), e))?;
            if targets.insert(path, base).is_some() {
                return Err(ModuleError::malformed(
                    context,
                    format!("duplicate target '{path}'"),
                ));
            }
        }
        Ok(targets)
    }

    /// Load targets from a JSON module table or a text target file.
    pub fn from_target_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let targets = if is_json {
            ModuleTable::read_from_file(path)?.to_address_mapping()
        } else {
            Self::parse_lines(&fs::read_to_string(path)?)?
        };
        debug!(path = %path.display(), targets = targets.len(), "Loaded import targets");
        Ok(targets)
    }

    /// Hand every target to `importer`, collecting per-artifact outcomes.
    pub fn import_all<I>(&self, importer: &mut I) -> BatchReport<String>
    where
        I: Importer + ?Sized,
    {
        let mut report = BatchReport::new();
        for (artifact, base) in self.iter() {
            debug!(artifact = %artifact.display(), base = %base, "Importing");
            report.record(artifact.display().to_string(), importer.import(artifact, base));
        }
        debug!(
            imported = report.succeeded.len(),
            failed = report.failed.len(),
            "Import finished"
        );
        report
    }
}

impl FromIterator<(PathBuf, Address)> for ImportTargets {
    fn from_iter<T: IntoIterator<Item = (PathBuf, Address)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
