//! Name-keyed collection of modules with an address-ordered view.
//!
//! The table owns its modules by name and keeps a second, derived view sorted
//! by code-section address. The view is rebuilt after every mutation instead
//! of being patched in place, so it can never drift from the map.

use crate::config::TableConfig;
use crate::core::address::Address;
use crate::core::module::Module;
use crate::core::record::ModuleRecord;
use crate::core::report::BatchReport;
use crate::error::{ModuleError, Result};
use crate::formats::ArtifactReader;
use crate::targets::ImportTargets;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const NAME_WIDTH: usize = 32;
const ADDR_WIDTH: usize = 12;
const SIZE_WIDTH: usize = 8;

/// Column and filter selection for [`ModuleTable::render_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub header: bool,
    pub image_base: bool,
    pub text_start: bool,
    pub text_end: bool,
    pub text_size: bool,
    pub path: bool,
    /// Only render these modules; order stays by address.
    pub filter: Option<BTreeSet<String>>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            header: true,
            image_base: true,
            text_start: true,
            text_end: true,
            text_size: true,
            path: true,
            filter: None,
        }
    }
}

impl RenderOptions {
    /// Restrict rendering to the given module names.
    pub fn with_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    fn selects(&self, name: &str) -> bool {
        self.filter.as_ref().map_or(true, |f| f.contains(name))
    }
}

/// Collection of uniquely named modules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleTable {
    modules: BTreeMap<String, Module>,
    order: Vec<String>,
    config: TableConfig,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Build a table from modules; fails as a whole on the first conflict.
    pub fn from_modules<I>(modules: I) -> Result<Self>
    where
        I: IntoIterator<Item = Module>,
    {
        Self::with_config(TableConfig::default()).extended(modules)
    }

    /// Build a table from persisted records.
    ///
    /// # Errors
    /// `InvalidModule` if a record fails validation, `DuplicateModuleName`
    /// if two records share a name.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = ModuleRecord>,
    {
        let modules = records
            .into_iter()
            .map(|record| {
                let name = record.name.clone();
                Module::from_record(record).map_err(|e| ModuleError::InvalidModule {
                    name,
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_modules(modules)
    }

    fn extended<I>(mut self, modules: I) -> Result<Self>
    where
        I: IntoIterator<Item = Module>,
    {
        for module in modules {
            self.insert_checked(module)?;
        }
        self.reindex();
        Ok(self)
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    fn reindex(&mut self) {
        let mut sorted: Vec<&Module> = self.modules.values().collect();
        sorted.sort_by(|a, b| a.cmp_by_address(b));
        self.order = sorted.into_iter().map(|m| m.name().to_string()).collect();
    }

    fn check_overlap(&self, candidate: &Module) -> Result<()> {
        if !self.config.strict_overlap {
            return Ok(());
        }
        let Some(range) = candidate.text_range() else {
            return Ok(());
        };
        let clash = self
            .modules
            .values()
            .filter(|m| m.name() != candidate.name())
            .find(|m| m.text_range().is_some_and(|r| r.overlaps(&range)));
        match clash {
            Some(other) => Err(ModuleError::Overlap {
                first: other.name().to_string(),
                second: candidate.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    fn insert_checked(&mut self, module: Module) -> Result<()> {
        if self.modules.contains_key(module.name()) {
            return Err(ModuleError::DuplicateModuleName(module.name().to_string()));
        }
        self.check_overlap(&module)?;
        self.modules.insert(module.name().to_string(), module);
        Ok(())
    }

    /// Add a module.
    ///
    /// # Errors
    /// `DuplicateModuleName` if the name is taken, `Overlap` in strict mode.
    /// The table is unchanged on error.
    pub fn add_module(&mut self, module: Module) -> Result<()> {
        self.insert_checked(module)?;
        self.reindex();
        Ok(())
    }

    /// Insert or overwrite the module with the same name, returning the old one.
    pub fn replace_module(&mut self, module: Module) -> Result<Option<Module>> {
        self.check_overlap(&module)?;
        let previous = self.modules.insert(module.name().to_string(), module);
        self.reindex();
        Ok(previous)
    }

    pub fn remove_module(&mut self, name: &str) -> Result<Module> {
        let module = self
            .modules
            .remove(name)
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))?;
        self.reindex();
        Ok(module)
    }

    pub fn get_module(&self, name: &str) -> Result<&Module> {
        self.modules
            .get(name)
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module names in address order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Modules in address order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().filter_map(move |name| self.modules.get(name))
    }

    /// Apply a change to a copy of one module and commit it if the result is
    /// acceptable to the table.
    fn update<F>(&mut self, name: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut Module) -> Result<()>,
    {
        let mut candidate = self.get_module(name)?.clone();
        change(&mut candidate)?;
        self.check_overlap(&candidate)?;
        self.modules.insert(name.to_string(), candidate);
        self.reindex();
        Ok(())
    }

    pub fn set_image_base(&mut self, name: &str, base: Address) -> Result<()> {
        self.update(name, |m| {
            m.set_image_base(base);
            Ok(())
        })
    }

    pub fn set_address_info(
        &mut self,
        name: &str,
        base: Address,
        start: Address,
        end: Address,
        size: u64,
    ) -> Result<()> {
        self.update(name, |m| m.set_address_info(base, start, end, size))
    }

    /// Fill the code-section bounds of a single module.
    pub fn fill_text_info<R>(&mut self, name: &str, reader: &R) -> Result<()>
    where
        R: ArtifactReader + ?Sized,
    {
        self.update(name, |m| m.fill_text_info(reader))
    }

    /// Fill every module's code-section bounds.
    ///
    /// Every module is attempted; failures are collected in the report and
    /// modules that completed stay complete. With `strict_overlap`, a module
    /// whose new code section overlaps another is put back as it was before
    /// the fill and reported as `Overlap`.
    pub fn fill_all_text_info<R>(&mut self, reader: &R) -> BatchReport
    where
        R: ArtifactReader + ?Sized,
    {
        let previous = self.strict_snapshot();
        let mut report = BatchReport::new();
        for (name, module) in self.modules.iter_mut() {
            report.record(name.clone(), module.fill_text_info(reader));
        }
        self.finish_fill(report, previous)
    }

    /// [`fill_all_text_info`](Self::fill_all_text_info) across the rayon pool.
    pub fn fill_all_text_info_parallel<R>(&mut self, reader: &R) -> BatchReport
    where
        R: ArtifactReader + Sync + ?Sized,
    {
        let previous = self.strict_snapshot();
        let outcomes: Vec<(String, Result<()>)> = self
            .modules
            .par_iter_mut()
            .map(|(name, module)| (name.clone(), module.fill_text_info(reader)))
            .collect();

        let mut report = BatchReport::new();
        for (name, outcome) in outcomes {
            report.record(name, outcome);
        }
        self.finish_fill(report, previous)
    }

    fn strict_snapshot(&self) -> Option<BTreeMap<String, Module>> {
        self.config.strict_overlap.then(|| self.modules.clone())
    }

    fn finish_fill(
        &mut self,
        mut report: BatchReport,
        previous: Option<BTreeMap<String, Module>>,
    ) -> BatchReport {
        self.reindex();
        if let Some(previous) = previous {
            self.roll_back_overlaps(&mut report, previous);
        }

        debug!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Filled module table"
        );
        report
    }

    /// Restore filled modules from `previous`, one per overlapping pair in
    /// address order, until no filled module overlaps another.
    ///
    /// Only filled modules are rolled back; the rest keep the bounds they had
    /// before the fill, which were already overlap-free.
    fn roll_back_overlaps(
        &mut self,
        report: &mut BatchReport,
        mut previous: BTreeMap<String, Module>,
    ) {
        let mut filled: BTreeSet<String> = report.succeeded.iter().cloned().collect();
        loop {
            let clash = self.overlapping_pairs().into_iter().find_map(|(a, b)| {
                if filled.contains(b.name()) {
                    Some((a.name().to_string(), b.name().to_string()))
                } else if filled.contains(a.name()) {
                    Some((b.name().to_string(), a.name().to_string()))
                } else {
                    None
                }
            });
            let Some((kept, rolled_back)) = clash else {
                break;
            };

            warn!(first = %kept, second = %rolled_back, "Overlapping code sections");
            filled.remove(&rolled_back);
            if let Some(module) = previous.remove(&rolled_back) {
                self.modules.insert(rolled_back.clone(), module);
            }
            self.reindex();
            report.demote(
                &rolled_back,
                ModuleError::Overlap {
                    first: kept,
                    second: rolled_back.clone(),
                },
            );
        }
    }

    /// Pairs of complete modules whose code sections overlap, in address order.
    pub fn overlapping_pairs(&self) -> Vec<(&Module, &Module)> {
        let complete: Vec<_> = self
            .modules()
            .filter_map(|m| m.text_range().map(|r| (m, r)))
            .collect();

        let mut pairs = Vec::new();
        for (i, (a, range_a)) in complete.iter().enumerate() {
            for (b, range_b) in &complete[i + 1..] {
                if range_b.start >= range_a.end() {
                    break;
                }
                if range_a.overlaps(range_b) {
                    pairs.push((*a, *b));
                }
            }
        }
        pairs
    }

    /// The module whose code section contains `address`.
    pub fn module_at(&self, address: Address) -> Option<&Module> {
        self.modules()
            .find(|m| m.text_range().is_some_and(|r| r.contains(address)))
    }

    /// One `name base start-end` line per module.
    pub fn render_short(&self) -> Vec<String> {
        self.modules().map(Module::to_string).collect()
    }

    /// Fixed-width table of the selected modules and columns.
    pub fn render_table(&self, options: &RenderOptions) -> Vec<String> {
        let mut lines = Vec::new();

        if options.header {
            lines.push(render_row(
                options,
                "Module Name",
                "Image Base",
                ".text Start",
                ".text End",
                "Size",
                "Path",
            ));
        }

        for module in self.modules().filter(|m| options.selects(m.name())) {
            let padded = |addr: Option<Address>| {
                addr.map(|a| a.to_padded_hex(ADDR_WIDTH))
                    .unwrap_or_else(|| "-".to_string())
            };
            let size = module
                .text_size()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let path = module
                .resolved_artifact()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            lines.push(render_row(
                options,
                module.name(),
                &padded(module.img_base()),
                &padded(module.text_start()),
                &padded(module.text_end()),
                &size,
                &path,
            ));
        }
        lines
    }

    /// Serialize to a JSON array of records in address order.
    pub fn to_json(&self, filter: Option<&BTreeSet<String>>, pretty: bool) -> Result<String> {
        let records: Vec<ModuleRecord> = self
            .modules()
            .filter(|m| filter.map_or(true, |f| f.contains(m.name())))
            .map(Module::to_record)
            .collect();

        if !pretty {
            return serde_json::to_string(&records).map_err(|e| ModuleError::malformed("table", e));
        }

        let indent = vec![b' '; self.config.json_indent];
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&indent));
        records
            .serialize(&mut serializer)
            .map_err(|e| ModuleError::malformed("table", e))?;
        String::from_utf8(buf).map_err(|e| ModuleError::malformed("table", e))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_json_with_config(text, TableConfig::default())
    }

    /// Parse a JSON array of records.
    ///
    /// # Errors
    /// `MalformedRecord` if the document is not an array or an entry is
    /// invalid, `DuplicateModuleName` if two entries share a name.
    pub fn from_json_with_config(text: &str, config: TableConfig) -> Result<Self> {
        let entries: Vec<serde_json::Value> =
            serde_json::from_str(text).map_err(|e| ModuleError::malformed("table", e))?;

        let mut table = Self::with_config(config);
        for (index, entry) in entries.into_iter().enumerate() {
            let record: ModuleRecord = serde_json::from_value(entry)
                .map_err(|e| ModuleError::malformed(format!("#{index}"), e))?;
            table.insert_checked(Module::from_record(record)?)?;
        }
        table.reindex();
        Ok(table)
    }

    pub fn write_to_file(
        &self,
        path: impl AsRef<Path>,
        filter: Option<&BTreeSet<String>>,
        pretty: bool,
    ) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json(filter, pretty)?;
        fs::write(path, json)?;
        debug!(path = %path.display(), modules = self.len(), "Wrote module table");
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_from_file_with_config(path, TableConfig::default())
    }

    pub fn read_from_file_with_config(path: impl AsRef<Path>, config: TableConfig) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let table = Self::from_json_with_config(&text, config)?;
        debug!(path = %path.display(), modules = table.len(), "Loaded module table");
        Ok(table)
    }

    /// Artifact to image base mapping for every address-complete module.
    ///
    /// Keyed on the debug file when one is set, else the resolved artifact.
    pub fn to_address_mapping(&self) -> ImportTargets {
        let mut targets = ImportTargets::new();
        for module in self.modules().filter(|m| m.is_address_complete()) {
            let path = module.debug_path().or_else(|| module.resolved_artifact());
            if let (Some(path), Some(base)) = (path, module.img_base()) {
                targets.insert(path, base);
            }
        }
        targets
    }
}

fn render_row(
    options: &RenderOptions,
    name: &str,
    base: &str,
    start: &str,
    end: &str,
    size: &str,
    path: &str,
) -> String {
    let mut cells = vec![format!("{:<width$}", name, width = NAME_WIDTH)];
    if options.image_base {
        cells.push(format!("{:<width$}", base, width = ADDR_WIDTH));
    }
    if options.text_start {
        cells.push(format!("{:<width$}", start, width = ADDR_WIDTH));
    }
    if options.text_end {
        cells.push(format!("{:<width$}", end, width = ADDR_WIDTH));
    }
    if options.text_size {
        cells.push(format!("{:>width$}", size, width = SIZE_WIDTH));
    }
    if options.path {
        cells.push(path.to_string());
    }
    cells.join(" ").trim_end().to_string()
}

impl fmt::Display for ModuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, module) in self.modules().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{module}")?;
        }
        Ok(())
    }
}
