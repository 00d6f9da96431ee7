//! Common test utilities and helpers.
//!
//! Shared fixtures for the integration tests: a firmware build directory in a
//! temp dir, minimal artifact images, and stub readers.

#![allow(dead_code)]

#[path = "../../src/formats/testdata.rs"]
pub mod artifacts;

use fwmodules::{Address, ArtifactFormat, CodeSection, Module, ModuleError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary firmware build output directory.
pub struct BuildDir {
    dir: TempDir,
}

impl BuildDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file into the build directory and return its path.
    pub fn write(&self, file_name: &str, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join(file_name);
        fs::write(&path, content).unwrap();
        path
    }

    /// `<name>.debug` holding an ELF whose `.text` sits at `offset`.
    pub fn debug_elf(&self, name: &str, offset: u64, size: u64) -> PathBuf {
        self.write(
            &format!("{name}.debug"),
            &artifacts::elf_with_section(".text", offset, size),
        )
    }

    /// `<name>.efi` holding a PE32+ image with the given code base and size.
    pub fn efi_image(&self, name: &str, base_of_code: u32, size_of_code: u32) -> PathBuf {
        self.write(
            &format!("{name}.efi"),
            &artifacts::pe32plus(base_of_code, size_of_code),
        )
    }

    /// A module with an image base whose artifact is an empty placeholder file.
    pub fn placeholder_module(&self, name: &str, base: u64) -> Module {
        let path = self.write(&format!("{name}.debug"), b"");
        Module::create(name, Some(Address::new(base)), Some(path), None, None).unwrap()
    }
}

/// Reader serving fixed code sections by artifact file stem.
pub fn stub_reader(
    sections: &'static [(&'static str, u64, u64)],
) -> impl Fn(&Path) -> Result<CodeSection> + Sync {
    move |path: &Path| {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        sections
            .iter()
            .find(|(name, _, _)| *name == stem)
            .map(|&(_, offset, size)| CodeSection {
                offset: Address::new(offset),
                size,
                format: ArtifactFormat::Elf,
            })
            .ok_or_else(|| ModuleError::ArtifactRead {
                path: path.to_path_buf(),
                reason: "no code section".to_string(),
            })
    }
}
