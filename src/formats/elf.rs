//! ELF code-section lookup.

use crate::core::address::Address;
use crate::formats::{ArtifactFormat, CodeSection, FormatError};
use object::{Object, ObjectSection};

/// Find the first section whose name starts with `prefix` and return its
/// link-time address and size.
///
/// Debug files of firmware modules are linked at zero, so `sh_addr` of the
/// code section is its offset from the image base.
pub fn code_section(data: &[u8], prefix: &str) -> Result<CodeSection, FormatError> {
    let file = object::File::parse(data).map_err(|e| FormatError::Elf(e.to_string()))?;

    let section = file
        .sections()
        .find(|s| s.name().map(|n| n.starts_with(prefix)).unwrap_or(false))
        .ok_or_else(|| FormatError::NoCodeSection(prefix.to_string()))?;

    Ok(CodeSection {
        offset: Address::new(section.address()),
        size: section.size(),
        format: ArtifactFormat::Elf,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::testdata::elf_with_section;

    #[test]
    fn test_text_section() {
        let data = elf_with_section(".text", 0x240, 0x1a3c);
        let section = code_section(&data, ".text").unwrap();
        assert_eq!(section.offset.value(), 0x240);
        assert_eq!(section.size, 0x1a3c);
        assert_eq!(section.format, ArtifactFormat::Elf);
    }

    #[test]
    fn test_prefix_match() {
        let data = elf_with_section(".text.startup", 0x80, 0x10);
        let section = code_section(&data, ".text").unwrap();
        assert_eq!(section.offset.value(), 0x80);
    }

    #[test]
    fn test_missing_section() {
        let data = elf_with_section(".data", 0x80, 0x10);
        assert!(matches!(
            code_section(&data, ".text"),
            Err(FormatError::NoCodeSection(_))
        ));
    }

    #[test]
    fn test_garbage() {
        let data = b"\x7fELF garbage";
        assert!(matches!(code_section(data, ".text"), Err(FormatError::Elf(_))));
    }
}
