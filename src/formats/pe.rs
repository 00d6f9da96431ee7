//! PE/EFI optional-header walk.
//!
//! Only the handful of fields needed to place the code section are decoded:
//! DOS `e_lfanew`, the `PE\0\0` signature, the COFF optional-header size, and
//! the optional header's magic, `SizeOfCode` and `BaseOfCode`.

use crate::core::address::Address;
use crate::formats::{ArtifactFormat, CodeSection, FormatError};

pub const DOS_SIGNATURE: u16 = 0x5A4D; // "MZ"
pub const PE_SIGNATURE: u32 = 0x0000_4550; // "PE\0\0"
pub const PE32_MAGIC: u16 = 0x10b;
pub const PE32PLUS_MAGIC: u16 = 0x20b;

const DOS_HEADER_SIZE: usize = 64;
const E_LFANEW_OFFSET: usize = 60;
const COFF_HEADER_SIZE: usize = 20;
const SIZE_OF_OPTIONAL_HEADER_OFFSET: usize = 16;
const SIZE_OF_CODE_OFFSET: usize = 4;
const BASE_OF_CODE_OFFSET: usize = 20;
// Magic through BaseOfCode; identical for PE32 and PE32+.
const OPTIONAL_HEADER_MIN: usize = 24;

/// Extension trait for reading little-endian integers from byte slices
pub trait ReadExt {
    fn read_u16_le_at(&self, offset: usize) -> Option<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Option<u32>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Option<u16> {
        self.get(offset..offset.checked_add(2)?)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Option<u32> {
        self.get(offset..offset.checked_add(4)?)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }
}

fn u16_at(data: &[u8], offset: usize) -> Result<u16, FormatError> {
    data.read_u16_le_at(offset)
        .ok_or(FormatError::Truncated { offset, needed: 2 })
}

fn u32_at(data: &[u8], offset: usize) -> Result<u32, FormatError> {
    data.read_u32_le_at(offset)
        .ok_or(FormatError::Truncated { offset, needed: 4 })
}

/// Read `BaseOfCode` and `SizeOfCode` from a PE32 or PE32+ image.
pub fn code_section(data: &[u8]) -> Result<CodeSection, FormatError> {
    if data.len() < DOS_HEADER_SIZE {
        return Err(FormatError::Truncated {
            offset: 0,
            needed: DOS_HEADER_SIZE,
        });
    }
    if u16_at(data, 0)? != DOS_SIGNATURE {
        return Err(FormatError::UnknownFormat);
    }

    let nt_offset = u32_at(data, E_LFANEW_OFFSET)? as usize;
    if u32_at(data, nt_offset)? != PE_SIGNATURE {
        return Err(FormatError::InvalidPeSignature);
    }

    let coff_offset = nt_offset + 4;
    let optional_size = u16_at(data, coff_offset + SIZE_OF_OPTIONAL_HEADER_OFFSET)? as usize;
    let optional_offset = coff_offset + COFF_HEADER_SIZE;
    if optional_size < OPTIONAL_HEADER_MIN || data.len() < optional_offset + OPTIONAL_HEADER_MIN {
        return Err(FormatError::Truncated {
            offset: optional_offset,
            needed: OPTIONAL_HEADER_MIN,
        });
    }

    let magic = u16_at(data, optional_offset)?;
    if magic != PE32_MAGIC && magic != PE32PLUS_MAGIC {
        return Err(FormatError::InvalidMagic(magic));
    }

    let size_of_code = u32_at(data, optional_offset + SIZE_OF_CODE_OFFSET)?;
    let base_of_code = u32_at(data, optional_offset + BASE_OF_CODE_OFFSET)?;
    if size_of_code == 0 {
        return Err(FormatError::NoCodeSection("SizeOfCode".to_string()));
    }

    Ok(CodeSection {
        offset: Address::from(base_of_code),
        size: u64::from(size_of_code),
        format: ArtifactFormat::Pe,
    })
}
