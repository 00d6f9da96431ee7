//! Minimal artifact images for tests.
//!
//! Shared with the integration tests through `tests/common`, so this file
//! must not depend on anything inside the crate.

#![allow(dead_code)]

/// Little-endian ELF64: null section, one `SHT_NOBITS` code section at
/// `addr`, and `.shstrtab`.
pub fn elf_with_section(section_name: &str, addr: u64, size: u64) -> Vec<u8> {
    let mut strtab = vec![0u8];
    let name_off = strtab.len() as u32;
    strtab.extend_from_slice(section_name.as_bytes());
    strtab.push(0);
    let shstr_off = strtab.len() as u32;
    strtab.extend_from_slice(b".shstrtab\0");

    let strtab_offset = 64usize;
    let shoff = (strtab_offset + strtab.len() + 7) & !7;
    let mut data = vec![0u8; shoff + 3 * 64];

    data[0..4].copy_from_slice(b"\x7fELF");
    data[4] = 2; // ELFCLASS64
    data[5] = 1; // ELFDATA2LSB
    data[6] = 1; // EV_CURRENT
    data[16..18].copy_from_slice(&3u16.to_le_bytes()); // ET_DYN
    data[18..20].copy_from_slice(&0x3eu16.to_le_bytes()); // EM_X86_64
    data[20..24].copy_from_slice(&1u32.to_le_bytes());
    data[40..48].copy_from_slice(&(shoff as u64).to_le_bytes());
    data[52..54].copy_from_slice(&64u16.to_le_bytes()); // e_ehsize
    data[54..56].copy_from_slice(&56u16.to_le_bytes()); // e_phentsize
    data[58..60].copy_from_slice(&64u16.to_le_bytes()); // e_shentsize
    data[60..62].copy_from_slice(&3u16.to_le_bytes()); // e_shnum
    data[62..64].copy_from_slice(&2u16.to_le_bytes()); // e_shstrndx

    data[strtab_offset..strtab_offset + strtab.len()].copy_from_slice(&strtab);

    let text = shoff + 64;
    data[text..text + 4].copy_from_slice(&name_off.to_le_bytes());
    data[text + 4..text + 8].copy_from_slice(&8u32.to_le_bytes()); // SHT_NOBITS
    data[text + 8..text + 16].copy_from_slice(&6u64.to_le_bytes()); // ALLOC | EXECINSTR
    data[text + 16..text + 24].copy_from_slice(&addr.to_le_bytes());
    data[text + 24..text + 32].copy_from_slice(&(shoff as u64).to_le_bytes());
    data[text + 32..text + 40].copy_from_slice(&size.to_le_bytes());
    data[text + 48..text + 56].copy_from_slice(&16u64.to_le_bytes());

    let shstr = shoff + 128;
    data[shstr..shstr + 4].copy_from_slice(&shstr_off.to_le_bytes());
    data[shstr + 4..shstr + 8].copy_from_slice(&3u32.to_le_bytes()); // SHT_STRTAB
    data[shstr + 24..shstr + 32].copy_from_slice(&(strtab_offset as u64).to_le_bytes());
    data[shstr + 32..shstr + 40].copy_from_slice(&(strtab.len() as u64).to_le_bytes());
    data[shstr + 48..shstr + 56].copy_from_slice(&1u64.to_le_bytes());

    data
}

/// PE image: DOS header, `PE\0\0`, COFF header and the optional header
/// through `BaseOfCode`, with the given optional-header magic.
pub fn pe_image(magic: u16, base_of_code: u32, size_of_code: u32) -> Vec<u8> {
    let nt = 0x80usize;
    let mut data = vec![0u8; nt + 4 + 20 + 0xf0];
    data[0..2].copy_from_slice(b"MZ");
    data[60..64].copy_from_slice(&(nt as u32).to_le_bytes());
    data[nt..nt + 4].copy_from_slice(b"PE\0\0");
    let coff = nt + 4;
    data[coff..coff + 2].copy_from_slice(&0x8664u16.to_le_bytes());
    data[coff + 16..coff + 18].copy_from_slice(&0xf0u16.to_le_bytes());
    let opt = coff + 20;
    data[opt..opt + 2].copy_from_slice(&magic.to_le_bytes());
    data[opt + 4..opt + 8].copy_from_slice(&size_of_code.to_le_bytes());
    data[opt + 20..opt + 24].copy_from_slice(&base_of_code.to_le_bytes());
    data
}

/// PE32+ image, the layout of EFI binaries.
pub fn pe32plus(base_of_code: u32, size_of_code: u32) -> Vec<u8> {
    pe_image(0x20b, base_of_code, size_of_code)
}
