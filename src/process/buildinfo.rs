//! Reads the toolchain version embedded by the Go linker in every executable.
//!
//! The linker emits a 32-byte header starting with `\xff Go buildinf:` in a dedicated
//! section (`.go.buildinfo` on ELF, `__go_buildinfo` on Mach-O, inside `.data` on PE).
//! Since Go 1.18 the version string is inlined right after the header, older
//! toolchains store pointers to a string header instead.

use std::fs::File;
use std::path::Path;

use crate::prelude::*;
use gimli::{EndianSlice, LittleEndian};
use object::{Object, ObjectSection};

const BUILDINFO_MAGIC: &[u8] = b"\xff Go buildinf:";
const BUILDINFO_ALIGN: usize = 16;
const BUILDINFO_HEADER_SIZE: usize = 32;
const BUILDINFO_SECTIONS: [&str; 3] = [".go.buildinfo", "__go_buildinfo", ".data"];
/// The header is always near the start of `.data` when there is no dedicated section
const MAX_SEARCH_LEN: usize = 64 * 1024;

const FLAG_BIG_ENDIAN: u8 = 0x1;
const FLAG_INLINE_STRINGS: u8 = 0x2;

pub fn read_go_version(path: &Path) -> Result<String> {
    let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    let object = object::File::parse(&*mmap)?;

    let section = BUILDINFO_SECTIONS
        .iter()
        .find_map(|name| object.section_by_name(name))
        .ok_or_else(|| anyhow!("No build info section"))?;
    let data = section.data()?;
    let header = find_header(data).ok_or_else(|| anyhow!("No build info header"))?;

    let version = if header[15] & FLAG_INLINE_STRINGS != 0 {
        let (version, _) = decode_string(&header[BUILDINFO_HEADER_SIZE..])
            .ok_or_else(|| anyhow!("Truncated build info"))?;
        version.to_vec()
    } else {
        read_indirect_version(&object, header)?
    };

    Ok(String::from_utf8(version)?)
}

/// Locate the aligned build info header in a section
fn find_header(data: &[u8]) -> Option<&[u8]> {
    let search_len = data.len().min(MAX_SEARCH_LEN);
    (0..search_len)
        .step_by(BUILDINFO_ALIGN)
        .map(|offset| &data[offset..])
        .find(|candidate| {
            candidate.len() >= BUILDINFO_HEADER_SIZE && candidate.starts_with(BUILDINFO_MAGIC)
        })
}

/// Split a uvarint length-prefixed string from the front of `data`
fn decode_string(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut reader = EndianSlice::new(data, LittleEndian);
    let len = usize::try_from(gimli::leb128::read::unsigned(&mut reader).ok()?).ok()?;
    let rest = reader.slice();
    (rest.len() >= len).then(|| rest.split_at(len))
}

/// Pre-1.18 layout: the header holds the address of a `(ptr, len)` string header
fn read_indirect_version(object: &object::File, header: &[u8]) -> Result<Vec<u8>> {
    let ptr_size = header[14] as usize;
    let big_endian = header[15] & FLAG_BIG_ENDIAN != 0;
    ensure!(
        ptr_size == 4 || ptr_size == 8,
        "Unsupported pointer size {ptr_size}"
    );

    let read_ptr = |bytes: &[u8]| -> Option<u64> {
        let bytes = bytes.get(..ptr_size)?;
        let mut value = 0u64;
        for i in 0..ptr_size {
            let byte = if big_endian {
                bytes[i]
            } else {
                bytes[ptr_size - 1 - i]
            };
            value = (value << 8) | byte as u64;
        }
        Some(value)
    };
    let read_at = |address: u64, size: u64| {
        object
            .sections()
            .find_map(|section| section.data_range(address, size).ok().flatten())
    };

    let version_header_addr = read_ptr(&header[16..]).context("Truncated build info")?;
    let string_header = read_at(version_header_addr, 2 * ptr_size as u64)
        .context("Version string header out of bounds")?;
    let data_addr = read_ptr(string_header).context("Truncated string header")?;
    let data_len = read_ptr(&string_header[ptr_size..]).context("Truncated string header")?;
    let version = read_at(data_addr, data_len).context("Version string out of bounds")?;

    Ok(version.to_vec())
}
