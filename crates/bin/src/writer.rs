//! Turns a linked image into an ELF64 executable.
//!
//! The output is the bare minimum the loader needs: a file header, one
//! `PT_LOAD` program header per section group, and the group contents
//! placed so that file offsets and virtual addresses stay congruent
//! modulo the page size. No section headers are emitted; executables
//! do not need them.

use rivet_linker::image::Image;
use rivet_linker::ir::SectionKind;
use rivet_linker::LinkOutput;
use rivet_object::{LittleEndian, Number};

const FILE_HEADER_SIZE: usize = 64;
const PROGRAM_HEADER_SIZE: usize = 56;
const PAGE_SIZE: u64 = 0x1000;

const PF_X: u32 = 0x1;
const PF_W: u32 = 0x2;
const PF_R: u32 = 0x4;

/// The entry point: `_start` if defined, `entrypoint` as a fallback,
/// the image base otherwise.
fn entry_point(output: &LinkOutput) -> u64 {
    ["_start", "entrypoint"]
        .iter()
        .find_map(|name| {
            output.symbols.iter().find(|symbol| symbol.name == *name).map(|symbol| symbol.vaddr)
        })
        .unwrap_or(output.image.base)
}

fn flags(kind: SectionKind) -> u32 {
    match kind {
        SectionKind::Text => PF_R | PF_X,
        SectionKind::Rodata => PF_R,
        SectionKind::Data | SectionKind::Zero => PF_R | PF_W,
    }
}

/// The file offset a group is placed at.
///
/// The first page holds the headers; every group lands at its image
/// offset one page further, which keeps `p_offset ≡ p_vaddr (mod
/// page)` as the loader requires.
fn file_offset(image: &Image, vaddr: u64) -> u64 {
    (vaddr - image.base) + PAGE_SIZE
}

/// Serialize the linked image as an ELF64 executable.
pub(crate) fn write_executable(output: &LinkOutput) -> Vec<u8> {
    let image = &output.image;
    let loaded = &image.groups;

    let mut buffer = Vec::with_capacity(FILE_HEADER_SIZE + PAGE_SIZE as usize);

    // Magic.
    buffer.extend_from_slice(&[0x7f, b'E', b'L', b'F']);
    // 64-bit class.
    buffer.push(0x02);
    // Little endian.
    buffer.push(0x01);
    // Current version.
    buffer.push(0x01);
    // OS ABI: System V, plus padding.
    buffer.extend_from_slice(&[0x00; 9]);
    // File type: executable.
    buffer.extend_from_slice(&LittleEndian::write_u16(0x02));
    // Machine.
    buffer.extend_from_slice(&LittleEndian::write_u16(output.machine.code()));
    // Version, again.
    buffer.extend_from_slice(&LittleEndian::write_u32(0x01));
    // Entry point.
    buffer.extend_from_slice(&LittleEndian::write_u64(entry_point(output)));
    // Program headers, right after the file header.
    buffer.extend_from_slice(&LittleEndian::write_u64(FILE_HEADER_SIZE as u64));
    // No section headers.
    buffer.extend_from_slice(&LittleEndian::write_u64(0));
    // Processor flags.
    buffer.extend_from_slice(&LittleEndian::write_u32(0));
    // Header sizes and counts.
    buffer.extend_from_slice(&LittleEndian::write_u16(FILE_HEADER_SIZE as u16));
    buffer.extend_from_slice(&LittleEndian::write_u16(PROGRAM_HEADER_SIZE as u16));
    buffer.extend_from_slice(&LittleEndian::write_u16(loaded.len() as u16));
    buffer.extend_from_slice(&LittleEndian::write_u16(0)); // e_shentsize
    buffer.extend_from_slice(&LittleEndian::write_u16(0)); // e_shnum
    buffer.extend_from_slice(&LittleEndian::write_u16(0)); // e_shstrndx

    // One PT_LOAD per group. Zero groups occupy memory but no file
    // bytes.
    for group in loaded {
        let in_file = if group.kind == SectionKind::Zero { 0 } else { group.size };

        // Segment type: PT_LOAD.
        buffer.extend_from_slice(&LittleEndian::write_u32(0x01));
        // Flags.
        buffer.extend_from_slice(&LittleEndian::write_u32(flags(group.kind)));
        // File offset.
        buffer.extend_from_slice(&LittleEndian::write_u64(file_offset(image, group.vaddr)));
        // Virtual and physical address.
        buffer.extend_from_slice(&LittleEndian::write_u64(group.vaddr));
        buffer.extend_from_slice(&LittleEndian::write_u64(group.vaddr));
        // Size in the file, size in memory.
        buffer.extend_from_slice(&LittleEndian::write_u64(in_file));
        buffer.extend_from_slice(&LittleEndian::write_u64(group.size));
        // Alignment.
        buffer.extend_from_slice(&LittleEndian::write_u64(PAGE_SIZE));
    }

    // Group contents, at their congruent offsets.
    for group in loaded {
        if group.kind == SectionKind::Zero {
            continue;
        }

        let offset = file_offset(image, group.vaddr) as usize;
        if buffer.len() < offset {
            buffer.resize(offset, 0);
        }
        buffer.extend_from_slice(&group.content);
    }

    buffer
}
