//! The ELF64 object front-end.
//!
//! Parsing runs in three passes over the section header table:
//!
//! 1. **Section scan** — allocated `PROGBITS`/`NOBITS` sections become
//!    IR sections; symbol and relocation tables are remembered for the
//!    later passes; everything else is skipped, with a record
//!    explaining why.
//! 2. **Symbol table** — entries are classified into the IR symbol
//!    states; non-local ones are merged into the global map, and the
//!    local table stores whichever symbol survived.
//! 3. **Relocation tables** — each `RELA` entry becomes a relocation
//!    attached to the section it patches, targeting the symbol its
//!    index resolves to.

use std::borrow::Cow;

use bstr::BString;

use rivet_object::elf64::{
    string_at, table_slice, FileHeader, RelaRecord, SectionFlag, SectionHeader, SectionType,
    SymbolBinding, SymbolPlace, SymbolRecord, SymbolType,
};
use rivet_object::{elf64::Machine, Endianness, LittleEndian};

use crate::{
    diag::Frame,
    frontend::ObjectFrontend,
    ir::{Binding, FileId, ObjectFile, Reloc, Section, SectionKind, Symbol, SymbolKind, SymbolState},
    Context, Error,
};

/// The ELF64 relocatable-object front-end.
pub struct Elf64Frontend;

impl ObjectFrontend for Elf64Frontend {
    fn name(&self) -> &'static str {
        "elf64"
    }

    fn probe(&self, bytes: &[u8]) -> Option<Machine> {
        FileHeader::probe(bytes)
    }

    fn parse<'a>(
        &self,
        ctx: &mut Context<'a>,
        name: &str,
        bytes: &'a [u8],
    ) -> Result<FileId, Error> {
        let malformed = |detail: &str| Error::Malformed {
            file: name.to_string(),
            detail: detail.to_string(),
        };

        let (_, header) = FileHeader::read::<()>(bytes)
            .map_err(|_| malformed("cannot parse the file header"))?;

        if header.endianness != Endianness::Little {
            return Err(malformed("big-endian objects are not supported"));
        }

        let headers = read_section_headers(bytes, &header).ok_or_else(|| {
            malformed("the section header table runs past the end of the file")
        })?;
        let names = section_names(ctx, bytes, &header, &headers);

        let file_id = ctx.add_file(ObjectFile::new(name, header.machine));

        let mut symtabs = Vec::new();
        let mut relatabs = Vec::new();

        // Pass 1: sections.
        scan_sections(ctx, file_id, name, bytes, &headers, &names, &mut symtabs, &mut relatabs)?;

        // Pass 2: symbols.
        if let Some(&symtab_index) = symtabs.first() {
            for &extra in &symtabs[1..] {
                let _section = ctx.reporter.scope(Frame::section(names[extra].to_string()));
                ctx.reporter.warning("multiple symbol tables detected, only the first is used");
            }

            parse_symbols(ctx, file_id, name, bytes, &headers, &names, symtab_index)?;
        }

        // Pass 3: relocation tables.
        for &rela_index in &relatabs {
            parse_relocations(ctx, file_id, name, bytes, &headers, &names, rela_index)?;
        }

        Ok(file_id)
    }
}

fn read_section_headers(bytes: &[u8], header: &FileHeader) -> Option<Vec<SectionHeader>> {
    if header.section_count == 0 {
        return Some(Vec::new());
    }

    let table = table_slice(
        bytes,
        header.section_header_offset,
        u64::from(header.section_count),
        u64::from(header.section_entry_size),
    )?;

    let mut headers = Vec::with_capacity(header.section_count as usize);
    for entry in table.chunks_exact(header.section_entry_size as usize) {
        let (_, section_header) = SectionHeader::read::<LittleEndian, ()>(entry).ok()?;
        headers.push(section_header);
    }

    Some(headers)
}

/// Resolve every section name through `e_shstrndx`. Missing or broken
/// names degrade to empty strings; a file with a damaged name table is
/// still linkable.
fn section_names(
    ctx: &Context<'_>,
    bytes: &[u8],
    header: &FileHeader,
    headers: &[SectionHeader],
) -> Vec<BString> {
    let strtab = match headers.get(header.section_names_index as usize) {
        Some(section) if header.section_names_index != 0 => {
            if section.r#type != SectionType::StringTable {
                ctx.reporter
                    .warning(format_args!(
                        "section {} should be a string table but is not",
                        header.section_names_index
                    ));
            }
            section.contents(bytes)
        }
        _ => None,
    };

    headers
        .iter()
        .map(|section| {
            strtab
                .and_then(|strtab| string_at(strtab, section.name_offset as usize))
                .map(BString::from)
                .unwrap_or_default()
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn scan_sections<'a>(
    ctx: &mut Context<'a>,
    file_id: FileId,
    file_name: &str,
    bytes: &'a [u8],
    headers: &[SectionHeader],
    names: &[BString],
    symtabs: &mut Vec<usize>,
    relatabs: &mut Vec<usize>,
) -> Result<(), Error> {
    let reporter = ctx.reporter.clone();

    ctx.file_mut(file_id).sections.reserve(headers.len());

    for (shndx, section_header) in headers.iter().enumerate() {
        let _section = reporter.scope(Frame::section(names[shndx].to_string()));

        match section_header.r#type {
            SectionType::Null | SectionType::Note | SectionType::StringTable => {}

            SectionType::SymbolTable => {
                reporter.trace("identified a symbol table");
                symtabs.push(shndx);
            }

            SectionType::RelocationsWithAddends => {
                reporter.trace("identified a relocation table");
                relatabs.push(shndx);
            }

            SectionType::Relocations => {
                return Err(Error::Malformed {
                    file: file_name.to_string(),
                    detail: format!(
                        "section `{}` holds REL relocations (without addends), which are not supported",
                        names[shndx]
                    ),
                });
            }

            SectionType::Group => {
                reporter.warning("section groups are not supported");
            }

            SectionType::ProgramBits
            | SectionType::NoBits
            | SectionType::InitArray
            | SectionType::FiniArray
            | SectionType::PreInitArray => {}

            other => {
                reporter.info(format_args!("unknown section type {:#x}, skipped", other.code()));
            }
        }

        // Only allocated data sections reach the image.
        if !section_header.flags.contains(SectionFlag::Allocated) {
            continue;
        }

        let kind = match section_header.r#type {
            SectionType::NoBits => SectionKind::Zero,

            SectionType::ProgramBits => {
                if section_header.flags.contains(SectionFlag::Executable) {
                    SectionKind::Text
                } else if section_header.flags.contains(SectionFlag::Writable) {
                    SectionKind::Data
                } else {
                    SectionKind::Rodata
                }
            }

            SectionType::InitArray | SectionType::FiniArray | SectionType::PreInitArray => {
                reporter.warning(
                    "constructor/destructor arrays are not yet supported, carried as plain data",
                );
                SectionKind::Data
            }

            _ => continue,
        };

        let contents = section_header.contents(bytes).ok_or_else(|| Error::Malformed {
            file: file_name.to_string(),
            detail: format!("section `{}` runs past the end of the file", names[shndx]),
        })?;

        let section = Section {
            file: file_id,
            input_index: shndx,
            name: names[shndx].clone(),
            kind,
            align: section_header.alignment(),
            size: section_header.size,
            content: Cow::Borrowed(contents),
            relocs: Vec::new(),
            vaddr: None,
        };

        let section_id = ctx.add_section(section);
        ctx.file_mut(file_id).sections.insert(shndx, section_id).map_err(|_| {
            Error::Malformed {
                file: file_name.to_string(),
                detail: format!("duplicate section index {shndx}"),
            }
        })?;

        reporter.trace(format_args!("added section {shndx} to the section table"));
    }

    Ok(())
}

fn parse_symbols<'a>(
    ctx: &mut Context<'a>,
    file_id: FileId,
    file_name: &str,
    bytes: &'a [u8],
    headers: &[SectionHeader],
    names: &[BString],
    symtab_index: usize,
) -> Result<(), Error> {
    let reporter = ctx.reporter.clone();
    let symtab = &headers[symtab_index];
    let _section = reporter.scope(Frame::section(names[symtab_index].to_string()));

    let malformed = |detail: String| Error::Malformed { file: file_name.to_string(), detail };

    if symtab.entsize != SymbolRecord::SIZE as u64 {
        return Err(malformed(format!("unexpected symbol entry size {}", symtab.entsize)));
    }

    let count = symtab.size / symtab.entsize;
    let table = table_slice(bytes, symtab.offset, count, symtab.entsize)
        .ok_or_else(|| malformed("the symbol table runs past the end of the file".into()))?;

    let strtab = headers
        .get(symtab.link as usize)
        .filter(|linked| linked.r#type == SectionType::StringTable)
        .and_then(|linked| linked.contents(bytes))
        .ok_or_else(|| malformed("the symbol table has no usable string table".into()))?;

    ctx.file_mut(file_id).symbols.reserve(count as usize);

    // Entry 0 is the null symbol; its slot stays vacant.
    for (index, entry) in table.chunks_exact(SymbolRecord::SIZE).enumerate().skip(1) {
        let (_, record) = SymbolRecord::read::<LittleEndian, ()>(entry)
            .map_err(|_| malformed(format!("cannot parse symbol {index}")))?;

        let mut name = string_at(strtab, record.name_offset as usize)
            .map(BString::from)
            .unwrap_or_default();

        let _symbol = reporter.scope(Frame::symbol(name.to_string()));

        let mut binding = match record.binding {
            SymbolBinding::Local => Binding::Local,
            SymbolBinding::Global => Binding::Global,
            SymbolBinding::Weak => Binding::Weak,
            SymbolBinding::Other(code) => {
                reporter.warning(format_args!("unknown binding {code:#x}, treated as local"));
                Binding::Local
            }
        };

        let kind = match record.r#type {
            SymbolType::NoType => SymbolKind::NoType,
            SymbolType::Object => SymbolKind::Object,
            SymbolType::Function => SymbolKind::Function,
            SymbolType::Section => SymbolKind::Section,
            SymbolType::ThreadLocal => SymbolKind::Tls,
            SymbolType::Common => SymbolKind::NoType,

            SymbolType::File => {
                reporter.trace("ignoring the source-file symbol");
                continue;
            }

            SymbolType::Other(code) if record.r#type.is_processor_specific() => {
                reporter.warning(format_args!("unsupported processor-specific type {code:#x}, dropped"));
                continue;
            }

            SymbolType::Other(code) => {
                reporter.warning(format_args!("unknown symbol type {code:#x}"));
                SymbolKind::NoType
            }
        };

        let state = if record.r#type == SymbolType::Common {
            // An explicit common type is a tentative definition that
            // anything real may override.
            binding = Binding::Weak;
            SymbolState::Common { size: record.size, align: record.value.max(1) }
        } else {
            match record.place {
                SymbolPlace::Undefined => SymbolState::Undefined,

                SymbolPlace::Absolute => SymbolState::Defined {
                    section: None,
                    offset: record.value,
                    size: record.size,
                },

                SymbolPlace::Common => SymbolState::Common {
                    size: record.size,
                    align: record.value.max(1),
                },

                SymbolPlace::Section(shndx) => {
                    match ctx.file(file_id).sections.get(shndx as usize) {
                        Some(&section_id) => {
                            if kind == SymbolKind::Section {
                                name = ctx.section(section_id).name.clone();
                            }
                            SymbolState::Defined {
                                section: Some(section_id),
                                offset: record.value,
                                size: record.size,
                            }
                        }

                        // The section was deliberately not loaded
                        // (non-allocated). Local symbols into it are
                        // dropped; a global one is a real problem.
                        None if binding == Binding::Local => {
                            reporter.trace(format_args!(
                                "symbol refers to unloaded section {shndx}, dropped"
                            ));
                            continue;
                        }

                        None => {
                            return Err(malformed(format!(
                                "symbol `{name}` refers to unknown section {shndx}"
                            )));
                        }
                    }
                }

                SymbolPlace::Extended | SymbolPlace::Reserved(_) => {
                    if binding == Binding::Local {
                        reporter.warning("reserved section index, symbol dropped");
                        continue;
                    }

                    return Err(malformed(format!(
                        "symbol `{name}` uses a reserved section index"
                    )));
                }
            }
        };

        let definer = (state != SymbolState::Undefined).then_some(file_id);
        let symbol = Symbol { name, binding, kind, state, definer, vaddr: None };

        let surviving = if binding == Binding::Local {
            ctx.add_symbol(symbol)
        } else {
            // On a collision the merge rule picks the survivor; the
            // local table stores it either way, so later references
            // through this file observe merges.
            ctx.register_global(symbol)?
        };

        ctx.file_mut(file_id).symbols.insert(index, surviving).map_err(|_| {
            malformed(format!("duplicate symbol index {index}"))
        })?;
    }

    Ok(())
}

fn parse_relocations<'a>(
    ctx: &mut Context<'a>,
    file_id: FileId,
    file_name: &str,
    bytes: &'a [u8],
    headers: &[SectionHeader],
    names: &[BString],
    rela_index: usize,
) -> Result<(), Error> {
    let reporter = ctx.reporter.clone();
    let rela = &headers[rela_index];
    let _section = reporter.scope(Frame::section(names[rela_index].to_string()));

    let malformed = |detail: String| Error::Malformed { file: file_name.to_string(), detail };

    if rela.entsize != RelaRecord::SIZE as u64 {
        return Err(malformed(format!("unexpected relocation entry size {}", rela.entsize)));
    }

    let target_section = match ctx.file(file_id).sections.get(rela.info as usize) {
        Some(&section_id) => section_id,
        None => {
            // The patched section was not loaded (e.g. debug info);
            // its relocations are irrelevant to this link.
            reporter.debug(format_args!(
                "relocations target unloaded section {}, skipped",
                rela.info
            ));
            return Ok(());
        }
    };

    let count = rela.size / rela.entsize;
    let table = table_slice(bytes, rela.offset, count, rela.entsize)
        .ok_or_else(|| malformed("the relocation table runs past the end of the file".into()))?;

    for (index, entry) in table.chunks_exact(RelaRecord::SIZE).enumerate() {
        let (_, record) = RelaRecord::read::<LittleEndian, ()>(entry)
            .map_err(|_| malformed(format!("cannot parse relocation {index}")))?;

        let target = match ctx.file(file_id).symbols.get(record.symbol as usize) {
            Some(&symbol_id) => symbol_id,
            None => {
                return Err(malformed(format!(
                    "relocation {index} refers to unknown symbol index {}",
                    record.symbol
                )));
            }
        };

        reporter.trace(format_args!(
            "relocation {index} at offset {:#x} targets symbol {}",
            record.offset, record.symbol
        ));

        ctx.section_mut(target_section).relocs.push(Reloc {
            offset: record.offset,
            target,
            r#type: record.r#type,
            addend: record.addend,
        });
    }

    Ok(())
}
