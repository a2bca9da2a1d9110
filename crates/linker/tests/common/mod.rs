//! Builders emitting synthetic ELF64 relocatable objects and System-V
//! archives, byte for byte, so the end-to-end tests control their
//! inputs exactly.

#![allow(dead_code)]

// Section header types and flags.
pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_RELA: u32 = 4;
pub const SHT_NOBITS: u32 = 8;
pub const SHT_REL: u32 = 9;
pub const SHT_INIT_ARRAY: u32 = 14;

pub const SHF_WRITE: u64 = 0x1;
pub const SHF_ALLOC: u64 = 0x2;
pub const SHF_EXECINSTR: u64 = 0x4;

// Symbol bindings and types.
pub const STB_LOCAL: u8 = 0;
pub const STB_GLOBAL: u8 = 1;
pub const STB_WEAK: u8 = 2;

pub const STT_NOTYPE: u8 = 0;
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;
pub const STT_SECTION: u8 = 3;

pub const SHN_UNDEF: u16 = 0;
pub const SHN_ABS: u16 = 0xfff1;
pub const SHN_COMMON: u16 = 0xfff2;

// x86-64 relocation types.
pub const R_X86_64_64: u32 = 1;
pub const R_X86_64_PC32: u32 = 2;
pub const R_X86_64_PLT32: u32 = 4;
pub const R_X86_64_32: u32 = 10;
pub const R_X86_64_32S: u32 = 11;

struct BuiltSection {
    name: String,
    sh_type: u32,
    flags: u64,
    align: u64,
    content: Vec<u8>,
    nobits_size: u64,
}

struct BuiltSymbol {
    name: String,
    info: u8,
    shndx: u16,
    value: u64,
    size: u64,
}

struct BuiltRela {
    section: usize,
    offset: u64,
    r#type: u32,
    symbol: usize,
    addend: i64,
}

/// Builds one ELF64 relocatable object file.
///
/// Section handles returned by the `section` methods are the final
/// section header indices (1-based); symbol handles are the final
/// symbol table indices (entry 0 is the null symbol).
#[derive(Default)]
pub struct ObjectBuilder {
    sections: Vec<BuiltSection>,
    symbols: Vec<BuiltSymbol>,
    relas: Vec<BuiltRela>,
    machine: u16,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self { machine: 0x3e, ..Self::default() }
    }

    /// Override the `e_machine` field.
    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn section(
        &mut self,
        name: &str,
        sh_type: u32,
        flags: u64,
        align: u64,
        content: &[u8],
    ) -> usize {
        self.sections.push(BuiltSection {
            name: name.to_string(),
            sh_type,
            flags,
            align,
            content: content.to_vec(),
            nobits_size: 0,
        });

        self.sections.len()
    }

    pub fn text(&mut self, content: &[u8]) -> usize {
        self.section(".text", SHT_PROGBITS, SHF_ALLOC | SHF_EXECINSTR, 1, content)
    }

    pub fn data(&mut self, content: &[u8], align: u64) -> usize {
        self.section(".data", SHT_PROGBITS, SHF_ALLOC | SHF_WRITE, align, content)
    }

    pub fn rodata(&mut self, content: &[u8], align: u64) -> usize {
        self.section(".rodata", SHT_PROGBITS, SHF_ALLOC, align, content)
    }

    pub fn bss(&mut self, size: u64, align: u64) -> usize {
        self.sections.push(BuiltSection {
            name: ".bss".to_string(),
            sh_type: SHT_NOBITS,
            flags: SHF_ALLOC | SHF_WRITE,
            align,
            content: Vec::new(),
            nobits_size: size,
        });

        self.sections.len()
    }

    pub fn symbol(
        &mut self,
        name: &str,
        bind: u8,
        r#type: u8,
        shndx: u16,
        value: u64,
        size: u64,
    ) -> usize {
        self.symbols.push(BuiltSymbol {
            name: name.to_string(),
            info: (bind << 4) | (r#type & 0x0f),
            shndx,
            value,
            size,
        });

        self.symbols.len()
    }

    pub fn global_func(&mut self, name: &str, section: usize, value: u64, size: u64) -> usize {
        self.symbol(name, STB_GLOBAL, STT_FUNC, section as u16, value, size)
    }

    pub fn weak_func(&mut self, name: &str, section: usize, value: u64, size: u64) -> usize {
        self.symbol(name, STB_WEAK, STT_FUNC, section as u16, value, size)
    }

    pub fn global_object(&mut self, name: &str, section: usize, value: u64, size: u64) -> usize {
        self.symbol(name, STB_GLOBAL, STT_OBJECT, section as u16, value, size)
    }

    pub fn undefined(&mut self, name: &str) -> usize {
        self.symbol(name, STB_GLOBAL, STT_NOTYPE, SHN_UNDEF, 0, 0)
    }

    pub fn undefined_weak(&mut self, name: &str) -> usize {
        self.symbol(name, STB_WEAK, STT_NOTYPE, SHN_UNDEF, 0, 0)
    }

    pub fn common(&mut self, name: &str, size: u64, align: u64) -> usize {
        self.symbol(name, STB_GLOBAL, STT_OBJECT, SHN_COMMON, align, size)
    }

    pub fn absolute(&mut self, name: &str, value: u64) -> usize {
        self.symbol(name, STB_GLOBAL, STT_NOTYPE, SHN_ABS, value, 0)
    }

    pub fn rela(&mut self, section: usize, offset: u64, r#type: u32, symbol: usize, addend: i64) {
        self.relas.push(BuiltRela { section, offset, r#type, symbol, addend });
    }

    pub fn build(&self) -> Vec<u8> {
        // Group relocations by target section, in target order.
        let mut rela_sections: Vec<(usize, Vec<&BuiltRela>)> = Vec::new();
        for rela in &self.relas {
            match rela_sections.iter_mut().find(|(target, _)| *target == rela.section) {
                Some((_, entries)) => entries.push(rela),
                None => rela_sections.push((rela.section, vec![rela])),
            }
        }

        let user_count = self.sections.len();
        let rela_count = rela_sections.len();
        let symtab_index = user_count + rela_count + 1;
        let strtab_index = symtab_index + 1;
        let shstrtab_index = strtab_index + 1;
        let section_count = shstrtab_index + 1;

        // String tables.
        let mut strtab = vec![0u8];
        let symbol_name_offsets: Vec<u32> = self
            .symbols
            .iter()
            .map(|symbol| {
                let offset = strtab.len() as u32;
                strtab.extend_from_slice(symbol.name.as_bytes());
                strtab.push(0);
                offset
            })
            .collect();

        let mut shstrtab = vec![0u8];
        let mut shstr = |name: &str| -> u32 {
            let offset = shstrtab.len() as u32;
            shstrtab.extend_from_slice(name.as_bytes());
            shstrtab.push(0);
            offset
        };

        let user_name_offsets: Vec<u32> =
            self.sections.iter().map(|section| shstr(&section.name)).collect();
        let rela_name_offsets: Vec<u32> = rela_sections
            .iter()
            .map(|(target, _)| shstr(&format!(".rela{}", self.sections[*target - 1].name)))
            .collect();
        let symtab_name_offset = shstr(".symtab");
        let strtab_name_offset = shstr(".strtab");
        let shstrtab_name_offset = shstr(".shstrtab");

        // Symbol table contents.
        let mut symtab = vec![0u8; 24];
        for (symbol, name_offset) in self.symbols.iter().zip(&symbol_name_offsets) {
            symtab.extend_from_slice(&name_offset.to_le_bytes());
            symtab.push(symbol.info);
            symtab.push(0);
            symtab.extend_from_slice(&symbol.shndx.to_le_bytes());
            symtab.extend_from_slice(&symbol.value.to_le_bytes());
            symtab.extend_from_slice(&symbol.size.to_le_bytes());
        }

        // Relocation table contents.
        let rela_contents: Vec<Vec<u8>> = rela_sections
            .iter()
            .map(|(_, entries)| {
                let mut content = Vec::with_capacity(entries.len() * 24);
                for rela in entries {
                    content.extend_from_slice(&rela.offset.to_le_bytes());
                    let info = ((rela.symbol as u64) << 32) | u64::from(rela.r#type);
                    content.extend_from_slice(&info.to_le_bytes());
                    content.extend_from_slice(&rela.addend.to_le_bytes());
                }
                content
            })
            .collect();

        // Lay the file out: header, section contents, header table.
        let mut file = vec![0u8; 64];
        let mut headers: Vec<[u64; 10]> = Vec::with_capacity(section_count);

        // The null section header.
        headers.push([0; 10]);

        let place = |file: &mut Vec<u8>, align: u64, content: &[u8]| -> u64 {
            let align = align.max(1) as usize;
            let padding = (align - file.len() % align) % align;
            file.extend(std::iter::repeat(0).take(padding));
            let offset = file.len() as u64;
            file.extend_from_slice(content);
            offset
        };

        for (section, name_offset) in self.sections.iter().zip(&user_name_offsets) {
            let offset = place(&mut file, section.align, &section.content);
            let size = if section.sh_type == SHT_NOBITS {
                section.nobits_size
            } else {
                section.content.len() as u64
            };

            headers.push([
                u64::from(*name_offset),
                u64::from(section.sh_type),
                section.flags,
                0,
                offset,
                size,
                0,
                0,
                section.align,
                0,
            ]);
        }

        for (((target, _), content), name_offset) in
            rela_sections.iter().zip(&rela_contents).zip(&rela_name_offsets)
        {
            let offset = place(&mut file, 8, content);

            headers.push([
                u64::from(*name_offset),
                u64::from(SHT_RELA),
                0,
                0,
                offset,
                content.len() as u64,
                symtab_index as u64, // sh_link
                *target as u64,      // sh_info
                8,
                24,
            ]);
        }

        let offset = place(&mut file, 8, &symtab);
        headers.push([
            u64::from(symtab_name_offset),
            u64::from(SHT_SYMTAB),
            0,
            0,
            offset,
            symtab.len() as u64,
            strtab_index as u64,
            1, // first non-local; close enough for synthetic files
            8,
            24,
        ]);

        let offset = place(&mut file, 1, &strtab);
        headers.push([
            u64::from(strtab_name_offset),
            u64::from(SHT_STRTAB),
            0,
            0,
            offset,
            strtab.len() as u64,
            0,
            0,
            1,
            0,
        ]);

        let offset = place(&mut file, 1, &shstrtab);
        headers.push([
            u64::from(shstrtab_name_offset),
            u64::from(SHT_STRTAB),
            0,
            0,
            offset,
            shstrtab.len() as u64,
            0,
            0,
            1,
            0,
        ]);

        let shoff = {
            let padding = (8 - file.len() % 8) % 8;
            file.extend(std::iter::repeat(0).take(padding));
            file.len() as u64
        };

        for header in &headers {
            file.extend_from_slice(&(header[0] as u32).to_le_bytes()); // sh_name
            file.extend_from_slice(&(header[1] as u32).to_le_bytes()); // sh_type
            file.extend_from_slice(&header[2].to_le_bytes()); // sh_flags
            file.extend_from_slice(&header[3].to_le_bytes()); // sh_addr
            file.extend_from_slice(&header[4].to_le_bytes()); // sh_offset
            file.extend_from_slice(&header[5].to_le_bytes()); // sh_size
            file.extend_from_slice(&(header[6] as u32).to_le_bytes()); // sh_link
            file.extend_from_slice(&(header[7] as u32).to_le_bytes()); // sh_info
            file.extend_from_slice(&header[8].to_le_bytes()); // sh_addralign
            file.extend_from_slice(&header[9].to_le_bytes()); // sh_entsize
        }

        // Finally the file header.
        file[0..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
        file[4] = 0x02; // ELFCLASS64
        file[5] = 0x01; // ELFDATA2LSB
        file[6] = 0x01; // EV_CURRENT
        file[16..18].copy_from_slice(&1u16.to_le_bytes()); // e_type: ET_REL
        file[18..20].copy_from_slice(&self.machine.to_le_bytes());
        file[20..24].copy_from_slice(&1u32.to_le_bytes()); // e_version
        file[40..48].copy_from_slice(&shoff.to_le_bytes()); // e_shoff
        file[52..54].copy_from_slice(&64u16.to_le_bytes()); // e_ehsize
        file[58..60].copy_from_slice(&64u16.to_le_bytes()); // e_shentsize
        file[60..62].copy_from_slice(&(section_count as u16).to_le_bytes()); // e_shnum
        file[62..64].copy_from_slice(&(shstrtab_index as u16).to_le_bytes()); // e_shstrndx

        file
    }
}

/// Build a System-V archive holding `members`, with a ranlib index
/// mapping each `(symbol, member position)` pair.
///
/// Member names longer than 15 bytes go through a `"//"` long-names
/// table, like `ar(1)` writes them.
pub fn archive(members: &[(&str, Vec<u8>)], index: &[(&str, usize)]) -> Vec<u8> {
    // Long names move into the "//" table; short names are inlined
    // with a '/' terminator.
    let mut long_names: Vec<u8> = Vec::new();
    let name_fields: Vec<String> = members
        .iter()
        .map(|(name, _)| {
            if name.len() > 15 {
                let offset = long_names.len();
                long_names.extend_from_slice(name.as_bytes());
                long_names.extend_from_slice(b"/\n");
                format!("/{offset}")
            } else {
                format!("{name}/")
            }
        })
        .collect();

    // The ranlib payload must exist before member offsets are known,
    // so sizes are computed first.
    let ranlib_len: usize =
        4 + 4 * index.len() + index.iter().map(|(symbol, _)| symbol.len() + 1).sum::<usize>();

    let mut cursor = 8 + 60 + ranlib_len + ranlib_len % 2;
    if !long_names.is_empty() {
        cursor += 60 + long_names.len() + long_names.len() % 2;
    }

    let mut member_offsets = Vec::with_capacity(members.len());
    for (_, content) in members {
        member_offsets.push(cursor as u32);
        cursor += 60 + content.len() + content.len() % 2;
    }

    let mut ranlib = Vec::with_capacity(ranlib_len);
    ranlib.extend_from_slice(&(index.len() as u32).to_be_bytes());
    for (_, member) in index {
        ranlib.extend_from_slice(&member_offsets[*member].to_be_bytes());
    }
    for (symbol, _) in index {
        ranlib.extend_from_slice(symbol.as_bytes());
        ranlib.push(0);
    }

    let mut bytes = b"!<arch>\n".to_vec();

    let header = |bytes: &mut Vec<u8>, name: &str, size: usize| {
        bytes.extend_from_slice(format!("{name:<16}").as_bytes());
        bytes.extend_from_slice(b"0           "); // date
        bytes.extend_from_slice(b"0     "); // uid
        bytes.extend_from_slice(b"0     "); // gid
        bytes.extend_from_slice(b"644     "); // mode
        bytes.extend_from_slice(format!("{size:<10}").as_bytes());
        bytes.extend_from_slice(b"`\n");
    };

    let pad = |bytes: &mut Vec<u8>| {
        if bytes.len() % 2 == 1 {
            bytes.push(b'\n');
        }
    };

    header(&mut bytes, "/", ranlib.len());
    bytes.extend_from_slice(&ranlib);
    pad(&mut bytes);

    if !long_names.is_empty() {
        header(&mut bytes, "//", long_names.len());
        bytes.extend_from_slice(&long_names);
        pad(&mut bytes);
    }

    for ((_, content), name_field) in members.iter().zip(&name_fields) {
        header(&mut bytes, name_field, content.len());
        bytes.extend_from_slice(content);
        pad(&mut bytes);
    }

    bytes
}

/// An archive with members but no ranlib index.
pub fn archive_without_index(members: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut bytes = b"!<arch>\n".to_vec();

    for (name, content) in members {
        bytes.extend_from_slice(format!("{:<16}", format!("{name}/")).as_bytes());
        bytes.extend_from_slice(b"0           ");
        bytes.extend_from_slice(b"0     ");
        bytes.extend_from_slice(b"0     ");
        bytes.extend_from_slice(b"644     ");
        bytes.extend_from_slice(format!("{:<10}", content.len()).as_bytes());
        bytes.extend_from_slice(b"`\n");
        bytes.extend_from_slice(content);
        if content.len() % 2 == 1 {
            bytes.push(b'\n');
        }
    }

    bytes
}
