use enumflags2::{bitflags, BitFlags};

use crate::{combinators::*, Input, Number, Result};

/// A section header (`Shdr64`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// Offset of the section name in the section-names string table.
    pub name_offset: u32,
    /// Type of the section.
    pub r#type: SectionType,
    /// Flags.
    pub flags: SectionFlags,
    /// Virtual address, for sections that are loaded (always 0 in
    /// relocatable files).
    pub addr: u64,
    /// Offset of the section contents in the file.
    pub offset: u64,
    /// Size of the section contents in bytes. `NoBits` sections occupy
    /// no file bytes despite a non-zero size.
    pub size: u64,
    /// Index of an associated section; meaning depends on the type
    /// (for a symbol table: its string table).
    pub link: u32,
    /// Extra information; meaning depends on the type (for a
    /// relocation table: the index of the section it patches).
    pub info: u32,
    /// Required alignment; 0 and 1 both mean "none".
    pub addralign: u64,
    /// Size of one entry, for sections holding fixed-size entries.
    pub entsize: u64,
}

/// Section type, from `sh_type`.
///
/// Unknown values are carried as [`SectionType::Other`] so the
/// front-end can warn about them instead of refusing the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionType {
    /// Unused header.
    Null,
    /// Program-defined contents.
    ProgramBits,
    /// Linker symbol table.
    SymbolTable,
    /// String table.
    StringTable,
    /// Relocation entries with addends.
    RelocationsWithAddends,
    /// Symbol hash table.
    Hash,
    /// Dynamic linking tables.
    Dynamic,
    /// Note section.
    Note,
    /// Zero-initialized space occupying no file bytes.
    NoBits,
    /// Relocation entries without addends (unsupported).
    Relocations,
    /// Dynamic loader symbol table.
    DynamicSymbolTable,
    /// Array of constructor addresses.
    InitArray,
    /// Array of destructor addresses.
    FiniArray,
    /// Array of pre-constructor addresses.
    PreInitArray,
    /// Section group.
    Group,
    /// Extended section indices for the symbol table.
    ExtendedIndices,
    /// Any other (OS- or processor-specific) type.
    Other(u32),
}

impl SectionType {
    /// The `sh_type` code of this type.
    pub fn code(self) -> u32 {
        match self {
            Self::Null => 0x00,
            Self::ProgramBits => 0x01,
            Self::SymbolTable => 0x02,
            Self::StringTable => 0x03,
            Self::RelocationsWithAddends => 0x04,
            Self::Hash => 0x05,
            Self::Dynamic => 0x06,
            Self::Note => 0x07,
            Self::NoBits => 0x08,
            Self::Relocations => 0x09,
            Self::DynamicSymbolTable => 0x0b,
            Self::InitArray => 0x0e,
            Self::FiniArray => 0x0f,
            Self::PreInitArray => 0x10,
            Self::Group => 0x11,
            Self::ExtendedIndices => 0x12,
            Self::Other(code) => code,
        }
    }

    fn from_code(code: u32) -> Self {
        match code {
            0x00 => Self::Null,
            0x01 => Self::ProgramBits,
            0x02 => Self::SymbolTable,
            0x03 => Self::StringTable,
            0x04 => Self::RelocationsWithAddends,
            0x05 => Self::Hash,
            0x06 => Self::Dynamic,
            0x07 => Self::Note,
            0x08 => Self::NoBits,
            0x09 => Self::Relocations,
            0x0b => Self::DynamicSymbolTable,
            0x0e => Self::InitArray,
            0x0f => Self::FiniArray,
            0x10 => Self::PreInitArray,
            0x11 => Self::Group,
            0x12 => Self::ExtendedIndices,
            code => Self::Other(code),
        }
    }
}

/// A section flag.
#[bitflags]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum SectionFlag {
    /// The section contains writable data.
    Writable = 0x01,
    /// The section occupies memory in the program image.
    Allocated = 0x02,
    /// The section contains executable instructions.
    Executable = 0x04,
    /// The section may be merged with identical sections.
    Merge = 0x10,
    /// The section contains NUL-terminated strings.
    Strings = 0x20,
    /// `sh_info` holds a section index.
    InfoLink = 0x40,
    /// Preserve section order after combining.
    LinkOrder = 0x80,
    /// Non-standard OS-specific handling required.
    OsNonConforming = 0x100,
    /// The section is a member of a group.
    InGroup = 0x200,
    /// The section holds thread-local data.
    ThreadLocal = 0x400,
    /// The section contents are compressed.
    Compressed = 0x800,
}

/// A set of section flags.
///
/// OS- and processor-specific bits are dropped on read; the front-end
/// does not interpret them.
pub type SectionFlags = BitFlags<SectionFlag>;

impl SectionHeader {
    /// Size of the header in the file.
    pub const SIZE: usize = 64;

    pub(crate) fn read_flags<'a, N, E>(input: Input<'a>) -> Result<'a, SectionFlags, E>
    where
        N: Number,
        E: ParseError<Input<'a>>,
    {
        let (input, bits) = N::read_u64(input)?;

        Ok((input, SectionFlags::from_bits_truncate(bits)))
    }

    /// Parse one section header.
    pub fn read<'a, N, E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        N: Number,
        E: ParseError<Input<'a>>,
    {
        let (input, (name_offset, r#type, flags, addr, offset, size, link, info, addralign, entsize)) =
            tuple((
                N::read_u32,
                N::read_u32,
                Self::read_flags::<N, _>,
                N::read_u64,
                N::read_u64,
                N::read_u64,
                N::read_u32,
                N::read_u32,
                N::read_u64,
                N::read_u64,
            ))(input)?;

        Ok((
            input,
            Self {
                name_offset,
                r#type: SectionType::from_code(r#type),
                flags,
                addr,
                offset,
                size,
                link,
                info,
                addralign,
                entsize,
            },
        ))
    }

    /// The alignment constraint, normalizing the format's "0 means
    /// none" into 1.
    pub fn alignment(&self) -> u64 {
        self.addralign.max(1)
    }

    /// The section contents, sliced out of the containing file.
    ///
    /// `NoBits` sections have no contents; for every other type the
    /// slice is bounds-checked against the file.
    pub fn contents<'a>(&self, file: Input<'a>) -> Option<Input<'a>> {
        if self.r#type == SectionType::NoBits {
            return Some(&[]);
        }

        let offset = usize::try_from(self.offset).ok()?;
        let size = usize::try_from(self.size).ok()?;

        file.get(offset..offset.checked_add(size)?)
    }
}
