use super::Machine;
use crate::{combinators::*, BigEndian, Endianness, Input, LittleEndian, Number, Result};

/// The ELF64 file header (`Ehdr64`), reduced to the fields a static
/// linker consumes. Program headers do not exist in relocatable files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Byte order declared by `EI_DATA`.
    pub endianness: Endianness,
    /// Object file type from `e_type`.
    pub r#type: FileType,
    /// Machine architecture from `e_machine`.
    pub machine: Machine,
    /// Offset of the section header table (`e_shoff`).
    pub section_header_offset: u64,
    /// Size of one section header entry (`e_shentsize`).
    pub section_entry_size: u16,
    /// Number of section headers (`e_shnum`).
    pub section_count: u16,
    /// Index of the section holding section names (`e_shstrndx`).
    pub section_names_index: u16,
}

/// Object file type, from `e_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Unknown.
    None,
    /// Relocatable file.
    Relocatable,
    /// Executable file.
    Executable,
    /// Shared object.
    SharedObject,
    /// Core dump.
    Core,
    /// Anything else, including OS- and processor-specific types.
    Other(u16),
}

impl FileType {
    fn from_code(code: u16) -> Self {
        match code {
            0x00 => Self::None,
            0x01 => Self::Relocatable,
            0x02 => Self::Executable,
            0x03 => Self::SharedObject,
            0x04 => Self::Core,
            code => Self::Other(code),
        }
    }
}

impl FileHeader {
    /// Magic number of an ELF file.
    pub const MAGIC: &'static [u8; 4] = &[0x7f, b'E', b'L', b'F'];

    /// `EI_CLASS` value for the 64-bit class.
    pub const CLASS64: u8 = 0x02;

    /// `EI_VERSION`/`e_version` value for the current ELF version.
    pub const VERSION_CURRENT: u8 = 0x01;

    /// Size of the header in the file.
    pub const SIZE: usize = 64;

    /// Size of one section header entry.
    pub const SECTION_ENTRY_SIZE: u16 = 64;

    /// Decide whether `input` is an ELF64 relocatable file this linker
    /// can consume, and if so, report its machine architecture.
    ///
    /// The probe requires: more bytes than the header itself, the ELF
    /// magic, the 64-bit class, little-endian data, the current
    /// version, section header entries of the published size, and the
    /// `ET_REL` file type.
    pub fn probe(input: Input<'_>) -> Option<Machine> {
        if input.len() <= Self::SIZE {
            return None;
        }

        let (_, header) = Self::read::<()>(input).ok()?;

        (header.endianness == Endianness::Little
            && header.r#type == FileType::Relocatable
            && header.section_entry_size == Self::SECTION_ENTRY_SIZE)
            .then_some(header.machine)
    }

    /// Parse the header, dispatching on the declared byte order.
    pub fn read<'a, E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (input, (_magic, class, data, version)) = tuple((
            tag(&Self::MAGIC[..]),
            LittleEndian::read_u8,
            LittleEndian::read_u8,
            LittleEndian::read_u8,
        ))(input)?;

        if class != Self::CLASS64 || version != Self::VERSION_CURRENT {
            return Err(Err::Error(E::from_error_kind(input, ErrorKind::Tag)));
        }

        let endianness = match data {
            0x01 => Endianness::Little,
            0x02 => Endianness::Big,
            _ => return Err(Err::Error(E::from_error_kind(input, ErrorKind::Tag))),
        };

        match endianness {
            Endianness::Little => Self::read_fields::<LittleEndian, E>(input, endianness),
            Endianness::Big => Self::read_fields::<BigEndian, E>(input, endianness),
        }
    }

    fn read_fields<'a, N, E>(input: Input<'a>, endianness: Endianness) -> Result<'a, Self, E>
    where
        N: Number,
        E: ParseError<Input<'a>>,
    {
        let (
            input,
            (
                _osabi_and_padding,
                r#type,
                machine,
                _version,
                _entry_point,
                _program_header_offset,
                section_header_offset,
                _flags,
                _header_size,
                _program_entry_size,
                _program_count,
                section_entry_size,
                section_count,
                section_names_index,
            ),
        ) = tuple((
            skip(9),
            N::read_u16,
            N::read_u16,
            N::read_u32,
            N::read_u64,
            N::read_u64,
            N::read_u64,
            N::read_u32,
            N::read_u16,
            N::read_u16,
            N::read_u16,
            N::read_u16,
            N::read_u16,
            N::read_u16,
        ))(input)?;

        Ok((
            input,
            Self {
                endianness,
                r#type: FileType::from_code(r#type),
                machine: Machine::from_code(machine),
                section_header_offset,
                section_entry_size,
                section_count,
                section_names_index,
            },
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A minimal little-endian `ET_REL` header for x86-64, followed by
    /// one byte of padding so the probe's size requirement holds.
    pub(crate) fn relocatable_header() -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FileHeader::SIZE + 1);

        bytes.extend_from_slice(FileHeader::MAGIC);
        bytes.push(FileHeader::CLASS64);
        bytes.push(0x01); // EI_DATA: little endian
        bytes.push(FileHeader::VERSION_CURRENT);
        bytes.push(0x00); // OS ABI: System V
        bytes.extend_from_slice(&[0u8; 8]); // ABI version + padding
        bytes.extend_from_slice(&1u16.to_le_bytes()); // e_type: ET_REL
        bytes.extend_from_slice(&0x3eu16.to_le_bytes()); // e_machine
        bytes.extend_from_slice(&1u32.to_le_bytes()); // e_version
        bytes.extend_from_slice(&0u64.to_le_bytes()); // e_entry
        bytes.extend_from_slice(&0u64.to_le_bytes()); // e_phoff
        bytes.extend_from_slice(&0u64.to_le_bytes()); // e_shoff
        bytes.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        bytes.extend_from_slice(&64u16.to_le_bytes()); // e_ehsize
        bytes.extend_from_slice(&0u16.to_le_bytes()); // e_phentsize
        bytes.extend_from_slice(&0u16.to_le_bytes()); // e_phnum
        bytes.extend_from_slice(&64u16.to_le_bytes()); // e_shentsize
        bytes.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
        bytes.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
        bytes.push(0x00);

        bytes
    }

    #[test]
    fn test_read() {
        let bytes = relocatable_header();
        let (_, header) = FileHeader::read::<()>(&bytes).unwrap();

        assert_eq!(header.endianness, Endianness::Little);
        assert_eq!(header.r#type, FileType::Relocatable);
        assert_eq!(header.machine, Machine::X86_64);
        assert_eq!(header.section_count, 0);
        assert_eq!(header.section_entry_size, 64);
    }

    #[test]
    fn test_probe_accepts_relocatable() {
        let bytes = relocatable_header();

        assert_eq!(FileHeader::probe(&bytes), Some(Machine::X86_64));
    }

    #[test]
    fn test_probe_rejects_executables() {
        let mut bytes = relocatable_header();
        bytes[16..18].copy_from_slice(&2u16.to_le_bytes()); // ET_EXEC

        assert_eq!(FileHeader::probe(&bytes), None);
    }

    #[test]
    fn test_probe_rejects_wrong_class() {
        let mut bytes = relocatable_header();
        bytes[4] = 0x01; // ELFCLASS32

        assert_eq!(FileHeader::probe(&bytes), None);
    }

    #[test]
    fn test_probe_rejects_big_endian() {
        let mut bytes = relocatable_header();
        bytes[5] = 0x02; // ELFDATA2MSB

        assert_eq!(FileHeader::probe(&bytes), None);
    }

    #[test]
    fn test_probe_rejects_truncation() {
        let bytes = relocatable_header();

        assert_eq!(FileHeader::probe(&bytes[..FileHeader::SIZE]), None);
        assert_eq!(FileHeader::probe(b"\x7fELF"), None);
        assert_eq!(FileHeader::probe(b"not an elf file at all, not even close............................"), None);
    }
}
