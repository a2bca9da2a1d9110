use crate::{combinators::*, Input, Number, Result};

/// A symbol table entry (`Sym64`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    /// Offset of the symbol name in the linked string table; 0 means
    /// the symbol has no name.
    pub name_offset: u32,
    /// The binding, from the high nibble of `st_info`.
    pub binding: SymbolBinding,
    /// The type, from the low nibble of `st_info`.
    pub r#type: SymbolType,
    /// Where the symbol is defined, from `st_shndx`.
    pub place: SymbolPlace,
    /// The value: a section-relative offset for defined symbols, an
    /// absolute value for `SHN_ABS`, the alignment for commons.
    pub value: u64,
    /// The size, or 0 if unknown.
    pub size: u64,
}

/// Symbol binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolBinding {
    /// Not visible outside its object file.
    Local,
    /// Visible to every object file in the link.
    Global,
    /// Global, but yielding to a non-weak definition.
    Weak,
    /// OS- or processor-specific binding.
    Other(u8),
}

impl SymbolBinding {
    fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::Local,
            0x01 => Self::Global,
            0x02 => Self::Weak,
            code => Self::Other(code),
        }
    }
}

/// Symbol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    /// No type specified.
    NoType,
    /// Data object.
    Object,
    /// Function entry point.
    Function,
    /// The symbol stands for its containing section.
    Section,
    /// Source file name.
    File,
    /// Uninitialized common block.
    Common,
    /// Thread-local data object.
    ThreadLocal,
    /// OS- or processor-specific type.
    Other(u8),
}

impl SymbolType {
    fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::NoType,
            0x01 => Self::Object,
            0x02 => Self::Function,
            0x03 => Self::Section,
            0x04 => Self::File,
            0x05 => Self::Common,
            0x06 => Self::ThreadLocal,
            code => Self::Other(code),
        }
    }

    /// Whether the code falls in the processor-specific range.
    pub fn is_processor_specific(self) -> bool {
        matches!(self, Self::Other(code) if (0x0d..=0x0f).contains(&code))
    }
}

/// Where a symbol lives, decoded from `st_shndx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPlace {
    /// `SHN_UNDEF`: referenced here, defined elsewhere.
    Undefined,
    /// `SHN_ABS`: the value is absolute.
    Absolute,
    /// `SHN_COMMON`: tentative definition.
    Common,
    /// `SHN_XINDEX`: the real index is in an extended-index table.
    Extended,
    /// A reserved (OS- or processor-specific) index.
    Reserved(u16),
    /// A regular section index.
    Section(u16),
}

impl SymbolPlace {
    fn from_code(code: u16) -> Self {
        match code {
            0x0000 => Self::Undefined,
            0xfff1 => Self::Absolute,
            0xfff2 => Self::Common,
            0xffff => Self::Extended,
            code if code >= 0xff00 => Self::Reserved(code),
            code => Self::Section(code),
        }
    }
}

impl SymbolRecord {
    /// Size of one entry in the file.
    pub const SIZE: usize = 24;

    /// Parse one symbol table entry.
    pub fn read<'a, N, E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        N: Number,
        E: ParseError<Input<'a>>,
    {
        let (input, (name_offset, info, _other, place, value, size)) = tuple((
            N::read_u32,
            N::read_u8,
            N::read_u8,
            N::read_u16,
            N::read_u64,
            N::read_u64,
        ))(input)?;

        Ok((
            input,
            Self {
                name_offset,
                binding: SymbolBinding::from_code(info >> 4),
                r#type: SymbolType::from_code(info & 0x0f),
                place: SymbolPlace::from_code(place),
                value,
                size,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LittleEndian;

    #[rustfmt::skip]
    const GLOBAL_FUNCTION: &[u8] = &[
        // Name offset.
        0x01, 0x00, 0x00, 0x00,
        // Info: GLOBAL | FUNC.
        0x12,
        // Other.
        0x00,
        // Section index.
        0x02, 0x00,
        // Value.
        0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        // Size.
        0x2a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn test_read() {
        let (rest, symbol) = SymbolRecord::read::<LittleEndian, ()>(GLOBAL_FUNCTION).unwrap();

        assert!(rest.is_empty());
        assert_eq!(
            symbol,
            SymbolRecord {
                name_offset: 1,
                binding: SymbolBinding::Global,
                r#type: SymbolType::Function,
                place: SymbolPlace::Section(2),
                value: 7,
                size: 42,
            }
        );
    }

    #[test]
    fn test_bindings() {
        for (code, binding) in [
            (0x00u8, SymbolBinding::Local),
            (0x01, SymbolBinding::Global),
            (0x02, SymbolBinding::Weak),
            (0x0a, SymbolBinding::Other(0x0a)),
        ] {
            let mut bytes = GLOBAL_FUNCTION.to_vec();
            bytes[4] = code << 4;

            let (_, symbol) = SymbolRecord::read::<LittleEndian, ()>(&bytes).unwrap();
            assert_eq!(symbol.binding, binding);
        }
    }

    #[test]
    fn test_types() {
        for (code, r#type) in [
            (0x00u8, SymbolType::NoType),
            (0x01, SymbolType::Object),
            (0x02, SymbolType::Function),
            (0x03, SymbolType::Section),
            (0x04, SymbolType::File),
            (0x05, SymbolType::Common),
            (0x06, SymbolType::ThreadLocal),
            (0x0d, SymbolType::Other(0x0d)),
        ] {
            let mut bytes = GLOBAL_FUNCTION.to_vec();
            bytes[4] = code;

            let (_, symbol) = SymbolRecord::read::<LittleEndian, ()>(&bytes).unwrap();
            assert_eq!(symbol.r#type, r#type);
        }

        assert!(SymbolType::Other(0x0d).is_processor_specific());
        assert!(!SymbolType::Other(0x0a).is_processor_specific());
    }

    #[test]
    fn test_places() {
        for (code, place) in [
            (0x0000u16, SymbolPlace::Undefined),
            (0x0001, SymbolPlace::Section(1)),
            (0x1234, SymbolPlace::Section(0x1234)),
            (0xff00, SymbolPlace::Reserved(0xff00)),
            (0xfff1, SymbolPlace::Absolute),
            (0xfff2, SymbolPlace::Common),
            (0xffff, SymbolPlace::Extended),
        ] {
            let mut bytes = GLOBAL_FUNCTION.to_vec();
            bytes[6..8].copy_from_slice(&code.to_le_bytes());

            let (_, symbol) = SymbolRecord::read::<LittleEndian, ()>(&bytes).unwrap();
            assert_eq!(symbol.place, place);
        }
    }

    #[test]
    fn test_truncated_entry() {
        assert!(SymbolRecord::read::<LittleEndian, ()>(&GLOBAL_FUNCTION[..16]).is_err());
    }
}
