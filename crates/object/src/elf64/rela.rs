use crate::{combinators::*, Input, Number, Result};

/// A relocation entry with addend (`Rela64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaRecord {
    /// Offset of the patch site within the section being relocated.
    pub offset: u64,
    /// Index of the target symbol in the linked symbol table
    /// (`ELF64_R_SYM`).
    pub symbol: u32,
    /// Relocation type code, interpreted by the back-end
    /// (`ELF64_R_TYPE`).
    pub r#type: u32,
    /// Constant addend.
    pub addend: i64,
}

impl RelaRecord {
    /// Size of one entry in the file.
    pub const SIZE: usize = 24;

    /// Parse one relocation entry.
    pub fn read<'a, N, E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        N: Number,
        E: ParseError<Input<'a>>,
    {
        let (input, (offset, info, addend)) =
            tuple((N::read_u64, N::read_u64, N::read_i64))(input)?;

        Ok((
            input,
            Self {
                offset,
                symbol: (info >> 32) as u32,
                r#type: (info & 0xffff_ffff) as u32,
                addend,
            },
        ))
    }
}
