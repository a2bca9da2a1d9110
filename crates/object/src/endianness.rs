//! Endian-generic number reading and writing.
//!
//! Parsers in this workspace are generic over a [`Number`]
//! implementation, so the same record parser serves both byte orders:
//! ELF64 data is read with [`LittleEndian`] (the only byte order the
//! back-ends emit), the `ar` ranlib index with [`BigEndian`].

use nom::number::complete::{be_u16, be_u32, be_u64, be_u8, le_u16, le_u32, le_u64, le_u8};

use crate::{combinators::*, Input, Result};

/// Byte order of a piece of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Little endian byte order.
    Little,
    /// Big endian byte order.
    Big,
}

/// Read and write numbers of one specific byte order.
pub trait Number {
    /// The byte order this implementation works in.
    fn endianness() -> Endianness;

    /// Parse a `u8`.
    fn read_u8<'a, E>(input: Input<'a>) -> Result<'a, u8, E>
    where
        E: ParseError<Input<'a>>;

    /// Parse a `u16`.
    fn read_u16<'a, E>(input: Input<'a>) -> Result<'a, u16, E>
    where
        E: ParseError<Input<'a>>;

    /// Parse a `u32`.
    fn read_u32<'a, E>(input: Input<'a>) -> Result<'a, u32, E>
    where
        E: ParseError<Input<'a>>;

    /// Parse a `u64`.
    fn read_u64<'a, E>(input: Input<'a>) -> Result<'a, u64, E>
    where
        E: ParseError<Input<'a>>;

    /// Parse an `i64` (two's complement).
    fn read_i64<'a, E>(input: Input<'a>) -> Result<'a, i64, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (input, value) = Self::read_u64(input)?;

        Ok((input, value as i64))
    }

    /// Encode a `u16`.
    fn write_u16(value: u16) -> [u8; 2];

    /// Encode a `u32`.
    fn write_u32(value: u32) -> [u8; 4];

    /// Encode a `u64`.
    fn write_u64(value: u64) -> [u8; 8];
}

/// [`Number`] implementation for little-endian data.
pub struct LittleEndian;

impl Number for LittleEndian {
    fn endianness() -> Endianness {
        Endianness::Little
    }

    fn read_u8<'a, E>(input: Input<'a>) -> Result<'a, u8, E>
    where
        E: ParseError<Input<'a>>,
    {
        le_u8(input)
    }

    fn read_u16<'a, E>(input: Input<'a>) -> Result<'a, u16, E>
    where
        E: ParseError<Input<'a>>,
    {
        le_u16(input)
    }

    fn read_u32<'a, E>(input: Input<'a>) -> Result<'a, u32, E>
    where
        E: ParseError<Input<'a>>,
    {
        le_u32(input)
    }

    fn read_u64<'a, E>(input: Input<'a>) -> Result<'a, u64, E>
    where
        E: ParseError<Input<'a>>,
    {
        le_u64(input)
    }

    fn write_u16(value: u16) -> [u8; 2] {
        value.to_le_bytes()
    }

    fn write_u32(value: u32) -> [u8; 4] {
        value.to_le_bytes()
    }

    fn write_u64(value: u64) -> [u8; 8] {
        value.to_le_bytes()
    }
}

/// [`Number`] implementation for big-endian data.
pub struct BigEndian;

impl Number for BigEndian {
    fn endianness() -> Endianness {
        Endianness::Big
    }

    fn read_u8<'a, E>(input: Input<'a>) -> Result<'a, u8, E>
    where
        E: ParseError<Input<'a>>,
    {
        be_u8(input)
    }

    fn read_u16<'a, E>(input: Input<'a>) -> Result<'a, u16, E>
    where
        E: ParseError<Input<'a>>,
    {
        be_u16(input)
    }

    fn read_u32<'a, E>(input: Input<'a>) -> Result<'a, u32, E>
    where
        E: ParseError<Input<'a>>,
    {
        be_u32(input)
    }

    fn read_u64<'a, E>(input: Input<'a>) -> Result<'a, u64, E>
    where
        E: ParseError<Input<'a>>,
    {
        be_u64(input)
    }

    fn write_u16(value: u16) -> [u8; 2] {
        value.to_be_bytes()
    }

    fn write_u32(value: u32) -> [u8; 4] {
        value.to_be_bytes()
    }

    fn write_u64(value: u64) -> [u8; 8] {
        value.to_be_bytes()
    }
}
