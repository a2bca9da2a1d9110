use bstr::BStr;

use crate::{combinators::*, Input, Result};

/// A 60-byte archive member header.
///
/// All fields are ASCII; the only ones a linker needs are the name
/// field and the decimal size. The date/uid/gid/mode fields are
/// skipped.
#[derive(Debug, PartialEq, Eq)]
pub struct MemberHeader<'a> {
    /// The raw 16-byte name field, undecoded.
    pub name_field: &'a [u8],
    /// Member contents size in bytes, parsed from ASCII decimal.
    pub size: u64,
}

/// The decoded meaning of a member name field.
#[derive(Debug, PartialEq, Eq)]
pub enum MemberName<'a> {
    /// `"/ "` or `"__.SYMDEF"`: the ranlib symbol index.
    RanlibIndex,
    /// `"//"`: the long-names string table.
    LongNames,
    /// `"/SYM64/"`: 64-bit symbol index (unsupported).
    Sym64,
    /// `"#1/…"`: BSD-style inline long name (unsupported).
    Bsd,
    /// `"/N"`: the name lives at decimal offset `N` in the long-names
    /// table.
    LongNameRef(u64),
    /// A regular name, the field prefix before the first `'/'` (or
    /// before the trailing padding when no `'/'` terminator is
    /// present).
    Plain(&'a BStr),
}

impl<'a> MemberHeader<'a> {
    /// Size of the header in the file.
    pub const SIZE: usize = 60;

    /// The two bytes closing every member header.
    pub const END: &'static [u8; 2] = b"`\n";

    /// Parse one member header.
    pub fn read<E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (input, (name_field, (), size_field, _end)) = tuple((
            take(16usize),
            skip(32), // date(12) + uid(6) + gid(6) + mode(8)
            take(10usize),
            tag(&Self::END[..]),
        ))(input)?;

        let size = parse_ascii_decimal(size_field)
            .ok_or_else(|| Err::Error(E::from_error_kind(size_field, ErrorKind::Digit)))?;

        Ok((input, Self { name_field, size }))
    }

    /// Decode the name field.
    pub fn name(&self) -> MemberName<'a> {
        let field = self.name_field;

        if field.starts_with(b"/SYM64/") {
            MemberName::Sym64
        } else if field.starts_with(b"#1/") {
            MemberName::Bsd
        } else if field.starts_with(b"//") {
            MemberName::LongNames
        } else if field.starts_with(b"__.SYMDEF") {
            MemberName::RanlibIndex
        } else if field.first() == Some(&b'/') {
            match parse_ascii_decimal(&field[1..]) {
                Some(offset) => MemberName::LongNameRef(offset),
                // The bare "/" name, space padded.
                None => MemberName::RanlibIndex,
            }
        } else {
            let end = field
                .iter()
                .position(|byte| *byte == b'/')
                .unwrap_or_else(|| trimmed_length(field));

            MemberName::Plain(BStr::new(&field[..end]))
        }
    }
}

/// Parse an ASCII decimal field, ignoring trailing spaces. `None` if
/// no digit is present or a non-digit interrupts the number.
fn parse_ascii_decimal(field: &[u8]) -> Option<u64> {
    let digits = &field[..trimmed_length(field)];

    if digits.is_empty() {
        return None;
    }

    let mut value: u64 = 0;
    for byte in digits {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add(u64::from(byte - b'0'))?;
    }

    Some(value)
}

fn trimmed_length(field: &[u8]) -> usize {
    field
        .iter()
        .rposition(|byte| *byte != b' ' && *byte != b'\0')
        .map_or(0, |position| position + 1)
}
