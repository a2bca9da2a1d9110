use bstr::BStr;

use crate::{combinators::*, BigEndian, Input, Number};

/// Parse the ranlib symbol index.
///
/// Layout: a big-endian `u32` entry count, that many big-endian `u32`
/// offsets (of member *headers* within the archive), then that many
/// NUL-terminated symbol names, in the same order.
pub fn ranlib_entries<'a, E>(
    data: Input<'a>,
) -> std::result::Result<Vec<(&'a BStr, u64)>, Err<E>>
where
    E: ParseError<Input<'a>>,
{
    let (mut input, count) = BigEndian::read_u32::<E>(data)?;

    let mut offsets = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (rest, offset) = BigEndian::read_u32::<E>(input)?;
        offsets.push(u64::from(offset));
        input = rest;
    }

    let mut entries = Vec::with_capacity(count as usize);
    for offset in offsets {
        let end = input
            .iter()
            .position(|byte| *byte == 0x00)
            .ok_or_else(|| Err::Error(E::from_error_kind(input, ErrorKind::Eof)))?;

        entries.push((BStr::new(&input[..end]), offset));
        input = &input[end + 1..];
    }

    Ok(entries)
}

/// Look up a long member name at `offset` in the `"//"` string table.
///
/// Entries are terminated by `'/'` (GNU writes `"name/\n"`).
pub fn long_name_at(table: Input<'_>, offset: u64) -> Option<&BStr> {
    let tail = table.get(usize::try_from(offset).ok()?..)?;
    let end = tail.iter().position(|byte| *byte == b'/')?;

    Some(BStr::new(&tail[..end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a ranlib index payload from `(name, offset)` pairs.
    pub(crate) fn build_ranlib(entries: &[(&str, u32)]) -> Vec<u8> {
        let mut bytes = Vec::new();

        bytes.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for (_, offset) in entries {
            bytes.extend_from_slice(&offset.to_be_bytes());
        }
        for (name, _) in entries {
            bytes.extend_from_slice(name.as_bytes());
            bytes.push(0x00);
        }

        bytes
    }

    #[test]
    fn test_ranlib_entries() {
        let data = build_ranlib(&[("bar", 68), ("baz", 68), ("qux", 182)]);

        let entries = ranlib_entries::<()>(&data).unwrap();

        assert_eq!(
            entries,
            vec![
                (BStr::new("bar"), 68),
                (BStr::new("baz"), 68),
                (BStr::new("qux"), 182),
            ]
        );
    }

    #[test]
    fn test_empty_ranlib() {
        let data = build_ranlib(&[]);

        assert_eq!(ranlib_entries::<()>(&data).unwrap(), vec![]);
    }

    #[test]
    fn test_ranlib_with_missing_names() {
        let mut data = build_ranlib(&[("bar", 68)]);
        data.pop(); // drop the NUL terminator

        assert!(ranlib_entries::<()>(&data).is_err());
    }

    #[test]
    fn test_ranlib_truncated_offsets() {
        let data = 5u32.to_be_bytes().to_vec();

        assert!(ranlib_entries::<()>(&data).is_err());
    }

    #[test]
    fn test_long_name_lookup() {
        let table = b"very_long_member_name.o/\nanother_one.o/\n";

        assert_eq!(long_name_at(table, 0), Some(BStr::new("very_long_member_name.o")));
        assert_eq!(long_name_at(table, 25), Some(BStr::new("another_one.o")));
        assert_eq!(long_name_at(table, 1000), None);
    }
}
