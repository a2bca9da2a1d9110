//! ELF64 record parsers.
//!
//! The types in this module mirror the System V ABI structures
//! (`Ehdr64`, `Shdr64`, `Sym64`, `Rela64`) field for field; semantic
//! interpretation (which sections to keep, how symbols merge) lives in
//! the linker front-end.

use bstr::BStr;

use crate::Input;

mod file;
mod rela;
mod section;
mod symbol;

pub use file::*;
pub use rela::*;
pub use section::*;
pub use symbol::*;

/// Machine architecture of an object file, from `e_machine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Machine {
    /// AMD x86-64.
    X86_64,
    /// Arm 64-bit (Armv8/AArch64).
    Aarch64,
    /// Any architecture this linker has no name for.
    Other(u16),
}

impl Machine {
    pub(crate) fn from_code(code: u16) -> Self {
        match code {
            0x3e => Self::X86_64,
            0xb7 => Self::Aarch64,
            code => Self::Other(code),
        }
    }

    /// The `e_machine` code of this architecture.
    pub fn code(self) -> u16 {
        match self {
            Self::X86_64 => 0x3e,
            Self::Aarch64 => 0xb7,
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for Machine {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X86_64 => write!(formatter, "x86-64"),
            Self::Aarch64 => write!(formatter, "aarch64"),
            Self::Other(code) => write!(formatter, "machine {code:#x}"),
        }
    }
}

/// Slice the bytes of a table of `count` fixed-size entries out of
/// `file`, bounds-checked.
pub fn table_slice(file: Input<'_>, offset: u64, count: u64, entry_size: u64) -> Option<Input<'_>> {
    let offset = usize::try_from(offset).ok()?;
    let length = usize::try_from(count.checked_mul(entry_size)?).ok()?;

    file.get(offset..offset.checked_add(length)?)
}

/// Look up the NUL-terminated string starting at `offset` in a string
/// table.
///
/// The result is a byte string; ELF does not promise UTF-8.
pub fn string_at(strtab: Input<'_>, offset: usize) -> Option<&BStr> {
    let tail = strtab.get(offset..)?;
    let end = tail.iter().position(|byte| *byte == 0x00)?;

    Some(BStr::new(&tail[..end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_codes() {
        assert_eq!(Machine::from_code(0x3e), Machine::X86_64);
        assert_eq!(Machine::from_code(0xb7), Machine::Aarch64);
        assert_eq!(Machine::from_code(0x08), Machine::Other(0x08));

        for machine in [Machine::X86_64, Machine::Aarch64, Machine::Other(0xf3)] {
            assert_eq!(Machine::from_code(machine.code()), machine);
        }
    }

    #[test]
    fn test_table_slice() {
        let file: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];

        assert_eq!(table_slice(file, 2, 3, 2), Some(&file[2..8]));
        assert_eq!(table_slice(file, 2, 4, 2), None);
        assert_eq!(table_slice(file, 8, 0, 2), Some(&[] as &[u8]));
        assert_eq!(table_slice(file, 9, 0, 2), None);
        assert_eq!(table_slice(file, 0, u64::MAX, 2), None);
    }

    #[test]
    fn test_string_at() {
        let strtab: &[u8] = b"\0foo\0bar\0";

        assert_eq!(string_at(strtab, 0), Some(BStr::new("")));
        assert_eq!(string_at(strtab, 1), Some(BStr::new("foo")));
        assert_eq!(string_at(strtab, 3), Some(BStr::new("o")));
        assert_eq!(string_at(strtab, 5), Some(BStr::new("bar")));
        assert_eq!(string_at(strtab, 9), None);
        // Unterminated tail.
        assert_eq!(string_at(b"abc", 0), None);
    }
}
