use std::{borrow::Cow, fmt};

use bstr::BString;

use super::{FileId, SymbolId};

/// Semantic kind of a section. Also the emission order of the image:
/// code first, then read-only data, then writable data, then
/// zero-initialized space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Executable instructions.
    Text,
    /// Read-only data.
    Rodata,
    /// Writable, initialized data.
    Data,
    /// Zero-initialized space; occupies no bytes in the image.
    Zero,
}

impl SectionKind {
    /// All kinds, in image emission order.
    pub const IN_ORDER: [Self; 4] = [Self::Text, Self::Rodata, Self::Data, Self::Zero];
}

impl fmt::Display for SectionKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(formatter, "text"),
            Self::Rodata => write!(formatter, "rodata"),
            Self::Data => write!(formatter, "data"),
            Self::Zero => write!(formatter, "zero"),
        }
    }
}

/// A relocation, attached to the section whose bytes it patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reloc {
    /// Offset of the patch site within the section.
    pub offset: u64,
    /// The symbol whose address the patch encodes.
    pub target: SymbolId,
    /// Back-end-specific relocation type code.
    pub r#type: u32,
    /// Constant addend.
    pub addend: i64,
}

/// A section extracted from an object file.
#[derive(Debug)]
pub struct Section<'a> {
    /// The object file this section belongs to.
    pub file: FileId,
    /// The section header index within that file.
    pub input_index: usize,
    /// Display name, e.g. `.text`.
    pub name: BString,
    /// Semantic kind.
    pub kind: SectionKind,
    /// Alignment constraint, a power of two (at least 1).
    pub align: u64,
    /// Size in the image. Equals `content.len()` except for
    /// [`SectionKind::Zero`] sections, whose content is empty.
    pub size: u64,
    /// The section bytes, borrowed from the input blob until
    /// relocation copies them into the image.
    pub content: Cow<'a, [u8]>,
    /// Relocations to apply to this section.
    pub relocs: Vec<Reloc>,
    /// Virtual address, assigned by layout.
    pub vaddr: Option<u64>,
}

impl Section<'_> {
    /// The assigned virtual address.
    ///
    /// Only meaningful after layout; 0 before.
    pub fn address(&self) -> u64 {
        self.vaddr.unwrap_or(0)
    }
}
