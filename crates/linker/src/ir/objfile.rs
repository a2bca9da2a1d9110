use rivet_collections::IndexTable;
use rivet_object::elf64::Machine;

use super::{SectionId, SymbolId};

/// A parsed object file.
///
/// Both tables are keyed by the indices the input file itself uses:
/// sections by section header index, symbols by symbol table index
/// (slot 0 is the null entry and stays vacant). Skipped inputs —
/// non-allocated sections, dropped symbols — leave vacant slots.
#[derive(Debug)]
pub struct ObjectFile {
    /// Display name; archive members render as `libx.a(member.o)`.
    pub name: String,
    /// Machine architecture reported by the front-end probe.
    pub machine: Machine,
    /// Sections, by input section header index.
    pub sections: IndexTable<SectionId>,
    /// Local symbol table, by input symbol index.
    ///
    /// Non-local entries alias the global map: they store the id of
    /// whichever symbol survived merging.
    pub symbols: IndexTable<SymbolId>,
}

impl ObjectFile {
    /// An empty object file shell, to be filled by a front-end.
    pub fn new(name: impl Into<String>, machine: Machine) -> Self {
        Self {
            name: name.into(),
            machine,
            sections: IndexTable::new(),
            symbols: IndexTable::new(),
        }
    }
}
