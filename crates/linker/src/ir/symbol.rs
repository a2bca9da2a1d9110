use bstr::BString;

use super::{FileId, SectionId};

/// Symbol binding: how widely a symbol is visible, and how it merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Private to its object file; never enters the global map.
    Local,
    /// Visible to the whole link; at most one strong definition.
    Global,
    /// Like global, but yields to a non-weak definition.
    Weak,
}

/// Symbol type, as far as the linker cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Nothing specific.
    NoType,
    /// A data object.
    Object,
    /// A thread-local data object.
    Tls,
    /// A function entry point.
    Function,
    /// The symbol stands for a section.
    Section,
}

/// What is known about a symbol's value.
///
/// The states only move forward: `Undefined` → `Common` → `Defined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolState {
    /// Referenced, not yet defined.
    Undefined,
    /// Tentative definition; space is allocated at layout time.
    Common {
        /// Bytes to reserve.
        size: u64,
        /// Alignment constraint.
        align: u64,
    },
    /// Defined at `offset` within `section`, or at the absolute value
    /// `offset` when `section` is `None`.
    Defined {
        /// The defining section; `None` for absolute symbols.
        section: Option<SectionId>,
        /// Offset within the section, or the absolute value.
        offset: u64,
        /// Size of the symbol, 0 if unknown.
        size: u64,
    },
}

/// A symbol.
///
/// Non-local symbols are shared: the global map and every local table
/// mentioning the name refer to the same arena slot, so a merge
/// updates all of them at once.
#[derive(Debug)]
pub struct Symbol {
    /// The symbol name.
    pub name: BString,
    /// Binding.
    pub binding: Binding,
    /// Type.
    pub kind: SymbolKind,
    /// Definition state.
    pub state: SymbolState,
    /// The file providing the current state, for diagnostics. `None`
    /// while undefined.
    pub definer: Option<FileId>,
    /// Resolved virtual address, assigned after layout.
    pub vaddr: Option<u64>,
}

impl Symbol {
    /// An undefined reference named `name`.
    pub fn reference(name: impl Into<BString>, binding: Binding, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            binding,
            kind,
            state: SymbolState::Undefined,
            definer: None,
            vaddr: None,
        }
    }

    /// Whether the symbol has a concrete definition.
    pub fn is_defined(&self) -> bool {
        matches!(self.state, SymbolState::Defined { .. })
    }

    /// Whether the symbol is still undefined (commons count as
    /// defined: they reserve space).
    pub fn is_undefined(&self) -> bool {
        matches!(self.state, SymbolState::Undefined)
    }
}
