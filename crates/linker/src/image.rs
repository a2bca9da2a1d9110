//! Section merging and image layout.
//!
//! Sections of the same kind are collected into groups, emitted in the
//! fixed order code → read-only data → writable data → zero space.
//! Groups are packed upwards from the base address, each starting at
//! its own alignment and followed by padding up to the page size.
//! Zero groups reserve address space but contribute no image bytes.

use bstr::BString;

use rivet_object::align::{align_up, is_aligned};

use crate::{
    ir::{SectionId, SectionKind, SymbolState},
    Context,
};

/// A group of merged sections of one kind.
#[derive(Debug)]
pub struct SectionGroup {
    /// The kind every member shares.
    pub kind: SectionKind,
    /// Base virtual address.
    pub vaddr: u64,
    /// Alignment, the maximum over the members.
    pub align: u64,
    /// Total size, member padding included.
    pub size: u64,
    /// Member sections, in placement order.
    pub sections: Vec<SectionId>,
    /// Concatenated, relocated contents. Empty until relocation runs,
    /// and always empty for [`SectionKind::Zero`] groups.
    pub content: Vec<u8>,
}

/// The laid-out (and, after relocation, patched) linked image.
#[derive(Debug)]
pub struct Image {
    /// Base virtual address.
    pub base: u64,
    /// Total reserved address span, padding included.
    pub size: u64,
    /// The section groups, in emission order. Empty groups are not
    /// represented.
    pub groups: Vec<SectionGroup>,
}

/// One line of the symbol report: a resolved non-local symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedSymbol {
    /// Symbol name.
    pub name: BString,
    /// Resolved virtual address.
    pub vaddr: u64,
    /// Symbol size, 0 if unknown.
    pub size: u64,
    /// Display name of the defining file, if any.
    pub file: Option<String>,
}

impl<'a> Context<'a> {
    /// Group the sections of every processed file and assign virtual
    /// addresses, then resolve every symbol to its address.
    ///
    /// `cpu_align` is the back-end's minimum alignment for executable
    /// sections.
    pub(crate) fn build_image(&mut self, base: u64, page_size: u64, cpu_align: u64) -> Image {
        let mut groups: Vec<SectionGroup> = SectionKind::IN_ORDER
            .iter()
            .map(|&kind| SectionGroup {
                kind,
                vaddr: 0,
                align: 1,
                size: 0,
                sections: Vec::new(),
                content: Vec::new(),
            })
            .collect();

        // Gather sections in (file, section index) order, which is
        // also registration order, so links are reproducible.
        let files = self.processed.clone();
        for file_id in files {
            let section_ids: Vec<SectionId> =
                self.file(file_id).sections.iter().map(|(_, &id)| id).collect();

            for section_id in section_ids {
                let kind = self.section(section_id).kind;

                if kind == SectionKind::Text {
                    let section = self.section_mut(section_id);
                    section.align = section.align.max(cpu_align);
                }

                let group = groups
                    .iter_mut()
                    .find(|group| group.kind == kind)
                    .expect("every kind has a group");
                group.align = group.align.max(self.section(section_id).align);
                group.sections.push(section_id);
            }
        }

        groups.retain(|group| !group.sections.is_empty());

        // Pack the groups.
        let mut vaddr = base;
        for group in &mut groups {
            group.vaddr = align_up(vaddr, group.align);

            let mut offset = 0;
            for &section_id in &group.sections {
                let section = self.section_mut(section_id);
                let address = align_up(group.vaddr + offset, section.align);
                section.vaddr = Some(address);
                offset = (address - group.vaddr) + section.size;
            }

            group.size = offset;
            vaddr = align_up(group.vaddr + group.size, page_size);
        }

        let image = Image { base, size: vaddr - base, groups };

        self.resolve_symbol_addresses();

        image
    }

    /// Give every symbol its final virtual address.
    fn resolve_symbol_addresses(&mut self) {
        for id in self.symbol_ids().collect::<Vec<_>>() {
            let symbol = self.symbol(id);

            let vaddr = match symbol.state {
                SymbolState::Defined { section: Some(section), offset, .. } => {
                    self.section(section).address() + offset
                }

                // Absolute: the stored offset is the address.
                SymbolState::Defined { section: None, offset, .. } => offset,

                // Unresolved weak references land at zero; commons
                // were lowered to a zero section before layout.
                SymbolState::Undefined | SymbolState::Common { .. } => 0,
            };

            self.symbol_mut(id).vaddr = Some(vaddr);
        }
    }

    /// The symbol report: every non-local symbol with its resolved
    /// address, sorted by address.
    pub fn symbol_report(&self) -> Vec<ReportedSymbol> {
        let mut report: Vec<ReportedSymbol> = self
            .globals
            .iter()
            .map(|(name, id)| {
                let symbol = self.symbol(id);
                let size = match symbol.state {
                    SymbolState::Defined { size, .. } | SymbolState::Common { size, .. } => size,
                    SymbolState::Undefined => 0,
                };

                ReportedSymbol {
                    name: BString::from(name),
                    vaddr: symbol.vaddr.unwrap_or(0),
                    size,
                    file: symbol.definer.map(|file| self.file(file).name.clone()),
                }
            })
            .collect();

        report.sort_by(|left, right| {
            left.vaddr.cmp(&right.vaddr).then_with(|| left.name.cmp(&right.name))
        });
        report
    }
}

impl Image {
    /// Check the layout invariants: every section address honors its
    /// alignment and stays within its group, groups do not overlap.
    pub fn check(&self, ctx: &Context<'_>) -> bool {
        let mut previous_end = 0;

        for group in &self.groups {
            if !is_aligned(group.vaddr, group.align) || group.vaddr < previous_end {
                return false;
            }

            for &section_id in &group.sections {
                let section = ctx.section(section_id);
                let vaddr = section.address();

                if !is_aligned(vaddr, section.align)
                    || vaddr < group.vaddr
                    || vaddr + section.size > group.vaddr + group.size
                {
                    return false;
                }
            }

            previous_end = group.vaddr + group.size;
        }

        true
    }

    /// The bytes of the image as one flat buffer starting at
    /// [`Image::base`]. Zero groups contribute nothing but their
    /// reserved span.
    pub fn flatten(&self) -> Vec<u8> {
        let size = usize::try_from(self.size).expect("image exceeds the address space");
        let mut buffer = vec![0u8; size];

        for group in &self.groups {
            if group.kind == SectionKind::Zero {
                continue;
            }

            let start = (group.vaddr - self.base) as usize;
            buffer[start..start + group.content.len()].copy_from_slice(&group.content);
        }

        buffer
    }
}
