//! The linker context: the arenas everything lives in, and the global
//! symbol map with its merge rule.

use bstr::{BStr, BString};

use rivet_collections::RbTree;

use crate::{
    diag::Reporter,
    ir::{Archive, Binding, FileId, ObjectFile, Section, SectionId, Symbol, SymbolId, SymbolState},
    Error,
};

/// The `name → symbol` map shared by the whole link.
///
/// At most one symbol per name; local symbols never enter.
#[derive(Debug, Default)]
pub struct Globals {
    map: RbTree<BString, SymbolId>,
}

impl Globals {
    /// The symbol registered under `name`.
    pub fn find(&self, name: &BStr) -> Option<SymbolId> {
        self.map.get(name).copied()
    }

    /// Iterate over `(name, symbol)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&BStr, SymbolId)> {
        self.map.iter().map(|(name, id)| (name.as_ref(), *id))
    }

    /// Number of distinct global names.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no global was registered yet.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The root of the pipeline: owns every object file, section, symbol
/// and archive of one link.
///
/// `'a` is the lifetime of the input blobs; sections borrow their
/// contents from them until relocation.
#[derive(Debug, Default)]
pub struct Context<'a> {
    /// The diagnostic sink.
    pub reporter: Reporter,
    /// The global symbol map.
    pub globals: Globals,
    /// Input files whose symbols were not yet examined for archive
    /// demand loading.
    pub unprocessed: Vec<FileId>,
    /// Input files done with resolution.
    pub processed: Vec<FileId>,
    /// Attached archives. Released once resolution succeeds.
    pub archives: Vec<Archive<'a>>,
    files: Vec<ObjectFile>,
    sections: Vec<Section<'a>>,
    symbols: Vec<Symbol>,
}

impl<'a> Context<'a> {
    /// An empty context reporting through `reporter`.
    pub fn new(reporter: Reporter) -> Self {
        Self { reporter, ..Self::default() }
    }

    /// Register an object file shell.
    pub fn add_file(&mut self, file: ObjectFile) -> FileId {
        let id = FileId::new(self.files.len());
        self.files.push(file);
        id
    }

    /// Access an object file.
    pub fn file(&self, id: FileId) -> &ObjectFile {
        &self.files[id.index()]
    }

    /// Access an object file, mutably.
    pub fn file_mut(&mut self, id: FileId) -> &mut ObjectFile {
        &mut self.files[id.index()]
    }

    /// Number of object files (command-line inputs plus materialized
    /// archive members).
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Register a section.
    pub fn add_section(&mut self, section: Section<'a>) -> SectionId {
        let id = SectionId::new(self.sections.len());
        self.sections.push(section);
        id
    }

    /// Access a section.
    pub fn section(&self, id: SectionId) -> &Section<'a> {
        &self.sections[id.index()]
    }

    /// Access a section, mutably.
    pub fn section_mut(&mut self, id: SectionId) -> &mut Section<'a> {
        &mut self.sections[id.index()]
    }

    /// Register a symbol without touching the global map. This is how
    /// local symbols come to exist.
    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId::new(self.symbols.len());
        self.symbols.push(symbol);
        id
    }

    /// Access a symbol.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Access a symbol, mutably.
    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// Iterate over every symbol id in the arena.
    pub fn symbol_ids(&self) -> impl Iterator<Item = SymbolId> {
        (0..self.symbols.len()).map(SymbolId::new)
    }

    /// The display name of the file providing a symbol's current
    /// state.
    pub fn definer_name(&self, symbol: &Symbol) -> String {
        symbol
            .definer
            .map_or_else(|| String::from("<unknown>"), |file| self.file(file).name.clone())
    }

    /// Register a non-local symbol in the global map.
    ///
    /// On a name collision the merge rule decides which state
    /// survives; the surviving symbol is updated in place, so every
    /// local table aliasing it observes the outcome. Returns the
    /// surviving id — the caller must store *that* in its local table.
    pub fn register_global(&mut self, incoming: Symbol) -> Result<SymbolId, Error> {
        debug_assert_ne!(incoming.binding, Binding::Local);

        match self.globals.find(incoming.name.as_ref()) {
            None => {
                let name = incoming.name.clone();
                let id = self.add_symbol(incoming);
                self.globals.map.insert(name, id);
                Ok(id)
            }

            Some(existing) => self.merge_global(existing, incoming),
        }
    }

    /// Overwrite the survivor with the incoming state, keeping the
    /// arena slot (and thus every alias) intact.
    fn adopt_incoming(&mut self, existing: SymbolId, incoming: Symbol) {
        let survivor = self.symbol_mut(existing);
        survivor.binding = incoming.binding;
        survivor.kind = incoming.kind;
        survivor.state = incoming.state;
        survivor.definer = incoming.definer;
    }

    fn merge_global(&mut self, existing_id: SymbolId, incoming: Symbol) -> Result<SymbolId, Error> {
        use SymbolState::{Common, Defined, Undefined};

        let existing = self.symbol(existing_id);

        match (existing.state, incoming.state) {
            // Two references: the demand is as strong as the stronger
            // binding.
            (Undefined, Undefined) => {
                if existing.binding == Binding::Weak && incoming.binding == Binding::Global {
                    self.symbol_mut(existing_id).binding = Binding::Global;
                }
            }

            // A reference meets a definition or a common.
            (Undefined, Common { .. } | Defined { .. }) => {
                self.adopt_incoming(existing_id, incoming);
            }

            // Nothing new.
            (_, Undefined) => {}

            (Common { size, align }, Common { size: incoming_size, align: incoming_align }) => {
                let survivor = self.symbol_mut(existing_id);
                survivor.state = Common {
                    size: size.max(incoming_size),
                    align: align.max(incoming_align),
                };
                if incoming.binding == Binding::Global {
                    survivor.binding = Binding::Global;
                }
            }

            // A real definition beats a tentative one.
            (Common { .. }, Defined { .. }) => {
                self.adopt_incoming(existing_id, incoming);
            }

            (Defined { .. }, Common { .. }) => {}

            (Defined { .. }, Defined { .. }) => match (existing.binding, incoming.binding) {
                (Binding::Weak, Binding::Global) => {
                    self.adopt_incoming(existing_id, incoming);
                }

                // Prefer-first among weaks; a strong definition
                // shrugs a weak one off.
                (_, Binding::Weak) => {}

                _ => {
                    return Err(Error::MultipleDefinition {
                        symbol: incoming.name.to_string(),
                        first: self.definer_name(existing),
                        second: self.definer_name(&incoming),
                    });
                }
            },
        }

        Ok(existing_id)
    }
}
