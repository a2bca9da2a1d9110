//! The linker driver: input registration, the resolution fixpoint with
//! archive demand loading, COMMON lowering, and orchestration of
//! layout and relocation.

use std::borrow::Cow;

use bstr::BString;

use rivet_object::align::align_up;
use rivet_object::elf64::Machine;

use crate::{
    backend::{self, Backend},
    diag::{Frame, Reporter},
    frontend::Registry,
    image::{Image, ReportedSymbol},
    ir::{
        Binding, FileId, MemberId, ObjectFile, Section, SectionId, SectionKind, SymbolId,
        SymbolState,
    },
    Context, Error,
};

/// Where and how the image is laid out.
#[derive(Debug, Clone, Copy)]
pub struct LayoutOptions {
    /// Base virtual address of the image.
    pub base: u64,
    /// Page size groups are padded to.
    pub page_size: u64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self { base: 0x400000, page_size: 0x1000 }
    }
}

/// What a successful link produces.
#[derive(Debug)]
pub struct LinkOutput {
    /// The machine architecture of the link.
    pub machine: Machine,
    /// The laid-out, fully relocated image.
    pub image: Image,
    /// The symbol report: every global with its resolved address.
    pub symbols: Vec<ReportedSymbol>,
}

/// The linker.
///
/// Feed it inputs with [`Linker::add_input`], then call
/// [`Linker::link`].
pub struct Linker<'a> {
    registry: Registry,
    ctx: Context<'a>,
    machine: Option<Machine>,
}

impl<'a> Linker<'a> {
    /// A linker with the built-in front-ends.
    pub fn new(reporter: Reporter) -> Self {
        Self::with_registry(Registry::builtins(), reporter)
    }

    /// A linker dispatching over a caller-provided front-end registry.
    pub fn with_registry(registry: Registry, reporter: Reporter) -> Self {
        Self { registry, ctx: Context::new(reporter), machine: None }
    }

    /// Read access to the context, mainly for inspection in tests and
    /// reporting tools.
    pub fn context(&self) -> &Context<'a> {
        &self.ctx
    }

    /// Register one command-line input: an archive or an object file.
    ///
    /// Archive front-ends probe first; their magic is more specific
    /// than the object formats'.
    pub fn add_input(&mut self, name: &str, bytes: &'a [u8]) -> Result<(), Error> {
        let reporter = self.ctx.reporter.clone();
        let _file = reporter.scope(Frame::file(name));

        if let Some(frontend) = self.registry.probe_archive(bytes) {
            reporter.trace(format_args!("front-end '{}' accepted the archive", frontend.name()));
            frontend.parse(&mut self.ctx, name, bytes)?;

            return Ok(());
        }

        if self.registry.probe_object(bytes).is_some() {
            let file = self.add_object(name, bytes)?;
            self.ctx.unprocessed.push(file);

            return Ok(());
        }

        reporter.error("unrecognized file format");
        Err(Error::UnrecognizedFormat(name.to_string()))
    }

    /// Parse an object (command-line input or archive member), keeping
    /// the link machine consistent.
    fn add_object(&mut self, name: &str, bytes: &'a [u8]) -> Result<FileId, Error> {
        let (frontend, machine) = self
            .registry
            .probe_object(bytes)
            .ok_or_else(|| Error::UnrecognizedFormat(name.to_string()))?;

        self.ctx
            .reporter
            .trace(format_args!("front-end '{}' accepted the object file", frontend.name()));

        match self.machine {
            None => self.machine = Some(machine),
            Some(expected) if expected != machine => {
                return Err(Error::MachineMismatch {
                    file: name.to_string(),
                    machine: machine.to_string(),
                    expected: expected.to_string(),
                });
            }
            Some(_) => {}
        }

        frontend.parse(&mut self.ctx, name, bytes)
    }

    /// The archive member that would define `symbol` and has not been
    /// materialized yet.
    fn find_loadable_member(&self, symbol: &BString) -> Option<(usize, MemberId)> {
        self.ctx.archives.iter().enumerate().find_map(|(archive_index, archive)| {
            let member = archive.find_symbol(symbol.as_ref())?;

            archive.member(member).object.is_none().then_some((archive_index, member))
        })
    }

    /// Parse an archive member into an object file and queue it for
    /// resolution. The materialization edge is set exactly once.
    fn materialize(&mut self, archive_index: usize, member: MemberId) -> Result<FileId, Error> {
        let archive = &self.ctx.archives[archive_index];
        let name = archive.member_display_name(member);
        let bytes = archive.member_bytes(member);

        let reporter = self.ctx.reporter.clone();
        let _file = reporter.scope(Frame::file(name.clone()));

        let file = self.add_object(&name, bytes)?;
        self.ctx.archives[archive_index].member_mut(member).object = Some(file);
        self.ctx.unprocessed.push(file);

        Ok(file)
    }

    /// Resolve the global map to a fixpoint.
    ///
    /// Unprocessed files are drained as a queue. Each file is scanned
    /// once, completely: for every still-undefined non-weak global in
    /// its table, the archives are asked for a defining member, which
    /// is materialized and appended to the queue. One scan per file
    /// suffices — local tables alias the global map, so a symbol
    /// defined by a member loaded mid-scan reads as defined for the
    /// rest of the scan. Draining in order also keeps the processed
    /// list (and with it the layout) in registration order.
    fn resolve(&mut self) -> Result<(), Error> {
        let mut cursor = 0;

        while cursor < self.ctx.unprocessed.len() {
            let file_id = self.ctx.unprocessed[cursor];
            cursor += 1;

            let reporter = self.ctx.reporter.clone();
            let _file = reporter.scope(Frame::file(self.ctx.file(file_id).name.clone()));

            let locals: Vec<SymbolId> =
                self.ctx.file(file_id).symbols.iter().map(|(_, &id)| id).collect();

            for symbol_id in locals {
                let symbol = self.ctx.symbol(symbol_id);

                // Weak references do not demand loading; unresolved
                // they settle at address zero.
                if symbol.binding != Binding::Global || !symbol.is_undefined() {
                    continue;
                }

                let name = symbol.name.clone();
                reporter.trace(format_args!("symbol `{name}` is undefined"));

                if let Some((archive_index, member)) = self.find_loadable_member(&name) {
                    reporter.debug(format_args!("`{name}` found in an archive, loading member"));
                    self.materialize(archive_index, member)?;
                }
            }
        }

        let scanned = std::mem::take(&mut self.ctx.unprocessed);
        self.ctx.processed.extend(scanned);

        // Every unresolved non-weak global is reported, then the link
        // fails once.
        let unresolved: Vec<BString> = self
            .ctx
            .globals
            .iter()
            .filter_map(|(name, id)| {
                let symbol = self.ctx.symbol(id);

                (symbol.is_undefined() && symbol.binding != Binding::Weak)
                    .then(|| BString::from(name))
            })
            .collect();

        if let Some(first) = unresolved.first() {
            for name in &unresolved {
                self.ctx.reporter.error(format_args!("undefined reference to `{name}`"));
            }

            return Err(Error::UndefinedReferences {
                count: unresolved.len(),
                symbol: first.to_string(),
            });
        }

        // All symbols are settled; the archives have served their
        // purpose (materialized members live on as object files).
        self.ctx.archives.clear();

        Ok(())
    }

    /// Lower every COMMON symbol into one synthetic zero-initialized
    /// section, so layout and address resolution see only defined
    /// symbols.
    fn lower_commons(&mut self) {
        let commons: Vec<(SymbolId, u64, u64)> = self
            .ctx
            .globals
            .iter()
            .filter_map(|(_, id)| match self.ctx.symbol(id).state {
                SymbolState::Common { size, align } => Some((id, size, align)),
                _ => None,
            })
            .collect();

        if commons.is_empty() {
            return;
        }

        let machine = self.machine.unwrap_or(Machine::Other(0));
        let file = self.ctx.add_file(ObjectFile::new("*commons*", machine));

        let section = self.ctx.add_section(Section {
            file,
            input_index: 1,
            name: BString::from("*commons*"),
            kind: SectionKind::Zero,
            align: 1,
            size: 0,
            content: Cow::Borrowed(&[]),
            relocs: Vec::new(),
            vaddr: None,
        });

        let mut cursor = 0;
        let mut max_align = 1;

        for (symbol_id, size, align) in commons {
            let align = align.max(1);
            let offset = align_up(cursor, align);

            self.ctx.reporter.trace(format_args!(
                "common `{}` lowered to zero section offset {offset:#x}",
                self.ctx.symbol(symbol_id).name
            ));

            let symbol = self.ctx.symbol_mut(symbol_id);
            symbol.state = SymbolState::Defined { section: Some(section), offset, size };
            symbol.definer = Some(file);

            cursor = offset + size;
            max_align = max_align.max(align);
        }

        let zero_section = self.ctx.section_mut(section);
        zero_section.size = cursor;
        zero_section.align = max_align;

        // The synthetic file takes part in layout like any processed
        // input.
        let _ = self.ctx.file_mut(file).sections.insert(1, section);
        self.ctx.processed.push(file);
    }

    /// Copy each group's sections into its contents buffer and apply
    /// their relocations.
    ///
    /// A failing relocation stops the patching of its section and is
    /// reported once; the remaining sections are still patched so all
    /// diagnostics surface in one run.
    fn relocate(&self, image: &mut Image, backend: &dyn Backend) -> Result<(), Error> {
        let reporter = self.ctx.reporter.clone();
        let mut first_failure = None;

        for group in &mut image.groups {
            if group.kind == SectionKind::Zero {
                continue;
            }

            let mut content =
                vec![0u8; usize::try_from(group.size).expect("group exceeds the address space")];

            for &section_id in &group.sections {
                let section = self.ctx.section(section_id);
                let start = (section.address() - group.vaddr) as usize;
                content[start..start + section.content.len()].copy_from_slice(&section.content);
            }

            for &section_id in &group.sections {
                let section = self.ctx.section(section_id);
                let file_name = self.ctx.file(section.file).name.clone();
                let _file = reporter.scope(Frame::file(file_name));

                let start = (section.address() - group.vaddr) as usize;
                let window = &mut content[start..start + section.size as usize];

                if let Err(error) = self.patch_section(section_id, window, backend) {
                    if first_failure.is_none() {
                        first_failure = Some(error);
                    }
                }
            }

            group.content = content;
        }

        match first_failure {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    /// Apply every relocation of one section into `window` (the
    /// section's bytes within its group buffer).
    fn patch_section(
        &self,
        section_id: SectionId,
        window: &mut [u8],
        backend: &dyn Backend,
    ) -> Result<(), Error> {
        let reporter = self.ctx.reporter.clone();
        let section = self.ctx.section(section_id);

        for reloc in &section.relocs {
            let _site = reporter.scope(Frame::section(section.name.to_string()).at(reloc.offset));

            let target = self.ctx.symbol(reloc.target);
            let failure = |detail: String| Error::Relocation {
                section: section.name.to_string(),
                offset: reloc.offset,
                symbol: target.name.to_string(),
                detail,
            };

            let width = match backend.width(reloc.r#type) {
                Some(width) => width,
                None => {
                    let error = failure(format!("unknown relocation type {:#x}", reloc.r#type));
                    reporter.error(&error);
                    return Err(error);
                }
            };

            if reloc.offset.checked_add(width).map_or(true, |end| end > section.size) {
                let error = failure("the patch site is outside the section".to_string());
                reporter.error(&error);
                return Err(error);
            }

            let target_vaddr = target.vaddr.unwrap_or(0);

            if let Err(backend_error) = backend.apply(
                window,
                reloc.offset,
                section.address(),
                target_vaddr,
                reloc.addend,
                reloc.r#type,
            ) {
                let error = failure(backend_error.to_string());
                reporter.error(&error);
                return Err(error);
            }
        }

        Ok(())
    }

    /// Run the pipeline: resolve, lower commons, lay out, relocate.
    pub fn link(mut self, options: LayoutOptions) -> Result<LinkOutput, Error> {
        if self.ctx.file_count() == 0 {
            self.ctx.reporter.fatal("no input object files");
            return Err(Error::NoInputFiles);
        }

        self.resolve()?;

        let machine = self.machine.ok_or(Error::NoInputFiles)?;
        let backend = backend::lookup(machine)
            .ok_or_else(|| Error::UnsupportedMachine(machine.to_string()))?;

        self.lower_commons();

        let mut image =
            self.ctx.build_image(options.base, options.page_size, backend.cpu_alignment());

        debug_assert!(image.check(&self.ctx));

        self.relocate(&mut image, backend)?;

        let symbols = self.ctx.symbol_report();

        Ok(LinkOutput { machine, image, symbols })
    }
}
