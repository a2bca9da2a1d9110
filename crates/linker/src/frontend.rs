//! Probe-and-dispatch for input file formats.
//!
//! Front-ends are trait objects owned by a [`Registry`]. The registry
//! belongs to the driver, not to process-global state, so tests can
//! build one with injected front-ends.

use rivet_object::elf64::Machine;

use crate::{ir::FileId, Context, Error};

/// A parser for one object file format.
pub trait ObjectFrontend {
    /// Diagnostic name of the front-end.
    fn name(&self) -> &'static str;

    /// Whether `bytes` look like a file this front-end parses; on
    /// success, the detected machine architecture.
    fn probe(&self, bytes: &[u8]) -> Option<Machine>;

    /// Parse `bytes` into the context: an object file shell plus its
    /// sections, symbols (merged into the global map) and relocations.
    ///
    /// The caller decides what to do with the returned file (append it
    /// to the unprocessed list, track it as an archive member).
    fn parse<'a>(
        &self,
        ctx: &mut Context<'a>,
        name: &str,
        bytes: &'a [u8],
    ) -> Result<FileId, Error>;
}

/// A parser for one archive format.
pub trait ArchiveFrontend {
    /// Diagnostic name of the front-end.
    fn name(&self) -> &'static str;

    /// Whether `bytes` look like an archive this front-end parses.
    fn probe(&self, bytes: &[u8]) -> bool;

    /// Parse `bytes` into the context's archive list, returning the
    /// archive's position in it.
    fn parse<'a>(&self, ctx: &mut Context<'a>, name: &str, bytes: &'a [u8])
        -> Result<usize, Error>;
}

/// The set of front-ends one driver dispatches over.
#[derive(Default)]
pub struct Registry {
    objects: Vec<Box<dyn ObjectFrontend>>,
    archives: Vec<Box<dyn ArchiveFrontend>>,
}

impl Registry {
    /// An empty registry. Useful for tests injecting their own
    /// front-ends.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry holding the built-in front-ends.
    pub fn builtins() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "elf64")]
        registry.register_object(Box::new(crate::frontends::Elf64Frontend));
        #[cfg(feature = "ar")]
        registry.register_archive(Box::new(crate::frontends::ArFrontend));

        registry
    }

    /// Append an object front-end. Probe order is registration order.
    pub fn register_object(&mut self, frontend: Box<dyn ObjectFrontend>) {
        self.objects.push(frontend);
    }

    /// Append an archive front-end. Probe order is registration
    /// order.
    pub fn register_archive(&mut self, frontend: Box<dyn ArchiveFrontend>) {
        self.archives.push(frontend);
    }

    /// The first archive front-end whose probe accepts `bytes`.
    pub fn probe_archive(&self, bytes: &[u8]) -> Option<&dyn ArchiveFrontend> {
        self.archives.iter().map(Box::as_ref).find(|frontend| frontend.probe(bytes))
    }

    /// The first object front-end whose probe accepts `bytes`, with
    /// the machine architecture it detected.
    pub fn probe_object(&self, bytes: &[u8]) -> Option<(&dyn ObjectFrontend, Machine)> {
        self.objects
            .iter()
            .map(Box::as_ref)
            .find_map(|frontend| frontend.probe(bytes).map(|machine| (frontend, machine)))
    }
}
