//! `rivet-file` turns input files into [`Blob`]s: named, read-only byte
//! buffers with a lifetime that dominates everything parsed out of
//! them.
//!
//! Two backings exist, selected by Cargo feature: `mmap` maps the file
//! with `mmap(2)` (the default on unix, picked by the `auto` feature),
//! `fs` reads it into a heap buffer. The linker never writes through a
//! blob.

use std::{io::Result, ops::Deref, path::Path};

#[cfg(all(not(feature = "auto"), not(feature = "fs"), not(feature = "mmap")))]
compile_error!("No backing feature selected, please select at least `auto`");

#[cfg(feature = "fs")]
pub mod fs;
#[cfg(feature = "mmap")]
pub mod mmap;

#[cfg(all(feature = "fs", not(feature = "mmap")))]
use fs::HeapBacking as Backing;
#[cfg(feature = "mmap")]
use mmap::MapBacking as Backing;

/// A named, read-only byte buffer.
///
/// The display name is the path the blob was opened from; it is used
/// in diagnostics only.
pub struct Blob {
    name: String,
    backing: Backing,
}

impl Blob {
    /// Open `path` and make its whole content available as bytes.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let backing = Backing::open(path)?;

        Ok(Self { name: path.display().to_string(), backing })
    }

    /// The display name of the blob.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The content of the blob.
    pub fn bytes(&self) -> &[u8] {
        &self.backing
    }
}

impl Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.bytes()
    }
}
