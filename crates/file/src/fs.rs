//! Heap-backed blobs, for platforms without `mmap(2)`.

use std::{fs, io::Result, ops::Deref, path::Path};

/// The whole file, read into an owned buffer.
pub struct HeapBacking {
    bytes: Vec<u8>,
}

impl HeapBacking {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        Ok(Self { bytes: fs::read(path)? })
    }
}

impl Deref for HeapBacking {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}
