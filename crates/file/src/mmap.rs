//! `mmap(2)`-backed blobs.

use std::{
    ffi::c_void,
    fs,
    io::{Error, ErrorKind, Result},
    ops::Deref,
    path::Path,
    ptr, slice,
};

use rustix::{
    mm::{mmap, munmap, MapFlags, ProtFlags},
    param::page_size,
};

/// A read-only, shared mapping of a whole file.
///
/// Empty files cannot be mapped; opening one fails with
/// [`ErrorKind::InvalidInput`], which is fine for a linker: an empty
/// input is never a valid object or archive.
pub struct MapBacking {
    // The file must stay open for the lifetime of the mapping.
    _file: fs::File,
    pointer: *const c_void,
    length: usize,
}

impl MapBacking {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;

        let length: usize = file
            .metadata()?
            .len()
            .try_into()
            .map_err(|_| Error::new(ErrorKind::InvalidData, "file is too large to map"))?;

        if length == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "cannot map an empty file"));
        }

        let pointer = unsafe {
            mmap(ptr::null_mut(), length, ProtFlags::READ, MapFlags::SHARED, &file, 0)
                .map_err(|errno| Error::from_raw_os_error(errno.raw_os_error()))?
        };

        Ok(Self { _file: file, pointer, length })
    }
}

impl Deref for MapBacking {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        unsafe { slice::from_raw_parts(self.pointer as *const u8, self.length) }
    }
}

impl Drop for MapBacking {
    fn drop(&mut self) {
        let misalignment = self.pointer as usize % page_size();

        let _ = unsafe {
            munmap(self.pointer.wrapping_byte_sub(misalignment) as *mut _, self.length)
        };
    }
}

// SAFETY: the mapping is read-only and `pointer`'s validity is tied to
// `_file`, which moves along with the struct.
unsafe impl Send for MapBacking {}
unsafe impl Sync for MapBacking {}
