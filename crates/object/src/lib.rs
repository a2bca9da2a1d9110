//! `rivet-object` reads the binary formats the linker consumes: ELF64
//! relocatable object files and System-V `ar` archives.
//!
//! This crate stays at the wire level: it parses fixed-size records
//! (headers, symbols, relocation entries, archive members) out of byte
//! slices and hands them to the front-ends in `rivet-linker`, which own
//! the semantic interpretation. Nothing here allocates section
//! contents; everything borrows from the input blob.

pub mod align;
#[cfg(feature = "ar")]
pub mod ar;
mod combinators;
#[cfg(feature = "elf64")]
pub mod elf64;
mod endianness;

pub use endianness::*;

/// Represent the input type of the parsers.
pub type Input<'a> = &'a [u8];

/// Represent the result returned by the parsers.
pub type Result<'a, O, E> = nom::IResult<Input<'a>, O, E>;

/// Errors used by the crate.
pub mod errors {
    pub use nom::Err as Error;

    /// A parser error that stores a single failure, without
    /// accumulating alternatives.
    pub type SingleError<'a> = nom::error::Error<super::Input<'a>>;

    pub use nom::error::ErrorKind;
}
