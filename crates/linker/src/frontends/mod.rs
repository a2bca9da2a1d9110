//! The built-in front-ends.

#[cfg(feature = "ar")]
mod ar;
#[cfg(feature = "elf64")]
mod elf64;

#[cfg(feature = "ar")]
pub use ar::ArFrontend;
#[cfg(feature = "elf64")]
pub use elf64::Elf64Frontend;
