//! The built-in relocation back-ends.

mod x86_64;

pub use x86_64::X86_64;
