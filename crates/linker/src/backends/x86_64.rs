//! The x86-64 relocation back-end.
//!
//! Only the relocation types a static link of position-dependent code
//! produces are implemented. `PLT32` is applied exactly like `PC32`:
//! with no dynamic linking there is no PLT, and the call site ends up
//! pointing straight at the function.

use rivet_object::{elf64::Machine, Endianness, LittleEndian, Number};

use crate::backend::{Backend, BackendError};

/// `R_X86_64_64`: absolute 64-bit.
pub const R_X86_64_64: u32 = 1;
/// `R_X86_64_PC32`: 32-bit displacement from the end of the field.
pub const R_X86_64_PC32: u32 = 2;
/// `R_X86_64_PLT32`: call through the PLT; static links resolve it as
/// [`R_X86_64_PC32`].
pub const R_X86_64_PLT32: u32 = 4;
/// `R_X86_64_32`: absolute 32-bit, zero-extended.
pub const R_X86_64_32: u32 = 10;
/// `R_X86_64_32S`: absolute 32-bit, sign-extended.
pub const R_X86_64_32S: u32 = 11;

/// The x86-64 back-end.
pub struct X86_64;

impl X86_64 {
    fn patch(content: &mut [u8], offset: u64, bytes: &[u8]) -> Result<(), BackendError> {
        let start = usize::try_from(offset).map_err(|_| BackendError::OutOfRange { offset })?;

        content
            .get_mut(start..start + bytes.len())
            .ok_or(BackendError::OutOfRange { offset })?
            .copy_from_slice(bytes);

        Ok(())
    }
}

impl Backend for X86_64 {
    fn name(&self) -> &'static str {
        "x86-64"
    }

    fn machine(&self) -> Machine {
        Machine::X86_64
    }

    fn cpu_alignment(&self) -> u64 {
        16
    }

    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn width(&self, r#type: u32) -> Option<u64> {
        match r#type {
            R_X86_64_64 => Some(8),
            R_X86_64_PC32 | R_X86_64_PLT32 | R_X86_64_32 | R_X86_64_32S => Some(4),
            _ => None,
        }
    }

    fn apply(
        &self,
        content: &mut [u8],
        offset: u64,
        section_vaddr: u64,
        target_vaddr: u64,
        addend: i64,
        r#type: u32,
    ) -> Result<(), BackendError> {
        // Wide enough that no combination of operands wraps.
        let target = target_vaddr as i128;
        let addend = addend as i128;

        match r#type {
            R_X86_64_64 => {
                let value = (target + addend) as u64;
                Self::patch(content, offset, &LittleEndian::write_u64(value))
            }

            R_X86_64_PC32 | R_X86_64_PLT32 => {
                let place = section_vaddr as i128 + offset as i128 + 4;
                let value = target + addend - place;
                let value = i32::try_from(value)
                    .map_err(|_| BackendError::Overflow { computed: value, bits: 32 })?;

                Self::patch(content, offset, &LittleEndian::write_u32(value as u32))
            }

            R_X86_64_32 => {
                let value = target + addend;
                let value = u32::try_from(value)
                    .map_err(|_| BackendError::Overflow { computed: value, bits: 32 })?;

                Self::patch(content, offset, &LittleEndian::write_u32(value))
            }

            R_X86_64_32S => {
                let value = target + addend;
                let value = i32::try_from(value)
                    .map_err(|_| BackendError::Overflow { computed: value, bits: 32 })?;

                Self::patch(content, offset, &LittleEndian::write_u32(value as u32))
            }

            unknown => Err(BackendError::UnknownType(unknown)),
        }
    }
}
