pub use nom::{
    bytes::complete::{tag, take},
    error::{ErrorKind, ParseError},
    sequence::tuple,
    Err,
};

use crate::{Input, Result};

/// Consume `count` bytes without producing a value.
///
/// The fixed-size records this crate parses are full of fields a
/// static linker has no use for (padding, timestamps, file modes);
/// `skip` steps over them inside a `tuple` without inventing a
/// binding for bytes nobody reads.
pub fn skip<'a, E>(count: usize) -> impl Fn(Input<'a>) -> Result<'a, (), E>
where
    E: ParseError<Input<'a>>,
{
    move |input: Input<'a>| {
        if input.len() < count {
            return Err(Err::Error(E::from_error_kind(input, ErrorKind::Eof)));
        }

        Ok((&input[count..], ()))
    }
}
