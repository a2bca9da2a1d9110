//! `rivet-errors` is the error toolbox shared by the `rivet` crates.
//!
//! Its centrepiece is the [`error!`] macro, which declares enums that
//! implement [`std::error::Error`] through [`thiserror::Error`] and
//! [`miette::Diagnostic`]. Each variant carries a human message, an
//! optional display format, a help string, and optionally a stable
//! error code of the `E[0-9]{3}` family.
//!
//! Error codes come with a longer diagnostic page, à la `rustc
//! --explain`: `rivet --explain E005` prints the page for `E005`. The
//! pages live in `src/error_codes/` and are also part of this crate's
//! documentation through the [`Diagnostics`] type.

mod error_codes;

pub use error_codes::Diagnostics;
#[cfg(feature = "diagnostics")]
pub use error_codes::DIAGNOSTICS;
pub use miette::Result;

#[doc(hidden)]
#[macro_export]
macro_rules! emit_enum {
    ($item:item) => {
        $item
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! code_doc_link {
    ($code:ident) => {
        concat!(
            "Error code: [`",
            stringify!($code),
            "`](rivet_errors::Diagnostics::",
            stringify!($code),
            ")."
        )
    };
}

/// Declare an error enum with diagnostics.
///
/// # Example
///
/// ```rust
/// use rivet_errors::error;
///
/// error! {
///     pub enum Error {
///         #[code = E000]
///         #[message = "The given error code is invalid."]
///         #[formatted_message("`{0}` is not a valid error code.")]
///         #[help = "Did you mistype the error code?"]
///         InvalidCode(String),
///     }
/// }
///
/// # fn main() {
/// use miette::Diagnostic;
///
/// let error = Error::InvalidCode("xyz".to_string());
///
/// assert_eq!(error.to_string(), "`xyz` is not a valid error code.");
/// assert_eq!(error.code().map(|code| code.to_string()), Some("E000".to_string()));
/// # }
/// ```
///
/// # Syntax
///
/// The macro accepts an `enum` declaration whose variants may be unit
/// variants, tuple variants or struct variants. Each variant takes the
/// following attributes:
///
/// * `#[cfg(…)]` (optional),
/// * `#[code = E...]` — the stable error code (optional),
/// * `#[message = "…"]` — a literal message, used as documentation and,
///   absent a formatted message, as the [`std::fmt::Display`] output,
/// * `#[formatted_message(…)]` — a display format following the rules
///   of [`thiserror`]'s `#[error(…)]` attribute; struct variants may
///   interpolate their fields by name (optional),
/// * `#[help = "…"]` — a hint driving the user towards a fix.
///
/// A variant may instead be marked `#[transparent]`, forwarding
/// everything to its single field:
///
/// ```rust
/// use rivet_errors::error;
///
/// error! {
///     pub enum Error {
///         #[transparent]
///         Other(#[from] std::io::Error),
///     }
/// }
/// ```
#[macro_export]
macro_rules! error {
    // Variant with a formatted display message.
    (
        @variants
        [ $( $header:tt )* ]
        [ $( $done:tt )* ]
        [ $( $transparent_attr:tt )* ]
        $( #[cfg( $cfg:meta )] )*
        $( #[code = $code:ident] )?
        #[message = $message:expr]
        #[formatted_message( $( $format:tt )* )]
        #[help = $help:literal]
        $variant:ident $( ( $( $tuple:tt )* ) )? $( { $( $fields:tt )* } )? ,
        $( $rest:tt )*
    ) => {
        error! {
            @variants
            [ $( $header )* ]
            [
                $( $done )*

                $(
                    #[doc = $crate::code_doc_link!($code)]
                    #[doc = "\n"]
                )?
                #[doc = $message]
                #[error( $( $format )* )]
                #[diagnostic(
                    $( code($code), )?
                    help($help),
                )]
                $( #[cfg( $cfg )] )*
                $variant $( ( $( $tuple )* ) )? $( { $( $fields )* } )? ,
            ]
            [ $( $transparent_attr )* ]
            $( $rest )*
        }
    };

    // Variant whose display message is the literal message itself.
    (
        @variants
        [ $( $header:tt )* ]
        [ $( $done:tt )* ]
        [ $( $transparent_attr:tt )* ]
        $( #[cfg( $cfg:meta )] )*
        $( #[code = $code:ident] )?
        #[message = $message:expr]
        #[help = $help:literal]
        $variant:ident $( ( $( $tuple:tt )* ) )? $( { $( $fields:tt )* } )? ,
        $( $rest:tt )*
    ) => {
        error! {
            @variants
            [ $( $header )* ]
            [
                $( $done )*

                $(
                    #[doc = $crate::code_doc_link!($code)]
                    #[doc = "\n"]
                )?
                #[doc = $message]
                #[error($message)]
                #[diagnostic(
                    $( code($code), )?
                    help($help),
                )]
                $( #[cfg( $cfg )] )*
                $variant $( ( $( $tuple )* ) )? $( { $( $fields )* } )? ,
            ]
            [ $( $transparent_attr )* ]
            $( $rest )*
        }
    };

    // Transparent variant, forwarding to its single field.
    (
        @variants
        [ $( $header:tt )* ]
        [ $( $done:tt )* ]
        [ $( $transparent_attr:tt )* ]
        $( #[cfg( $cfg:meta )] )*
        #[transparent]
        $variant:ident ( $( $tuple:tt )* ) ,
        $( $rest:tt )*
    ) => {
        error! {
            @variants
            [ $( $header )* ]
            [
                $( $done )*

                #[doc = "Transparent error. See the inner field."]
                $( $transparent_attr )*
                $( #[cfg( $cfg )] )*
                $variant ( $( $tuple )* ) ,
            ]
            [ $( $transparent_attr )* ]
            $( $rest )*
        }
    };

    // All variants processed; emit the declaration.
    (
        @variants
        [ $( $header:tt )* ]
        [ $( $done:tt )* ]
        [ $( $transparent_attr:tt )* ]
    ) => {
        $crate::emit_enum! {
            $( $header )* {
                $( $done )*
            }
        }
    };

    // Entry point.
    (
        $( #[doc = $doc:expr ] )*
        $visibility:vis enum $name:ident {
            $( $variants:tt )*
        }
    ) => {
        error! {
            @variants
            [
                $( #[doc = $doc ] )*
                #[derive(Debug, thiserror::Error, miette::Diagnostic)]
                $visibility enum $name
            ]
            []
            [ #[error(transparent)] ]
            $( $variants )*
        }
    };
}

// The `error!` macro emits doc links of the `rivet_errors::Diagnostics::E...`
// shape. Inside this crate the path does not exist under that name, so alias
// it for rustdoc.
#[cfg(doc)]
use crate as rivet_errors;

error! {
    #[doc = "Error type of this crate."]
    #[doc = "\n"]
    #[doc = "Its main purpose is [`Self::explain`], which resolves an error"]
    #[doc = "code to its diagnostic page."]
    pub enum Error {
        #[code = E000]
        #[message = "The given error code is invalid."]
        #[formatted_message("`{0}` is not a valid error code.")]
        #[help = "Error codes follow the `E[0-9]{{3}}` pattern, i.e. an `E` followed by 3 digits, such as `E000`."]
        InvalidCode(String),
    }
}

impl Error {
    /// Resolve an error code to its diagnostic page.
    ///
    /// ```
    /// use rivet_errors::Error;
    ///
    /// # fn main() {
    /// assert!(Error::explain("E000").is_ok());
    /// assert!(Error::explain("oops").is_err());
    /// # }
    /// ```
    #[cfg(feature = "diagnostics")]
    pub fn explain(error_code: &str) -> Result<&'static str, Self> {
        DIAGNOSTICS
            .iter()
            .find_map(|(known_code, diagnostic)| (*known_code == error_code).then_some(*diagnostic))
            .ok_or_else(|| Self::InvalidCode(error_code.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use miette::Diagnostic;

    error! {
        #[doc = "Test errors."]
        pub enum TestError {
            #[message = "Something plain happened."]
            #[help = "No help available."]
            Plain,

            #[code = E000]
            #[message = "A tuple-shaped failure."]
            #[formatted_message("tuple failure on `{0}`")]
            #[help = "Check the first field."]
            Tuple(String),

            #[code = E000]
            #[message = "A struct-shaped failure."]
            #[formatted_message("struct failure: `{name}` vs `{other}`")]
            #[help = "Check both fields."]
            Named { name: String, other: String },

            #[transparent]
            Forwarded(#[from] std::io::Error),
        }
    }

    #[test]
    fn test_plain_variant() {
        let error = TestError::Plain;

        assert_eq!(error.to_string(), "Something plain happened.");
        assert!(error.code().is_none());
        assert_eq!(error.help().map(|help| help.to_string()), Some("No help available.".into()));
    }

    #[test]
    fn test_tuple_variant() {
        let error = TestError::Tuple("input.o".into());

        assert_eq!(error.to_string(), "tuple failure on `input.o`");
        assert_eq!(error.code().map(|code| code.to_string()), Some("E000".into()));
    }

    #[test]
    fn test_named_variant() {
        let error = TestError::Named { name: "a.o".into(), other: "b.o".into() };

        assert_eq!(error.to_string(), "struct failure: `a.o` vs `b.o`");
    }

    #[test]
    fn test_transparent_variant() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = TestError::from(inner);

        assert_eq!(error.to_string(), "gone");
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn test_explain() {
        assert!(crate::Error::explain("E000").is_ok());
        assert!(matches!(
            crate::Error::explain("E9999"),
            Err(crate::Error::InvalidCode(code)) if code == "E9999"
        ));
    }
}
