macro_rules! register_diagnostics {
    ( $( $error_code:ident ),* $(,)* ) => {
        /// All known `(error_code, diagnostic page)` pairs.
        #[cfg(feature = "diagnostics")]
        pub static DIAGNOSTICS: &[(&str, &str)] = &[
            $(
                (
                    stringify!($error_code),
                    concat!(
                        "\n",
                        include_str!(concat!("./error_codes/", stringify!($error_code), ".md")),
                    ),
                )
            ),*
        ];

        /// This type exists for documentation purposes only.
        ///
        /// Every error code declared through [`crate::error!`] links here, so
        /// the diagnostic pages are browsable as rustdoc and testable with
        /// `cargo test --doc`.
        pub enum Diagnostics {
            $(
                #[doc = include_str!(concat!("./error_codes/", stringify!($error_code), ".md"))]
                $error_code
            ),*
        }
    };
}

register_diagnostics!(E000, E001, E002, E003, E004, E005, E006, E007, E008, E009);
