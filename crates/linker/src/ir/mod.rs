//! The intermediate representation the front-ends produce and the rest
//! of the pipeline consumes.
//!
//! Object files, sections and symbols live in arenas owned by the
//! [`Context`](crate::Context) and reference each other with copyable
//! ids. A section does not pin its object file and a symbol does not
//! pin its section; teardown is dropping the context.

mod archive;
mod objfile;
mod section;
mod symbol;

pub use archive::*;
pub use objfile::*;
pub use section::*;
pub use symbol::*;

macro_rules! arena_id {
    ( $( #[doc = $doc:expr] $name:ident ),* $(,)? ) => {
        $(
            #[doc = $doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(u32);

            impl $name {
                pub(crate) fn new(index: usize) -> Self {
                    Self(u32::try_from(index).expect("arena exceeds u32 indices"))
                }

                /// The position of the entry within its arena.
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

arena_id! {
    #[doc = "Identifies an object file within a linker context."]
    FileId,
    #[doc = "Identifies a section within a linker context."]
    SectionId,
    #[doc = "Identifies a symbol within a linker context."]
    SymbolId,
    #[doc = "Identifies a member within one archive."]
    MemberId,
}
