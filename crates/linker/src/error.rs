use rivet_errors::error;

error! {
    #[doc = "Errors of the linking pipeline."]
    #[doc = "\n"]
    #[doc = "Front-ends attach file/section context before an error leaves"]
    #[doc = "them; the driver reports and aggregates."]
    pub enum Error {
        #[code = E002]
        #[message = "The linker was invoked without any input object file."]
        #[help = "Pass at least one relocatable object file, e.g. `rivet main.o libc.a`."]
        NoInputFiles,

        #[code = E003]
        #[message = "An input file is in no recognized format."]
        #[formatted_message("`{0}` is not in any recognized object or archive format")]
        #[help = "Inputs must be ELF64 relocatable objects (`cc -c` output) or System-V `ar` archives."]
        UnrecognizedFormat(String),

        #[code = E004]
        #[message = "An input file is malformed or uses an unsupported feature."]
        #[formatted_message("`{file}` is malformed: {detail}")]
        #[help = "Re-create the file with a recent toolchain; see `rivet --explain E004` for the unsupported constructs."]
        Malformed { file: String, detail: String },

        #[code = E005]
        #[message = "A global symbol was defined more than once."]
        #[formatted_message("multiple definition of `{symbol}` (first defined in `{first}`, redefined in `{second}`)")]
        #[help = "A global symbol may have exactly one strong definition across the link; mark overridable definitions as weak."]
        MultipleDefinition { symbol: String, first: String, second: String },

        #[code = E006]
        #[message = "Some symbols remained undefined after resolution."]
        #[formatted_message("{count} undefined reference(s), first to `{symbol}`")]
        #[help = "Every referenced global must be defined by an input object or an archive member; each missing symbol has been reported above."]
        UndefinedReferences { count: usize, symbol: String },

        #[code = E007]
        #[message = "A relocation could not be applied."]
        #[formatted_message("cannot relocate `{section}`+{offset:#x} against `{symbol}`: {detail}")]
        #[help = "See `rivet --explain E007` for the relocation failure modes."]
        Relocation { section: String, offset: u64, symbol: String, detail: String },

        #[code = E008]
        #[message = "No relocation back-end is registered for the target architecture."]
        #[formatted_message("no back-end for {0}")]
        #[help = "Only x86-64 objects can be linked at the moment."]
        UnsupportedMachine(String),

        #[code = E009]
        #[message = "The input files disagree about the machine architecture."]
        #[formatted_message("`{file}` targets {machine}, but the link targets {expected}")]
        #[help = "All objects of one link must be compiled for the same architecture."]
        MachineMismatch { file: String, machine: String, expected: String },
    }
}
