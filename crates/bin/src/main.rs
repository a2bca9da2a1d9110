//! `rivet-bin` is the executable of `rivet`, the static linker.
//!
//! It owns everything the linking pipeline treats as external: the
//! command line, reading input files (concurrently, on a small thread
//! pool), the logging configuration, and writing the linked image out.

mod error;
mod writer;

use std::{
    env,
    ffi::OsString,
    io::Write as _,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    process,
};

use argh::FromArgs;
use async_channel::unbounded;
use error::Error;
use futures_lite::future::block_on;
use miette::Result;
use rivet_file::Blob;
use rivet_linker::{diag::Reporter, LayoutOptions, Linker};
use rivet_scheduler::ThreadPool;

/// Exit code for command-line misuse.
const EXIT_USAGE: i32 = 1;

/// Exit code for a failed link.
const EXIT_LINK: i32 = 2;

/// The `rivet` command is a static linker: it combines relocatable
/// object files and archives, resolves symbols, lays the result out in
/// memory and applies relocations.
#[derive(Debug, FromArgs)]
struct Rivet {
    /// explain a particular error based on its code (of kind `E...`).
    #[argh(option)]
    explain: Option<String>,

    /// verbosity, from 0 (warnings only) to 3 (full tracing).
    #[argh(option, short = 'v', long = "verbose", default = "0")]
    verbose: u8,

    /// base virtual address of the image.
    #[argh(option, default = "0x400000")]
    base: u64,

    /// write the linked image to this file, as an ELF executable.
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// write the image as a flat binary instead of an ELF executable.
    #[argh(switch)]
    flat: bool,

    /// input files: relocatable objects and archives.
    #[argh(positional)]
    input_files: Vec<PathBuf>,
}

impl Rivet {
    /// Creates a new `Self` type based on [`std::env::args_os`].
    fn new() -> Result<Self, Error> {
        // Collect all arguments.
        let arguments =
            env::args_os().map(OsString::into_string).collect::<Result<Vec<_>, _>>().map_err(
                |argument| Error::InvalidArgumentEncoding(argument.to_string_lossy().to_string()),
            )?;

        // Check whether `argv` is present.
        if arguments.is_empty() {
            return Err(Error::ProgramNameIsMissing);
        }

        // Extract the base command from a path.
        let command = Path::new(&arguments[0])
            .file_name()
            .and_then(|file_name| file_name.to_str())
            .unwrap_or(&arguments[0]);

        // Extract all arguments.
        let arguments =
            arguments.iter().skip(1).map(|argument| argument.as_str()).collect::<Vec<_>>();

        // Parse and build `Self`.
        match Rivet::from_args(&[command], &arguments) {
            Ok(rivet) => Ok(rivet),
            Err(early_exit) => match early_exit.status {
                // The command was parsed successfully and the early exit is due to a flag like
                // `--help` causing early exit with output.
                Ok(()) => {
                    println!("{}", early_exit.output);

                    process::exit(0);
                }

                // The arguments were not successfully parsed.
                Err(()) => Err(Error::CommandLine(early_exit.output.trim().to_string())),
            },
        }
    }

    fn configure_logging(&self) {
        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .format_target(false)
            .init();
    }
}

/// Open every input concurrently, preserving the command-line order.
fn load_inputs(paths: &[PathBuf]) -> std::io::Result<Vec<Blob>> {
    let pool = ThreadPool::new(NonZeroUsize::new(4).expect("4 is not 0"))?;
    let (sender, receiver) = unbounded::<(usize, std::io::Result<Blob>)>();

    for (position, path) in paths.iter().enumerate() {
        let sender = sender.clone();
        let path = path.clone();

        pool.execute(async move {
            let blob = Blob::open(&path);

            sender.send((position, blob)).await.expect("result channel closed early");
        })
        .expect("job channel closed early");
    }

    drop(sender);

    let mut loaded = block_on(async {
        let mut loaded = Vec::with_capacity(paths.len());
        while let Ok(result) = receiver.recv().await {
            loaded.push(result);
        }
        loaded
    });

    loaded.sort_by_key(|(position, _)| *position);
    loaded.into_iter().map(|(_, blob)| blob).collect()
}

fn write_output(path: &Path, output: &rivet_linker::LinkOutput, flat: bool) -> std::io::Result<()> {
    let bytes = if flat { output.image.flatten() } else { writer::write_executable(output) };

    let mut file = std::fs::File::options().create(true).write(true).truncate(true).open(path)?;

    file.write_all(&bytes)
}

fn main() -> Result<()> {
    // Install the error report.
    Error::install_and_configure()?;

    // Build the command-line arguments.
    let rivet = match Rivet::new() {
        Ok(rivet) => rivet,
        Err(error) => {
            eprintln!("{:?}", miette::Report::new(error));
            process::exit(EXIT_USAGE);
        }
    };

    rivet.configure_logging();

    // Handle the `--explain` option.
    if let Some(error_code) = rivet.explain {
        println!("{}", Error::explain(&error_code)?);

        return Ok(());
    }

    if rivet.input_files.is_empty() {
        eprintln!("missing input files; see `rivet --help`");
        process::exit(EXIT_USAGE);
    }

    // Map all inputs before the pipeline starts; the blobs must
    // outlive the linker.
    let blobs = match load_inputs(&rivet.input_files) {
        Ok(blobs) => blobs,
        Err(error) => {
            eprintln!("cannot read the input files: {error}");
            process::exit(EXIT_LINK);
        }
    };

    // Feed the linker.
    let mut linker = Linker::new(Reporter::new());
    let options = LayoutOptions { base: rivet.base, ..LayoutOptions::default() };

    let mut registered = Ok(());
    for blob in &blobs {
        if let Err(error) = linker.add_input(blob.name(), blob) {
            registered = Err(error);
            break;
        }
    }

    let outcome = registered.and_then(|()| linker.link(options));

    let output = match outcome {
        Ok(output) => output,
        Err(error) => {
            eprintln!("{:?}", miette::Report::new(error));
            process::exit(EXIT_LINK);
        }
    };

    // The symbol report, for the curious.
    if rivet.verbose > 0 {
        for symbol in &output.symbols {
            println!(
                "{vaddr:#012x} {size:8} {name}{file}",
                vaddr = symbol.vaddr,
                size = symbol.size,
                name = symbol.name,
                file = symbol
                    .file
                    .as_deref()
                    .map(|file| format!("  ({file})"))
                    .unwrap_or_default(),
            );
        }
    }

    if let Some(path) = &rivet.output {
        if let Err(error) = write_output(path, &output, rivet.flat) {
            eprintln!("cannot write `{}`: {error}", path.display());
            process::exit(EXIT_LINK);
        }
    }

    Ok(())
}
