//! The hierarchical diagnostic sink.
//!
//! Every stage of the pipeline runs inside a stack of [`Frame`]s
//! describing where it currently is (file, section, symbol, offset).
//! Records emitted through the [`Reporter`] carry the rendered stack
//! as a prefix, so `warning: …` becomes
//! `libx.a(b.o): .text+0x12: warning: …` without each call site
//! threading the context through by hand.
//!
//! Frames are pushed with [`Reporter::scope`], which returns an RAII
//! guard; the pop happens on drop, on every exit path including `?`.
//! Records are routed to the [`log`] facade; the executable decides
//! what is shown.

use std::{cell::RefCell, fmt, rc::Rc};

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// The pipeline cannot continue.
    Fatal,
    /// The link will fail, but diagnosis continues.
    Error,
    /// Suspicious input; the link still succeeds.
    Warning,
    /// Notable but harmless input.
    Notice,
    /// Progress information.
    Info,
    /// Details useful when debugging the linker.
    Debug,
    /// Step-by-step tracing.
    Trace,
}

impl Level {
    fn log_level(self) -> log::Level {
        match self {
            Self::Fatal | Self::Error => log::Level::Error,
            Self::Warning => log::Level::Warn,
            Self::Notice | Self::Info => log::Level::Info,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
        }
    }
}

/// One entry of the diagnostic context stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Display name of the file being worked on.
    pub file: Option<String>,
    /// Name of the section being worked on.
    pub section: Option<String>,
    /// Name of the symbol being worked on.
    pub symbol: Option<String>,
    /// Offset within the section.
    pub offset: Option<u64>,
}

impl Frame {
    /// A frame naming a file.
    pub fn file(name: impl Into<String>) -> Self {
        Self { file: Some(name.into()), ..Self::default() }
    }

    /// A frame naming a section.
    pub fn section(name: impl Into<String>) -> Self {
        Self { section: Some(name.into()), ..Self::default() }
    }

    /// A frame naming a symbol.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self { symbol: Some(name.into()), ..Self::default() }
    }

    /// Attach an offset to the frame.
    pub fn at(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separate = false;

        if let Some(file) = &self.file {
            write!(formatter, "{file}")?;
            separate = true;
        }

        if let Some(section) = &self.section {
            if separate {
                write!(formatter, ": ")?;
            }
            write!(formatter, "{section}")?;
            if let Some(offset) = self.offset {
                write!(formatter, "+{offset:#x}")?;
            }
            separate = true;
        }

        if let Some(symbol) = &self.symbol {
            if separate {
                write!(formatter, ": ")?;
            }
            write!(formatter, "`{symbol}`")?;
        }

        Ok(())
    }
}

/// The diagnostic sink.
///
/// Cloning is cheap and clones share the same context stack, which is
/// what lets an RAII guard outlive the borrow it was created from.
/// Single-threaded, like the rest of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    frames: Rc<RefCell<Vec<Frame>>>,
}

impl Reporter {
    /// Create a reporter with an empty context stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `frame` onto the context stack until the returned guard is
    /// dropped.
    #[must_use = "the frame is popped when the guard drops"]
    pub fn scope(&self, frame: Frame) -> FrameGuard {
        self.frames.borrow_mut().push(frame);
        FrameGuard { reporter: self.clone() }
    }

    /// Current depth of the context stack.
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Emit one record at `level`.
    pub fn emit(&self, level: Level, message: impl fmt::Display) {
        let frames = self.frames.borrow();
        let prefix = frames
            .iter()
            .map(ToString::to_string)
            .filter(|rendered| !rendered.is_empty())
            .collect::<Vec<_>>()
            .join(": ");

        if prefix.is_empty() {
            log::log!(target: "rivet", level.log_level(), "{message}");
        } else {
            log::log!(target: "rivet", level.log_level(), "{prefix}: {message}");
        }
    }

    /// Emit a [`Level::Fatal`] record.
    pub fn fatal(&self, message: impl fmt::Display) {
        self.emit(Level::Fatal, message);
    }

    /// Emit a [`Level::Error`] record.
    pub fn error(&self, message: impl fmt::Display) {
        self.emit(Level::Error, message);
    }

    /// Emit a [`Level::Warning`] record.
    pub fn warning(&self, message: impl fmt::Display) {
        self.emit(Level::Warning, message);
    }

    /// Emit a [`Level::Notice`] record.
    pub fn notice(&self, message: impl fmt::Display) {
        self.emit(Level::Notice, message);
    }

    /// Emit a [`Level::Info`] record.
    pub fn info(&self, message: impl fmt::Display) {
        self.emit(Level::Info, message);
    }

    /// Emit a [`Level::Debug`] record.
    pub fn debug(&self, message: impl fmt::Display) {
        self.emit(Level::Debug, message);
    }

    /// Emit a [`Level::Trace`] record.
    pub fn trace(&self, message: impl fmt::Display) {
        self.emit(Level::Trace, message);
    }
}

/// Guard popping one [`Frame`] when dropped.
pub struct FrameGuard {
    reporter: Reporter,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.reporter.frames.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_pops_on_drop() {
        let reporter = Reporter::new();
        assert_eq!(reporter.depth(), 0);

        {
            let _file = reporter.scope(Frame::file("a.o"));
            assert_eq!(reporter.depth(), 1);

            {
                let _section = reporter.scope(Frame::section(".text").at(4));
                assert_eq!(reporter.depth(), 2);
            }

            assert_eq!(reporter.depth(), 1);
        }

        assert_eq!(reporter.depth(), 0);
    }

    #[test]
    fn test_scope_pops_on_early_return() {
        fn fails_midway(reporter: &Reporter) -> Result<(), ()> {
            let _scope = reporter.scope(Frame::file("a.o"));
            Err(())?;
            Ok(())
        }

        let reporter = Reporter::new();
        assert!(fails_midway(&reporter).is_err());
        assert_eq!(reporter.depth(), 0);
    }

    #[test]
    fn test_frame_rendering() {
        assert_eq!(Frame::file("a.o").to_string(), "a.o");
        assert_eq!(Frame::section(".text").to_string(), ".text");
        assert_eq!(Frame::section(".text").at(0x12).to_string(), ".text+0x12");
        assert_eq!(Frame::symbol("main").to_string(), "`main`");

        let full = Frame {
            file: Some("a.o".into()),
            section: Some(".data".into()),
            symbol: Some("counter".into()),
            offset: Some(8),
        };
        assert_eq!(full.to_string(), "a.o: .data+0x8: `counter`");
    }

    #[test]
    fn test_clones_share_the_stack() {
        let reporter = Reporter::new();
        let clone = reporter.clone();

        let _scope = clone.scope(Frame::file("a.o"));

        assert_eq!(reporter.depth(), 1);
    }
}
