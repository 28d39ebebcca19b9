//! Colored terminal output for release operations
//!
//! Provides consistent, colored CLI output with proper formatting. Handlers
//! receive an `OutputManager` as their logger; write failures on the
//! terminal are never fatal to a release.

use std::io::Write;
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn emit(&self, write: impl FnOnce(&mut Buffer) -> std::io::Result<()>) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        if write(&mut buffer).is_ok() {
            let _ = self.bufwtr.print(&buffer);
        }
    }

    fn symbol_line(&self, symbol: &str, spec: &ColorSpec, message: &str) {
        self.emit(|buffer| {
            buffer.set_color(spec)?;
            write!(buffer, "{symbol}")?;
            buffer.reset()?;
            writeln!(buffer, " {message}")
        });
    }

    /// Print an info message (normal output)
    pub fn info(&self, message: &str) {
        self.symbol_line("ℹ", ColorSpec::new().set_fg(Some(Color::Cyan)), message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        self.symbol_line(
            "✓",
            ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true),
            message,
        );
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        self.emit(|buffer| {
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
            write!(buffer, "⚠")?;
            buffer.reset()?;
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            writeln!(buffer, " {message}")?;
            buffer.reset()
        });
    }

    /// Print an error message (always shown)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();

        // Try colored output to stderr
        if buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true)).is_err()
            || write!(&mut buffer, "✗").is_err()
            || buffer.reset().is_err()
            || buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red))).is_err()
            || writeln!(&mut buffer, " {message}").is_err()
            || buffer.reset().is_err()
            || bufwtr.print(&buffer).is_err()
        {
            // Stderr failed - fallback to stdout as last resort
            println!("[STDERR ERROR] ✗ {message}");
        }
    }

    /// Print a verbose/debug message (only in verbose mode)
    pub fn verbose(&self, message: &str) {
        if !self.verbose {
            return;
        }
        self.symbol_line("→", ColorSpec::new().set_fg(Some(Color::Blue)), message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        self.emit(|buffer| {
            writeln!(buffer)?;
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
            writeln!(buffer, "═══ {title} ═══")?;
            buffer.reset()
        });
    }

    /// Print a numbered step heading
    pub fn step(&self, number: usize, title: &str) {
        self.emit(|buffer| {
            buffer.set_color(ColorSpec::new().set_bold(true))?;
            writeln!(buffer, "{number}. {title}")?;
            buffer.reset()
        });
    }

    /// Print a command for the operator to copy
    pub fn command(&self, command: &str) {
        self.emit(|buffer| {
            write!(buffer, "    ")?;
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            writeln!(buffer, "{command}")?;
            buffer.reset()
        });
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) {
        self.emit(|buffer| writeln!(buffer, "    {message}"));
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) {
        self.emit(|buffer| writeln!(buffer, "{message}"));
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}
