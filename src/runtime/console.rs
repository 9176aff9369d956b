use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::error::{Error, Result};

/// Where program output goes and program input comes from
pub trait Console {
    /// Writes a full line
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Writes text without ending the line (prompts)
    fn write(&mut self, text: &str) -> Result<()>;

    /// Reads one line without its terminator; `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>>;
}

/// Console bound to the process's stdout and stdin
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    /// Creates a console on stdout/stdin
    pub fn new() -> Self {
        StdConsole
    }
}

fn stdout_error(err: io::Error) -> Error {
    Error::io("<stdout>", &err)
}

impl Console for StdConsole {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", line).map_err(stdout_error)
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let mut out = io::stdout().lock();
        write!(out, "{}", text).map_err(stdout_error)?;
        out.flush().map_err(stdout_error)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::io("<stdin>", &e))?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Shared view of everything a [`BufferedConsole`] has printed
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    lines: Rc<RefCell<Vec<String>>>,
}

impl CapturedOutput {
    /// Printed lines so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Printed lines joined with newlines
    pub fn text(&self) -> String {
        self.lines.borrow().join("\n")
    }

    /// Drops everything captured so far
    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }

    fn push(&self, line: String) {
        self.lines.borrow_mut().push(line);
    }
}

/// In-memory console with scripted input
///
/// Prompts written with [`Console::write`] are kept as their own line once
/// input is read, so transcripts stay in order.
#[derive(Debug, Default)]
pub struct BufferedConsole {
    output: CapturedOutput,
    pending: String,
    input: VecDeque<String>,
}

impl BufferedConsole {
    /// Creates a console with no input
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a console that answers reads with the given lines in order
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BufferedConsole {
            input: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Handle onto the captured output, usable after the console has been
    /// moved into an evaluator
    pub fn output(&self) -> CapturedOutput {
        self.output.clone()
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            self.output.push(std::mem::take(&mut self.pending));
        }
    }
}

impl Console for BufferedConsole {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let full = format!("{}{}", std::mem::take(&mut self.pending), line);
        self.output.push(full);
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.pending.push_str(text);
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.flush_pending();
        Ok(self.input.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_console_records_lines() {
        let mut console = BufferedConsole::new();
        let output = console.output();
        console.write_line("hello").unwrap();
        console.write("a").unwrap();
        console.write_line("b").unwrap();
        assert_eq!(output.lines(), vec!["hello", "ab"]);
    }

    #[test]
    fn test_scripted_input_and_prompts() {
        let mut console = BufferedConsole::with_input(["42"]);
        let output = console.output();
        console.write("> ").unwrap();
        assert_eq!(console.read_line().unwrap(), Some("42".to_string()));
        assert_eq!(console.read_line().unwrap(), None);
        assert_eq!(output.lines(), vec!["> "]);
    }
}
