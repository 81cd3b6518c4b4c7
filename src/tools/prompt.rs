//! The interactive questions asked while compressing: whether to store a password, and whether
//! to go ahead once the compressed size is known.

use std::io::{self, BufRead, Write};

use crate::compression::compress::Estimate;

/// Answers the two questions the compressor asks.
pub trait Interaction {
    /// Password to store in the header, or None for no password.
    fn password(&mut self) -> io::Result<Option<Vec<u8>>>;
    /// Shown the size estimate; returns false to abort before any body is written.
    fn confirm(&mut self, estimate: &Estimate) -> io::Result<bool>;
}

/// Never asks. Stores the given password (if any) and always continues.
#[derive(Debug, Default, Clone)]
pub struct Unattended {
    pub password: Option<Vec<u8>>,
}

impl Interaction for Unattended {
    fn password(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.password.clone())
    }

    fn confirm(&mut self, _estimate: &Estimate) -> io::Result<bool> {
        Ok(true)
    }
}

/// Asks on a terminal (or any reader/writer pair).
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
    /// Given up front, so the password question is skipped.
    preset: Option<Vec<u8>>,
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            preset: None,
        }
    }

    /// Use `password` instead of asking for one. The confirmation is still asked.
    pub fn with_password(mut self, password: Option<Vec<u8>>) -> Self {
        self.preset = password;
        self
    }

    /// One line of input without its line ending, or None at end of input.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }
}

fn is_no(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "n" | "no" | "0")
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "1")
}

impl<R: BufRead, W: Write> Interaction for ConsolePrompt<R, W> {
    fn password(&mut self) -> io::Result<Option<Vec<u8>>> {
        if let Some(password) = &self.preset {
            return Ok(Some(password.clone()));
        }
        match self.ask("Store a password in the archive? [y/N] ")? {
            Some(answer) if is_yes(&answer) => {}
            _ => return Ok(None),
        }
        // An empty answer is passed on as is and rejected by the header
        let password = self.ask("Password: ")?.unwrap_or_default();
        Ok(Some(password.into_bytes()))
    }

    fn confirm(&mut self, estimate: &Estimate) -> io::Result<bool> {
        writeln!(
            self.output,
            "Original size:   {} bytes\nCompressed size: {} bytes ({:.2}% of the original)",
            estimate.original_size,
            estimate.compressed_size,
            estimate.ratio() * 100.0
        )?;
        if estimate.compressed_size > estimate.original_size {
            writeln!(self.output, "The archive will be LARGER than its inputs.")?;
        }
        Ok(match self.ask("Continue? [Y/n] ")? {
            Some(answer) => !is_no(&answer),
            None => true,
        })
    }
}
