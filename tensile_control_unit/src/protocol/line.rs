//! Inbound line assembly and command parsing.
//!
//! Bytes accumulate until CR or LF. Empty lines are ignored; input past
//! the buffer capacity is dropped until the next terminator.

use heapless::{String, Vec};
use tensile_common::consts::COMMAND_BUFFER_SIZE;
use tensile_common::tester::command::{Command, CommandFrame};
use tracing::{debug, warn};

/// One assembled line (at most `COMMAND_BUFFER_SIZE - 1` bytes).
pub type Line = String<COMMAND_BUFFER_SIZE>;

#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8, COMMAND_BUFFER_SIZE>,
    truncated: bool,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a line when a terminator completes one.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        match byte {
            b'\r' | b'\n' => self.finish(),
            _ => {
                if self.buffer.len() + 1 >= COMMAND_BUFFER_SIZE || self.buffer.push(byte).is_err() {
                    if !self.truncated {
                        warn!("Command line exceeds {} bytes, truncating", COMMAND_BUFFER_SIZE - 1);
                    }
                    self.truncated = true;
                }
                None
            }
        }
    }

    /// Feed a chunk, collecting every completed line.
    pub fn extend<'a>(&'a mut self, bytes: &'a [u8]) -> impl Iterator<Item = Line> + 'a {
        bytes.iter().filter_map(move |&b| self.push(b))
    }

    /// Bytes buffered for the current line.
    #[inline]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn finish(&mut self) -> Option<Line> {
        self.truncated = false;
        if self.buffer.is_empty() {
            return None;
        }
        let mut line = Line::new();
        for chunk in self.buffer.utf8_chunks() {
            let _ = line.push_str(chunk.valid());
            if !chunk.invalid().is_empty() {
                let _ = line.push(char::REPLACEMENT_CHARACTER);
            }
        }
        self.buffer.clear();
        Some(line)
    }
}

/// Parse one line into a command frame. `None` for blank lines.
///
/// The token is everything before the first space. The parameter is the
/// numeric prefix of the following text; text that does not start with a
/// number yields a NaN parameter so the command is rejected downstream.
pub fn parse_line(line: &str) -> Option<CommandFrame> {
    let line = line.trim_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let (token, rest) = match line.split_once(' ') {
        Some((token, rest)) => (token, Some(rest)),
        None => (line, None),
    };
    let command = Command::from_token(token.trim());

    let parameter = rest
        .map(str::trim_start)
        .filter(|s| !s.is_empty())
        .map(|s| leading_number(s).unwrap_or(f64::NAN));

    debug!("Parsed {command:?} parameter {parameter:?}");
    Some(CommandFrame { command, parameter })
}

/// Longest prefix of `s` that parses as a decimal number.
fn leading_number(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}
