use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use winnow::ascii::{dec_uint, hex_uint, space0};
use winnow::combinator::{alt, delimited, opt, separated_pair};
use winnow::error::{ContextError, ParseError, StrContext, StrContextValue};
use winnow::{ModalResult, Parser};

use crate::error::SimError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Instruction fetch, ignored by the data cache.
    Instruction,
    Load,
    Store,
    /// Load immediately followed by a store to the same address.
    Modify,
}

impl Operation {
    pub fn code(&self) -> char {
        match self {
            Operation::Instruction => 'I',
            Operation::Load => 'L',
            Operation::Store => 'S',
            Operation::Modify => 'M',
        }
    }
}

/// One line of a valgrind-style memory trace, e.g. ` L 7ff000,4`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub operation: Operation,
    pub address: u64,
    /// Bytes accessed. Not used by the simulation.
    pub size: u32,
}

impl TraceEvent {
    pub fn parse(line: &str) -> Result<Self, ParseError<&str, ContextError>> {
        trace_event.parse(line)
    }
}

impl std::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{} {:x},{}",
            self.operation.code(),
            self.address,
            self.size
        ))
    }
}

fn trace_event(input: &mut &str) -> ModalResult<TraceEvent> {
    delimited(
        space0,
        separated_pair(operation, ' ', separated_pair(address, ',', size)),
        (space0, opt('\r')),
    )
    .parse_next(input)
    .map(|(operation, (address, size))| TraceEvent {
        operation,
        address,
        size,
    })
}

fn operation(input: &mut &str) -> ModalResult<Operation> {
    alt((
        'I'.value(Operation::Instruction),
        'L'.value(Operation::Load),
        'S'.value(Operation::Store),
        'M'.value(Operation::Modify),
    ))
    .context(StrContext::Label("operation"))
    .context(StrContext::Expected(StrContextValue::Description(
        "one of I, L, S, M",
    )))
    .parse_next(input)
}

fn address(input: &mut &str) -> ModalResult<u64> {
    hex_uint
        .context(StrContext::Label("address"))
        .context(StrContext::Expected(StrContextValue::Description(
            "a hexadecimal address",
        )))
        .parse_next(input)
}

fn size(input: &mut &str) -> ModalResult<u32> {
    dec_uint
        .context(StrContext::Label("size"))
        .context(StrContext::Expected(StrContextValue::Description(
            "a decimal access size",
        )))
        .parse_next(input)
}

/// Lazily reads [`TraceEvent`]s, one per line.
///
/// Blank lines are skipped. Iteration yields an error for the first line
/// that cannot be read or parsed, consumers are expected to stop there.
#[derive(Debug)]
pub struct TraceReader<R> {
    path: Option<PathBuf>,
    reader: R,
    line: Vec<u8>,
    line_number: usize,
}

impl TraceReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SimError::TraceSourceUnavailable {
            path: Some(path.to_path_buf()),
            source,
        })?;

        let mut reader = Self::new(BufReader::new(file));
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            path: None,
            reader,
            line: Vec::new(),
            line_number: 0,
        }
    }

    fn invalid_line(&self, content: String, reason: String) -> SimError {
        tracing::warn!(line_number = self.line_number, line = %content, "malformed trace line");
        SimError::InvalidTraceLine {
            line_number: self.line_number,
            content,
            reason,
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceEvent, SimError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    return Some(Err(SimError::TraceSourceUnavailable {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
            self.line_number += 1;

            // bytes that are not UTF-8 make a malformed line, not an unreadable trace
            let line = match std::str::from_utf8(&self.line) {
                Ok(line) => line.trim_end_matches(['\r', '\n']),
                Err(e) => {
                    let content = String::from_utf8_lossy(&self.line)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    return Some(Err(self.invalid_line(content, e.to_string())));
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let reason = match TraceEvent::parse(line) {
                Ok(event) => return Some(Ok(event)),
                Err(e) => e.to_string(),
            };
            let content = line.to_string();
            return Some(Err(self.invalid_line(content, reason)));
        }
    }
}
