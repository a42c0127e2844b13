// src/proto/parser.rs
use std::borrow::Cow;
use std::str::Split;

use thiserror::Error;

use super::command::{ControlCommand, ControlTable, Directive};
use crate::frame::SerialFrame;

/// Batch separator between commands.
pub const DELIMITER: char = '@';
/// Line that ends the session.
pub const SENTINEL: &str = "x";

/// Why a single line was skipped. Never aborts the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("bad line (no comma): {0}")]
    MissingComma(String),
    #[error("unknown control: {0}")]
    UnknownControl(String),
    #[error("bad value: {value} in line {line}")]
    BadValue { value: String, line: String },
}

/// Decode a raw client read. Undecodable bytes become U+FFFD.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Lazily translate decoded text into per-line results, in order.
pub fn translate<'a>(text: &'a str, table: &'a ControlTable) -> Translate<'a> {
    Translate {
        lines: text.split(DELIMITER),
        table,
        ended: false,
    }
}

pub struct Translate<'a> {
    lines: Split<'a, char>,
    table: &'a ControlTable,
    ended: bool,
}

impl Iterator for Translate<'_> {
    type Item = Result<Directive, Malformed>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ended {
            return None;
        }
        for line in self.lines.by_ref() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == SENTINEL {
                self.ended = true;
                return Some(Ok(Directive::EndSession));
            }
            return Some(parse_line(line, self.table).map(Directive::Send));
        }
        None
    }
}

/// Split a trimmed, non-empty line into its name and value parts.
pub fn split_command(line: &str) -> Result<ControlCommand<'_>, Malformed> {
    let (name, raw_value) = line
        .split_once(',')
        .ok_or_else(|| Malformed::MissingComma(line.to_string()))?;
    Ok(ControlCommand {
        name: name.trim(),
        raw_value: raw_value.trim(),
    })
}

pub fn parse_line(line: &str, table: &ControlTable) -> Result<SerialFrame, Malformed> {
    let cmd = split_command(line)?;
    let code = table
        .code(cmd.name)
        .ok_or_else(|| Malformed::UnknownControl(cmd.name.to_string()))?;
    let value = parse_value(cmd.raw_value).ok_or_else(|| Malformed::BadValue {
        value: cmd.raw_value.to_string(),
        line: line.to_string(),
    })?;
    Ok(SerialFrame::new(code, value))
}

/// Integer or float text, truncated toward zero. Non-finite values are rejected.
pub fn parse_value(raw: &str) -> Option<i64> {
    let v: f64 = raw.parse().ok()?;
    if !v.is_finite() {
        return None;
    }
    // saturates outside i64
    Some(v.trunc() as i64)
}

/* ---------- tests ---------- */
