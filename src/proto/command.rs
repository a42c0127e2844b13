use std::collections::BTreeMap;
use std::str::FromStr;

use crate::frame::SerialFrame;

/// Default mapping from operator control names to device codes.
pub const DEFAULT_CONTROLS: [(&str, u16); 6] = [
    ("dpv", 1), // d-pad vertical
    ("dph", 2), // d-pad horizontal
    ("btna", 3),
    ("btnb", 4),
    ("btny", 5),
    ("btnx", 6),
];

/// A `name,value` segment as it arrived from the client, both parts trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCommand<'a> {
    pub name: &'a str,
    pub raw_value: &'a str,
}

/// What one line of a batch asks the bridge to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Send(SerialFrame),
    EndSession,
}

/// Name to code lookup. Built once at startup and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTable {
    codes: BTreeMap<String, u16>,
}

impl ControlTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u16)>,
        S: Into<String>,
    {
        Self {
            codes: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// The default table with `overrides` applied on top, later entries winning.
    pub fn with_overrides(overrides: &[ControlOverride]) -> Self {
        let mut table = Self::default();
        for o in overrides {
            table.codes.insert(o.name.clone(), o.code);
        }
        table
    }

    pub fn code(&self, name: &str) -> Option<u16> {
        self.codes.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.codes.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for ControlTable {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROLS)
    }
}

/// `NAME=CODE` from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlOverride {
    pub name: String,
    pub code: u16,
}

impl FromStr for ControlOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, code) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=CODE, got {s:?}"))?;
        let name = name.trim();
        if name.is_empty() || name == "x" || name.contains([',', '@']) {
            return Err(format!("invalid control name {name:?}"));
        }
        let code: u16 = code
            .trim()
            .parse()
            .map_err(|_| format!("control code must be a positive integer, got {code:?}"))?;
        if code == 0 {
            return Err("control code must be a positive integer, got 0".into());
        }
        Ok(ControlOverride {
            name: name.to_string(),
            code,
        })
    }
}
