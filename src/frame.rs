use std::fmt;

/// One command as the microcontroller sees it: `<code>,<value>\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialFrame {
    pub code: u16,
    pub value: i64,
}

impl SerialFrame {
    pub fn new(code: u16, value: i64) -> Self {
        Self { code, value }
    }

    pub fn to_line(self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for SerialFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.code, self.value)
    }
}
