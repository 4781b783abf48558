//! Program text assembly
//!
//! Every line, comment or not, goes through [`GCodeOutput`] so that line
//! numbers stay monotonic across the header, operations and postamble.

use std::fmt;

/// `N` word generator. While disabled the counter is frozen, so turning
/// numbering back on resumes where it stopped.
///
/// The counter is wider than the configured start and step, so a start
/// near `u32::MAX` keeps counting upward instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumbers {
    pub next: u64,
    pub step: u32,
    pub enabled: bool,
}

impl LineNumbers {
    pub fn new(start: u32, step: u32, enabled: bool) -> Self {
        Self {
            next: u64::from(start),
            step,
            enabled,
        }
    }

    /// Numbering is fixed for a whole export; toggling exists for the
    /// frozen-counter tests only
    #[cfg(test)]
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Prefix for the next line
    pub fn take(&mut self) -> String {
        if !self.enabled {
            return String::new();
        }
        let prefix = format!("N{} ", self.next);
        self.next = self.next.saturating_add(u64::from(self.step));
        prefix
    }
}

pub fn comment(text: &str) -> String {
    format!("({})", text)
}

#[derive(Debug)]
pub struct GCodeOutput {
    pub lines: Vec<String>,
    pub numbers: LineNumbers,
    separator: String,
}

impl GCodeOutput {
    pub fn new(numbers: LineNumbers, separator: &str) -> Self {
        Self {
            lines: Vec::new(),
            numbers,
            separator: separator.to_string(),
        }
    }

    pub fn join(&self, words: &[String]) -> String {
        words.join(&self.separator)
    }

    /// One instruction line; nothing is written for an empty word list
    pub fn emit(&mut self, words: &[String]) {
        if words.is_empty() {
            return;
        }
        let line = self.join(words);
        self.push(&line);
    }

    /// Words wrapped in a comment so the controller skips them
    pub fn emit_commented(&mut self, words: &[String]) {
        if words.is_empty() {
            return;
        }
        let line = comment(&self.join(words));
        self.push(&line);
    }

    pub fn emit_comment(&mut self, text: &str) {
        self.push(&comment(text));
    }

    /// Verbatim text block (preamble, tool change text...), one numbered
    /// line per non-blank input line
    pub fn emit_block(&mut self, text: &str) {
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            self.push(line);
        }
    }

    fn push(&mut self, line: &str) {
        let prefix = self.numbers.take();
        self.lines.push(format!("{}{}", prefix, line));
    }
}

impl fmt::Display for GCodeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
