//! The diagnostic sink: line-oriented text output for trace lines and
//! assertion/report text (spec §2, §6).

use crate::time::{format_time, Time};
use std::fmt;

/// Severity levels for `assert_fail`, per LRM 93 §8.2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note = 0,
    Warning = 1,
    Error = 2,
    Failure = 3,
}

impl Severity {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Severity::Note,
            1 => Severity::Warning,
            2 => Severity::Error,
            3 => Severity::Failure,
            _ => panic!("severity {v} out of range 0..=3"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Note => "Note",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Failure => "Failure",
        }
    }

    /// Error and Failure abort the run (spec §4.5, §7).
    pub fn is_fatal(self) -> bool {
        matches!(self, Severity::Error | Severity::Failure)
    }
}

/// Receives the literal diagnostic text the kernel emits. Implementors get
/// plain lines with no trailing newline; callers add their own framing.
pub trait DiagnosticSink {
    fn report(&mut self, line: fmt::Arguments<'_>);
}

/// Default sink for the reference host: writes to stderr, matching
/// `rtkern.c`'s `fprintf(stderr, ...)` calls.
#[derive(Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&mut self, line: fmt::Arguments<'_>) {
        eprintln!("{line}");
    }
}

/// Captures lines in memory; used by tests that assert on exact diagnostic
/// text (spec §8 scenario 4).
#[derive(Default)]
pub struct CapturingSink {
    pub lines: Vec<String>,
}

impl DiagnosticSink for CapturingSink {
    fn report(&mut self, line: fmt::Arguments<'_>) {
        self.lines.push(line.to_string());
    }
}

/// `TRACE (init): ` before the first cycle runs, `TRACE <time>+<iter>: `
/// otherwise (spec §4.1).
pub(crate) fn trace_prefix(now: Time, iteration: i64) -> String {
    if iteration < 0 {
        "TRACE (init): ".to_string()
    } else {
        format!("TRACE {}+{}: ", format_time(now), iteration)
    }
}
