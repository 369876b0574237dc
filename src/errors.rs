// File: src/errors.rs
//
// Error taxonomy for Lumen: lexical errors surface inline as scanner tokens
// and are reported by the compiler; compile errors abort before any
// bytecode runs; runtime errors unwind the interpreter loop and print a
// stack trace; fatal errors are not supposed to be recoverable at all.

use colored::Colorize;
use std::fmt;

/// One frame of a runtime stack trace: `[line L] in <name>`.
#[derive(Debug, Clone)]
pub struct TraceFrame {
    pub line: u32,
    /// `None` renders as `script`, matching the top-level chunk.
    pub function_name: Option<String>,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function_name {
            Some(name) => write!(f, "[line {}] in {}()", self.line, name),
            None => write!(f, "[line {}] in script", self.line),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LumenError {
    /// A single `ERROR` token the scanner produced; the compiler decides
    /// how many of these to collect before giving up.
    Lexical { message: String, line: u32 },
    /// The compiler could not produce a chunk. `interpret` returns
    /// `INTERPRET_COMPILE_ERROR` for this; VM state is otherwise untouched.
    Compile { message: String, line: u32 },
    /// A fault raised while bytecode was executing. Carries the full call
    /// stack at the point of the fault, top frame first.
    Runtime { message: String, trace: Vec<TraceFrame> },
    /// An invariant violation or allocation failure. Not meant to be
    /// caught; printing one and aborting is the correct response.
    Fatal { message: String },
}

impl LumenError {
    pub fn lexical(message: impl Into<String>, line: u32) -> Self {
        LumenError::Lexical { message: message.into(), line }
    }

    pub fn compile(message: impl Into<String>, line: u32) -> Self {
        LumenError::Compile { message: message.into(), line }
    }

    pub fn runtime(message: impl Into<String>, trace: Vec<TraceFrame>) -> Self {
        LumenError::Runtime { message: message.into(), trace }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        LumenError::Fatal { message: message.into() }
    }
}

impl fmt::Display for LumenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LumenError::Lexical { message, line } => {
                write!(f, "{} at line {}: {}", "Lexical error".red().bold(), line, message)
            }
            LumenError::Compile { message, line } => {
                write!(f, "{} at line {}: {}", "Compile error".red().bold(), line, message)
            }
            LumenError::Runtime { message, trace } => {
                writeln!(f, "{}", message)?;
                for frame in trace {
                    writeln!(f, "{}", frame.to_string().bright_blue())?;
                }
                Ok(())
            }
            LumenError::Fatal { message } => write!(f, "{}: {}", "fatal".red().bold(), message),
        }
    }
}

impl std::error::Error for LumenError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_error_renders_trace_top_down() {
        let err = LumenError::runtime(
            "Undefined variable 'x'.",
            vec![
                TraceFrame { line: 4, function_name: Some("inner".into()) },
                TraceFrame { line: 1, function_name: None },
            ],
        );
        let rendered = format!("{}", err);
        let inner_pos = rendered.find("inner").unwrap();
        let script_pos = rendered.find("script").unwrap();
        assert!(inner_pos < script_pos);
    }
}
