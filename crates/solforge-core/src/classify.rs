//! Classification of failed compiler invocations.
//!
//! The external tool's error format changes across releases, so
//! failures are sorted into a small taxonomy the presentation layer
//! can rely on: syntax errors render inline at their source
//! location, system errors prompt for configuration, and everything
//! else surfaces generically.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::invoke::RawOutput;
use crate::resolve;

/// `<file>:<line>:<column>:` location prefix at the start of a
/// stderr line.
static LOCATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([^: ]+):(\d+):(\d+):").unwrap());

/// Shell wording for a binary that could not be found or executed.
static NOT_FOUND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)command not found|no such file or directory|not recognized").unwrap()
});

/// Exit status the shell reports for an unknown command.
const COMMAND_NOT_FOUND_CODE: i32 = 127;

/// Failure taxonomy every caller depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Environment or toolchain misconfiguration.
    System,

    /// Source rejected by the compiler.
    Syntax,

    /// Unrecognized failure shape; only the raw diagnostic text is
    /// available.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Syntax => write!(f, "syntax"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A location in source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file path, normalized like resolver paths.
    pub file: String,

    /// Line number (1-indexed).
    pub line: u32,

    /// Column number (1-indexed).
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A classified compiler failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct CompileError {
    /// Taxonomy bucket.
    pub kind: ErrorKind,

    /// Diagnostic text.
    pub message: String,

    /// Source location, when the compiler reported one.
    pub location: Option<SourceLocation>,
}

impl CompileError {
    /// Environment or toolchain failure.
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::System,
            message: message.into(),
            location: None,
        }
    }

    /// Source rejected by the compiler.
    pub fn syntax(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            message: message.into(),
            location,
        }
    }

    /// Unrecognized failure.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Unknown,
            message: message.into(),
            location: None,
        }
    }

    /// Operator-facing error for a missing or unconfigured binary.
    pub fn missing_binary(binary: &Path) -> Self {
        Self::system(format!(
            "could not find {}; set the Solidity compiler path in the configuration",
            binary.display()
        ))
    }
}

/// Classify an invocation that exited non-zero.
///
/// Rules, in priority order: a stderr location prefix means the
/// source was rejected; a command-not-found signal means the
/// environment is broken; anything else is surfaced raw.
pub fn classify_failure(output: &RawOutput) -> CompileError {
    if let Some(caps) = LOCATION_PATTERN.captures(&output.stderr) {
        let location = SourceLocation {
            file: resolve::normalize_path(&caps[1]),
            line: caps[2].parse().unwrap_or(0),
            column: caps[3].parse().unwrap_or(0),
        };
        // The first line holds the location and error head; the
        // remainder is the caret context shown to the user.
        let message = match output.stderr.split_once('\n') {
            Some((_, rest)) => rest.to_string(),
            None => output.stderr.clone(),
        };
        return CompileError::syntax(message, Some(location));
    }

    if looks_like_missing_command(output) {
        return CompileError::system(output.stderr.trim_end().to_string());
    }

    tracing::warn!(
        "unrecognized compiler failure (exit {:?}): {}",
        output.code,
        output.stderr.trim_end()
    );
    CompileError::unknown(output.stderr.clone())
}

/// Classify stderr text seen alongside a zero exit under the strict
/// policy: an environment warning, not a source defect.
pub fn classify_stderr_warning(stderr: &str) -> CompileError {
    CompileError::system(stderr.to_string())
}

fn looks_like_missing_command(output: &RawOutput) -> bool {
    output.code == Some(COMMAND_NOT_FOUND_CODE) || NOT_FOUND_PATTERN.is_match(&output.stderr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(stderr: &str, code: i32) -> RawOutput {
        RawOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            code: Some(code),
        }
    }

    #[test]
    fn test_location_prefix_is_syntax() {
        let output = failed(
            "contracts/Foo.sol:3:5: ParserError: Expected ';' but got '}'\n    uint x\n    ^\n",
            1,
        );

        let err = classify_failure(&output);
        assert_eq!(err.kind, ErrorKind::Syntax);
        let location = err.location.expect("location");
        assert_eq!(location.file, "contracts/Foo.sol");
        assert_eq!(location.line, 3);
        assert_eq!(location.column, 5);
        assert!(err.message.contains("uint x"));
        assert!(!err.message.contains("ParserError"));
    }

    #[test]
    fn test_relative_marker_normalized_in_location() {
        let output = failed("./contracts/Foo.sol:10:2: ParserError: bad\n", 1);

        let err = classify_failure(&output);
        let location = err.location.expect("location");
        assert_eq!(location.file, "contracts/Foo.sol");
    }

    #[test]
    fn test_command_not_found_exit_code_is_system() {
        let output = failed("sh: solc: command not found", 127);
        assert_eq!(classify_failure(&output).kind, ErrorKind::System);
    }

    #[test]
    fn test_missing_file_wording_is_system() {
        let output = failed("exec: No such file or directory", 1);
        assert_eq!(classify_failure(&output).kind, ErrorKind::System);
    }

    #[test]
    fn test_unrecognized_failure_is_unknown() {
        let output = failed("segmentation fault (core dumped)", 139);
        let err = classify_failure(&output);
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert!(err.message.contains("segmentation fault"));
    }

    #[test]
    fn test_zero_exit_stderr_is_system_warning() {
        let err = classify_stderr_warning("Warning: This is a pre-release compiler version\n");
        assert_eq!(err.kind, ErrorKind::System);
        assert!(err.message.contains("pre-release"));
    }

    #[test]
    fn test_missing_binary_message_names_path() {
        let err = CompileError::missing_binary(Path::new("/opt/solc/solc"));
        assert_eq!(err.kind, ErrorKind::System);
        assert!(err.message.contains("/opt/solc/solc"));
        assert!(err.message.contains("compiler path"));
    }
}
