//! Error types for solforge-core.

use thiserror::Error;

use crate::classify::CompileError;

/// Result type for solforge-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in solforge-core.
#[derive(Debug, Error)]
pub enum Error {
    /// A source file could not be read during import resolution.
    ///
    /// Resolution aborts on the first unreadable file; the compiler
    /// is never invoked with an incomplete file set.
    #[error("failed to read source file {path}: {source}")]
    SourceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiler could not run or rejected the input.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Compiler stdout was not a valid combined-output document.
    #[error("could not parse compiler output: {0}")]
    OutputParse(String),

    /// An embedded interface descriptor was malformed.
    #[error("could not parse contract abi: {0}")]
    AbiParse(String),
}
