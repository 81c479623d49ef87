//! Core engine for driving an external Solidity compiler.
//!
//! This crate provides:
//! - Transitive import resolution over a project file tree
//! - External `solc` process invocation (argument-file and stdin
//!   stream conventions)
//! - Classification of failed invocations into a
//!   system/syntax/unknown taxonomy
//! - Combined-output parsing into per-contract artifacts

pub mod classify;
pub mod compiler;
pub mod config;
pub mod error;
pub mod invoke;
pub mod output;
pub mod resolve;

pub use classify::{CompileError, ErrorKind, SourceLocation};
pub use compiler::Compiler;
pub use config::{BuildMode, CompilerConfig, OutputProtocol, StderrPolicy};
pub use error::{Error, Result};
pub use invoke::{Invocation, RawOutput, SolcRunner};
pub use output::{AstNode, CompilationResult, Contract, SourceMap, SyntaxTree};
pub use resolve::{DiskReader, ImportResolver, SourceReader};
