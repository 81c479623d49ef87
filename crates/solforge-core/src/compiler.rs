//! Compilation orchestration.
//!
//! Composes the pipeline: resolve the import closure, invoke the
//! external compiler, classify on failure, parse on success. One
//! [`Compiler`] serves any number of overlapping requests; each call
//! spawns its own child process and shares no mutable state.

use std::path::Path;

use crate::classify::{self, CompileError};
use crate::config::{BuildMode, CompilerConfig, StderrPolicy};
use crate::error::{Error, Result};
use crate::invoke::{Invocation, SolcRunner};
use crate::output::{self, CompilationResult, SyntaxTree};
use crate::resolve::{DiskReader, ImportResolver};

/// Artifact kinds requested from a build.
const BUILD_ARTIFACTS: &str = "bin,abi,ast";

/// Artifact kinds requested from a debug build.
const DEBUG_ARTIFACTS: &str = "bin,abi,ast,srcmap,srcmap-runtime";

/// Artifact kind requested when only the syntax tree is wanted.
const AST_ARTIFACTS: &str = "ast";

/// Orchestrates dependency resolution, invocation and output
/// parsing for one configured compiler binary.
pub struct Compiler {
    config: CompilerConfig,
    runner: SolcRunner,
}

impl Compiler {
    /// Create a compiler from an explicit configuration.
    pub fn new(config: CompilerConfig) -> Self {
        let runner = SolcRunner::new(&config.solc_path);
        Self { config, runner }
    }

    /// The active configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `entries` and everything they transitively import
    /// under `root`.
    ///
    /// Resolution failures abort before any process is spawned.
    /// Under [`StderrPolicy::Warn`], stderr text alongside a zero
    /// exit is attached to the result as a non-fatal warning; under
    /// [`StderrPolicy::Fail`] it fails the compilation.
    pub async fn compile(
        &self,
        entries: &[String],
        root: &Path,
        mode: BuildMode,
    ) -> Result<CompilationResult> {
        let reader = DiskReader::new(root);
        let sources = ImportResolver::new(&reader).resolve(entries)?;
        tracing::debug!("resolved import closure of {} files", sources.len());

        let invocation = build_invocation(sources, root, mode);
        let output = self.runner.run(&invocation).await?;

        if !output.success() {
            return Err(Error::Compile(classify::classify_failure(&output)));
        }

        let mut warnings = None;
        if !output.stderr.is_empty() {
            match self.config.stderr_policy {
                StderrPolicy::Fail => {
                    return Err(Error::Compile(classify::classify_stderr_warning(
                        &output.stderr,
                    )));
                }
                StderrPolicy::Warn => {
                    tracing::warn!(
                        "compiler stderr on successful exit: {}",
                        output.stderr.trim_end()
                    );
                    warnings = Some(output.stderr.clone());
                }
            }
        }

        let document = output::decode_document(&output.stdout, self.config.protocol)?;
        let contracts = output::parse_contracts(document, root, self.config.filter_abstract)?;
        Ok(CompilationResult {
            contracts,
            warnings,
        })
    }

    /// Parse a single in-memory source body into its syntax tree.
    ///
    /// Uses the stream convention directly; no dependency resolution
    /// and no project root involved.
    pub async fn ast(&self, source: &str) -> Result<SyntaxTree> {
        let args = vec!["--combined-json".to_string(), AST_ARTIFACTS.to_string()];
        let output = self.runner.run(&Invocation::stream(args, source)).await?;

        // In stream mode the compiler reports source problems on
        // stderr without a location prefix.
        if !output.stderr.is_empty() {
            return Err(Error::Compile(CompileError::syntax(
                output.stderr.clone(),
                None,
            )));
        }
        if !output.success() {
            return Err(Error::Compile(classify::classify_failure(&output)));
        }

        let document = output::decode_document(&output.stdout, self.config.protocol)?;
        let ast = document
            .stdin_ast()
            .ok_or_else(|| Error::OutputParse("missing <stdin> syntax tree".to_string()))?;
        Ok(SyntaxTree::from_value(ast))
    }
}

/// Assemble the argument-file invocation for a resolved source set.
fn build_invocation(sources: Vec<String>, root: &Path, mode: BuildMode) -> Invocation {
    let mut args = sources;
    match mode {
        BuildMode::Optimized => {
            args.push("--optimize".to_string());
            args.push("--combined-json".to_string());
            args.push(BUILD_ARTIFACTS.to_string());
        }
        BuildMode::Debug => {
            args.push("--combined-json".to_string());
            args.push(DEBUG_ARTIFACTS.to_string());
        }
    }
    Invocation::files(args, root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimized_invocation_args() {
        let invocation = build_invocation(
            vec!["a.sol".to_string(), "b.sol".to_string()],
            Path::new("/project"),
            BuildMode::Optimized,
        );

        assert_eq!(
            invocation.args,
            vec!["a.sol", "b.sol", "--optimize", "--combined-json", "bin,abi,ast"]
        );
        assert_eq!(invocation.cwd.as_deref(), Some(Path::new("/project")));
        assert!(invocation.stdin.is_none());
    }

    #[test]
    fn test_debug_invocation_requests_source_maps() {
        let invocation =
            build_invocation(vec!["a.sol".to_string()], Path::new("/project"), BuildMode::Debug);

        assert!(!invocation.args.contains(&"--optimize".to_string()));
        assert!(
            invocation
                .args
                .contains(&"bin,abi,ast,srcmap,srcmap-runtime".to_string())
        );
    }
}
