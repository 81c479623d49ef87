//! Compiler configuration.
//!
//! The external compiler is an unversioned, shell-like tool whose
//! calling convention and output framing change across releases.
//! Everything that varies by installed version is explicit
//! configuration here; nothing is inferred from output content.

use std::path::PathBuf;

/// Artifact set requested from a build.
///
/// Optimization and source-map generation are mutually exclusive
/// flag sets on the compiler command line, so the choice is an enum
/// rather than independent booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Optimized bytecode, no debug maps.
    #[default]
    Optimized,

    /// Unoptimized bytecode with deployment and runtime source maps.
    Debug,
}

/// Output framing convention of the installed compiler version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputProtocol {
    /// Stdout is the combined JSON document itself.
    #[default]
    CombinedJson,

    /// The JSON payload is bracketed by `=======` banner lines, as
    /// older releases emit in stream mode.
    Delimited,
}

/// Treatment of stderr text produced alongside a zero exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StderrPolicy {
    /// Attach the text to the successful result as a non-fatal
    /// warning.
    #[default]
    Warn,

    /// Fail the compilation with a system error carrying the text
    /// verbatim.
    Fail,
}

/// Configuration for driving the external compiler.
///
/// Hosts construct one of these from their settings store and pass
/// it into [`crate::Compiler::new`]; the core never reads global
/// state.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Path to the compiler binary.
    pub solc_path: PathBuf,

    /// Output framing convention of the installed version.
    pub protocol: OutputProtocol,

    /// Treatment of stderr text alongside a zero exit.
    pub stderr_policy: StderrPolicy,

    /// Drop abstract contracts by walking the legacy syntax tree.
    ///
    /// Only meaningful for compiler versions that emit the legacy
    /// `name`/`attributes`/`children` tree; off by default.
    pub filter_abstract: bool,
}

impl CompilerConfig {
    /// Create a configuration for an explicit binary path.
    pub fn new(solc_path: impl Into<PathBuf>) -> Self {
        Self {
            solc_path: solc_path.into(),
            protocol: OutputProtocol::default(),
            stderr_policy: StderrPolicy::default(),
            filter_abstract: false,
        }
    }

    /// Locate `solc` on PATH.
    ///
    /// Returns `None` when no binary is found; hosts that manage
    /// their own compiler installation should use [`Self::new`]
    /// instead.
    pub fn locate() -> Option<Self> {
        which::which("solc").ok().map(Self::new)
    }

    /// Select the output framing convention.
    pub fn with_protocol(mut self, protocol: OutputProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Select the zero-exit stderr treatment.
    pub fn with_stderr_policy(mut self, policy: StderrPolicy) -> Self {
        self.stderr_policy = policy;
        self
    }

    /// Enable the legacy abstract-contract filter.
    pub fn with_abstract_filter(mut self, enabled: bool) -> Self {
        self.filter_abstract = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let config = CompilerConfig::new("/usr/bin/solc");
        assert_eq!(config.protocol, OutputProtocol::CombinedJson);
        assert_eq!(config.stderr_policy, StderrPolicy::Warn);
        assert!(!config.filter_abstract);
    }

    #[test]
    fn test_builder_overrides() {
        let config = CompilerConfig::new("solc")
            .with_protocol(OutputProtocol::Delimited)
            .with_stderr_policy(StderrPolicy::Fail)
            .with_abstract_filter(true);

        assert_eq!(config.protocol, OutputProtocol::Delimited);
        assert_eq!(config.stderr_policy, StderrPolicy::Fail);
        assert!(config.filter_abstract);
    }

    #[test]
    fn test_locate_returns_solc_path_if_installed() {
        if let Some(config) = CompilerConfig::locate() {
            assert!(config.solc_path.ends_with("solc"));
        }
    }
}
