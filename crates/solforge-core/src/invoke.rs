//! External compiler process invocation.
//!
//! Spawns one child per call and collects both output streams to
//! end-of-stream before reporting. No process reuse, no pooling, and
//! no timeout: a hung compiler blocks its invocation until the host
//! gives up on the future.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::classify::CompileError;
use crate::error::{Error, Result};

/// A single compiler invocation.
///
/// Built by the orchestrator and consumed by [`SolcRunner`]; the
/// presence of a stdin payload selects the calling convention.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Arguments passed to the compiler binary.
    pub args: Vec<String>,

    /// Working directory for the child process.
    pub cwd: Option<PathBuf>,

    /// Payload written to the child's stdin before closing it.
    pub stdin: Option<String>,
}

impl Invocation {
    /// Argument-file convention: sources as positional arguments,
    /// run from the project root.
    pub fn files(args: Vec<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            args,
            cwd: Some(root.into()),
            stdin: None,
        }
    }

    /// Stream convention: a single in-memory body delivered on
    /// stdin.
    pub fn stream(args: Vec<String>, input: impl Into<String>) -> Self {
        Self {
            args,
            cwd: None,
            stdin: Some(input.into()),
        }
    }
}

/// Collected output of a finished invocation.
///
/// Both streams have reached end-of-stream by the time a value of
/// this type exists.
#[derive(Debug, Clone)]
pub struct RawOutput {
    /// Everything the child wrote to stdout.
    pub stdout: String,

    /// Everything the child wrote to stderr.
    pub stderr: String,

    /// Exit code; `None` when the process was terminated by a
    /// signal.
    pub code: Option<i32>,
}

impl RawOutput {
    /// True when the process exited zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs the external compiler.
#[derive(Debug, Clone)]
pub struct SolcRunner {
    binary: PathBuf,
}

impl SolcRunner {
    /// Create a runner for the given binary path.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// The configured binary path.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run one invocation to completion.
    ///
    /// A spawn failure (binary missing or not executable) is
    /// reported as a system error; a child that started but exited
    /// non-zero is reported through [`RawOutput::code`] so the
    /// caller can classify its stderr.
    pub async fn run(&self, invocation: &Invocation) -> Result<RawOutput> {
        match &invocation.stdin {
            Some(input) => self.run_streaming(&invocation.args, input).await,
            None => self.run_files(invocation).await,
        }
    }

    /// Argument-file convention: both streams captured to
    /// completion, stdin closed from the start.
    async fn run_files(&self, invocation: &Invocation) -> Result<RawOutput> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }

        let output = cmd.output().await.map_err(|err| self.spawn_error(err))?;
        Ok(RawOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        })
    }

    /// Stream convention: write the body to stdin, close it, and
    /// read both output streams to end-of-stream.
    ///
    /// Completion is a two-way join on stream close, not on exit
    /// timing: the compiler may stop consuming stdin well before it
    /// finishes writing output, and may close one output stream long
    /// before the other. The writer and both readers run
    /// concurrently and the result exists only once every one of
    /// them is done.
    async fn run_streaming(&self, args: &[String], input: &str) -> Result<RawOutput> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| self.spawn_error(err))?;

        let Some(mut stdin) = child.stdin.take() else {
            return Err(stream_error("stdin not captured"));
        };
        let Some(mut stdout) = child.stdout.take() else {
            return Err(stream_error("stdout not captured"));
        };
        let Some(mut stderr) = child.stderr.take() else {
            return Err(stream_error("stderr not captured"));
        };

        let mut out_buf = String::new();
        let mut err_buf = String::new();
        let (write_done, out_done, err_done) = tokio::join!(
            async move {
                let result = stdin.write_all(input.as_bytes()).await;
                // stdin drops here, closing the child's input stream.
                result
            },
            stdout.read_to_string(&mut out_buf),
            stderr.read_to_string(&mut err_buf),
        );

        // A child that stops reading its input early is normal; the
        // diagnostic for that case arrives on stderr.
        if let Err(err) = write_done {
            if err.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(stream_error(&format!("failed to write input: {err}")));
            }
        }
        out_done.map_err(|err| stream_error(&format!("failed to read stdout: {err}")))?;
        err_done.map_err(|err| stream_error(&format!("failed to read stderr: {err}")))?;

        let status = child
            .wait()
            .await
            .map_err(|err| stream_error(&format!("failed to reap child: {err}")))?;

        Ok(RawOutput {
            stdout: out_buf,
            stderr: err_buf,
            code: status.code(),
        })
    }

    fn spawn_error(&self, err: std::io::Error) -> Error {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::Compile(CompileError::missing_binary(&self.binary))
        } else {
            Error::Compile(CompileError::system(format!(
                "failed to start {}: {err}",
                self.binary.display()
            )))
        }
    }
}

fn stream_error(message: &str) -> Error {
    Error::Compile(CompileError::system(message.to_string()))
}
