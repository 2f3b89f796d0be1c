//! Analyzer subprocess invocation.
//!
//! One child process per call, no retry: a spawn failure means the analyzer
//! binary is missing or unusable and is surfaced as an error value. An
//! optional timeout budget kills runs that hang.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::diagnostics::AnalysisRun;

/// How often to poll the child for exit when a timeout budget is set.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Errors launching or supervising the analyzer subprocess.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("failed to launch {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("analyzer exceeded {limit:?} and was killed")]
    Timeout { limit: Duration },
    #[error("i/o error while supervising analyzer: {0}")]
    Io(#[from] std::io::Error),
}

/// Builder for one analyzer invocation.
///
/// Defaults to `dart analyze --format=json <target>`.
#[derive(Debug, Clone)]
pub struct AnalyzerCommand {
    program: String,
    args: Vec<String>,
    target: PathBuf,
    timeout: Option<Duration>,
}

impl AnalyzerCommand {
    /// Create a command for the default analyzer against `target`.
    pub fn new<P: AsRef<Path>>(target: P) -> Self {
        Self {
            program: "dart".to_string(),
            args: vec!["analyze".to_string(), "--format=json".to_string()],
            target: target.as_ref().to_path_buf(),
            timeout: None,
        }
    }

    /// Override the analyzer binary path.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Replace the fixed argument set (the target path is still appended).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill runs that exceed this budget. `None` means unlimited.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the analyzer binary can be executed at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    /// Run the analyzer once and capture both streams and the exit code
    /// verbatim. Blocks until the child exits (or the timeout budget runs
    /// out, in which case the child is killed).
    pub fn run(&self) -> Result<AnalysisRun, AnalyzerError> {
        match self.timeout {
            None => self.run_unbounded(),
            Some(limit) => self.run_with_deadline(limit),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(&self.target);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> AnalyzerError {
        AnalyzerError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    fn run_unbounded(&self) -> Result<AnalysisRun, AnalyzerError> {
        let output = self
            .command()
            .output()
            .map_err(|e| self.spawn_error(e))?;

        Ok(AnalysisRun {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn run_with_deadline(&self, limit: Duration) -> Result<AnalysisRun, AnalyzerError> {
        let mut child = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Drain both pipes on their own threads so a chatty child can't
        // deadlock against a full pipe buffer while we poll for exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + limit;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                child.kill()?;
                child.wait()?;
                return Err(AnalyzerError::Timeout { limit });
            }
            thread::sleep(POLL_INTERVAL);
        };

        Ok(AnalysisRun {
            exit_code: status.code().unwrap_or(-1),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }
}

/// Read a child stream to the end on a background thread.
fn drain<R: Read + Send + 'static>(stream: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf);
        }
        buf
    })
}
