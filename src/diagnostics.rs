//! Diagnostic types and analyzer-output parsing.
//!
//! The analyzer emits a JSON payload of the form:
//!
//! ```text
//! { "diagnostics": [
//!     { "location": { "file": "lib/a.dart", "range": { "start": { "line": 5, "column": 3 } } },
//!       "severity": "ERROR", "problemMessage": "..." }, ... ] }
//! ```
//!
//! By convention the payload arrives on stderr when issues exist; stdout is
//! tried as a fallback. Decoding failure is an ordinary value
//! ([`DecodeResult::Malformed`]), never a fault - malformed output from the
//! analyzer must not take down the watch loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Severity levels for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl Severity {
    /// Parse an analyzer severity string.
    ///
    /// The analyzer emits uppercase (`"ERROR"`); matching is
    /// case-insensitive. Unknown strings degrade to [`Severity::Info`]
    /// rather than dropping the diagnostic.
    pub fn parse_lenient(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Severity::Error,
            "warning" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

/// A single reported issue at a file location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    /// 1-based line number.
    pub line: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
    pub severity: Severity,
    pub message: String,
}

/// Captured result of one analyzer invocation: streams and exit code,
/// verbatim. Discarded after reporting.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Deserialize)]
struct WirePayload {
    diagnostics: Vec<WireDiagnostic>,
}

#[derive(Deserialize)]
struct WireDiagnostic {
    location: WireLocation,
    #[serde(default)]
    severity: Option<String>,
    #[serde(rename = "problemMessage", default)]
    problem_message: Option<String>,
}

#[derive(Deserialize)]
struct WireLocation {
    file: String,
    range: WireRange,
}

#[derive(Deserialize)]
struct WireRange {
    start: WirePosition,
}

#[derive(Deserialize)]
struct WirePosition {
    line: u64,
    #[serde(default)]
    column: Option<u64>,
}

impl From<WireDiagnostic> for Diagnostic {
    fn from(wire: WireDiagnostic) -> Self {
        let start = wire.location.range.start;
        Diagnostic {
            file: wire.location.file,
            // Line numbers are 1-based; clamp defensive zeroes.
            line: start.line.max(1),
            column: start.column,
            severity: wire
                .severity
                .as_deref()
                .map(Severity::parse_lenient)
                .unwrap_or(Severity::Info),
            message: wire.problem_message.unwrap_or_default(),
        }
    }
}

/// Outcome of attempting to decode one output stream.
#[derive(Debug)]
pub enum DecodeResult {
    /// The stream held a well-formed diagnostics payload (possibly with an
    /// empty list).
    Ok(Vec<Diagnostic>),
    /// The stream was not a diagnostics payload: invalid JSON, or valid
    /// JSON without a `diagnostics` array.
    Malformed,
}

/// Decode one output stream as a diagnostics payload.
pub fn decode_stream(bytes: &[u8]) -> DecodeResult {
    match serde_json::from_slice::<WirePayload>(bytes) {
        Ok(payload) => DecodeResult::Ok(payload.diagnostics.into_iter().map(Into::into).collect()),
        Err(_) => DecodeResult::Malformed,
    }
}

/// Parse a completed analysis run into diagnostics.
///
/// stderr is tried first (the analyzer's convention when issues exist),
/// then stdout. If neither stream decodes, the returned flag is `true`
/// when the exit code is non-zero (unparseable failure) and `false` when
/// it is zero (the expected empty-success case).
pub fn parse(run: &AnalysisRun) -> (Vec<Diagnostic>, bool) {
    if let DecodeResult::Ok(diags) = decode_stream(&run.stderr) {
        return (diags, false);
    }
    if let DecodeResult::Ok(diags) = decode_stream(&run.stdout) {
        return (diags, false);
    }
    (Vec::new(), run.exit_code != 0)
}

/// Classified result of one analysis cycle, ready for reporting.
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// The analyzer ran and reported no issues.
    Clean,
    /// The analyzer reported one or more diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The analyzer exited non-zero and neither stream was decodable.
    ParseFailed { exit_code: i32, stderr: String },
    /// The analyzer binary could not be launched.
    SpawnFailed(String),
    /// The analyzer exceeded its time budget and was killed.
    TimedOut { limit: Duration },
}

impl AnalysisOutcome {
    /// Whether this outcome means the analyzer itself failed to run.
    /// Diagnostics and parse failures are not run failures.
    pub fn is_run_failure(&self) -> bool {
        matches!(
            self,
            AnalysisOutcome::SpawnFailed(_) | AnalysisOutcome::TimedOut { .. }
        )
    }
}

/// Classify a completed run for the reporter.
pub fn classify(run: &AnalysisRun) -> AnalysisOutcome {
    let (diagnostics, parse_failed) = parse(run);
    if parse_failed {
        AnalysisOutcome::ParseFailed {
            exit_code: run.exit_code,
            stderr: String::from_utf8_lossy(&run.stderr).into_owned(),
        }
    } else if diagnostics.is_empty() {
        AnalysisOutcome::Clean
    } else {
        AnalysisOutcome::Diagnostics(diagnostics)
    }
}
