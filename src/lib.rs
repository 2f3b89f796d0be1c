//! Dartwatch - watch-mode wrapper for the Dart analyzer.
//!
//! Invokes `dart analyze --format=json`, parses the JSON diagnostics
//! payload, and prints formatted results to the terminal, optionally
//! re-running whenever a watched source file changes.
//!
//! # Architecture
//!
//! One analysis cycle flows through four small modules:
//!
//! - `process`: spawns the analyzer subprocess and captures its output
//! - `diagnostics`: decodes the JSON payload into normalized diagnostics
//! - `report`: formats the classified outcome (pretty or JSON)
//! - `watch`: debounced, single-flight re-analysis on file change
//!
//! Cycles are strictly serialized: at most one analyzer process runs at a
//! time, and change events arriving mid-cycle are coalesced into the next
//! cycle.

pub mod cli;
pub mod diagnostics;
pub mod process;
pub mod report;
pub mod watch;

pub use diagnostics::{
    classify, decode_stream, parse, AnalysisOutcome, AnalysisRun, DecodeResult, Diagnostic,
    Severity,
};
pub use process::{AnalyzerCommand, AnalyzerError};
pub use report::{JsonReport, JsonReporter, PrettyReporter, Reporter};
pub use watch::{WatchConfig, WatchLoop};
