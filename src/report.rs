//! Output formatting for analysis outcomes.
//!
//! Two formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//!
//! Every analysis cycle produces exactly one report - a success line, a
//! diagnostics list, or a failure message. Never silence.

use std::path::PathBuf;

use colored::*;
use serde::Serialize;

use crate::diagnostics::{AnalysisOutcome, Diagnostic, Severity};

/// Consumer of analysis outcomes. Called once per analysis cycle.
pub trait Reporter {
    /// Report the outcome of one completed cycle.
    fn report(&mut self, outcome: &AnalysisOutcome);

    /// Called when a watch-mode cycle is triggered, before the analyzer
    /// runs, with the coalesced change set. One-shot mode never calls this.
    fn cycle_start(&mut self, _changed: &[PathBuf]) {}
}

// =============================================================================
// Pretty format
// =============================================================================

/// Colored terminal reporter.
#[derive(Debug, Default)]
pub struct PrettyReporter;

impl PrettyReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for PrettyReporter {
    fn report(&mut self, outcome: &AnalysisOutcome) {
        match outcome {
            AnalysisOutcome::Clean => {
                println!("  {}", "✓ no issues found".green());
            }
            AnalysisOutcome::Diagnostics(diagnostics) => {
                write_diagnostics(diagnostics);
                write_summary(diagnostics);
            }
            AnalysisOutcome::ParseFailed { exit_code, stderr } => {
                println!(
                    "  {} (exit code {})",
                    "✗ analyzer output could not be parsed".red(),
                    exit_code
                );
                write_stderr_context(stderr);
            }
            AnalysisOutcome::SpawnFailed(reason) => {
                println!("  {} {}", "✗ analyzer failed to start:".red(), reason);
            }
            AnalysisOutcome::TimedOut { limit } => {
                println!(
                    "  {} {:?}",
                    "✗ analyzer killed after exceeding".red(),
                    limit
                );
            }
        }
        println!();
    }

    fn cycle_start(&mut self, changed: &[PathBuf]) {
        println!();
        let plural = if changed.len() != 1 { "s" } else { "" };
        println!(
            "  {}",
            format!("re-analyzing: {} file{} changed", changed.len(), plural).dimmed()
        );
        println!();
    }
}

/// Print the tool header (one-shot mode and watch-mode startup).
pub fn write_header(target: &str) {
    println!();
    print!("  ");
    print!("{}", "dartwatch".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("  {}", "Analyzing: ".dimmed());
    println!("{}", target);
    println!();
}

fn write_diagnostics(diagnostics: &[Diagnostic]) {
    println!("  {} ({}):", "Diagnostics".bold(), diagnostics.len());
    println!();

    for d in diagnostics {
        write_severity_tag(&d.severity);
        print!("   ");
        print!("{}", d.file.blue());
        print!("{}", format!(":{}", d.line).dimmed());
        if let Some(column) = d.column {
            print!("{}", format!(":{}", column).dimmed());
        }
        println!();
        println!("            {}", d.message);
        println!();
    }
}

fn write_severity_tag(severity: &Severity) {
    match severity {
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}

fn write_summary(diagnostics: &[Diagnostic]) {
    let errors = count(diagnostics, Severity::Error);
    let warnings = count(diagnostics, Severity::Warning);
    let infos = count(diagnostics, Severity::Info);

    print!("  ");
    if errors > 0 {
        print!("{}  ", format!("{} error(s)", errors).red());
    }
    if warnings > 0 {
        print!("{}  ", format!("{} warning(s)", warnings).yellow());
    }
    if infos > 0 {
        print!("{}  ", format!("{} info", infos).blue());
    }
    println!();
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

fn write_stderr_context(stderr: &str) {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("  {}", "analyzer stderr:".dimmed());
    for line in trimmed.lines() {
        println!("    {}", line.dimmed());
    }
}

// =============================================================================
// JSON format
// =============================================================================

/// JSON report structure, one document per cycle.
#[derive(Serialize)]
pub struct JsonReport {
    pub version: String,
    pub status: String,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JsonReport {
    /// Build a report document from an outcome.
    pub fn from_outcome(outcome: &AnalysisOutcome) -> Self {
        let mut report = JsonReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: String::new(),
            diagnostics: Vec::new(),
            exit_code: None,
            error: None,
        };

        match outcome {
            AnalysisOutcome::Clean => {
                report.status = "clean".to_string();
            }
            AnalysisOutcome::Diagnostics(diagnostics) => {
                report.status = "diagnostics".to_string();
                report.diagnostics = diagnostics.clone();
            }
            AnalysisOutcome::ParseFailed { exit_code, stderr } => {
                report.status = "parse_failed".to_string();
                report.exit_code = Some(*exit_code);
                report.error = Some(stderr.clone());
            }
            AnalysisOutcome::SpawnFailed(reason) => {
                report.status = "spawn_failed".to_string();
                report.error = Some(reason.clone());
            }
            AnalysisOutcome::TimedOut { limit } => {
                report.status = "timed_out".to_string();
                report.error = Some(format!("analyzer exceeded {:?}", limit));
            }
        }

        report
    }
}

/// Structured JSON reporter.
#[derive(Debug, Default)]
pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for JsonReporter {
    fn report(&mut self, outcome: &AnalysisOutcome) {
        let report = JsonReport::from_outcome(outcome);
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: failed to serialize report: {}", e),
        }
    }
}
