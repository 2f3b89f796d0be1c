//! Integration tests for the two-stream diagnostics parser.
//!
//! These pin down the fallback chain: stderr first, then stdout, then the
//! exit-code heuristic for runs where neither stream is decodable.

use dartwatch::diagnostics::{classify, parse, AnalysisOutcome, AnalysisRun, Severity};
use dartwatch::report::Reporter;

fn run(exit_code: i32, stdout: &str, stderr: &str) -> AnalysisRun {
    AnalysisRun {
        exit_code,
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

fn payload(entries: &[(&str, u64, &str, &str)]) -> String {
    let diags: Vec<String> = entries
        .iter()
        .map(|(file, line, severity, message)| {
            format!(
                r#"{{"location":{{"file":"{}","range":{{"start":{{"line":{}}}}}}},"severity":"{}","problemMessage":"{}"}}"#,
                file, line, severity, message
            )
        })
        .collect();
    format!(r#"{{"diagnostics":[{}]}}"#, diags.join(","))
}

#[test]
fn clean_run_yields_no_diagnostics_and_no_failure() {
    let (diags, parse_failed) = parse(&run(0, "", ""));
    assert!(diags.is_empty());
    assert!(!parse_failed);
}

#[test]
fn stderr_payload_wins_regardless_of_stdout() {
    let stderr = payload(&[
        ("lib/a.dart", 3, "ERROR", "first"),
        ("lib/b.dart", 9, "WARNING", "second"),
        ("lib/c.dart", 12, "INFO", "third"),
    ]);

    let decoy = payload(&[("x.dart", 1, "ERROR", "decoy")]);
    for stdout in ["", "random logging", decoy.as_str()] {
        let (diags, parse_failed) = parse(&run(1, stdout, &stderr));
        assert!(!parse_failed);
        assert_eq!(diags.len(), 3);
        // Order preserved
        assert_eq!(diags[0].message, "first");
        assert_eq!(diags[1].message, "second");
        assert_eq!(diags[2].message, "third");
        assert_eq!(diags[1].severity, Severity::Warning);
    }
}

#[test]
fn undecodable_stderr_falls_back_to_stdout() {
    let stdout = payload(&[("lib/a.dart", 7, "WARNING", "from stdout")]);
    let (diags, parse_failed) = parse(&run(1, &stdout, "warning: something human-readable"));
    assert!(!parse_failed);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].file, "lib/a.dart");
    assert_eq!(diags[0].line, 7);
}

#[test]
fn json_without_diagnostics_key_falls_through() {
    // Decodable JSON without a diagnostics array counts as not decodable
    let stdout = payload(&[("lib/a.dart", 2, "INFO", "real")]);
    let (diags, parse_failed) = parse(&run(1, &stdout, r#"{"version":"3.4.0"}"#));
    assert!(!parse_failed);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].message, "real");
}

#[test]
fn both_streams_undecodable_nonzero_exit_is_parse_failure() {
    let (diags, parse_failed) = parse(&run(2, "not json", "also not json"));
    assert!(diags.is_empty());
    assert!(parse_failed);
}

#[test]
fn both_streams_undecodable_zero_exit_is_empty_success() {
    let (diags, parse_failed) = parse(&run(0, "analyzed 14 files, no output", ""));
    assert!(diags.is_empty());
    assert!(!parse_failed);
}

#[test]
fn decodable_empty_list_is_success_not_fallthrough() {
    // exit code non-zero, but stderr decodes to an empty list: that is a
    // zero-diagnostics success, not a parse failure
    let (diags, parse_failed) = parse(&run(1, "garbage", r#"{"diagnostics":[]}"#));
    assert!(diags.is_empty());
    assert!(!parse_failed);
}

/// Reporter that records every outcome it receives.
#[derive(Default)]
struct RecordingReporter {
    reports: Vec<String>,
    diagnostics: Vec<dartwatch::Diagnostic>,
}

impl Reporter for RecordingReporter {
    fn report(&mut self, outcome: &AnalysisOutcome) {
        match outcome {
            AnalysisOutcome::Clean => self.reports.push("clean".to_string()),
            AnalysisOutcome::Diagnostics(diags) => {
                self.reports.push("diagnostics".to_string());
                self.diagnostics.extend(diags.iter().cloned());
            }
            AnalysisOutcome::ParseFailed { .. } => self.reports.push("parse_failed".to_string()),
            AnalysisOutcome::SpawnFailed(_) => self.reports.push("spawn_failed".to_string()),
            AnalysisOutcome::TimedOut { .. } => self.reports.push("timed_out".to_string()),
        }
    }
}

#[test]
fn end_to_end_one_diagnostic_reaches_the_reporter() {
    let stderr = r#"{"diagnostics":[{"location":{"file":"a.x","range":{"start":{"line":5}}},"severity":"ERROR","problemMessage":"bad thing"}]}"#;
    let run = run(1, "", stderr);

    let mut reporter = RecordingReporter::default();
    reporter.report(&classify(&run));

    // Exactly one report, exactly one diagnostic
    assert_eq!(reporter.reports, vec!["diagnostics"]);
    assert_eq!(reporter.diagnostics.len(), 1);

    let d = &reporter.diagnostics[0];
    assert_eq!(d.file, "a.x");
    assert_eq!(d.line, 5);
    assert_eq!(d.severity, Severity::Error);
    assert_eq!(d.message, "bad thing");
}

#[test]
fn classified_failures_carry_stderr_context() {
    let r = run(64, "", "Could not resolve package config");
    match classify(&r) {
        AnalysisOutcome::ParseFailed { exit_code, stderr } => {
            assert_eq!(exit_code, 64);
            assert!(stderr.contains("package config"));
        }
        other => panic!("expected parse failure, got {:?}", other),
    }
}
