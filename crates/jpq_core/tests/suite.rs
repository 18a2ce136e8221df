//! JSON-driven scenario suite
//!
//! Runs the query scenarios from `tests/suite/scenarios.json` at the
//! workspace root: literal documents, queries, and expected match lists,
//! plus invalid expressions pinned to their error codes.

#![allow(clippy::expect_used)]

use jpq_core::{ErrorKind, compile, query};
use serde::Deserialize;
use serde_json::Value;
use std::fs;

/// A single scenario
#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    query: String,
    #[serde(default)]
    document: Value,
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    invalid_query: bool,
    #[serde(default)]
    error_kind: Option<String>,
}

/// The scenario file structure
#[derive(Debug, Deserialize)]
struct Suite {
    cases: Vec<Case>,
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::UnterminatedString => "unterminated_string",
        ErrorKind::BadEscape => "bad_escape",
        ErrorKind::BadNumber => "bad_number",
        ErrorKind::UnexpectedChar => "unexpected_char",
        ErrorKind::ParseError => "parse_error",
        ErrorKind::Overlong => "overlong",
    }
}

/// Run a single scenario and return a failure description, if any
fn run_case(case: &Case) -> Option<String> {
    if case.invalid_query {
        return match compile(&case.query) {
            Ok(_) => Some("expected a compile error but compilation succeeded".to_string()),
            Err(e) => {
                if let Some(ref expected) = case.error_kind {
                    if kind_name(e.kind()) != expected {
                        return Some(format!(
                            "error kind mismatch: got {}, expected {}",
                            kind_name(e.kind()),
                            expected
                        ));
                    }
                }
                None
            }
        };
    }

    match query(&case.query, &case.document) {
        Ok(results) => {
            let expected = case.result.clone().unwrap_or_default();
            if results == expected {
                None
            } else {
                Some(format!(
                    "result mismatch:\n  got:      {results:?}\n  expected: {expected:?}"
                ))
            }
        }
        Err(e) => Some(format!("unexpected compile error: {e}")),
    }
}

#[test]
fn run_scenario_suite() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/suite/scenarios.json");
    let content =
        fs::read_to_string(path).expect("failed to read scenario file; run from the workspace");

    let suite: Suite = serde_json::from_str(&content).expect("failed to parse scenario JSON");

    let mut failures: Vec<(String, String)> = vec![];

    for case in &suite.cases {
        if let Some(reason) = run_case(case) {
            failures.push((case.name.clone(), reason));
        }
    }

    if !failures.is_empty() {
        println!("{} of {} scenarios failed:", failures.len(), suite.cases.len());
        for (name, reason) in &failures {
            println!("\n[FAIL] {name}");
            println!("  {reason}");
        }
    }

    assert!(
        failures.is_empty(),
        "{} of {} scenarios failed",
        failures.len(),
        suite.cases.len()
    );
}

#[test]
fn scenario_file_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/suite/scenarios.json");
    let content = fs::read_to_string(path).expect("failed to read scenario file");

    let suite: Suite = serde_json::from_str(&content).expect("failed to parse scenario JSON");

    assert!(!suite.cases.is_empty(), "suite should have scenarios");
    println!("suite contains {} scenarios", suite.cases.len());
}
