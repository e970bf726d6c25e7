use pretty_assertions::assert_eq;
use regex::Regex;
use std::fs;
use std::path::Path;
use test_generator::test_resources;
use treelox::lox::{config::Config, Lox};

/// Runs a script and checks it against its `// expect: ` and `// error: ` annotations. Every
/// printed line and every reported error has to be annotated, in order.
#[test_resources("tests/scripts/*.lox")]
fn run_lox_script(test_path: &str) {
    let source = fs::read_to_string(Path::new(test_path)).expect("Failed to read test script");
    let (expected_output, expected_errors) = parse_expectations(&source);

    let mut lox = Lox::new(Config::default(), Vec::new());
    let diagnostics = lox.run(&source);
    let stdout = String::from_utf8(lox.into_output()).expect("Output was not UTF-8");

    let output: Vec<&str> = stdout.lines().collect();
    let errors: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();

    assert_eq!(output, expected_output, "stdout of {test_path}");
    assert_eq!(errors, expected_errors, "errors of {test_path}");
}

fn parse_expectations(source: &str) -> (Vec<&str>, Vec<String>) {
    let expect_regex = Regex::new(r"// expect: (.*)$").unwrap();
    let error_regex = Regex::new(r"// error: (.*)$").unwrap();

    let mut expected_output = Vec::new();
    let mut expected_errors = Vec::new();
    for line in source.lines() {
        if let Some(captures) = expect_regex.captures(line) {
            expected_output.push(captures.get(1).map_or("", |m| m.as_str()));
        }
        if let Some(captures) = error_regex.captures(line) {
            expected_errors.push(captures[1].to_string());
        }
    }
    (expected_output, expected_errors)
}
