//! Runs `.test.md` fixtures: TOML frontmatter between `---` lines holding the
//! expectations, followed by the Markdown content under test.

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use sections::parser::Parser;
use sections::validate::validate;
use sections::{ComponentType, Format, Outline};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedMessage {
    /// Substring that must appear in the message.
    pub contains: String,

    /// If set, the message's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Section ids, in order.
    #[serde(default)]
    pub expect_sections: Option<Vec<String>>,

    /// Section id → component ids, in order.
    #[serde(default)]
    pub expect_components: BTreeMap<String, Vec<String>>,

    /// Section id → component types, in order.
    #[serde(default)]
    pub expect_types: BTreeMap<String, Vec<ComponentType>>,

    /// If true, the test expects loading to fail.
    #[serde(default)]
    pub expect_parse_error: bool,

    /// Expected load warnings. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedMessage>>,

    /// Expected validation issues, errors and warnings alike, in outline order.
    #[serde(default)]
    pub expect_issues: Option<Vec<ExpectedMessage>>,
}

/// Split a `.test.md` file into its TOML config and Markdown body.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e.message().trim()))?;

    Ok((config, body))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description
            .as_deref()
            .or_else(|| self.path.file_stem().and_then(|s| s.to_str()))
            .unwrap_or("?")
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match std::fs::read_to_string(path) {
        Ok(content) => match parse_test_file(&content) {
            Ok((config, body)) => (config.description.clone(), check_fixture(&config, body)),
            Err(e) => (None, Err(format!("frontmatter error: {}", e))),
        },
        Err(e) => (None, Err(format!("cannot read file: {}", e))),
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Ok(()) => TestOutcome::Pass,
            Err(reason) => TestOutcome::Fail(reason),
        },
    }
}

/// Load the fixture body and compare against every expectation that is set.
fn check_fixture(config: &TestConfig, body: &str) -> Result<(), String> {
    let parse_result = Parser::new(body.to_string(), 0, Format::Markdown).parse();

    if config.expect_parse_error {
        return match parse_result {
            Err(_) => Ok(()),
            Ok(_) => Err("expected parse error, but parsing succeeded".into()),
        };
    }

    let (outline, warnings) = parse_result.map_err(|errs| {
        let msgs: Vec<String> = errs.iter().map(|e| e.message.clone()).collect();
        format!("unexpected parse error: {}", msgs.join("; "))
    })?;

    if let Some(expected) = &config.expect_sections {
        let actual: Vec<&str> = outline.iter().map(|s| s.id.as_str()).collect();
        if actual != *expected {
            return Err(format!(
                "section mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, actual
            ));
        }
    }

    for (section_id, expected) in &config.expect_components {
        let actual: Vec<&str> = find_section(&outline, section_id)?
            .components
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        if actual != *expected {
            return Err(format!(
                "component mismatch in '{}'\n  expected: {:?}\n  actual:   {:?}",
                section_id, expected, actual
            ));
        }
    }

    for (section_id, expected) in &config.expect_types {
        let actual: Vec<ComponentType> = find_section(&outline, section_id)?
            .components
            .iter()
            .map(|c| c.component_type())
            .collect();
        if actual != *expected {
            return Err(format!(
                "type mismatch in '{}'\n  expected: {:?}\n  actual:   {:?}",
                section_id, expected, actual
            ));
        }
    }

    if let Some(expected) = &config.expect_warnings {
        let actual: Vec<(String, Option<Range<usize>>)> = warnings
            .iter()
            .map(|w| (w.message.clone(), Some(w.span.clone())))
            .collect();
        check_messages("warning", body, &actual, expected)?;
    }

    if let Some(expected) = &config.expect_issues {
        let actual: Vec<(String, Option<Range<usize>>)> = validate(&outline)
            .iter()
            .map(|issue| (issue.to_string(), outline.spans.get(issue.location)))
            .collect();
        check_messages("issue", body, &actual, expected)?;
    }

    Ok(())
}

fn find_section<'a>(outline: &'a Outline, id: &str) -> Result<&'a sections::Section, String> {
    outline
        .section(id)
        .ok_or_else(|| format!("no section with id '{}'", id))
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual messages match expectations, in order.
fn check_messages(
    what: &str,
    source: &str,
    actual: &[(String, Option<Range<usize>>)],
    expected: &[ExpectedMessage],
) -> Result<(), String> {
    if actual.len() != expected.len() {
        let listed: Vec<String> = actual.iter().map(|(m, _)| format!("    - {}", m)).collect();
        return Err(format!(
            "expected {} {}(s), got {}\n  actual:\n{}",
            expected.len(),
            what,
            actual.len(),
            if listed.is_empty() {
                "    (none)".to_string()
            } else {
                listed.join("\n")
            }
        ));
    }

    for (i, ((message, span), expected)) in actual.iter().zip(expected).enumerate() {
        if !message.contains(&expected.contains) {
            return Err(format!(
                "{}[{}]: expected message containing \"{}\", got: {}",
                what, i, expected.contains, message
            ));
        }

        if let Some(expected_line) = expected.line {
            let Some(span) = span else {
                return Err(format!(
                    "{}[{}]: expected on line {}, but it has no span",
                    what, i, expected_line
                ));
            };
            let actual_line = byte_offset_to_line(source, span.start);
            if actual_line != expected_line {
                return Err(format!(
                    "{}[{}]: expected on line {}, but span is on line {}",
                    what, i, expected_line, actual_line
                ));
            }
        }
    }

    Ok(())
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".test.md"))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// Keep `category` if any requested name equals it or is one of its parents.
fn select_categories(
    all: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return all;
    }

    for req in requested {
        let req = req.trim_matches('/');
        if !all.keys().any(|cat| is_within(cat, req)) {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    all.into_iter()
        .filter(|(cat, _)| requested.iter().any(|req| is_within(cat, req.trim_matches('/'))))
        .collect()
}

fn is_within(category: &str, requested: &str) -> bool {
    category == requested || category.starts_with(&format!("{}/", requested))
}

struct Palette {
    no_color: bool,
}

impl Palette {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }

    fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let palette = Palette { no_color };

    // A single file is run as the only member of the root category.
    let selected = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
            return 1;
        }
        select_categories(all, categories)
    };

    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let show_headers = !path.is_file();
    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        if show_headers {
            eprintln!();
            eprintln!("{}", palette.bold(category_label(category)));
        }

        for file in files {
            let result = run_single_test(file);
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", palette.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", palette.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!("test result: {}. {} passed, 0 failed", palette.paint("32", "ok"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            palette.paint("31", "FAILED"),
            passed,
            failed,
            passed + failed
        );
        1
    }
}
