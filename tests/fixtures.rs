mod common;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use tagweave::Parser;

lazy_static! {
    static ref EXAMPLE_DELIMITER_RE: Regex =
        Regex::new(r"(?m)^````+\s+example(?:\s+(?P<section>.+?))?\s*$").expect("regex");
}

static FIXTURE_FILE: &str = "tests/fixtures/nesting.txt";

/// One pinned input and its expected rendering.
#[derive(Debug, Clone)]
struct Fixture {
    section: String,
    index: usize,
    input: String,
    expected: String,
}

fn load_fixtures(path: &Path) -> anyhow::Result<Vec<Fixture>> {
    let text = fs::read_to_string(path)?;
    let mut section_stack: Vec<String> = Vec::new();
    let mut fixtures = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        if line.starts_with('#') {
            let level = line.chars().take_while(|c| *c == '#').count();
            let title = line[level..].trim().to_string();
            while section_stack.len() >= level {
                section_stack.pop();
            }
            section_stack.push(title);
            continue;
        }

        let Some(caps) = EXAMPLE_DELIMITER_RE.captures(line) else {
            continue;
        };
        let section = caps
            .name("section")
            .map(|m| m.as_str().trim().to_string())
            .or_else(|| section_stack.last().cloned())
            .unwrap_or_else(|| "Unknown".to_string());

        let input: Vec<&str> = lines.by_ref().take_while(|l| l.trim() != ".").collect();
        let expected: Vec<&str> = lines.by_ref().take_while(|l| !l.starts_with("````")).collect();

        fixtures.push(Fixture {
            section,
            index: fixtures.len() + 1,
            input: input.join("\n"),
            expected: expected.join("\n").trim_end().to_string(),
        });
    }

    Ok(fixtures)
}

fn should_run(fixture: &Fixture) -> bool {
    if let Some(index) = env::var("TAGWEAVE_FIXTURE")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        return fixture.index == index;
    }

    if let Ok(section) = env::var("TAGWEAVE_SECTION") {
        return fixture
            .section
            .to_lowercase()
            .contains(&section.to_lowercase());
    }

    true
}

#[test]
fn test_pinned_tree_shapes() -> anyhow::Result<()> {
    let path = PathBuf::from(FIXTURE_FILE);
    let fixtures = load_fixtures(&path)?;
    assert!(!fixtures.is_empty(), "no fixtures found in {:?}", path);

    let registry = common::registry();
    let parser = Parser::new(&registry);
    let mut failures = Vec::new();

    for fixture in fixtures.iter().filter(|f| should_run(f)) {
        let document = parser.parse(&fixture.input);
        common::check_invariants(&document)?;

        let actual = common::render(&document);
        if actual != fixture.expected {
            failures.push(format!(
                "fixture {} ({})\ninput:\n{}\nexpected:\n{}\nactual:\n{}",
                fixture.index, fixture.section, fixture.input, fixture.expected, actual
            ));
        }
    }

    assert!(failures.is_empty(), "{}", failures.join("\n\n"));
    Ok(())
}

#[test]
fn test_fixture_inputs_reparse_identically() -> anyhow::Result<()> {
    let fixtures = load_fixtures(Path::new(FIXTURE_FILE))?;
    let registry = common::registry();
    let parser = Parser::new(&registry);

    for fixture in &fixtures {
        let first = parser.parse(&fixture.input);
        let second = parser.parse(&fixture.input);
        assert_eq!(first, second, "fixture {} is not deterministic", fixture.index);
    }
    Ok(())
}
