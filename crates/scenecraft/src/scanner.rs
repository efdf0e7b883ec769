//! Static pattern checks over generated source code.
//!
//! The scan is textual and line based, so it is advisory only. It flags
//! constructs a reviewer should look at before running generated code; it is
//! not a sandbox and cannot prove code safe.
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

// Patterns are matched against the code part of a line, comments removed.
lazy_static! {
    static ref IMPORT: Regex = Regex::new(r"\bimport\s+\S").unwrap();
    static ref PROCESS: Regex = Regex::new(r"\bos\.system\b|\bsubprocess\.\w+").unwrap();
    static ref FILE_OPERATION: Regex = Regex::new(r"\b(open|read|write|delete)\(").unwrap();
    static ref ENVIRONMENT: Regex = Regex::new(r"\bos\.(getenv|environ)\b").unwrap();
    static ref FOREIGN_FUNCTION: Regex = Regex::new(r"\bctypes\b").unwrap();
    static ref SERIALIZATION: Regex = Regex::new(r"\bpickle\.(loads?|dumps?)\b").unwrap();
    static ref DYNAMIC_EXECUTION: Regex = Regex::new(r"\b(eval|exec)\(").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Import,
    ProcessInvocation,
    FileOperation,
    EnvironmentAccess,
    ForeignFunction,
    UnsafeSerialization,
    DynamicExecution,
}

impl FindingCategory {
    fn pattern(&self) -> &'static Regex {
        match self {
            FindingCategory::Import => &IMPORT,
            FindingCategory::ProcessInvocation => &PROCESS,
            FindingCategory::FileOperation => &FILE_OPERATION,
            FindingCategory::EnvironmentAccess => &ENVIRONMENT,
            FindingCategory::ForeignFunction => &FOREIGN_FUNCTION,
            FindingCategory::UnsafeSerialization => &SERIALIZATION,
            FindingCategory::DynamicExecution => &DYNAMIC_EXECUTION,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FindingCategory::Import => "Code contains import statements",
            FindingCategory::ProcessInvocation => "Code contains os.system or subprocess calls",
            FindingCategory::FileOperation => "Code contains file operations",
            FindingCategory::EnvironmentAccess => "Code accesses environment variables",
            FindingCategory::ForeignFunction => "Code contains calls to ctypes functions",
            FindingCategory::UnsafeSerialization => "Code contains pickling/unpickling",
            FindingCategory::DynamicExecution => {
                "Code contains dangerous functions like eval() or exec()"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// 1-based line number
    pub line: usize,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Every line of the source that matched one category
pub struct Finding {
    pub category: FindingCategory,
    pub occurrences: Vec<Occurrence>,
}

impl Finding {
    pub fn summary(&self) -> String {
        let snippets: Vec<&str> = self
            .occurrences
            .iter()
            .map(|occurrence| occurrence.snippet.as_str())
            .collect();
        format!("{}: {}", self.category.description(), snippets.join(", "))
    }
}

/// The line up to its first `#` that sits outside a string literal
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, ch) in line.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if ch == '\\' => escaped = true,
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == '#' => return &line[..index],
            None => {}
        }
    }
    line
}

/// Scan `source` and return one finding per category that matched.
/// No findings means the source passed every check.
pub fn scan(source: &str) -> Vec<Finding> {
    let lines: Vec<(usize, &str)> = source
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, strip_comment(line)))
        .filter(|(_, code)| !code.trim().is_empty())
        .collect();

    FindingCategory::iter()
        .filter_map(|category| {
            let occurrences: Vec<Occurrence> = lines
                .iter()
                .filter(|(_, code)| category.pattern().is_match(code))
                .map(|(line, code)| Occurrence {
                    line: *line,
                    snippet: code.trim().to_string(),
                })
                .collect();

            (!occurrences.is_empty()).then_some(Finding {
                category,
                occurrences,
            })
        })
        .collect()
}

/// Render findings one per line, or `None` when there are none
pub fn report(findings: &[Finding]) -> Option<String> {
    if findings.is_empty() {
        return None;
    }
    Some(
        findings
            .iter()
            .map(Finding::summary)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
