//! Conventional-commit header grammar and type inference.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// The fixed set of conventional-commit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
    /// New features or enhancements.
    Feat,
    /// Bug fixes.
    Fix,
    /// Documentation changes.
    Docs,
    /// Code style changes.
    Style,
    /// Refactoring without behaviour change.
    Refactor,
    /// Test additions or updates.
    Test,
    /// Maintenance tasks.
    Chore,
    /// Build system changes.
    Build,
    /// CI pipeline changes.
    Ci,
    /// Performance improvements.
    Perf,
    /// Reverts of previous commits.
    Revert,
}

impl CommitType {
    /// All types, in canonical order.
    pub const ALL: [CommitType; 11] = [
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Docs,
        CommitType::Style,
        CommitType::Refactor,
        CommitType::Test,
        CommitType::Chore,
        CommitType::Build,
        CommitType::Ci,
        CommitType::Perf,
        CommitType::Revert,
    ];

    /// The lowercase keyword used in headers.
    pub fn as_str(self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
            CommitType::Perf => "perf",
            CommitType::Revert => "revert",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

/// A parsed conventional-commit header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Commit type.
    pub commit_type: CommitType,
    /// Optional scope.
    pub scope: Option<String>,
    /// Description after the colon.
    pub description: String,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}({}): {}", self.commit_type, scope, self.description),
            None => write!(f, "{}: {}", self.commit_type, self.description),
        }
    }
}

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<type>feat|fix|docs|style|refactor|test|chore|build|ci|perf|revert)(?:\((?P<scope>[^()]*)\))?:\s*(?P<desc>.*)$",
    )
    .unwrap()
});

/// Parses a line as a conventional-commit header.
///
/// Surrounding whitespace is ignored. The description must be non-empty;
/// bare `type:` lines are not headers (see [`is_bare_type_header`]).
pub fn parse_header(line: &str) -> Option<Header> {
    let captures = HEADER_RE.captures(line.trim())?;
    let description = captures.name("desc")?.as_str().trim();
    if description.is_empty() {
        return None;
    }
    Some(Header {
        commit_type: captures
            .name("type")?
            .as_str()
            .parse()
            .expect("regex alternation only matches known types"),
        scope: captures.name("scope").map(|m| m.as_str().to_string()),
        description: description.to_string(),
    })
}

/// Returns true when a line is a valid conventional-commit header.
pub fn is_header(line: &str) -> bool {
    parse_header(line).is_some()
}

/// Returns true for a `type:` or `type(scope):` line with no description.
pub fn is_bare_type_header(line: &str) -> bool {
    match HEADER_RE.captures(line.trim()) {
        Some(captures) => captures
            .name("desc")
            .map_or(true, |m| m.as_str().trim().is_empty()),
        None => false,
    }
}

/// Ordered keyword table for type inference.
///
/// The first entry whose keyword appears in the text wins. The exact
/// precedence of these four pairs is contract; everything else falls
/// through to `chore`.
const TYPE_KEYWORDS: &[(&[&str], CommitType)] = &[
    (&["version", "update"], CommitType::Chore),
    (&["feature", "add"], CommitType::Feat),
    (&["fix", "bug"], CommitType::Fix),
];

/// Infers a commit type from free-form text via keyword heuristics.
pub fn infer_type(text: &str) -> CommitType {
    let lowered = text.to_lowercase();
    for (keywords, commit_type) in TYPE_KEYWORDS {
        if keywords.iter().any(|k| lowered.contains(k)) {
            return *commit_type;
        }
    }
    CommitType::Chore
}
