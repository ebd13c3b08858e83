//! Normalization of raw model output into a conventional-commit message.
//!
//! Models decorate their answers: preamble phrases, reasoning markup,
//! markdown, duplicated headers, trailing alternatives. [`normalize`] strips
//! all of that and guarantees that a non-empty result starts with exactly one
//! valid conventional-commit header. The function is idempotent.

use std::sync::LazyLock;

use regex::Regex;

use crate::message::conventional::{infer_type, is_bare_type_header, is_header, parse_header};

/// Preamble phrases stripped from the start of the text, longest first.
const PREAMBLES: &[&str] = &["the commit message is:", "commit message:", "message:"];

static THINK_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Paired reasoning tags, including namespaced variants like <ns:think>.
    Regex::new(r"(?is)<(?:[a-z][a-z0-9_-]*:)?think>.*?</(?:[a-z][a-z0-9_-]*:)?think>").unwrap()
});

// Tags never span lines; keeping the match single-line means later line
// removal cannot splice two fragments into a new tag.
static ANGLE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][^<>\n]*>").unwrap());

static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{4,}").unwrap());

/// Normalizes raw model output into a conventional-commit message.
///
/// Applies, in order: preamble stripping; reasoning-markup, angle-tag, and
/// markdown cleanup with blank-run collapsing; line-level cleanup (code
/// fences, leading blanks, leading bare-type headers, text before a later
/// header); type inference when no header exists anywhere; nested-header
/// collapsing; truncation at a second header; a single blank line between
/// header and body.
///
/// Text that is empty after cleanup normalizes to the empty string.
pub fn normalize(raw: &str) -> String {
    let text = strip_preambles(raw);
    let text = strip_markup(&text);
    let mut lines = cleanup_lines(&text);

    if lines.is_empty() {
        return String::new();
    }

    if !lines.iter().any(|l| is_header(l)) {
        // Keyword inference runs over the raw text, not the cleaned lines.
        lines[0] = format!("{}: {}", infer_type(raw), lines[0]);
    }

    lines[0] = collapse_nested_header(&lines[0]);
    if let Some(header) = parse_header(&lines[0]) {
        lines[0] = header.to_string();
    }
    truncate_at_second_header(&mut lines);
    let lines = limit_header_body_gap(lines);

    // Line removal above can merge shorter blank runs into longer ones, so
    // the blank-run collapse is re-applied on the joined text.
    BLANK_RUN_RE
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

/// Strips known preamble phrases from the start of the text.
fn strip_preambles(raw: &str) -> String {
    let mut text = raw.trim_start();
    'outer: loop {
        for preamble in PREAMBLES {
            if text.len() >= preamble.len()
                && text.is_char_boundary(preamble.len())
                && text[..preamble.len()].eq_ignore_ascii_case(preamble)
            {
                text = text[preamble.len()..].trim_start();
                continue 'outer;
            }
        }
        return text.to_string();
    }
}

/// Removes reasoning blocks, leftover angle-bracket tags, and markdown
/// decoration; collapses runs of three or more blank lines to one.
fn strip_markup(text: &str) -> String {
    // Removing one piece of markup can splice the surrounding text into
    // another (e.g. "<**b>" only becomes a tag once the asterisks go), so
    // the whole sanitize sequence runs to a fixpoint.
    let mut text = text.to_string();
    loop {
        let pass = ANGLE_TAG_RE
            .replace_all(&THINK_BLOCK_RE.replace_all(&text, ""), "")
            .replace('`', "")
            .replace("**", "");
        if pass == text {
            break;
        }
        text = pass;
    }

    let unwrapped: Vec<String> = text
        .split('\n')
        .map(|line| strip_emphasis_wrap(line.trim_end_matches('\r')).to_string())
        .collect();

    BLANK_RUN_RE
        .replace_all(&unwrapped.join("\n"), "\n\n")
        .into_owned()
}

/// Strips `*` or `_` pairs wrapping an entire line, repeatedly.
fn strip_emphasis_wrap(mut line: &str) -> &str {
    loop {
        let trimmed = line.trim();
        let mut next = None;
        for wrap in ['*', '_'] {
            if trimmed.len() > 2 && trimmed.starts_with(wrap) && trimmed.ends_with(wrap) {
                next = Some(trimmed.trim_matches(wrap).trim());
                break;
            }
        }
        match next {
            Some(n) if n != line => line = n,
            _ => return line,
        }
    }
}

/// Line-level cleanup: code fences, leading blanks, leading bare-type
/// headers, and everything before a later valid header.
fn cleanup_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text
        .split('\n')
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("```") && !trimmed.starts_with("~~~")
        })
        .map(|line| line.trim_end().to_string())
        .collect();

    loop {
        while lines.first().map_or(false, |l| l.trim().is_empty()) {
            lines.remove(0);
        }
        match lines.first() {
            Some(first) if is_bare_type_header(first) => {
                lines.remove(0);
            }
            _ => break,
        }
    }

    // A preamble sentence before the real header: keep from the header on.
    if let Some(first) = lines.first() {
        if !is_header(first) {
            if let Some(pos) = lines.iter().position(|l| is_header(l)) {
                lines.drain(..pos);
            }
        }
    }

    lines
}

/// Collapses a duplicated nested header (`type: innerType(scope): desc`) to
/// the inner header. Repeats until stable.
fn collapse_nested_header(first_line: &str) -> String {
    let mut line = first_line.to_string();
    while let Some(header) = parse_header(&line) {
        if is_header(&header.description) {
            line = header.description;
        } else {
            break;
        }
    }
    line
}

/// Truncates at the second valid header line; the output carries exactly one.
fn truncate_at_second_header(lines: &mut Vec<String>) {
    if let Some(pos) = lines.iter().skip(1).position(|l| is_header(l)) {
        lines.truncate(pos + 1);
    }
}

/// Allows at most one blank line between the header and the body; extras
/// are collapsed, an absent gap is left alone.
fn limit_header_body_gap(lines: Vec<String>) -> Vec<String> {
    let mut iter = lines.into_iter();
    let Some(header) = iter.next() else {
        return Vec::new();
    };
    let rest: Vec<String> = iter.collect();

    match rest.iter().position(|l| !l.trim().is_empty()) {
        None => vec![header],
        Some(0) => {
            let mut result = vec![header];
            result.extend(rest);
            result
        }
        Some(body_start) => {
            let mut result = vec![header, String::new()];
            result.extend(rest.into_iter().skip(body_start));
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_preamble_and_infers_chore() {
        assert_eq!(
            normalize("The commit message is: update version to 2.0"),
            "chore: update version to 2.0"
        );
    }

    #[test]
    fn drops_bare_header_and_truncates_at_second() {
        assert_eq!(
            normalize("chore:\nfeat(api): add retry\nfix: unrelated"),
            "feat(api): add retry"
        );
    }

    #[test]
    fn preamble_variants_are_case_insensitive() {
        assert_eq!(
            normalize("Commit message: fix: handle empty diff"),
            "fix: handle empty diff"
        );
        assert_eq!(
            normalize("MESSAGE: feat: add streaming"),
            "feat: add streaming"
        );
    }

    #[test]
    fn keyword_inference_table() {
        assert_eq!(normalize("add login page"), "feat: add login page");
        assert_eq!(normalize("bug in tokenizer"), "fix: bug in tokenizer");
        assert_eq!(normalize("reorganize docs layout"), "chore: reorganize docs layout");
        // version/update outranks the other pairs
        assert_eq!(
            normalize("update added fixtures"),
            "chore: update added fixtures"
        );
    }

    #[test]
    fn removes_think_blocks() {
        assert_eq!(
            normalize("<think>the diff renames a function</think>\nrefactor: rename parse entry point"),
            "refactor: rename parse entry point"
        );
    }

    #[test]
    fn removes_namespaced_think_blocks() {
        assert_eq!(
            normalize("<think>reasoning here</think>fix: guard against empty scope"),
            "fix: guard against empty scope"
        );
    }

    #[test]
    fn removes_stray_angle_tags_and_markdown() {
        assert_eq!(
            normalize("**`feat: add config reload`**"),
            "feat: add config reload"
        );
        assert_eq!(normalize("<b>fix: escape paths</b>"), "fix: escape paths");
    }

    #[test]
    fn drops_code_fences() {
        assert_eq!(
            normalize("```\nfeat: add cache layer\n```"),
            "feat: add cache layer"
        );
    }

    #[test]
    fn discards_text_before_later_header() {
        assert_eq!(
            normalize("Here is a good option for you\n\nfeat: add cache layer"),
            "feat: add cache layer"
        );
    }

    #[test]
    fn collapses_nested_header() {
        assert_eq!(
            normalize("chore: feat(api): add retry"),
            "feat(api): add retry"
        );
        // Repeated nesting collapses fully in one pass.
        assert_eq!(normalize("chore: fix: feat: x"), "feat: x");
    }

    #[test]
    fn keeps_body_with_single_blank_gap() {
        assert_eq!(
            normalize("feat: add cache layer\n\n\n\nKeeps hot entries in memory."),
            "feat: add cache layer\n\nKeeps hot entries in memory."
        );
    }

    #[test]
    fn missing_header_body_gap_is_left_alone() {
        assert_eq!(
            normalize("feat: add cache layer\nKeeps hot entries in memory."),
            "feat: add cache layer\nKeeps hot entries in memory."
        );
    }

    #[test]
    fn header_is_canonicalized() {
        assert_eq!(normalize("feat:add cache layer"), "feat: add cache layer");
        assert_eq!(
            normalize("  fix(parser):   handle empty input  "),
            "fix(parser): handle empty input"
        );
    }

    #[test]
    fn body_headers_are_truncated() {
        let raw = "feat: add cache layer\n\nDetails of the change.\nfix: something else\nmore text";
        assert_eq!(
            normalize(raw),
            "feat: add cache layer\n\nDetails of the change."
        );
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\n  "), "");
        assert_eq!(normalize("<think>only reasoning</think>"), "");
    }

    #[test]
    fn output_contains_exactly_one_header() {
        let samples = [
            "chore:\nfeat(api): add retry\nfix: unrelated",
            "The commit message is: update version to 2.0",
            "feat: a\nfix: b\nchore: c",
            "prose first\nfeat: real header\nfix: second",
        ];
        for raw in samples {
            let normalized = normalize(raw);
            let header_lines = normalized.lines().filter(|l| is_header(l)).count();
            assert_eq!(header_lines, 1, "raw: {raw:?} -> {normalized:?}");
            assert!(is_header(normalized.lines().next().unwrap()));
        }
    }

    #[test]
    fn idempotent_on_samples() {
        let samples = [
            "The commit message is: update version to 2.0",
            "chore:\nfeat(api): add retry\nfix: unrelated",
            "**feat: wrapped**\n\nbody line",
            "<think>x</think>add a feature",
            "```\nchore: fenced\n```",
            "no header at all",
        ];
        for raw in samples {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "raw: {raw:?}");
        }
    }

    proptest::proptest! {
        #[test]
        fn idempotent_for_arbitrary_input(raw in "\\PC{0,200}") {
            let once = normalize(&raw);
            proptest::prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn nonempty_output_starts_with_header(raw in "[ -~\\n]{1,200}") {
            let normalized = normalize(&raw);
            if !normalized.is_empty() {
                let first = normalized.lines().next().unwrap();
                proptest::prop_assert!(is_header(first), "output: {:?}", normalized);
            }
        }
    }
}
