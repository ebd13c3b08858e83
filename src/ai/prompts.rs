//! Prompt templates and assembly for the generation requests.

use crate::ai::adapter::ChatMessage;
use crate::config::Config;

/// Hard cap on diff text embedded in a prompt.
///
/// Roughly 12k tokens at ~3.5 characters per token, leaving headroom for
/// instructions and the model's own output inside common context windows.
const MAX_DIFF_CHARS: usize = 40_000;

/// System prompt for commit message generation.
pub const COMMIT_SYSTEM_PROMPT: &str = r#"You are an expert software engineer writing git commit messages. You will receive a staged diff and must produce a single commit message describing it.

Follow conventional commit format:

```
<type>(<scope>): <description>

[optional body]
```

## Types
- `feat`: New features or enhancements
- `fix`: Bug fixes
- `docs`: Documentation changes
- `style`: Code style changes (formatting, missing semicolons, etc)
- `refactor`: Code refactoring without changing functionality
- `test`: Adding or updating tests
- `chore`: Maintenance tasks, dependency updates
- `build`: Changes to build system or external dependencies
- `ci`: CI/CD pipeline changes
- `perf`: Performance improvements
- `revert`: Reverts of previous commits

## Guidelines
- Base the message on what the diff actually changes, not on file paths alone
- Use lowercase for the description, imperative mood, no trailing period
- Keep the description under 72 characters
- Use the body only when the change needs explanation of what and why
- Output ONLY the commit message, with no surrounding commentary"#;

/// System prompt for release note generation.
pub const TAG_SYSTEM_PROMPT: &str = r#"You are writing the message for an annotated git release tag. You will receive the list of commit subjects included in the release and, when available, the messages of earlier tags to use as style references.

## Guidelines
- Summarize the changes grouped by theme, most significant first
- Match the tone, structure, and level of detail of the style references when they are provided; they are formatting guidance, not content to repeat
- Plain text only: no markdown headers, no code fences
- Output ONLY the tag message, with no surrounding commentary"#;

/// System prompt for pull request content generation.
pub const PR_SYSTEM_PROMPT: &str = r#"You are writing a pull request for a branch. You will receive the branch name, the commit subjects on the branch, and the combined diff against the base branch.

## Output format
- The FIRST line is the PR title: concise, 50-80 characters, no trailing period
- Leave one blank line after the title
- The rest is the PR description in markdown: a short summary paragraph followed by a bulleted list of notable changes
- Base everything on the actual diff content
- Output ONLY the title and description, with no surrounding commentary"#;

/// Appends the output-language instruction when one is configured.
fn language_instruction(config: &Config) -> String {
    match &config.language {
        Some(language) => format!("\n\nWrite the output in {language}."),
        None => String::new(),
    }
}

/// Truncates text to the diff budget, marking the cut.
fn truncate_diff(diff: &str) -> String {
    if diff.len() <= MAX_DIFF_CHARS {
        return diff.to_string();
    }
    // Cut on a char boundary at or below the budget.
    let mut end = MAX_DIFF_CHARS;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n\n[diff truncated]", &diff[..end])
}

/// Builds the message list for commit message generation.
pub fn commit_messages(diff: &str, config: &Config) -> Vec<ChatMessage> {
    let system = format!("{COMMIT_SYSTEM_PROMPT}{}", language_instruction(config));
    let user = format!("Staged diff:\n\n{}", truncate_diff(diff));
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Builds the message list for release note generation.
///
/// `prior_message` is the message of the tag being replaced; `base_message`
/// the message of a distinct base tag. Both are style references only.
pub fn tag_messages(
    tag_name: &str,
    subjects: &[String],
    prior_message: Option<&str>,
    base_message: Option<&str>,
    config: &Config,
) -> Vec<ChatMessage> {
    let system = format!("{TAG_SYSTEM_PROMPT}{}", language_instruction(config));

    let mut user = format!("Tag: {tag_name}\n\nCommit subjects in this release:\n");
    for subject in subjects {
        user.push_str("- ");
        user.push_str(subject);
        user.push('\n');
    }
    if let Some(prior) = prior_message {
        user.push_str(&format!(
            "\nMessage of the tag being replaced (style and content reference):\n{prior}\n"
        ));
    }
    if let Some(base) = base_message {
        user.push_str(&format!(
            "\nMessage of the previous release tag (style reference):\n{base}\n"
        ));
    }

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Builds the message list for PR content generation.
pub fn pr_messages(
    branch: &str,
    base: &str,
    subjects: &[String],
    diff: &str,
    config: &Config,
) -> Vec<ChatMessage> {
    let system = format!("{PR_SYSTEM_PROMPT}{}", language_instruction(config));

    let mut user = format!("Branch: {branch}\nBase: {base}\n\nCommits:\n");
    for subject in subjects {
        user.push_str("- ");
        user.push_str(subject);
        user.push('\n');
    }
    user.push_str(&format!("\nDiff against {base}:\n\n{}", truncate_diff(diff)));

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}
