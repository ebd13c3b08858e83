//! Interactive confirmation primitives.
//!
//! Every confirmation in the tool goes through one injectable capability so
//! the flows are testable without terminal I/O. Answers are normalized
//! case-insensitively; anything other than `y`/`yes` counts as "no".

use std::io::{self, Write};

use anyhow::{Context, Result};

/// Injectable user-interaction capability.
pub trait UserPrompt {
    /// Asks a yes/no question.
    fn confirm(&mut self, question: &str) -> Result<bool>;

    /// Asks the user to select a subset of remotes for publishing.
    ///
    /// An empty selection means "skip push" and is not an error.
    fn select_remotes(&mut self, remotes: &[String]) -> Result<Vec<String>>;
}

/// Terminal-backed prompt reading from stdin.
pub struct TerminalPrompt;

impl UserPrompt for TerminalPrompt {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        print!("❓ {question} [y/N] ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .context("Failed to read user input")?;

        Ok(parse_yes(&input))
    }

    fn select_remotes(&mut self, remotes: &[String]) -> Result<Vec<String>> {
        println!("📡 Configured remotes:");
        for (index, remote) in remotes.iter().enumerate() {
            println!("   {}. {remote}", index + 1);
        }

        loop {
            print!("❓ Push to which remotes? [a]ll, [n]one, or comma-separated names/numbers: ");
            io::stdout().flush().context("Failed to flush stdout")?;

            let mut input = String::new();
            io::stdin()
                .read_line(&mut input)
                .context("Failed to read user input")?;

            match parse_remote_selection(&input, remotes) {
                Ok(selection) => return Ok(selection),
                Err(bad_token) => {
                    println!("Unknown remote '{bad_token}'. Please try again.");
                }
            }
        }
    }
}

/// Normalizes a yes/no answer; only `y`/`yes` (any case) is true.
pub fn parse_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Parses a remote selection answer against the known remote names.
///
/// `a`/`all` selects everything, `n`/`none` or an empty answer selects
/// nothing; otherwise the answer is a comma-separated list of names or
/// 1-based indices, kept in the order given. Returns the offending token
/// when one does not resolve.
pub fn parse_remote_selection(input: &str, remotes: &[String]) -> Result<Vec<String>, String> {
    let trimmed = input.trim();
    match trimmed.to_lowercase().as_str() {
        "a" | "all" => return Ok(remotes.to_vec()),
        "" | "n" | "none" => return Ok(Vec::new()),
        _ => {}
    }

    let mut selection = Vec::new();
    for token in trimmed.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let resolved = if let Ok(index) = token.parse::<usize>() {
            (index >= 1).then(|| remotes.get(index - 1)).flatten()
        } else {
            remotes.iter().find(|r| r.as_str() == token)
        };

        match resolved {
            Some(remote) => {
                if !selection.contains(remote) {
                    selection.push(remote.clone());
                }
            }
            None => return Err(token.to_string()),
        }
    }

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remotes() -> Vec<String> {
        vec![
            "origin".to_string(),
            "upstream".to_string(),
            "mirror".to_string(),
        ]
    }

    #[test]
    fn yes_variants() {
        assert!(parse_yes("y"));
        assert!(parse_yes("Y"));
        assert!(parse_yes("yes"));
        assert!(parse_yes(" YES \n"));
    }

    #[test]
    fn everything_else_is_no() {
        assert!(!parse_yes(""));
        assert!(!parse_yes("n"));
        assert!(!parse_yes("no"));
        assert!(!parse_yes("yep"));
        assert!(!parse_yes("sure"));
    }

    #[test]
    fn selection_all_and_none() {
        assert_eq!(parse_remote_selection("all", &remotes()).unwrap().len(), 3);
        assert_eq!(parse_remote_selection("A", &remotes()).unwrap().len(), 3);
        assert!(parse_remote_selection("none", &remotes()).unwrap().is_empty());
        assert!(parse_remote_selection("", &remotes()).unwrap().is_empty());
    }

    #[test]
    fn selection_by_name_keeps_order() {
        let selection = parse_remote_selection("mirror, origin", &remotes()).unwrap();
        assert_eq!(selection, vec!["mirror".to_string(), "origin".to_string()]);
    }

    #[test]
    fn selection_by_index() {
        let selection = parse_remote_selection("2,1", &remotes()).unwrap();
        assert_eq!(selection, vec!["upstream".to_string(), "origin".to_string()]);
    }

    #[test]
    fn selection_deduplicates() {
        let selection = parse_remote_selection("origin,1,origin", &remotes()).unwrap();
        assert_eq!(selection, vec!["origin".to_string()]);
    }

    #[test]
    fn selection_rejects_unknown_tokens() {
        assert_eq!(
            parse_remote_selection("origin,nowhere", &remotes()),
            Err("nowhere".to_string())
        );
        assert_eq!(parse_remote_selection("0", &remotes()), Err("0".to_string()));
        assert_eq!(parse_remote_selection("9", &remotes()), Err("9".to_string()));
    }
}
