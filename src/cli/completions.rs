//! Completions command — shell completion script generation.

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};

/// Completions command options.
#[derive(Parser)]
pub struct CompletionsCommand {
    /// Shell to generate the completion script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsCommand {
    /// Writes the completion script to stdout.
    pub fn execute(self) -> Result<()> {
        let mut command = crate::cli::Cli::command();
        let bin_name = command.get_name().to_string();
        generate(self.shell, &mut command, bin_name, &mut io::stdout());
        Ok(())
    }
}
