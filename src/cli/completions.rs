//! Completions command implementation

use crate::cli::{Cli, CompletionsArgs};
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io::{self, Write};

/// Write the completion script for `shell` into `out`.
pub fn write_completions<W: Write>(shell: Shell, out: &mut W) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, out);
}

/// Handle `helpdesk completions` command
pub fn handle_completions(args: &CompletionsArgs) {
    write_completions(args.shell, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut buf = Vec::new();
        write_completions(shell, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_completions_bash_mentions_subcommands() {
        let output = script(Shell::Bash);
        assert!(output.contains("helpdesk"));
        for sub in ["serve", "chat", "ask", "completions"] {
            assert!(output.contains(sub), "missing {}", sub);
        }
    }

    #[test]
    fn test_completions_zsh_includes_flags() {
        let output = script(Shell::Zsh);
        assert!(output.contains("--daily-limit"));
        assert!(output.contains("--offline"));
    }
}
