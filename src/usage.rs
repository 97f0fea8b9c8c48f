//! Colorized usage, help and argument-error output.

use clap::error::{Error as ClapError, ErrorKind};
use colored::{Color, Colorize};

/// The kinds of parser output, each with its own color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Usage,
    Help,
    Error,
}

impl Tone {
    fn color(self) -> Color {
        match self {
            Tone::Usage => Color::Yellow,
            Tone::Help => Color::Cyan,
            Tone::Error => Color::Red,
        }
    }
}

/// Trim `message` and wrap it in bold color codes for `tone`.
pub fn paint(tone: Tone, message: &str) -> String {
    format!("{}\n", message.trim().color(tone.color()).bold())
}

/// Print the outcome of a failed parse and return the process exit code.
///
/// Help and version requests go to stdout and exit 0; every other parse
/// failure prints the usage and the error to stderr and exits 2.
pub fn report(err: &ClapError, prog: &str) -> u8 {
    let text = err.to_string();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{}", paint(Tone::Help, &text));
            0
        }
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            eprint!("{}", paint(Tone::Usage, &text));
            eprint!(
                "{}",
                paint(Tone::Error, &format!("{prog}: Error: a subcommand is required"))
            );
            2
        }
        _ => {
            let (message, usage) = split_clap_error(&text);
            if let Some(usage) = usage {
                eprint!("{}", paint(Tone::Usage, &usage));
            }
            eprint!("{}", paint(Tone::Error, &format!("{prog}: Error: {message}")));
            2
        }
    }
}

/// Separate clap's rendered error into the message and the usage block.
pub fn split_clap_error(text: &str) -> (String, Option<String>) {
    let mut message = None;
    let mut usage = None;
    for block in text.split("\n\n").map(str::trim) {
        if let Some(rest) = block.strip_prefix("error:") {
            message.get_or_insert_with(|| rest.trim().to_string());
        } else if block.starts_with("Usage:") {
            usage = Some(block.to_string());
        }
    }
    (message.unwrap_or_else(|| text.trim().to_string()), usage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_trims_before_coloring() {
        colored::control::set_override(true);
        let painted = paint(Tone::Usage, "\n  Usage: provision <command>  \n");
        colored::control::unset_override();

        assert!(painted.starts_with("\x1b[1;33mUsage"));
        assert!(painted.ends_with("<command>\x1b[0m\n"));
    }

    #[test]
    fn tones_use_distinct_colors() {
        assert_eq!(Tone::Usage.color(), Color::Yellow);
        assert_eq!(Tone::Help.color(), Color::Cyan);
        assert_eq!(Tone::Error.color(), Color::Red);
    }

    #[test]
    fn clap_error_is_split_into_message_and_usage() {
        let text = "error: unrecognized subcommand 'frobnicate'\n\n\
                    Usage: provision [OPTIONS] <COMMAND>\n\n\
                    For more information, try '--help'.\n";
        let (message, usage) = split_clap_error(text);
        assert_eq!(message, "unrecognized subcommand 'frobnicate'");
        assert_eq!(usage.as_deref(), Some("Usage: provision [OPTIONS] <COMMAND>"));
    }

    #[test]
    fn unstructured_text_becomes_the_message() {
        let (message, usage) = split_clap_error("  something odd \n");
        assert_eq!(message, "something odd");
        assert!(usage.is_none());
    }
}
