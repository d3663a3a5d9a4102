//! Operator commands
//!
//! The operator types one command per line; tokens are separated by
//! whitespace and command names are case-sensitive.
//!
//! - `add <tag>...`: start tracking tags
//! - `rm <tag>...`: stop tracking tags
//! - `ls`: list tracked tags
//! - `info`: crawling statistics
//! - `mv <path>`: continue writing into another file
//! - `help`: list commands
//! - `exit`: stop the crawler

mod interpreter;

use thiserror::Error;

pub use interpreter::CommandInterpreter;

/// Text printed by `help`
pub const HELP: &str = "Available commands:
add <tag>...: add new tags to track
rm <tag>...: stop tracking given tags
ls: list the tracked tags
info: output crawling statistics
mv <path>: move output to a new file
help: show this message
exit: stop the crawler";

/// A parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(Vec<String>),
    Remove(Vec<String>),
    List,
    Info,
    Move(String),
    Help,
    Exit,
}

/// Input that is not a valid command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("cannot understand command!")]
    Unrecognized(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let mut tokens = line.split_whitespace();
    let Some(name) = tokens.next() else {
        return Ok(None);
    };
    let args: Vec<String> = tokens.map(str::to_string).collect();

    let command = match (name, args.len()) {
        ("add", 0) => return Err(ParseError::Usage("add <tag>...")),
        ("add", _) => Command::Add(args),
        ("rm", 0) => return Err(ParseError::Usage("rm <tag>...")),
        ("rm", _) => Command::Remove(args),
        ("mv", 1) => Command::Move(args.into_iter().next().unwrap_or_default()),
        ("mv", _) => return Err(ParseError::Usage("mv <path>")),
        // Words after an argument-less command are ignored
        ("ls", _) => Command::List,
        ("info", _) => Command::Info,
        ("help", _) => Command::Help,
        ("exit", _) => Command::Exit,
        _ => return Err(ParseError::Unrecognized(line.trim().to_string())),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse("add rust  tokio").unwrap(),
            Some(Command::Add(vec!["rust".to_string(), "tokio".to_string()]))
        );
        assert_eq!(
            parse("  rm rust\n").unwrap(),
            Some(Command::Remove(vec!["rust".to_string()]))
        );
        assert_eq!(parse("ls").unwrap(), Some(Command::List));
        assert_eq!(parse("info").unwrap(), Some(Command::Info));
        assert_eq!(
            parse("mv next.gz").unwrap(),
            Some(Command::Move("next.gz".to_string()))
        );
        assert_eq!(parse("help").unwrap(), Some(Command::Help));
        assert_eq!(parse("exit").unwrap(), Some(Command::Exit));
    }

    #[test]
    fn test_blank_line_is_ignored() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   \t").unwrap(), None);
    }

    #[test]
    fn test_missing_arguments() {
        assert_eq!(parse("add"), Err(ParseError::Usage("add <tag>...")));
        assert_eq!(parse("rm"), Err(ParseError::Usage("rm <tag>...")));
        assert_eq!(parse("mv"), Err(ParseError::Usage("mv <path>")));
        assert_eq!(parse("mv a b"), Err(ParseError::Usage("mv <path>")));
    }

    #[test]
    fn test_trailing_words_ignored() {
        assert_eq!(parse("exit now").unwrap(), Some(Command::Exit));
        assert_eq!(parse("ls extra").unwrap(), Some(Command::List));
        assert_eq!(parse("info x").unwrap(), Some(Command::Info));
        assert_eq!(parse("help me").unwrap(), Some(Command::Help));
    }

    #[test]
    fn test_unrecognized_input() {
        assert!(matches!(parse("EXIT"), Err(ParseError::Unrecognized(_))));
        assert!(matches!(parse("quit"), Err(ParseError::Unrecognized(_))));
        assert!(matches!(parse("lsx"), Err(ParseError::Unrecognized(_))));
    }
}
