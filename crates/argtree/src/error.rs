use thiserror::Error;

use crate::arity::Arity;

/// A malformed CLI definition, detected while the tree is being built.
///
/// These are programmer errors. The plain builder methods panic with the
/// message; the `try_*` variants hand the value back instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("invalid long option added: '{0}'")]
    InvalidLongOption(String),

    #[error("invalid short option added: '{0}'")]
    InvalidShortOption(String),

    #[error("long option '{option}' already exists in the lineage of command '{command}'")]
    DuplicateLongOption { option: String, command: String },

    #[error("short option '{option}' already exists in the lineage of command '{command}'")]
    DuplicateShortOption { option: String, command: String },

    #[error("empty command cannot be added")]
    EmptyCommandName,

    #[error("command already exists: '{name}' under '{parent}'")]
    DuplicateCommand { name: String, parent: String },

    #[error("lookup key already exists: '{0}'")]
    DuplicateKey(String),
}

/// A runtime input error: the argument vector does not fit the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid argv provided")]
    EmptyArgv,

    #[error("program name '{0}' is also a command or option key; give the root command an explicit key")]
    ProgramNameConflict(String),

    #[error("{expected} argument(s) expected by {name}, found {found}")]
    MissingArguments {
        name: String,
        expected: Arity,
        found: usize,
    },

    #[error("option '{option}' does not take exactly one value, so '{token}' is not allowed")]
    InlineValue { option: String, token: String },

    #[error("multiple commands found: {}", .commands.join(", "))]
    MultipleCommands { commands: Vec<String> },

    #[error("no subcommand found for command: {0}")]
    MissingCommand(String),

    #[error("no option found for command: {0}")]
    MissingOption(String),

    #[error("unknown command, option or args: {}", quote_all(.0))]
    UnknownTokens(Vec<String>),
}

/// Returned by [`ParsedResult::invoke`](crate::ParsedResult::invoke).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("no function to invoke")]
    NoAction,
}

pub type ParseResult<T> = Result<T, ParseError>;

fn quote_all(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| format!("'{t}'"))
        .collect::<Vec<_>>()
        .join(" ")
}
