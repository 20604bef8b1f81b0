//! Command-tree argument parsing.
//!
//! A program describes its CLI as a tree of commands, each with its own
//! options, positional arity and optional environment binding. Parsing walks
//! argv down that tree and produces a [`ParsedResult`] keyed by command name
//! or option long form:
//!
//! ```
//! use argtree::{ArgParser, CommandSpec, OptionSpec, ParseOutcome};
//!
//! let mut parser = ArgParser::new();
//! parser.add_option(OptionSpec::new("--verbose", "-v", "Chatty output"));
//! parser.add_command_with(CommandSpec::new("init", "Create a project").arity(1));
//!
//! let env: &[(&str, &str)] = &[];
//! let outcome = parser.try_parse_with_env(["tool", "init", "./proj", "-v"], env).unwrap();
//! let ParseOutcome::Parsed(parsed) = outcome else { unreachable!() };
//! assert_eq!(parsed.get_at("init", 0), Some("./proj"));
//! assert!(parsed.called("--verbose"));
//! ```

mod arity;
mod engine;
mod env;
mod error;
mod parser;
pub mod render;
mod result;
mod tree;

pub use arity::Arity;
pub use engine::{ParseOutcome, parse_tree, program_name};
pub use env::{Environment, ProcessEnv};
pub use error::{DefinitionError, InvokeError, ParseError, ParseResult};
pub use parser::{ArgParser, USAGE_EXIT_CODE};
pub use result::{Action, ArgumentRecord, ParsedResult};
pub use tree::{
    CommandId, CommandMut, CommandNode, CommandSpec, CommandTree, HELP_LONG, HELP_SHORT,
    OptionSpec, VERSION_LONG, VERSION_SHORT,
};
