use std::io::Write;

use crate::engine::{self, ParseOutcome};
use crate::env::{Environment, ProcessEnv};
use crate::error::ParseResult;
use crate::render;
use crate::result::ParsedResult;
use crate::tree::{CommandId, CommandMut, CommandSpec, CommandTree, OptionSpec};

/// Exit status used when argv does not fit the command tree.
pub const USAGE_EXIT_CODE: i32 = 2;

/// A command tree plus the text settings used when reporting to the user.
#[derive(Debug, Clone, Default)]
pub struct ArgParser {
    tree: CommandTree,
    global_usage: String,
    version: String,
}

impl ArgParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a described root command.
    ///
    /// The root's name is replaced by the program name at parse time.
    pub fn with_root(root: CommandSpec) -> Self {
        Self {
            tree: CommandTree::new(root),
            ..Self::default()
        }
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn root(&mut self) -> CommandMut<'_> {
        self.tree.root_mut()
    }

    pub fn command(&mut self, id: CommandId) -> CommandMut<'_> {
        self.tree.command_mut(id)
    }

    /// Add a global option on the root.
    ///
    /// # Panics
    ///
    /// See [`CommandMut::add_option`].
    pub fn add_option(&mut self, spec: OptionSpec) -> &mut Self {
        self.tree.root_mut().add_option(spec);
        self
    }

    /// Add a top-level command.
    ///
    /// # Panics
    ///
    /// See [`CommandMut::add_command`].
    pub fn add_command(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> CommandMut<'_> {
        self.add_command_with(CommandSpec::new(name, description))
    }

    pub fn add_command_with(&mut self, spec: CommandSpec) -> CommandMut<'_> {
        let root = self.tree.root();
        match self.tree.try_add_command(root, spec) {
            Ok(id) => self.tree.command_mut(id),
            Err(err) => panic!("{err}"),
        }
    }

    /// Parsing fails unless a top-level command is given.
    pub fn require_commands(&mut self) -> &mut Self {
        self.tree.root_mut().require_commands();
        self
    }

    /// Parsing fails unless a global option is given.
    pub fn require_options(&mut self) -> &mut Self {
        self.tree.root_mut().require_options();
        self
    }

    /// Usage line printed at the top of the root help.
    pub fn add_global_usage(&mut self, usage: impl Into<String>) -> &mut Self {
        self.global_usage = usage.into();
        self
    }

    pub fn set_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.version = version.into();
        self
    }

    /// Parse against the process environment without printing or exiting.
    pub fn try_parse<I, S>(&mut self, argv: I) -> ParseResult<ParseOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.try_parse_with_env(argv, &ProcessEnv)
    }

    pub fn try_parse_with_env<I, S, E>(&mut self, argv: I, env: &E) -> ParseResult<ParseOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        E: Environment + ?Sized,
    {
        engine::parse_tree(&mut self.tree, argv, env)
    }

    /// Parse `argv`, or report to the user and exit.
    ///
    /// Help and version go to stdout with status 0. Parse errors go to
    /// stderr, followed by help for the deepest command named in `argv`,
    /// with status [`USAGE_EXIT_CODE`].
    pub fn parse<I, S>(&mut self, argv: I) -> ParsedResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        match self.try_parse(argv.iter().cloned()) {
            Ok(ParseOutcome::Parsed(parsed)) => parsed,
            Ok(ParseOutcome::Help(id)) => {
                print!("{}", self.help_message(id));
                let _ = std::io::stdout().flush();
                std::process::exit(0);
            }
            Ok(ParseOutcome::Version) => {
                print!("{}", self.version_message());
                let _ = std::io::stdout().flush();
                std::process::exit(0);
            }
            Err(err) => {
                let target = self.tree.deepest_match(argv.get(1..).unwrap_or_default());
                eprintln!("error: {err}");
                eprint!("{}", self.help_message(target));
                std::process::exit(USAGE_EXIT_CODE);
            }
        }
    }

    /// Help for `id`; the global usage line only appears on the root.
    pub fn help_message(&self, id: CommandId) -> String {
        let usage = if id == self.tree.root() {
            self.global_usage.as_str()
        } else {
            ""
        };
        render::help(&self.tree, id, usage)
    }

    pub fn version_message(&self) -> String {
        render::version(&self.tree, &self.version)
    }

    pub fn describe(&self) -> String {
        render::describe(&self.tree)
    }
}
