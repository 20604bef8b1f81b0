//! Recursive matching of an argument vector against a [`CommandTree`].
//!
//! Each matched command resolves its own options first (anywhere in the
//! remaining tail), then its positional arguments, then hands the rest to
//! whichever child is named. Whatever is left at the end is an error.

use std::path::Path;
use std::rc::Rc;

use crate::arity::Arity;
use crate::env::Environment;
use crate::error::{ParseError, ParseResult};
use crate::result::ParsedResult;
use crate::tree::{
    CommandId, CommandNode, CommandTree, HELP_LONG, HELP_SHORT, VERSION_LONG, VERSION_SHORT,
};

/// What a parse run produced.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Parsed(ParsedResult),
    /// `--help`/`-h` was given; the id is the command whose help to show.
    Help(CommandId),
    /// `--version`/`-V` was given.
    Version,
}

enum Interrupt {
    Help,
    Version,
    Failed(ParseError),
}

impl From<ParseError> for Interrupt {
    fn from(err: ParseError) -> Self {
        Self::Failed(err)
    }
}

/// Reduce argument 0 to the program's base name.
pub fn program_name(arg0: &str) -> String {
    Path::new(arg0)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| arg0.to_string())
}

/// Parse `argv` (program name first) against `tree`.
///
/// The root command takes the program's base name. Nothing is printed and
/// the process is never terminated here.
pub fn parse_tree<I, S, E>(tree: &mut CommandTree, argv: I, env: &E) -> ParseResult<ParseOutcome>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    E: Environment + ?Sized,
{
    let mut tokens: Vec<String> = argv.into_iter().map(Into::into).collect();
    let Some(first) = tokens.first_mut() else {
        return Err(ParseError::EmptyArgv);
    };
    *first = program_name(first);
    if tree.program_name_conflicts(first) {
        return Err(ParseError::ProgramNameConflict(first.clone()));
    }
    tree.set_root_name(first);

    Engine::new(tree, env, tokens).run()
}

/// A finite argument slot must be filled with a non-empty, non-dashed token.
fn is_usable_value(token: &str) -> bool {
    !token.is_empty() && !token.starts_with('-')
}

struct Engine<'t, E: Environment + ?Sized> {
    tree: &'t CommandTree,
    env: &'t E,
    argv: Vec<String>,
    tokens: Vec<String>,
    result: ParsedResult,
}

impl<'t, E: Environment + ?Sized> Engine<'t, E> {
    fn new(tree: &'t CommandTree, env: &'t E, tokens: Vec<String>) -> Self {
        Self {
            tree,
            env,
            argv: tokens.iter().skip(1).cloned().collect(),
            tokens,
            result: ParsedResult::default(),
        }
    }

    fn run(mut self) -> ParseResult<ParseOutcome> {
        let root = self.tree.root();
        // The program name is the root's token.
        self.tokens.remove(0);
        match self.process(root, 0) {
            Ok(()) => {}
            Err(Interrupt::Help) => {
                return Ok(ParseOutcome::Help(self.tree.deepest_match(self.argv.as_slice())));
            }
            Err(Interrupt::Version) => return Ok(ParseOutcome::Version),
            Err(Interrupt::Failed(err)) => {
                tracing::debug!(error = %err, "parse failed");
                return Err(err);
            }
        }

        if !self.tokens.is_empty() {
            return Err(ParseError::UnknownTokens(self.tokens));
        }
        Ok(ParseOutcome::Parsed(self.result))
    }

    /// Handle the command `id` whose token was just removed from `pos`.
    fn process(&mut self, id: CommandId, pos: usize) -> Result<(), Interrupt> {
        let tree = self.tree;
        let node = tree.node(id);
        tracing::debug!(command = node.name(), position = pos, "matched command");

        self.intercept_builtins(pos)?;

        let matched_options = self.resolve_options(node, pos)?;
        self.finish_options(node);
        if node.requires_options() && matched_options == 0 {
            return Err(ParseError::MissingOption(node.name().to_string()).into());
        }

        // A command directly followed by one of its children passes through.
        let passes_through = self
            .tokens
            .get(pos)
            .is_some_and(|next| tree.child(id, next).is_some());
        let values = if passes_through {
            Vec::new()
        } else {
            self.take_arguments(node.name(), node.arg_count(), pos)?
        };

        let env = node.env_var().and_then(|var| self.env.var(var));
        self.result.record_match(node.lookup_key(), values, env);
        if let Some(action) = node.action() {
            self.result.set_action(Rc::clone(action));
        }

        self.descend(id)
    }

    fn intercept_builtins(&self, pos: usize) -> Result<(), Interrupt> {
        for token in &self.tokens[pos..] {
            match token.as_str() {
                HELP_LONG | HELP_SHORT => return Err(Interrupt::Help),
                VERSION_LONG | VERSION_SHORT => return Err(Interrupt::Version),
                _ => {}
            }
        }
        Ok(())
    }

    /// Consume this node's options from `pos` onwards; returns how many matched.
    fn resolve_options(&mut self, node: &'t CommandNode, pos: usize) -> ParseResult<usize> {
        let mut matched = 0;
        let mut i = pos;
        while i < self.tokens.len() {
            let token = self.tokens[i].clone();

            if token.starts_with("--") {
                if let Some((flag, value)) = token.rsplit_once('=') {
                    if let Some(option) = node.option(flag) {
                        if option.arg_count() != Arity::Exact(1) {
                            return Err(ParseError::InlineValue {
                                option: option.long().to_string(),
                                token: token.clone(),
                            });
                        }
                        if !is_usable_value(value) {
                            return Err(ParseError::MissingArguments {
                                name: option.long().to_string(),
                                expected: Arity::Exact(1),
                                found: 0,
                            });
                        }
                        self.tokens.remove(i);
                        tracing::trace!(option = option.long(), value, "matched inline value");
                        self.result
                            .record_match(option.lookup_key(), vec![value.to_string()], None);
                        matched += 1;
                        continue;
                    }
                    i += 1;
                    continue;
                }
            }

            if let Some(option) = node.option(&token) {
                self.tokens.remove(i);
                let values = self.take_arguments(option.long(), option.arg_count(), i)?;
                tracing::trace!(option = option.long(), values = ?values, "matched option");
                self.result.record_match(option.lookup_key(), values, None);
                matched += 1;
                continue;
            }

            i += 1;
        }
        Ok(matched)
    }

    /// Capture bound env values and inject defaults for this node's options.
    fn finish_options(&mut self, node: &'t CommandNode) {
        for option in node.options() {
            let key = option.lookup_key();
            let env = option.env_var().and_then(|var| self.env.var(var));
            if self.result.called(key) {
                if let Some(env) = env {
                    self.result.set_env(key, env);
                }
                continue;
            }
            let defaults = option.default_args();
            if !defaults.is_empty() {
                tracing::trace!(option = option.long(), defaults = ?defaults, "applied default");
            }
            self.result.record_unmatched(key, defaults, env);
        }
    }

    /// Remove the arguments owed by `owner` starting at `at`.
    fn take_arguments(&mut self, owner: &str, arity: Arity, at: usize) -> ParseResult<Vec<String>> {
        if arity.is_unbounded() {
            let end = self.tokens[at..]
                .iter()
                .position(|t| self.is_boundary(t))
                .map_or(self.tokens.len(), |offset| at + offset);
            let values: Vec<String> = self.tokens.drain(at..end).collect();
            if values.len() < arity.minimum() {
                return Err(ParseError::MissingArguments {
                    name: owner.to_string(),
                    expected: arity,
                    found: values.len(),
                });
            }
            return Ok(values);
        }

        let wanted = arity.minimum();
        for slot in 0..wanted {
            let usable = self
                .tokens
                .get(at + slot)
                .is_some_and(|t| is_usable_value(t));
            if !usable {
                return Err(ParseError::MissingArguments {
                    name: owner.to_string(),
                    expected: arity,
                    found: slot,
                });
            }
        }
        Ok(self.tokens.drain(at..at + wanted).collect())
    }

    /// Whether `token` ends an open-ended argument list.
    fn is_boundary(&self, token: &str) -> bool {
        if self.tree.is_known_token(token) {
            return true;
        }
        token.starts_with("--")
            && token
                .rsplit_once('=')
                .is_some_and(|(flag, _)| self.tree.is_known_token(flag))
    }

    fn descend(&mut self, id: CommandId) -> Result<(), Interrupt> {
        let tree = self.tree;
        let node = tree.node(id);

        let named: Vec<String> = self
            .tokens
            .iter()
            .filter(|t| tree.child(id, t).is_some())
            .cloned()
            .collect();
        if named.len() > 1 {
            return Err(ParseError::MultipleCommands { commands: named }.into());
        }

        for child in tree.children(id) {
            let name = tree.node(child).name();
            if let Some(pos) = self.tokens.iter().position(|t| t == name) {
                self.tokens.remove(pos);
                return self.process(child, pos);
            }
        }

        if node.requires_commands() {
            return Err(ParseError::MissingCommand(node.name().to_string()).into());
        }
        Ok(())
    }
}
