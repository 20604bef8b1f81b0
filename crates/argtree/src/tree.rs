//! The command/option tree.
//!
//! Nodes live in an arena owned by [`CommandTree`] and refer to each other by
//! [`CommandId`]. Children are owned top-down; `parent` is only an index used
//! for lineage checks and help rendering.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::arity::Arity;
use crate::error::DefinitionError;
use crate::result::Action;

pub const HELP_LONG: &str = "--help";
pub const HELP_SHORT: &str = "-h";
pub const VERSION_LONG: &str = "--version";
pub const VERSION_SHORT: &str = "-V";

/// Stable handle to a node in a [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

/// One switch, e.g. `--output` / `-o`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    long: String,
    short: Option<String>,
    description: String,
    env: Option<String>,
    arity: Arity,
    default_value: Option<String>,
    key: Option<String>,
}

impl OptionSpec {
    /// A switch taking no arguments. `short` may be `""` or `"-"` for none.
    pub fn new(
        long: impl Into<String>,
        short: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let short = short.into();
        Self {
            long: long.into(),
            short: if short.is_empty() || short == "-" {
                None
            } else {
                Some(short)
            },
            description: description.into(),
            env: None,
            arity: Arity::default(),
            default_value: None,
            key: None,
        }
    }

    pub fn arity(mut self, arity: impl Into<Arity>) -> Self {
        self.arity = arity.into();
        self
    }

    /// Bind an environment variable captured whenever the owning command matches.
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    /// Space-separated default arguments, used when the option is not given.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Store results under `key` instead of the long form.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn long(&self) -> &str {
        &self.long
    }

    pub fn short(&self) -> Option<&str> {
        self.short.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn env_var(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn arg_count(&self) -> Arity {
        self.arity
    }

    pub fn default_text(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// The default split into individual argument tokens.
    pub fn default_args(&self) -> Vec<String> {
        self.default_value
            .as_deref()
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn lookup_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.long)
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        if self.long.len() < 3 || !self.long.starts_with("--") || self.long.contains('=') {
            return Err(DefinitionError::InvalidLongOption(self.long.clone()));
        }
        if let Some(short) = &self.short {
            if short.len() < 2 || !short.starts_with('-') || short.contains('=') {
                return Err(DefinitionError::InvalidShortOption(short.clone()));
            }
        }
        Ok(())
    }
}

/// Everything needed to register a command.
#[derive(Clone, Default)]
pub struct CommandSpec {
    name: String,
    description: String,
    arity: Arity,
    env: Option<String>,
    key: Option<String>,
    action: Option<Action>,
    example_usage: String,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn arity(mut self, arity: impl Into<Arity>) -> Self {
        self.arity = arity.into();
        self
    }

    /// Bind an environment variable captured when this command matches.
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn action(mut self, action: impl Fn() -> i32 + 'static) -> Self {
        self.action = Some(Rc::new(action));
        self
    }

    pub fn example_usage(mut self, usage: impl Into<String>) -> Self {
        self.example_usage = usage.into();
        self
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("env", &self.env)
            .field("key", &self.key)
            .field("has_action", &self.action.is_some())
            .finish_non_exhaustive()
    }
}

/// One command or subcommand.
#[derive(Clone)]
pub struct CommandNode {
    name: String,
    key: Option<String>,
    description: String,
    example_usage: String,
    arity: Arity,
    env: Option<String>,
    action: Option<Action>,
    parent: Option<CommandId>,
    children: IndexMap<String, CommandId>,
    options: IndexMap<String, OptionSpec>,
    // short form -> long form
    short_options: IndexMap<String, String>,
    requires_commands: bool,
    requires_options: bool,
}

impl CommandNode {
    fn from_spec(spec: CommandSpec, parent: Option<CommandId>) -> Self {
        Self {
            name: spec.name,
            key: spec.key,
            description: spec.description,
            example_usage: spec.example_usage,
            arity: spec.arity,
            env: spec.env,
            action: spec.action,
            parent,
            children: IndexMap::new(),
            options: IndexMap::new(),
            short_options: IndexMap::new(),
            requires_commands: false,
            requires_options: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key results are stored under: the explicit key, else the name.
    pub fn lookup_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn example_usage(&self) -> &str {
        &self.example_usage
    }

    pub fn arg_count(&self) -> Arity {
        self.arity
    }

    pub fn env_var(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn parent(&self) -> Option<CommandId> {
        self.parent
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn requires_commands(&self) -> bool {
        self.requires_commands
    }

    pub fn requires_options(&self) -> bool {
        self.requires_options
    }

    /// Options in registration order.
    pub fn options(&self) -> impl Iterator<Item = &OptionSpec> {
        self.options.values()
    }

    /// Resolve a long or short form declared on this node.
    pub fn option(&self, token: &str) -> Option<&OptionSpec> {
        self.options.get(token).or_else(|| {
            self.short_options
                .get(token)
                .and_then(|long| self.options.get(long))
        })
    }

    pub(crate) fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("arity", &self.arity)
            .field("env", &self.env)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("options", &self.options)
            .field("requires_commands", &self.requires_commands)
            .field("requires_options", &self.requires_options)
            .field("has_action", &self.action.is_some())
            .finish_non_exhaustive()
    }
}

/// Arena of [`CommandNode`]s rooted at [`CommandTree::root`].
#[derive(Debug, Clone)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
    keys: HashSet<String>,
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new(CommandSpec::default())
    }
}

impl CommandTree {
    /// Create a tree whose root is described by `root`.
    ///
    /// `--help/-h` and `--version/-V` are registered on the root.
    pub fn new(root: CommandSpec) -> Self {
        let mut keys = HashSet::new();
        if let Some(key) = &root.key {
            keys.insert(key.clone());
        }
        let mut tree = Self {
            nodes: vec![CommandNode::from_spec(root, None)],
            keys,
        };
        let root = tree.root();
        for spec in [
            OptionSpec::new(HELP_LONG, HELP_SHORT, "Print usage information"),
            OptionSpec::new(VERSION_LONG, VERSION_SHORT, "Print version string"),
        ] {
            // A fresh root cannot collide with anything but a user-supplied root key.
            if let Err(err) = tree.try_add_option(root, spec) {
                panic!("{err}");
            }
        }
        tree
    }

    pub fn root(&self) -> CommandId {
        CommandId(0)
    }

    pub fn node(&self, id: CommandId) -> &CommandNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: CommandId) -> Option<CommandId> {
        self.node(id).parent
    }

    /// Children of `id`, in registration order.
    pub fn children(&self, id: CommandId) -> impl Iterator<Item = CommandId> + '_ {
        self.node(id).children.values().copied()
    }

    pub fn child(&self, id: CommandId, name: &str) -> Option<CommandId> {
        self.node(id).children.get(name).copied()
    }

    /// `id` followed by its ancestors up to the root.
    pub fn lineage(&self, id: CommandId) -> impl Iterator<Item = CommandId> + '_ {
        std::iter::successors(Some(id), move |&cur| self.parent(cur))
    }

    /// Every node below `id` (depth first, registration order).
    pub fn descendants(&self, id: CommandId) -> Vec<CommandId> {
        let mut out = Vec::new();
        let mut stack: Vec<CommandId> = self.children(id).collect();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mark = stack.len();
            stack.extend(self.children(next));
            stack[mark..].reverse();
        }
        out
    }

    /// Nodes from the root down to `id`.
    pub fn path(&self, id: CommandId) -> Vec<CommandId> {
        let mut path: Vec<CommandId> = self.lineage(id).collect();
        path.reverse();
        path
    }

    /// Follow command names in `tokens` from the root as deep as they go.
    ///
    /// Tokens that do not name a child of the current node are skipped.
    pub fn deepest_match<S: AsRef<str>>(&self, tokens: &[S]) -> CommandId {
        let mut current = self.root();
        for token in tokens {
            if let Some(next) = self.child(current, token.as_ref()) {
                current = next;
            }
        }
        current
    }

    /// Whether `token` is an option form or a non-root command name anywhere
    /// in the tree.
    pub fn is_known_token(&self, token: &str) -> bool {
        let root = self.root();
        self.nodes.iter().enumerate().any(|(idx, node)| {
            (idx != root.0 && node.name == token) || node.option(token).is_some()
        })
    }

    /// The root takes its key from the program name unless one was given, so
    /// that name must not already be claimed by another command or option.
    pub(crate) fn program_name_conflicts(&self, name: &str) -> bool {
        self.node(self.root()).key.is_none() && self.keys.contains(name)
    }

    pub(crate) fn set_root_name(&mut self, name: &str) {
        let root = self.root();
        self.nodes[root.0].name = name.to_string();
    }

    pub(crate) fn node_mut(&mut self, id: CommandId) -> &mut CommandNode {
        &mut self.nodes[id.0]
    }

    /// Fluent handle for the node `id`.
    pub fn command_mut(&mut self, id: CommandId) -> CommandMut<'_> {
        CommandMut::new(self, id)
    }

    pub fn root_mut(&mut self) -> CommandMut<'_> {
        let root = self.root();
        CommandMut::new(self, root)
    }

    /// Register an option on `id`.
    ///
    /// Long and short forms must be unique along the node's lineage (the
    /// node, its ancestors and its descendants); the lookup key must be
    /// unique in the whole tree.
    pub fn try_add_option(&mut self, id: CommandId, spec: OptionSpec) -> Result<(), DefinitionError> {
        spec.validate()?;

        let lineage: Vec<CommandId> = self
            .lineage(id)
            .chain(self.descendants(id))
            .collect();
        for node_id in lineage {
            let node = self.node(node_id);
            if node.options.contains_key(&spec.long) {
                return Err(DefinitionError::DuplicateLongOption {
                    option: spec.long.clone(),
                    command: self.node(id).name.clone(),
                });
            }
            if let Some(short) = &spec.short {
                if node.short_options.contains_key(short) {
                    return Err(DefinitionError::DuplicateShortOption {
                        option: short.clone(),
                        command: self.node(id).name.clone(),
                    });
                }
            }
        }

        let key = spec.lookup_key().to_string();
        if self.keys.contains(&key) {
            return Err(DefinitionError::DuplicateKey(key));
        }
        self.keys.insert(key);

        let node = self.node_mut(id);
        if let Some(short) = &spec.short {
            node.short_options.insert(short.clone(), spec.long.clone());
        }
        node.options.insert(spec.long.clone(), spec);
        Ok(())
    }

    /// Register a child command under `parent`.
    pub fn try_add_command(
        &mut self,
        parent: CommandId,
        spec: CommandSpec,
    ) -> Result<CommandId, DefinitionError> {
        if spec.name.is_empty() {
            return Err(DefinitionError::EmptyCommandName);
        }
        if self.node(parent).children.contains_key(&spec.name) {
            return Err(DefinitionError::DuplicateCommand {
                name: spec.name,
                parent: self.node(parent).name.clone(),
            });
        }
        let key = spec.key.clone().unwrap_or_else(|| spec.name.clone());
        if self.keys.contains(&key) {
            return Err(DefinitionError::DuplicateKey(key));
        }
        self.keys.insert(key);

        let id = CommandId(self.nodes.len());
        let name = spec.name.clone();
        self.nodes.push(CommandNode::from_spec(spec, Some(parent)));
        self.node_mut(parent).children.insert(name, id);
        Ok(id)
    }
}

/// Fluent handle for configuring one node of a [`CommandTree`].
///
/// The plain methods panic on definition errors; use the `try_*` methods to
/// get the [`DefinitionError`] instead.
pub struct CommandMut<'t> {
    tree: &'t mut CommandTree,
    id: CommandId,
}

impl<'t> CommandMut<'t> {
    pub(crate) fn new(tree: &'t mut CommandTree, id: CommandId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn node(&self) -> &CommandNode {
        self.tree.node(self.id)
    }

    /// # Panics
    ///
    /// Panics if the option is malformed or collides with an existing one.
    pub fn add_option(&mut self, spec: OptionSpec) -> &mut Self {
        if let Err(err) = self.tree.try_add_option(self.id, spec) {
            panic!("{err}");
        }
        self
    }

    pub fn try_add_option(&mut self, spec: OptionSpec) -> Result<&mut Self, DefinitionError> {
        self.tree.try_add_option(self.id, spec)?;
        Ok(self)
    }

    /// Add a subcommand without arguments or env binding.
    ///
    /// # Panics
    ///
    /// Panics if the name is empty, already a sibling, or its key is taken.
    pub fn add_command(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> CommandMut<'_> {
        self.add_command_with(CommandSpec::new(name, description))
    }

    /// Add a subcommand with arity, env binding, key or action.
    ///
    /// # Panics
    ///
    /// Same conditions as [`CommandMut::add_command`].
    pub fn add_command_with(&mut self, spec: CommandSpec) -> CommandMut<'_> {
        match self.try_add_command(spec) {
            Ok(child) => child,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_add_command(&mut self, spec: CommandSpec) -> Result<CommandMut<'_>, DefinitionError> {
        let id = self.tree.try_add_command(self.id, spec)?;
        Ok(CommandMut::new(self.tree, id))
    }

    /// Parsing fails if none of this node's children is given.
    pub fn require_commands(&mut self) -> &mut Self {
        self.tree.node_mut(self.id).requires_commands = true;
        self
    }

    /// Parsing fails if none of this node's options is given.
    pub fn require_options(&mut self) -> &mut Self {
        self.tree.node_mut(self.id).requires_options = true;
        self
    }

    pub fn set_action(&mut self, action: impl Fn() -> i32 + 'static) -> &mut Self {
        self.tree.node_mut(self.id).action = Some(Rc::new(action));
        self
    }

    pub fn add_example_usage(&mut self, usage: impl Into<String>) -> &mut Self {
        self.tree.node_mut(self.id).example_usage = usage.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (CommandTree, CommandId, CommandId) {
        let mut tree = CommandTree::default();
        let root = tree.root();
        tree.try_add_option(
            root,
            OptionSpec::new("--globalx", "-x", "global switch x").arity(2),
        )
        .unwrap();
        let init = tree
            .try_add_command(root, CommandSpec::new("init", "initialize").arity(1).env("HOME"))
            .unwrap();
        let remove = tree
            .try_add_command(root, CommandSpec::new("remove", "remove"))
            .unwrap();
        (tree, init, remove)
    }

    #[test]
    fn builtins_are_registered_on_the_root() {
        let tree = CommandTree::default();
        let root = tree.node(tree.root());
        assert!(root.option(HELP_LONG).is_some());
        assert_eq!(root.option(HELP_SHORT).map(OptionSpec::long), Some(HELP_LONG));
        assert_eq!(root.option(VERSION_SHORT).map(OptionSpec::long), Some(VERSION_LONG));
    }

    #[test]
    fn rejects_malformed_long_options() {
        let mut tree = CommandTree::default();
        let root = tree.root();
        for bad in ["--", "-x", "abc", "--a=b"] {
            let err = tree
                .try_add_option(root, OptionSpec::new(bad, "", ""))
                .unwrap_err();
            assert_eq!(err, DefinitionError::InvalidLongOption(bad.to_string()));
        }
    }

    #[test]
    fn rejects_malformed_short_options() {
        let mut tree = CommandTree::default();
        let root = tree.root();
        let err = tree
            .try_add_option(root, OptionSpec::new("--verbose", "v", ""))
            .unwrap_err();
        assert_eq!(err, DefinitionError::InvalidShortOption("v".to_string()));
    }

    #[test]
    fn dash_short_form_means_none() {
        let spec = OptionSpec::new("--quiet", "-", "");
        assert_eq!(spec.short(), None);
        assert_eq!(OptionSpec::new("--quiet", "", "").short(), None);
    }

    #[test]
    fn rejects_duplicate_long_option_on_same_node() {
        let (mut tree, _, _) = sample();
        let root = tree.root();
        let err = tree
            .try_add_option(root, OptionSpec::new("--globalx", "", "again"))
            .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateLongOption { .. }));
    }

    #[test]
    fn rejects_option_shadowing_an_ancestor() {
        let (mut tree, init, _) = sample();
        let err = tree
            .try_add_option(init, OptionSpec::new("--other", "-x", "").key("other"))
            .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::DuplicateShortOption {
                option: "-x".to_string(),
                command: "init".to_string(),
            }
        );
        let err = tree
            .try_add_option(init, OptionSpec::new("--help", "", "").key("init-help"))
            .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateLongOption { .. }));
    }

    #[test]
    fn rejects_option_shadowed_by_a_descendant() {
        let (mut tree, init, _) = sample();
        tree.try_add_option(init, OptionSpec::new("--initoption", "-i", ""))
            .unwrap();
        let root = tree.root();
        let err = tree
            .try_add_option(root, OptionSpec::new("--inner", "-i", ""))
            .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateShortOption { .. }));
    }

    #[test]
    fn sibling_subtrees_may_reuse_forms_with_distinct_keys() {
        let (mut tree, init, remove) = sample();
        tree.try_add_option(init, OptionSpec::new("--force", "-f", ""))
            .unwrap();
        let err = tree
            .try_add_option(remove, OptionSpec::new("--force", "-f", ""))
            .unwrap_err();
        assert_eq!(err, DefinitionError::DuplicateKey("--force".to_string()));
        tree.try_add_option(remove, OptionSpec::new("--force", "-f", "").key("remove-force"))
            .unwrap();
    }

    #[test]
    fn rejects_empty_and_duplicate_commands() {
        let (mut tree, init, _) = sample();
        let root = tree.root();
        assert_eq!(
            tree.try_add_command(root, CommandSpec::new("", "")).unwrap_err(),
            DefinitionError::EmptyCommandName
        );
        assert!(matches!(
            tree.try_add_command(root, CommandSpec::new("init", "")).unwrap_err(),
            DefinitionError::DuplicateCommand { .. }
        ));
        // same name elsewhere in the tree collides on the lookup key
        assert_eq!(
            tree.try_add_command(init, CommandSpec::new("remove", "")).unwrap_err(),
            DefinitionError::DuplicateKey("remove".to_string())
        );
        tree.try_add_command(init, CommandSpec::new("remove", "").key("init-remove"))
            .unwrap();
    }

    #[test]
    fn navigation_follows_registration_order() {
        let (mut tree, init, remove) = sample();
        let sub = tree
            .try_add_command(init, CommandSpec::new("subinit", ""))
            .unwrap();
        let root = tree.root();
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![init, remove]);
        assert_eq!(tree.child(init, "subinit"), Some(sub));
        assert_eq!(tree.parent(sub), Some(init));
        assert_eq!(tree.path(sub), vec![root, init, sub]);
        assert_eq!(tree.descendants(root), vec![init, sub, remove]);
    }

    #[test]
    fn deepest_match_skips_unrelated_tokens() {
        let (mut tree, init, _) = sample();
        let sub = tree
            .try_add_command(init, CommandSpec::new("subinit", ""))
            .unwrap();
        assert_eq!(tree.deepest_match(&["init", "a", "subinit", "--help"]), sub);
        assert_eq!(tree.deepest_match(&["subinit"]), tree.root());
        assert_eq!(tree.deepest_match::<&str>(&[]), tree.root());
    }

    #[test]
    fn known_tokens_cover_every_form() {
        let (tree, _, _) = sample();
        for token in ["init", "remove", "--globalx", "-x", "--help", "-h", "-V"] {
            assert!(tree.is_known_token(token), "{token} should be known");
        }
        assert!(!tree.is_known_token("x"));
        assert!(!tree.is_known_token("--globalx=1"));
    }

    #[test]
    fn program_name_must_not_shadow_a_key() {
        let (tree, _, _) = sample();
        assert!(tree.program_name_conflicts("remove"));
        assert!(tree.program_name_conflicts("--globalx"));
        assert!(!tree.program_name_conflicts("prog"));

        let keyed = CommandTree::new(CommandSpec::new("remove", "").key("main"));
        assert!(!keyed.program_name_conflicts("remove"));
    }

    #[test]
    fn command_mut_chains_configuration() {
        let mut tree = CommandTree::default();
        let root = tree.root();
        let mut handle = CommandMut::new(&mut tree, root);
        let sub = handle
            .add_command("remove", "remove things")
            .add_command("subremove", "sub remove")
            .add_option(OptionSpec::new("--all", "-a", "everything"))
            .require_options()
            .id();
        assert_eq!(tree.node(sub).name(), "subremove");
        assert!(tree.node(sub).requires_options());
        assert!(tree.node(sub).option("-a").is_some());
    }

    #[test]
    #[should_panic(expected = "command already exists")]
    fn plain_builder_panics_on_definition_errors() {
        let mut tree = CommandTree::default();
        let root = tree.root();
        let mut handle = CommandMut::new(&mut tree, root);
        handle.add_command("init", "");
        handle.add_command("init", "");
    }
}
