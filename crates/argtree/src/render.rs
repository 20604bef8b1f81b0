//! Usage, help and version text.
//!
//! Output order is registration order for both commands and options.

use crate::arity::Arity;
use crate::tree::{CommandId, CommandTree, OptionSpec};

fn value_placeholder(arity: Arity) -> String {
    match arity {
        Arity::Exact(n) => " <ARG>".repeat(n),
        Arity::AtLeastOne => " <ARG>...".to_string(),
        Arity::ZeroOrMore => " [ARG]...".to_string(),
    }
}

fn format_option_left(option: &OptionSpec) -> String {
    let mut out = option.long().to_string();
    if let Some(short) = option.short() {
        out.push_str(", ");
        out.push_str(short);
    }
    out.push_str(&value_placeholder(option.arg_count()));
    out
}

fn format_option_help(option: &OptionSpec) -> String {
    let mut out = option.description().trim().to_string();
    let mut push = |extra: String| {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&extra);
    };
    if let Some(default) = option.default_text() {
        push(format!("[default: {default}]"));
    }
    if let Some(var) = option.env_var() {
        push(format!("[env: {var}]"));
    }
    out
}

fn push_rows(out: &mut String, rows: &[(String, String)]) {
    let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (left, help) in rows {
        if help.is_empty() {
            out.push_str(&format!("  {left}\n"));
        } else {
            out.push_str(&format!("  {left:width$}  {help}\n"));
        }
    }
}

fn command_rows(tree: &CommandTree, id: CommandId, prefix: &str, rows: &mut Vec<(String, String)>) {
    let node = tree.node(id);
    rows.push((
        format!("{prefix}{}:", node.name()),
        node.description().trim().to_string(),
    ));
    let nested = format!("  {prefix}");
    for child in tree.children(id) {
        command_rows(tree, child, &nested, rows);
    }
}

/// Render help for `target`: usage, its command subtree, its options and
/// its example usage.
pub fn help(tree: &CommandTree, target: CommandId, global_usage: &str) -> String {
    let node = tree.node(target);
    let mut out = String::new();

    if !global_usage.trim().is_empty() {
        out.push_str(&format!("Usage: {}\n", global_usage.trim()));
    }

    out.push_str("\nCommands:\n");
    let mut rows = Vec::new();
    command_rows(tree, target, "- ", &mut rows);
    push_rows(&mut out, &rows);

    let options: Vec<(String, String)> = node
        .options()
        .map(|o| (format_option_left(o), format_option_help(o)))
        .collect();
    if !options.is_empty() {
        out.push_str("\nOptions:\n");
        push_rows(&mut out, &options);
    }

    if !node.example_usage().trim().is_empty() {
        out.push_str(&format!("\nExample Usage: {}\n", node.example_usage().trim()));
    }

    out
}

/// Render the version line for the program at the root of `tree`.
pub fn version(tree: &CommandTree, version: &str) -> String {
    let name = tree.node(tree.root()).name();
    if version.trim().is_empty() {
        format!("{name}\n")
    } else {
        format!("{name} {}\n", version.trim())
    }
}

/// Dump every command and option of the tree.
pub fn describe(tree: &CommandTree) -> String {
    let mut out = String::from("Parser information:\n\n");
    let root = tree.root();
    for id in std::iter::once(root).chain(tree.descendants(root)) {
        let node = tree.node(id);
        out.push_str(&format!("name: {}\n", node.name()));
        out.push_str(&format!("description: {}\n", node.description()));
        out.push_str(&format!("ENV variable: {}\n", node.env_var().unwrap_or("")));
        out.push_str(&format!("expected arguments: {}\n", node.arg_count()));
        if let Some(parent) = node.parent() {
            out.push_str(&format!("Parent Command: {}\n", tree.node(parent).name()));
        }
        let path: Vec<&str> = tree.path(id).into_iter().map(|p| tree.node(p).name()).collect();
        out.push_str(&format!("Command path: {}\n", path.join(" ")));
        out.push_str(&format!("Has action: {}\n", node.has_action()));
        out.push('\n');
        for option in node.options() {
            out.push_str(&format!("Long option: {}\n", option.long()));
            out.push_str(&format!("Short option: {}\n", option.short().unwrap_or("")));
            out.push_str(&format!("Option description: {}\n", option.description()));
            out.push_str(&format!("Option ENV variable: {}\n", option.env_var().unwrap_or("")));
            out.push_str(&format!("Option expected arguments: {}\n", option.arg_count()));
            out.push_str(&format!("Option parent: {}\n\n", node.name()));
        }
    }
    out
}
