mod project;

use anyhow::{Context, Result, anyhow, bail};
use argtree::{ArgParser, ArgumentRecord, Arity, CommandSpec, OptionSpec, USAGE_EXIT_CODE};
use indexmap::IndexMap;
use std::cell::OnceCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::{EnvFilter, fmt};

use crate::project::{PROJECT_FILE_NAME, Project, load_project};

type Records = IndexMap<String, ArgumentRecord>;

/// Parsed records, filled in once parsing succeeds and read by the actions.
type Snapshot = Rc<OnceCell<Records>>;

fn main() -> Result<()> {
    init_tracing();

    let snapshot = Snapshot::default();
    let mut parser = build_parser(&snapshot);
    let parsed = parser.parse(std::env::args());

    if parsed.called("--describe") {
        print!("{}", parser.describe());
        return Ok(());
    }
    if parsed.called("--verbose") {
        eprint!("{parsed}");
    }
    if parsed.called("--json") {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    if !parsed.has_action() {
        eprintln!("error: no command given");
        eprint!("{}", parser.help_message(parser.tree().root()));
        std::process::exit(USAGE_EXIT_CODE);
    }

    snapshot
        .set(parsed.records().clone())
        .map_err(|_| anyhow!("parsed arguments were already captured"))?;
    let code = parsed.invoke().context("nothing to run")?;
    std::process::exit(code);
}

fn build_parser(snapshot: &Snapshot) -> ArgParser {
    let mut parser = ArgParser::with_root(CommandSpec::new(
        "argtree-demo",
        "Example CLI built on a command tree",
    ));
    parser
        .add_global_usage("argtree-demo [--SWITCH [ARG]] COMMAND [ARGS]")
        .set_version(env!("CARGO_PKG_VERSION"))
        .add_option(OptionSpec::new("--verbose", "-v", "Print the parsed arguments to stderr"))
        .add_option(OptionSpec::new("--json", "", "Print the parsed arguments as JSON instead of running"))
        .add_option(OptionSpec::new("--describe", "", "Print every command and option"));

    parser
        .add_command_with(
            CommandSpec::new("init", "Create a project directory")
                .arity(1)
                .env("HOME")
                .action(action(snapshot, init)),
        )
        .add_option(
            OptionSpec::new("--name", "-n", "Project name")
                .arity(1)
                .default_value("example")
                .env("ARGTREE_NAME"),
        )
        .add_example_usage("argtree-demo init ./my-project --name demo");

    parser
        .add_command_with(
            CommandSpec::new("remove", "Remove files (dry run unless --force)")
                .arity(Arity::AtLeastOne)
                .action(action(snapshot, remove)),
        )
        .add_option(OptionSpec::new("--force", "-f", "Actually delete the files"));

    {
        let mut config = parser.add_command("config", "Read or write project settings");
        config.require_commands();
        config.add_command_with(
            CommandSpec::new("get", "Print a setting")
                .arity(1)
                .action(action(snapshot, config_get)),
        );
        config
            .add_command_with(
                CommandSpec::new("set", "Store a setting")
                    .arity(2)
                    .action(action(snapshot, config_set)),
            )
            .add_example_usage("argtree-demo config set editor vim");
    }

    parser
        .add_command_with(CommandSpec::new("list", "List release tags").action(action(snapshot, list)))
        .add_option(
            OptionSpec::new("--tags", "-t", "Tags to list")
                .arity(Arity::ZeroOrMore)
                .default_value("stable latest")
                .env("ARGTREE_TAGS"),
        );

    parser
}

/// Bind `run` to the parsed records; errors are reported and mapped to status 1.
fn action(snapshot: &Snapshot, run: fn(&Records) -> Result<()>) -> impl Fn() -> i32 + 'static {
    let snapshot = Rc::clone(snapshot);
    move || {
        let result = snapshot
            .get()
            .ok_or_else(|| anyhow!("parsed arguments are not available"))
            .and_then(run);
        match result {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("error: {err:#}");
                1
            }
        }
    }
}

fn record<'a>(records: &'a Records, key: &str) -> Option<&'a ArgumentRecord> {
    records.get(key)
}

fn values<'a>(records: &'a Records, key: &str) -> &'a [String] {
    record(records, key).map(ArgumentRecord::values).unwrap_or_default()
}

fn arg<'a>(records: &'a Records, key: &str, index: usize) -> Result<&'a str> {
    record(records, key)
        .and_then(|r| r.value(index))
        .with_context(|| format!("missing argument {index} for {key}"))
}

/// An option's values: the command line first, then its env var, then its default.
fn setting(records: &Records, key: &str) -> Vec<String> {
    let Some(record) = record(records, key) else {
        return Vec::new();
    };
    if record.was_matched() {
        return record.values().to_vec();
    }
    if let Some(env) = record.env() {
        return env.split_whitespace().map(str::to_string).collect();
    }
    record.values().to_vec()
}

fn init(records: &Records) -> Result<()> {
    let dir = PathBuf::from(arg(records, "init", 0)?);
    let name = setting(records, "--name").join(" ");
    if name.is_empty() {
        bail!("project name must not be empty");
    }
    tracing::debug!(dir = %dir.display(), name = %name, "initializing project");

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let path = dir.join(PROJECT_FILE_NAME);
    if path.exists() {
        bail!("{PROJECT_FILE_NAME} already exists in {}", dir.display());
    }
    Project::new(&name).save(&path)?;

    println!("Created: {}", path.display());
    if let Some(home) = record(records, "init").and_then(ArgumentRecord::env) {
        eprintln!("(HOME is {home})");
    }
    Ok(())
}

fn remove(records: &Records) -> Result<()> {
    let force = record(records, "--force").is_some_and(ArgumentRecord::was_matched);
    for item in values(records, "remove") {
        if force {
            fs::remove_file(item).with_context(|| format!("failed to remove {item}"))?;
            println!("removed {item}");
        } else {
            println!("would remove {item}");
        }
    }
    Ok(())
}

fn config_get(records: &Records) -> Result<()> {
    let key = arg(records, "get", 0)?;
    let (_, project) = load_project()?;
    let value = project
        .setting(key)
        .with_context(|| format!("no setting named '{key}'"))?;
    println!("{value}");
    Ok(())
}

fn config_set(records: &Records) -> Result<()> {
    let key = arg(records, "set", 0)?;
    let value = arg(records, "set", 1)?;
    let (path, mut project) = load_project()?;
    project.set(key, value);
    project.save(&path)?;
    println!("{key} = {value}");
    Ok(())
}

fn list(records: &Records) -> Result<()> {
    for tag in setting(records, "--tags") {
        println!("{tag}");
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
