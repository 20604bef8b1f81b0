use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn make_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before UNIX_EPOCH")
        .as_nanos();
    let pid = std::process::id();
    let dir = std::env::temp_dir().join(format!("argtree-integ-{prefix}-{pid}-{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn demo() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_argtree-demo"));
    cmd.env_remove("ARGTREE_NAME")
        .env_remove("ARGTREE_TAGS")
        .env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to run argtree-demo")
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} failed:\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr),
    );
}

#[test]
fn help_works() {
    let out = run(demo().arg("--help"));
    assert_success(&out, "argtree-demo --help");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.starts_with("Usage: argtree-demo")
            && stdout.contains("- init:")
            && stdout.contains("  - set:")
            && stdout.contains("--verbose, -v"),
        "unexpected help output:\n{stdout}"
    );
}

#[test]
fn subcommand_help_is_scoped_to_the_command() {
    let out = run(demo().args(["init", "-h"]));
    assert_success(&out, "argtree-demo init -h");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("--name, -n <ARG>"), "{stdout}");
    assert!(stdout.contains("Example Usage: argtree-demo init"), "{stdout}");
    assert!(!stdout.contains("- remove:"), "{stdout}");
}

#[test]
fn version_prints_name_and_version() {
    let out = run(demo().arg("--version"));
    assert_success(&out, "argtree-demo --version");
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        format!("argtree-demo {}\n", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn usage_errors_exit_with_status_2() {
    let out = run(demo().args(["remove"]));
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("error: "), "{stderr}");
    assert!(stderr.contains("- remove:"), "help for the failing command:\n{stderr}");

    let out = run(demo().args(["list", "bogus"]));
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("'bogus'"));

    let out = run(demo().args(["config"]));
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn no_command_prints_help() {
    let out = run(&mut demo());
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no command given"));
}

#[test]
fn init_then_config_round_trip() {
    let dir = make_temp_dir("init-config");
    let project = dir.join("proj");

    let out = run(demo().arg("init").arg(&project).args(["--name", "demo"]));
    assert_success(&out, "argtree-demo init");
    assert!(project.join("argtree.json").is_file(), "argtree.json not created");

    let out = run(demo().current_dir(&project).args(["config", "set", "editor", "vim"]));
    assert_success(&out, "argtree-demo config set");

    let out = run(demo().current_dir(&project).args(["config", "get", "editor"]));
    assert_success(&out, "argtree-demo config get");
    assert_eq!(String::from_utf8_lossy(&out.stdout), "vim\n");

    let out = run(demo().current_dir(&project).args(["config", "get", "name"]));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "demo\n");

    let out = run(demo().arg("init").arg(&project));
    assert_eq!(out.status.code(), Some(1), "second init must fail");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn init_name_falls_back_to_env() {
    let dir = make_temp_dir("init-env");
    let out = run(demo().env("ARGTREE_NAME", "from-env").arg("init").arg(&dir));
    assert_success(&out, "argtree-demo init");
    let json = fs::read_to_string(dir.join("argtree.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["name"], "from-env");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn list_uses_defaults_env_and_flags() {
    let out = run(demo().arg("list"));
    assert_success(&out, "argtree-demo list");
    assert_eq!(String::from_utf8_lossy(&out.stdout), "stable\nlatest\n");

    let out = run(demo().env("ARGTREE_TAGS", "nightly").arg("list"));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "nightly\n");

    let out = run(demo().args(["list", "--tags", "a", "b"]));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "a\nb\n");
}

#[test]
fn remove_is_a_dry_run_without_force() {
    let dir = make_temp_dir("remove");
    let file = dir.join("victim.txt");
    fs::write(&file, "x").unwrap();

    let out = run(demo().arg("remove").arg(&file));
    assert_success(&out, "argtree-demo remove");
    assert!(file.exists());

    let out = run(demo().arg("remove").arg(&file).arg("-f"));
    assert_success(&out, "argtree-demo remove -f");
    assert!(!file.exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn json_prints_records_without_running() {
    let out = run(demo().args(["--json", "config", "set", "k", "v"]));
    assert_success(&out, "argtree-demo --json");
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["set"]["values"], serde_json::json!(["k", "v"]));
    assert_eq!(value["--json"]["matched"], true);
    assert_eq!(value["config"]["matched"], true);
}

#[test]
fn describe_dumps_the_tree() {
    let out = run(demo().arg("--describe"));
    assert_success(&out, "argtree-demo --describe");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Parent Command: config"), "{stdout}");
    assert!(stdout.contains("Option ENV variable: ARGTREE_NAME"), "{stdout}");
}
