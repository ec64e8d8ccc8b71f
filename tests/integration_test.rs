use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use std::path::Path;
use std::process;
use tempfile::tempdir;

fn git_available() -> bool {
    process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = process::Command::new("git")
        .args([
            "-c",
            "user.name=gitdex",
            "-c",
            "user.email=gitdex@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

/// A repository with tags `v1.0`, `v1.1`, `notaversion` and a single branch `main`.
fn create_demo_repo(dir: &Path) {
    git(dir, &["init", "-q"]);
    git(dir, &["checkout", "-q", "-b", "main"]);
    git(dir, &["commit", "-q", "--allow-empty", "-m", "initial"]);
    for tag in ["v1.0", "v1.1", "notaversion"] {
        git(dir, &["tag", tag]);
    }
}

fn gitdex() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("gitdex"));
    cmd.env_remove("GITDEX_CONFIG").env("RUST_LOG", "warn");
    cmd
}

const STATIC_INDEX: &str = r#"
[[package]]
name = "pysorter"
kind = "static"
links = [{ name = "pysorter-develop", url = "git+file:///src/pysorter@develop" }]

[[package]]
name = "My-Tool"
kind = "static"
links = [{ name = "my-tool-2.0", url = "https://example.com/my-tool-2.0.tar.gz" }]
"#;

#[test]
fn test_list_and_links_for_static_packages() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("index.toml");
    std::fs::write(&config, STATIC_INDEX).unwrap();

    gitdex()
        .arg("list")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout("pysorter\nMy-Tool\n");

    gitdex()
        .args(["links", "pysorter", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(
            "pysorter-develop --> git+file:///src/pysorter@develop#egg=pysorter-develop\n",
        );

    // Lookup goes through the same case and underscore fallback as the server.
    gitdex()
        .args(["links", "my_tool"])
        .env("GITDEX_CONFIG", &config)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "my-tool-2.0 --> https://example.com/my-tool-2.0.tar.gz",
        ));
}

#[test]
fn test_links_for_unknown_package_fails() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("index.toml");
    std::fs::write(&config, STATIC_INDEX).unwrap();

    gitdex()
        .args(["links", "gamma", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("gamma"));
}

#[test]
fn test_invalid_index_file_fails() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("index.toml");
    std::fs::write(&config, "[[package]]\nname = \"demo\"\nkind = \"git\"\n").unwrap();

    gitdex()
        .arg("list")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires 'path'"));

    gitdex()
        .arg("list")
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn test_links_for_local_git_repository() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let dir = tempdir().unwrap();
    let repo = dir.path().join("demo");
    std::fs::create_dir(&repo).unwrap();
    create_demo_repo(&repo);

    // `path` is relative to the index file.
    let config = dir.path().join("index.toml");
    std::fs::write(
        &config,
        "[[package]]\nname = \"demo\"\nkind = \"git\"\npath = \"demo\"\nstrip_v = true\n",
    )
    .unwrap();

    let assert = gitdex()
        .args(["links", "demo", "--config"])
        .arg(&config)
        .assert()
        .success();
    let output = assert.get_output();
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    let stderr = String::from_utf8(output.stderr.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 3, "unexpected output: {}", stdout);
    assert!(lines[0].starts_with("demo-1.0 --> git+file:///"));
    assert!(lines[0].ends_with("/demo@v1.0#egg=demo-1.0"));
    assert!(lines[1].starts_with("demo-1.1 --> git+file:///"));
    assert!(lines[1].ends_with("/demo@v1.1#egg=demo-1.1"));
    assert!(lines[2].starts_with("demo-main --> git+file:///"));
    assert!(lines[2].ends_with("/demo@main#egg=demo-main"));
    assert!(!stdout.contains("notaversion"));
    assert!(
        stderr.contains("ignoring non semantic version tag: notaversion"),
        "missing skip warning: {}",
        stderr
    );
    // The leading `/` of the absolute path is not doubled.
    assert!(!stdout.contains("file:////"));
}

#[test]
fn test_serve_refuses_missing_repository() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let dir = tempdir().unwrap();
    let plain = dir.path().join("plain");
    std::fs::create_dir(&plain).unwrap();

    let config = dir.path().join("index.toml");
    std::fs::write(
        &config,
        format!(
            "{}\n[[package]]\nname = \"plain\"\nkind = \"git\"\npath = \"plain\"\n",
            STATIC_INDEX
        ),
    )
    .unwrap();

    gitdex()
        .args(["serve", "--port", "0", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not inside a git repository"))
        .stderr(predicate::str::contains("--allow-partial"));

    // The remaining packages are still listed.
    gitdex()
        .arg("list")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout("pysorter\nMy-Tool\n");
}
