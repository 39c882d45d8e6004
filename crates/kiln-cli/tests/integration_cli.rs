//! Integration tests for the `kiln` binary.
//!
//! These run the real executable against throwaway projects.

#![allow(clippy::disallowed_methods)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn create_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(
        root,
        "index.html",
        "<html>\n  <head>\n    <!-- inject:css -->\n    <!-- endinject -->\n  </head>\n  <body>\n    <!-- inject:js -->\n    <!-- endinject -->\n  </body>\n</html>\n",
    );
    write(
        root,
        "app/main.ts",
        "const title: string = \"kiln\";\ndocument.title = title;\n",
    );
    write(root, "app/main.html", "<main></main>\n");
    write(root, "styles/site.css", "main {\n  display: block;\n}\n");
    write(root, "server.js", "console.log(process.env.PORT);\n");

    temp
}

fn kiln(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kiln").unwrap();
    cmd.arg("--cwd").arg(root).arg("--no-color");
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("kiln")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Task-graph build pipeline"));
}

#[test]
fn test_list_prints_prerequisites() {
    let project = create_project();

    kiln(project.path())
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("<- js, css"))
        .stdout(predicate::str::contains("server-js"));
}

#[test]
fn test_unknown_task_is_rejected() {
    let project = create_project();

    kiln(project.path())
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown task 'deploy'"));
}

#[test]
fn test_default_build() {
    let project = create_project();
    let root = project.path();

    kiln(root).arg("--quiet").assert().success();

    for rel in [
        "dist/app/bundle.js",
        "dist/app/bundle.js.map",
        "dist/app/main.html",
        "dist/css/site.css",
        "dist/index.html",
        "dist/server.js",
    ] {
        assert!(root.join(rel).is_file(), "missing {rel}");
    }

    let html = fs::read_to_string(root.join("dist/index.html")).unwrap();
    assert!(html.contains("app/bundle.js"));
    assert!(html.contains("css/site.css"));
}

#[test]
fn test_single_task_runs_only_its_prerequisites() {
    let project = create_project();
    let root = project.path();

    kiln(root).args(["--quiet", "css"]).assert().success();

    assert!(root.join("dist/css/site.css").is_file());
    assert!(!root.join("dist/app/bundle.js").exists());
    assert!(!root.join("dist/index.html").exists());
}

#[test]
fn test_out_dir_flag() {
    let project = create_project();
    let root = project.path();

    kiln(root)
        .args(["--quiet", "--out-dir", "public", "js"])
        .assert()
        .success();

    assert!(root.join("public/app/bundle.js").is_file());
    assert!(!root.join("dist").exists());
}

#[test]
fn test_missing_template_fails_the_run() {
    let project = create_project();
    let root = project.path();
    fs::remove_file(root.join("index.html")).unwrap();

    kiln(root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task 'html' failed"));
}

#[test]
fn test_compile_error_is_reported_but_not_fatal() {
    let project = create_project();
    let root = project.path();
    write(root, "app/main.ts", "const broken: string = ;\n");

    kiln(root).arg("js").assert().success();
}

#[test]
fn test_lint_findings_are_printed_once() {
    let project = create_project();
    let root = project.path();
    write(root, "app/main.ts", "var greeting = \"hi\";\nconsole.log(greeting);\n");

    let output = kiln(root)
        .env_remove("RUST_LOG")
        .arg("lint")
        .output()
        .unwrap();
    assert!(output.status.success());

    let printed = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(printed.matches("Forbidden 'var' keyword").count(), 1);
    assert!(printed.contains("with 1 error(s)"));
}

#[test]
fn test_invalid_config_shows_hint() {
    let project = create_project();
    let root = project.path();
    write(root, "kiln.toml", "[dev]\nport = 3011\n");

    kiln(root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("dev.port"));
}
