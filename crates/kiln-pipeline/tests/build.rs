//! End-to-end builds of a small project laid out like the default config.

#![allow(clippy::disallowed_methods)]

use kiln_graph::TraceEvent;
use kiln_pipeline::{BuildMode, NoopReload, PathConfig, Pipeline, ReloadBuffer, ReloadSignal};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const INDEX_HTML: &str = "<!DOCTYPE html>
<html>
  <head>
    <title>  Demo  </title>
    <!-- inject:css -->
    <!-- endinject -->
  </head>
  <body>
    <demo-app>Loading...</demo-app>
    <!-- inject:js -->
    <!-- endinject -->
  </body>
</html>
";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn create_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(root, "index.html", INDEX_HTML);
    write(
        root,
        "app/main.ts",
        "import { greet } from \"./greeter\";\n\nconst target: string = \"world\";\ndocument.body.append(greet(target));\n",
    );
    write(
        root,
        "app/greeter.ts",
        "export function greet(name: string): string {\n    const message: string = `Hello, ${name}!`;\n    return message;\n}\n",
    );
    write(root, "app/greeter.html", "<p class=\"greeting\"></p>\n");
    write(
        root,
        "styles/site.css",
        "body {\n  margin: 0;\n\n  & .greeting {\n    color: rebeccapurple;\n  }\n}\n",
    );
    write(root, "node_modules/es6-shim/es6-shim.min.js", "/* shim */\n");
    write(root, "node_modules/reflect-metadata/Reflect.js", "/* reflect */\n");
    write(
        root,
        "server.js",
        "require(\"./app/api/server\").start(process.env.PORT);\n",
    );

    temp
}

fn pipeline(root: &Path, release: bool) -> Pipeline {
    Pipeline::new(
        PathConfig::new(root),
        BuildMode::new(release, false),
        Arc::new(NoopReload),
    )
    .unwrap()
}

fn read(root: &Path, rel: &str) -> Vec<u8> {
    fs::read(root.join(rel)).unwrap_or_else(|e| panic!("{rel}: {e}"))
}

#[tokio::test]
async fn test_default_build_produces_every_artifact() {
    let project = create_project();
    let root = project.path();

    let report = pipeline(root, false).run(&["default"]).await.unwrap();
    assert!(report.is_clean(), "unexpected errors: {:?}", report.soft_errors());

    for rel in [
        "dist/app/bundle.js",
        "dist/app/bundle.js.map",
        "dist/css/site.css",
        "dist/css/site.css.map",
        "dist/index.html",
        "dist/app/greeter.html",
        "dist/lib/es6-shim.min.js",
        "dist/lib/Reflect.js",
        "dist/server.js",
        "dist/app/main.js",
        "dist/app/greeter.js",
    ] {
        assert!(root.join(rel).is_file(), "missing {rel}");
    }

    let html = String::from_utf8(read(root, "dist/index.html")).unwrap();
    assert!(html.contains("<script src=\"/app/bundle.js\"></script>"));
    assert!(html.contains("<link rel=\"stylesheet\" href=\"/css/site.css\">"));

    let bundle = String::from_utf8(read(root, "dist/app/bundle.js")).unwrap();
    assert!(bundle.contains("Hello, "));
    assert!(!bundle.contains(": string"));
    assert!(bundle.contains("sourceMappingURL=bundle.js.map"));
}

#[tokio::test]
async fn test_html_runs_after_its_prerequisites() {
    let project = create_project();
    let report = pipeline(project.path(), false)
        .run(&["html"])
        .await
        .unwrap();

    assert!(report.completed_before_started("js", "html"));
    assert!(report.completed_before_started("css", "html"));
    assert!(!report.started().contains(&"lib"));
}

#[tokio::test]
async fn test_repeated_builds_are_byte_identical() {
    let project = create_project();
    let root = project.path();
    let outputs = ["dist/app/bundle.js", "dist/app/bundle.js.map", "dist/css/site.css", "dist/index.html"];

    pipeline(root, true).run(&["default"]).await.unwrap();
    let first: Vec<Vec<u8>> = outputs.iter().map(|rel| read(root, rel)).collect();

    pipeline(root, true).run(&["default"]).await.unwrap();
    let second: Vec<Vec<u8>> = outputs.iter().map(|rel| read(root, rel)).collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_release_output_is_smaller() {
    let debug_project = create_project();
    let release_project = create_project();

    pipeline(debug_project.path(), false).run(&["default"]).await.unwrap();
    pipeline(release_project.path(), true).run(&["default"]).await.unwrap();

    for rel in ["dist/app/bundle.js", "dist/css/site.css"] {
        let debug = read(debug_project.path(), rel).len();
        let release = read(release_project.path(), rel).len();
        assert!(release <= debug, "{rel}: release {release} > debug {debug}");
    }

    let html = String::from_utf8(read(release_project.path(), "dist/index.html")).unwrap();
    assert!(!html.contains("\n  "));
    assert!(html.contains("<title>Demo</title>"));
}

#[tokio::test]
async fn test_compile_error_keeps_previous_bundle() {
    let project = create_project();
    let root = project.path();
    let pipeline = pipeline(root, false);

    pipeline.run(&["default"]).await.unwrap();
    let good_bundle = read(root, "dist/app/bundle.js");

    write(root, "app/greeter.ts", "export function greet(name: string {\n");
    pipeline
        .script_cache()
        .invalidate(&root.join("app/greeter.ts"));
    let report = pipeline.run(&["default"]).await.unwrap();

    assert!(!report.is_clean());
    assert!(report.soft_errors().iter().any(|(task, _)| *task == "js"));
    assert_eq!(read(root, "dist/app/bundle.js"), good_bundle);
    assert!(
        report
            .trace
            .contains(&TraceEvent::Completed("default".to_string()))
    );
}

#[tokio::test]
async fn test_lint_reports_without_failing() {
    let project = create_project();
    let root = project.path();
    write(root, "app/legacy.ts", "var count = 'one';\n");

    let report = pipeline(root, false).run(&["lint"]).await.unwrap();

    let outcome = report.outcome("lint").unwrap();
    assert!(
        outcome
            .errors()
            .iter()
            .any(|m| m.starts_with("ERROR: (no-var-keyword) app/legacy.ts[1, 1]"))
    );
    assert!(
        outcome
            .errors()
            .iter()
            .any(|m| m.starts_with("ERROR: (quotemark) app/legacy.ts[1, 13]"))
    );
}

#[tokio::test]
async fn test_rebuild_recompiles_only_changed_module() {
    let project = create_project();
    let root = project.path();
    let pipeline = pipeline(root, false);

    pipeline.run(&["js"]).await.unwrap();
    let cache = pipeline.script_cache();
    assert_eq!(cache.stats().misses, 2);

    write(
        root,
        "app/greeter.ts",
        "export function greet(name: string): string {\n    return `Hi, ${name}!`;\n}\n",
    );
    assert!(cache.invalidate(&root.join("app/greeter.ts")));
    pipeline.run(&["js"]).await.unwrap();

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    let bundle = String::from_utf8(read(root, "dist/app/bundle.js")).unwrap();
    assert!(bundle.contains("Hi, "));
}

#[tokio::test]
async fn test_css_build_signals_stylesheet_injection() {
    let project = create_project();
    let reload = Arc::new(ReloadBuffer::new());
    let pipeline = Pipeline::new(
        PathConfig::new(project.path()),
        BuildMode::new(false, true),
        reload.clone(),
    )
    .unwrap();

    pipeline.run(&["css"]).await.unwrap();

    assert_eq!(
        reload.drain(),
        vec![ReloadSignal::InjectCss {
            path: "/css/site.css".to_string()
        }]
    );
}
