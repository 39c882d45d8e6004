//! Ordering guarantees of the runner on a pipeline-shaped graph.

use kiln_graph::{Runner, TaskGraph, TaskOutcome, TaskSpec, TraceEvent, task_fn};
use std::sync::Arc;
use std::time::Duration;

fn sleeper(ms: u64) -> impl kiln_graph::Task + 'static {
    task_fn(move || async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(TaskOutcome::Completed)
    })
}

fn pipeline() -> TaskGraph {
    TaskGraph::builder()
        .task(TaskSpec::new("lint", sleeper(1)))
        .task(TaskSpec::new("js", sleeper(40)))
        .task(TaskSpec::new("css", sleeper(5)))
        .task(TaskSpec::new("lib", sleeper(2)))
        .task(TaskSpec::new("templates", sleeper(2)))
        .task(TaskSpec::new("html", sleeper(1)).with_deps(["js", "css"]))
        .task(TaskSpec::new("server", sleeper(1)))
        .task(TaskSpec::composite(
            "default",
            ["html", "lib", "templates", "server"],
        ))
        .build()
        .expect("pipeline graph is valid")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn html_starts_only_after_js_and_css_complete() {
    let runner = Runner::new(Arc::new(pipeline()));

    for _ in 0..3 {
        let report = runner.run(&["default"]).await.unwrap();

        assert!(report.completed_before_started("js", "html"));
        assert!(report.completed_before_started("css", "html"));
        assert!(report.completed_before_started("html", "default"));
        assert!(report.position(&TraceEvent::Started("lint".into())).is_none());
        assert_eq!(report.records.len(), 7);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_tasks_start_in_declaration_order() {
    let report = Runner::new(Arc::new(pipeline()))
        .run(&["default"])
        .await
        .unwrap();

    // Everything without prerequisites is ready at once and spawned in plan order.
    assert_eq!(
        &report.started()[..5],
        &["js", "css", "lib", "templates", "server"]
    );
}

#[test]
fn plan_lists_the_closure() {
    let graph = pipeline();
    assert_eq!(
        graph.plan(&["html"]).unwrap(),
        vec!["js".to_string(), "css".to_string(), "html".to_string()]
    );
}
