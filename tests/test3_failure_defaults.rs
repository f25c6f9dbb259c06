#![cfg(feature = "sqlite")]

use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tracing::Level;
use vsql::prelude::*;

fn capture() -> (Arc<Mutex<Vec<String>>>, HostSink) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&lines);
    let sink: HostSink = Arc::new(move |line: &str| captured.lock().unwrap().push(line.to_string()));
    (lines, sink)
}

fn error_lines(lines: &Mutex<Vec<String>>) -> Vec<String> {
    lines
        .lock()
        .unwrap()
        .iter()
        .filter(|l| l.contains("ERROR"))
        .cloned()
        .collect()
}

#[tokio::test]
async fn invalid_connection_string_yields_defaults_and_one_error_each() {
    let (lines, sink) = capture();
    let _guard = tracing::subscriber::set_default(host_subscriber(sink, Level::INFO));

    let bridge = Bridge::with_handle(
        Handle::current(),
        BridgeOptions::default(),
        StaticConfig("definitely not a database".to_string()),
    );

    let results = Arc::new(Mutex::new(Vec::<String>::new()));

    let r = Arc::clone(&results);
    bridge
        .execute("DELETE FROM x", ParamSet::new(), move |n| {
            r.lock().unwrap().push(format!("execute={n}"));
        })
        .await
        .unwrap();
    assert_eq!(error_lines(&lines).len(), 1);

    let r = Arc::clone(&results);
    bridge
        .fetch_scalar("SELECT 1", ParamSet::new(), move |v| {
            r.lock().unwrap().push(format!("scalar_null={}", v.is_null()));
        })
        .await
        .unwrap();
    assert_eq!(error_lines(&lines).len(), 2);

    let r = Arc::clone(&results);
    bridge
        .fetch_all("SELECT 1", ParamSet::new(), move |rows| {
            r.lock().unwrap().push(format!("rows={}", rows.len()));
        })
        .await
        .unwrap();
    assert_eq!(error_lines(&lines).len(), 3);

    let r = Arc::clone(&results);
    bridge
        .transaction(vec!["SELECT 1".to_string()], ParamSet::new(), move |ok| {
            r.lock().unwrap().push(format!("tx={ok}"));
        })
        .await
        .unwrap();
    assert_eq!(error_lines(&lines).len(), 4);

    assert_eq!(bridge.on_tick(), 4);
    assert_eq!(
        *results.lock().unwrap(),
        vec!["execute=0", "scalar_null=true", "rows=0", "tx=false"]
    );

    let errors = error_lines(&lines);
    for (line, op) in errors
        .iter()
        .zip(["execute", "fetch_scalar", "fetch_all", "transaction"])
    {
        assert!(line.contains(&format!("operation={op}")), "{line}");
    }
    assert_eq!(bridge.stats().opened(), 0);
}

#[tokio::test]
async fn unset_connection_string_fails_on_first_use() {
    let (lines, sink) = capture();
    let _guard = tracing::subscriber::set_default(host_subscriber(sink, Level::INFO));

    let unset = |_key: &str| -> Option<String> { None };
    let bridge = Bridge::with_handle(Handle::current(), BridgeOptions::default(), unset);
    bridge.ready(|| {});
    assert_eq!(bridge.connection_string().as_str(), "");
    assert!(error_lines(&lines).is_empty());

    bridge
        .execute("SELECT 1", ParamSet::new(), |n| assert_eq!(n, 0))
        .await
        .unwrap();
    assert_eq!(error_lines(&lines).len(), 1);
    assert_eq!(bridge.on_tick(), 2);
}

#[tokio::test]
async fn failed_transaction_statement_logs_once_and_rolls_back() {
    let (lines, sink) = capture();
    let _guard = tracing::subscriber::set_default(host_subscriber(sink, Level::INFO));

    let dir = tempfile::tempdir().unwrap();
    let cs = ConnectionString::new(&format!("sqlite:{}", dir.path().join("f.db").display()));
    let exec = QueryExecutor::default();
    exec.execute(&cs, "CREATE TABLE t (id INTEGER PRIMARY KEY)", &ParamSet::new())
        .await;

    let ok = exec
        .transaction(
            &cs,
            &[
                "INSERT INTO t VALUES (1)".to_string(),
                "INSERT INTO nope VALUES (1)".to_string(),
            ],
            &ParamSet::new(),
        )
        .await;
    assert!(!ok);
    assert_eq!(error_lines(&lines).len(), 1);
    assert_eq!(
        exec.fetch_scalar(&cs, "SELECT COUNT(*) FROM t", &ParamSet::new())
            .await,
        RowValues::Int(0)
    );
    assert_eq!(exec.stats().opened(), exec.stats().closed());
}

#[tokio::test]
async fn panicking_callback_is_logged_and_skipped() {
    let (lines, sink) = capture();
    let _guard = tracing::subscriber::set_default(host_subscriber(sink, Level::INFO));

    let queue = CallbackQueue::new();
    let after = Arc::new(Mutex::new(false));
    queue.enqueue(|| panic!("script error"));
    let flag = Arc::clone(&after);
    queue.enqueue(move || *flag.lock().unwrap() = true);

    assert_eq!(queue.drain_once(), 2);
    assert!(*after.lock().unwrap());
    let errors = error_lines(&lines);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("script error"));
}
