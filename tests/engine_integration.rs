//! Integration tests driving a real SyncEngine over temp directories.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use varsync::{EngineConfig, SyncEngine, SyncEvent, SyncRule, Value};

fn quick_config() -> EngineConfig {
    EngineConfig {
        debounce: Duration::from_millis(100),
        batch_delay: Duration::from_millis(100),
        ..EngineConfig::default()
    }
}

async fn start_engine(
    config: EngineConfig,
    rules: Vec<SyncRule>,
) -> (SyncEngine, mpsc::Receiver<SyncEvent>) {
    let mut engine = SyncEngine::with_config(config);
    engine.set_rules(rules);
    let events = engine.events().unwrap();
    engine.start().await.unwrap();
    // Give the platform notifier a moment to arm the watches.
    tokio::time::sleep(Duration::from_millis(200)).await;
    (engine, events)
}

async fn wait_events(rx: &mut mpsc::Receiver<SyncEvent>, want: usize) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while events.len() < want {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(event)) => events.push(event),
            _ => break,
        }
    }
    events
}

fn rule(source: &Path, source_key: &str, target: &Path, target_key: &str) -> SyncRule {
    SyncRule::new(
        format!("{source_key}->{target_key}"),
        source,
        source_key,
        target,
        target_key,
    )
}

/// A YAML scalar update changes exactly one value span; every other
/// byte of the target, including the inline comment, survives.
#[tokio::test]
async fn yaml_surgical_single_scalar() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("src.yaml");
    let target = tmp.path().join("dst.yaml");
    fs::write(&source, "database:\n  host: localhost\n  port: 5432\n").unwrap();
    fs::write(&target, "# hdr\n  host: old   # keep me\n  port: 9\n").unwrap();

    let rules = vec![rule(&source, "database.host", &target, "host")];
    let (mut engine, mut events) = start_engine(quick_config(), rules).await;

    fs::write(&source, "database:\n  host: prod\n  port: 5432\n").unwrap();

    let received = wait_events(&mut events, 1).await;
    assert_eq!(received.len(), 1);
    assert!(received[0].success, "error: {:?}", received[0].error);
    assert_eq!(received[0].new_value, Value::from("prod"));

    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "# hdr\n  host: prod   # keep me\n  port: 9\n"
    );

    engine.stop().await;
}

/// One source event feeding five rules produces one batch: each target
/// is rewritten once with its whole update set, and every rule gets a
/// success event.
#[tokio::test]
async fn batched_multi_target() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("src.yaml");
    let target_a = tmp.path().join("a.yaml");
    let target_b = tmp.path().join("b.toml");
    fs::write(&source, "db:\n  host: h0\n  port: 1\n  name: n0\n").unwrap();
    fs::write(&target_a, "host: x\nport: 0\nname: x\n").unwrap();
    fs::write(&target_b, "[db]\nhost = \"x\"\nport = 0\n").unwrap();

    let rules = vec![
        rule(&source, "db.host", &target_a, "host"),
        rule(&source, "db.port", &target_a, "port"),
        rule(&source, "db.name", &target_a, "name"),
        rule(&source, "db.host", &target_b, "db.host"),
        rule(&source, "db.port", &target_b, "db.port"),
    ];
    let (mut engine, mut events) = start_engine(quick_config(), rules).await;

    fs::write(&source, "db:\n  host: prod\n  port: 9\n  name: app\n").unwrap();

    let received = wait_events(&mut events, 5).await;
    assert_eq!(received.len(), 5);
    assert!(received.iter().all(|e| e.success));

    assert_eq!(
        fs::read_to_string(&target_a).unwrap(),
        "host: prod\nport: 9\nname: app\n"
    );
    assert_eq!(
        fs::read_to_string(&target_b).unwrap(),
        "[db]\nhost = \"prod\"\nport = 9\n"
    );

    engine.stop().await;
}

/// Two sources writing to one target serialize: the final file holds
/// both updates and is well-formed.
#[tokio::test]
async fn per_target_serialization() {
    let tmp = TempDir::new().unwrap();
    let source_a = tmp.path().join("a.yaml");
    let source_b = tmp.path().join("b.yaml");
    let target = tmp.path().join("t.yaml");
    fs::write(&source_a, "host: h0\n").unwrap();
    fs::write(&source_b, "port: 0\n").unwrap();
    fs::write(&target, "host: x\nport: 1\n").unwrap();

    let rules = vec![
        rule(&source_a, "host", &target, "host"),
        rule(&source_b, "port", &target, "port"),
    ];
    let (mut engine, mut events) = start_engine(quick_config(), rules).await;

    fs::write(&source_a, "host: alpha\n").unwrap();
    fs::write(&source_b, "port: 42\n").unwrap();

    let received = wait_events(&mut events, 2).await;
    assert_eq!(received.len(), 2);
    assert!(received.iter().all(|e| e.success));

    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "host: alpha\nport: 42\n"
    );

    engine.stop().await;
}

/// A TOML table-array target keeps its header, comments, and
/// unmodified keys byte-identical.
#[tokio::test]
async fn toml_table_array() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("src.toml");
    let target = tmp.path().join("dst.toml");
    fs::write(&source, "a = 9\n").unwrap();
    fs::write(&target, "# deployment\n[[db]]\nhost = \"x\"\nport = 1\n").unwrap();

    let rules = vec![rule(&source, "a", &target, "db[0].host")];
    let (mut engine, mut events) = start_engine(quick_config(), rules).await;

    fs::write(&source, "a = 7\n").unwrap();

    let received = wait_events(&mut events, 1).await;
    assert!(received[0].success, "error: {:?}", received[0].error);

    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "# deployment\n[[db]]\nhost = 7\nport = 1\n"
    );

    engine.stop().await;
}

/// A rule targeting a nonexistent key fails alone; its batch-mates
/// still update the target.
#[tokio::test]
async fn missing_key_other_rules_succeed() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("src.yaml");
    let target = tmp.path().join("dst.yaml");
    fs::write(&source, "a: 1\nb: 2\nc: 3\n").unwrap();
    fs::write(&target, "x: 0\ny: 0\n").unwrap();

    let rules = vec![
        rule(&source, "a", &target, "x"),
        rule(&source, "b", &target, "y"),
        rule(&source, "c", &target, "missing"),
    ];
    let (mut engine, mut events) = start_engine(quick_config(), rules).await;

    fs::write(&source, "a: 10\nb: 20\nc: 30\n").unwrap();

    let received = wait_events(&mut events, 3).await;
    assert_eq!(received.len(), 3);
    assert_eq!(received.iter().filter(|e| e.success).count(), 2);

    let failure = received.iter().find(|e| !e.success).unwrap();
    assert!(failure.error.as_deref().unwrap().contains("key not found"));

    assert_eq!(fs::read_to_string(&target).unwrap(), "x: 10\ny: 20\n");

    engine.stop().await;
}

/// A burst of writes within the debounce window collapses to a single
/// batch carrying the final content.
#[tokio::test]
async fn debounce_collapses_burst() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("src.yaml");
    let target = tmp.path().join("dst.yaml");
    fs::write(&source, "v: 0\n").unwrap();
    fs::write(&target, "v: -1\n").unwrap();

    let config = EngineConfig {
        debounce: Duration::from_millis(400),
        batch_delay: Duration::from_millis(150),
        ..EngineConfig::default()
    };
    let rules = vec![rule(&source, "v", &target, "v")];
    let (mut engine, mut events) = start_engine(config, rules).await;

    for i in 1..=5 {
        fs::write(&source, format!("v: {i}\n")).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let received = wait_events(&mut events, 1).await;
    assert_eq!(received.len(), 1);
    assert!(received[0].success);
    assert_eq!(received[0].new_value, Value::Int(5));
    assert_eq!(fs::read_to_string(&target).unwrap(), "v: 5\n");

    // No second batch arrives for the burst.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(events.try_recv().is_err());

    engine.stop().await;
}

/// Dotenv targets keep spacing and comments; only value substrings
/// change.
#[tokio::test]
async fn dotenv_surgical_rewrite() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("src.yaml");
    let target = tmp.path().join("app.env");
    fs::write(&source, "db:\n  host: h0\n").unwrap();
    fs::write(&target, "# database\nDB_HOST = old\nDB_PORT=5432\n").unwrap();

    let rules = vec![rule(&source, "db.host", &target, "DB_HOST")];
    let (mut engine, mut events) = start_engine(quick_config(), rules).await;

    fs::write(&source, "db:\n  host: prod\n").unwrap();

    let received = wait_events(&mut events, 1).await;
    assert!(received[0].success, "error: {:?}", received[0].error);

    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "# database\nDB_HOST = prod\nDB_PORT=5432\n"
    );

    engine.stop().await;
}

/// Disabled rules never match events.
#[tokio::test]
async fn disabled_rule_does_not_sync() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("src.yaml");
    let target = tmp.path().join("dst.yaml");
    fs::write(&source, "a: 1\n").unwrap();
    fs::write(&target, "a: 0\n").unwrap();

    let mut disabled = rule(&source, "a", &target, "a");
    disabled.enabled = false;

    let (mut engine, mut events) = start_engine(quick_config(), vec![disabled]).await;

    fs::write(&source, "a: 2\n").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(events.try_recv().is_err());
    assert_eq!(fs::read_to_string(&target).unwrap(), "a: 0\n");

    engine.stop().await;
}
