/// Concurrent access tests
///
/// Tests for multi-threaded use of one storage object: schema introspection,
/// racing writers and parallel document stores
/// Run with: cargo test --test concurrent_access_tests

use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tablestore::{
    Attribute, ColumnDef, Connection, DocumentConfig, DocumentStore, Record, Result,
    SqliteConnection, StorageEngine, StorageError, TableConfig, TableStorage, Value,
};

/// Counts introspection queries passing through to SQLite.
struct CountingConnection {
    inner: SqliteConnection,
    describes: AtomicUsize,
}

impl CountingConnection {
    fn new() -> Self {
        Self {
            inner: SqliteConnection::open_in_memory().unwrap(),
            describes: AtomicUsize::new(0),
        }
    }

    fn describes(&self) -> usize {
        self.describes.load(Ordering::SeqCst)
    }
}

impl Connection for CountingConnection {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.inner.execute(sql, params)
    }

    fn fetch(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        if sql.starts_with("PRAGMA table_info") {
            self.describes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.fetch(sql, params)
    }

    fn attribute(&self, attribute: Attribute) -> Result<Value> {
        self.inner.attribute(attribute)
    }

    fn last_insert_id(&self) -> Result<Value> {
        self.inner.last_insert_id()
    }
}

fn sessions_config() -> TableConfig {
    TableConfig::new("sessions", ColumnDef::new("token", "TEXT NOT NULL"))
        .column(ColumnDef::new("owner", "TEXT"))
}

fn session(owner: &str) -> Record {
    let mut record = Record::new();
    record.insert("owner".to_string(), Value::from(owner));
    record
}

#[test]
fn test_concurrent_first_access_introspects_once() {
    let connection = Arc::new(CountingConnection::new());
    let sessions = Arc::new(TableStorage::open(sessions_config(), connection.clone()).unwrap());
    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let sessions = Arc::clone(&sessions);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let token = Value::from(format!("token-{}", i));
                sessions.add(Some(&token), session("worker")).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(connection.describes(), 1);
    for i in 0..num_threads {
        assert!(sessions.exists(&Value::from(format!("token-{}", i))).unwrap());
    }
}

#[test]
fn test_racing_add_has_one_winner() {
    let connection = Arc::new(SqliteConnection::open_in_memory().unwrap());
    let sessions = Arc::new(TableStorage::open(sessions_config(), connection).unwrap());
    let num_threads = 10;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let sessions = Arc::clone(&sessions);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let owner = format!("writer-{}", i);
                sessions
                    .add(Some(&Value::from("shared")), session(&owner))
                    .map(|_| owner)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners: Vec<&String> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1, "Exactly one add must succeed");
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(err, StorageError::AlreadyExists(_, _)),
                "Unexpected error: {}",
                err
            );
        }
    }

    let stored = sessions.get(&Value::from("shared")).unwrap().unwrap();
    assert_eq!(stored["owner"], Value::from(winners[0].as_str()));
}

#[test]
fn test_racing_set_leaves_one_row() {
    let connection = Arc::new(SqliteConnection::open_in_memory().unwrap());
    let sessions = Arc::new(TableStorage::open(sessions_config(), connection.clone()).unwrap());
    let num_threads = 6;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let sessions = Arc::clone(&sessions);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                sessions
                    .set(Some(&Value::from("shared")), session(&format!("writer-{}", i)))
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let rows = connection
        .fetch("SELECT COUNT(*) AS n FROM \"sessions\"", &[])
        .unwrap();
    assert_eq!(rows[0]["n"], Value::Integer(1));
}

#[test]
fn test_parallel_document_stores() {
    let connection = Arc::new(SqliteConnection::open_in_memory().unwrap());
    let docs = Arc::new(DocumentStore::open(DocumentConfig::new("events"), connection).unwrap());
    let num_threads = 8;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let docs = Arc::clone(&docs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..per_thread)
                    .map(|i| docs.store(json!({"thread": t, "seq": i})).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let keys: HashSet<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(keys.len(), num_threads * per_thread);
    for key in keys.iter().take(10) {
        let document = docs.get(&Value::from(key.as_str())).unwrap().unwrap();
        assert!(document["seq"].as_u64().unwrap() < per_thread as u64);
    }
}
