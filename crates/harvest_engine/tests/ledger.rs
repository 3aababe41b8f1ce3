use std::fs;

use harvest_engine::DedupLedger;
use tempfile::TempDir;

#[test]
fn missing_file_is_an_empty_ledger() {
    let temp = TempDir::new().unwrap();
    let ledger = DedupLedger::open(&temp.path().join("downloaded.log")).unwrap();
    assert!(ledger.is_empty());
    assert!(!temp.path().join("downloaded.log").exists());
}

#[test]
fn entries_are_exact_trimmed_lines() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("downloaded.log");
    fs::write(&path, "https://a.example/1\n\n  https://a.example/2  \n").unwrap();

    let ledger = DedupLedger::open(&path).unwrap();
    assert_eq!(ledger.len(), 2);
    assert!(ledger.contains("https://a.example/2"));
    assert!(!ledger.contains("https://a.example/2/"));
    assert!(!ledger.contains("HTTPS://a.example/1"));
}

#[test]
fn record_appends_once() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("downloaded.log");
    let mut ledger = DedupLedger::open(&path).unwrap();

    assert!(ledger.record("https://a.example/1").unwrap());
    assert!(!ledger.record("https://a.example/1").unwrap());
    assert!(ledger.record("https://a.example/2").unwrap());

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "https://a.example/1\nhttps://a.example/2\n"
    );
    let reopened = DedupLedger::open(&path).unwrap();
    assert_eq!(reopened.len(), 2);
}

#[test]
fn record_starts_a_new_line_after_unterminated_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("downloaded.log");
    fs::write(&path, "https://a.example/1").unwrap();

    let mut ledger = DedupLedger::open(&path).unwrap();
    ledger.record("https://a.example/2").unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "https://a.example/1\nhttps://a.example/2\n"
    );
}

#[test]
fn in_memory_ledger_touches_no_files() {
    let mut ledger = DedupLedger::with_entries(["https://a.example/1"]);
    assert!(ledger.path().is_none());
    assert!(ledger.contains("https://a.example/1"));
    assert!(ledger.record("https://a.example/2").unwrap());
    assert_eq!(ledger.len(), 2);
}
