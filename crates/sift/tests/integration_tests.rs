//! Integration tests for the sift crate
//!
//! These tests run full rule-engine passes against the SQLite store and
//! the in-memory executor, from a rules file on disk to ledger entries.

use chrono::{TimeZone, Utc};
use sift::actions::{ActionCall, InMemoryMailActions, Operation};
use sift::ledger::Ledger;
use sift::models::{Label, LabelId, Record, RecordId};
use sift::rules::{Action, Condition, FixedClock, PredicateMode, RuleSet, load_rulesets};
use sift::storage::{InMemoryRecordStore, RecordStore, SqliteStore};
use sift::{FailurePolicy, RuleEngine};
use tempfile::TempDir;

fn setup_store() -> (TempDir, SqliteStore) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(dir.path().join("sift.sqlite")).unwrap();
    (dir, store)
}

fn invoice_record(id: &str) -> Record {
    Record::builder(id)
        .thread_id(format!("t-{}", id))
        .subject("Urgent Invoice")
        .sender("billing@x.com")
        .recipient("me@example.com")
        .received_at("Tue, 25 Jun 2024 15:00:00 +0000")
        .labels(["INBOX", "UNREAD"])
        .build()
}

fn invoice_rules() -> RuleSet {
    RuleSet::new(PredicateMode::Any)
        .condition(Condition::new("subject", "contains", "invoice"))
        .action(Action::new("mark_as_read"))
}

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap())
}

#[test]
fn test_urgent_invoice_end_to_end() {
    let (_dir, store) = setup_store();
    store.upsert_record(invoice_record("m1")).unwrap();
    store
        .upsert_record(Record::builder("m2").subject("Lunch?").build())
        .unwrap();

    let executor = InMemoryMailActions::new();
    let rulesets = [invoice_rules()];

    let summary = RuleEngine::new(&rulesets, &store, &store, &executor)
        .run_pass()
        .unwrap();

    assert_eq!(summary.matches, 1);
    assert_eq!(
        executor.calls(),
        vec![ActionCall::MarkAsRead(RecordId::new("m1"))]
    );

    let entries = store.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].record_id, RecordId::new("m1"));
    assert_eq!(entries[0].ruleset_hash, rulesets[0].hash());
}

#[test]
fn test_pass_is_idempotent_across_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("sift.sqlite");
    let executor = InMemoryMailActions::new();
    let rulesets = [invoice_rules()];

    {
        let store = SqliteStore::new(&db_path).unwrap();
        store.upsert_record(invoice_record("m1")).unwrap();
        RuleEngine::new(&rulesets, &store, &store, &executor)
            .run_pass()
            .unwrap();
    }

    // A new process sees the ledger written by the previous one
    let store = SqliteStore::new(&db_path).unwrap();
    let summary = RuleEngine::new(&rulesets, &store, &store, &executor)
        .run_pass()
        .unwrap();

    assert_eq!(summary.matches, 0);
    assert_eq!(summary.skipped_processed, 1);
    assert_eq!(executor.calls().len(), 1);
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_changed_ruleset_retriggers() {
    let (_dir, store) = setup_store();
    store.upsert_record(invoice_record("m1")).unwrap();
    let executor = InMemoryMailActions::new();

    let original = [invoice_rules()];
    RuleEngine::new(&original, &store, &store, &executor)
        .run_pass()
        .unwrap();

    let changed = [invoice_rules().action(Action::new("mark_as_unread"))];
    assert_ne!(original[0].hash(), changed[0].hash());

    let summary = RuleEngine::new(&changed, &store, &store, &executor)
        .run_pass()
        .unwrap();

    assert_eq!(summary.matches, 1);
    assert_eq!(store.count().unwrap(), 2);
    assert_eq!(
        executor.calls(),
        vec![
            ActionCall::MarkAsRead(RecordId::new("m1")),
            ActionCall::MarkAsRead(RecordId::new("m1")),
            ActionCall::MarkAsUnread(RecordId::new("m1")),
        ]
    );
}

#[test]
fn test_move_to_label_creates_once_and_reuses() {
    let (_dir, store) = setup_store();
    store.upsert_record(invoice_record("m1")).unwrap();
    store.upsert_record(invoice_record("m2")).unwrap();

    let executor = InMemoryMailActions::with_labels([Label::new("INBOX", "INBOX")]);
    let rulesets = [RuleSet::new(PredicateMode::All)
        .condition(Condition::new("sender", "contains", "billing"))
        .action(Action::with_value("move_to_label", "Archive"))];

    let summary = RuleEngine::new(&rulesets, &store, &store, &executor)
        .run_pass()
        .unwrap();

    assert_eq!(summary.matches, 2);
    assert_eq!(summary.actions_failed, 0);

    let calls = executor.calls();
    let creates = calls
        .iter()
        .filter(|c| matches!(c, ActionCall::CreateLabel(_)))
        .count();
    assert_eq!(creates, 1);

    let created = LabelId::new("Label_2");
    assert!(calls.contains(&ActionCall::AddLabel(RecordId::new("m1"), created.clone())));
    assert!(calls.contains(&ActionCall::AddLabel(RecordId::new("m2"), created)));
}

#[test]
fn test_existing_label_matched_case_insensitively() {
    let (_dir, store) = setup_store();
    store.upsert_record(invoice_record("m1")).unwrap();

    let executor = InMemoryMailActions::with_labels([Label::new("Label_9", "archive")]);
    let rulesets = [invoice_rules().action(Action::with_value("move_to_label", "Archive"))];

    RuleEngine::new(&rulesets, &store, &store, &executor)
        .run_pass()
        .unwrap();

    let calls = executor.calls();
    assert!(!calls.iter().any(|c| matches!(c, ActionCall::CreateLabel(_))));
    assert!(calls.contains(&ActionCall::AddLabel(
        RecordId::new("m1"),
        LabelId::new("Label_9")
    )));
}

#[test]
fn test_unknown_action_skipped_rest_still_run() {
    let (_dir, store) = setup_store();
    store.upsert_record(invoice_record("m1")).unwrap();
    let executor = InMemoryMailActions::new();
    let rulesets = [RuleSet::new(PredicateMode::Any)
        .condition(Condition::new("subject", "contains", "invoice"))
        .action(Action::new("archive"))
        .action(Action::new("mark_as_read"))];

    let summary = RuleEngine::new(&rulesets, &store, &store, &executor)
        .run_pass()
        .unwrap();

    assert_eq!(summary.actions_skipped, 1);
    assert_eq!(summary.actions_attempted, 1);
    assert_eq!(
        executor.calls(),
        vec![ActionCall::MarkAsRead(RecordId::new("m1"))]
    );
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_empty_condition_lists() {
    let records = InMemoryRecordStore::with_records([invoice_record("m1")]);
    let ledger = sift::InMemoryLedger::new();
    let executor = InMemoryMailActions::new();
    let rulesets = [
        RuleSet::new(PredicateMode::All)
            .named("everything")
            .action(Action::new("mark_as_read")),
        RuleSet::new(PredicateMode::Any)
            .named("nothing")
            .action(Action::new("mark_as_unread")),
    ];

    let summary = RuleEngine::new(&rulesets, &records, &ledger, &executor)
        .run_pass()
        .unwrap();

    assert_eq!(summary.matches, 1);
    assert_eq!(
        executor.calls(),
        vec![ActionCall::MarkAsRead(RecordId::new("m1"))]
    );
}

#[test]
fn test_date_rules_use_the_given_clock() {
    let (_dir, store) = setup_store();
    // Received under a week before the clock
    store.upsert_record(invoice_record("recent")).unwrap();
    store
        .upsert_record(
            Record::builder("old")
                .subject("Invoice from last year")
                .received_at("Mon, 03 Jul 2023 09:00:00 +0000")
                .build(),
        )
        .unwrap();
    store
        .upsert_record(
            Record::builder("garbled")
                .subject("Invoice")
                .received_at("yesterday-ish")
                .build(),
        )
        .unwrap();

    let executor = InMemoryMailActions::new();
    let clock = clock();
    let rulesets = [RuleSet::new(PredicateMode::All)
        .condition(Condition::new("subject", "contains", "invoice"))
        .condition(Condition::new("received_at", "less_than_days", "7"))
        .action(Action::new("mark_as_read"))];

    let summary = RuleEngine::new(&rulesets, &store, &store, &executor)
        .with_clock(&clock)
        .run_pass()
        .unwrap();

    assert_eq!(summary.matches, 1);
    assert_eq!(
        executor.calls(),
        vec![ActionCall::MarkAsRead(RecordId::new("recent"))]
    );
}

#[test]
fn test_retry_policy_with_sqlite_ledger() {
    let (_dir, store) = setup_store();
    store.upsert_record(invoice_record("m1")).unwrap();
    let executor = InMemoryMailActions::new();
    executor.fail_on(Operation::MarkAsRead);
    let rulesets = [invoice_rules()];

    let summary = RuleEngine::new(&rulesets, &store, &store, &executor)
        .with_policy(FailurePolicy::Retry)
        .run_pass()
        .unwrap();

    assert_eq!(summary.actions_failed, 1);
    assert!(!store
        .is_processed(&RecordId::new("m1"), &rulesets[0].hash())
        .unwrap());
}

#[test]
fn test_rules_file_drives_a_pass() {
    let (dir, store) = setup_store();
    store.upsert_record(invoice_record("m1")).unwrap();

    let rules_path = dir.path().join("rules.json");
    std::fs::write(
        &rules_path,
        r#"[
            {
                "name": "invoices",
                "predicate": "any",
                "rules": [{"field": "subject", "predicate": "contains", "value": "INVOICE"}],
                "actions": ["mark_as_read", {"type": "move_to_label", "value": "Finance"}]
            }
        ]"#,
    )
    .unwrap();

    let rulesets = load_rulesets(&rules_path).unwrap();
    let executor = InMemoryMailActions::new();

    let summary = RuleEngine::new(&rulesets, &store, &store, &executor)
        .run_pass()
        .unwrap();

    assert_eq!(summary.matches, 1);
    assert_eq!(summary.actions_attempted, 2);
    assert_eq!(executor.labels()[0].name, "Finance");
}
