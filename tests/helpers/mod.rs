//! Event fixtures shared by the integration tests.

#![allow(dead_code)]

use alertwatch::event::{TABLE, TEST_CASE};
use alertwatch::{ChangeDescription, ChangeEvent, CompiledExpression, EventType, FieldChange};
use serde_json::json;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

pub const USER1: &str = "user1";

/// A table as the persistence layer would materialize it.
pub fn table_entity(owner: Option<&str>) -> serde_json::Value {
    let id = Uuid::new_v4();
    let mut entity = json!({
        "id": id.to_string(),
        "name": "orders",
        "fullyQualifiedName": "mysql_prod.shop.public.orders",
        "columns": [{ "name": "c1", "dataType": "INT" }],
    });
    if let Some(owner) = owner {
        entity["owner"] = json!({
            "id": Uuid::new_v4().to_string(),
            "type": "user",
            "name": owner,
            "displayName": "User One",
        });
    }
    entity
}

pub fn table_event(owner: Option<&str>) -> ChangeEvent {
    ChangeEvent::new(EventType::EntityCreated, TABLE, "admin").with_entity(table_entity(owner))
}

/// A test case update whose result carries the given status.
pub fn test_result_event(entity_type: &str, status: &str) -> ChangeEvent {
    let description = ChangeDescription {
        fields_updated: vec![FieldChange::new("testCaseResult")
            .with_old_value("test1")
            .with_new_value(json!({
                "testCaseStatus": status,
                "timestamp": 1_700_000_000_000_i64,
            }))],
        ..Default::default()
    };
    ChangeEvent::new(EventType::EntityUpdated, entity_type, "ingestion-bot")
        .with_change_description(description)
}

pub fn test_case_event(status: &str) -> ChangeEvent {
    test_result_event(TEST_CASE, status)
}

/// Evaluates a rule the way a caller would: compile, then evaluate.
pub fn eval(rule: &str, event: &ChangeEvent) -> bool {
    let compiled: CompiledExpression = alertwatch::compile(rule).unwrap();
    alertwatch::evaluate(&compiled, event)
}

/// Writes `content` to a file in a fresh temporary directory. The directory
/// is returned so it lives as long as the test needs the file.
pub fn write_temp_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    write!(file, "{}", content).unwrap();
    (dir, path)
}
