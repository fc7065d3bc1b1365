mod common;

use common::{record, Draft, Note};
use jobtrack_data::{timestamp, Entity};
use serde_json::json;
use uuid::Uuid;

#[test]
fn test_create_fills_lifecycle_fields() {
    let note = Note::create(record(json!({"title": "hello"}))).unwrap();
    assert_eq!(note.meta.created_at, note.meta.updated_at);
    assert_eq!(note.tag, None);
    assert_eq!(note.score, 0);
    assert_ne!(note.id(), Uuid::nil());
}

#[test]
fn test_create_keeps_given_id() {
    let id = Uuid::new_v4();
    let note = Note::create(record(json!({"id": id.to_string(), "title": "x"}))).unwrap();
    assert_eq!(note.id(), id);
}

#[test]
fn test_create_reports_missing_field() {
    let err = Note::create(record(json!({"tag": "a"}))).unwrap_err();
    assert_eq!(err.field, "title");
}

#[test]
fn test_create_reports_wrong_type() {
    assert!(Note::create(record(json!({"title": 42}))).is_err());
}

#[test]
fn test_create_runs_domain_validation() {
    let err = Note::create(record(json!({"title": ""}))).unwrap_err();
    assert_eq!(err.field, "title");
}

#[test]
fn test_update_returns_new_instance() {
    let note = Note::create(record(json!({"title": "a"}))).unwrap();
    let updated = note.update(record(json!({"title": "b"}))).unwrap();
    assert_eq!(note.title, "a");
    assert_eq!(updated.title, "b");
    assert_eq!(updated.id(), note.id());
    assert_eq!(updated.meta.created_at, note.meta.created_at);
    assert!(updated.updated_at() > note.updated_at());
}

#[test]
fn test_update_rejects_immutable_fields() {
    let note = Note::create(record(json!({"title": "a"}))).unwrap();
    let other = Uuid::new_v4().to_string();
    assert_eq!(note.update(record(json!({"id": other}))).unwrap_err().field, "id");
    let created = timestamp::format(&timestamp::now());
    assert_eq!(
        note.update(record(json!({"created_at": created}))).unwrap_err().field,
        "created_at"
    );
    assert!(note.update(record(json!({"id": note.id().to_string()}))).is_ok());
}

#[test]
fn test_update_validates() {
    let note = Note::create(record(json!({"title": "a"}))).unwrap();
    assert!(note.update(record(json!({"score": "high"}))).is_err());
}

#[test]
fn test_versioned_counter() {
    let draft = Draft::create(record(json!({"body": "v1"}))).unwrap();
    assert_eq!(draft.versioned.version, 1);
    let draft = draft.update(record(json!({"body": "v2"}))).unwrap();
    let draft = draft.update(record(json!({"body": "v3"}))).unwrap();
    assert_eq!(draft.versioned.version, 3);

    assert_eq!(draft.update(record(json!({"version": 9}))).unwrap_err().field, "version");
    assert!(Draft::create(record(json!({"body": "x", "version": 4}))).is_err());
}

#[test]
fn test_record_round_trip() {
    let note = Note::create(record(json!({"title": "a", "tag": "t", "score": 3}))).unwrap();
    let restored = Note::from_record(note.to_record().unwrap()).unwrap();
    assert_eq!(restored, note);

    let draft = Draft::create(record(json!({"body": "b"}))).unwrap();
    assert_eq!(Draft::from_record(draft.to_record().unwrap()).unwrap(), draft);
}

#[test]
fn test_record_timestamps_are_fixed_width() {
    let note = Note::create(record(json!({"title": "a"}))).unwrap();
    let rec = note.to_record().unwrap();
    let created = rec["created_at"].as_str().unwrap();
    assert_eq!(created.len(), "2024-01-31T08:15:00.000000Z".len());
    assert!(created.ends_with('Z'));
}
