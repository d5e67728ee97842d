use super::*;

fn sample_record() -> HandoffRecord {
    HandoffRecord {
        initial_image: "data:image/png;base64,c291cmNl".into(),
        initial_rendered_image: None,
        name: "Residence 1".into(),
    }
}

#[test]
fn writes_and_reads_record_under_prefixed_key() {
    let storage = Arc::new(MemorySessionStorage::new());
    let handoff = SessionHandoff::new(storage.clone());
    let id = ProjectId::new("1700000000000");

    handoff.write(&id, &sample_record()).expect("write");

    let raw = storage
        .get_item("visualizer:1700000000000")
        .expect("raw entry");
    assert!(raw.contains("\"initialImage\""));
    assert_eq!(handoff.read(&id), Some(sample_record()));
}

#[test]
fn missing_entry_reads_as_none() {
    let handoff = SessionHandoff::in_memory();
    assert_eq!(handoff.read(&ProjectId::new("abc")), None);
}

#[test]
fn empty_id_reads_as_none_even_if_key_exists() {
    let storage = Arc::new(MemorySessionStorage::new());
    storage.set_item("visualizer:", serde_json::to_string(&sample_record()).expect("json"));
    let handoff = SessionHandoff::new(storage);

    assert_eq!(handoff.read(&ProjectId::new("")), None);
}

#[test]
fn malformed_entry_reads_as_none() {
    let storage = Arc::new(MemorySessionStorage::new());
    storage.set_item("visualizer:abc", "{not json".to_string());
    storage.set_item("visualizer:def", "[1,2,3]".to_string());
    let handoff = SessionHandoff::new(storage);

    assert_eq!(handoff.read(&ProjectId::new("abc")), None);
    assert_eq!(handoff.read(&ProjectId::new("def")), None);
}

#[test]
fn record_without_initial_image_parses_but_reports_it() {
    let storage = Arc::new(MemorySessionStorage::new());
    storage.set_item("visualizer:abc", r#"{"name":"orphan"}"#.to_string());
    let handoff = SessionHandoff::new(storage);

    let record = handoff.read(&ProjectId::new("abc")).expect("record");
    assert!(!record.has_initial_image());
}

#[test]
fn last_write_wins() {
    let handoff = SessionHandoff::in_memory();
    let id = ProjectId::new("abc");
    handoff.write(&id, &sample_record()).expect("first write");

    let mut updated = sample_record();
    updated.initial_rendered_image = Some("data:image/png;base64,cmVuZGVy".into());
    handoff.write(&id, &updated).expect("second write");

    assert_eq!(handoff.read(&id), Some(updated));
}

#[test]
fn remove_clears_entry() {
    let storage = Arc::new(MemorySessionStorage::new());
    let handoff = SessionHandoff::new(storage.clone());
    let id = ProjectId::new("abc");
    handoff.write(&id, &sample_record()).expect("write");
    assert_eq!(storage.len(), 1);

    handoff.remove(&id);
    assert!(storage.is_empty());
    assert_eq!(handoff.read(&id), None);
}
