use super::*;

fn table() -> TrackedTable<String, i32> {
    TrackedTable::new()
}

#[test]
fn hydrated_rows_are_clean() {
    let mut t = table();
    t.hydrate([("a".to_string(), 1), ("b".to_string(), 2)]);
    assert_eq!(t.len(), 2);
    assert_eq!(t.dirty_count(), 0);
    assert!(t.snapshot().is_empty());
}

#[test]
fn insert_marks_dirty_and_ack_clears() {
    let mut t = table();
    t.insert("a".into(), 1);
    let snap = t.snapshot();
    assert_eq!(snap.upserts.len(), 1);
    let (key, value, rev) = snap.upserts[0].clone();
    assert_eq!((key.as_str(), value), ("a", 1));

    t.ack_upserts([("a".to_string(), rev)]);
    assert_eq!(t.dirty_count(), 0);
}

#[test]
fn ack_keeps_rows_modified_after_snapshot() {
    let mut t = table();
    t.insert("a".into(), 1);
    let snap = t.snapshot();
    t.update(&"a".to_string(), |v| *v = 2).unwrap();

    t.ack_upserts(snap.upserts.into_iter().map(|(k, _, r)| (k, r)));
    assert_eq!(t.dirty_count(), 1);
    assert_eq!(t.snapshot().upserts[0].1, 2);
}

#[test]
fn update_missing_returns_none() {
    let mut t = table();
    assert!(t.update(&"nope".to_string(), |v| *v += 1).is_none());
    assert_eq!(t.dirty_count(), 0);
}

#[test]
fn remove_queues_delete_and_drops_dirty() {
    let mut t = table();
    t.insert("a".into(), 1);
    assert_eq!(t.remove(&"a".to_string()), Some(1));
    let snap = t.snapshot();
    assert!(snap.upserts.is_empty());
    assert_eq!(snap.deletes, vec!["a".to_string()]);

    t.ack_deletes(snap.deletes);
    assert_eq!(t.dirty_count(), 0);
}

#[test]
fn reinsert_cancels_pending_delete() {
    let mut t = table();
    t.hydrate([("a".to_string(), 1)]);
    t.remove(&"a".to_string());
    t.insert("a".into(), 5);
    let snap = t.snapshot();
    assert!(snap.deletes.is_empty());
    assert_eq!(snap.upserts.len(), 1);
}

#[test]
fn remove_where_returns_removed_keys() {
    let mut t = table();
    t.hydrate([("a".to_string(), 1), ("b".to_string(), 10), ("c".to_string(), 20)]);
    let mut removed = t.remove_where(|_, v| *v >= 10);
    removed.sort();
    assert_eq!(removed, vec!["b".to_string(), "c".to_string()]);
    assert_eq!(t.len(), 1);
    assert_eq!(t.snapshot().deletes.len(), 2);
}
