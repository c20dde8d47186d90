use venuemark_core::db::open_db_in_memory;
use venuemark_core::{
    Marker, MarkerQuery, MarkerValidationError, PointStore, RelativeOffset, RepoError,
    SqlitePointStore, StoreStats,
};

fn marker(code: &str, name: Option<&str>, x: f64, z: f64) -> Marker {
    let marker = Marker::new(code, RelativeOffset::new(x, 0.0, z), "author");
    match name {
        Some(name) => marker.with_name(name),
        None => marker,
    }
}

#[test]
fn insert_and_query_preserve_offsets_exactly() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePointStore::try_new(&conn).unwrap();

    let original = Marker::new("EVENT_A", RelativeOffset::new(0.1, -2.25, 1e-9), "author")
        .with_name("Stage");
    store.insert(&original).unwrap();

    let loaded = store.query(&MarkerQuery::for_reference("EVENT_A")).unwrap();
    assert_eq!(loaded, vec![original]);
}

#[test]
fn query_is_scoped_by_reference_code() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePointStore::try_new(&conn).unwrap();

    store.insert(&marker("EVENT_A", None, 1.0, 1.0)).unwrap();
    store.insert(&marker("EVENT_A", None, 2.0, 2.0)).unwrap();
    store.insert(&marker("EVENT_B", None, 3.0, 3.0)).unwrap();

    let event_a = store.query(&MarkerQuery::for_reference("EVENT_A")).unwrap();
    assert_eq!(event_a.len(), 2);
    assert!(event_a.iter().all(|m| m.reference_code == "EVENT_A"));

    let unknown = store.query(&MarkerQuery::for_reference("EVENT_Z")).unwrap();
    assert!(unknown.is_empty());
}

#[test]
fn query_can_narrow_by_exact_name() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePointStore::try_new(&conn).unwrap();

    store.insert(&marker("EVENT_A", Some("Stage"), 1.0, 1.0)).unwrap();
    store.insert(&marker("EVENT_A", Some("Bar"), 2.0, 2.0)).unwrap();
    store.insert(&marker("EVENT_A", None, 3.0, 3.0)).unwrap();

    let stage = store
        .query(&MarkerQuery::for_reference("EVENT_A").named("Stage"))
        .unwrap();
    assert_eq!(stage.len(), 1);
    assert_eq!(stage[0].name.as_deref(), Some("Stage"));
}

#[test]
fn insert_rejects_invalid_markers_before_sql() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePointStore::try_new(&conn).unwrap();

    let short_code = marker("abc", None, 0.0, 0.0);
    assert!(matches!(
        store.insert(&short_code),
        Err(RepoError::Validation(
            MarkerValidationError::ReferenceCodeTooShort(_)
        ))
    ));

    let non_finite = Marker::new("EVENT_A", RelativeOffset::new(f64::NAN, 0.0, 0.0), "author");
    assert!(matches!(
        store.insert(&non_finite),
        Err(RepoError::Validation(MarkerValidationError::NonFiniteOffset))
    ));
    assert_eq!(store.stats().unwrap(), StoreStats::default());
}

#[test]
fn delete_removes_one_marker_and_reports_missing_ids() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePointStore::try_new(&conn).unwrap();

    let kept = marker("EVENT_A", None, 1.0, 1.0);
    let removed = marker("EVENT_A", None, 2.0, 2.0);
    store.insert(&kept).unwrap();
    store.insert(&removed).unwrap();

    store.delete(removed.id).unwrap();
    let remaining = store.query(&MarkerQuery::for_reference("EVENT_A")).unwrap();
    assert_eq!(remaining, vec![kept]);

    assert!(matches!(
        store.delete(removed.id),
        Err(RepoError::NotFound(id)) if id == removed.id
    ));
}

#[test]
fn clear_all_stats_and_distinct_names() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePointStore::try_new(&conn).unwrap();

    store.insert(&marker("EVENT_A", Some("Stage"), 1.0, 1.0)).unwrap();
    store.insert(&marker("EVENT_A", Some("Stage"), 2.0, 2.0)).unwrap();
    store.insert(&marker("EVENT_A", Some("Bar"), 3.0, 3.0)).unwrap();
    store.insert(&marker("EVENT_B", Some("Exit"), 4.0, 4.0)).unwrap();

    assert_eq!(
        store.distinct_names("EVENT_A").unwrap(),
        vec!["Bar".to_string(), "Stage".to_string()]
    );
    assert_eq!(
        store.stats().unwrap(),
        StoreStats {
            total_markers: 4,
            total_references: 2
        }
    );

    assert_eq!(store.clear_all().unwrap(), 4);
    assert_eq!(store.stats().unwrap(), StoreStats::default());
}

#[test]
fn invalid_persisted_rows_are_reported_not_masked() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO markers (id, reference_code, name, pos_x, pos_y, pos_z, created_by, created_at)
         VALUES ('not-a-uuid', 'EVENT_A', NULL, 0.0, 0.0, 0.0, 'author', 1);",
        [],
    )
    .unwrap();
    let store = SqlitePointStore::try_new(&conn).unwrap();

    assert!(matches!(
        store.query(&MarkerQuery::for_reference("EVENT_A")),
        Err(RepoError::InvalidData(_))
    ));
}
