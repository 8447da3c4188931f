use clientdb::collection::SubscriptionOptions;
use clientdb::errors::ErrorKind;
use clientdb::{doc, ClientDb, Value};
use clientdb_int_test::test_util::{create_test_db, recording_listener};
use std::thread;

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_collections_are_isolated() {
    let db = create_test_db();
    let users = db.create_collection("users").unwrap();
    let notes = db.create_collection("notes").unwrap();

    users.add(doc! { id: "1", name: "Alice" }).unwrap();
    notes.add(doc! { id: "1", title: "First" }).unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(notes.len(), 1);
    assert_eq!(
        users.get_by_id("1").unwrap().get("name"),
        Value::from("Alice")
    );
    assert_eq!(notes.get_by_id("1").unwrap().get("name"), Value::Null);
}

#[test]
fn test_create_collection_is_get_or_create() {
    let db = create_test_db();
    let first = db.create_collection("users").unwrap();
    first.add(doc! { id: "1" }).unwrap();

    let second = db.create_collection("users").unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(db.list_collection_names(), vec!["users".to_string()]);
}

#[test]
fn test_lookup_of_missing_collection_fails() {
    let db = create_test_db();
    let error = db.collection("missing").unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::CollectionNotFound);
    assert!(!db.has_collection("missing"));
}

#[test]
fn test_empty_collection_name_is_rejected() {
    let db = create_test_db();
    let error = db.create_collection("").unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::ValidationError);
}

#[test]
fn test_schema_is_attached_but_not_enforced() {
    let db = create_test_db();
    let schema = Value::from(doc! { title: "string" });
    let collection = db
        .create_collection_with_schema("notes", Some(schema.clone()))
        .unwrap();

    assert_eq!(collection.schema(), Some(&schema));
    // the engine never validates against the schema
    collection.add(doc! { id: "1", anything: 42 }).unwrap();
    assert_eq!(collection.len(), 1);
}

#[test]
fn test_delete_collection_drops_state() {
    let db = create_test_db();
    let collection = db.create_collection("temp").unwrap();
    collection.add(doc! { id: "1" }).unwrap();

    db.delete_collection("temp");
    assert!(!db.has_collection("temp"));
    assert!(db.collection("temp").is_err());

    // recreating yields a fresh, empty collection
    let fresh = db.create_collection("temp").unwrap();
    assert!(fresh.is_empty());
}

#[test]
fn test_subscriptions_survive_through_registry_lookups() {
    let db = create_test_db();
    let (calls, listener) = recording_listener();
    db.create_collection("notes")
        .unwrap()
        .subscribe(vec!["title"], listener, SubscriptionOptions::default())
        .unwrap();

    // a later lookup returns a handle to the same collection
    db.collection("notes")
        .unwrap()
        .add(doc! { id: "1", title: "x" })
        .unwrap();

    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[test]
fn test_shared_registry_across_threads() {
    let db = ClientDb::new();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let db = db.clone();
            thread::spawn(move || {
                let collection = db.create_collection("shared").unwrap();
                collection.add(doc! { id: (format!("{}", t)) }).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(db.collection("shared").unwrap().len(), 4);
}
