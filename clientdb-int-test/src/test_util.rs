use clientdb::collection::{ChangeAction, ChangeEvent, ChangeListener, Collection, Document};
use clientdb::doc;
use clientdb::errors::ClientDbResult;
use clientdb::ClientDb;
use std::sync::{Arc, Mutex};

/// Every (action, changed docs) pair a recording listener has received so far.
pub type RecordedCalls = Arc<Mutex<Vec<(ChangeAction, Vec<Document>)>>>;

pub fn create_test_db() -> ClientDb {
    ClientDb::new()
}

/// Creates a collection pre-filled with four well-known documents.
pub fn create_seeded_collection(db: &ClientDb, name: &str) -> ClientDbResult<Collection> {
    let collection = db.create_collection(name)?;
    collection.bulk_add(vec![
        doc! { id: "1", title: "Test", rank: 3 },
        doc! { id: "2", title: "Test 2", rank: 1 },
        doc! { id: "3", title: "Test 3", rank: 2 },
        doc! { id: "4", title: "Fourth Test 4", rank: 2 },
    ])?;
    Ok(collection)
}

/// Builds a listener that records every event it receives, plus the shared log
/// to assert against.
pub fn recording_listener() -> (RecordedCalls, ChangeListener) {
    let calls: RecordedCalls = Arc::new(Mutex::new(Vec::new()));
    let calls_clone = calls.clone();
    let listener = ChangeListener::new(move |event: ChangeEvent| {
        calls_clone
            .lock()
            .unwrap()
            .push((event.action(), event.changes().docs()));
        Ok(())
    });
    (calls, listener)
}
