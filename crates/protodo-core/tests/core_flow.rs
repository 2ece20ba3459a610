use std::fs;

use protodo_core::codec::import;
use protodo_core::filter::FilterPatch;
use protodo_core::model::{NewTask, Priority, Status};
use protodo_core::storage::{
    PersistedState, STORAGE_KEY, STORAGE_VERSION, SlotStore, THEME_KEY, VERSION_KEY,
};
use protodo_core::store::Store;
use tempfile::tempdir;

#[test]
fn store_roundtrip_and_filtering() {
    let temp = tempdir().expect("tempdir");

    let first_id;
    {
        let slots = SlotStore::open(temp.path()).expect("open slots");
        let mut store = Store::open(slots).expect("open store");

        let mut urgent = NewTask::new("Write parity harness");
        urgent.priority = Priority::High;
        urgent.description = Some("core flow coverage".to_string());
        first_id = store.add_todo(urgent).id;
        store.add_todo(NewTask::new("Water plants"));

        store.toggle_todo(&first_id);
    }

    let slots = SlotStore::open(temp.path()).expect("reopen slots");
    let mut store = Store::open(slots).expect("reopen store");

    let todos = store.get_todos();
    assert_eq!(todos.len(), 2);
    assert_eq!(todos[0].id, first_id);
    assert!(todos[0].completed);
    assert_eq!(todos[0].status, Status::Completed);

    store.set_filter(FilterPatch {
        status: Some(Some(vec![Status::Completed])),
        ..FilterPatch::default()
    });
    let visible = store.get_filtered_todos();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title, "Write parity harness");

    store.set_search_query("plants");
    store.set_filter(FilterPatch {
        status: Some(None),
        ..FilterPatch::default()
    });
    let visible = store.get_filtered_todos();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title, "Water plants");

    let stats = store.get_stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.completion_rate, 50);
}

#[test]
fn version_mismatch_wipes_persisted_slots() {
    let temp = tempdir().expect("tempdir");

    {
        let slots = SlotStore::open(temp.path()).expect("open slots");
        let mut store = Store::open(slots).expect("open store");
        store.add_todo(NewTask::new("doomed"));
    }

    fs::write(temp.path().join(VERSION_KEY), "v1").expect("downgrade version");
    fs::write(temp.path().join(THEME_KEY), "dark").expect("seed theme");

    let slots = SlotStore::open(temp.path()).expect("reopen slots");
    assert_eq!(
        slots
            .read_slot(VERSION_KEY)
            .expect("read version")
            .as_deref(),
        Some(STORAGE_VERSION)
    );
    assert!(!temp.path().join(THEME_KEY).exists());
    assert!(slots.read_slot(STORAGE_KEY).expect("read storage").is_none());

    // Fresh start: defaults are re-seeded, the old todo is gone.
    let store = Store::open(slots).expect("open store");
    assert!(store.get_todos().is_empty());
    assert_eq!(store.categories().len(), 4);
    assert_eq!(store.tags().len(), 3);
}

#[test]
fn import_appends_into_a_live_store() {
    let temp = tempdir().expect("tempdir");
    let slots = SlotStore::open(temp.path()).expect("open slots");
    let mut store = Store::open(slots).expect("open store");
    store.add_todo(NewTask::new("existing"));

    let file = temp.path().join("incoming.csv");
    fs::write(
        &file,
        "title,priority,completed,tags\nShip release,high,yes,a;b\nTidy desk,,no,\n",
    )
    .expect("write import file");

    let records = import::from_path(&file).expect("parse import file");
    let count = store.import_todos(records);
    assert_eq!(count, 2);

    let todos = store.get_todos();
    assert_eq!(todos.len(), 3);
    assert_eq!(todos[1].title, "Ship release");
    assert_eq!(todos[1].priority, Priority::High);
    assert!(todos[1].completed);
    assert_eq!(todos[1].tags, vec!["a", "b"]);
    assert_eq!(todos[1].position, 1);
    assert_eq!(todos[2].position, 2);

    let rejected = import::from_path(&temp.path().join("incoming.txt"));
    assert!(rejected.is_err());
}

#[test]
fn malformed_storage_slot_starts_fresh_but_keeps_version() {
    let temp = tempdir().expect("tempdir");
    {
        let slots = SlotStore::open(temp.path()).expect("open slots");
        slots
            .save_state(&PersistedState::default())
            .expect("save state");
    }

    fs::write(temp.path().join(STORAGE_KEY), "{broken").expect("corrupt slot");

    let slots = SlotStore::open(temp.path()).expect("reopen slots");
    let store = Store::open(slots).expect("open store");
    assert!(store.get_todos().is_empty());
    assert_eq!(store.categories().len(), 4);
}
