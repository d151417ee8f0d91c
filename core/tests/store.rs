use texflow_core::store::{CONFIG_KEY, KEYBINDINGS_KEY, MACROS_SOURCE_KEY};
use texflow_core::{Config, KeyValueStore, Keymap, MemoryStore, RedbStore};

fn exercise(store: &dyn KeyValueStore) {
    assert_eq!(store.get(MACROS_SOURCE_KEY).unwrap(), None);
    store.set(MACROS_SOURCE_KEY, "[[rule]]\ntrigger = 'a'\nreplacement = 'b'\n").unwrap();
    store.set(MACROS_SOURCE_KEY, "").unwrap();
    assert_eq!(store.get(MACROS_SOURCE_KEY).unwrap().as_deref(), Some(""));
    assert!(store.remove(MACROS_SOURCE_KEY).unwrap());
    assert_eq!(store.get(MACROS_SOURCE_KEY).unwrap(), None);
}

#[test]
fn memory_store_contract() {
    exercise(&MemoryStore::new());
}

#[test]
fn redb_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = RedbStore::open(dir.path().join("texflow.redb")).unwrap();
    exercise(&store);
}

#[test]
fn redb_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("texflow.redb");

    let keymap_json = Keymap::default().to_json().unwrap();
    let config_toml = Config::default().to_toml_string().unwrap();
    {
        let store = RedbStore::open(&path).unwrap();
        store.set(KEYBINDINGS_KEY, &keymap_json).unwrap();
        store.set(CONFIG_KEY, &config_toml).unwrap();
    }

    let store = RedbStore::open(&path).unwrap();
    assert_eq!(store.path(), path.as_path());
    let restored = Keymap::from_json(&store.get(KEYBINDINGS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(restored, Keymap::default());
    let config = Config::from_toml_str(&store.get(CONFIG_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(
        store.keys().unwrap(),
        vec![CONFIG_KEY.to_string(), KEYBINDINGS_KEY.to_string()]
    );
}
