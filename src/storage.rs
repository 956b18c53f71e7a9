use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::model::{AppData, LayoutNode, Preferences, DEFAULT_ACCENT};
use crate::store::{
    KeyValueStore, ACTIVE_WIDGETS_KEY, BACKUP_KEY, DATA_KEY, LAYOUT_KEY, LEGACY_DATA_KEY,
    LEGACY_LAYOUT_KEY, LEGACY_PREFS_KEY, PREFS_KEY,
};
use crate::validate::{sanitize_color, validate};

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error("invalid data: {}", .0.join(", "))]
    Invalid(Vec<String>),
    #[error("import bundle must be a JSON object")]
    BadBundle,
}

/// The export/import file: `layout` travels as a JSON-encoded string.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportBundle {
    pub data: AppData,
    pub layout: String,
    pub prefs: Preferences,
}

const LEGACY_KEYS: [(&str, &str); 3] = [
    (LEGACY_DATA_KEY, DATA_KEY),
    (LEGACY_LAYOUT_KEY, LAYOUT_KEY),
    (LEGACY_PREFS_KEY, PREFS_KEY),
];

/// Copies predecessor keys to the current ones when the current key is
/// absent. Never overwrites; running it again is a no-op.
pub fn migrate_legacy_keys(store: &mut dyn KeyValueStore) -> Result<bool, StorageError> {
    let mut migrated = false;
    for (old, new) in LEGACY_KEYS {
        if store.contains(new)? {
            continue;
        }
        if let Some(value) = store.get(old)? {
            info!(from = old, to = new, "migrating legacy key");
            store.set(new, &value)?;
            migrated = true;
        }
    }
    if migrated {
        info!("legacy migration complete");
    }
    Ok(migrated)
}

/// Loads AppData, falling back to defaults on any read, parse or schema
/// failure.
pub fn load(store: &mut dyn KeyValueStore) -> AppData {
    if let Err(err) = migrate_legacy_keys(store) {
        warn!(%err, "legacy migration failed");
    }
    read_data(store)
}

fn read_data(store: &dyn KeyValueStore) -> AppData {
    let raw = match store.get(DATA_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return AppData::default(),
        Err(err) => {
            warn!(%err, "reading data failed, using defaults");
            return AppData::default();
        }
    };
    parse_data(&raw).unwrap_or_else(|err| {
        warn!(%err, "stored data rejected, using defaults");
        AppData::default()
    })
}

pub fn parse_data(raw: &str) -> Result<AppData, StorageError> {
    let blob: Value = serde_json::from_str(raw)?;
    decode_data(blob)
}

fn decode_data(blob: Value) -> Result<AppData, StorageError> {
    let validation = validate(&blob);
    if !validation.valid {
        return Err(StorageError::Invalid(validation.errors));
    }
    Ok(serde_json::from_value(blob)?)
}

pub fn save(store: &mut dyn KeyValueStore, data: &AppData) -> Result<(), StorageError> {
    let serialized = serde_json::to_string(data)?;
    store.set(DATA_KEY, &serialized)
}

pub fn load_preferences(store: &dyn KeyValueStore) -> Preferences {
    match store.get(PREFS_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(%err, "preferences unreadable, using defaults");
            Preferences::default()
        }),
        Ok(None) => Preferences::default(),
        Err(err) => {
            warn!(%err, "reading preferences failed");
            Preferences::default()
        }
    }
}

pub fn save_preferences(store: &mut dyn KeyValueStore, prefs: &Preferences) -> Result<(), StorageError> {
    store.set(PREFS_KEY, &serde_json::to_string(prefs)?)
}

pub fn load_layout(store: &dyn KeyValueStore) -> Vec<LayoutNode> {
    read_list(store, LAYOUT_KEY)
}

/// Saves the layout and the flat list of active widget ids derived from it.
pub fn save_layout(store: &mut dyn KeyValueStore, layout: &[LayoutNode]) -> Result<(), StorageError> {
    store.set(LAYOUT_KEY, &serde_json::to_string(layout)?)?;
    let active: Vec<&str> = layout
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| !id.is_empty())
        .collect();
    store.set(ACTIVE_WIDGETS_KEY, &serde_json::to_string(&active)?)
}

pub fn load_active_ids(store: &dyn KeyValueStore) -> Vec<String> {
    read_list(store, ACTIVE_WIDGETS_KEY)
}

fn read_list<T: serde::de::DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Vec<T> {
    match store.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(%err, key, "malformed list, treating as absent");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(err) => {
            warn!(%err, key, "read failed, treating as absent");
            Vec::new()
        }
    }
}

pub fn export_all(store: &dyn KeyValueStore) -> Result<ExportBundle, StorageError> {
    Ok(ExportBundle {
        data: read_data(store),
        layout: serde_json::to_string(&load_layout(store))?,
        prefs: load_preferences(store),
    })
}

/// Imports an exported bundle. Every present part is parsed and the data
/// part validated before anything is written; a failure leaves storage
/// untouched. A snapshot of the current state is kept under the backup key.
pub fn import_all(store: &mut dyn KeyValueStore, bundle: &Value) -> Result<(), StorageError> {
    let parts = bundle.as_object().ok_or(StorageError::BadBundle)?;

    let data = match parts.get("data") {
        Some(blob) if is_present(blob) => Some(decode_data(blob.clone())?),
        _ => None,
    };
    let layout: Option<Vec<LayoutNode>> = match parts.get("layout") {
        Some(Value::String(encoded)) if !encoded.is_empty() => Some(serde_json::from_str(encoded)?),
        Some(nodes @ Value::Array(_)) => Some(serde_json::from_value(nodes.clone())?),
        _ => None,
    };
    let prefs = match parts.get("prefs") {
        Some(blob) if is_present(blob) => {
            let mut prefs: Preferences = serde_json::from_value(blob.clone())?;
            prefs.accent = sanitize_color(&prefs.accent, DEFAULT_ACCENT);
            Some(prefs)
        }
        _ => None,
    };

    let backup = export_all(store)?;
    store.set(BACKUP_KEY, &serde_json::to_string(&backup)?)?;

    if let Some(data) = data {
        save(store, &data)?;
    }
    if let Some(layout) = layout {
        save_layout(store, &layout)?;
    }
    if let Some(prefs) = prefs {
        save_preferences(store, &prefs)?;
    }
    info!("import applied");
    Ok(())
}

fn is_present(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// Wipes the whole namespace.
pub fn reset(store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
    warn!("resetting all stored documents");
    store.clear()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Snippet};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn sample_data() -> AppData {
        let mut data = AppData::default();
        data.add_task("ship it", Priority::Urgent).unwrap();
        data.add_bookmark("Docs", "Rust", "https://doc.rust-lang.org").unwrap();
        data.notes = "remember the milk".into();
        data.snippets.push(Snippet {
            title: "hello".into(),
            code: "println!(\"hi\");".into(),
        });
        data.add_feed("LinuxFr", "https://linuxfr.org/news.atom", "Open Source", 5)
            .unwrap();
        data
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = MemoryStore::new();
        let data = sample_data();
        save(&mut store, &data).unwrap();
        assert_eq!(load(&mut store), data);
    }

    #[test]
    fn empty_storage_yields_defaults() {
        let mut store = MemoryStore::new();
        let data = load(&mut store);
        assert_eq!(data.bookmarks, crate::model::default_bookmarks());
        assert!(data.tasks.is_empty());
        assert!(data.notes.is_empty());
        assert!(data.snippets.is_empty());
    }

    #[test]
    fn malformed_json_yields_defaults() {
        for raw in ["{", "not json", "[1,2", "{\"tasks\": 7", ""] {
            let mut store = MemoryStore::new();
            store.set(DATA_KEY, raw).unwrap();
            assert_eq!(load(&mut store), AppData::default(), "input {raw:?}");
        }
    }

    #[test]
    fn schema_failure_yields_defaults() {
        let mut store = MemoryStore::new();
        store
            .set(DATA_KEY, r#"{"tasks":[{"id":"1","title":"x","priority":"later"}]}"#)
            .unwrap();
        assert_eq!(load(&mut store), AppData::default());
    }

    #[test]
    fn malformed_prefs_and_layout_fall_back() {
        let mut store = MemoryStore::new();
        store.set(PREFS_KEY, "{{").unwrap();
        store.set(LAYOUT_KEY, "nope").unwrap();
        assert_eq!(load_preferences(&store), Preferences::default());
        assert!(load_layout(&store).is_empty());
    }

    #[test]
    fn migration_is_additive_and_idempotent() {
        let mut store = MemoryStore::new();
        store.set(LEGACY_DATA_KEY, "{\"notes\":\"old\"}").unwrap();
        store.set(LEGACY_LAYOUT_KEY, "[]").unwrap();
        store.set(LEGACY_PREFS_KEY, "{\"accent\":\"#000000\"}").unwrap();
        store.set(PREFS_KEY, "{\"accent\":\"#ffffff\"}").unwrap();

        assert!(migrate_legacy_keys(&mut store).unwrap());
        let once = store.clone();
        assert!(!migrate_legacy_keys(&mut store).unwrap());

        for key in [DATA_KEY, LAYOUT_KEY, PREFS_KEY] {
            assert_eq!(store.get(key).unwrap(), once.get(key).unwrap());
        }
        assert_eq!(store.get(DATA_KEY).unwrap().as_deref(), Some("{\"notes\":\"old\"}"));
        assert_eq!(
            store.get(PREFS_KEY).unwrap().as_deref(),
            Some("{\"accent\":\"#ffffff\"}")
        );
    }

    #[test]
    fn save_layout_records_active_ids() {
        let mut store = MemoryStore::new();
        let layout = vec![
            LayoutNode { id: "tasks".into(), x: 0, y: 0, w: 4, h: 4 },
            LayoutNode { id: "notes".into(), x: 4, y: 0, w: 4, h: 4 },
        ];
        save_layout(&mut store, &layout).unwrap();
        assert_eq!(load_layout(&store), layout);
        assert_eq!(load_active_ids(&store), vec!["tasks", "notes"]);
    }

    #[test]
    fn export_encodes_layout_as_string() {
        let mut store = MemoryStore::new();
        let layout = vec![LayoutNode { id: "notes".into(), x: 0, y: 0, w: 4, h: 4 }];
        save_layout(&mut store, &layout).unwrap();
        let bundle = serde_json::to_value(export_all(&store).unwrap()).unwrap();
        assert!(bundle["layout"].is_string());
        assert!(bundle["data"]["bookmarks"].is_array());
        assert_eq!(bundle["prefs"]["accent"], DEFAULT_ACCENT);
    }

    #[test]
    fn import_round_trips_an_export() {
        let mut source = MemoryStore::new();
        save(&mut source, &sample_data()).unwrap();
        save_layout(
            &mut source,
            &[LayoutNode { id: "tasks".into(), x: 0, y: 0, w: 4, h: 4 }],
        )
        .unwrap();
        let bundle = serde_json::to_value(export_all(&source).unwrap()).unwrap();

        let mut target = MemoryStore::new();
        import_all(&mut target, &bundle).unwrap();
        assert_eq!(load(&mut target), load(&mut source));
        assert_eq!(load_active_ids(&target), vec!["tasks"]);
        assert!(target.contains(BACKUP_KEY).unwrap());
    }

    #[test]
    fn import_accepts_layout_as_array() {
        let mut store = MemoryStore::new();
        let bundle = json!({"layout": [{"id": "notes", "x": 0, "y": 0, "w": 4, "h": 4}]});
        import_all(&mut store, &bundle).unwrap();
        assert_eq!(load_active_ids(&store), vec!["notes"]);
    }

    #[test]
    fn import_with_task_missing_priority_is_rejected() {
        let mut store = MemoryStore::new();
        let original = sample_data();
        save(&mut store, &original).unwrap();
        let before = store.clone();

        let bundle = json!({
            "data": {"tasks": [{"id": "1", "title": "no priority"}]},
            "layout": "[]",
            "prefs": {"accent": "#000000", "bgUrl": ""}
        });
        let err = import_all(&mut store, &bundle).unwrap_err();
        assert!(matches!(err, StorageError::Invalid(_)));
        assert_eq!(load(&mut store), original);
        assert_eq!(store.keys().unwrap(), before.keys().unwrap());
        assert!(!store.contains(BACKUP_KEY).unwrap());
    }

    #[test]
    fn import_with_broken_layout_writes_nothing() {
        let mut store = MemoryStore::new();
        let bundle = json!({"data": {"notes": "fresh"}, "layout": "[{"});
        assert!(import_all(&mut store, &bundle).is_err());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn import_rejects_non_object_bundle() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            import_all(&mut store, &json!("hello")),
            Err(StorageError::BadBundle)
        ));
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = MemoryStore::new();
        save(&mut store, &sample_data()).unwrap();
        save_preferences(&mut store, &Preferences::default()).unwrap();
        reset(&mut store).unwrap();
        assert!(store.keys().unwrap().is_empty());
    }
}
