use std::collections::BTreeMap;

use log::warn;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const DATABASE_VERSION: &str = "1.0";

const SESSION_PATH: &str = "sessionPath";
const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";
const TITLE: &str = "title";

/// Root object of the alias database file.
///
/// Entries that are not JSON objects are kept aside untouched and written back on save, so
/// a hand-edited file never loses data just because another alias changed.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasDatabase {
    /// Informational format marker; never inspected.
    pub version: Value,
    pub aliases: BTreeMap<String, AliasEntry>,
    pub metadata: Metadata,
    pub extra: Map<String, Value>,
    pub(crate) unreadable: BTreeMap<String, Value>,
    pub(crate) recovered: bool,
}

impl Default for AliasDatabase {
    fn default() -> Self {
        Self {
            version: Value::String(DATABASE_VERSION.to_string()),
            aliases: BTreeMap::new(),
            metadata: Metadata::default(),
            extra: Map::new(),
            unreadable: BTreeMap::new(),
            recovered: false,
        }
    }
}

impl AliasDatabase {
    /// Builds a database from a parsed document. Returns `None` when the document is not an
    /// object or lacks an `aliases` object.
    pub(crate) fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut root) = value else {
            return None;
        };
        let Some(Value::Object(raw_aliases)) = root.remove("aliases") else {
            return None;
        };

        let version = root
            .remove("version")
            .unwrap_or_else(|| Value::String(DATABASE_VERSION.to_string()));
        let metadata = root
            .remove("metadata")
            .and_then(|value| serde_json::from_value::<Metadata>(value).ok())
            .unwrap_or_default();

        let mut aliases = BTreeMap::new();
        let mut unreadable = BTreeMap::new();
        for (name, raw_entry) in raw_aliases {
            match AliasEntry::from_value(raw_entry) {
                Ok(entry) => {
                    aliases.insert(name, entry);
                }
                Err(raw_entry) => {
                    warn!("alias entry '{name}' is not an object; keeping it as-is");
                    unreadable.insert(name, raw_entry);
                }
            }
        }

        let mut database = Self {
            version,
            aliases,
            metadata,
            extra: root,
            unreadable,
            recovered: false,
        };
        database.metadata.total_count = database.key_count();
        Some(database)
    }

    /// Empty database standing in for a file that exists but could not be read.
    pub(crate) fn recovered() -> Self {
        Self {
            recovered: true,
            ..Self::default()
        }
    }

    /// Whether `load` substituted this database for an unreadable file.
    #[must_use]
    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    /// Names whose entries could not be read and are carried through verbatim.
    pub fn unreadable_names(&self) -> impl Iterator<Item = &str> {
        self.unreadable.keys().map(String::as_str)
    }

    /// Whether `name` is taken, by a readable entry or not.
    #[must_use]
    pub fn occupies(&self, name: &str) -> bool {
        self.aliases.contains_key(name) || self.unreadable.contains_key(name)
    }

    /// Inserts `entry`, replacing anything stored under `name`.
    pub fn insert(&mut self, name: impl Into<String>, entry: AliasEntry) {
        let name = name.into();
        self.unreadable.remove(&name);
        self.aliases.insert(name, entry);
    }

    pub(crate) fn remove_unreadable(&mut self, name: &str) -> Option<Value> {
        self.unreadable.remove(name)
    }

    /// Number of keys under `aliases` in the file.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.aliases.len() + self.unreadable.len()
    }
}

impl Serialize for AliasDatabase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("version", &self.version)?;
        map.serialize_entry("aliases", &AliasesView(self))?;
        map.serialize_entry("metadata", &self.metadata)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct AliasesView<'a>(&'a AliasDatabase);

impl Serialize for AliasesView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let database = self.0;
        let mut map = serializer.serialize_map(Some(database.key_count()))?;
        for (name, entry) in &database.aliases {
            map.serialize_entry(name, entry)?;
        }
        for (name, raw) in &database.unreadable {
            map.serialize_entry(name, raw)?;
        }
        map.end()
    }
}

/// One alias record.
///
/// Known fields holding a value of the wrong type read as absent but keep their original
/// value, which is written back until the field is set through one of the setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    session_path: String,
    created_at: Option<String>,
    updated_at: Option<String>,
    title: Option<String>,
    title_present: bool,
    extra: Map<String, Value>,
}

impl AliasEntry {
    #[must_use]
    pub fn new(session_path: impl Into<String>, title: Option<String>, now: &str) -> Self {
        Self {
            session_path: session_path.into(),
            created_at: Some(now.to_string()),
            updated_at: Some(now.to_string()),
            title,
            title_present: true,
            extra: Map::new(),
        }
    }

    /// Reads an entry object; hands the value back when it is not an object.
    pub(crate) fn from_value(value: Value) -> Result<Self, Value> {
        let Value::Object(mut fields) = value else {
            return Err(value);
        };

        let title_present = fields.contains_key(TITLE);
        let session_path = take_string(&mut fields, SESSION_PATH).unwrap_or_default();
        let created_at = take_string(&mut fields, CREATED_AT);
        let updated_at = take_string(&mut fields, UPDATED_AT);
        let title = if matches!(fields.get(TITLE), Some(Value::Null)) {
            fields.remove(TITLE);
            None
        } else {
            take_string(&mut fields, TITLE)
        };

        Ok(Self {
            session_path,
            created_at,
            updated_at,
            title,
            title_present,
            extra: fields,
        })
    }

    #[must_use]
    pub fn session_path(&self) -> &str {
        &self.session_path
    }

    #[must_use]
    pub fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Original value of a field that did not have the expected type.
    #[must_use]
    pub fn raw_field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn set_session_path(&mut self, session_path: impl Into<String>) {
        self.extra.remove(SESSION_PATH);
        self.session_path = session_path.into();
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.extra.remove(TITLE);
        self.title_present = true;
        self.title = title;
    }

    pub fn touch(&mut self, now: &str) {
        self.extra.remove(UPDATED_AT);
        self.updated_at = Some(now.to_string());
    }
}

impl Serialize for AliasEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.extra.contains_key(SESSION_PATH) {
            map.serialize_entry(SESSION_PATH, &self.session_path)?;
        }
        if let Some(created_at) = &self.created_at {
            map.serialize_entry(CREATED_AT, created_at)?;
        }
        if let Some(updated_at) = &self.updated_at {
            map.serialize_entry(UPDATED_AT, updated_at)?;
        }
        if self.title_present && !self.extra.contains_key(TITLE) {
            map.serialize_entry(TITLE, &self.title)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Moves `key` out as a string, leaving any non-string value in place.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(_)) => match fields.remove(key) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "totalCount", default, deserialize_with = "lenient_count")]
    pub total_count: usize,
    #[serde(
        rename = "lastUpdated",
        default,
        deserialize_with = "lenient_string"
    )]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        _ => None,
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?
        .as_u64()
        .and_then(|count| usize::try_from(count).ok())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_documents_without_aliases_object() {
        assert!(AliasDatabase::from_value(json!([])).is_none());
        assert!(AliasDatabase::from_value(json!({ "version": "1.0" })).is_none());
        assert!(AliasDatabase::from_value(json!({ "aliases": [] })).is_none());
    }

    #[test]
    fn tolerates_malformed_entry_fields() {
        let database = AliasDatabase::from_value(json!({
            "version": 1,
            "aliases": {
                "work": { "sessionPath": 42, "createdAt": null, "title": ["x"] },
                "broken": "not an object",
            },
            "metadata": "garbage",
        }))
        .expect("aliases object should be accepted");

        assert_eq!(database.version, json!(1));
        assert_eq!(database.aliases.len(), 1);
        assert_eq!(database.unreadable_names().collect::<Vec<_>>(), vec!["broken"]);
        let entry = &database.aliases["work"];
        assert_eq!(entry.session_path(), "");
        assert_eq!(entry.raw_field("sessionPath"), Some(&json!(42)));
        assert!(entry.created_at().is_none());
        assert!(entry.title().is_none());
        assert_eq!(database.metadata.total_count, 2);
    }

    #[test]
    fn malformed_fields_are_written_back_verbatim() {
        let raw = json!({
            "sessionPath": "/s/o",
            "createdAt": 1_700_000_000,
            "updatedAt": null,
            "title": 7,
        });
        let entry = AliasEntry::from_value(raw.clone()).expect("object should read");

        assert_eq!(serde_json::to_value(&entry).expect("entry should serialize"), raw);
    }

    #[test]
    fn setters_replace_preserved_raw_values() {
        let mut entry = AliasEntry::from_value(json!({
            "sessionPath": "/s/o",
            "updatedAt": 5,
            "title": false,
        }))
        .expect("object should read");

        entry.set_title(Some("Fixed".to_string()));
        entry.touch("2026-03-01T00:00:00Z");

        assert_eq!(
            serde_json::to_value(&entry).expect("entry should serialize"),
            json!({
                "sessionPath": "/s/o",
                "updatedAt": "2026-03-01T00:00:00Z",
                "title": "Fixed",
            })
        );
    }

    #[test]
    fn absent_title_stays_absent_but_new_entries_write_null() {
        let loaded = AliasEntry::from_value(json!({ "sessionPath": "/s/a" }))
            .expect("object should read");
        assert_eq!(
            serde_json::to_value(&loaded).expect("entry should serialize"),
            json!({ "sessionPath": "/s/a" })
        );

        let created = AliasEntry::new("/s/b", None, "2026-01-01T00:00:00Z");
        assert_eq!(
            serde_json::to_value(&created).expect("entry should serialize")["title"],
            Value::Null
        );
    }

    #[test]
    fn unknown_fields_and_unreadable_entries_survive_serialization() {
        let database = AliasDatabase::from_value(json!({
            "version": "1.0",
            "aliases": {
                "a": {
                    "sessionPath": "/s/a",
                    "createdAt": "2026-01-01T00:00:00Z",
                    "updatedAt": "2026-01-01T00:00:00Z",
                    "title": null,
                    "pinned": true,
                },
                "legacy": "/s/legacy",
            },
            "metadata": { "totalCount": 2, "lastUpdated": "2026-01-01T00:00:00Z" },
            "owner": "me",
        }))
        .expect("document should load");

        let value = serde_json::to_value(&database).expect("database should serialize");
        assert_eq!(value["owner"], json!("me"));
        assert_eq!(value["aliases"]["a"]["pinned"], json!(true));
        assert_eq!(value["aliases"]["a"]["title"], Value::Null);
        assert_eq!(value["aliases"]["legacy"], json!("/s/legacy"));
        assert_eq!(value["metadata"]["totalCount"], json!(2));
    }

    #[test]
    fn insert_replaces_unreadable_entry_of_same_name() {
        let mut database = AliasDatabase::from_value(json!({
            "aliases": { "legacy": 3 },
        }))
        .expect("document should load");
        assert!(database.occupies("legacy"));

        database.insert(
            "legacy",
            AliasEntry::new("/s/new", None, "2026-01-01T00:00:00Z"),
        );
        assert_eq!(database.unreadable_names().count(), 0);
        assert_eq!(database.key_count(), 1);
    }
}
