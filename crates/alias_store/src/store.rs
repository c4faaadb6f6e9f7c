use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, warn};
use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::config::StoreConfig;
use crate::error::{AliasError, AliasStoreError};
use crate::paths::{corrupt_copy_path, temp_path};
use crate::schema::{AliasDatabase, AliasEntry};
use crate::validate::{
    normalize_title, normalize_title_value, validate_alias_name, validate_session_path,
};

/// Handle on the alias database file.
///
/// Holds only the location: every operation reads the whole file, works on the in-memory
/// copy and, for mutations, writes the whole file back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasStore {
    pub(crate) path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAliasOutcome {
    pub alias: String,
    pub is_new: bool,
    pub session_path: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedAlias {
    pub alias: String,
    pub session_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamedAlias {
    pub old_alias: String,
    pub new_alias: String,
    pub session_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleUpdate {
    pub alias: String,
    pub title: Option<String>,
}

impl AliasStore {
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        Self::at(&config.aliases_path)
    }

    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the location given by the environment, if one can be determined.
    pub fn from_env() -> Option<Self> {
        StoreConfig::from_env().map(|config| Self::new(&config))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the database, returning `Ok(None)` when the file does not exist.
    pub fn try_load(&self) -> Result<Option<AliasDatabase>, AliasStoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AliasStoreError::io(
                    "reading alias database",
                    &self.path,
                    source,
                ))
            }
        };

        let document = serde_json::from_str::<Value>(&contents)
            .map_err(|source| AliasStoreError::json_parse(&self.path, source))?;

        AliasDatabase::from_value(document)
            .map(Some)
            .ok_or_else(|| AliasStoreError::InvalidShape {
                path: self.path.clone(),
            })
    }

    /// Reads the database, substituting an empty one when the file is missing or unusable.
    #[must_use]
    pub fn load(&self) -> AliasDatabase {
        match self.try_load() {
            Ok(Some(database)) => {
                debug!(
                    "loaded {} alias(es) from {}",
                    database.aliases.len(),
                    self.path.display()
                );
                database
            }
            Ok(None) => {
                debug!("no alias database at {}", self.path.display());
                let mut database = AliasDatabase::default();
                database.metadata.last_updated = now_rfc3339().ok();
                database
            }
            Err(error) => {
                warn!("{error}; continuing with an empty alias database");
                let mut database = if matches!(
                    error,
                    AliasStoreError::JsonParse { .. } | AliasStoreError::InvalidShape { .. }
                ) {
                    AliasDatabase::recovered()
                } else {
                    AliasDatabase::default()
                };
                database.metadata.last_updated = now_rfc3339().ok();
                database
            }
        }
    }

    /// Persists the database atomically. Returns `false` when the write did not happen.
    pub fn save(&self, database: &mut AliasDatabase) -> bool {
        match self.try_save(database) {
            Ok(()) => true,
            Err(error) => {
                error!("{error}");
                false
            }
        }
    }

    /// Recomputes metadata and replaces the database file via a temporary sibling file.
    ///
    /// When `database` stands in for an unreadable file, that file is first copied aside.
    pub fn try_save(&self, database: &mut AliasDatabase) -> Result<(), AliasStoreError> {
        let now = now_rfc3339()?;
        database.metadata.total_count = database.key_count();
        database.metadata.last_updated = Some(now.clone());

        if let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|source| {
                AliasStoreError::io("creating alias database directory", parent, source)
            })?;
        }

        let json = serde_json::to_string_pretty(database)
            .map_err(|source| AliasStoreError::json_serialize(&self.path, source))?;

        if database.recovered {
            self.preserve_unreadable_file(&now);
        }

        let temp = temp_path(&self.path);
        if let Err(error) = write_synced(&temp, json.as_bytes()) {
            let _ = fs::remove_file(&temp);
            return Err(error);
        }

        if let Err(source) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(AliasStoreError::io(
                "replacing alias database",
                &self.path,
                source,
            ));
        }

        database.recovered = false;
        debug!(
            "saved {} alias(es) to {}",
            database.metadata.total_count,
            self.path.display()
        );
        Ok(())
    }

    fn preserve_unreadable_file(&self, now: &str) {
        let copy = corrupt_copy_path(&self.path, now);
        match fs::copy(&self.path, &copy) {
            Ok(_) => warn!(
                "preserved unreadable alias database {} as {}",
                self.path.display(),
                copy.display()
            ),
            Err(source) => warn!(
                "could not preserve unreadable alias database {}: {source}",
                self.path.display()
            ),
        }
    }

    fn persist(&self, database: &mut AliasDatabase) -> Result<(), AliasError> {
        if self.save(database) {
            Ok(())
        } else {
            Err(AliasError::SaveFailed {
                path: self.path.clone(),
            })
        }
    }

    /// Creates `name` or repoints it, keeping `createdAt` of an existing entry.
    pub fn set_alias(
        &self,
        name: &str,
        session_path: &str,
        title: Option<&str>,
    ) -> Result<SetAliasOutcome, AliasError> {
        validate_alias_name(name)?;
        validate_session_path(session_path)?;

        let title = normalize_title(title);
        let now = timestamp()?;
        let mut database = self.load();

        let (is_new, stored_title) = match database.aliases.get_mut(name) {
            Some(entry) => {
                entry.set_session_path(session_path);
                if title.is_some() {
                    entry.set_title(title);
                }
                entry.touch(&now);
                (false, entry.title().map(str::to_string))
            }
            None => {
                database.insert(name, AliasEntry::new(session_path, title.clone(), &now));
                (true, title)
            }
        };

        self.persist(&mut database)?;
        Ok(SetAliasOutcome {
            alias: name.to_string(),
            is_new,
            session_path: session_path.to_string(),
            title: stored_title,
        })
    }

    pub fn delete_alias(&self, name: &str) -> Result<DeletedAlias, AliasError> {
        let mut database = self.load();
        let session_path = match database.aliases.remove(name) {
            Some(entry) => entry.session_path().to_string(),
            None => database
                .remove_unreadable(name)
                .ok_or_else(|| not_found(name))?
                .as_str()
                .unwrap_or_default()
                .to_string(),
        };

        self.persist(&mut database)?;
        Ok(DeletedAlias {
            alias: name.to_string(),
            session_path,
        })
    }

    pub fn rename_alias(&self, old_name: &str, new_name: &str) -> Result<RenamedAlias, AliasError> {
        let mut database = self.load();
        if !database.aliases.contains_key(old_name) {
            return Err(not_found(old_name));
        }

        validate_alias_name(new_name)?;

        if new_name != old_name && database.occupies(new_name) {
            return Err(AliasError::AlreadyExists {
                name: new_name.to_string(),
            });
        }

        let now = timestamp()?;
        let Some(mut entry) = database.aliases.remove(old_name) else {
            return Err(not_found(old_name));
        };
        entry.touch(&now);
        let session_path = entry.session_path().to_string();
        database.insert(new_name, entry);

        self.persist(&mut database)?;
        Ok(RenamedAlias {
            old_alias: old_name.to_string(),
            new_alias: new_name.to_string(),
            session_path,
        })
    }

    /// Sets or clears the title; `None` and `Some("")` both clear it.
    pub fn update_alias_title(
        &self,
        name: &str,
        title: Option<&str>,
    ) -> Result<TitleUpdate, AliasError> {
        let database = self.load();
        self.store_title(database, name, normalize_title(title))
    }

    /// Title update for hosts holding untyped input. Anything other than a string or `null`
    /// is rejected before the database is touched.
    pub fn update_alias_title_value(
        &self,
        name: &str,
        title: &Value,
    ) -> Result<TitleUpdate, AliasError> {
        let database = self.load();
        if !database.aliases.contains_key(name) {
            return Err(not_found(name));
        }
        let title = normalize_title_value(title)?;
        self.store_title(database, name, title)
    }

    fn store_title(
        &self,
        mut database: AliasDatabase,
        name: &str,
        title: Option<String>,
    ) -> Result<TitleUpdate, AliasError> {
        let now = timestamp()?;
        let entry = database
            .aliases
            .get_mut(name)
            .ok_or_else(|| not_found(name))?;
        entry.set_title(title.clone());
        entry.touch(&now);

        self.persist(&mut database)?;
        Ok(TitleUpdate {
            alias: name.to_string(),
            title,
        })
    }
}

pub(crate) fn not_found(name: &str) -> AliasError {
    AliasError::NotFound {
        name: name.to_string(),
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), AliasStoreError> {
    let mut file = File::create(path)
        .map_err(|source| AliasStoreError::io("creating temporary alias file", path, source))?;
    file.write_all(bytes)
        .map_err(|source| AliasStoreError::io("writing temporary alias file", path, source))?;
    file.sync_all()
        .map_err(|source| AliasStoreError::io("syncing temporary alias file", path, source))
}

pub(crate) fn now_rfc3339() -> Result<String, AliasStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(AliasStoreError::ClockFormat)
}

fn timestamp() -> Result<String, AliasError> {
    now_rfc3339().map_err(|error| {
        error!("{error}");
        AliasError::ClockUnavailable
    })
}
