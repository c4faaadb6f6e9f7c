use log::debug;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::error::AliasError;
use crate::schema::AliasEntry;
use crate::store::AliasStore;
use crate::validate::has_valid_alias_chars;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAlias {
    pub alias: String,
    pub session_path: String,
    pub title: Option<String>,
}

/// One alias as presented to listings and reverse lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasListing {
    pub name: String,
    pub session_path: String,
    pub title: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl AliasListing {
    fn from_entry(name: &str, entry: &AliasEntry) -> Self {
        Self {
            name: name.to_string(),
            session_path: entry.session_path().to_string(),
            title: entry.title().map(str::to_string),
            created_at: entry.created_at().map(str::to_string),
            updated_at: entry.updated_at().map(str::to_string),
        }
    }

    /// `updatedAt` if it parses, else `createdAt` if it parses, else `None` (oldest).
    fn effective_timestamp(&self) -> Option<OffsetDateTime> {
        self.updated_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.created_at.as_deref().and_then(parse_timestamp))
    }

    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .title
                .as_deref()
                .is_some_and(|title| title.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Case-insensitive substring matched against name and title.
    pub search: Option<String>,
    /// Maximum number of results; `Some(0)` means no limit.
    pub limit: Option<usize>,
}

impl ListOptions {
    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub total_checked: usize,
    pub removed: usize,
    pub removed_aliases: Vec<String>,
}

impl AliasStore {
    /// Looks up `name`. Names with characters outside `[A-Za-z0-9_-]` never resolve.
    #[must_use]
    pub fn resolve_alias(&self, name: &str) -> Option<ResolvedAlias> {
        if !has_valid_alias_chars(name) {
            return None;
        }

        let database = self.load();
        let entry = database.aliases.get(name)?;
        Some(ResolvedAlias {
            alias: name.to_string(),
            session_path: entry.session_path().to_string(),
            title: entry.title().map(str::to_string),
        })
    }

    /// Returns the session path behind `input` when it is a known alias, else `input` itself.
    #[must_use]
    pub fn resolve_session_alias(&self, input: &str) -> String {
        self.resolve_alias(input)
            .map_or_else(|| input.to_string(), |resolved| resolved.session_path)
    }

    /// Most recently touched first, optionally filtered and truncated.
    #[must_use]
    pub fn list_aliases(&self, options: &ListOptions) -> Vec<AliasListing> {
        let database = self.load();
        let needle = options
            .search
            .as_deref()
            .map(str::to_lowercase);

        let mut listings = database
            .aliases
            .iter()
            .map(|(name, entry)| AliasListing::from_entry(name, entry))
            .filter(|listing| {
                needle
                    .as_deref()
                    .map_or(true, |needle| listing.matches(needle))
            })
            .map(|listing| (listing.effective_timestamp(), listing))
            .collect::<Vec<_>>();

        // Stable sort: ties keep the name order of the underlying map.
        listings.sort_by(|(left, _), (right, _)| right.cmp(left));

        let mut listings = listings
            .into_iter()
            .map(|(_, listing)| listing)
            .collect::<Vec<_>>();
        if let Some(limit) = options.limit.filter(|limit| *limit > 0) {
            listings.truncate(limit);
        }
        listings
    }

    #[must_use]
    pub fn get_aliases_for_session(&self, session_path: &str) -> Vec<AliasListing> {
        self.load()
            .aliases
            .iter()
            .filter(|(_, entry)| entry.session_path() == session_path)
            .map(|(name, entry)| AliasListing::from_entry(name, entry))
            .collect()
    }

    /// Drops every alias whose session path `exists` rejects, saving once afterwards.
    pub fn cleanup_aliases<F>(&self, mut exists: F) -> Result<CleanupReport, AliasError>
    where
        F: FnMut(&str) -> bool,
    {
        let mut database = self.load();
        let total_checked = database.aliases.len();

        let removed_aliases = database
            .aliases
            .iter()
            .filter(|(_, entry)| !exists(entry.session_path()))
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>();

        if !removed_aliases.is_empty() {
            for name in &removed_aliases {
                database.aliases.remove(name);
            }
            if !self.save(&mut database) {
                return Err(AliasError::SaveFailed {
                    path: self.path.clone(),
                });
            }
        }

        debug!(
            "checked {total_checked} alias(es), removed {}",
            removed_aliases.len()
        );
        Ok(CleanupReport {
            total_checked,
            removed: removed_aliases.len(),
            removed_aliases,
        })
    }
}

/// Parses RFC 3339, offset-less ISO date-times (as UTC) and bare `YYYY-MM-DD` dates.
pub(crate) fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }

    let naive = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    if let Ok(parsed) = PrimitiveDateTime::parse(value, &naive) {
        return Some(parsed.assume_utc());
    }

    Date::parse(value, &format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}
