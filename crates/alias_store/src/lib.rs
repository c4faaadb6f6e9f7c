//! File-backed registry of short session aliases.
//!
//! Every operation reads the whole database, works in memory and, when it mutates, writes the
//! whole file back through a temporary sibling and an atomic rename. Nothing is cached between
//! calls. Expected failures come back as [`AliasError`]; storage faults are absorbed by
//! [`AliasStore::load`] and reported by [`AliasStore::save`] as `false`.

mod config;
mod error;
mod paths;
mod query;
mod schema;
mod store;
mod validate;

pub use config::{StoreConfig, PATH_OVERRIDE_VAR};
pub use error::{AliasError, AliasStoreError};
pub use paths::{aliases_path, ALIASES_DIR, ALIASES_FILE_NAME};
pub use query::{AliasListing, CleanupReport, ListOptions, ResolvedAlias};
pub use schema::{AliasDatabase, AliasEntry, Metadata, DATABASE_VERSION};
pub use store::{AliasStore, DeletedAlias, RenamedAlias, SetAliasOutcome, TitleUpdate};
pub use validate::{
    normalize_title_value, validate_alias_name, validate_session_path, MAX_ALIAS_LENGTH,
    RESERVED_ALIAS_NAMES,
};
