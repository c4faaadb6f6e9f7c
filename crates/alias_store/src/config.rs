//! Environment configuration.

use std::env;
use std::path::{Path, PathBuf};

use crate::paths::aliases_path;

pub const PATH_OVERRIDE_VAR: &str = "SESSION_ALIASES_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub aliases_path: PathBuf,
}

impl StoreConfig {
    /// Resolves the database location from `SESSION_ALIASES_PATH`, falling back to the
    /// user's home directory. Returns `None` when neither is available.
    pub fn from_env() -> Option<Self> {
        if let Some(path) = env_string_opt(PATH_OVERRIDE_VAR) {
            return Some(Self::with_path(path));
        }

        dirs::home_dir().map(|home| Self::with_home(&home))
    }

    #[must_use]
    pub fn with_home(home: &Path) -> Self {
        Self {
            aliases_path: aliases_path(home),
        }
    }

    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            aliases_path: path.into(),
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{StoreConfig, PATH_OVERRIDE_VAR};
    use std::env;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, OnceLock};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn override_var_wins_over_home() {
        let _lock = env_lock();
        let _guard = set_env_guard(PATH_OVERRIDE_VAR, Some("/tmp/aliases.json"));

        let config = StoreConfig::from_env().expect("override should resolve");
        assert_eq!(config.aliases_path, PathBuf::from("/tmp/aliases.json"));
    }

    #[test]
    fn blank_override_falls_back_to_home() {
        let _lock = env_lock();
        let _guard = set_env_guard(PATH_OVERRIDE_VAR, Some("   "));

        if let Some(config) = StoreConfig::from_env() {
            assert!(config.aliases_path.ends_with(".claude/session-aliases.json"));
        }
    }

    #[test]
    fn with_home_is_a_pure_function_of_home() {
        let config = StoreConfig::with_home(Path::new("/profiles/alt"));
        assert_eq!(
            config.aliases_path,
            PathBuf::from("/profiles/alt/.claude/session-aliases.json")
        );
    }
}
