use std::path::{Path, PathBuf};

pub const ALIASES_DIR: &str = ".claude";
pub const ALIASES_FILE_NAME: &str = "session-aliases.json";

/// Location of the alias database under a home directory.
#[must_use]
pub fn aliases_path(home: &Path) -> PathBuf {
    home.join(ALIASES_DIR).join(ALIASES_FILE_NAME)
}

#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "tmp")
}

/// Sibling that keeps an unreadable database, stamped so earlier copies survive.
#[must_use]
pub fn corrupt_copy_path(path: &Path, timestamp: &str) -> PathBuf {
    sibling_with_suffix(
        path,
        &format!("corrupt-{}", sanitize_timestamp_for_filename(timestamp)),
    )
}

#[must_use]
pub fn sanitize_timestamp_for_filename(timestamp: &str) -> String {
    timestamp
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' | ' ' => '-',
            _ => c,
        })
        .collect()
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| ALIASES_FILE_NAME.into());
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
