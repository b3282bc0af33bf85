//! JSON file persistence shared by the document stores.
//!
//! Each store keeps its working set in memory behind a `RwLock` and writes
//! the full collection back to disk after every mutation. A missing file
//! yields the default value; a corrupt file logs a warning and starts empty
//! rather than refusing to boot.

use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

/// Load a JSON document from `path`, falling back to `T::default()` when the
/// file does not exist or cannot be parsed.
pub async fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse {}: {}, starting empty",
                    path.display(),
                    e
                );
                T::default()
            }
        },
        Err(_) => T::default(),
    }
}

/// Write `value` to `path` as pretty-printed JSON, creating parent
/// directories as needed.
pub async fn save_pretty<T>(path: &Path, value: &T) -> std::io::Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let contents = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    tokio::fs::write(path, contents).await?;
    tracing::debug!("Saved {}", path.display());
    Ok(())
}
