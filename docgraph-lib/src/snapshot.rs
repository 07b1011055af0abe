//! JSON snapshot files for the in-memory stores.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| Error::Store(format!("failed to encode snapshot: {e}")))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Store(format!("failed to create {}: {e}", parent.display())))?;
    }

    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| Error::Store(format!("failed to write {}: {e}", path.display())))
}

pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("snapshot {}", path.display())));
        }
        Err(e) => {
            return Err(Error::Store(format!("failed to read {}: {e}", path.display())));
        }
    };

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Store(format!("corrupt snapshot {}: {e}", path.display())))
}
