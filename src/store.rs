use std::path::Path;

use tracing::instrument;

use crate::error::SysexError;

/// Raw `.syx` file persistence.
///
/// A file holds exactly the bytes of one SysEx payload: no container, no
/// checksum, no metadata.
pub struct PatchStore;

impl PatchStore {
    /// Writes `payload` to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::Io`] when the file cannot be written.
    #[instrument(skip(payload), level = "debug", fields(path = %path.display(), len = payload.len()))]
    pub async fn save(path: &Path, payload: &[u8]) -> Result<(), SysexError> {
        tokio::fs::write(path, payload)
            .await
            .map_err(|source| SysexError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Reads the whole of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::Io`] when the file cannot be read.
    #[instrument(level = "debug", fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Vec<u8>, SysexError> {
        tokio::fs::read(path).await.map_err(|source| SysexError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wsx-store-{}-{name}.syx", std::process::id()))
    }

    #[tokio::test]
    async fn save_then_load_is_byte_identical() {
        let path = temp_path("round-trip");
        let payload = vec![0xF0, 0x42, 0x30, 0x28, 0x40, 0x00, 0x7F, 0xF7];

        PatchStore::save(&path, &payload)
            .await
            .expect("temporary file should be writable");
        let loaded = PatchStore::load(&path)
            .await
            .expect("temporary file should be readable");

        assert_eq!(payload, loaded);
        std::fs::remove_file(&path).expect("temporary file should be removable");
    }

    #[tokio::test]
    async fn load_reports_missing_file_path() {
        let path = temp_path("missing");

        let result = PatchStore::load(&path).await;

        assert_matches!(result, Err(SysexError::Io { path: failed, .. }) if failed == path);
    }
}
