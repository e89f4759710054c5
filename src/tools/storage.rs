use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read a JSON document written by an earlier pipeline stage.
///
/// `label` names the file in the not-found error, e.g. `"Metadata file"`.
pub async fn read_json<T: DeserializeOwned>(path: &Path, label: &'static str) -> Result<T> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(Error::MissingInput {
            label,
            path: path.to_path_buf(),
        });
    }

    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes).map_err(|e| Error::MalformedFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Pretty-print `value` to `path`, replacing any previous file atomically
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_vec_pretty(value)?;
    let staging = staging_path(path);
    tokio::fs::write(&staging, &body).await?;
    tokio::fs::rename(&staging, path).await?;
    debug!("Wrote {} bytes to {:?}", body.len(), path);
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file() {
        let err = read_json::<Vec<u32>>(Path::new("/nonexistent/data.json"), "Data file")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = read_json::<Vec<u32>>(&path, "Data file").await.unwrap_err();
        assert!(matches!(err, Error::MalformedFile { .. }));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        write_json(&path, &vec!["é", "ü"]).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.contains("\"é\""), "non-ASCII is written verbatim");
        let back: Vec<String> = read_json(&path, "Data file").await.unwrap();
        assert_eq!(back, vec!["é", "ü"]);
        assert!(!staging_path(&path).exists());
    }
}
