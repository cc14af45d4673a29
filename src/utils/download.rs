use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::AsyncWriteExt;

use crate::error::FarmacoError;

const EXPORT_DIR_ENV: &str = "FARMACOHUB_EXPORT_DIR";

/// Resolves where exported documents land: explicit flag, then
/// `FARMACOHUB_EXPORT_DIR`, then the user's download directory, then the
/// current directory.
pub fn export_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = crate::sources::env_value(EXPORT_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Writes `content` to `dir/file_name` through a uniquely named temp file and
/// a rename, so a half-written document never appears under the final name.
/// An existing file with the same name is replaced.
pub async fn save_atomic(
    dir: &Path,
    file_name: &str,
    content: &[u8],
) -> Result<PathBuf, FarmacoError> {
    if file_name.is_empty() || file_name.contains(['/', '\\']) {
        return Err(FarmacoError::InvalidArgument(format!(
            "Invalid export file name: {file_name:?}"
        )));
    }
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut opened = None;
    for attempt in 0..32_u32 {
        let candidate = dir.join(format!(
            ".{}.{}.{}.tmp",
            file_name,
            std::process::id(),
            seed.saturating_add(attempt as u128)
        ));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => {
                opened = Some((candidate, file));
                break;
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
        }
    }
    let Some((tmp_path, mut file)) = opened else {
        return Err(FarmacoError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "Unable to allocate temporary export file",
        )));
    };

    let written = async {
        file.write_all(content).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;
    drop(file);
    if let Err(err) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err.into());
    }

    if let Err(err) = tokio::fs::rename(&tmp_path, &path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err.into());
    }
    Ok(path)
}
