//! Background downloads of the current direct stream.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::UserDirs;
use log::{info, warn};
use tokio::io::AsyncWriteExt;

use crate::events::{HostEvent, HostSender};

/// Start saving `url` into the user's download directory
///
/// Returns the target path once the transfer is running; the outcome is
/// reported later as [`HostEvent::Download`].
pub fn start(url: &str, events: HostSender) -> Result<PathBuf, String> {
    let dir = UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .ok_or_else(|| "no download directory".to_string())?;
    let runtime = tokio::runtime::Handle::try_current().map_err(|e| e.to_string())?;

    let target = unique_path(&dir, &file_name_for(url));
    let url = url.to_string();
    let path = target.clone();
    runtime.spawn(async move {
        let result = match fetch(&url, &path).await {
            Ok(bytes) => {
                info!("Saved {} bytes to {}", bytes, path.display());
                Ok(path)
            }
            Err(e) => {
                warn!("Download of {} failed: {:#}", url, e);
                Err(format!("{:#}", e))
            }
        };
        let _ = events.send(HostEvent::Download(result));
    });

    Ok(target)
}

async fn fetch(url: &str, path: &Path) -> Result<u64> {
    let mut response = reqwest::get(url)
        .await
        .context("request failed")?
        .error_for_status()?;
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// File name for a URL, taken from its last path segment
pub fn file_name_for(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let without_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
    // Drop the host so a bare domain does not become the file name
    let name = without_scheme
        .split_once('/')
        .and_then(|(_, path)| path.rsplit('/').find(|segment| !segment.is_empty()))
        .unwrap_or_default();

    if name.is_empty() {
        "video.mp4".to_string()
    } else {
        name.to_string()
    }
}

/// `dir/name`, or `dir/stem (n).ext` when that already exists
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match extension {
            Some(extension) => dir.join(format!("{} ({}).{}", stem, n, extension)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_last_segment() {
        assert_eq!(file_name_for("https://cdn.example.com/media/movie.mp4"), "movie.mp4");
        assert_eq!(
            file_name_for("https://cdn.example.com/media/movie.mp4?token=abc#t=10"),
            "movie.mp4"
        );
        assert_eq!(file_name_for("https://cdn.example.com/media/clip/"), "clip");
    }

    #[test]
    fn test_file_name_falls_back() {
        assert_eq!(file_name_for("https://cdn.example.com"), "video.mp4");
        assert_eq!(file_name_for("https://cdn.example.com/"), "video.mp4");
    }

    #[test]
    fn test_unique_path_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_path(dir.path(), "movie.mp4"), dir.path().join("movie.mp4"));

        std::fs::write(dir.path().join("movie.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("movie (1).mp4"), b"x").unwrap();
        assert_eq!(
            unique_path(dir.path(), "movie.mp4"),
            dir.path().join("movie (2).mp4")
        );
    }
}
