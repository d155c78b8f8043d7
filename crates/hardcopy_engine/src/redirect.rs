//! On-disk redirects from an extension-less asset name to the real file.
//!
//! A redirect is a relative symbolic link living next to its target inside the
//! media directory, e.g. `image_php -> image_php.png`. Links persist across
//! runs and are never rewritten once created.

use std::io;
use std::path::{Path, PathBuf};

use crate::PipelineError;

/// Target of the redirect at `link`, resolved against the link's directory.
///
/// `Ok(None)` when nothing exists at `link`. A regular file in place of a
/// link is an error.
pub async fn read_redirect(link: &Path) -> Result<Option<PathBuf>, PipelineError> {
    let meta = match tokio::fs::symlink_metadata(link).await {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if !meta.file_type().is_symlink() {
        return Err(PipelineError::Redirect {
            path: link.to_path_buf(),
            message: "not a symbolic link".into(),
        });
    }
    let target = tokio::fs::read_link(link).await?;
    let resolved = match link.parent() {
        Some(dir) if target.is_relative() => dir.join(target),
        _ => target,
    };
    Ok(Some(resolved))
}

/// Create `link -> target_name`, where `target_name` is a sibling file name.
pub async fn create_redirect(link: &Path, target_name: &str) -> Result<(), PipelineError> {
    symlink(Path::new(target_name), link)
        .await
        .map_err(|err| PipelineError::Redirect {
            path: link.to_path_buf(),
            message: err.to_string(),
        })
}

/// Drop a redirect whose target vanished so it can be recreated.
pub async fn remove_redirect(link: &Path) -> Result<(), PipelineError> {
    match tokio::fs::remove_file(link).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink_file(target, link).await
}
