use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::cache::AssetCache;
use crate::convert::ImageConverter;
use crate::redirect::read_redirect;
use crate::sanitize::image_path_for_url;
use crate::settings::EngineSettings;
use crate::{FailureKind, FetchError, PipelineError};

/// How the fetcher finds the final file name for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRoute {
    /// The URL suffix already names a supported format.
    Direct,
    /// Extension discovery left a redirect at the canonical path; `convert`
    /// is set when the served format must be converted after download.
    Redirected { convert: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub url: Url,
    pub route: FetchRoute,
}

impl FetchJob {
    pub fn direct(url: Url) -> Self {
        Self {
            url,
            route: FetchRoute::Direct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

pub fn build_client(settings: &EngineSettings) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

/// Materializes the images of one document variant under the media directory.
///
/// Every variant gets its own store, and with it a fresh [`AssetCache`]; the
/// files and redirects on disk are shared between variants and runs.
pub struct AssetStore {
    client: reqwest::Client,
    converter: Arc<dyn ImageConverter>,
    settings: EngineSettings,
    media_dir: PathBuf,
    cache: Arc<AssetCache>,
}

impl AssetStore {
    pub fn new(
        client: reqwest::Client,
        converter: Arc<dyn ImageConverter>,
        settings: EngineSettings,
        media_dir: PathBuf,
    ) -> Self {
        Self {
            client,
            converter,
            settings,
            media_dir,
            cache: Arc::new(AssetCache::new()),
        }
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Owned handle on the cache, held by the pass two renderer.
    pub fn shared_cache(&self) -> Arc<AssetCache> {
        Arc::clone(&self.cache)
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Path under which the asset for `url` is looked up, before redirects.
    pub fn canonical_path(&self, url: &Url) -> PathBuf {
        image_path_for_url(url.as_str(), &self.media_dir, true)
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Download the asset behind `job` unless it is already on disk.
    ///
    /// Callers claim the canonical path with [`AssetCache::try_begin`] first;
    /// the store itself does not deduplicate.
    pub async fn fetch(&self, job: FetchJob) -> Result<(), PipelineError> {
        let canonical = self.canonical_path(&job.url);
        let (final_path, working_path) = match job.route {
            FetchRoute::Direct => (
                canonical.clone(),
                image_path_for_url(job.url.as_str(), &self.media_dir, false),
            ),
            FetchRoute::Redirected { convert } => {
                let target = read_redirect(&canonical).await?.ok_or_else(|| {
                    PipelineError::Redirect {
                        path: canonical.clone(),
                        message: "redirect missing after extension discovery".into(),
                    }
                })?;
                let working = if convert {
                    target.with_extension("webp")
                } else {
                    target.clone()
                };
                (target, working)
            }
        };

        if let Some(size) = existing_size(&final_path).await? {
            engine_debug!("Asset for {} already present at {:?}", job.url, final_path);
            self.record(&canonical, &final_path, size);
            return Ok(());
        }

        engine_debug!("Downloading {} to {:?}", job.url, working_path);
        let Some(downloaded) = self.download(&job.url, &working_path).await? else {
            self.cache.mark_absent(&canonical);
            return Ok(());
        };

        let size = if working_path == final_path {
            downloaded
        } else {
            self.converter.convert(&working_path, &final_path).await?;
            tokio::fs::remove_file(&working_path).await?;
            tokio::fs::metadata(&final_path).await?.len()
        };

        engine_info!("Fetched {} -> {:?} ({} bytes)", job.url, final_path, size);
        self.record(&canonical, &final_path, size);
        Ok(())
    }

    fn record(&self, canonical: &Path, final_path: &Path, size: u64) {
        self.cache.mark_fetched(final_path, size);
        if canonical != final_path {
            self.cache.set_redirect(canonical, final_path);
        }
    }

    /// Stream the body into `target` via a temp file in the same directory.
    /// `Ok(None)` when the server answers 404.
    async fn download(&self, url: &Url, target: &Path) -> Result<Option<u64>, PipelineError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            engine_warn!("{} answered 404, leaving asset absent", url);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("GET {url}: {status}"),
            )
            .into());
        }

        let max_bytes = self.settings.max_asset_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(max_bytes, content_len).into());
            }
        }

        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        let (file, temp_path) = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(dir)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            written += chunk.len() as u64;
            if written > max_bytes {
                return Err(too_large(max_bytes, written).into());
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        temp_path
            .persist(target)
            .map_err(|err| PipelineError::Io(err.error))?;
        Ok(Some(written))
    }
}

/// GET an HTML page, rejecting non-HTML content types and oversized bodies.
pub async fn fetch_page(
    client: &reqwest::Client,
    settings: &EngineSettings,
    url: &str,
) -> Result<FetchOutput, FetchError> {
    let parsed = Url::parse(url)
        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

    let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }

    let max_bytes = settings.max_page_bytes;
    if let Some(content_len) = response.content_length() {
        if content_len > max_bytes {
            return Err(too_large(max_bytes, content_len));
        }
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    if let Some(ct) = content_type.as_deref() {
        let essence = ct.split(';').next().unwrap_or(ct).trim();
        let allowed = settings
            .page_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(essence));
        if !allowed {
            return Err(FetchError::new(
                FailureKind::UnsupportedContentType {
                    content_type: ct.to_string(),
                },
                "unsupported content type",
            ));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(too_large(max_bytes, next_len));
        }
        bytes.extend_from_slice(&chunk);
    }

    let metadata = FetchMetadata {
        original_url: url.to_string(),
        final_url,
        content_type,
        byte_len: bytes.len() as u64,
    };
    Ok(FetchOutput { bytes, metadata })
}

/// Size of the regular file at `path` (following links), `None` if missing.
pub(crate) async fn existing_size(path: &Path) -> Result<Option<u64>, PipelineError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}
