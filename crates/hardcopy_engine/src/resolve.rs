use std::fmt;

use engine_logging::{engine_debug, engine_info, engine_warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use url::Url;

use crate::fetch::{existing_size, map_reqwest_error, AssetStore, FetchJob, FetchRoute};
use crate::redirect::{create_redirect, read_redirect, remove_redirect};
use crate::{FailureKind, FetchError, PipelineError};

/// Image formats recognised from a probe's content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    /// Stored as JPEG after conversion.
    WebP,
}

impl ImageFormat {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Extension of the file that ends up on disk.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg | Self::WebP => "jpg",
        }
    }

    pub fn needs_conversion(self) -> bool {
        self == Self::WebP
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    NoContent,
    Unsupported(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "404 not found"),
            SkipReason::NoContent => write!(f, "204 no content"),
            SkipReason::Unsupported(content_type) => {
                write!(f, "unsupported content type {content_type}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Image(ImageFormat),
    Skip(SkipReason),
}

impl AssetStore {
    /// HEAD `url` and classify the answer. Only unexpected failures are errors.
    pub async fn probe(&self, url: &Url) -> Result<ProbeOutcome, FetchError> {
        let response = self
            .client()
            .head(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(ProbeOutcome::Skip(SkipReason::NotFound));
        }
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("HEAD {url}: {status}"),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        match content_type {
            Some(ct) => Ok(ImageFormat::from_content_type(ct)
                .map(ProbeOutcome::Image)
                .unwrap_or_else(|| ProbeOutcome::Skip(SkipReason::Unsupported(ct.to_string())))),
            None if status == StatusCode::NO_CONTENT => Ok(ProbeOutcome::Skip(SkipReason::NoContent)),
            None => Err(FetchError::new(
                FailureKind::MissingContentType,
                format!("HEAD {url}"),
            )),
        }
    }

    /// Find out which format `url` serves and leave a redirect from its
    /// canonical path to the extension-qualified name.
    ///
    /// Returns the fetch to schedule next, or `None` when the asset is already
    /// materialized or was skipped. An existing redirect with a present target
    /// short-circuits without touching the network.
    pub async fn resolve_extension(&self, url: Url) -> Result<Option<FetchJob>, PipelineError> {
        let canonical = self.canonical_path(&url);

        if let Some(target) = read_redirect(&canonical).await? {
            if let Some(size) = existing_size(&target).await? {
                engine_debug!("Redirect {:?} -> {:?} already present", canonical, target);
                self.cache().mark_fetched(&target, size);
                self.cache().set_redirect(&canonical, &target);
                return Ok(None);
            }
            engine_warn!(
                "Redirect {:?} points at missing {:?}, discovering again",
                canonical,
                target
            );
            remove_redirect(&canonical).await?;
        }

        match self.probe(&url).await? {
            ProbeOutcome::Skip(reason) => {
                engine_warn!("Skipping {} during extension discovery: {}", url, reason);
                self.cache().mark_absent(&canonical);
                Ok(None)
            }
            ProbeOutcome::Image(format) => {
                let file_name = canonical
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let target_name = format!("{file_name}.{}", format.extension());
                create_redirect(&canonical, &target_name).await?;
                engine_info!("Resolved {} as {:?}, redirect -> {}", url, format, target_name);
                Ok(Some(FetchJob {
                    url,
                    route: FetchRoute::Redirected {
                        convert: format.needs_conversion(),
                    },
                }))
            }
        }
    }
}
