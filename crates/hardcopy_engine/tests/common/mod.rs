#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hardcopy_engine::{
    build_client, image_path_for_url, AssetStore, CaptureError, CapturedArticle, EngineSettings,
    ImageConverter, PageCapture, PipelineError,
};

/// Stands in for ffmpeg: copies the bytes to the target name.
#[derive(Default)]
pub struct CopyConverter {
    calls: AtomicUsize,
}

impl CopyConverter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ImageConverter for CopyConverter {
    async fn convert(&self, source: &Path, target: &Path) -> Result<(), PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::copy(source, target).await?;
        Ok(())
    }
}

pub struct FailingConverter;

#[async_trait::async_trait]
impl ImageConverter for FailingConverter {
    async fn convert(&self, source: &Path, _target: &Path) -> Result<(), PipelineError> {
        Err(PipelineError::Conversion {
            path: source.to_path_buf(),
            message: "unsupported input".into(),
        })
    }
}

/// Serves canned captures keyed by article URL.
#[derive(Default)]
pub struct FixedCapture {
    pages: HashMap<String, CapturedArticle>,
    calls: AtomicUsize,
}

impl FixedCapture {
    pub fn with_page(mut self, url: &str, readable_html: String, raw_html: String) -> Self {
        self.pages.insert(
            url.to_string(),
            CapturedArticle {
                readable_html,
                raw_html,
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PageCapture for FixedCapture {
    async fn capture(&self, url: &str) -> Result<CapturedArticle, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| panic!("no canned page for {url}")))
    }
}

pub fn store(media: &Path, settings: EngineSettings, converter: Arc<dyn ImageConverter>) -> AssetStore {
    std::fs::create_dir_all(media).unwrap();
    let client = build_client(&settings).unwrap();
    AssetStore::new(client, converter, settings, media.to_path_buf())
}

/// File name the asset for `url` is recorded under (after any conversion).
pub fn media_name(url: &str) -> String {
    local_path(url, Path::new(""))
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned()
}

pub fn local_path(url: &str, media: &Path) -> PathBuf {
    image_path_for_url(url, media, true)
}

pub fn image_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Article HTML as produced by the capture step.
pub fn envelope(base: &str, title: &str, meta: &[&str], content: &str) -> String {
    let json = serde_json::to_string(meta).unwrap();
    format!(
        "<base href=\"{base}\" />\n<h1 class=\"article-title\">{title}</h1>\n<p><i class=\"article-metadata\">{}</i></p>\n<metadata>{json}</metadata>\n<hr>{content}<hr>\n<p><i><a class=\"article-link\" href=\"{base}\">Article link</a></i></p>",
        meta.join(" • ")
    )
}
