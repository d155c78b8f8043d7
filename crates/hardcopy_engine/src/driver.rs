use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info};

use crate::capture::{HttpPageCapture, PageCapture};
use crate::checks::{check_articles, ArticleReport, CheckOptions};
use crate::convert::{FfmpegConverter, ImageConverter};
use crate::decode::decode_capture_file;
use crate::discover::{discover_references, DiscoveryOutput};
use crate::fetch::{build_client, AssetStore};
use crate::layout::BookLayout;
use crate::persist::AtomicFileWriter;
use crate::rewrite::{rewrite_document, RewriteOptions};
use crate::settings::EngineSettings;
use crate::words::{MarkdownWordCounter, WordCounter};
use crate::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Render the primary document from the raw page instead of the
    /// readable extract.
    pub use_raw_html: bool,
    pub ignore_long_articles: bool,
}

impl RunOptions {
    fn primary_rewrite(self) -> RewriteOptions {
        RewriteOptions {
            images_enabled: true,
            table_screenshots: !self.use_raw_html,
        }
    }

    fn raw_rewrite(self) -> RewriteOptions {
        RewriteOptions {
            images_enabled: self.use_raw_html,
            table_screenshots: !self.use_raw_html,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedVariant {
    pub markdown: String,
    pub discovery: DiscoveryOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleOutcome {
    pub url: String,
    pub markdown_path: PathBuf,
    pub raw_markdown_path: PathBuf,
    pub table_ids: Vec<String>,
    pub report: ArticleReport,
}

/// Turns article URLs into Markdown documents inside a [`BookLayout`].
pub struct Driver {
    settings: EngineSettings,
    client: reqwest::Client,
    converter: Arc<dyn ImageConverter>,
    capture: Arc<dyn PageCapture>,
    word_counter: Box<dyn WordCounter>,
}

impl Driver {
    pub fn new(settings: EngineSettings) -> Result<Self, PipelineError> {
        let client = build_client(&settings)?;
        Ok(Self {
            converter: Arc::new(FfmpegConverter::new(settings.converter_program.clone())),
            capture: Arc::new(HttpPageCapture::new(client.clone(), settings.clone())),
            word_counter: Box::new(MarkdownWordCounter),
            settings,
            client,
        })
    }

    pub fn with_converter(mut self, converter: Arc<dyn ImageConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_capture(mut self, capture: Arc<dyn PageCapture>) -> Self {
        self.capture = capture;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Process every article in order, then run the batch checks. Any fatal
    /// error stops the run at the article that raised it.
    pub async fn run(
        &self,
        layout: &BookLayout,
        urls: &[String],
        options: RunOptions,
    ) -> Result<Vec<ArticleOutcome>, PipelineError> {
        layout.ensure()?;
        engine_info!("Writing {} article(s) into {:?}", urls.len(), layout.root());

        let mut outcomes = Vec::with_capacity(urls.len());
        for url in urls {
            outcomes.push(self.process_article(layout, url, options).await?);
        }

        let reports: Vec<ArticleReport> = outcomes.iter().map(|o| o.report.clone()).collect();
        check_articles(
            &reports,
            &self.settings,
            CheckOptions {
                readability: !options.use_raw_html,
                ignore_long_articles: options.ignore_long_articles,
            },
        )?;
        engine_info!("Word counts checked for {} article(s)", reports.len());
        Ok(outcomes)
    }

    /// Capture (or reuse the cached capture of) one article and write both of
    /// its Markdown variants.
    pub async fn process_article(
        &self,
        layout: &BookLayout,
        url: &str,
        options: RunOptions,
    ) -> Result<ArticleOutcome, PipelineError> {
        let (readable_path, raw_path) = layout.capture_paths(url);
        if !is_file(&readable_path).await? || !is_file(&raw_path).await? {
            engine_info!("Capturing {}", url);
            let captured = self.capture.capture(url).await?;
            let cache = AtomicFileWriter::new(layout.cache_dir().to_path_buf());
            cache.write(&file_name(&readable_path), &captured.readable_html)?;
            cache.write(&file_name(&raw_path), &captured.raw_html)?;
        } else {
            engine_debug!("Using cached capture of {}", url);
        }

        let readable_html = decode_capture_file(&readable_path).await?;
        let raw_html = decode_capture_file(&raw_path).await?;
        let primary_html = if options.use_raw_html {
            &raw_html
        } else {
            &readable_html
        };

        let primary = self
            .render_variant(layout, primary_html, options.primary_rewrite())
            .await?;
        let raw = self
            .render_variant(layout, &raw_html, options.raw_rewrite())
            .await?;

        let (markdown_name, raw_markdown_name) = BookLayout::markdown_names(url);
        let writer = AtomicFileWriter::new(layout.root().to_path_buf());
        let markdown_path = writer.write(&markdown_name, &primary.markdown)?;
        let raw_markdown_path = writer.write(&raw_markdown_name, &raw.markdown)?;
        engine_info!("Wrote {:?} and {:?}", markdown_path, raw_markdown_path);

        let report = ArticleReport {
            url: url.to_string(),
            metadata_words: primary.discovery.metadata.as_ref().and_then(|m| m.word_count()),
            raw_markdown_words: self.word_counter.count(&raw.markdown),
        };
        Ok(ArticleOutcome {
            url: url.to_string(),
            markdown_path,
            raw_markdown_path,
            table_ids: primary.discovery.table_ids,
            report,
        })
    }

    /// Both passes over one document with a fresh asset cache.
    pub async fn render_variant(
        &self,
        layout: &BookLayout,
        html: &str,
        options: RewriteOptions,
    ) -> Result<RenderedVariant, PipelineError> {
        let store = AssetStore::new(
            self.client.clone(),
            Arc::clone(&self.converter),
            self.settings.clone(),
            layout.media_dir().to_path_buf(),
        );
        let discovery = discover_references(html, &store, options).await?;
        let markdown = rewrite_document(
            html,
            &store,
            discovery.base_href.as_deref(),
            layout.root(),
            options,
        );
        engine_debug!("Pass two done, {} cache entries", store.cache().len());
        Ok(RenderedVariant {
            markdown,
            discovery,
        })
    }
}

async fn is_file(path: &Path) -> Result<bool, PipelineError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
