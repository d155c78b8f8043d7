//! Page capture: produce the readable and raw HTML variants of an article,
//! each wrapped in the envelope the two passes expect.

use engine_logging::{engine_debug, engine_info};
use html_escape::{encode_double_quoted_attribute, encode_text};
use scraper::{Html, Selector};

use crate::decode::{decode_html, DecodeError};
use crate::extract::{Extractor, ReadabilityLikeExtractor};
use crate::fetch::fetch_page;
use crate::metadata::ArticleMetadata;
use crate::settings::EngineSettings;
use crate::FetchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedArticle {
    pub readable_html: String,
    pub raw_html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("metadata could not be encoded: {0}")]
    Metadata(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait PageCapture: Send + Sync {
    async fn capture(&self, url: &str) -> Result<CapturedArticle, CaptureError>;
}

/// Captures with a plain GET. Pages that only render with scripting come out
/// as whatever the server sends.
pub struct HttpPageCapture {
    client: reqwest::Client,
    settings: EngineSettings,
    extractor: Box<dyn Extractor>,
}

impl HttpPageCapture {
    pub fn new(client: reqwest::Client, settings: EngineSettings) -> Self {
        Self {
            client,
            settings,
            extractor: Box::new(ReadabilityLikeExtractor),
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }
}

#[async_trait::async_trait]
impl PageCapture for HttpPageCapture {
    async fn capture(&self, url: &str) -> Result<CapturedArticle, CaptureError> {
        let output = fetch_page(&self.client, &self.settings, url).await?;
        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref())?;
        engine_debug!(
            "Decoded {} ({} bytes) as {}",
            output.metadata.final_url,
            output.metadata.byte_len,
            decoded.encoding_label
        );

        let extracted = self.extractor.extract(&decoded.html);
        let metadata = ArticleMetadata::from_parts(
            extracted.byline.as_deref(),
            extracted.site_name.as_deref(),
            extracted.word_count,
        );
        engine_info!("Captured {}: {}", url, metadata.display_line());

        let envelope = Envelope {
            base_href: &output.metadata.final_url,
            article_url: url,
            title: extracted.title.as_deref(),
            metadata: &metadata,
        };
        Ok(CapturedArticle {
            readable_html: envelope.wrap(&extracted.content_html)?,
            raw_html: envelope.wrap(&body_html(&decoded.html))?,
        })
    }
}

struct Envelope<'a> {
    base_href: &'a str,
    article_url: &'a str,
    title: Option<&'a str>,
    metadata: &'a ArticleMetadata,
}

impl Envelope<'_> {
    fn wrap(&self, content: &str) -> Result<String, serde_json::Error> {
        let mut head = vec![format!("<base href=\"{}\" />", encode_double_quoted_attribute(self.base_href))];
        if let Some(title) = self.title {
            head.push(format!("<h1 class=\"article-title\">{}</h1>", encode_text(title)));
        }
        head.push(format!(
            "<p><i class=\"article-metadata\">{}</i></p>",
            encode_text(&self.metadata.display_line())
        ));
        head.push(format!("<metadata>{}</metadata>", encode_text(&self.metadata.to_json()?)));
        head.push("<hr>".to_string());

        let tail = [
            "<hr>".to_string(),
            format!(
                "<p><i><a class=\"article-link\" href=\"{}\">Article link</a></i></p>",
                encode_double_quoted_attribute(self.article_url)
            ),
        ];
        Ok(format!("{}{}{}", head.join("\n"), content, tail.join("\n")))
    }
}

fn body_html(html: &str) -> String {
    let doc = Html::parse_document(html);
    match Selector::parse("body").ok().and_then(|sel| doc.select(&sel).next()) {
        Some(body) => body.inner_html(),
        None => doc.root_element().html(),
    }
}
