//! Hardcopy engine: captured article HTML to Markdown with local image assets.
mod cache;
mod capture;
mod checks;
mod convert;
mod decode;
mod discover;
mod driver;
mod extract;
mod fetch;
mod layout;
mod markdown;
mod metadata;
mod persist;
mod redirect;
mod reference;
mod resolve;
mod rewrite;
mod sanitize;
mod settings;
mod types;
mod words;

pub use cache::{AssetCache, AssetEntry, AssetStatus};
pub use capture::{CaptureError, CapturedArticle, HttpPageCapture, PageCapture};
pub use checks::{check_articles, ArticleCheckError, ArticleReport, CheckOptions};
pub use convert::{FfmpegConverter, ImageConverter};
pub use decode::{decode_capture_file, decode_html, DecodeError, DecodedHtml};
pub use discover::{discover_references, scan_document, DiscoveryOutput, DocumentScan};
pub use driver::{ArticleOutcome, Driver, RenderedVariant, RunOptions};
pub use extract::{ExtractedContent, Extractor, ReadabilityLikeExtractor};
pub use fetch::{build_client, fetch_page, AssetStore, FetchJob, FetchMetadata, FetchOutput, FetchRoute};
pub use layout::{week_label, BookLayout};
pub use markdown::{link_markdown, render_markdown, ImageTag, PlainRules, RenderRules};
pub use metadata::ArticleMetadata;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use redirect::{create_redirect, read_redirect, remove_redirect};
pub use reference::{base62_encode, resolve_reference, shortcode};
pub use resolve::{ImageFormat, ProbeOutcome, SkipReason};
pub use rewrite::{rewrite_document, RewriteOptions, BROKEN_ASSET_PLACEHOLDER, MISSING_TABLE_PLACEHOLDER};
pub use sanitize::{
    image_path_for_url, is_supported_image, needs_conversion, relative_markdown_path,
    sanitize_to_filename,
};
pub use settings::EngineSettings;
pub use types::{FailureKind, FetchError, PipelineError};
pub use words::{MarkdownWordCounter, WhitespaceWordCounter, WordCounter};
