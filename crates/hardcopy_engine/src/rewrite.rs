//! Pass two: render the document to Markdown against the populated asset cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::cache::AssetCache;
use crate::fetch::AssetStore;
use crate::markdown::{link_markdown, render_markdown, ImageTag, RenderRules};
use crate::reference::{resolve_reference, shortcode};
use crate::sanitize::{image_path_for_url, relative_markdown_path};

/// Stands in for an image that could not be materialized.
pub const BROKEN_ASSET_PLACEHOLDER: &str = "_404_";
pub const MISSING_TABLE_PLACEHOLDER: &str = "_404_ (table)";

/// A link wrapping nothing but an image can render with blank lines inside
/// the brackets; it is flattened to the bare image.
static LINKED_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[\n\n!\[(.*?)\]\((.+?)\)\n\n\]\((.+?)\)").expect("hardcoded regex pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Point images at local assets. When off, image references pass
    /// through unchanged.
    pub images_enabled: bool,
    /// Replace tables with their captured screenshots.
    pub table_screenshots: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            images_enabled: true,
            table_screenshots: true,
        }
    }
}

/// Render `html` to Markdown. Must run after pass one finished for `store`.
pub fn rewrite_document(
    html: &str,
    store: &AssetStore,
    base_href: Option<&str>,
    document_dir: &Path,
    options: RewriteOptions,
) -> String {
    let rules = RewriteRules {
        cache: store.shared_cache(),
        media_dir: store.media_dir().to_path_buf(),
        min_image_bytes: store.settings().min_image_bytes,
        base: base_href.and_then(|href| Url::parse(href.trim()).ok()),
        document_dir: document_dir.to_path_buf(),
        options,
    };
    let markdown = render_markdown(html, Arc::new(rules));
    flatten_linked_images(&markdown)
}

pub(crate) fn flatten_linked_images(markdown: &str) -> String {
    LINKED_IMAGE.replace_all(markdown, "![]($2)").into_owned()
}

struct RewriteRules {
    cache: Arc<AssetCache>,
    media_dir: PathBuf,
    min_image_bytes: u64,
    base: Option<Url>,
    document_dir: PathBuf,
    options: RewriteOptions,
}

impl RenderRules for RewriteRules {
    fn image(&self, image: &ImageTag) -> String {
        if !self.options.images_enabled {
            return image.to_markdown();
        }
        let Some(url) = resolve_reference(&image.src, self.base.as_ref()) else {
            return image.to_markdown();
        };
        let canonical = image_path_for_url(url.as_str(), &self.media_dir, true);
        match self.cache.usable(&canonical, self.min_image_bytes) {
            Some(path) => image.with_src(&relative_markdown_path(&self.document_dir, &path)),
            None => BROKEN_ASSET_PLACEHOLDER.to_string(),
        }
    }

    fn link(&self, href: &str, content: &str, title: Option<&str>) -> String {
        // Hashes the href alone; an anchor title does not change the code.
        format!("{} {{{}}}", link_markdown(href, content, title), shortcode(href))
    }

    fn replaces_tables(&self) -> bool {
        self.options.table_screenshots
    }

    fn table(&self, table_id: Option<&str>) -> String {
        match table_id {
            Some(id) => {
                let screenshot = self.media_dir.join(format!("element_{id}.png"));
                format!("![]({})", relative_markdown_path(&self.document_dir, &screenshot))
            }
            None => MISSING_TABLE_PLACEHOLDER.to_string(),
        }
    }
}
