//! Pass one: find every image and table in a document and materialize the
//! images before the document is rewritten.

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::future::try_join;
use futures_util::{stream, StreamExt, TryStreamExt};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fetch::{AssetStore, FetchJob};
use crate::metadata::ArticleMetadata;
use crate::reference::resolve_reference;
use crate::rewrite::RewriteOptions;
use crate::sanitize::is_supported_image;
use crate::PipelineError;

pub(crate) const TABLE_ID_PREFIX: &str = "unique_id_";

/// What a single walk over the document found.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentScan {
    pub base_href: Option<String>,
    pub metadata: Option<ArticleMetadata>,
    /// Resolved image URLs in document order, duplicates included.
    pub image_urls: Vec<Url>,
    pub table_ids: Vec<String>,
    /// Images whose `src` cannot be fetched (`data:`, relative without base, ...).
    pub unresolved_images: usize,
    /// Images inside tables that are replaced by screenshots.
    pub images_in_tables: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryOutput {
    pub base_href: Option<String>,
    pub metadata: Option<ArticleMetadata>,
    pub table_ids: Vec<String>,
    pub direct_fetches: usize,
    pub extension_probes: usize,
}

/// The first `<base href>` applies to the whole document, wherever it sits.
/// Images are collected only where pass two will render them.
pub fn scan_document(html: &str, options: RewriteOptions) -> DocumentScan {
    let document = Html::parse_document(html);
    let mut scan = DocumentScan {
        base_href: first_base_href(&document),
        ..DocumentScan::default()
    };
    let base = scan.base_href.as_deref().and_then(|href| Url::parse(href).ok());

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        match element.value().name() {
            "metadata" if scan.metadata.is_none() => {
                let text: String = element.text().collect();
                match ArticleMetadata::parse(&text) {
                    Ok(metadata) => scan.metadata = Some(metadata),
                    Err(err) => engine_warn!("Ignoring unparseable metadata block: {}", err),
                }
            }
            "img" if options.images_enabled => {
                if options.table_screenshots && inside_table(element) {
                    scan.images_in_tables += 1;
                    continue;
                }
                let src = element.value().attr("src").unwrap_or_default();
                match resolve_reference(src, base.as_ref()) {
                    Some(url) => scan.image_urls.push(url),
                    None => {
                        engine_debug!("Leaving unresolvable image source {:?} as is", src);
                        scan.unresolved_images += 1;
                    }
                }
            }
            "table" => {
                if let Some(id) = table_id(element) {
                    scan.table_ids.push(id);
                }
            }
            _ => {}
        }
    }
    scan
}

/// Run pass one against `store`: schedule one extension probe or download per
/// distinct canonical path and wait for all of them, including the downloads
/// the probes lead to.
pub async fn discover_references(
    html: &str,
    store: &AssetStore,
    options: RewriteOptions,
) -> Result<DiscoveryOutput, PipelineError> {
    let scan = scan_document(html, options);
    if scan.images_in_tables > 0 {
        engine_debug!("{} image(s) inside replaced tables not fetched", scan.images_in_tables);
    }

    let mut direct = Vec::new();
    let mut probes = Vec::new();
    for url in scan.image_urls {
        let canonical = store.canonical_path(&url);
        if !store.cache().try_begin(&canonical) {
            engine_debug!("{:?} already scheduled, skipping {}", canonical, url);
            continue;
        }
        if is_supported_image(&canonical) && !store.settings().is_content_negotiating(url.as_str()) {
            direct.push(FetchJob::direct(url));
        } else {
            probes.push(url);
        }
    }

    let output = DiscoveryOutput {
        base_href: scan.base_href,
        metadata: scan.metadata,
        table_ids: scan.table_ids,
        direct_fetches: direct.len(),
        extension_probes: probes.len(),
    };
    engine_info!(
        "Pass one: {} direct fetches, {} extension probes, {} tables",
        output.direct_fetches,
        output.extension_probes,
        output.table_ids.len()
    );

    let limit = store.settings().fetch_limit();
    let resolved = stream::iter(probes)
        .map(move |url| store.resolve_extension(url))
        .buffer_unordered(limit)
        .try_collect::<Vec<_>>();
    let fetched = stream::iter(direct)
        .map(move |job| store.fetch(job))
        .buffer_unordered(limit)
        .try_collect::<Vec<_>>();
    let (follow_ups, _) = try_join(resolved, fetched).await?;

    stream::iter(follow_ups.into_iter().flatten())
        .map(move |job| store.fetch(job))
        .buffer_unordered(limit)
        .try_collect::<Vec<_>>()
        .await?;

    Ok(output)
}

fn table_id(table: ElementRef<'_>) -> Option<String> {
    table.value().attr("class").and_then(table_id_from_class)
}

/// The capture id among the classes of a `<table>`.
pub(crate) fn table_id_from_class(class: &str) -> Option<String> {
    class
        .split_whitespace()
        .find(|class| class.starts_with(TABLE_ID_PREFIX))
        .map(str::to_string)
}

fn inside_table(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "table")
}

fn first_base_href(document: &Html) -> Option<String> {
    let selector = Selector::parse("base[href]").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|base| base.value().attr("href"))
        .map(|href| href.trim().to_string())
}
