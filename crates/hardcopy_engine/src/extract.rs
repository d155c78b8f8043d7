use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub site_name: Option<String>,
    pub content_html: String,
    pub word_count: u32,
}

pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedContent;
}

/// Lightweight "readability-like" extractor:
/// - title from `og:title`, then `<title>`
/// - byline from `<meta name="author">`, site from `og:site_name`
/// - content from `<article>`, otherwise `<body>`, otherwise the whole document
#[derive(Debug, Default)]
pub struct ReadabilityLikeExtractor;

impl Extractor for ReadabilityLikeExtractor {
    fn extract(&self, html: &str) -> ExtractedContent {
        let doc = Html::parse_document(html);

        let title = meta_content(&doc, "meta[property=\"og:title\"]")
            .or_else(|| first_text(&doc, "title"));
        let byline = meta_content(&doc, "meta[name=\"author\"]");
        let site_name = meta_content(&doc, "meta[property=\"og:site_name\"]");

        let content = first_element(&doc, "article").or_else(|| first_element(&doc, "body"));
        let (content_html, word_count) = match content {
            Some(node) => (node.inner_html(), count_words(node)),
            None => (doc.root_element().html(), count_words(doc.root_element())),
        };

        ExtractedContent {
            title,
            byline,
            site_name,
            content_html,
            word_count,
        }
    }
}

fn first_element<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next()
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    first_element(doc, selector)
        .map(|node| node.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    first_element(doc, selector)
        .and_then(|node| node.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

fn count_words(node: ElementRef<'_>) -> u32 {
    node.text()
        .map(|chunk| chunk.split_whitespace().count() as u32)
        .sum()
}
